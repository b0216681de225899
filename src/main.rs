use std::path::PathBuf;

use clap::Parser;
use scene3ds::scene::ObjectHandle;
use scene3ds::{FlipPolicy, LoadOptions, LoadResult, Scene, UpAxis};
use tracing_subscriber::EnvFilter;

/// Load a chunked 3DS scene container and print what it holds.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene file to load
    input: PathBuf,

    /// Keep the file's Z-up axes instead of remapping to Y-up
    #[clap(long)]
    z_up: bool,

    /// Skip normal synthesis
    #[clap(long)]
    no_normals: bool,

    /// Fold pivot offsets into each object's local matrix
    #[clap(long)]
    bake_pivot: bool,

    /// Apply the mirrored-mesh flip even under dummy parents
    #[clap(long)]
    always_flip: bool,

    /// Dump the full scene as JSON instead of a summary
    #[clap(long)]
    json: bool,
}

fn main() -> LoadResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let options = LoadOptions::builder()
        .up_axis(if args.z_up { UpAxis::ZUp } else { UpAxis::YUp })
        .synthesize_normals(!args.no_normals)
        .bake_pivot(args.bake_pivot)
        .flip_policy(if args.always_flip {
            FlipPolicy::Always
        } else {
            FlipPolicy::SuppressUnderDummyParent
        })
        .build();

    let scene = scene3ds::load_scene_file(&args.input, &options)?;

    if args.json {
        let json = serde_json::to_string_pretty(&scene)
            .map_err(|e| rootcause::Report::new(scene3ds::LoadError::SerdeJson(e)))?;
        println!("{json}");
    } else {
        print_summary(&scene);
    }
    Ok(())
}

fn print_summary(scene: &Scene) {
    println!(
        "{} object(s), {} material(s)",
        scene.objects.len(),
        scene.materials.len()
    );
    if let Some((start, end)) = scene.frame_range {
        println!("frames {start}..{end}");
    }
    for &root in &scene.roots {
        print_object(scene, root, 0);
    }
    for material in &scene.materials {
        println!(
            "material \"{}\": {} map(s){}",
            material.name,
            material.maps.len(),
            if material.two_sided { ", two-sided" } else { "" }
        );
    }
}

fn print_object(scene: &Scene, handle: ObjectHandle, depth: usize) {
    let object = scene.object(handle);
    let vertices: usize = object
        .geometries
        .iter()
        .map(|g| object.positions_of(g).len())
        .sum();
    let faces: usize = object
        .geometries
        .iter()
        .flat_map(|g| &g.meshes)
        .map(|m| m.face_count())
        .sum();
    println!(
        "{:indent$}{} ({} vertices, {} faces){}{}",
        "",
        if object.name.is_empty() {
            "<unnamed>"
        } else {
            &object.name
        },
        vertices,
        faces,
        if object.dummy { " [dummy]" } else { "" },
        if object.animation.is_some() {
            " [animated]"
        } else {
            ""
        },
        indent = depth * 2,
    );
    for &child in &object.children {
        print_object(scene, child, depth + 1);
    }
}
