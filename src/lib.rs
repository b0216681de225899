//! Loader for legacy chunked 3D scene containers (`.3ds`).
//!
//! A load call runs four passes over one in-memory byte slice: chunk parsing
//! into a neutral scene graph, parent/child reconstruction from flat node
//! ids, pivot-aware transform baking, and smoothing-group-driven normal
//! synthesis. Structural defects in the container abort the load; local
//! defects (unknown chunks, dangling references, out-of-range indices) are
//! logged and skipped so one bad mesh never takes the whole file down.

/// Post-parse passes: transforms, normals, animation tracks.
pub mod bake;
/// Chunk header decoding and the bounds-checked byte reader.
pub mod chunk;
/// Error definitions
pub mod error;
/// Loader configuration knobs.
pub mod options;
/// Recursive-descent parser over the chunk tree.
pub mod parse;
/// The neutral in-memory scene graph.
pub mod scene;

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use rootcause::Report;

pub use error::{LoadError, LoadResult};
pub use options::{FlipPolicy, LoadOptions, UpAxis};
pub use scene::{Object, ObjectHandle, Scene};

/// Memory-map `path` and load it as a scene.
pub fn load_scene_file(path: impl AsRef<Path>, options: &LoadOptions) -> LoadResult<Scene> {
    let file = File::open(path.as_ref()).map_err(|e| Report::new(LoadError::Io(e)))?;
    // Safety: the mapping is read-only and dropped before this returns.
    let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Report::new(LoadError::Io(e)))?;
    load_scene_from_slice(&mmap, options)
}

/// Load a scene from an in-memory container.
pub fn load_scene_from_slice(data: &[u8], options: &LoadOptions) -> LoadResult<Scene> {
    load_scene_with_progress(data, options, None)
}

/// Load a scene, reporting coarse progress through `progress` as each named
/// object and node begins parsing.
pub fn load_scene_with_progress<'a>(
    data: &[u8],
    options: &'a LoadOptions,
    progress: Option<&'a mut dyn FnMut(&str)>,
) -> LoadResult<Scene> {
    let mut scene = parse::parse_scene(data, options, progress)
        .map_err(|e| Report::new(LoadError::Parse(format!("{e}"))))?;
    scene::hierarchy::resolve_hierarchy(&mut scene, options.resolve_hierarchy);
    bake::bake_transforms(&mut scene, options);
    bake::synthesize_normals(&mut scene, options);
    Ok(scene)
}
