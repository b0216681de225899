//! Pivot-aware transform baking.
//!
//! The container records each mesh's vertices in world space together with
//! the world matrix that produced them. This pass re-expresses vertices
//! relative to each object's pivot frame and derives one local matrix per
//! object such that `child_world = parent_world * child_local`, walking the
//! hierarchy depth-first from the roots.

use glam::{EulerRot, Mat4, Vec3};
use tracing::{debug, warn};

use crate::options::{FlipPolicy, LoadOptions};
use crate::scene::animation::{Animation, Transform};
use crate::scene::{Mesh, Object, ObjectHandle, Scene, VertexSource};

/// Bake every root subtree. Meshes with out-of-range face indices are
/// dropped with a diagnostic; everything else continues.
pub fn bake_transforms(scene: &mut Scene, options: &LoadOptions) {
    for root in scene.roots.clone() {
        bake_object(scene, root, Mat4::IDENTITY, false, options);
    }
}

fn bake_object(
    scene: &mut Scene,
    handle: ObjectHandle,
    parent_world: Mat4,
    parent_is_dummy: bool,
    options: &LoadOptions,
) {
    let index = handle.0;

    // Freeze policy: an animation with at most one key per track, or whose
    // sampled transforms agree at every key time, collapses into the static
    // transform at its start time.
    let sampled_local = {
        let object = &scene.objects[index];
        object.animation.as_ref().map(|animation| {
            let start = animation.start_time().unwrap_or(0.0);
            (compose(animation.sample(start)), animation_is_static(animation))
        })
    };
    if let Some((_, true)) = sampled_local {
        debug!(object = %scene.objects[index].name, "freezing static animation");
        scene.objects[index].animation = None;
    }

    let pivot_frame = first_mesh_absolute(&scene.objects[index]).map(pivot_frame_of);

    let local = match (sampled_local, pivot_frame) {
        // Keyframer data wins: the node transform is authoritative.
        (Some((matrix, _)), _) => matrix,
        // No node data: the mesh's own recorded frame is the world frame.
        (None, Some(frame)) => safe_inverse(parent_world, "parent world") * frame,
        (None, None) => Mat4::IDENTITY,
    };
    scene.objects[index].local = local;
    let world = parent_world * local;

    bake_object_geometry(scene, index, world, parent_is_dummy, options);

    if options.bake_pivot {
        let pivot = scene.objects[index].pivot;
        if pivot != Vec3::ZERO {
            scene.objects[index].local = local * Mat4::from_translation(pivot);
            scene.objects[index].pivot = Vec3::ZERO;
        }
    }

    let is_dummy = scene.objects[index].dummy;
    for child in scene.objects[index].children.clone() {
        bake_object(scene, child, world, is_dummy, options);
    }
}

fn bake_object_geometry(
    scene: &mut Scene,
    index: usize,
    world: Mat4,
    parent_is_dummy: bool,
    options: &LoadOptions,
) {
    let object = &mut scene.objects[index];
    if object.geometries.is_empty() {
        return;
    }

    let world_inverse = safe_inverse(world, "object world");
    let pivot = object.pivot;

    // Shared-pool vertices rebase once per object.
    if let Some(pool) = object.shared_pool.as_mut() {
        for position in &mut pool.positions {
            *position = world_inverse.transform_point3(*position) - pivot;
        }
    }

    for geometry in &mut object.geometries {
        let vertex_count = match geometry.source {
            VertexSource::Owned => geometry.positions.len(),
            VertexSource::SharedPool => object
                .shared_pool
                .as_ref()
                .map(|p| p.positions.len())
                .unwrap_or(0),
        };

        // Invariant: every face index addresses a real vertex. Violating
        // meshes are dropped, the rest of the scene continues.
        let geometry_name = geometry.name.clone();
        geometry.meshes.retain(|mesh| {
            let in_range = mesh
                .vertex_indices
                .iter()
                .all(|&i| (i as usize) < vertex_count);
            if !in_range {
                warn!(
                    geometry = %geometry_name,
                    vertex_count,
                    "dropping mesh with out-of-range face indices"
                );
            }
            in_range
        });

        if geometry.source == VertexSource::Owned {
            for position in &mut geometry.positions {
                *position = world_inverse.transform_point3(*position) - pivot;
            }
        }

        for mesh in &mut geometry.meshes {
            mesh.local = world_inverse * mesh.absolute;

            let flip = mesh.absolute.determinant() < 0.0;
            let apply = match options.flip_policy {
                FlipPolicy::Always => flip,
                FlipPolicy::Never => false,
                FlipPolicy::SuppressUnderDummyParent => flip && !parent_is_dummy,
            };
            if apply {
                let positions = match geometry.source {
                    VertexSource::Owned => Some(&mut geometry.positions),
                    // Pool positions are shared by sibling meshes; mirroring
                    // them per mesh would double-apply, so only the winding
                    // is corrected.
                    VertexSource::SharedPool => None,
                };
                flip_mesh(positions, mesh);
            }
        }
    }
}

/// Orientation-flip correction: mirror the first coordinate and reverse each
/// face's winding by swapping its second and third indices.
fn flip_mesh(positions: Option<&mut Vec<Vec3>>, mesh: &mut Mesh) {
    if let Some(positions) = positions {
        for position in positions.iter_mut() {
            position.x = -position.x;
        }
    }
    for face in mesh.vertex_indices.chunks_exact_mut(3) {
        face.swap(1, 2);
    }
}

/// Pivot coordinate system: the mesh's recorded basis with each column
/// normalized. Zero-length columns fall back to the matching unit axis, and
/// a mirrored basis is made proper so the reflection is handled by the
/// explicit flip step instead of hiding in the frame.
fn pivot_frame_of(absolute: Mat4) -> Mat4 {
    let mirrored = absolute.determinant() < 0.0;
    let x = normalize_or(absolute.x_axis.truncate(), Vec3::X);
    let y = normalize_or(absolute.y_axis.truncate(), Vec3::Y);
    let z = normalize_or(absolute.z_axis.truncate(), Vec3::Z);
    let x = if mirrored { -x } else { x };
    Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        absolute.w_axis,
    )
}

fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let length = v.length();
    if length > 1e-12 { v / length } else { fallback }
}

fn first_mesh_absolute(object: &Object) -> Option<Mat4> {
    object
        .geometries
        .iter()
        .flat_map(|g| g.meshes.iter())
        .map(|m| m.absolute)
        .next()
}

fn safe_inverse(matrix: Mat4, what: &str) -> Mat4 {
    if matrix.determinant().abs() < 1e-12 {
        warn!(matrix = what, "singular matrix, using identity for inverse");
        Mat4::IDENTITY
    } else {
        matrix.inverse()
    }
}

fn compose(transform: Transform) -> Mat4 {
    Mat4::from_translation(transform.position)
        * Mat4::from_euler(
            EulerRot::XYZ,
            transform.rotation.x,
            transform.rotation.y,
            transform.rotation.z,
        )
        * Mat4::from_scale(transform.scaling)
}

fn animation_is_static(animation: &Animation) -> bool {
    if animation.max_keys() <= 1 {
        return true;
    }
    let times = animation.time_union();
    let first = animation.sample(times[0]);
    times.iter().all(|&t| animation.sample(t) == first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::hierarchy::resolve_hierarchy;
    use crate::scene::{Geometry, Mesh, Object, VertexPool};

    fn triangle_object(absolute: Mat4) -> Object {
        let mut object = Object::new("tri");
        let mut geometry = Geometry::new("tri");
        geometry.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh = Mesh::default();
        mesh.vertex_indices = vec![0, 1, 2];
        mesh.absolute = absolute;
        geometry.meshes.push(mesh);
        object.geometries.push(geometry);
        object
    }

    fn baked_scene(objects: Vec<Object>, options: &LoadOptions) -> Scene {
        let mut scene = Scene::new();
        scene.objects = objects;
        resolve_hierarchy(&mut scene, true);
        bake_transforms(&mut scene, options);
        scene
    }

    #[test]
    fn negative_determinant_mirrors_x_and_reverses_winding() {
        let options = LoadOptions::default();
        let plain = baked_scene(vec![triangle_object(Mat4::IDENTITY)], &options);
        let mirrored = baked_scene(
            vec![triangle_object(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)))],
            &options,
        );

        let g0 = &plain.objects[0].geometries[0];
        let g1 = &mirrored.objects[0].geometries[0];
        assert_eq!(g0.meshes[0].vertex_indices, vec![0, 1, 2]);
        assert_eq!(g1.meshes[0].vertex_indices, vec![0, 2, 1]);
        for (a, b) in g0.positions.iter().zip(&g1.positions) {
            assert!((a.x + b.x).abs() < 1e-6);
            assert!((a.y - b.y).abs() < 1e-6);
            assert!((a.z - b.z).abs() < 1e-6);
        }
    }

    #[test]
    fn flip_is_suppressed_under_a_dummy_parent() {
        let options = LoadOptions::default();
        let mut dummy = Object::new("placeholder");
        dummy.dummy = true;
        dummy.node_id = 0;
        let mut child = triangle_object(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
        child.node_id = 1;
        child.parent_id = 0;

        let scene = baked_scene(vec![dummy, child], &options);
        let mesh = &scene.objects[1].geometries[0].meshes[0];
        // Winding untouched because the immediate parent is a dummy.
        assert_eq!(mesh.vertex_indices, vec![0, 1, 2]);
    }

    #[test]
    fn always_policy_ignores_dummy_parents() {
        let options = LoadOptions::builder()
            .flip_policy(FlipPolicy::Always)
            .build();
        let mut dummy = Object::new("placeholder");
        dummy.dummy = true;
        dummy.node_id = 0;
        let mut child = triangle_object(Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0)));
        child.node_id = 1;
        child.parent_id = 0;

        let scene = baked_scene(vec![dummy, child], &options);
        let mesh = &scene.objects[1].geometries[0].meshes[0];
        assert_eq!(mesh.vertex_indices, vec![0, 2, 1]);
    }

    #[test]
    fn out_of_range_indices_drop_the_mesh_only() {
        let options = LoadOptions::default();
        let mut object = triangle_object(Mat4::IDENTITY);
        let mut bad = Mesh::default();
        bad.vertex_indices = vec![0, 1, 99];
        object.geometries[0].meshes.push(bad);

        let scene = baked_scene(vec![object], &options);
        assert_eq!(scene.objects[0].geometries[0].meshes.len(), 1);
    }

    #[test]
    fn world_recorded_vertices_are_rebased_to_the_pivot_frame() {
        let options = LoadOptions::default();
        let offset = Vec3::new(10.0, 0.0, 0.0);
        let mut object = triangle_object(Mat4::from_translation(offset));
        // Vertices recorded in world space, already offset.
        for p in &mut object.geometries[0].positions {
            *p += offset;
        }
        let scene = baked_scene(vec![object], &options);
        let positions = &scene.objects[0].geometries[0].positions;
        assert!((positions[0] - Vec3::ZERO).length() < 1e-6);
        assert!((positions[1] - Vec3::X).length() < 1e-6);
        // And the local matrix reproduces the world placement.
        let local = scene.objects[0].local;
        assert!((local.transform_point3(positions[0]) - offset).length() < 1e-6);
    }

    #[test]
    fn pooled_vertices_rebase_once_for_the_object() {
        let options = LoadOptions::default();
        let offset = Vec3::new(5.0, 0.0, 0.0);

        let mut object = Object::new("pooled");
        let mut geometry = Geometry::new("pooled");
        geometry.source = VertexSource::SharedPool;
        let mut mesh = Mesh::default();
        mesh.vertex_indices = vec![0, 1, 2];
        mesh.absolute = Mat4::from_translation(offset);
        geometry.meshes.push(mesh);
        object.geometries.push(geometry);
        object.shared_pool = Some(VertexPool {
            positions: vec![offset, offset + Vec3::X, offset + Vec3::Y],
            ..VertexPool::default()
        });

        let scene = baked_scene(vec![object], &options);
        let object = &scene.objects[0];
        let pool = object.shared_pool.as_ref().unwrap();
        assert!((pool.positions[0] - Vec3::ZERO).length() < 1e-6);
        assert!((pool.positions[1] - Vec3::X).length() < 1e-6);
        // Owned arrays stay empty; accessors resolve through the pool.
        assert!(object.geometries[0].positions.is_empty());
        assert_eq!(object.geometries[0].meshes.len(), 1);
    }

    #[test]
    fn constant_animation_freezes_into_the_local_matrix() {
        let options = LoadOptions::default();
        let mut object = Object::new("animated");
        let mut animation = Animation::default();
        let pos = Vec3::new(3.0, 0.0, 0.0);
        animation.position.insert(0.0, pos, 0.0);
        animation.position.insert(10.0, pos, 0.0);
        object.animation = Some(animation);

        let scene = baked_scene(vec![object], &options);
        assert!(scene.objects[0].animation.is_none());
        let local = scene.objects[0].local;
        assert!((local.transform_point3(Vec3::ZERO) - pos).length() < 1e-6);
    }

    #[test]
    fn pivot_baking_folds_the_offset_into_local() {
        let options = LoadOptions::builder().bake_pivot(true).build();
        let mut object = triangle_object(Mat4::IDENTITY);
        object.pivot = Vec3::new(0.0, 2.0, 0.0);
        let scene = baked_scene(vec![object], &options);
        let object = &scene.objects[0];
        assert_eq!(object.pivot, Vec3::ZERO);
        // Vertices moved down by the pivot, local moves them back up.
        assert!(
            (object.local.transform_point3(object.geometries[0].positions[0])
                - Vec3::ZERO)
                .length()
                < 1e-6
        );
    }
}
