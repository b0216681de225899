//! Per-vertex normal synthesis driven by smoothing-group membership.
//!
//! Three policies, chosen per geometry:
//! - no smoothing data (or synthesis disabled): split every vertex per face
//!   and assign flat normals;
//! - one group over all faces: area-weighted averaging over the shared
//!   vertices, no duplication;
//! - several groups: duplicate each vertex once per group that uses it,
//!   regroup faces contiguously by group, then average within each group so
//!   boundaries keep a hard edge.

use std::collections::HashMap;

use glam::{Vec2, Vec3};
use itertools::Itertools;
use thiserror::Error;
use tracing::warn;

use crate::options::LoadOptions;
use crate::scene::{Geometry, Object, Scene, VertexPool, VertexSource};

/// Per-geometry synthesis failures. The geometry is skipped, the scene
/// continues.
#[derive(Debug, Error)]
pub enum NormalError {
    #[error("geometry has no vertices")]
    NoVertices,
    #[error("geometry has no faces")]
    NoFaces,
    #[error("{count} distinct smoothing groups exceed the configured limit of {limit}")]
    TooManyGroups { count: usize, limit: usize },
}

/// Synthesize normals for every geometry in the scene.
pub fn synthesize_normals(scene: &mut Scene, options: &LoadOptions) {
    for object in &mut scene.objects {
        synthesize_object(object, options);
    }
}

fn synthesize_object(object: &mut Object, options: &LoadOptions) {
    let mut pool = object.shared_pool.as_mut();
    for geometry in &mut object.geometries {
        if let Err(e) = synthesize_geometry(geometry, pool.as_deref_mut(), options) {
            warn!(geometry = %geometry.name, error = %e, "skipping normal synthesis");
        }
    }
}

fn synthesize_geometry(
    geometry: &mut Geometry,
    mut pool: Option<&mut VertexPool>,
    options: &LoadOptions,
) -> Result<(), NormalError> {
    let face_count: usize = geometry.meshes.iter().map(|m| m.face_count()).sum();
    if face_count == 0 {
        return Err(NormalError::NoFaces);
    }

    let positions: Vec<Vec3> = match geometry.source {
        VertexSource::Owned => geometry.positions.clone(),
        VertexSource::SharedPool => pool
            .as_ref()
            .map(|p| p.positions.clone())
            .unwrap_or_default(),
    };
    if positions.is_empty() {
        return Err(NormalError::NoVertices);
    }
    let mut texcoords: Vec<Vec2> = match geometry.source {
        VertexSource::Owned => geometry.texcoords.clone(),
        VertexSource::SharedPool => pool
            .as_ref()
            .map(|p| p.texcoords.clone())
            .unwrap_or_default(),
    };
    // A texcoord list shorter than the vertex list cannot be indexed by the
    // faces; treat it as absent rather than reading past it.
    if !texcoords.is_empty() && texcoords.len() < positions.len() {
        warn!(
            geometry = %geometry.name,
            texcoords = texcoords.len(),
            vertices = positions.len(),
            "texcoord list shorter than the vertex list, dropping texcoords"
        );
        texcoords.clear();
        match geometry.source {
            VertexSource::Owned => geometry.texcoords.clear(),
            VertexSource::SharedPool => {
                if let Some(pool) = pool.as_deref_mut() {
                    pool.texcoords.clear();
                }
            }
        }
    }

    let has_groups = options.synthesize_normals
        && geometry.meshes.iter().any(|m| !m.smoothing_groups.is_empty());

    if !has_groups {
        split_flat(geometry, &positions, &texcoords);
        return Ok(());
    }

    // Remap distinct group masks onto a dense 0..N-1 range, in order of
    // first appearance over the concatenated face list.
    let mut group_ids: Vec<u32> = Vec::new();
    for mesh in &geometry.meshes {
        for face in 0..mesh.face_count() {
            let mask = mesh.smoothing_groups.get(face).copied().unwrap_or(0);
            if !group_ids.contains(&mask) {
                group_ids.push(mask);
            }
        }
    }
    if group_ids.len() > options.max_smoothing_groups {
        return Err(NormalError::TooManyGroups {
            count: group_ids.len(),
            limit: options.max_smoothing_groups,
        });
    }

    if group_ids.len() == 1 {
        average_single_group(geometry, &positions, pool);
    } else {
        split_by_group(geometry, &positions, &texcoords, &group_ids);
    }
    Ok(())
}

/// Normal of one triangle: the unnormalized cross product of two edges,
/// normalized unless the face is degenerate (zero area stays a zero vector).
fn face_cross(positions: &[Vec3], a: u32, b: u32, c: u32) -> Vec3 {
    let (a, b, c) = (
        positions[a as usize],
        positions[b as usize],
        positions[c as usize],
    );
    (b - a).cross(c - a)
}

/// Vertex splitting with flat normals: every face gets its own three
/// vertices carrying the face normal.
fn split_flat(geometry: &mut Geometry, positions: &[Vec3], texcoords: &[Vec2]) {
    let mut new_positions = Vec::new();
    let mut new_texcoords = Vec::new();
    let mut new_normals = Vec::new();

    for mesh in &mut geometry.meshes {
        let mut indices = Vec::with_capacity(mesh.vertex_indices.len());
        for (a, b, c) in mesh.vertex_indices.iter().copied().tuples() {
            let normal = face_cross(positions, a, b, c).normalize_or_zero();
            for v in [a, b, c] {
                indices.push(new_positions.len() as u32);
                new_positions.push(positions[v as usize]);
                if !texcoords.is_empty() {
                    new_texcoords.push(texcoords[v as usize]);
                }
                new_normals.push(normal);
            }
        }
        mesh.vertex_indices = indices.clone();
        mesh.normal_indices = indices.clone();
        mesh.texcoord_indices = if new_texcoords.is_empty() {
            Vec::new()
        } else {
            indices
        };
    }

    geometry.positions = new_positions;
    geometry.texcoords = new_texcoords;
    geometry.normals = new_normals;
    // Splitting de-shares a pooled geometry by construction.
    geometry.source = VertexSource::Owned;
}

/// Area-weighted averaging over the shared vertex set: each vertex's normal
/// is the normalized sum of the unnormalized cross products of every face
/// using it.
fn average_single_group(
    geometry: &mut Geometry,
    positions: &[Vec3],
    pool: Option<&mut VertexPool>,
) {
    let mut sums = vec![Vec3::ZERO; positions.len()];
    for mesh in &geometry.meshes {
        for (a, b, c) in mesh.vertex_indices.iter().copied().tuples() {
            let cross = face_cross(positions, a, b, c);
            for v in [a, b, c] {
                sums[v as usize] += cross;
            }
        }
    }
    let normals: Vec<Vec3> = sums.into_iter().map(|s| s.normalize_or_zero()).collect();

    let has_texcoords = match geometry.source {
        VertexSource::Owned => !geometry.texcoords.is_empty(),
        VertexSource::SharedPool => pool.as_ref().is_some_and(|p| !p.texcoords.is_empty()),
    };
    for mesh in &mut geometry.meshes {
        mesh.normal_indices = mesh.vertex_indices.clone();
        if has_texcoords {
            mesh.texcoord_indices = mesh.vertex_indices.clone();
        }
    }

    match geometry.source {
        VertexSource::Owned => geometry.normals = normals,
        VertexSource::SharedPool => {
            if let Some(pool) = pool {
                pool.normals = normals;
            }
        }
    }
}

/// Multi-group splitting: one duplicate per (vertex, group) pair actually
/// used, faces regrouped contiguously by dense group id, then single-group
/// averaging run independently inside each group's subrange.
fn split_by_group(
    geometry: &mut Geometry,
    positions: &[Vec3],
    texcoords: &[Vec2],
    group_ids: &[u32],
) {
    let group_of = |mask: u32| -> usize {
        group_ids.iter().position(|&g| g == mask).unwrap_or(0)
    };

    let mut new_positions: Vec<Vec3> = Vec::new();
    let mut new_texcoords: Vec<Vec2> = Vec::new();
    let mut duplicates: HashMap<(u32, usize), u32> = HashMap::new();

    // Per mesh, faces listed group-major so each group's vertices and faces
    // form contiguous runs.
    let mesh_count = geometry.meshes.len();
    let mut new_faces: Vec<Vec<u32>> = vec![Vec::new(); mesh_count];
    let mut new_masks: Vec<Vec<u32>> = vec![Vec::new(); mesh_count];
    let mut sums: Vec<Vec3> = Vec::new();

    for group in 0..group_ids.len() {
        for (mesh_index, mesh) in geometry.meshes.iter().enumerate() {
            for (face, (a, b, c)) in mesh.vertex_indices.iter().copied().tuples().enumerate() {
                let mask = mesh.smoothing_groups.get(face).copied().unwrap_or(0);
                if group_of(mask) != group {
                    continue;
                }
                let cross = face_cross(positions, a, b, c);
                for v in [a, b, c] {
                    let next = new_positions.len() as u32;
                    let index = *duplicates.entry((v, group)).or_insert_with(|| {
                        new_positions.push(positions[v as usize]);
                        if !texcoords.is_empty() {
                            new_texcoords.push(texcoords[v as usize]);
                        }
                        sums.push(Vec3::ZERO);
                        next
                    });
                    sums[index as usize] += cross;
                    new_faces[mesh_index].push(index);
                }
                new_masks[mesh_index].push(mask);
            }
        }
    }

    let normals: Vec<Vec3> = sums.into_iter().map(|s| s.normalize_or_zero()).collect();

    for (mesh, (faces, masks)) in geometry
        .meshes
        .iter_mut()
        .zip(new_faces.into_iter().zip(new_masks))
    {
        mesh.vertex_indices = faces.clone();
        mesh.normal_indices = faces.clone();
        mesh.texcoord_indices = if new_texcoords.is_empty() { Vec::new() } else { faces };
        mesh.smoothing_groups = masks;
    }

    geometry.positions = new_positions;
    geometry.texcoords = new_texcoords;
    geometry.normals = normals;
    geometry.source = VertexSource::Owned;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Mesh, VertexPool};

    /// Two triangles sharing the edge (1, 2): a flat quad in the XZ plane
    /// folded up so the face normals differ.
    fn folded_quad(groups: &[u32]) -> Geometry {
        let mut geometry = Geometry::new("quad");
        geometry.positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(2.0, 1.0, 0.0),
        ];
        let mut mesh = Mesh::default();
        mesh.vertex_indices = vec![0, 1, 2, 1, 3, 2];
        mesh.smoothing_groups = groups.to_vec();
        geometry.meshes.push(mesh);
        geometry
    }

    fn face_normal(positions: &[Vec3], a: u32, b: u32, c: u32) -> Vec3 {
        face_cross(positions, a, b, c).normalize_or_zero()
    }

    #[test]
    fn no_groups_splits_every_vertex_with_flat_normals() {
        let mut geometry = folded_quad(&[]);
        let options = LoadOptions::default();
        synthesize_geometry(&mut geometry, None, &options).unwrap();

        assert_eq!(geometry.positions.len(), 6);
        assert_eq!(geometry.normals.len(), 6);
        let mesh = &geometry.meshes[0];
        assert_eq!(mesh.vertex_indices, vec![0, 1, 2, 3, 4, 5]);
        // All three normals of one face are that face's flat normal.
        assert_eq!(geometry.normals[0], geometry.normals[1]);
        assert_eq!(geometry.normals[0], geometry.normals[2]);
        assert_ne!(geometry.normals[0], geometry.normals[3]);
    }

    #[test]
    fn single_group_averages_across_the_shared_edge() {
        let mut geometry = folded_quad(&[1, 1]);
        let options = LoadOptions::default();
        let n0 = face_normal(&geometry.positions, 0, 1, 2);
        let n1 = face_normal(&geometry.positions, 1, 3, 2);
        // Unnormalized cross products weight the average.
        let c0 = face_cross(&geometry.positions, 0, 1, 2);
        let c1 = face_cross(&geometry.positions, 1, 3, 2);

        synthesize_geometry(&mut geometry, None, &options).unwrap();

        // No duplication for a single group.
        assert_eq!(geometry.positions.len(), 4);
        let expected = (c0 + c1).normalize();
        assert!((geometry.normals[1] - expected).length() < 1e-6);
        assert!((geometry.normals[2] - expected).length() < 1e-6);
        // Unshared corners keep their own face's normal.
        assert!((geometry.normals[0] - n0).length() < 1e-6);
        assert!((geometry.normals[3] - n1).length() < 1e-6);
    }

    #[test]
    fn two_groups_split_the_shared_edge_into_a_hard_edge() {
        let mut geometry = folded_quad(&[1, 2]);
        let options = LoadOptions::default();
        let n0 = face_normal(&geometry.positions, 0, 1, 2);
        let n1 = face_normal(&geometry.positions, 1, 3, 2);

        synthesize_geometry(&mut geometry, None, &options).unwrap();

        // Shared vertices 1 and 2 duplicated once per group: 3 + 3.
        assert_eq!(geometry.positions.len(), 6);
        let mesh = &geometry.meshes[0];
        // Faces regrouped contiguously; every normal in the first face is
        // the first flat normal, every normal in the second is the second.
        for &i in &mesh.normal_indices[0..3] {
            assert!((geometry.normals[i as usize] - n0).length() < 1e-6);
        }
        for &i in &mesh.normal_indices[3..6] {
            assert!((geometry.normals[i as usize] - n1).length() < 1e-6);
        }
    }

    #[test]
    fn degenerate_face_keeps_a_zero_normal() {
        let mut geometry = Geometry::new("line");
        geometry.positions = vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
        let mut mesh = Mesh::default();
        mesh.vertex_indices = vec![0, 1, 2];
        geometry.meshes.push(mesh);

        let options = LoadOptions::default();
        synthesize_geometry(&mut geometry, None, &options).unwrap();
        assert_eq!(geometry.normals[0], Vec3::ZERO);
    }

    #[test]
    fn zero_faces_or_vertices_abort_that_geometry_only() {
        let options = LoadOptions::default();

        let mut empty = Geometry::new("empty");
        assert!(matches!(
            synthesize_geometry(&mut empty, None, &options),
            Err(NormalError::NoFaces)
        ));

        let mut no_vertices = Geometry::new("novertices");
        let mut mesh = Mesh::default();
        mesh.vertex_indices = vec![0, 1, 2];
        no_vertices.meshes.push(mesh);
        assert!(matches!(
            synthesize_geometry(&mut no_vertices, None, &options),
            Err(NormalError::NoVertices)
        ));
    }

    #[test]
    fn group_count_over_the_limit_is_rejected() {
        let mut geometry = folded_quad(&[1, 2]);
        let options = LoadOptions::builder().max_smoothing_groups(1).build();
        assert!(matches!(
            synthesize_geometry(&mut geometry, None, &options),
            Err(NormalError::TooManyGroups { count: 2, limit: 1 })
        ));
    }

    #[test]
    fn texcoord_list_shorter_than_the_vertices_is_dropped() {
        let mut geometry = folded_quad(&[]);
        geometry.texcoords = vec![glam::Vec2::ZERO];
        let options = LoadOptions::default();
        synthesize_geometry(&mut geometry, None, &options).unwrap();

        assert_eq!(geometry.positions.len(), 6);
        assert!(geometry.texcoords.is_empty());
        assert!(geometry.meshes[0].texcoord_indices.is_empty());
    }

    /// The folded quad with its vertices moved onto an object-level pool.
    fn pooled_quad(groups: &[u32]) -> (Geometry, VertexPool) {
        let owned = folded_quad(groups);
        let mut geometry = Geometry::new("pooled");
        geometry.meshes = owned.meshes;
        geometry.source = VertexSource::SharedPool;
        let pool = VertexPool {
            positions: owned.positions,
            ..VertexPool::default()
        };
        (geometry, pool)
    }

    #[test]
    fn single_group_on_a_pool_writes_pool_normals() {
        let (mut geometry, mut pool) = pooled_quad(&[1, 1]);
        let options = LoadOptions::default();
        synthesize_geometry(&mut geometry, Some(&mut pool), &options).unwrap();

        // Averaging keeps the pool shared and parallel to its positions.
        assert_eq!(geometry.source, VertexSource::SharedPool);
        assert!(geometry.normals.is_empty());
        assert_eq!(pool.normals.len(), pool.positions.len());
        for normal in &pool.normals {
            assert!((normal.length() - 1.0).abs() < 1e-6);
        }
        let mesh = &geometry.meshes[0];
        assert_eq!(mesh.normal_indices, mesh.vertex_indices);
    }

    #[test]
    fn flat_split_unshares_a_pooled_geometry() {
        let (mut geometry, mut pool) = pooled_quad(&[]);
        let options = LoadOptions::default();
        synthesize_geometry(&mut geometry, Some(&mut pool), &options).unwrap();

        assert_eq!(geometry.source, VertexSource::Owned);
        assert_eq!(geometry.positions.len(), 6);
        assert_eq!(geometry.normals.len(), 6);
        // The pool keeps its vertices for sibling geometries.
        assert_eq!(pool.positions.len(), 4);
    }

    #[test]
    fn disabled_synthesis_still_produces_flat_normals() {
        let mut geometry = folded_quad(&[1, 1]);
        let options = LoadOptions::builder().synthesize_normals(false).build();
        synthesize_geometry(&mut geometry, None, &options).unwrap();
        // Split, not averaged, despite the single smoothing group.
        assert_eq!(geometry.positions.len(), 6);
    }
}
