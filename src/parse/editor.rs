//! Editor section handlers: named objects, triangle meshes, materials.

use glam::{Mat4, Vec2, Vec3};
use tracing::debug;

use super::{PResult, ParseContext, chunk_err, scan_scope};
use crate::chunk::{ChunkId, ChunkReader};
use crate::options::UpAxis;
use crate::scene::{MapKind, Material, TextureMap};

pub(super) fn parse_editor(
    reader: &mut ChunkReader<'_>,
    cx: &mut ParseContext<'_>,
    end: usize,
) -> PResult {
    scan_scope(reader, end, |r, hdr| match ChunkId::from_u16(hdr.id) {
        ChunkId::ObjectBlock => handle_object(r, cx, hdr.end()),
        ChunkId::MaterialBlock => handle_material(r, cx, hdr.end()),
        ChunkId::MasterScale => {
            let scale = r.read_f32().map_err(chunk_err)?;
            cx.builder.set_conversion(Mat4::from_scale(Vec3::splat(scale)));
            Ok(())
        }
        ChunkId::MeshVersion => Ok(()),
        other => {
            debug!(?other, "skipping editor chunk");
            Ok(())
        }
    })
}

fn handle_object(reader: &mut ChunkReader<'_>, cx: &mut ParseContext<'_>, end: usize) -> PResult {
    let name = reader.read_cstring_within(end).map_err(chunk_err)?;
    cx.notify(&format!("object \"{name}\""));
    cx.builder.begin_object(&name);

    scan_scope(reader, end, |r, hdr| match ChunkId::from_u16(hdr.id) {
        ChunkId::TriMesh => handle_trimesh(r, cx, hdr.end()),
        // Lights and cameras share the object block but carry no geometry.
        other => {
            debug!(?other, object = %name, "skipping object chunk");
            Ok(())
        }
    })
}

fn handle_trimesh(reader: &mut ChunkReader<'_>, cx: &mut ParseContext<'_>, end: usize) -> PResult {
    cx.builder.begin_current_geometry();
    scan_scope(reader, end, |r, hdr| match ChunkId::from_u16(hdr.id) {
        ChunkId::VertexList => {
            let count = r.read_u16().map_err(chunk_err)? as usize;
            cx.builder.reserve_vertices(count);
            for _ in 0..count {
                let v = r.read_vec3().map_err(chunk_err)?;
                cx.builder.add_vertex(v);
            }
            Ok(())
        }
        ChunkId::FaceList => handle_face_list(r, cx, hdr.end()),
        ChunkId::TexCoordList => {
            let count = r.read_u16().map_err(chunk_err)? as usize;
            cx.builder.reserve_texcoords(count);
            for _ in 0..count {
                let u = r.read_f32().map_err(chunk_err)?;
                let v = r.read_f32().map_err(chunk_err)?;
                cx.builder.add_texcoord(Vec2::new(u, v));
            }
            Ok(())
        }
        ChunkId::LocalAxes => {
            let matrix = read_mesh_matrix(r, cx.options.up_axis)?;
            cx.builder.set_mesh_absolute(matrix);
            Ok(())
        }
        // Tolerated at this level too; canonically nested under the face list.
        ChunkId::MeshMaterialGroup => handle_material_group(r, cx, hdr.end()),
        ChunkId::SmoothingGroups => handle_smoothing(r, cx, hdr.end()),
        other => {
            debug!(?other, "skipping mesh chunk");
            Ok(())
        }
    })
}

/// Face records are always triangles: three u16 vertex indices plus a u16
/// per-face visibility flag that is consumed and discarded. The face list
/// chunk then carries nested children (material groups, smoothing groups).
fn handle_face_list(
    reader: &mut ChunkReader<'_>,
    cx: &mut ParseContext<'_>,
    end: usize,
) -> PResult {
    let count = reader.read_u16().map_err(chunk_err)? as usize;
    cx.builder.reserve_faces(count);
    for _ in 0..count {
        let a = reader.read_u16().map_err(chunk_err)?;
        let b = reader.read_u16().map_err(chunk_err)?;
        let c = reader.read_u16().map_err(chunk_err)?;
        let _visibility = reader.read_u16().map_err(chunk_err)?;
        cx.builder.add_face(a, b, c);
    }

    scan_scope(reader, end, |r, hdr| match ChunkId::from_u16(hdr.id) {
        ChunkId::MeshMaterialGroup => handle_material_group(r, cx, hdr.end()),
        ChunkId::SmoothingGroups => handle_smoothing(r, cx, hdr.end()),
        other => {
            debug!(?other, "skipping face-list chunk");
            Ok(())
        }
    })
}

fn handle_material_group(
    reader: &mut ChunkReader<'_>,
    cx: &mut ParseContext<'_>,
    end: usize,
) -> PResult {
    let material = reader.read_cstring_within(end).map_err(chunk_err)?;
    cx.builder.set_mesh_material(&material);
    // The face subset list is not kept: the mesh binds one material.
    let faces = reader.read_u16().map_err(chunk_err)? as usize;
    for _ in 0..faces {
        let _face = reader.read_u16().map_err(chunk_err)?;
    }
    Ok(())
}

/// One u32 bitmask per face, in face order.
fn handle_smoothing(reader: &mut ChunkReader<'_>, cx: &mut ParseContext<'_>, end: usize) -> PResult {
    let count = end.saturating_sub(reader.pos()) / 4;
    for _ in 0..count {
        let mask = reader.read_u32().map_err(chunk_err)?;
        cx.builder.add_smoothing_group(mask);
    }
    Ok(())
}

/// The local-axes chunk stores a 4x3 world-space matrix: three basis vectors
/// and an origin, authored in the file's Z-up frame. Remapping a matrix to
/// Y-up conjugates it by the axis swap, which besides remapping each vector
/// also exchanges the Y/Z basis slots (with a sign on the old Y basis).
fn read_mesh_matrix(
    reader: &mut ChunkReader<'_>,
    up_axis: UpAxis,
) -> Result<Mat4, super::PError> {
    let bx = reader.read_vec3().map_err(chunk_err)?;
    let by = reader.read_vec3().map_err(chunk_err)?;
    let bz = reader.read_vec3().map_err(chunk_err)?;
    let origin = reader.read_vec3().map_err(chunk_err)?;
    Ok(match up_axis {
        UpAxis::YUp => Mat4::from_cols(
            bx.extend(0.0),
            bz.extend(0.0),
            (-by).extend(0.0),
            origin.extend(1.0),
        ),
        UpAxis::ZUp => Mat4::from_cols(
            bx.extend(0.0),
            by.extend(0.0),
            bz.extend(0.0),
            origin.extend(1.0),
        ),
    })
}

fn handle_material(reader: &mut ChunkReader<'_>, cx: &mut ParseContext<'_>, end: usize) -> PResult {
    let mut material = Material::default();
    scan_scope(reader, end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::MaterialName => {
                material.name = r.read_cstring_within(hdr.end()).map_err(chunk_err)?;
            }
            ChunkId::MatAmbient => material.ambient = read_color(r, hdr.end())?,
            ChunkId::MatDiffuse => material.diffuse = read_color(r, hdr.end())?,
            ChunkId::MatSpecular => material.specular = read_color(r, hdr.end())?,
            ChunkId::MatEmission => material.emission = read_color(r, hdr.end())?,
            ChunkId::MatShininess => material.shininess = read_percent(r, hdr.end())?,
            ChunkId::MatTransparency => {
                // Stored as transparency percent; the model keeps opacity.
                material.opacity = 1.0 - read_percent(r, hdr.end())?;
            }
            ChunkId::MatTwoSided => material.two_sided = true,
            ChunkId::MapDiffuse => {
                let map = read_texture_map(r, hdr.end(), MapKind::Diffuse)?;
                material.maps.push(map);
            }
            ChunkId::MapSpecular => {
                let map = read_texture_map(r, hdr.end(), MapKind::Specular)?;
                material.maps.push(map);
            }
            ChunkId::MapOpacity => {
                let map = read_texture_map(r, hdr.end(), MapKind::Opacity)?;
                material.maps.push(map);
            }
            ChunkId::MapBump => {
                let map = read_texture_map(r, hdr.end(), MapKind::Bump)?;
                material.maps.push(map);
            }
            other => debug!(?other, "skipping material chunk"),
        }
        Ok(())
    })?;

    debug!(material = %material.name, maps = material.maps.len(), "parsed material");
    cx.builder.add_material(material);
    Ok(())
}

/// Color payloads come as nested chunks, float or byte form, with optional
/// gamma-corrected variants. The last recognized payload wins.
fn read_color(
    reader: &mut ChunkReader<'_>,
    end: usize,
) -> Result<[f32; 3], super::PError> {
    let mut color = [0.0f32; 3];
    scan_scope(reader, end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::ColorFloat | ChunkId::ColorFloatGamma => {
                for channel in &mut color {
                    *channel = r.read_f32().map_err(chunk_err)?;
                }
            }
            ChunkId::ColorByte | ChunkId::ColorByteGamma => {
                for channel in &mut color {
                    *channel = r.read_u8().map_err(chunk_err)? as f32 / 255.0;
                }
            }
            other => debug!(?other, "skipping color chunk"),
        }
        Ok(())
    })?;
    Ok(color)
}

/// Percent payloads: u16 0..100 or f32 0..100, normalized to 0..1.
fn read_percent(
    reader: &mut ChunkReader<'_>,
    end: usize,
) -> Result<f32, super::PError> {
    let mut value = 0.0f32;
    scan_scope(reader, end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::PercentInt => value = r.read_u16().map_err(chunk_err)? as f32 / 100.0,
            ChunkId::PercentFloat => value = r.read_f32().map_err(chunk_err)? / 100.0,
            other => debug!(?other, "skipping percent chunk"),
        }
        Ok(())
    })?;
    Ok(value)
}

fn read_texture_map(
    reader: &mut ChunkReader<'_>,
    end: usize,
    kind: MapKind,
) -> Result<TextureMap, super::PError> {
    let mut map = TextureMap::new(kind);
    scan_scope(reader, end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::MapFile => map.file = r.read_cstring_within(hdr.end()).map_err(chunk_err)?,
            ChunkId::MapUScale => map.uv_scale.x = r.read_f32().map_err(chunk_err)?,
            ChunkId::MapVScale => map.uv_scale.y = r.read_f32().map_err(chunk_err)?,
            ChunkId::MapUOffset => map.uv_offset.x = r.read_f32().map_err(chunk_err)?,
            ChunkId::MapVOffset => map.uv_offset.y = r.read_f32().map_err(chunk_err)?,
            ChunkId::MapRotation => {
                // Stored in degrees.
                map.rotation = r.read_f32().map_err(chunk_err)?.to_radians();
            }
            // Map amount percent and filtering chunks are not modeled.
            other => debug!(?other, "skipping texture map chunk"),
        }
        Ok(())
    })?;
    Ok(map)
}
