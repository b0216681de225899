//! Keyframer section handlers: object nodes, hierarchy links, track data.
//!
//! Track chunks carry sparse per-axis samples (rotation as angle-axis) which
//! the animation baker converts into the neutral three-axis track model as
//! each node block closes.

use glam::Vec3;
use tracing::debug;

use super::{PResult, ParseContext, chunk_err, scan_scope};
use crate::bake::anim::{self, RotationSample, VectorSample};
use crate::chunk::{ChunkId, ChunkReader};
use crate::options::UpAxis;
use crate::scene::NO_PARENT;

/// Instance name marking a transform-only placeholder node.
pub const DUMMY_NAME: &str = "$$$DUMMY";

/// Scratch for one object-node block, committed when the block closes.
struct NodeRecord {
    name: String,
    instance: String,
    node_id: Option<i32>,
    parent_id: i32,
    pivot: Vec3,
    position: Vec<VectorSample>,
    rotation: Vec<RotationSample>,
    scaling: Vec<VectorSample>,
}

impl NodeRecord {
    fn new() -> NodeRecord {
        NodeRecord {
            name: String::new(),
            instance: String::new(),
            node_id: None,
            parent_id: NO_PARENT,
            pivot: Vec3::ZERO,
            position: Vec::new(),
            rotation: Vec::new(),
            scaling: Vec::new(),
        }
    }
}

pub(super) fn parse_keyframer(
    reader: &mut ChunkReader<'_>,
    cx: &mut ParseContext<'_>,
    end: usize,
) -> PResult {
    scan_scope(reader, end, |r, hdr| match ChunkId::from_u16(hdr.id) {
        ChunkId::ObjectNode => handle_object_node(r, cx, hdr.end()),
        ChunkId::StartEndFrame => {
            let start = r.read_u32().map_err(chunk_err)?;
            let stop = r.read_u32().map_err(chunk_err)?;
            cx.builder.set_frame_range(start, stop);
            Ok(())
        }
        other => {
            debug!(?other, "skipping keyframer chunk");
            Ok(())
        }
    })
}

fn handle_object_node(
    reader: &mut ChunkReader<'_>,
    cx: &mut ParseContext<'_>,
    end: usize,
) -> PResult {
    let mut record = NodeRecord::new();
    let up_axis = cx.options.up_axis;

    scan_scope(reader, end, |r, hdr| {
        match ChunkId::from_u16(hdr.id) {
            ChunkId::NodeId => {
                record.node_id = Some(r.read_u16().map_err(chunk_err)? as i32);
            }
            ChunkId::NodeHeader => {
                record.name = r.read_cstring_within(hdr.end()).map_err(chunk_err)?;
                let _flags1 = r.read_u16().map_err(chunk_err)?;
                let _flags2 = r.read_u16().map_err(chunk_err)?;
                let parent = r.read_u16().map_err(chunk_err)?;
                record.parent_id = if parent == 0xFFFF {
                    NO_PARENT
                } else {
                    parent as i32
                };
            }
            ChunkId::InstanceName => {
                record.instance = r.read_cstring_within(hdr.end()).map_err(chunk_err)?;
            }
            ChunkId::Pivot => {
                record.pivot = r.read_vec3().map_err(chunk_err)?;
            }
            ChunkId::PositionTrack => {
                record.position = read_vector_track(r, |r| r.read_vec3().map_err(chunk_err))?;
            }
            ChunkId::ScaleTrack => {
                record.scaling = read_vector_track(r, |r| read_scale(r, up_axis))?;
            }
            ChunkId::RotationTrack => {
                record.rotation = read_rotation_track(r)?;
            }
            other => debug!(?other, "skipping node chunk"),
        }
        Ok(())
    })?;

    commit_node(cx, record);
    Ok(())
}

fn commit_node(cx: &mut ParseContext<'_>, record: NodeRecord) {
    let dummy = record.name == DUMMY_NAME;
    let display_name = if dummy && !record.instance.is_empty() {
        record.instance.as_str()
    } else {
        record.name.as_str()
    };
    cx.notify(&format!("node \"{display_name}\""));

    let handle = cx.builder.object_for_node(display_name, dummy);
    // Nodes without an explicit id chunk are numbered in file order.
    let node_id = record.node_id.unwrap_or(cx.next_node_id);
    cx.next_node_id = cx.next_node_id.max(node_id) + 1;

    let object = cx.builder.object_at_mut(handle);
    object.node_id = node_id;
    object.parent_id = record.parent_id;
    object.pivot = record.pivot;
    object.animation = anim::bake_animation(&record.position, &record.rotation, &record.scaling);
}

/// Track header: u16 flags, 8 reserved bytes, u32 key count. Each key is a
/// u32 frame number plus u16 spline flags; every set bit among the low five
/// adds one f32 spline parameter (tension, continuity, bias, ease to/from).
fn read_track_header(reader: &mut ChunkReader<'_>) -> Result<usize, super::PError> {
    let _flags = reader.read_u16().map_err(chunk_err)?;
    let _reserved0 = reader.read_u32().map_err(chunk_err)?;
    let _reserved1 = reader.read_u32().map_err(chunk_err)?;
    let keys = reader.read_u32().map_err(chunk_err)? as usize;
    Ok(keys)
}

/// Read one key's frame number and spline parameters; returns the frame time
/// and the tension parameter (the only spline parameter the model keeps).
fn read_key_prefix(reader: &mut ChunkReader<'_>) -> Result<(f32, f32), super::PError> {
    let frame = reader.read_u32().map_err(chunk_err)? as f32;
    let spline_flags = reader.read_u16().map_err(chunk_err)?;
    let mut tension = 0.0;
    for bit in 0..5 {
        if spline_flags & (1 << bit) != 0 {
            let param = reader.read_f32().map_err(chunk_err)?;
            if bit == 0 {
                tension = param;
            }
        }
    }
    Ok((frame, tension))
}

fn read_vector_track<F>(
    reader: &mut ChunkReader<'_>,
    mut read_value: F,
) -> Result<Vec<VectorSample>, super::PError>
where
    F: FnMut(&mut ChunkReader<'_>) -> Result<Vec3, super::PError>,
{
    let count = read_track_header(reader)?;
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let (time, tension) = read_key_prefix(reader)?;
        let value = read_value(reader)?;
        samples.push(VectorSample {
            time,
            value,
            tension,
        });
    }
    Ok(samples)
}

fn read_rotation_track(reader: &mut ChunkReader<'_>) -> Result<Vec<RotationSample>, super::PError> {
    let count = read_track_header(reader)?;
    let mut samples = Vec::with_capacity(count);
    for _ in 0..count {
        let (time, tension) = read_key_prefix(reader)?;
        let angle = reader.read_f32().map_err(chunk_err)?;
        let axis = reader.read_vec3().map_err(chunk_err)?;
        samples.push(RotationSample {
            time,
            angle,
            axis,
            tension,
        });
    }
    Ok(samples)
}

/// Scale components are per-axis magnitudes: the up-axis swap permutes them
/// with the axes but carries no sign, unlike a point or direction remap.
fn read_scale(reader: &mut ChunkReader<'_>, up_axis: UpAxis) -> Result<Vec3, super::PError> {
    let x = reader.read_f32().map_err(chunk_err)?;
    let y = reader.read_f32().map_err(chunk_err)?;
    let z = reader.read_f32().map_err(chunk_err)?;
    Ok(match up_axis {
        UpAxis::YUp => Vec3::new(x, z, y),
        UpAxis::ZUp => Vec3::new(x, y, z),
    })
}
