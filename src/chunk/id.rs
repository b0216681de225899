//! Chunk id table for the binary scene container.
//!
//! Every chunk starts with a 2-byte id. Ids the loader does not recognize map
//! to [`ChunkId::Unknown`] and are skipped by declared length, never treated
//! as errors.

/// Known chunk ids, tagged by section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkId {
    /// `0x4D4D` -- top-level container.
    Main,
    /// `0x3D3D` -- editor section (objects, meshes, materials).
    Editor,
    /// `0x3D3E` -- editor mesh version tag.
    MeshVersion,
    /// `0x0100` -- master scale factor.
    MasterScale,
    /// `0x4000` -- named object block.
    ObjectBlock,
    /// `0x4100` -- triangle mesh inside an object block.
    TriMesh,
    /// `0x4110` -- vertex list (u16 count, then count * 3 floats).
    VertexList,
    /// `0x4120` -- face list (u16 count, then count * 4 u16s).
    FaceList,
    /// `0x4130` -- per-mesh material group (name + face index list).
    MeshMaterialGroup,
    /// `0x4140` -- texture coordinate list (u16 count, then count * 2 floats).
    TexCoordList,
    /// `0x4150` -- per-face smoothing group bitmasks (one u32 per face).
    SmoothingGroups,
    /// `0x4160` -- mesh local axes: 4x3 world-space matrix.
    LocalAxes,
    /// `0xAFFF` -- material block.
    MaterialBlock,
    /// `0xA000` -- material name.
    MaterialName,
    /// `0xA010` -- ambient color.
    MatAmbient,
    /// `0xA020` -- diffuse color.
    MatDiffuse,
    /// `0xA030` -- specular color.
    MatSpecular,
    /// `0xA080` -- emissive (self-illumination) color.
    MatEmission,
    /// `0xA040` -- shininess percent.
    MatShininess,
    /// `0xA050` -- transparency percent.
    MatTransparency,
    /// `0xA081` -- two-sided flag (presence-only chunk).
    MatTwoSided,
    /// `0xA200` -- diffuse texture map block.
    MapDiffuse,
    /// `0xA230` -- bump map block.
    MapBump,
    /// `0xA204` -- specular map block.
    MapSpecular,
    /// `0xA210` -- opacity map block.
    MapOpacity,
    /// `0xA300` -- texture map file name.
    MapFile,
    /// `0xA354` -- texture map U scale.
    MapUScale,
    /// `0xA356` -- texture map V scale.
    MapVScale,
    /// `0xA358` -- texture map U offset.
    MapUOffset,
    /// `0xA35A` -- texture map V offset.
    MapVOffset,
    /// `0xA35C` -- texture map rotation angle.
    MapRotation,
    /// `0x0010` -- color payload, 3 floats.
    ColorFloat,
    /// `0x0011` -- color payload, 3 bytes.
    ColorByte,
    /// `0x0012` -- gamma-corrected color payload, 3 bytes.
    ColorByteGamma,
    /// `0x0013` -- gamma-corrected color payload, 3 floats.
    ColorFloatGamma,
    /// `0x0030` -- percent payload, u16.
    PercentInt,
    /// `0x0031` -- percent payload, f32.
    PercentFloat,
    /// `0xB000` -- keyframer section.
    Keyframer,
    /// `0xB002` -- object node block.
    ObjectNode,
    /// `0xB008` -- start/end frame range.
    StartEndFrame,
    /// `0xB010` -- node header: instance name, flags, parent id.
    NodeHeader,
    /// `0xB011` -- instance name override for dummy nodes.
    InstanceName,
    /// `0xB013` -- pivot offset.
    Pivot,
    /// `0xB020` -- position track.
    PositionTrack,
    /// `0xB021` -- rotation track (angle-axis keys).
    RotationTrack,
    /// `0xB022` -- scale track.
    ScaleTrack,
    /// `0xB030` -- node id.
    NodeId,
    /// Any id not listed above; skipped by declared length.
    Unknown(u16),
}

impl ChunkId {
    pub fn from_u16(id: u16) -> ChunkId {
        match id {
            0x4D4D => ChunkId::Main,
            0x3D3D => ChunkId::Editor,
            0x3D3E => ChunkId::MeshVersion,
            0x0100 => ChunkId::MasterScale,
            0x4000 => ChunkId::ObjectBlock,
            0x4100 => ChunkId::TriMesh,
            0x4110 => ChunkId::VertexList,
            0x4120 => ChunkId::FaceList,
            0x4130 => ChunkId::MeshMaterialGroup,
            0x4140 => ChunkId::TexCoordList,
            0x4150 => ChunkId::SmoothingGroups,
            0x4160 => ChunkId::LocalAxes,
            0xAFFF => ChunkId::MaterialBlock,
            0xA000 => ChunkId::MaterialName,
            0xA010 => ChunkId::MatAmbient,
            0xA020 => ChunkId::MatDiffuse,
            0xA030 => ChunkId::MatSpecular,
            0xA080 => ChunkId::MatEmission,
            0xA040 => ChunkId::MatShininess,
            0xA050 => ChunkId::MatTransparency,
            0xA081 => ChunkId::MatTwoSided,
            0xA200 => ChunkId::MapDiffuse,
            0xA230 => ChunkId::MapBump,
            0xA204 => ChunkId::MapSpecular,
            0xA210 => ChunkId::MapOpacity,
            0xA300 => ChunkId::MapFile,
            0xA354 => ChunkId::MapUScale,
            0xA356 => ChunkId::MapVScale,
            0xA358 => ChunkId::MapUOffset,
            0xA35A => ChunkId::MapVOffset,
            0xA35C => ChunkId::MapRotation,
            0x0010 => ChunkId::ColorFloat,
            0x0011 => ChunkId::ColorByte,
            0x0012 => ChunkId::ColorByteGamma,
            0x0013 => ChunkId::ColorFloatGamma,
            0x0030 => ChunkId::PercentInt,
            0x0031 => ChunkId::PercentFloat,
            0xB000 => ChunkId::Keyframer,
            0xB002 => ChunkId::ObjectNode,
            0xB008 => ChunkId::StartEndFrame,
            0xB010 => ChunkId::NodeHeader,
            0xB011 => ChunkId::InstanceName,
            0xB013 => ChunkId::Pivot,
            0xB020 => ChunkId::PositionTrack,
            0xB021 => ChunkId::RotationTrack,
            0xB022 => ChunkId::ScaleTrack,
            0xB030 => ChunkId::NodeId,
            other => ChunkId::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ids_round_trip() {
        assert_eq!(ChunkId::from_u16(0x4D4D), ChunkId::Main);
        assert_eq!(ChunkId::from_u16(0x4110), ChunkId::VertexList);
        assert_eq!(ChunkId::from_u16(0xB021), ChunkId::RotationTrack);
    }

    #[test]
    fn unknown_id_is_tagged_not_an_error() {
        assert_eq!(ChunkId::from_u16(0x7777), ChunkId::Unknown(0x7777));
    }
}
