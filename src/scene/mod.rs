//! Neutral in-memory scene graph.
//!
//! The model is arena-style: a [`Scene`] owns a flat `Vec<Object>`, and all
//! parent/child relationships are [`ObjectHandle`] indexes into that arena.
//! Objects own their geometries; a geometry owns its vertex arrays unless the
//! object runs in shared-pool mode, in which case the arrays live on the
//! object and geometries reference them through accessors.

/// Keyframe track model.
pub mod animation;
/// Accumulates parsed primitives into the data model.
pub mod builder;
/// Parent/child reconstruction from flat ids.
pub mod hierarchy;

use glam::{Mat4, Vec2, Vec3};

pub use animation::{Animation, KeyTrack, Keyframe, Transform, VectorTrack};

/// Stable index of an [`Object`] within its [`Scene`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectHandle(pub usize);

/// Parent id value marking an object as a root.
pub const NO_PARENT: i32 = -1;

/// Root container for one loaded file.
///
/// Built once per load call, mutated by every pipeline pass, and never
/// mutated after the load returns.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scene {
    pub objects: Vec<Object>,
    /// Handles of every object whose parent id is negative or unresolved.
    pub roots: Vec<ObjectHandle>,
    pub materials: Vec<Material>,
    /// Name of an external material library. The binary container defines
    /// materials inline and never sets this; it exists for front ends whose
    /// formats reference a separate library file.
    pub material_library: String,
    /// Global conversion applied by consumers (master scale folded in here).
    pub conversion: Mat4,
    /// Keyframer start/end frame range, when the file carries one.
    pub frame_range: Option<(u32, u32)>,
}

impl Scene {
    pub fn new() -> Scene {
        Scene {
            conversion: Mat4::IDENTITY,
            ..Default::default()
        }
    }

    pub fn object(&self, handle: ObjectHandle) -> &Object {
        &self.objects[handle.0]
    }

    pub fn object_mut(&mut self, handle: ObjectHandle) -> &mut Object {
        &mut self.objects[handle.0]
    }

    /// Find an object by its editor name.
    pub fn find_object(&self, name: &str) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(ObjectHandle)
    }

    /// Find an object by its keyframer node id.
    pub fn find_object_by_node_id(&self, node_id: i32) -> Option<ObjectHandle> {
        self.objects
            .iter()
            .position(|o| o.node_id == node_id)
            .map(ObjectHandle)
    }

    pub fn find_material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }
}

/// Per-object vertex/normal/texcoord pool shared by all of the object's
/// geometries when shared-pool mode is active.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VertexPool {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub texcoords: Vec<Vec2>,
}

/// One node of the scene graph.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Object {
    pub name: String,
    /// Keyframer node id; `-1` when the object never appears in the
    /// keyframer section.
    pub node_id: i32,
    /// Keyframer parent node id. Negative means root.
    pub parent_id: i32,
    /// Pivot offset about which rotation/scaling are expressed.
    pub pivot: Vec3,
    /// Local transform: `child_world = parent_world * child_local`.
    pub local: Mat4,
    pub animation: Option<Animation>,
    pub skin: Option<Skin>,
    pub geometries: Vec<Geometry>,
    pub children: Vec<ObjectHandle>,
    /// When set, geometries reference this pool instead of owning arrays.
    pub shared_pool: Option<VertexPool>,
    /// Placeholder node carrying only a transform (no authored geometry).
    pub dummy: bool,
}

impl Object {
    pub fn new(name: impl Into<String>) -> Object {
        Object {
            name: name.into(),
            node_id: NO_PARENT,
            parent_id: NO_PARENT,
            pivot: Vec3::ZERO,
            local: Mat4::IDENTITY,
            animation: None,
            skin: None,
            geometries: Vec::new(),
            children: Vec::new(),
            shared_pool: None,
            dummy: false,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id < 0
    }

    /// Whether any geometry of this object carries mesh data.
    pub fn has_mesh_data(&self) -> bool {
        self.geometries
            .iter()
            .any(|g| !g.meshes.is_empty() && !self.positions_of(g).is_empty())
    }

    /// Effective vertex positions of `geometry`, resolving shared-pool mode.
    pub fn positions_of<'a>(&'a self, geometry: &'a Geometry) -> &'a [Vec3] {
        match geometry.source {
            VertexSource::Owned => &geometry.positions,
            VertexSource::SharedPool => {
                self.shared_pool.as_ref().map(|p| &p.positions[..]).unwrap_or(&[])
            }
        }
    }

    /// Effective normals of `geometry`, resolving shared-pool mode.
    pub fn normals_of<'a>(&'a self, geometry: &'a Geometry) -> &'a [Vec3] {
        match geometry.source {
            VertexSource::Owned => &geometry.normals,
            VertexSource::SharedPool => {
                self.shared_pool.as_ref().map(|p| &p.normals[..]).unwrap_or(&[])
            }
        }
    }

    /// Effective texture coordinates of `geometry`, resolving shared-pool mode.
    pub fn texcoords_of<'a>(&'a self, geometry: &'a Geometry) -> &'a [Vec2] {
        match geometry.source {
            VertexSource::Owned => &geometry.texcoords,
            VertexSource::SharedPool => {
                self.shared_pool.as_ref().map(|p| &p.texcoords[..]).unwrap_or(&[])
            }
        }
    }
}

/// Where a geometry's vertex arrays live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VertexSource {
    /// The geometry owns its arrays.
    #[default]
    Owned,
    /// The arrays live on the owning object's [`VertexPool`].
    SharedPool,
}

/// A named bundle of meshes over one set of vertex arrays.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Geometry {
    pub name: String,
    pub meshes: Vec<Mesh>,
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub texcoords: Vec<Vec2>,
    pub source: VertexSource,
}

impl Geometry {
    pub fn new(name: impl Into<String>) -> Geometry {
        Geometry {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Primitive topology of a mesh's index arrays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Index arrays over a geometry's vertex arrays, plus the transforms the
/// container recorded for them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mesh {
    pub primitive: PrimitiveType,
    pub vertex_indices: Vec<u32>,
    pub normal_indices: Vec<u32>,
    pub color_indices: Vec<u32>,
    pub texcoord_indices: Vec<u32>,
    /// Name of the material this mesh references, empty when unassigned.
    pub material: String,
    /// Per-face smoothing group bitmask, one entry per triangle; empty when
    /// the file carried no smoothing chunk.
    pub smoothing_groups: Vec<u32>,
    /// Object-local transform, produced by the bake pass.
    pub local: Mat4,
    /// World-space matrix as recorded in the container (pre-bake).
    pub absolute: Mat4,
}

impl Default for Mesh {
    fn default() -> Self {
        Mesh {
            primitive: PrimitiveType::Triangles,
            vertex_indices: Vec::new(),
            normal_indices: Vec::new(),
            color_indices: Vec::new(),
            texcoord_indices: Vec::new(),
            material: String::new(),
            smoothing_groups: Vec::new(),
            local: Mat4::IDENTITY,
            absolute: Mat4::IDENTITY,
        }
    }
}

impl Mesh {
    pub fn face_count(&self) -> usize {
        self.vertex_indices.len() / 3
    }
}

/// Shading parameters plus texture-map descriptors.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Material {
    pub name: String,
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular: [f32; 3],
    pub emission: [f32; 3],
    pub shininess: f32,
    /// 1.0 = opaque, 0.0 = fully transparent.
    pub opacity: f32,
    pub two_sided: bool,
    pub maps: Vec<TextureMap>,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            name: String::new(),
            ambient: [0.2, 0.2, 0.2],
            diffuse: [0.8, 0.8, 0.8],
            specular: [0.0, 0.0, 0.0],
            emission: [0.0, 0.0, 0.0],
            shininess: 0.0,
            opacity: 1.0,
            two_sided: false,
            maps: Vec::new(),
        }
    }
}

/// What a texture map is used for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MapKind {
    #[default]
    Diffuse,
    Specular,
    Opacity,
    Bump,
}

/// One texture-map descriptor on a material.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TextureMap {
    pub kind: MapKind,
    pub file: String,
    pub uv_offset: Vec2,
    pub uv_scale: Vec2,
    /// Rotation of the UV frame, radians.
    pub rotation: f32,
}

impl TextureMap {
    pub fn new(kind: MapKind) -> TextureMap {
        TextureMap {
            kind,
            file: String::new(),
            uv_offset: Vec2::ZERO,
            uv_scale: Vec2::ONE,
            rotation: 0.0,
        }
    }
}

/// Per-vertex bone bindings. The binary container never populates this; it
/// exists so the neutral model can round-trip scenes from other front ends.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Skin {
    pub bone_names: Vec<String>,
    /// One influence list per vertex: `(bone index, weight)`.
    pub influences: Vec<Vec<(u16, f32)>>,
}
