//! Accumulates parsed primitives into the neutral data model.
//!
//! Chunk handlers call `add_*` methods as data arrives; a write that needs a
//! geometry or mesh that does not exist yet creates one implicitly. Counts
//! read ahead of the data pre-size the arrays, purely as an optimization.

use glam::{Mat4, Vec2, Vec3};

use super::{Geometry, Material, Mesh, Object, ObjectHandle, Scene};

/// Builder over one load session's [`Scene`].
#[derive(Debug, Default)]
pub struct SceneGraphBuilder {
    scene: Scene,
    current_object: Option<ObjectHandle>,
}

impl SceneGraphBuilder {
    pub fn new() -> SceneGraphBuilder {
        SceneGraphBuilder {
            scene: Scene::new(),
            current_object: None,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn object_at_mut(&mut self, handle: ObjectHandle) -> &mut Object {
        &mut self.scene.objects[handle.0]
    }

    /// Consume the builder, yielding the accumulated scene.
    pub fn finish(self) -> Scene {
        self.scene
    }

    /// Start a new named object; subsequent geometry writes land on it.
    pub fn begin_object(&mut self, name: impl Into<String>) -> ObjectHandle {
        let handle = ObjectHandle(self.scene.objects.len());
        self.scene.objects.push(Object::new(name));
        self.current_object = Some(handle);
        handle
    }

    /// Current object, created on demand for writes that arrive before any
    /// object block (tolerated, not well-formed input).
    fn object_mut(&mut self) -> &mut Object {
        let handle = match self.current_object {
            Some(h) => h,
            None => self.begin_object(String::new()),
        };
        &mut self.scene.objects[handle.0]
    }

    /// Start a new geometry on the current object.
    pub fn begin_geometry(&mut self, name: impl Into<String>) {
        let geometry = Geometry::new(name);
        self.object_mut().geometries.push(geometry);
    }

    /// Start a new geometry named after the current object (one per mesh
    /// chunk; the names only matter for diagnostics).
    pub fn begin_current_geometry(&mut self) {
        let name = self.object_mut().name.clone();
        self.begin_geometry(name);
    }

    /// Record the global conversion matrix (master scale).
    pub fn set_conversion(&mut self, conversion: Mat4) {
        self.scene.conversion = conversion;
    }

    fn geometry_mut(&mut self) -> &mut Geometry {
        let object = self.object_mut();
        if object.geometries.is_empty() {
            let name = object.name.clone();
            object.geometries.push(Geometry::new(name));
        }
        object.geometries.last_mut().unwrap()
    }

    fn mesh_mut(&mut self) -> &mut Mesh {
        let geometry = self.geometry_mut();
        if geometry.meshes.is_empty() {
            geometry.meshes.push(Mesh::default());
        }
        geometry.meshes.last_mut().unwrap()
    }

    pub fn reserve_vertices(&mut self, count: usize) {
        self.geometry_mut().positions.reserve(count);
    }

    pub fn add_vertex(&mut self, position: Vec3) {
        self.geometry_mut().positions.push(position);
    }

    pub fn reserve_texcoords(&mut self, count: usize) {
        self.geometry_mut().texcoords.reserve(count);
    }

    pub fn add_texcoord(&mut self, uv: Vec2) {
        self.geometry_mut().texcoords.push(uv);
    }

    pub fn reserve_faces(&mut self, count: usize) {
        self.mesh_mut().vertex_indices.reserve(count * 3);
    }

    /// Append one triangle. The per-face visibility flag from the container
    /// is consumed by the parser and never reaches the model.
    pub fn add_face(&mut self, a: u16, b: u16, c: u16) {
        let mesh = self.mesh_mut();
        mesh.vertex_indices
            .extend_from_slice(&[a as u32, b as u32, c as u32]);
    }

    pub fn add_smoothing_group(&mut self, mask: u32) {
        self.mesh_mut().smoothing_groups.push(mask);
    }

    pub fn set_mesh_material(&mut self, name: impl Into<String>) {
        self.mesh_mut().material = name.into();
    }

    /// Record the world-space matrix the container stored for the current
    /// mesh. The bake pass later derives the local matrix from it.
    pub fn set_mesh_absolute(&mut self, matrix: Mat4) {
        self.mesh_mut().absolute = matrix;
    }

    pub fn add_material(&mut self, material: Material) {
        self.scene.materials.push(material);
    }

    pub fn set_frame_range(&mut self, start: u32, end: u32) {
        self.scene.frame_range = Some((start, end));
    }

    /// Resolve the object a keyframer node refers to.
    ///
    /// A node naming an existing object that has no node data yet claims that
    /// object. Dummy placeholders and nodes naming missing objects create a
    /// fresh geometry-less object instead; a second node over an
    /// already-claimed name does the same, which models instancing as
    /// separate transform-only nodes.
    pub fn object_for_node(&mut self, name: &str, dummy: bool) -> ObjectHandle {
        if !dummy
            && let Some(pos) = self
                .scene
                .objects
                .iter()
                .position(|o| o.name == name && o.node_id < 0)
        {
            self.current_object = Some(ObjectHandle(pos));
            return ObjectHandle(pos);
        }
        let handle = self.begin_object(name);
        self.scene.objects[handle.0].dummy = dummy;
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_create_object_geometry_and_mesh_lazily() {
        let mut b = SceneGraphBuilder::new();
        b.add_vertex(Vec3::ZERO);
        b.add_face(0, 0, 0);
        let scene = b.finish();
        assert_eq!(scene.objects.len(), 1);
        assert_eq!(scene.objects[0].geometries.len(), 1);
        assert_eq!(scene.objects[0].geometries[0].meshes.len(), 1);
        assert_eq!(
            scene.objects[0].geometries[0].meshes[0].vertex_indices,
            vec![0, 0, 0]
        );
    }

    #[test]
    fn geometry_inherits_object_name() {
        let mut b = SceneGraphBuilder::new();
        b.begin_object("box");
        b.add_vertex(Vec3::ONE);
        let scene = b.finish();
        assert_eq!(scene.objects[0].geometries[0].name, "box");
    }

    #[test]
    fn node_resolution_claims_then_instances() {
        let mut b = SceneGraphBuilder::new();
        b.begin_object("mesh01");
        let first = b.object_for_node("mesh01", false);
        assert_eq!(first, ObjectHandle(0));
        // Claim it so the next node over the same name must instance.
        b.scene.objects[first.0].node_id = 0;
        let second = b.object_for_node("mesh01", false);
        assert_eq!(second, ObjectHandle(1));
        let dummy = b.object_for_node("$$$DUMMY", true);
        assert!(b.scene().object(dummy).dummy);
    }
}
