//! Parent/child reconstruction from flat node ids.
//!
//! The container stores hierarchy as `(node_id, parent_id)` pairs on
//! otherwise flat objects. One linear pass rebuilds the children lists and
//! the root set; no cycle detection is attempted because the source format is
//! acyclic by construction.

use tracing::warn;

use super::{ObjectHandle, Scene};

/// Rebuild `children` lists and the scene's root set.
///
/// An object joins the root set when its parent id is negative or when no
/// object carries that node id. With `resolve` false every object becomes a
/// root unconditionally.
pub fn resolve_hierarchy(scene: &mut Scene, resolve: bool) {
    scene.roots.clear();
    for object in &mut scene.objects {
        object.children.clear();
    }

    for index in 0..scene.objects.len() {
        let handle = ObjectHandle(index);
        let parent_id = scene.objects[index].parent_id;

        if !resolve || parent_id < 0 {
            scene.roots.push(handle);
            continue;
        }

        match scene.find_object_by_node_id(parent_id) {
            Some(parent) if parent != handle => {
                scene.objects[parent.0].children.push(handle);
            }
            Some(_) => {
                warn!(
                    object = %scene.objects[index].name,
                    parent_id, "object is its own parent, treating as root"
                );
                scene.roots.push(handle);
            }
            None => {
                warn!(
                    object = %scene.objects[index].name,
                    parent_id, "parent node id not found, treating as root"
                );
                scene.roots.push(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Object;

    fn object(name: &str, node_id: i32, parent_id: i32) -> Object {
        let mut o = Object::new(name);
        o.node_id = node_id;
        o.parent_id = parent_id;
        o
    }

    fn scene_of(objects: Vec<Object>) -> Scene {
        let mut scene = Scene::new();
        scene.objects = objects;
        scene
    }

    #[test]
    fn partitions_roots_and_children_exactly_once() {
        let mut scene = scene_of(vec![
            object("root", 0, -1),
            object("a", 1, 0),
            object("b", 2, 0),
            object("leaf", 3, 2),
        ]);
        resolve_hierarchy(&mut scene, true);

        assert_eq!(scene.roots, vec![ObjectHandle(0)]);
        assert_eq!(
            scene.objects[0].children,
            vec![ObjectHandle(1), ObjectHandle(2)]
        );
        assert_eq!(scene.objects[2].children, vec![ObjectHandle(3)]);

        // Every object appears exactly once as a root or as some child.
        let mut seen = vec![0usize; scene.objects.len()];
        for r in &scene.roots {
            seen[r.0] += 1;
        }
        for o in &scene.objects {
            for c in &o.children {
                seen[c.0] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn missing_parent_falls_back_to_root() {
        let mut scene = scene_of(vec![object("orphan", 5, 99)]);
        resolve_hierarchy(&mut scene, true);
        assert_eq!(scene.roots, vec![ObjectHandle(0)]);
    }

    #[test]
    fn disabled_resolution_roots_everything() {
        let mut scene = scene_of(vec![
            object("root", 0, -1),
            object("child", 1, 0),
        ]);
        resolve_hierarchy(&mut scene, false);
        assert_eq!(scene.roots.len(), 2);
        assert!(scene.objects[0].children.is_empty());
    }

    #[test]
    fn reresolving_clears_previous_links() {
        let mut scene = scene_of(vec![object("root", 0, -1), object("child", 1, 0)]);
        resolve_hierarchy(&mut scene, true);
        resolve_hierarchy(&mut scene, true);
        assert_eq!(scene.roots.len(), 1);
        assert_eq!(scene.objects[0].children.len(), 1);
    }
}
