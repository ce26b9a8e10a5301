//! Scene objects and the container that owns them.

use glam::Vec3;

use crate::material::{self, SharedMaterial};
use crate::mesh::{Geometry, Transform};

/// Index of an object inside a [`Scene`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// A renderable object: shape, material reference, and placement.
#[derive(Clone, Debug)]
pub struct SceneObject {
    pub name: &'static str,
    pub geometry: Geometry,
    pub material: SharedMaterial,
    pub transform: Transform,
    pub visible: bool,
}

impl SceneObject {
    pub fn new(name: &'static str, geometry: Geometry, material: SharedMaterial) -> Self {
        Self {
            name,
            geometry,
            material,
            transform: Transform::default(),
            visible: true,
        }
    }

    /// The animated cube whose position feeds the sphere shader.
    pub fn effect_origin() -> Self {
        Self::new("effect_origin", Geometry::cube(0.35), material::wireframe())
    }

    /// The primary subject, offset to the right of the effect origin.
    pub fn sphere() -> Self {
        let mut sphere = Self::new("sphere", Geometry::sphere(1.0, 32, 32), material::sphere());
        sphere.transform.position = Vec3::new(1.7, 0.0, 0.0);
        sphere
    }
}

/// Flat list of scene objects in insertion order.
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> &SceneObject {
        &self.objects[id.0]
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut SceneObject {
        &mut self.objects[id.0]
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn default_objects_use_shared_materials() {
        let origin = SceneObject::effect_origin();
        let sphere = SceneObject::sphere();

        assert!(Rc::ptr_eq(&origin.material, &material::wireframe()));
        assert!(Rc::ptr_eq(&sphere.material, &material::sphere()));
        assert_eq!(sphere.transform.position, Vec3::new(1.7, 0.0, 0.0));
    }

    #[test]
    fn ids_index_insertion_order() {
        let mut scene = Scene::new();
        let a = scene.add(SceneObject::effect_origin());
        let b = scene.add(SceneObject::sphere());

        assert_eq!(scene.len(), 2);
        assert_eq!(scene.get(a).name, "effect_origin");
        scene.get_mut(b).transform.position.y = 2.0;
        assert_eq!(scene.objects()[1].transform.position.y, 2.0);
    }
}
