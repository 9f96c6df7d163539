use anyhow::{bail, Context};
use id_arena::Arena;

use crate::geometry::Mesh;
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::transform::Transform;

/// Working scene for assembling meshes. Objects emptied by a join stay in the
/// arena without a mesh.
pub struct Scene {
    pub objects: Arena<Object3D>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    pub fn spawn_mesh(&mut self, mesh: Mesh, transform: Transform) -> ObjectId {
        self.add_object(Object3D::with_mesh(mesh, transform))
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.objects.get_mut(id)
    }

    #[cfg(test)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    /// Mesh owned by `id`, for in-place edits.
    pub fn mesh_mut(&mut self, id: ObjectId) -> anyhow::Result<&mut Mesh> {
        let object = self.get_object_mut(id).context("Unknown object")?;
        object
            .mesh
            .as_mut()
            .with_context(|| format!("Object {} has no mesh", object.name))
    }

    /// Objects that still own a mesh.
    #[cfg(test)]
    pub fn mesh_objects(&self) -> impl Iterator<Item = (ObjectId, &Object3D)> {
        self.objects.iter().filter(|(_, object)| object.mesh.is_some())
    }

    pub fn rename(&mut self, id: ObjectId, name: impl Into<String>) -> anyhow::Result<()> {
        let object = self.get_object_mut(id).context("Unknown object")?;
        object.name = name.into();
        if let Some(mesh) = object.mesh.as_mut() {
            mesh.name = object.name.clone();
        }
        Ok(())
    }

    /// Bakes the object transforms into their meshes and resets them to identity.
    pub fn apply_transforms(&mut self, ids: &[ObjectId]) -> anyhow::Result<()> {
        for &id in ids {
            let object = self.get_object_mut(id).context("Unknown object")?;
            if object.transform.is_identity() {
                continue;
            }

            let matrix = object.transform.local_matrix();
            if let Some(mesh) = object.mesh.as_mut() {
                mesh.transform(&matrix);
            }
            object.transform = Transform::IDENTITY;
        }

        Ok(())
    }

    /// Joins the meshes of `others` into `target`, keeping their placement
    /// in the scene by expressing them in the target's local space.
    pub fn join(&mut self, target: ObjectId, others: &[ObjectId]) -> anyhow::Result<()> {
        let target_object = self.get_object(target).context("Unknown join target")?;
        if target_object.mesh.is_none() {
            bail!("Join target {} has no mesh", target_object.name);
        }
        let to_target_space = target_object.transform.local_matrix().inverse();

        for &id in others {
            if id == target {
                continue;
            }

            let object = self.get_object_mut(id).context("Unknown object to join")?;
            let mut mesh = object
                .mesh
                .take()
                .with_context(|| format!("Object {} has no mesh to join", object.name))?;
            mesh.transform(&(to_target_space * object.transform.local_matrix()));

            if let Some(target_mesh) = self.objects[target].mesh.as_mut() {
                target_mesh.append(mesh);
            }
        }

        Ok(())
    }

    /// Removes the mesh from `id`, baking in the object transform.
    pub fn take_mesh(&mut self, id: ObjectId) -> anyhow::Result<Mesh> {
        self.apply_transforms(&[id])?;
        let object = self.get_object_mut(id).context("Unknown object")?;
        object
            .mesh
            .take()
            .with_context(|| format!("Object {} has no mesh", object.name))
    }
}
