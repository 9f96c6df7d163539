use id_arena::Id;

use crate::geometry::Mesh;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

#[derive(Debug, Default)]
pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
}

impl Object3D {
    pub fn with_mesh(mesh: Mesh, transform: Transform) -> Self {
        Self {
            name: mesh.name.clone(),
            transform,
            mesh: Some(mesh),
        }
    }
}
