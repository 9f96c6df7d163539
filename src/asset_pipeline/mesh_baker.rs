use anyhow::bail;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use itertools::izip;

use crate::geometry::Mesh;
use crate::math::bounds::AABB;
use crate::skinning::VertexInfluence;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct SkinnedVertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub joints: [u16; 4],
    pub weights: [f32; 4],
}

pub struct BakedMesh {
    pub name: String,
    pub vertices: Vec<SkinnedVertex>,
    pub indices: Vec<u32>,
    pub bounds: AABB,
}

/// Flattens a polygon mesh into an indexed triangle list with interleaved
/// skinned vertices.
pub fn bake_skinned_mesh(
    mesh: &Mesh,
    normals: &[Vec3],
    influences: &[VertexInfluence],
) -> anyhow::Result<BakedMesh> {
    let vertex_count = mesh.vertex_count();
    if normals.len() != vertex_count || influences.len() != vertex_count {
        bail!(
            "Attribute count mismatch for {}: {} positions, {} normals, {} influences",
            mesh.name,
            vertex_count,
            normals.len(),
            influences.len()
        );
    }

    let Some(bounds) = mesh.bounds() else {
        bail!("Cannot bake empty mesh {}", mesh.name);
    };

    let vertices = izip!(&mesh.positions, normals, influences)
        .map(|(&position, &normal, influence)| SkinnedVertex {
            position,
            normal,
            joints: influence.joints,
            weights: influence.weights,
        })
        .collect::<Vec<_>>();

    let indices = mesh
        .faces
        .iter()
        .flat_map(|face| face.triangles())
        .flatten()
        .collect::<Vec<u32>>();

    Ok(BakedMesh {
        name: mesh.name.clone(),
        vertices,
        indices,
        bounds,
    })
}
