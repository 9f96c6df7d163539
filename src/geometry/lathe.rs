use std::f32::consts::TAU;

use glam::Vec3;

use super::{Face, Mesh};

/// One horizontal ring of a surface of revolution around +Y.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ring {
    pub radius: f32,
    pub y: f32,
}

/// Revolves `rings` (ordered bottom to top) around the Y axis and closes the
/// ends with a pole vertex each.
///
/// Vertex layout is ring-major (`ring * segments + j`), followed by the bottom
/// pole and then the top pole. Adjacent rings are stitched with quads and the
/// poles with triangle fans, all wound outward.
pub(crate) fn lathe(
    name: impl Into<String>,
    rings: &[Ring],
    segments: u32,
    bottom_pole_y: f32,
    top_pole_y: f32,
) -> Mesh {
    let mut mesh = Mesh::new(name);
    let ring_count = rings.len() as u32;

    mesh.positions.reserve(rings.len() * segments as usize + 2);
    for ring in rings {
        for j in 0..segments {
            let theta = TAU * j as f32 / segments as f32;
            mesh.positions.push(Vec3::new(
                ring.radius * theta.cos(),
                ring.y,
                ring.radius * theta.sin(),
            ));
        }
    }

    let bottom_pole = ring_count * segments;
    let top_pole = bottom_pole + 1;
    mesh.positions.push(Vec3::new(0.0, bottom_pole_y, 0.0));
    mesh.positions.push(Vec3::new(0.0, top_pole_y, 0.0));

    let vertex = |ring: u32, j: u32| ring * segments + j % segments;

    for i in 0..ring_count.saturating_sub(1) {
        for j in 0..segments {
            mesh.faces.push(Face::Quad([
                vertex(i, j),
                vertex(i + 1, j),
                vertex(i + 1, j + 1),
                vertex(i, j + 1),
            ]));
        }
    }

    if ring_count > 0 {
        let last = ring_count - 1;
        for j in 0..segments {
            mesh.faces
                .push(Face::Triangle([bottom_pole, vertex(0, j), vertex(0, j + 1)]));
        }
        for j in 0..segments {
            mesh.faces
                .push(Face::Triangle([top_pole, vertex(last, j + 1), vertex(last, j)]));
        }
    }

    mesh
}
