use std::collections::HashMap;

use glam::Vec3;

use super::{edge_key, Face, Mesh};

struct Edge {
    a: u32,
    b: u32,
    faces: Vec<usize>,
}

impl Edge {
    fn is_manifold(&self) -> bool {
        self.faces.len() == 2
    }
}

/// Applies `levels` rounds of Catmull-Clark subdivision.
pub fn subdivide(mesh: &Mesh, levels: u32) -> Mesh {
    (0..levels).fold(mesh.clone(), |mesh, _| subdivide_once(&mesh))
}

/// One round of Catmull-Clark. Every n-gon becomes n quads and the result
/// has `V + E + F` vertices, laid out as vertex points, then edge points,
/// then face points. Edges not shared by exactly two faces are treated as
/// boundaries.
fn subdivide_once(mesh: &Mesh) -> Mesh {
    let vertex_count = mesh.positions.len();

    let mut edges: Vec<Edge> = Vec::new();
    let mut edge_lookup: HashMap<(u32, u32), usize> = HashMap::new();
    let mut vertex_edges: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];
    let mut vertex_faces: Vec<Vec<usize>> = vec![Vec::new(); vertex_count];

    for (face_index, face) in mesh.faces.iter().enumerate() {
        for &index in face.indices() {
            vertex_faces[index as usize].push(face_index);
        }

        for (a, b) in face.edges() {
            let edge_index = *edge_lookup.entry(edge_key(a, b)).or_insert_with(|| {
                vertex_edges[a as usize].push(edges.len());
                vertex_edges[b as usize].push(edges.len());
                edges.push(Edge {
                    a,
                    b,
                    faces: Vec::new(),
                });
                edges.len() - 1
            });
            edges[edge_index].faces.push(face_index);
        }
    }

    let face_points = mesh
        .faces
        .iter()
        .map(|face| face.centroid(&mesh.positions))
        .collect::<Vec<_>>();

    let edge_points = edges
        .iter()
        .map(|edge| {
            let (a, b) = (mesh.positions[edge.a as usize], mesh.positions[edge.b as usize]);
            if edge.is_manifold() {
                (a + b + face_points[edge.faces[0]] + face_points[edge.faces[1]]) * 0.25
            } else {
                (a + b) * 0.5
            }
        })
        .collect::<Vec<_>>();

    let vertex_points = (0..vertex_count)
        .map(|vertex| {
            let position = mesh.positions[vertex];
            let incident = &vertex_edges[vertex];
            if incident.is_empty() {
                return position;
            }

            let boundary = incident
                .iter()
                .map(|&e| &edges[e])
                .filter(|edge| !edge.is_manifold())
                .collect::<Vec<_>>();

            match boundary.as_slice() {
                [] => {
                    let n = incident.len() as f32;
                    let face_average = vertex_faces[vertex]
                        .iter()
                        .map(|&f| face_points[f])
                        .sum::<Vec3>()
                        / vertex_faces[vertex].len() as f32;
                    let edge_average = incident
                        .iter()
                        .map(|&e| {
                            let edge = &edges[e];
                            (mesh.positions[edge.a as usize] + mesh.positions[edge.b as usize]) * 0.5
                        })
                        .sum::<Vec3>()
                        / n;

                    (face_average + 2.0 * edge_average + (n - 3.0) * position) / n
                }
                [first, second] => {
                    let other = |edge: &Edge| {
                        let index = if edge.a as usize == vertex { edge.b } else { edge.a };
                        mesh.positions[index as usize]
                    };
                    (6.0 * position + other(*first) + other(*second)) / 8.0
                }
                _ => position,
            }
        })
        .collect::<Vec<_>>();

    let edge_base = vertex_count as u32;
    let face_base = edge_base + edges.len() as u32;

    let mut result = Mesh::new(mesh.name.clone());
    result.positions = vertex_points
        .into_iter()
        .chain(edge_points)
        .chain(face_points)
        .collect();

    let edge_point = |a: u32, b: u32| edge_base + edge_lookup[&edge_key(a, b)] as u32;

    for (face_index, face) in mesh.faces.iter().enumerate() {
        let corners = face.indices();
        let n = corners.len();
        let center = face_base + face_index as u32;

        for k in 0..n {
            let corner = corners[k];
            let next = corners[(k + 1) % n];
            let previous = corners[(k + n - 1) % n];
            result.faces.push(Face::Quad([
                corner,
                edge_point(corner, next),
                center,
                edge_point(previous, corner),
            ]));
        }
    }

    for (name, weights) in mesh.vertex_groups.iter() {
        let edge_weights = edges
            .iter()
            .map(|edge| (weights[edge.a as usize] + weights[edge.b as usize]) * 0.5);
        let face_weights = mesh.faces.iter().map(|face| {
            face.indices()
                .iter()
                .map(|&i| weights[i as usize])
                .sum::<f32>()
                / face.len() as f32
        });

        result.vertex_groups.insert(
            name,
            weights
                .iter()
                .copied()
                .chain(edge_weights)
                .chain(face_weights)
                .collect(),
        );
    }

    result
}
