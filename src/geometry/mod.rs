use std::collections::{BTreeMap, HashSet};

use glam::{Affine3A, Vec3};
use itertools::Itertools;

use crate::math::bounds::AABB;

pub mod capsule;
mod lathe;
pub mod normals;
pub mod sphere;
pub mod subdivide;
pub mod weld;

/// A polygon as a counter-clockwise (seen from outside) cycle of vertex indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Face {
    Triangle([u32; 3]),
    Quad([u32; 4]),
}

impl Face {
    pub fn from_cycle(cycle: &[u32]) -> Option<Face> {
        match *cycle {
            [a, b, c] => Some(Face::Triangle([a, b, c])),
            [a, b, c, d] => Some(Face::Quad([a, b, c, d])),
            _ => None,
        }
    }

    pub fn indices(&self) -> &[u32] {
        match self {
            Face::Triangle(indices) => indices,
            Face::Quad(indices) => indices,
        }
    }

    pub fn indices_mut(&mut self) -> &mut [u32] {
        match self {
            Face::Triangle(indices) => indices,
            Face::Quad(indices) => indices,
        }
    }

    pub fn len(&self) -> usize {
        self.indices().len()
    }

    /// Directed edges in winding order, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.indices().iter().copied().circular_tuple_windows()
    }

    /// Fan triangulation around the first corner.
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        let indices = self.indices();
        (1..indices.len() - 1).map(move |i| [indices[0], indices[i], indices[i + 1]])
    }

    pub fn flip(&mut self) {
        self.indices_mut().reverse();
    }

    pub fn centroid(&self, positions: &[Vec3]) -> Vec3 {
        let sum: Vec3 = self.indices().iter().map(|&i| positions[i as usize]).sum();
        sum / self.len() as f32
    }

    /// Normal scaled by the face area.
    pub fn area_normal(&self, positions: &[Vec3]) -> Vec3 {
        self.triangles()
            .map(|[a, b, c]| {
                let (a, b, c) = (
                    positions[a as usize],
                    positions[b as usize],
                    positions[c as usize],
                );
                (b - a).cross(c - a) * 0.5
            })
            .sum()
    }

    /// Contribution of this face to the signed volume of a closed surface.
    pub fn signed_volume(&self, positions: &[Vec3]) -> f32 {
        self.triangles()
            .map(|[a, b, c]| {
                positions[a as usize].dot(positions[b as usize].cross(positions[c as usize])) / 6.0
            })
            .sum()
    }
}

pub(crate) fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Named per-vertex weights. Every group stores one weight per mesh vertex;
/// a vertex belongs to a group when its weight is positive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexGroups {
    groups: BTreeMap<String, Vec<f32>>,
}

impl VertexGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&[f32]> {
        self.groups.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.groups
            .iter()
            .map(|(name, weights)| (name.as_str(), weights.as_slice()))
    }

    pub fn insert(&mut self, name: impl Into<String>, weights: Vec<f32>) {
        self.groups.insert(name.into(), weights);
    }

    /// Number of vertices with a positive weight in `name`.
    pub fn member_count(&self, name: &str) -> usize {
        self.get(name)
            .map(|weights| weights.iter().filter(|&&w| w > 0.0).count())
            .unwrap_or(0)
    }

    /// Rebuilds every group with `f`, which maps an old weight slice to a new one.
    pub fn map_weights(&mut self, mut f: impl FnMut(&[f32]) -> Vec<f32>) {
        for weights in self.groups.values_mut() {
            *weights = f(weights);
        }
    }

    fn append(&mut self, own_len: usize, other: VertexGroups, other_len: usize) {
        for (name, weights) in self.groups.iter_mut() {
            if !other.groups.contains_key(name) {
                weights.resize(own_len + other_len, 0.0);
            }
        }

        for (name, weights) in other.groups {
            let target = self
                .groups
                .entry(name)
                .or_insert_with(|| vec![0.0; own_len]);
            target.extend(weights);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub positions: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub vertex_groups: VertexGroups,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn edge_count(&self) -> usize {
        self.faces
            .iter()
            .flat_map(Face::edges)
            .map(|(a, b)| edge_key(a, b))
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.iter().map(|face| face.len() - 2).sum()
    }

    pub fn bounds(&self) -> Option<AABB> {
        AABB::from_points(self.positions.iter().copied())
    }

    /// Bakes `transform` into the vertex positions.
    pub fn transform(&mut self, transform: &Affine3A) {
        for position in &mut self.positions {
            *position = transform.transform_point3(*position);
        }

        // Mirroring transforms turn the surface inside out
        if transform.matrix3.determinant() < 0.0 {
            for face in &mut self.faces {
                face.flip();
            }
        }
    }

    /// Joins `other` into this mesh. Vertex groups are merged by name.
    pub fn append(&mut self, other: Mesh) {
        let offset = self.positions.len();
        let other_len = other.positions.len();

        self.vertex_groups
            .append(offset, other.vertex_groups, other_len);
        self.positions.extend(other.positions);
        self.faces.extend(other.faces.into_iter().map(|mut face| {
            for index in face.indices_mut() {
                *index += offset as u32;
            }
            face
        }));
    }

    /// Total signed volume; positive when the faces wind outward.
    pub fn signed_volume(&self) -> f32 {
        self.faces
            .iter()
            .map(|face| face.signed_volume(&self.positions))
            .sum()
    }
}
