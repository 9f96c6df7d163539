use std::collections::{HashMap, VecDeque};

use glam::Vec3;

use super::{edge_key, Mesh};

impl Mesh {
    /// Makes the winding of every connected component consistent and points
    /// it outward. Winding is propagated across edges shared by exactly two
    /// faces; the outward side of a component is the one giving a positive
    /// enclosed volume. Returns the number of flipped faces.
    pub fn make_normals_consistent(&mut self) -> usize {
        let mut edge_faces: HashMap<(u32, u32), Vec<(usize, bool)>> = HashMap::new();
        for (face_index, face) in self.faces.iter().enumerate() {
            for (a, b) in face.edges() {
                edge_faces
                    .entry(edge_key(a, b))
                    .or_default()
                    .push((face_index, a < b));
            }
        }

        let mut visited = vec![false; self.faces.len()];
        let mut flip = vec![false; self.faces.len()];
        let mut queue = VecDeque::new();

        for start in 0..self.faces.len() {
            if visited[start] {
                continue;
            }

            visited[start] = true;
            queue.push_back(start);
            let mut component = Vec::new();

            while let Some(face_index) = queue.pop_front() {
                component.push(face_index);

                for (a, b) in self.faces[face_index].edges() {
                    let shared = &edge_faces[&edge_key(a, b)];
                    if shared.len() != 2 {
                        continue;
                    }

                    let forward = (a < b) != flip[face_index];
                    for &(neighbor, neighbor_forward) in shared {
                        if neighbor == face_index || visited[neighbor] {
                            continue;
                        }

                        // Consistent neighbours traverse the shared edge the other way
                        flip[neighbor] = neighbor_forward == forward;
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }

            let volume: f32 = component
                .iter()
                .map(|&index| {
                    let sign = if flip[index] { -1.0 } else { 1.0 };
                    sign * self.faces[index].signed_volume(&self.positions)
                })
                .sum();

            if volume < 0.0 {
                for &index in &component {
                    flip[index] = !flip[index];
                }
            }
        }

        let mut flipped = 0;
        for (face, flip) in self.faces.iter_mut().zip(flip) {
            if flip {
                face.flip();
                flipped += 1;
            }
        }

        log::debug!("Flipped {} faces of {}", flipped, self.name);

        flipped
    }

    /// Smooth per-vertex normals, weighted by the area of the adjacent faces.
    pub fn vertex_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];

        for face in &self.faces {
            let normal = face.area_normal(&self.positions);
            for &index in face.indices() {
                normals[index as usize] += normal;
            }
        }

        normals
            .into_iter()
            .map(|normal| normal.try_normalize().unwrap_or(Vec3::Y))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::{Affine3A, Vec3};

    use crate::geometry::capsule::{capsule, CapsuleSegments};
    use crate::geometry::tests::cube;

    use super::*;

    #[test]
    fn inverted_mesh_is_turned_outside() {
        let mut mesh = cube();
        for face in &mut mesh.faces {
            face.flip();
        }
        assert!(mesh.signed_volume() < 0.0);

        assert_eq!(mesh.make_normals_consistent(), 6);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn single_flipped_face_is_repaired() {
        let mut mesh = cube();
        mesh.faces[2].flip();

        assert_eq!(mesh.make_normals_consistent(), 1);
        assert_eq!(mesh.faces, cube().faces);
        assert!((mesh.signed_volume() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn components_are_oriented_independently() {
        let segments = CapsuleSegments {
            ring: 8,
            height: 2,
            cap: 2,
        };
        let mut mesh = capsule("A", 0.1, 0.1, segments).unwrap();
        let mut other = capsule("B", 0.1, 0.1, segments).unwrap();
        other.transform(&Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        for face in &mut other.faces {
            face.flip();
        }
        let flipped_count = other.face_count();
        mesh.append(other);

        assert_eq!(mesh.make_normals_consistent(), flipped_count);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn cube_vertex_normals_point_away_from_center() {
        let mesh = cube();
        for (position, normal) in mesh.positions.iter().zip(mesh.vertex_normals()) {
            assert!((normal.length() - 1.0).abs() < 1e-5);
            assert!((normal - position.normalize()).length() < 1e-5);
        }
    }
}
