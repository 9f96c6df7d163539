use std::collections::{HashMap, HashSet};

use glam::{IVec3, Vec3};
use itertools::Itertools;

use super::{Face, Mesh};

/// Uniform grid used to find previously kept vertices near a position.
struct SpatialHash {
    cell_size: f32,
    cells: HashMap<IVec3, Vec<u32>>,
}

impl SpatialHash {
    fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    fn cell(&self, position: Vec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    fn insert(&mut self, position: Vec3, index: u32) {
        self.cells.entry(self.cell(position)).or_default().push(index);
    }

    fn find_within(&self, position: Vec3, distance: f32, positions: &[Vec3]) -> Option<u32> {
        let center = self.cell(position);
        let distance_squared = distance * distance;

        (-1..=1)
            .cartesian_product(-1..=1)
            .cartesian_product(-1..=1)
            .filter_map(|((x, y), z)| self.cells.get(&(center + IVec3::new(x, y, z))))
            .flatten()
            .copied()
            .filter(|&candidate| {
                positions[candidate as usize].distance_squared(position) <= distance_squared
            })
            .min()
    }
}

impl Mesh {
    /// Welds vertices that lie within `threshold` of an earlier vertex.
    ///
    /// The earliest vertex of a cluster survives. Faces are remapped, repeated
    /// corners collapse, and faces left with fewer than three distinct corners
    /// or duplicating another face are dropped. Welded vertices keep the
    /// strongest weight of each vertex group. Returns the number of removed
    /// vertices.
    pub fn merge_by_distance(&mut self, threshold: f32) -> usize {
        if self.positions.is_empty() || !(threshold > 0.0) {
            return 0;
        }

        let mut grid = SpatialHash::new(threshold);
        let mut kept = Vec::with_capacity(self.positions.len());
        let mut remap = Vec::with_capacity(self.positions.len());

        for &position in &self.positions {
            let target = match grid.find_within(position, threshold, &kept) {
                Some(existing) => existing,
                None => {
                    let index = kept.len() as u32;
                    kept.push(position);
                    grid.insert(position, index);
                    index
                }
            };
            remap.push(target);
        }

        let removed = self.positions.len() - kept.len();
        if removed == 0 {
            return 0;
        }

        let kept_len = kept.len();
        self.vertex_groups.map_weights(|weights| {
            let mut merged = vec![0.0f32; kept_len];
            for (old, &weight) in weights.iter().enumerate() {
                let slot = &mut merged[remap[old] as usize];
                *slot = slot.max(weight);
            }
            merged
        });

        let mut seen = HashSet::new();
        let faces = std::mem::take(&mut self.faces);
        let face_count = faces.len();

        self.faces = faces
            .into_iter()
            .filter_map(|face| {
                let mut cycle = face
                    .indices()
                    .iter()
                    .map(|&index| remap[index as usize])
                    .dedup()
                    .collect::<Vec<_>>();

                while cycle.len() > 1 && cycle.first() == cycle.last() {
                    cycle.pop();
                }

                if cycle.iter().all_unique() {
                    Face::from_cycle(&cycle)
                } else {
                    None
                }
            })
            .filter(|face| {
                let mut key = face.indices().to_vec();
                key.sort_unstable();
                seen.insert(key)
            })
            .collect();

        self.positions = kept;

        log::debug!(
            "Merged {}: removed {} vertices and {} faces",
            self.name,
            removed,
            face_count - self.faces.len()
        );

        removed
    }

    /// Smallest distance between any two vertices, or `None` below two vertices.
    #[cfg(test)]
    pub fn min_vertex_distance(&self) -> Option<f32> {
        self.positions
            .iter()
            .tuple_combinations()
            .map(|(a, b)| a.distance(*b))
            .min_by(f32::total_cmp)
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::geometry::capsule::{capsule, CapsuleSegments};
    use crate::geometry::tests::cube;
    use crate::geometry::Face;

    use super::*;

    const LIMB: CapsuleSegments = CapsuleSegments {
        ring: 10,
        height: 4,
        cap: 4,
    };

    #[test]
    fn collapsed_cap_rings_are_welded_into_poles() {
        let mut mesh = capsule("Limb", 0.1, 0.2, LIMB).unwrap();
        let removed = mesh.merge_by_distance(0.001);

        assert_eq!(removed, 2 * LIMB.ring as usize);
        assert_eq!(
            mesh.vertex_count(),
            LIMB.ring as usize * (2 * LIMB.cap + LIMB.height - 1) as usize + 2
        );
        // The pole fans vanish and the quads touching the poles become triangles
        let triangles = mesh.faces.iter().filter(|f| matches!(f, Face::Triangle(_))).count();
        assert_eq!(triangles, 2 * LIMB.ring as usize);
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn no_vertices_remain_within_tolerance() {
        let mut mesh = capsule("Limb", 0.1, 0.2, LIMB).unwrap();
        let mut other = capsule("Limb", 0.1, 0.2, LIMB).unwrap();
        other.transform(&glam::Affine3A::from_translation(Vec3::new(0.005, 0.0, 0.0)));
        mesh.append(other);

        mesh.merge_by_distance(0.015);

        assert!(mesh.min_vertex_distance().unwrap() > 0.015);
    }

    #[test]
    fn duplicate_faces_are_dropped() {
        let mut mesh = cube();
        let copy = cube();
        mesh.append(copy);

        let removed = mesh.merge_by_distance(1e-4);

        assert_eq!(removed, 8);
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.face_count(), 6);
    }

    #[test]
    fn welded_vertices_keep_strongest_weight() {
        let mut mesh = Mesh::new("Pair");
        mesh.positions = vec![Vec3::ZERO, Vec3::new(0.001, 0.0, 0.0), Vec3::X, Vec3::Y];
        mesh.faces = vec![Face::Triangle([1, 2, 3])];
        mesh.vertex_groups.insert("bone", vec![0.2, 0.7, 0.0, 1.0]);

        mesh.merge_by_distance(0.01);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.faces, vec![Face::Triangle([0, 1, 2])]);
        assert_eq!(mesh.vertex_groups.get("bone").unwrap(), &[0.7, 0.0, 1.0]);
    }

    #[test]
    fn nothing_to_merge_leaves_mesh_untouched() {
        let mut mesh = cube();
        assert_eq!(mesh.merge_by_distance(0.01), 0);
        assert_eq!(mesh.face_count(), 6);
    }
}
