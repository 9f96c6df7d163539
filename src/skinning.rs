//! Automatic skin weights and per-vertex joint influences.

use anyhow::{bail, Context};
use itertools::Itertools;

use crate::armature::Armature;
use crate::config::SkinningConfig;
use crate::geometry::Mesh;
use crate::math::segment::Segment;

/// Influences per vertex stored in the exported skin (`JOINTS_0`/`WEIGHTS_0`).
pub const INFLUENCES_PER_VERTEX: usize = 4;

const MIN_DISTANCE: f32 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VertexInfluence {
    /// Indices into the armature's joint order.
    pub joints: [u16; INFLUENCES_PER_VERTEX],
    pub weights: [f32; INFLUENCES_PER_VERTEX],
}

/// Keeps the strongest `limit` weights, drops those under `min_weight` and
/// renormalises the rest to sum to one.
fn strongest(
    weights: impl IntoIterator<Item = (usize, f32)>,
    limit: usize,
    min_weight: f32,
) -> Vec<(usize, f32)> {
    let mut kept = weights
        .into_iter()
        .filter(|&(_, weight)| weight > 0.0)
        .sorted_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)))
        .take(limit)
        .collect::<Vec<_>>();

    let total: f32 = kept.iter().map(|&(_, weight)| weight).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    for (_, weight) in &mut kept {
        *weight /= total;
    }

    // The strongest influence always survives pruning
    let threshold = min_weight.min(kept[0].1);
    kept.retain(|&(_, weight)| weight >= threshold);
    let total: f32 = kept.iter().map(|&(_, weight)| weight).sum();
    for (_, weight) in &mut kept {
        *weight /= total;
    }

    kept
}

/// Assigns every vertex to its nearest bones with inverse distance weights
/// and stores the result as one vertex group per bone, named after it.
pub fn bind_automatic_weights(
    mesh: &mut Mesh,
    armature: &Armature,
    config: &SkinningConfig,
) -> anyhow::Result<()> {
    if config.max_influences == 0 {
        bail!("Automatic weights need at least one influence per vertex");
    }

    let joints = armature.joint_order()?;
    let segments = joints
        .iter()
        .map(|&id| armature.bone(id).segment())
        .collect::<Vec<Segment>>();

    let mut groups = vec![vec![0.0f32; mesh.vertex_count()]; joints.len()];

    for (vertex, &position) in mesh.positions.iter().enumerate() {
        let raw = segments.iter().enumerate().map(|(joint, segment)| {
            let distance = segment.distance_to_point(position).max(MIN_DISTANCE);
            (joint, distance.powf(-config.falloff))
        });

        for (joint, weight) in strongest(raw, config.max_influences, config.min_weight) {
            groups[joint][vertex] = weight;
        }
    }

    for (&id, weights) in joints.iter().zip(groups) {
        mesh.vertex_groups
            .insert(armature.bone(id).name.clone(), weights);
    }

    log::debug!(
        "Bound {} vertices of {} to {} bones",
        mesh.vertex_count(),
        mesh.name,
        joints.len()
    );

    Ok(())
}

/// Collects the strongest four bone influences of every vertex from the
/// mesh's vertex groups, with joint indices in the armature's joint order.
pub fn vertex_influences(
    mesh: &Mesh,
    armature: &Armature,
) -> anyhow::Result<Vec<VertexInfluence>> {
    let joints = armature.joint_order()?;
    let groups = joints
        .iter()
        .map(|&id| {
            let name = &armature.bone(id).name;
            mesh.vertex_groups
                .get(name)
                .with_context(|| format!("Mesh {} has no vertex group for bone {}", mesh.name, name))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    (0..mesh.vertex_count())
        .map(|vertex| {
            let weights = groups
                .iter()
                .enumerate()
                .map(|(joint, group)| (joint, group[vertex]));
            let kept = strongest(weights, INFLUENCES_PER_VERTEX, 0.0);

            if kept.is_empty() {
                bail!("Vertex {} of {} is not weighted to any bone", vertex, mesh.name);
            }

            let mut influence = VertexInfluence::default();
            for (slot, (joint, weight)) in kept.into_iter().enumerate() {
                influence.joints[slot] = joint as u16;
                influence.weights[slot] = weight;
            }
            Ok(influence)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use crate::bean::{create_armature, create_bean_mesh};
    use crate::config::{BeanProportions, Tessellation};
    use crate::geometry::subdivide::subdivide;
    use crate::geometry::Face;
    use crate::scene_graph::scene::Scene;

    use super::*;

    fn bound_character() -> (Mesh, Armature) {
        let proportions = BeanProportions::default();
        let mut scene = Scene::new();
        let id = create_bean_mesh(&mut scene, &proportions, &Tessellation::default()).unwrap();
        let mut mesh = scene.take_mesh(id).unwrap();
        let armature = create_armature(&proportions).unwrap();
        bind_automatic_weights(&mut mesh, &armature, &SkinningConfig::default()).unwrap();
        (mesh, armature)
    }

    fn dominant_bone<'a>(mesh: &Mesh, armature: &'a Armature, vertex: usize) -> &'a str {
        let (name, _) = armature
            .bones()
            .map(|(_, bone)| (bone.name.as_str(), mesh.vertex_groups.get(&bone.name).unwrap()[vertex]))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();
        name
    }

    #[test]
    fn strongest_keeps_limit_and_normalises() {
        let kept = strongest([(0, 1.0), (1, 4.0), (2, 3.0), (3, 0.0), (4, 2.0)], 3, 0.0);
        assert_eq!(kept.iter().map(|&(j, _)| j).collect::<Vec<_>>(), [1, 2, 4]);
        let total: f32 = kept.iter().map(|&(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn strongest_prunes_tiny_weights() {
        let kept = strongest([(0, 1000.0), (1, 1.0)], 4, 0.01);
        assert_eq!(kept, vec![(0, 1.0)]);
    }

    #[test]
    fn every_bone_gets_a_group() {
        let (mesh, armature) = bound_character();
        assert_eq!(mesh.vertex_groups.len(), 10);
        for (_, bone) in armature.bones() {
            assert!(mesh.vertex_groups.member_count(&bone.name) > 0, "{} is empty", bone.name);
        }
    }

    #[test]
    fn weights_sum_to_one_with_at_most_four_influences() {
        let (mesh, _) = bound_character();

        for vertex in 0..mesh.vertex_count() {
            let weights = mesh
                .vertex_groups
                .iter()
                .map(|(_, weights)| weights[vertex])
                .filter(|&w| w > 0.0)
                .collect::<Vec<_>>();
            assert!(!weights.is_empty());
            assert!(weights.len() <= 4);
            assert!((weights.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn extremities_follow_their_bones() {
        let (mesh, armature) = bound_character();
        let nearest = |target: Vec3| {
            mesh.positions
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.distance(target).total_cmp(&b.1.distance(target)))
                .map(|(i, _)| i)
                .unwrap()
        };

        assert_eq!(dominant_bone(&mesh, &armature, nearest(Vec3::new(-1.3, 0.245, 0.0))), "l_foreArm");
        assert_eq!(dominant_bone(&mesh, &armature, nearest(Vec3::new(1.3, 0.245, 0.0))), "r_foreArm");
        assert_eq!(dominant_bone(&mesh, &armature, nearest(Vec3::new(-0.12, -1.4, 0.0))), "l_shin");
        assert_eq!(dominant_bone(&mesh, &armature, nearest(Vec3::new(0.0, 0.9, 0.0))), "head");
    }

    #[test]
    fn influences_survive_subdivision() {
        let (mesh, armature) = bound_character();
        let smooth = subdivide(&mesh, 1);
        let influences = vertex_influences(&smooth, &armature).unwrap();

        assert_eq!(influences.len(), smooth.vertex_count());
        for influence in &influences {
            assert!((influence.weights.iter().sum::<f32>() - 1.0).abs() < 1e-4);
            assert!(influence.joints.iter().all(|&j| (j as usize) < armature.len()));
        }
    }

    #[test]
    fn unweighted_vertex_is_an_error() {
        let armature = create_armature(&BeanProportions::default()).unwrap();
        let mut mesh = Mesh::new("Loose");
        mesh.positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
        mesh.faces = vec![Face::Triangle([0, 1, 2])];

        assert!(vertex_influences(&mesh, &armature).is_err());

        for (_, bone) in armature.bones() {
            mesh.vertex_groups.insert(bone.name.clone(), vec![0.0; 3]);
        }
        assert!(vertex_influences(&mesh, &armature).is_err());
    }
}
