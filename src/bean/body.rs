use std::f32::consts::FRAC_PI_2;

use glam::{Quat, Vec3};

use crate::config::{BeanProportions, Tessellation};
use crate::geometry::capsule::capsule;
use crate::geometry::sphere::uv_sphere;
use crate::geometry::Mesh;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::Scene;
use crate::scene_graph::transform::Transform;

pub const BODY_NAME: &str = "BeanBody";
pub const CHARACTER_NAME: &str = "BeanCharacter";

/// Left side first; the left side of the character is at negative x.
const SIDES: [(&str, f32); 2] = [("L", -1.0), ("R", 1.0)];

/// Torso capsule with the head sphere sunk into its top, welded into one
/// smooth bean silhouette.
fn spawn_torso(
    scene: &mut Scene,
    proportions: &BeanProportions,
    tessellation: &Tessellation,
) -> anyhow::Result<ObjectId> {
    let torso = capsule(
        "BeanTorso",
        proportions.torso_radius,
        proportions.torso_height / 2.0,
        tessellation.torso,
    )?;
    let head = uv_sphere(
        "BeanHead",
        proportions.head_radius,
        tessellation.head_u_segments,
        tessellation.head_v_segments,
    )?;

    let torso = scene.spawn_mesh(torso, Transform::IDENTITY);
    let head = scene.spawn_mesh(
        head,
        Transform::from_translation(Vec3::new(0.0, proportions.head_y(), 0.0)),
    );

    scene.join(torso, &[head])?;
    scene.rename(torso, BODY_NAME)?;

    scene
        .mesh_mut(torso)?
        .merge_by_distance(tessellation.body_merge_distance);

    Ok(torso)
}

fn limb(
    name: String,
    radius: f32,
    length: f32,
    tessellation: &Tessellation,
) -> anyhow::Result<Mesh> {
    capsule(name, radius, length / 2.0, tessellation.limb)
}

/// Builds the complete character mesh in T-pose: arms stretched along the X
/// axis at shoulder height, legs hanging down from the hips.
pub fn create_bean_mesh(
    scene: &mut Scene,
    proportions: &BeanProportions,
    tessellation: &Tessellation,
) -> anyhow::Result<ObjectId> {
    let p = proportions;
    let body = spawn_torso(scene, p, tessellation)?;
    let mut parts = Vec::new();

    for (side, sign) in SIDES {
        // Capsules run along +Y, arms are turned onto the X axis
        let arm_rotation = Quat::from_rotation_z(sign * FRAC_PI_2);

        let upper = limb(
            format!("UpperArm_{side}"),
            p.upper_arm_radius,
            p.upper_arm_length,
            tessellation,
        )?;
        let upper_x = sign * (p.shoulder_x() + p.upper_arm_length / 2.0);
        parts.push(scene.spawn_mesh(
            upper,
            Transform::from_translation_rotation(
                Vec3::new(upper_x, p.shoulder_y(), 0.0),
                arm_rotation,
            ),
        ));

        let forearm = limb(
            format!("ForeArm_{side}"),
            p.forearm_radius,
            p.forearm_length,
            tessellation,
        )?;
        let forearm_x =
            sign * (p.shoulder_x() + p.upper_arm_length + p.forearm_length / 2.0 + p.joint_gap);
        parts.push(scene.spawn_mesh(
            forearm,
            Transform::from_translation_rotation(
                Vec3::new(forearm_x, p.shoulder_y(), 0.0),
                arm_rotation,
            ),
        ));
    }

    for (side, sign) in SIDES {
        let thigh = limb(
            format!("Thigh_{side}"),
            p.thigh_radius,
            p.thigh_length,
            tessellation,
        )?;
        parts.push(scene.spawn_mesh(
            thigh,
            Transform::from_translation(Vec3::new(
                sign * p.hip_x,
                p.hip_y() - p.thigh_length / 2.0,
                0.0,
            )),
        ));

        let shin = limb(
            format!("Shin_{side}"),
            p.shin_radius,
            p.shin_length,
            tessellation,
        )?;
        parts.push(scene.spawn_mesh(
            shin,
            Transform::from_translation(Vec3::new(
                sign * p.hip_x,
                p.hip_y() - p.thigh_length - p.shin_length / 2.0 - p.joint_gap,
                0.0,
            )),
        ));
    }

    parts.insert(0, body);
    scene.apply_transforms(&parts)?;
    scene.join(body, &parts)?;
    scene.rename(body, CHARACTER_NAME)?;

    let mesh = scene.mesh_mut(body)?;
    mesh.merge_by_distance(tessellation.character_merge_distance);
    mesh.make_normals_consistent();

    Ok(body)
}
