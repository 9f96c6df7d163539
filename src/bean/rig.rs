use glam::Vec3;

use crate::armature::Armature;
use crate::config::BeanProportions;

pub const ARMATURE_NAME: &str = "BeanArmature";

/// Builds the ragdoll skeleton:
///
/// ```text
/// torso (root)
///   +-- head
///   +-- l_upperArm -- l_foreArm
///   +-- r_upperArm -- r_foreArm
///   +-- l_thigh -- l_shin
///   +-- r_thigh -- r_shin
/// ```
pub fn create_armature(p: &BeanProportions) -> anyhow::Result<Armature> {
    let mut armature = Armature::new(ARMATURE_NAME);
    let torso_top = p.torso_height * 0.5;

    let torso = armature.add_bone(
        "torso",
        Vec3::ZERO,
        Vec3::new(0.0, torso_top, 0.0),
        None,
        false,
    )?;
    armature.add_bone(
        "head",
        Vec3::new(0.0, torso_top, 0.0),
        Vec3::new(0.0, torso_top + p.head_radius * 2.0, 0.0),
        Some(torso),
        true,
    )?;

    for (prefix, sign) in [("l", -1.0), ("r", 1.0)] {
        let shoulder = Vec3::new(sign * p.shoulder_x(), p.shoulder_y(), 0.0);
        let elbow = Vec3::new(
            sign * (p.shoulder_x() + p.upper_arm_length),
            p.shoulder_y(),
            0.0,
        );
        let wrist = Vec3::new(
            sign * (p.shoulder_x() + p.upper_arm_length + p.forearm_length),
            p.shoulder_y(),
            0.0,
        );

        let upper = armature.add_bone(
            format!("{prefix}_upperArm"),
            shoulder,
            elbow,
            Some(torso),
            false,
        )?;
        armature.add_bone(format!("{prefix}_foreArm"), elbow, wrist, Some(upper), true)?;
    }

    for (prefix, sign) in [("l", -1.0), ("r", 1.0)] {
        let hip = Vec3::new(sign * p.hip_x, p.hip_y(), 0.0);
        let knee = Vec3::new(sign * p.hip_x, p.hip_y() - p.thigh_length, 0.0);
        let ankle = Vec3::new(
            sign * p.hip_x,
            p.hip_y() - p.thigh_length - p.shin_length,
            0.0,
        );

        let thigh = armature.add_bone(format!("{prefix}_thigh"), hip, knee, Some(torso), false)?;
        armature.add_bone(format!("{prefix}_shin"), knee, ankle, Some(thigh), true)?;
    }

    armature.validate()?;

    Ok(armature)
}
