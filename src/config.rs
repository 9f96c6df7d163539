use std::path::{Path, PathBuf};

use crate::geometry::capsule::CapsuleSegments;

/// Body proportions in metres. These mirror the ragdoll constants used by the
/// game, so change both together.
#[derive(Debug, Clone)]
pub struct BeanProportions {
    pub torso_height: f32,
    pub torso_radius: f32,
    pub head_radius: f32,
    /// How far (in head radii) the head sphere rises above the torso top.
    pub head_blend_factor: f32,
    pub upper_arm_length: f32,
    pub upper_arm_radius: f32,
    pub forearm_length: f32,
    pub forearm_radius: f32,
    pub thigh_length: f32,
    pub thigh_radius: f32,
    pub shin_length: f32,
    pub shin_radius: f32,
    pub hip_x: f32,
    /// Gap between the upper and lower segment of a limb.
    pub joint_gap: f32,
}

impl Default for BeanProportions {
    fn default() -> Self {
        Self {
            torso_height: 0.70,
            torso_radius: 0.32,
            head_radius: 0.26,
            head_blend_factor: 0.6,
            upper_arm_length: 0.40,
            upper_arm_radius: 0.10,
            forearm_length: 0.36,
            forearm_radius: 0.09,
            thigh_length: 0.44,
            thigh_radius: 0.11,
            shin_length: 0.44,
            shin_radius: 0.085,
            hip_x: 0.12,
            joint_gap: 0.02,
        }
    }
}

impl BeanProportions {
    pub fn shoulder_x(&self) -> f32 {
        self.torso_radius + 0.04
    }

    pub fn shoulder_y(&self) -> f32 {
        self.torso_height * 0.35
    }

    pub fn hip_y(&self) -> f32 {
        -self.torso_height * 0.5
    }

    pub fn head_y(&self) -> f32 {
        self.torso_height / 2.0 + self.head_radius * self.head_blend_factor
    }
}

#[derive(Debug, Clone)]
pub struct Tessellation {
    pub torso: CapsuleSegments,
    pub limb: CapsuleSegments,
    pub head_u_segments: u32,
    pub head_v_segments: u32,
    /// Weld distance after blending the head into the torso.
    pub body_merge_distance: f32,
    /// Weld distance after joining all body parts.
    pub character_merge_distance: f32,
    pub subdivision_levels: u32,
}

impl Default for Tessellation {
    fn default() -> Self {
        Self {
            torso: CapsuleSegments {
                ring: 16,
                height: 8,
                cap: 6,
            },
            limb: CapsuleSegments {
                ring: 10,
                height: 4,
                cap: 4,
            },
            head_u_segments: 16,
            head_v_segments: 12,
            body_merge_distance: 0.02,
            character_merge_distance: 0.015,
            subdivision_levels: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkinningConfig {
    /// Exponent of the inverse distance falloff.
    pub falloff: f32,
    pub max_influences: usize,
    /// Influences below this weight are dropped before renormalising.
    pub min_weight: f32,
}

impl Default for SkinningConfig {
    fn default() -> Self {
        Self {
            falloff: 4.0,
            max_influences: 4,
            min_weight: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output location relative to the project root.
    pub output_path: PathBuf,
    pub generator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("apps/client/public/models/bean_character.glb"),
            generator: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ExportConfig {
    /// Resolves the output path against the project root: the working
    /// directory when it holds `apps/client/public`, otherwise the parent of
    /// this crate's manifest directory.
    pub fn resolve_output_path(&self, working_dir: &Path) -> PathBuf {
        if self.output_path.is_absolute() {
            return self.output_path.clone();
        }

        let project_root = if working_dir.join("apps/client/public").is_dir() {
            working_dir.to_path_buf()
        } else {
            Path::new(env!("CARGO_MANIFEST_DIR"))
                .parent()
                .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")))
                .to_path_buf()
        };

        project_root.join(&self.output_path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct BeanConfig {
    pub proportions: BeanProportions,
    pub tessellation: Tessellation,
    pub skinning: SkinningConfig,
    pub export: ExportConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_offsets_match_proportions() {
        let p = BeanProportions::default();
        assert!((p.shoulder_x() - 0.36).abs() < 1e-6);
        assert!((p.shoulder_y() - 0.245).abs() < 1e-6);
        assert!((p.hip_y() + 0.35).abs() < 1e-6);
        assert!((p.head_y() - 0.506).abs() < 1e-6);
    }

    #[test]
    fn output_path_prefers_project_layout_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("apps/client/public")).unwrap();

        let export = ExportConfig::default();
        assert_eq!(
            export.resolve_output_path(dir.path()),
            dir.path().join("apps/client/public/models/bean_character.glb")
        );
    }

    #[test]
    fn output_path_falls_back_to_manifest_parent() {
        let dir = tempfile::tempdir().unwrap();

        let resolved = ExportConfig::default().resolve_output_path(dir.path());
        assert!(!resolved.starts_with(dir.path()));
        assert!(resolved.ends_with("apps/client/public/models/bean_character.glb"));
    }

    #[test]
    fn absolute_output_path_is_kept() {
        let export = ExportConfig {
            output_path: PathBuf::from("/tmp/bean.glb"),
            ..Default::default()
        };
        assert_eq!(
            export.resolve_output_path(Path::new(".")),
            PathBuf::from("/tmp/bean.glb")
        );
    }
}
