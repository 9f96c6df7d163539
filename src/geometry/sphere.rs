use std::f32::consts::PI;

use anyhow::bail;

use super::lathe::{lathe, Ring};
use super::Mesh;

/// UV sphere with its poles on the Y axis.
///
/// `u_segments` is the number of vertices per latitude ring and `v_segments`
/// the number of bands from pole to pole, giving `u * (v - 1) + 2` vertices.
pub fn uv_sphere(
    name: impl Into<String>,
    radius: f32,
    u_segments: u32,
    v_segments: u32,
) -> anyhow::Result<Mesh> {
    let name = name.into();

    if u_segments < 3 || v_segments < 2 {
        bail!(
            "Invalid sphere segments for {}: {}x{}",
            name,
            u_segments,
            v_segments
        );
    }
    if !(radius > 0.0) {
        bail!("Invalid sphere radius for {}: {}", name, radius);
    }

    let rings = (1..v_segments)
        .rev()
        .map(|k| {
            let phi = PI * k as f32 / v_segments as f32;
            Ring {
                radius: radius * phi.sin(),
                y: radius * phi.cos(),
            }
        })
        .collect::<Vec<_>>();

    Ok(lathe(name, &rings, u_segments, -radius, radius))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_follow_uv_layout() {
        let mesh = uv_sphere("Head", 0.26, 16, 12).unwrap();
        assert_eq!(mesh.vertex_count(), 16 * 11 + 2);
        assert_eq!(mesh.face_count(), 16 * 10 + 2 * 16);
        assert_eq!(mesh.edge_count(), 16 * 11 + 16 * 12);
    }

    #[test]
    fn all_vertices_lie_on_the_sphere() {
        let mesh = uv_sphere("Head", 0.26, 16, 12).unwrap();
        for position in &mesh.positions {
            assert!((position.length() - 0.26).abs() < 1e-5);
        }
    }

    #[test]
    fn volume_approaches_sphere_volume() {
        let mesh = uv_sphere("Ball", 1.0, 32, 24).unwrap();
        let exact = 4.0 / 3.0 * PI;
        let volume = mesh.signed_volume();
        assert!(volume > 0.0);
        assert!((volume - exact).abs() / exact < 0.05);
    }

    #[test]
    fn rejects_too_few_segments() {
        assert!(uv_sphere("Bad", 1.0, 2, 8).is_err());
        assert!(uv_sphere("Bad", 1.0, 8, 1).is_err());
        assert!(uv_sphere("Bad", -1.0, 8, 8).is_err());
    }
}
