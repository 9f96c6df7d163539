use std::f32::consts::FRAC_PI_2;

use anyhow::bail;

use super::lathe::{lathe, Ring};
use super::Mesh;

/// Tessellation density of a capsule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapsuleSegments {
    /// Vertices around each ring.
    pub ring: u32,
    /// Subdivisions of the cylindrical body.
    pub height: u32,
    /// Rings per hemispherical cap.
    pub cap: u32,
}

impl CapsuleSegments {
    pub const fn ring_count(&self) -> usize {
        (2 * self.cap + self.height + 1) as usize
    }

    pub const fn vertex_count(&self) -> usize {
        self.ring as usize * self.ring_count() + 2
    }

    pub const fn face_count(&self) -> usize {
        self.ring as usize * (2 * self.cap + self.height + 2) as usize
    }
}

/// Builds a capsule along +Y centred on the origin.
///
/// The total height is `2 * half_length + 2 * radius`. Each cap samples a
/// quarter circle at `segments.cap` angles, ending exactly at the equator of
/// the pole, so the outermost cap rings sit on top of their pole until the
/// mesh is merged by distance.
pub fn capsule(
    name: impl Into<String>,
    radius: f32,
    half_length: f32,
    segments: CapsuleSegments,
) -> anyhow::Result<Mesh> {
    let name = name.into();

    if segments.ring < 3 || segments.height < 1 || segments.cap < 1 {
        bail!("Invalid capsule segments for {}: {:?}", name, segments);
    }
    if !(radius > 0.0) || !(half_length >= 0.0) {
        bail!(
            "Invalid capsule dimensions for {}: radius {}, half length {}",
            name,
            radius,
            half_length
        );
    }

    let cap_angle = |i: u32| FRAC_PI_2 * i as f32 / segments.cap as f32;
    let mut rings = Vec::with_capacity(segments.ring_count());

    for i in (1..=segments.cap).rev() {
        let angle = cap_angle(i);
        rings.push(Ring {
            radius: radius * angle.cos(),
            y: -half_length - radius * angle.sin(),
        });
    }

    for i in 0..=segments.height {
        rings.push(Ring {
            radius,
            y: -half_length + 2.0 * half_length * i as f32 / segments.height as f32,
        });
    }

    for i in 1..=segments.cap {
        let angle = cap_angle(i);
        rings.push(Ring {
            radius: radius * angle.cos(),
            y: half_length + radius * angle.sin(),
        });
    }

    Ok(lathe(
        name,
        &rings,
        segments.ring,
        -half_length - radius,
        half_length + radius,
    ))
}
