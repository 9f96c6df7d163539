use glam::Vec3;

/// A line segment between two points, e.g. a bone from head to tail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Segment {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        let direction = self.end - self.start;
        let length_squared = direction.length_squared();

        if length_squared <= f32::EPSILON {
            return self.start;
        }

        let t = ((point - self.start).dot(direction) / length_squared).clamp(0.0, 1.0);
        self.start + direction * t
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        (point - self.closest_point(point)).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_clamped_to_endpoints() {
        let segment = Segment::new(Vec3::ZERO, Vec3::X);

        assert!((segment.distance_to_point(Vec3::new(0.5, 2.0, 0.0)) - 2.0).abs() < 1e-6);
        assert!((segment.distance_to_point(Vec3::new(-3.0, 0.0, 0.0)) - 3.0).abs() < 1e-6);
        assert!((segment.distance_to_point(Vec3::new(1.0, 0.0, 4.0)) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_segment_behaves_like_a_point() {
        let segment = Segment::new(Vec3::Y, Vec3::Y);
        assert_eq!(segment.closest_point(Vec3::ZERO), Vec3::Y);
    }
}
