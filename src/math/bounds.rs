use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(point1: Vec3, point2: Vec3) -> AABB {
        let min = point1.min(point2);
        let max = point1.max(point2);
        AABB { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<AABB> {
        let mut points = points.into_iter();
        let first = points.next()?;

        Some(points.fold(AABB::new(first, first), |bounds, point| {
            bounds.extend(point)
        }))
    }

    pub fn extend(&self, point: Vec3) -> AABB {
        AABB {
            min: self.min.min(point),
            max: self.max.max(point),
        }
    }

    #[cfg(test)]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    #[cfg(test)]
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_covers_all_points() {
        let points = [
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 3.0, 0.0),
            Vec3::new(0.0, 0.0, -4.0),
        ];
        let bounds = AABB::from_points(points).unwrap();

        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -4.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(points.iter().all(|&p| bounds.contains_point(p)));
        assert!(!bounds.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }
}
