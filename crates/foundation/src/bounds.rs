/// Axis-aligned bounding boxes
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb3 {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    pub fn contains(&self, p: [f64; 2]) -> bool {
        p[0] >= self.min[0] && p[0] <= self.max[0] && p[1] >= self.min[1] && p[1] <= self.max[1]
    }
}

impl Aabb3 {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Aabb3 { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = [f64; 3]>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut out = Aabb3::new(first, first);
        for p in it {
            for axis in 0..3 {
                out.min[axis] = out.min[axis].min(p[axis]);
                out.max[axis] = out.max[axis].max(p[axis]);
            }
        }
        Some(out)
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
            (self.min[2] + self.max[2]) * 0.5,
        ]
    }

    pub fn footprint(&self) -> Aabb2 {
        Aabb2::new([self.min[0], self.min[1]], [self.max[0], self.max[1]])
    }
}

#[cfg(test)]
mod tests {
    use super::Aabb3;

    #[test]
    fn from_points_spans_all_inputs() {
        let b = Aabb3::from_points([[1.0, 5.0, 0.0], [-2.0, 3.0, 4.0]]).unwrap();
        assert_eq!(b.min, [-2.0, 3.0, 0.0]);
        assert_eq!(b.max, [1.0, 5.0, 4.0]);
        assert_eq!(b.center(), [-0.5, 4.0, 2.0]);
        assert!(b.footprint().contains([0.0, 4.0]));
        assert!(!b.footprint().contains([0.0, 6.0]));
    }

    #[test]
    fn from_points_empty_is_none() {
        assert!(Aabb3::from_points(std::iter::empty()).is_none());
    }
}
