//! Float precision helpers.
//!
//! World coordinates span `[0, 2^30]`, well past the 24-bit mantissa of
//! `f32`. Geometry handed to the GPU is therefore stored relative to an
//! `f64` origin near the data, and only the small offsets are narrowed.

use core::cmp::Ordering;

use super::Vec3;

/// `f64` origin for narrowing nearby world points to `f32` offsets.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraRelative {
    pub origin: Vec3,
}

impl CameraRelative {
    pub fn new(origin: Vec3) -> Self {
        Self { origin }
    }

    #[inline]
    pub fn to_f32(self, world: Vec3) -> [f32; 3] {
        let d = world - self.origin;
        [d.x as f32, d.y as f32, d.z as f32]
    }

    #[inline]
    pub fn to_world(self, offset: [f32; 3]) -> Vec3 {
        Vec3::new(
            self.origin.x + offset[0] as f64,
            self.origin.y + offset[1] as f64,
            self.origin.z + offset[2] as f64,
        )
    }
}

/// Total order on `f64` with `-0.0 == 0.0` and every NaN equal.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    let canon = |v: f64| {
        if v == 0.0 {
            0.0
        } else if v.is_nan() {
            f64::NAN
        } else {
            v
        }
    };
    canon(a).total_cmp(&canon(b))
}

/// `f64` usable as a heap or map key.
#[derive(Debug, Copy, Clone, Default)]
pub struct StableF64(pub f64);

impl PartialEq for StableF64 {
    fn eq(&self, other: &Self) -> bool {
        stable_total_cmp_f64(self.0, other.0) == Ordering::Equal
    }
}

impl Eq for StableF64 {}

impl PartialOrd for StableF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StableF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        stable_total_cmp_f64(self.0, other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{CameraRelative, StableF64, stable_total_cmp_f64};
    use core::cmp::Ordering;
    use std::collections::BinaryHeap;

    use crate::math::Vec3;

    #[test]
    fn signed_zeros_and_nans_collapse() {
        assert_eq!(stable_total_cmp_f64(-0.0, 0.0), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(f64::NAN, -f64::NAN), Ordering::Equal);
        assert_eq!(stable_total_cmp_f64(1.0, f64::INFINITY), Ordering::Less);
    }

    #[test]
    fn heap_pops_largest_area_first() {
        let heap: BinaryHeap<_> = [3.5, f64::INFINITY, 0.25].map(StableF64).into_iter().collect();
        let order: Vec<f64> = heap.into_sorted_vec().into_iter().map(|v| v.0).collect();
        assert_eq!(order, [0.25, 3.5, f64::INFINITY]);
    }

    #[test]
    fn offsets_near_the_grid_edge_keep_sub_unit_detail() {
        let edge = 1_073_741_824.0;
        let origin = Vec3::new(edge - 512.0, edge - 512.0, 0.0);
        let world = Vec3::new(edge - 511.75, edge - 513.5, 12.0);
        let rel = CameraRelative::new(origin);
        assert_eq!(rel.to_f32(world), [0.25, -1.5, 12.0]);
        assert_eq!(rel.to_world(rel.to_f32(world)), world);
        // Narrowing the absolute coordinate loses the fraction.
        assert_ne!((world.x as f32) as f64, world.x);
    }
}
