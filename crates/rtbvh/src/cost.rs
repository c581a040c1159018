//! Split cost models.
//!
//! The builder sorts a node's primitives along one axis, cuts the sorted run
//! at a few candidate positions and asks a [`SplitCost`] to score each cut.
//! Lower scores win.

use crate::CostModel;
use rtbvh_math::Aabb;

/// Scores a candidate partition of a node into two children.
///
/// Boxes are the unpadded unions of each side's primitive boxes; counts are
/// always at least 1. Lower is better. Implementations must be deterministic.
pub trait SplitCost: Sync {
    fn cost(&self, left: &Aabb, left_count: usize, right: &Aabb, right_count: usize) -> f32;
}

/// Surface Area Heuristic: `SA(L) * |L| + SA(R) * |R|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurfaceAreaCost;

impl SplitCost for SurfaceAreaCost {
    fn cost(&self, left: &Aabb, left_count: usize, right: &Aabb, right_count: usize) -> f32 {
        left.surface_area() * left_count as f32 + right.surface_area() * right_count as f32
    }
}

/// `V(L) * |L| + V(R) * |R| + V(L ∩ R) * (|L| + |R|)`.
///
/// Penalises overlapping children; cheap but blind to flat geometry, since
/// flat boxes have zero volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolumeCost;

impl SplitCost for VolumeCost {
    fn cost(&self, left: &Aabb, left_count: usize, right: &Aabb, right_count: usize) -> f32 {
        let overlap = left.overlap_volume(right);

        left.volume() * left_count as f32
            + right.volume() * right_count as f32
            + overlap * (left_count + right_count) as f32
    }
}

/// Scores every cut the same, so the first candidate ratio always wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct MedianCost;

impl SplitCost for MedianCost {
    fn cost(&self, _left: &Aabb, _left_count: usize, _right: &Aabb, _right_count: usize) -> f32 {
        0.0
    }
}

impl SplitCost for CostModel {
    fn cost(&self, left: &Aabb, left_count: usize, right: &Aabb, right_count: usize) -> f32 {
        match self {
            CostModel::SurfaceArea => SurfaceAreaCost.cost(left, left_count, right, right_count),
            CostModel::Volume => VolumeCost.cost(left, left_count, right, right_count),
            CostModel::Median => MedianCost.cost(left, left_count, right, right_count),
        }
    }
}
