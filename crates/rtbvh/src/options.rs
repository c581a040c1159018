//! Build configuration.

use crate::{BvhError, BvhResult};
use rtbvh_math::BOX_PADDING;
use serde::{Deserialize, Serialize};

/// Largest accepted `max_depth`. Build, flatten and drop all recurse once per
/// level, so this also bounds their stack use.
pub const MAX_DEPTH_LIMIT: u32 = 64;

/// Which split-cost model the builder uses when no custom
/// [`SplitCost`](crate::SplitCost) is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    /// Surface Area Heuristic.
    #[default]
    SurfaceArea,
    /// Child volume plus overlap penalty.
    Volume,
    /// Always the first candidate ratio (the median with default ratios).
    Median,
}

/// BVH build configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Sets this small or smaller become leaves
    pub max_leaf_size: usize,
    /// Nodes deeper than this become leaves regardless of size.
    /// At most [`MAX_DEPTH_LIMIT`].
    pub max_depth: u32,
    /// Centroid spread below which a set is treated as coincident
    pub min_split_extent: f32,
    /// Candidate split positions, as fractions of the sorted set.
    /// Evaluated in order; ties keep the earlier candidate.
    pub split_ratios: Vec<f32>,
    /// Padding added to every node box on each side of each axis
    pub box_padding: f32,
    pub cost_model: CostModel,
    /// Build large subtrees on the rayon pool
    pub parallel: bool,
    /// Subtrees smaller than this are always built sequentially
    pub parallel_threshold: usize,
    /// Log progress every time this many primitives have been placed in leaves (0 = off)
    pub progress_interval: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_leaf_size: 8,
            max_depth: 30,
            min_split_extent: 1e-6,
            split_ratios: vec![0.5, 0.3, 0.7],
            box_padding: BOX_PADDING,
            cost_model: CostModel::SurfaceArea,
            parallel: true,
            parallel_threshold: 4096,
            progress_interval: 100_000,
        }
    }
}

impl BuildOptions {
    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cost_model(mut self, cost_model: CostModel) -> Self {
        self.cost_model = cost_model;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check that the options describe a build that can terminate.
    pub fn validate(&self) -> BvhResult<()> {
        if self.max_leaf_size == 0 {
            return Err(BvhError::InvalidOptions(
                "max_leaf_size must be at least 1".into(),
            ));
        }
        if self.max_depth > MAX_DEPTH_LIMIT {
            return Err(BvhError::InvalidOptions(format!(
                "max_depth {} exceeds the limit of {MAX_DEPTH_LIMIT}",
                self.max_depth
            )));
        }
        if self.split_ratios.is_empty() {
            return Err(BvhError::InvalidOptions(
                "split_ratios must not be empty".into(),
            ));
        }
        if let Some(r) = self
            .split_ratios
            .iter()
            .find(|r| !(r.is_finite() && **r > 0.0 && **r < 1.0))
        {
            return Err(BvhError::InvalidOptions(format!(
                "split ratio {r} is outside (0, 1)"
            )));
        }
        if !(self.box_padding.is_finite() && self.box_padding >= 0.0) {
            return Err(BvhError::InvalidOptions(format!(
                "box_padding {} must be finite and non-negative",
                self.box_padding
            )));
        }
        if !(self.min_split_extent.is_finite() && self.min_split_extent >= 0.0) {
            return Err(BvhError::InvalidOptions(format!(
                "min_split_extent {} must be finite and non-negative",
                self.min_split_extent
            )));
        }

        Ok(())
    }
}
