//! Tree-shape statistics.

use rtbvh_math::Aabb;
use serde::{Deserialize, Serialize};

use crate::FlatNode;

/// Summary of a flattened hierarchy, for logs and tooling.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BvhStats {
    pub node_count: usize,
    pub leaf_count: usize,
    pub primitive_count: usize,
    pub max_depth: u32,
    pub min_leaf_size: usize,
    pub max_leaf_size: usize,
    pub mean_leaf_size: f32,
    /// Leaves holding more primitives than the configured leaf size
    pub oversized_leaves: usize,
    /// Expected traversal cost relative to the root's surface area:
    /// `sum(SA(internal)) / SA(root) + sum(SA(leaf) * count) / SA(root)`
    pub sah_cost: f32,
}

impl BvhStats {
    pub fn from_arrays(nodes: &[FlatNode], boxes: &[Aabb], leaf_size_limit: usize) -> Self {
        let mut stats = BvhStats {
            node_count: nodes.len(),
            min_leaf_size: usize::MAX,
            ..Default::default()
        };
        if nodes.is_empty() {
            stats.min_leaf_size = 0;
            return stats;
        }

        let root_area = boxes[0].surface_area();
        let mut cost = 0.0;

        for (node, bbox) in nodes.iter().zip(boxes) {
            stats.max_depth = stats.max_depth.max(node.depth.max(0) as u32);

            match node.primitives() {
                Some((_, count)) => {
                    stats.leaf_count += 1;
                    stats.primitive_count += count;
                    stats.min_leaf_size = stats.min_leaf_size.min(count);
                    stats.max_leaf_size = stats.max_leaf_size.max(count);
                    if count > leaf_size_limit {
                        stats.oversized_leaves += 1;
                    }
                    cost += bbox.surface_area() * count as f32;
                }
                None => cost += bbox.surface_area(),
            }
        }

        stats.mean_leaf_size = stats.primitive_count as f32 / stats.leaf_count.max(1) as f32;
        if stats.leaf_count == 0 {
            stats.min_leaf_size = 0;
        }
        if root_area > 0.0 {
            stats.sah_cost = cost / root_area;
        }

        stats
    }
}
