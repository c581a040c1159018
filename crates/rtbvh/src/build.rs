//! Recursive SAH hierarchy construction.
//!
//! Primitive boxes and centroids are computed once up front. Each node then
//! works on a contiguous slice of a shared working order of triangle indices:
//! it sorts its slice by centroid along the widest centroid axis, scores a few
//! candidate cuts with a [`SplitCost`], and hands the two halves to its
//! children. Large subtrees are built on the rayon pool.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rtbvh_math::{Aabb, Vec3};

use crate::bounds::{union_padded, PrimitiveBounds};
use crate::{flatten, BuildOptions, Bvh, BvhError, BvhResult, SplitCost, TriangleSoup};

/// Transient build-time node. Children are owned by their parent and the
/// whole tree is consumed by [`flatten`](crate::flatten()).
///
/// `first..first + count` is the node's run in [`BuildTree::order`].
#[derive(Debug)]
pub enum BuildNode {
    /// Internal node with two children.
    Branch {
        left: Box<BuildNode>,
        right: Box<BuildNode>,
        bbox: Aabb,
        first: usize,
        count: usize,
    },
    /// Leaf node holding a run of primitives.
    Leaf {
        bbox: Aabb,
        first: usize,
        count: usize,
    },
}

impl BuildNode {
    pub fn bbox(&self) -> &Aabb {
        match self {
            BuildNode::Branch { bbox, .. } | BuildNode::Leaf { bbox, .. } => bbox,
        }
    }

    /// Start and length of this node's run in the working order.
    pub fn range(&self) -> (usize, usize) {
        match self {
            BuildNode::Branch { first, count, .. } | BuildNode::Leaf { first, count, .. } => {
                (*first, *count)
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BuildNode::Leaf { .. })
    }
}

/// Output of the hierarchy builder: the root plus the working order its
/// ranges index into.
#[derive(Debug)]
pub struct BuildTree {
    pub root: BuildNode,
    /// Original triangle indices, permuted so every node's primitives are contiguous
    pub order: Vec<u32>,
    pub primitive_count: usize,
}

/// Build a hierarchy with default options and the surface area heuristic.
pub fn build(soup: &TriangleSoup<'_>) -> BvhResult<BuildTree> {
    BvhBuilder::new().build_tree(soup)
}

/// Configures and runs a BVH build.
///
/// # Example
///
/// ```ignore
/// let bvh = BvhBuilder::new()
///     .with_options(BuildOptions::default().with_max_leaf_size(4))
///     .with_cost(VolumeCost)
///     .build(soup)?;
/// ```
#[derive(Clone, Default)]
pub struct BvhBuilder {
    options: BuildOptions,
    cost: Option<Arc<dyn SplitCost + Send>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl BvhBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom cost model instead of `options.cost_model`.
    pub fn with_cost(mut self, cost: impl SplitCost + Send + 'static) -> Self {
        self.cost = Some(Arc::new(cost));
        self
    }

    /// Polled at every internal node; raising it aborts the build with
    /// [`BvhError::Cancelled`].
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run the recursive build and return the transient tree.
    pub fn build_tree(&self, soup: &TriangleSoup<'_>) -> BvhResult<BuildTree> {
        self.options.validate()?;

        let primitive_count = soup.triangle_count();
        log::debug!(
            "Building BVH over {} triangles (leaf size {}, max depth {}, cost {:?})",
            primitive_count,
            self.options.max_leaf_size,
            self.options.max_depth,
            self.options.cost_model
        );

        let bounds = PrimitiveBounds::new(soup);
        let cost: &dyn SplitCost = match &self.cost {
            Some(cost) => cost.as_ref(),
            None => &self.options.cost_model,
        };
        let ctx = BuildContext {
            boxes: &bounds.boxes,
            centroids: &bounds.centroids,
            options: &self.options,
            cost,
            cancel: self.cancel.as_deref(),
            placed: AtomicUsize::new(0),
        };

        let mut order: Vec<u32> = (0..primitive_count as u32).collect();
        let root = ctx.build_node(&mut order, 0, 0)?;

        Ok(BuildTree {
            root,
            order,
            primitive_count,
        })
    }

    /// Build and flatten in one go.
    pub fn build<'s>(&self, soup: TriangleSoup<'s>) -> BvhResult<Bvh<'s>> {
        let start = Instant::now();
        let tree = self.build_tree(&soup)?;
        let flat = flatten(tree);
        let bvh = Bvh::from_flat(soup, flat, self.options.clone());

        let stats = bvh.stats();
        log::info!(
            "BVH built in {:?}: {} triangles, {} nodes, {} leaves, depth {}, leaf size {}..{}",
            start.elapsed(),
            stats.primitive_count,
            stats.node_count,
            stats.leaf_count,
            stats.max_depth,
            stats.min_leaf_size,
            stats.max_leaf_size
        );

        Ok(bvh)
    }
}

impl std::fmt::Debug for BvhBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BvhBuilder")
            .field("options", &self.options)
            .field("custom_cost", &self.cost.is_some())
            .field("cancellable", &self.cancel.is_some())
            .finish()
    }
}

/// Read-only state shared by every recursive call.
struct BuildContext<'a> {
    boxes: &'a [Aabb],
    centroids: &'a [Vec3],
    options: &'a BuildOptions,
    cost: &'a dyn SplitCost,
    cancel: Option<&'a AtomicBool>,
    /// Primitives placed into leaves so far, for progress reporting
    placed: AtomicUsize,
}

impl BuildContext<'_> {
    /// Build the subtree over `order`, which starts at `first` in the full
    /// working order.
    fn build_node(&self, order: &mut [u32], first: usize, depth: u32) -> BvhResult<BuildNode> {
        let count = order.len();
        let bbox = union_padded(
            order.iter().map(|&i| &self.boxes[i as usize]),
            self.options.box_padding,
        );

        if count <= self.options.max_leaf_size || depth > self.options.max_depth {
            return Ok(self.leaf(bbox, first, count));
        }

        if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(BvhError::Cancelled);
        }

        // Choose split axis based on centroid spread
        let centroid_bounds = order.iter().fold(Aabb::EMPTY, |mut acc, &i| {
            acc.grow(self.centroids[i as usize]);
            acc
        });
        let axis = centroid_bounds.longest_axis();

        if centroid_bounds.extent()[axis] < self.options.min_split_extent {
            // Coincident centroids: no axis can separate them
            return Ok(self.leaf(bbox, first, count));
        }

        // Index breaks ties so the order never depends on the sort algorithm
        order.sort_unstable_by(|&a, &b| {
            let ca = self.centroids[a as usize][axis];
            let cb = self.centroids[b as usize][axis];
            ca.total_cmp(&cb).then(a.cmp(&b))
        });

        let split = self.choose_split(order);
        let (left_order, right_order) = order.split_at_mut(split);

        let (left, right) = if self.options.parallel && count >= self.options.parallel_threshold {
            rayon::join(
                || self.build_node(left_order, first, depth + 1),
                || self.build_node(right_order, first + split, depth + 1),
            )
        } else {
            (
                self.build_node(left_order, first, depth + 1),
                self.build_node(right_order, first + split, depth + 1),
            )
        };

        Ok(BuildNode::Branch {
            left: Box::new(left?),
            right: Box::new(right?),
            bbox,
            first,
            count,
        })
    }

    /// Pick the cut position in a sorted run of at least two primitives.
    ///
    /// Each candidate ratio is scored from prefix/suffix box unions; ratios
    /// that would leave a side empty are skipped. Falls back to the median if
    /// none survive.
    fn choose_split(&self, sorted: &[u32]) -> usize {
        let count = sorted.len();

        let mut prefix = Vec::with_capacity(count);
        let mut acc = Aabb::EMPTY;
        for &i in sorted {
            acc = Aabb::surrounding(&acc, &self.boxes[i as usize]);
            prefix.push(acc);
        }

        let mut suffix = vec![Aabb::EMPTY; count];
        let mut acc = Aabb::EMPTY;
        for (slot, &i) in suffix.iter_mut().zip(sorted).rev() {
            acc = Aabb::surrounding(&acc, &self.boxes[i as usize]);
            *slot = acc;
        }

        let mut best: Option<(usize, f32)> = None;
        for &ratio in &self.options.split_ratios {
            let split = (count as f32 * ratio).round() as usize;
            if split == 0 || split >= count {
                continue;
            }

            let cost = self
                .cost
                .cost(&prefix[split - 1], split, &suffix[split], count - split);
            if best.map_or(true, |(_, best_cost)| cost < best_cost) {
                best = Some((split, cost));
            }
        }

        match best {
            Some((split, _)) => split,
            None => {
                log::trace!("No usable split ratio for {} primitives, using median", count);
                count / 2
            }
        }
    }

    fn leaf(&self, bbox: Aabb, first: usize, count: usize) -> BuildNode {
        let interval = self.options.progress_interval;
        if interval > 0 {
            let before = self.placed.fetch_add(count, Ordering::Relaxed);
            let after = before + count;
            if before / interval != after / interval {
                log::debug!("BVH build progress: {} primitives placed", after);
            }
        }

        BuildNode::Leaf { bbox, first, count }
    }
}
