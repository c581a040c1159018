//! The frozen hierarchy handed to the kernel-dispatch layer.

use rtbvh_math::{Aabb, Ray};

use crate::{BuildOptions, BvhBuilder, BvhResult, BvhStats, FlatArrays, FlatNode, TriangleSoup};

/// A built, flattened BVH over a borrowed triangle soup.
///
/// Read-only: rebuilding means constructing a new `Bvh`.
#[derive(Debug, Clone)]
pub struct Bvh<'s> {
    soup: TriangleSoup<'s>,
    nodes: Vec<FlatNode>,
    boxes: Vec<Aabb>,
    primitive_indices: Vec<u32>,
    options: BuildOptions,
}

impl<'s> Bvh<'s> {
    /// Build with the given options and their cost model.
    pub fn build(soup: TriangleSoup<'s>, options: &BuildOptions) -> BvhResult<Self> {
        BvhBuilder::new().with_options(options.clone()).build(soup)
    }

    pub(crate) fn from_flat(
        soup: TriangleSoup<'s>,
        flat: FlatArrays,
        options: BuildOptions,
    ) -> Self {
        Self {
            soup,
            nodes: flat.nodes,
            boxes: flat.boxes,
            primitive_indices: flat.primitive_indices,
            options,
        }
    }

    /// Node boxes, indexed by node id.
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Node records, indexed by node id. Node 0 is the root.
    pub fn nodes(&self) -> &[FlatNode] {
        &self.nodes
    }

    /// Original triangle indices, contiguous per leaf.
    pub fn primitive_indices(&self) -> &[u32] {
        &self.primitive_indices
    }

    /// The vertex buffer the tree was built over.
    pub fn soup(&self) -> &TriangleSoup<'s> {
        &self.soup
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Boxes as `min.xyz, max.xyz` float runs, ready for a storage buffer.
    pub fn box_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.boxes)
    }

    /// Nodes as `[child_a, child_b, parent, depth, is_leaf]` word runs.
    pub fn node_words(&self) -> &[i32] {
        bytemuck::cast_slice(&self.nodes)
    }

    pub fn stats(&self) -> BvhStats {
        BvhStats::from_arrays(&self.nodes, &self.boxes, self.options.max_leaf_size)
    }

    /// Walk the tree the way the kernel does: iteratively from node 0, with
    /// no stack, moving through parent pointers.
    ///
    /// Every leaf whose box the ray hits within `[0, t_max]` has its
    /// primitives passed to `visit`; intersecting the triangles themselves is
    /// up to the caller. Returns the number of box tests performed.
    pub fn traverse(&self, ray: &Ray, t_max: f32, mut visit: impl FnMut(u32)) -> usize {
        let mut box_tests = 0;
        let mut current: i32 = 0;
        let mut last: i32 = FlatNode::NO_PARENT;

        while current >= 0 {
            let id = current as usize;
            let node = self.nodes[id];

            let next = if last == node.parent {
                // Arrived from above
                box_tests += 1;
                if !self.boxes[id].hit(ray, 0.0, t_max) {
                    node.parent
                } else if let Some((start, count)) = node.primitives() {
                    for &prim in &self.primitive_indices[start..start + count] {
                        visit(prim);
                    }
                    node.parent
                } else {
                    node.child_a
                }
            } else if last == node.child_a {
                node.child_b
            } else {
                node.parent
            };

            last = current;
            current = next;
        }

        box_tests
    }
}
