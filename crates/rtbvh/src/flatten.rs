//! Depth-first linearization of the build tree into GPU arrays.

use bytemuck::{Pod, Zeroable};
use rtbvh_math::Aabb;

use crate::{BuildNode, BuildTree};

/// One node of the flattened hierarchy: five `i32`s, in node-id order.
///
/// For internal nodes `child_a`/`child_b` are node ids. For leaves they are
/// the start and count of the node's run in the primitive-index array and
/// `is_leaf` is 1. The root has `parent == -1`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct FlatNode {
    pub child_a: i32,
    pub child_b: i32,
    pub parent: i32,
    pub depth: i32,
    pub is_leaf: i32,
}

impl FlatNode {
    /// Parent id of the root.
    pub const NO_PARENT: i32 = -1;

    pub fn leaf(&self) -> bool {
        self.is_leaf != 0
    }

    /// Child node ids, if this is an internal node.
    pub fn children(&self) -> Option<(usize, usize)> {
        (!self.leaf()).then(|| (self.child_a as usize, self.child_b as usize))
    }

    /// `(start, count)` into the primitive-index array, if this is a leaf.
    pub fn primitives(&self) -> Option<(usize, usize)> {
        self.leaf().then(|| (self.child_a as usize, self.child_b as usize))
    }

    pub fn parent(&self) -> Option<usize> {
        (self.parent >= 0).then(|| self.parent as usize)
    }
}

/// The three arrays the traversal kernel binds.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatArrays {
    pub nodes: Vec<FlatNode>,
    /// One box per node, indexed by node id
    pub boxes: Vec<Aabb>,
    /// Original triangle indices, contiguous per leaf
    pub primitive_indices: Vec<u32>,
}

/// Flatten (and consume) a build tree.
///
/// Nodes get ids in depth-first visitation order, so the root is 0 and a
/// left child always directly follows its parent. The right child follows the
/// entire left subtree.
pub fn flatten(tree: BuildTree) -> FlatArrays {
    let BuildTree {
        root,
        order,
        primitive_count,
    } = tree;

    let mut flattener = Flattener {
        order: &order,
        out: FlatArrays {
            nodes: Vec::new(),
            boxes: Vec::new(),
            primitive_indices: Vec::with_capacity(primitive_count),
        },
    };
    flattener.visit(root, FlatNode::NO_PARENT, 0);

    log::trace!(
        "Flattened {} nodes over {} primitives",
        flattener.out.nodes.len(),
        flattener.out.primitive_indices.len()
    );
    flattener.out
}

struct Flattener<'a> {
    order: &'a [u32],
    out: FlatArrays,
}

impl Flattener<'_> {
    /// Emit `node` and its subtree, returning the id assigned to `node`.
    fn visit(&mut self, node: BuildNode, parent: i32, depth: i32) -> i32 {
        let id = self.out.nodes.len() as i32;
        self.out.boxes.push(*node.bbox());

        match node {
            BuildNode::Leaf { first, count, .. } => {
                let start = self.out.primitive_indices.len() as i32;
                self.out
                    .primitive_indices
                    .extend_from_slice(&self.order[first..first + count]);

                self.out.nodes.push(FlatNode {
                    child_a: start,
                    child_b: count as i32,
                    parent,
                    depth,
                    is_leaf: 1,
                });
            }

            BuildNode::Branch { left, right, .. } => {
                // Reserve now: the children need our id, we need theirs
                self.out.nodes.push(FlatNode {
                    child_a: -1,
                    child_b: -1,
                    parent,
                    depth,
                    is_leaf: 0,
                });

                let left_id = self.visit(*left, id, depth + 1);
                let right_id = self.visit(*right, id, depth + 1);

                let reserved = &mut self.out.nodes[id as usize];
                reserved.child_a = left_id;
                reserved.child_b = right_id;
            }
        }

        id
    }
}
