//! Structural checks over the flat arrays.
//!
//! A broken tree does not crash the kernel, it silently misses or double-tests
//! triangles. These checks catch that class of defect in tests and tooling.

use thiserror::Error;

use rtbvh_math::Aabb;

use crate::bounds::PrimitiveBounds;
use crate::{BuildOptions, Bvh, FlatNode, TriangleSoup};

/// A violated structural invariant. Always an internal defect.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructureError {
    #[error("Tree has no nodes")]
    NoNodes,

    #[error("{nodes} nodes but {boxes} boxes")]
    BoxCountMismatch { nodes: usize, boxes: usize },

    #[error("Root has parent {parent} and depth {depth}, expected -1 and 0")]
    BadRoot { parent: i32, depth: i32 },

    #[error("Node {node} references child {child}, which does not exist")]
    ChildOutOfRange { node: usize, child: i32 },

    #[error("Node {child} is referenced by more than one parent (or is the root)")]
    SharedChild { child: usize },

    #[error("Node {node} records parent {found}, but is a child of {expected}")]
    ParentMismatch { node: usize, expected: usize, found: i32 },

    #[error("Node {node} records depth {found}, expected {expected}")]
    DepthMismatch { node: usize, expected: i32, found: i32 },

    #[error("Node {node} is not reachable from the root")]
    Unreachable { node: usize },

    #[error("Leaf {node} range {start}+{count} is outside the primitive array")]
    LeafRangeOutOfBounds { node: usize, start: i32, count: i32 },

    #[error("Leaf {node} is empty")]
    EmptyLeaf { node: usize },

    #[error("Primitive index {primitive} does not name a triangle")]
    PrimitiveOutOfRange { primitive: u32 },

    #[error("Triangle {primitive} appears in more than one leaf")]
    PrimitiveDuplicated { primitive: u32 },

    #[error("Triangle {primitive} appears in no leaf")]
    PrimitiveMissing { primitive: u32 },

    #[error("Box of node {child} escapes the box of its parent {node}")]
    ChildBoxEscapes { node: usize, child: usize },

    #[error("Triangle {primitive} escapes the box of leaf {node}")]
    PrimitiveBoxEscapes { node: usize, primitive: u32 },

    #[error("Leaf {node} holds {count} primitives without hitting max depth or coincident centroids")]
    OversizedLeaf { node: usize, count: usize },
}

/// Check every structural invariant of a built hierarchy.
pub fn validate(bvh: &Bvh<'_>) -> Result<(), StructureError> {
    validate_arrays(
        bvh.soup(),
        bvh.nodes(),
        bvh.boxes(),
        bvh.primitive_indices(),
        bvh.options(),
    )
}

/// [`validate`] over raw arrays, e.g. ones loaded back from disk.
pub fn validate_arrays(
    soup: &TriangleSoup<'_>,
    nodes: &[FlatNode],
    boxes: &[Aabb],
    primitive_indices: &[u32],
    options: &BuildOptions,
) -> Result<(), StructureError> {
    if nodes.is_empty() {
        return Err(StructureError::NoNodes);
    }
    if nodes.len() != boxes.len() {
        return Err(StructureError::BoxCountMismatch {
            nodes: nodes.len(),
            boxes: boxes.len(),
        });
    }

    let root = nodes[0];
    if root.parent != FlatNode::NO_PARENT || root.depth != 0 {
        return Err(StructureError::BadRoot {
            parent: root.parent,
            depth: root.depth,
        });
    }

    check_links(nodes, boxes)?;
    check_leaves(soup, nodes, boxes, primitive_indices, options)
}

/// Single-parent, parent/depth back-links, child box containment, reachability.
fn check_links(nodes: &[FlatNode], boxes: &[Aabb]) -> Result<(), StructureError> {
    // The root counts as referenced so nothing may point back at it
    let mut referenced = vec![false; nodes.len()];
    referenced[0] = true;

    for (id, node) in nodes.iter().enumerate() {
        if node.leaf() {
            continue;
        }

        for child in [node.child_a, node.child_b] {
            if child < 0 || child as usize >= nodes.len() {
                return Err(StructureError::ChildOutOfRange { node: id, child });
            }

            let child_id = child as usize;
            if std::mem::replace(&mut referenced[child_id], true) {
                return Err(StructureError::SharedChild { child: child_id });
            }

            let child_node = nodes[child_id];
            if child_node.parent != id as i32 {
                return Err(StructureError::ParentMismatch {
                    node: child_id,
                    expected: id,
                    found: child_node.parent,
                });
            }
            if child_node.depth != node.depth + 1 {
                return Err(StructureError::DepthMismatch {
                    node: child_id,
                    expected: node.depth + 1,
                    found: child_node.depth,
                });
            }
            if !boxes[id].contains(&boxes[child_id]) {
                return Err(StructureError::ChildBoxEscapes {
                    node: id,
                    child: child_id,
                });
            }
        }
    }

    // Every node has exactly one parent; now make sure they all hang off the root.
    // With single parents a node visited twice is impossible, so no cycle can
    // survive this walk unnoticed.
    let mut reached = vec![false; nodes.len()];
    let mut stack = vec![0usize];
    while let Some(id) = stack.pop() {
        reached[id] = true;
        if let Some((a, b)) = nodes[id].children() {
            stack.push(b);
            stack.push(a);
        }
    }
    if let Some(node) = reached.iter().position(|r| !r) {
        return Err(StructureError::Unreachable { node });
    }

    Ok(())
}

/// Leaf ranges partition the triangles; leaf boxes hold their triangles;
/// leaves only grow past the size limit when forced to.
fn check_leaves(
    soup: &TriangleSoup<'_>,
    nodes: &[FlatNode],
    boxes: &[Aabb],
    primitive_indices: &[u32],
    options: &BuildOptions,
) -> Result<(), StructureError> {
    let bounds = PrimitiveBounds::new(soup);
    let triangle_count = soup.triangle_count();
    let mut seen = vec![false; triangle_count];

    for (id, node) in nodes.iter().enumerate() {
        if !node.leaf() {
            continue;
        }

        let (start, count) = (node.child_a, node.child_b);
        if start < 0 || count < 0 || (start as usize + count as usize) > primitive_indices.len() {
            return Err(StructureError::LeafRangeOutOfBounds {
                node: id,
                start,
                count,
            });
        }
        if count == 0 {
            return Err(StructureError::EmptyLeaf { node: id });
        }

        let prims = &primitive_indices[start as usize..(start + count) as usize];
        let mut centroids = Aabb::EMPTY;

        for &prim in prims {
            let slot = seen
                .get_mut(prim as usize)
                .ok_or(StructureError::PrimitiveOutOfRange { primitive: prim })?;
            if std::mem::replace(slot, true) {
                return Err(StructureError::PrimitiveDuplicated { primitive: prim });
            }

            if !boxes[id].contains(&bounds.boxes[prim as usize]) {
                return Err(StructureError::PrimitiveBoxEscapes {
                    node: id,
                    primitive: prim,
                });
            }
            centroids.grow(bounds.centroids[prim as usize]);
        }

        let count = count as usize;
        let forced_by_depth = node.depth as i64 > options.max_depth as i64;
        let coincident = centroids.extent()[centroids.longest_axis()] < options.min_split_extent;
        if count > options.max_leaf_size && !forced_by_depth && !coincident {
            return Err(StructureError::OversizedLeaf { node: id, count });
        }
    }

    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(StructureError::PrimitiveMissing {
            primitive: missing as u32,
        });
    }

    Ok(())
}
