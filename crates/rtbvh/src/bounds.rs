//! Bounding-box utilities shared by the builder and the validator.

use crate::{BvhError, BvhResult, TriangleSoup};
use rayon::prelude::*;
use rtbvh_math::{Aabb, Vec3, BOX_PADDING};

/// Soups at least this large compute their primitive boxes in parallel.
const PARALLEL_BOUNDS_THRESHOLD: usize = 16 * 1024;

/// Tight (unpadded) box of a single triangle.
pub fn compute_triangle_bbox(triangle: &[Vec3; 3]) -> Aabb {
    Aabb::from_triangle(triangle[0], triangle[1], triangle[2])
}

/// Union of `boxes`, padded by [`BOX_PADDING`] on every axis.
///
/// Fails with [`BvhError::EmptyBoxSet`] for an empty input.
pub fn compute_union_bbox(boxes: &[Aabb]) -> BvhResult<Aabb> {
    if boxes.is_empty() {
        return Err(BvhError::EmptyBoxSet);
    }

    Ok(union_padded(boxes.iter(), BOX_PADDING))
}

/// Min-of-mins / max-of-maxes over `boxes`, then padded by `padding`.
///
/// Callers guarantee the iterator is non-empty.
pub(crate) fn union_padded<'a>(boxes: impl IntoIterator<Item = &'a Aabb>, padding: f32) -> Aabb {
    boxes
        .into_iter()
        .fold(Aabb::EMPTY, |acc, b| Aabb::surrounding(&acc, b))
        .padded(padding)
}

/// Per-primitive boxes and centroids, computed once for the whole soup.
pub(crate) struct PrimitiveBounds {
    pub boxes: Vec<Aabb>,
    pub centroids: Vec<Vec3>,
}

impl PrimitiveBounds {
    pub fn new(soup: &TriangleSoup<'_>) -> Self {
        let vertices = soup.vertices();

        let boxes: Vec<Aabb> = if soup.triangle_count() >= PARALLEL_BOUNDS_THRESHOLD {
            vertices
                .par_chunks_exact(3)
                .map(|t| Aabb::from_triangle(t[0], t[1], t[2]))
                .collect()
        } else {
            vertices
                .chunks_exact(3)
                .map(|t| Aabb::from_triangle(t[0], t[1], t[2]))
                .collect()
        };
        let centroids = boxes.iter().map(Aabb::centroid).collect();

        Self { boxes, centroids }
    }
}
