//! Borrowed triangle-soup input.

use crate::{BvhError, BvhResult};
use rtbvh_math::Vec3;

/// An immutable, validated triangle soup.
///
/// Triangle `i` occupies vertices `[3i, 3i + 3)`. The soup borrows the
/// caller's vertex buffer; nothing is copied or reordered.
#[derive(Debug, Clone, Copy)]
pub struct TriangleSoup<'a> {
    vertices: &'a [Vec3],
}

impl<'a> TriangleSoup<'a> {
    /// Wrap a vertex buffer, rejecting empty, misaligned or non-finite input.
    pub fn new(vertices: &'a [Vec3]) -> BvhResult<Self> {
        if vertices.is_empty() {
            return Err(BvhError::EmptySoup);
        }
        if vertices.len() % 3 != 0 {
            return Err(BvhError::MisalignedVertexCount {
                count: vertices.len(),
            });
        }

        let triangle_count = vertices.len() / 3;
        if triangle_count > i32::MAX as usize {
            return Err(BvhError::TooManyPrimitives {
                count: triangle_count,
            });
        }

        if let Some(vertex) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(BvhError::NonFiniteVertex { vertex });
        }

        Ok(Self { vertices })
    }

    /// Wrap a flat `[x, y, z, x, y, z, ...]` float buffer.
    pub fn from_flat(floats: &'a [f32]) -> BvhResult<Self> {
        if floats.is_empty() {
            return Err(BvhError::EmptySoup);
        }
        if floats.len() % 9 != 0 {
            return Err(BvhError::MisalignedFloatCount {
                count: floats.len(),
            });
        }

        let vertices: &[Vec3] = bytemuck::try_cast_slice(floats).map_err(|_| {
            BvhError::MisalignedFloatCount {
                count: floats.len(),
            }
        })?;
        Self::new(vertices)
    }

    pub fn vertices(&self) -> &'a [Vec3] {
        self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    /// The three vertices of triangle `index`.
    ///
    /// Panics if `index >= triangle_count()`.
    pub fn triangle(&self, index: usize) -> [Vec3; 3] {
        let base = index * 3;
        [
            self.vertices[base],
            self.vertices[base + 1],
            self.vertices[base + 2],
        ]
    }

    /// Iterate over triangles in input order.
    pub fn triangles(&self) -> impl ExactSizeIterator<Item = [Vec3; 3]> + 'a {
        self.vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle(offset: Vec3) -> [Vec3; 3] {
        [offset, offset + Vec3::X, offset + Vec3::Y]
    }

    #[test]
    fn test_soup_creation() {
        let mut vertices = Vec::new();
        vertices.extend(unit_triangle(Vec3::ZERO));
        vertices.extend(unit_triangle(Vec3::splat(5.0)));

        let soup = TriangleSoup::new(&vertices).unwrap();
        assert_eq!(soup.triangle_count(), 2);
        assert_eq!(soup.triangle(1), unit_triangle(Vec3::splat(5.0)));
        assert_eq!(soup.triangles().len(), 2);
    }

    #[test]
    fn test_soup_rejects_empty() {
        assert_eq!(TriangleSoup::new(&[]).unwrap_err(), BvhError::EmptySoup);
        assert_eq!(TriangleSoup::from_flat(&[]).unwrap_err(), BvhError::EmptySoup);
    }

    #[test]
    fn test_soup_rejects_misaligned() {
        let vertices = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z];
        assert_eq!(
            TriangleSoup::new(&vertices).unwrap_err(),
            BvhError::MisalignedVertexCount { count: 4 }
        );

        let floats = [0.0f32; 10];
        assert_eq!(
            TriangleSoup::from_flat(&floats).unwrap_err(),
            BvhError::MisalignedFloatCount { count: 10 }
        );
    }

    #[test]
    fn test_soup_rejects_non_finite() {
        let vertices = [Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0), Vec3::Y];
        assert_eq!(
            TriangleSoup::new(&vertices).unwrap_err(),
            BvhError::NonFiniteVertex { vertex: 1 }
        );
    }

    #[test]
    fn test_soup_from_flat() {
        let floats = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let soup = TriangleSoup::from_flat(&floats).unwrap();

        assert_eq!(soup.triangle_count(), 1);
        assert_eq!(soup.triangle(0), [Vec3::ZERO, Vec3::X, Vec3::Y]);
    }
}
