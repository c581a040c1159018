//! Error types for BVH construction.

use thiserror::Error;

/// Errors that reject a build before any work is done, or abort it.
///
/// Degenerate geometry is never an error: zero-area triangles and coincident
/// centroids are absorbed by the leaf fallbacks in the builder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    #[error("Triangle soup is empty")]
    EmptySoup,

    #[error("Vertex count {count} is not a multiple of 3")]
    MisalignedVertexCount { count: usize },

    #[error("Float count {count} is not a multiple of 9 (3 vertices x 3 components)")]
    MisalignedFloatCount { count: usize },

    #[error("Vertex {vertex} has a non-finite coordinate")]
    NonFiniteVertex { vertex: usize },

    #[error("{count} triangles exceed the 32-bit node/primitive id range")]
    TooManyPrimitives { count: usize },

    #[error("Invalid build options: {0}")]
    InvalidOptions(String),

    #[error("Cannot compute the union of zero boxes")]
    EmptyBoxSet,

    #[error("Build was cancelled")]
    Cancelled,
}

/// Result type for BVH operations.
pub type BvhResult<T> = Result<T, BvhError>;
