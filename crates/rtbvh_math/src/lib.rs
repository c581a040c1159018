// Re-export glam for convenience
pub use glam::*;

// Acceleration-structure math types
mod aabb;
mod ray;
pub use aabb::{Aabb, BOX_PADDING};
pub use ray::Ray;
