use crate::{Ray, Vec3};
use bytemuck::{Pod, Zeroable};

/// Default padding applied to node boxes so no axis ends up with zero thickness.
pub const BOX_PADDING: f32 = 0.001;

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// Stored as two corners with `min <= max` on every axis. The layout is
/// `#[repr(C)]` so a slice of boxes can be handed to the GPU as six floats
/// per node: `min.x, min.y, min.z, max.x, max.y, max.z`.
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that contains nothing; the identity for [`Aabb::surrounding`].
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Create a new AABB from its corners.
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB from two arbitrary corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Tight box around a triangle. Degenerate triangles give a flat,
    /// line or point box, which is fine for a primitive box.
    pub fn from_triangle(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self {
            min: v0.min(v1).min(v2),
            max: v0.max(v1).max(v2),
        }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            min: box0.min.min(box1.min),
            max: box0.max.max(box1.max),
        }
    }

    /// Grow the box to include a point.
    pub fn grow(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Expand by `delta` on every axis in both directions.
    ///
    /// A positive `delta` always moves each face by at least one float step,
    /// so far from the origin (where `delta` is below the float spacing) a
    /// flat box still gains thickness.
    pub fn padded(&self, delta: f32) -> Aabb {
        let lo = |v: f32| pad_down(v, delta);
        let hi = |v: f32| -pad_down(-v, delta);
        Aabb {
            min: Vec3::new(lo(self.min.x), lo(self.min.y), lo(self.min.z)),
            max: Vec3::new(hi(self.max.x), hi(self.max.y), hi(self.max.z)),
        }
    }

    /// True for the inverted [`Aabb::EMPTY`] box (or any box with min > max).
    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve towards the lower axis index.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent();

        if e.x >= e.y && e.x >= e.z {
            0
        } else if e.y >= e.z {
            1
        } else {
            2
        }
    }

    /// `2 * (dx*dy + dy*dz + dz*dx)`; zero for an empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let e = self.extent();
        2.0 * (e.x * e.y + e.y * e.z + e.z * e.x)
    }

    /// Zero for an empty box.
    pub fn volume(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }

        let e = self.extent();
        e.x * e.y * e.z
    }

    /// Volume shared by two boxes.
    pub fn overlap_volume(&self, other: &Aabb) -> f32 {
        Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
        .volume()
    }

    /// True if `other` lies fully inside this box (boundaries inclusive).
    pub fn contains(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    /// Test if a ray intersects this AABB within `[t_min, t_max]`.
    ///
    /// Uses the slab method. NaNs from `0 * inf` (ray origin on a slab plane
    /// with a zero direction component) are discarded by `f32::max`/`f32::min`.
    pub fn hit(&self, r: &Ray, mut t_min: f32, mut t_max: f32) -> bool {
        for axis in 0..3 {
            let inv = r.inv_direction[axis];
            let mut t0 = (self.min[axis] - r.origin[axis]) * inv;
            let mut t1 = (self.max[axis] - r.origin[axis]) * inv;
            if inv < 0.0 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t0.max(t_min);
            t_max = t1.min(t_max);
            if t_max < t_min {
                return false;
            }
        }

        true
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// `v - delta`, or the next float below `v` when the subtraction rounds back
/// to `v`. Infinities and a non-positive `delta` pass through unchanged.
fn pad_down(v: f32, delta: f32) -> f32 {
    let padded = v - delta;
    if padded < v || delta <= 0.0 || !v.is_finite() {
        return padded;
    }

    if v == 0.0 {
        -f32::from_bits(1)
    } else if v > 0.0 {
        f32::from_bits(v.to_bits() - 1)
    } else {
        f32::from_bits(v.to_bits() + 1)
    }
}
