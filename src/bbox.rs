//! Axis-aligned bounding boxes used throughout the builder.

use glam::Vec3;

/// An axis-aligned bounding box, stored as `(min, max)` corners.
///
/// The empty box has `min = +inf`, `max = -inf` on every axis; extending it
/// with any point or non-empty box yields that point/box. All surface-area
/// arithmetic treats the empty box as having zero area.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BBox {
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The empty box: the identity element of `extend`/`union`.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: Vec3::INFINITY,
            max: Vec3::NEG_INFINITY,
        }
    }

    /// True if the box contains no points (inverted on at least one axis).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Grow the box to contain `point`.
    #[inline]
    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow the box to contain `other`.
    #[inline]
    pub fn extend_box(&mut self, other: &BBox) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    /// The smallest box containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// The intersection of `self` and `other` (empty if they are disjoint).
    #[inline]
    pub fn overlap(&self, other: &BBox) -> BBox {
        BBox {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Half the surface area of the box; zero for an empty box.
    ///
    /// Proportional to the geometric probability factor of the SAH, so all
    /// cost arithmetic works in half-areas and skips the constant 2.
    #[inline]
    pub fn half_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max - self.min;
        d.x * d.y + d.y * d.z + d.z * d.x
    }

    /// Centroid key along `axis`: `min + max`, without the 0.5 factor
    /// (ordering is all that matters).
    #[inline]
    pub fn centroid_on(&self, axis: usize) -> f32 {
        self.min[axis] + self.max[axis]
    }
}
