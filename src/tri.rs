//! The triangle primitive: bounding boxes and exact plane clipping.

use glam::Vec3;

use crate::bbox::BBox;

/// A triangle in 3-space. Input geometry is read-only for the whole build.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tri {
    pub v0: Vec3,
    pub v1: Vec3,
    pub v2: Vec3,
}

impl Tri {
    #[inline]
    pub const fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Tight bounding box of the three vertices.
    #[inline]
    pub fn bbox(&self) -> BBox {
        BBox {
            min: self.v0.min(self.v1).min(self.v2),
            max: self.v0.max(self.v1).max(self.v2),
        }
    }

    /// Surface area; zero for degenerate (colinear) triangles.
    #[inline]
    pub fn area(&self) -> f32 {
        0.5 * (self.v1 - self.v0).cross(self.v2 - self.v0).length()
    }

    /// Clip the triangle by the plane `x[axis] == position` and return the
    /// tight bounding boxes of the two halves: the portion with coordinates
    /// `<= position` and the portion with coordinates `>= position`.
    ///
    /// Vertices exactly on the plane belong to both halves; an edge crossing
    /// the plane contributes its intersection point to both boxes. At least
    /// one half is non-empty for any finite triangle.
    pub fn split(&self, axis: usize, position: f32) -> (BBox, BBox) {
        let mut left = BBox::empty();
        let mut right = BBox::empty();

        let verts = [self.v0, self.v1, self.v2, self.v0];
        for i in 0..3 {
            let a = verts[i];
            let b = verts[i + 1];
            let ad = a[axis];
            let bd = b[axis];

            if ad <= position {
                left.extend(a);
            }
            if ad >= position {
                right.extend(a);
            }

            if (ad < position && position < bd) || (bd < position && position < ad) {
                let t = ((position - ad) / (bd - ad)).clamp(0.0, 1.0);
                let mut p = a.lerp(b, t);
                // Pin the split coordinate so rounding cannot push the
                // intersection point off the plane.
                p[axis] = position;
                left.extend(p);
                right.extend(p);
            }
        }

        (left, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_right_tri() -> Tri {
        Tri::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn bbox_is_tight() {
        let bb = unit_right_tri().bbox();
        assert_eq!(bb.min, Vec3::ZERO);
        assert_eq!(bb.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn area_of_unit_right_triangle() {
        assert!((unit_right_tri().area() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn area_of_degenerate_triangle_is_zero() {
        let t = Tri::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(t.area(), 0.0);
    }

    #[test]
    fn split_through_interior() {
        let (left, right) = unit_right_tri().split(0, 0.5);

        // Left half: v0, v2 and the two intersection points at x = 0.5.
        assert_eq!(left.min, Vec3::ZERO);
        assert_eq!(left.max, Vec3::new(0.5, 1.0, 0.0));

        // Right half: v1 plus the same two intersection points. The
        // hypotenuse crosses x = 0.5 at y = 0.5.
        assert_eq!(right.min, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(right.max, Vec3::new(1.0, 0.5, 0.0));
    }

    #[test]
    fn split_halves_union_to_full_bbox() {
        let tri = unit_right_tri();
        let (left, right) = tri.split(1, 0.25);
        assert_eq!(left.union(&right), tri.bbox());
    }

    #[test]
    fn split_outside_leaves_one_side_empty() {
        let (left, right) = unit_right_tri().split(0, 2.0);
        assert!(!left.is_empty());
        assert!(right.is_empty());
        assert_eq!(left, unit_right_tri().bbox());
    }

    #[test]
    fn vertex_on_plane_belongs_to_both_sides() {
        // v0 sits exactly on x = 0; the right portion of the half-space
        // x <= 0 is just that vertex.
        let (left, right) = unit_right_tri().split(0, 0.0);
        assert!(!left.is_empty());
        assert!(!right.is_empty());
        assert_eq!(left.min, Vec3::ZERO);
        assert_eq!(left.max, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(right, unit_right_tri().bbox());
    }

    #[test]
    fn split_of_axis_flat_triangle() {
        // Triangle flat in z, split along z through its plane: both halves
        // collapse to the triangle itself.
        let tri = unit_right_tri();
        let (left, right) = tri.split(2, 0.0);
        assert_eq!(left, tri.bbox());
        assert_eq!(right, tri.bbox());
    }
}
