//! SAH object splits: sorted-sweep search and in-place application.

use crate::bbox::BBox;
use crate::cost::CostFn;

use super::arena::{Ref, RefRange};
use super::Builder;

/// Best object split found so far, shared across the three axis sweeps.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ObjectSplit {
    pub axis: usize,
    pub cost: f32,
    pub left_bb: BBox,
    pub right_bb: BBox,
    pub left_count: usize,
}

impl Default for ObjectSplit {
    fn default() -> Self {
        Self {
            axis: 0,
            cost: f32::MAX,
            left_bb: BBox::empty(),
            right_bb: BBox::empty(),
            left_count: 0,
        }
    }
}

/// Sort references by centroid along `axis`, breaking ties by triangle id so
/// that builds are deterministic for any input order of equal centroids.
pub(crate) fn sort_refs(axis: usize, refs: &mut [Ref]) {
    refs.sort_unstable_by(|a, b| {
        a.bb.centroid_on(axis)
            .total_cmp(&b.bb.centroid_on(axis))
            .then_with(|| a.id.cmp(&b.id))
    });
}

impl<C: CostFn> Builder<'_, C> {
    /// Sweep one axis and fold the best boundary into `split`.
    ///
    /// Sorts the range by centroid, accumulates suffix boxes right-to-left
    /// into the shared scratch, then sweeps left-to-right evaluating the SAH
    /// cost of every boundary.
    pub(crate) fn find_object_split(
        &mut self,
        split: &mut ObjectSplit,
        axis: usize,
        range: RefRange,
    ) {
        let count = range.count;
        debug_assert!(count > 1);

        let refs = self.arena.slice_mut(range);
        sort_refs(axis, refs);

        // Suffix boxes: right_bbs[i] bounds refs[i+1..count).
        let mut cur_bb = BBox::empty();
        for i in (1..count).rev() {
            cur_bb.extend_box(&refs[i].bb);
            self.right_bbs[i - 1] = cur_bb;
        }

        let refs = self.arena.slice(range);
        let mut cur_bb = BBox::empty();
        for i in 0..count - 1 {
            cur_bb.extend_box(&refs[i].bb);
            let cost = C::leaf_cost(i + 1, cur_bb.half_area())
                + C::leaf_cost(count - i - 1, self.right_bbs[i].half_area());
            if cost < split.cost {
                split.axis = axis;
                split.cost = cost;
                split.left_count = i + 1;
                split.left_bb = cur_bb;
                split.right_bb = self.right_bbs[i];
            }
        }

        debug_assert!(split.left_count > 0 && split.left_count < count);
    }

    /// Re-sort by the winning axis and cut the range at `left_count`. Both
    /// children alias the parent's slice; no references move between arena
    /// blocks.
    pub(crate) fn apply_object_split(
        &mut self,
        split: &ObjectSplit,
        range: RefRange,
    ) -> (super::Node, super::Node) {
        sort_refs(split.axis, self.arena.slice_mut(range));

        let left = RefRange {
            start: range.start,
            count: split.left_count,
        };
        let right = RefRange {
            start: range.start + split.left_count,
            count: range.count - split.left_count,
        };
        (
            super::Node::new::<C>(left, split.left_bb),
            super::Node::new::<C>(right, split.right_bb),
        )
    }
}
