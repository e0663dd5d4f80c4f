//! Spatial splits: binned search with exact triangle clipping, and the
//! partition / unsplit / duplicate application path.
//!
//! See Stich et al., "Spatial Splits in Bounding Volume Hierarchies" (2009).
//! Unlike an object split, a spatial split cuts at a plane and may clip a
//! straddling reference into two, duplicating its triangle id across both
//! children; the unsplit step undoes that duplication whenever absorbing the
//! whole reference into one side is cheaper.

use crate::bbox::BBox;
use crate::cost::CostFn;

use super::arena::{Ref, RefRange};
use super::{Builder, Node};

/// Best spatial split found so far, shared across axes and binning passes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SpatialSplit {
    pub axis: usize,
    pub cost: f32,
    pub position: f32,
}

impl Default for SpatialSplit {
    fn default() -> Self {
        Self {
            axis: 0,
            cost: f32::MAX,
            position: 0.0,
        }
    }
}

/// One spatial bin: the clipped geometry bounds plus how many references
/// start (`entry`) and end (`exit`) here.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Bin {
    bb: BBox,
    entry: u32,
    exit: u32,
}

impl Bin {
    pub(crate) const EMPTY: Bin = Bin {
        bb: BBox::empty(),
        entry: 0,
        exit: 0,
    };
}

impl<C: CostFn> Builder<'_, C> {
    /// Search one axis for the best spatial split plane.
    ///
    /// The first pass bins over the parent's full extent; each further pass
    /// narrows the interval to one bin width on either side of the best
    /// plane and rebins every reference over that window. A pass that fails
    /// to improve the split ends the refinement early.
    pub(crate) fn find_spatial_split(
        &mut self,
        split: &mut SpatialSplit,
        parent_bb: &BBox,
        axis: usize,
        range: RefRange,
    ) {
        let mut axis_min = parent_bb.min[axis];
        let mut axis_max = parent_bb.max[axis];
        debug_assert!(axis_max > axis_min);

        for _ in 0..self.binning_passes {
            if axis_max <= axis_min {
                break;
            }
            let bin_size = (axis_max - axis_min) / self.bins.len() as f32;
            if self.spatial_binning(split, axis, range, axis_min, axis_max).is_none() {
                break;
            }
            axis_min = split.position - bin_size;
            axis_max = split.position + bin_size;
        }
    }

    /// One binning pass over `[axis_min, axis_max]`. Returns the winning
    /// boundary index if this pass improved `split`.
    fn spatial_binning(
        &mut self,
        split: &mut SpatialSplit,
        axis: usize,
        range: RefRange,
        axis_min: f32,
        axis_max: f32,
    ) -> Option<usize> {
        let num_bins = self.bins.len();
        self.bins.fill(Bin::EMPTY);

        let bin_size = (axis_max - axis_min) / num_bins as f32;
        let inv_size = 1.0 / bin_size;
        let max_bin = num_bins as i32 - 1;

        // Walk each reference through its bin span, clipping the triangle
        // against each interior bin plane. `cur_bb` is the portion of the
        // reference still to the right of the last plane crossed.
        for r in self.arena.slice(range) {
            let first = ((inv_size * (r.bb.min[axis] - axis_min)) as i32).clamp(0, max_bin) as usize;
            let last = ((inv_size * (r.bb.max[axis] - axis_min)) as i32).clamp(0, max_bin) as usize;

            let mut cur_bb = r.bb;
            for j in first..last {
                let plane = if j < num_bins - 1 {
                    axis_min + (j + 1) as f32 * bin_size
                } else {
                    axis_max
                };
                let (left_bb, right_bb) = self.tris[r.id as usize].split(axis, plane);
                self.bins[j].bb.extend_box(&left_bb.overlap(&cur_bb));
                cur_bb = right_bb.overlap(&cur_bb);
            }

            self.bins[last].bb.extend_box(&cur_bb);
            self.bins[first].entry += 1;
            self.bins[last].exit += 1;
        }

        // Suffix boxes over bins, reusing the shared scratch.
        let mut cur_bb = BBox::empty();
        for i in (1..num_bins).rev() {
            cur_bb.extend_box(&self.bins[i].bb);
            self.right_bbs[i - 1] = cur_bb;
        }

        // Sweep boundaries left to right. Boundaries that would leave either
        // side without references are not candidates (their zero half-area
        // would game the cost).
        let mut left_count = 0usize;
        let mut right_count = range.count;
        let mut cur_bb = BBox::empty();
        let mut best = None;

        for i in 0..num_bins - 1 {
            left_count += self.bins[i].entry as usize;
            right_count -= self.bins[i].exit as usize;
            cur_bb.extend_box(&self.bins[i].bb);
            if left_count == 0 || right_count == 0 {
                continue;
            }

            let cost = C::leaf_cost(left_count, cur_bb.half_area())
                + C::leaf_cost(right_count, self.right_bbs[i].half_area());
            if cost < split.cost {
                split.axis = axis;
                split.cost = cost;
                split.position = axis_min + (i + 1) as f32 * bin_size;
                best = Some(i);
            }
        }
        best
    }

    /// Apply a spatial split: three-region in-place partition, then a
    /// per-straddler unsplit/duplicate decision.
    ///
    /// The reference range is rearranged with swaps only into
    /// `[pure-left | straddlers | pure-right]`; each straddler is then
    /// resolved to whichever of unsplit-left, unsplit-right, or duplicate is
    /// cheapest under the leaf cost model (ties prefer not duplicating, left
    /// before right). Only if at least one straddler was duplicated does the
    /// right child get a fresh arena block; otherwise both children alias
    /// the parent's slice.
    pub(crate) fn apply_spatial_split(
        &mut self,
        split: &SpatialSplit,
        range: RefRange,
    ) -> (Node, Node) {
        let axis = split.axis;
        let position = split.position;
        let ref_count = range.count;

        let mut left_bb = BBox::empty();
        let mut right_bb = BBox::empty();
        let mut left_count = 0usize;
        let mut first_right = ref_count;

        {
            let refs = self.arena.slice_mut(range);
            let mut cur_ref = 0usize;
            while cur_ref < first_right {
                let bb = refs[cur_ref].bb;
                if bb.max[axis] <= position {
                    left_bb.extend_box(&bb);
                    refs.swap(cur_ref, left_count);
                    cur_ref += 1;
                    left_count += 1;
                } else if bb.min[axis] >= position {
                    first_right -= 1;
                    right_bb.extend_box(&bb);
                    refs.swap(cur_ref, first_right);
                } else {
                    cur_ref += 1;
                }
            }
        }

        let mut right_count = ref_count - first_right;

        self.dup_scratch.clear();
        while left_count < first_right {
            let r = self.arena.refs[range.start + left_count];
            let (mut left_split_bb, mut right_split_bb) =
                self.tris[r.id as usize].split(axis, position);
            // Clipping cannot exceed the reference's own (possibly already
            // clipped) bounds.
            left_split_bb = left_split_bb.overlap(&r.bb);
            right_split_bb = right_split_bb.overlap(&r.bb);

            let left_unsplit_bb = r.bb.union(&left_bb);
            let right_unsplit_bb = r.bb.union(&right_bb);
            let left_dup_bb = left_split_bb.union(&left_bb);
            let right_dup_bb = right_split_bb.union(&right_bb);

            let unsplit_left_cost = C::leaf_cost(left_count + 1, left_unsplit_bb.half_area())
                + C::leaf_cost(right_count, right_bb.half_area());
            let unsplit_right_cost = C::leaf_cost(left_count, left_bb.half_area())
                + C::leaf_cost(right_count + 1, right_unsplit_bb.half_area());
            let dup_cost = C::leaf_cost(left_count + 1, left_dup_bb.half_area())
                + C::leaf_cost(right_count + 1, right_dup_bb.half_area());

            let min_cost = dup_cost.min(unsplit_left_cost).min(unsplit_right_cost);

            // The left-leaning tie-break below can starve the right region
            // when it holds no pure-right references; the last straddler
            // must not unsplit left in that case.
            let must_feed_right = right_count == 0 && left_count + 1 == first_right;

            if min_cost == unsplit_left_cost && !must_feed_right {
                left_bb = left_unsplit_bb;
                left_count += 1;
            } else if min_cost == unsplit_right_cost
                || (must_feed_right && unsplit_right_cost <= dup_cost)
            {
                right_bb = right_unsplit_bb;
                first_right -= 1;
                self.arena
                    .refs
                    .swap(range.start + first_right, range.start + left_count);
                right_count += 1;
            } else {
                left_bb = left_dup_bb;
                right_bb = right_dup_bb;
                self.arena.refs[range.start + left_count].bb = left_split_bb;
                self.dup_scratch.push(Ref {
                    id: r.id,
                    bb: right_split_bb,
                });
                left_count += 1;
                right_count += 1;
            }
        }

        // References sitting exactly on the plane can classify wholly to one
        // side even though the binning sweep predicted both sides occupied
        // (bin-index rounding and the plane comparison need not agree at
        // boundaries). Steal the extremal reference back so neither child
        // is empty. Straddler handling above already guarantees this
        // whenever the straddler region was non-empty.
        if right_count == 0 {
            debug_assert_eq!(left_count, ref_count);
            let refs = self.arena.slice_mut(range);
            let mut idx = 0usize;
            for i in 1..refs.len() {
                if refs[i].bb.max[axis] > refs[idx].bb.max[axis] {
                    idx = i;
                }
            }
            let last = refs.len() - 1;
            refs.swap(idx, last);
            right_bb = refs[last].bb;
            left_bb = BBox::empty();
            for r in &refs[..last] {
                left_bb.extend_box(&r.bb);
            }
            left_count = last;
            first_right = last;
            right_count = 1;
        } else if left_count == 0 {
            debug_assert_eq!(right_count, ref_count);
            let refs = self.arena.slice_mut(range);
            let mut idx = 0usize;
            for i in 1..refs.len() {
                if refs[i].bb.min[axis] < refs[idx].bb.min[axis] {
                    idx = i;
                }
            }
            refs.swap(idx, 0);
            left_bb = refs[0].bb;
            right_bb = BBox::empty();
            for r in &refs[1..] {
                right_bb.extend_box(&r.bb);
            }
            left_count = 1;
            first_right = 1;
            right_count = ref_count - 1;
        }

        let left_range = RefRange {
            start: range.start,
            count: left_count,
        };
        let right_range = if self.dup_scratch.is_empty() {
            RefRange {
                start: range.start + first_right,
                count: right_count,
            }
        } else {
            // Duplicates force the right child out of the shared slice:
            // [duplicated pieces..., pure-right tail...].
            let tail = RefRange {
                start: range.start + first_right,
                count: ref_count - first_right,
            };
            self.arena.alloc_right_block(&self.dup_scratch, tail)
        };

        debug_assert!(left_count > 0 && right_count > 0);
        debug_assert_eq!(right_range.count, right_count);
        debug_assert!(!left_bb.is_empty() && !right_bb.is_empty());

        (
            Node::new::<C>(left_range, left_bb),
            Node::new::<C>(right_range, right_bb),
        )
    }
}
