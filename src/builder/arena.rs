//! Grow-only storage for triangle references.
//!
//! Every working node owns a contiguous range of this arena. Ranges are
//! plain `(start, count)` index pairs, so the backing vector is free to
//! reallocate as spatial splits append duplicate blocks; nothing holds a
//! pointer across an allocation. Ranges abandoned by a split stay in place
//! until the arena is dropped at the end of the build.

use crate::bbox::BBox;

/// A triangle reference: the unit of work the builder partitions.
///
/// `bb` may be tighter than the triangle's own bounding box after spatial
/// clipping; it always stays contained in it. Several references may share
/// one `id` once a straddler has been duplicated.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Ref {
    pub id: u32,
    pub bb: BBox,
}

/// A contiguous range of references in the arena.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct RefRange {
    pub start: usize,
    pub count: usize,
}

impl RefRange {
    #[inline]
    pub fn end(self) -> usize {
        self.start + self.count
    }
}

pub(crate) struct RefArena {
    pub refs: Vec<Ref>,
}

impl RefArena {
    pub fn with_capacity(count: usize) -> Self {
        Self {
            refs: Vec::with_capacity(count),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.refs.len()
    }

    #[inline]
    pub fn push(&mut self, r: Ref) {
        self.refs.push(r);
    }

    #[inline]
    pub fn slice(&self, range: RefRange) -> &[Ref] {
        &self.refs[range.start..range.end()]
    }

    #[inline]
    pub fn slice_mut(&mut self, range: RefRange) -> &mut [Ref] {
        &mut self.refs[range.start..range.end()]
    }

    /// Allocate a fresh block laid out as `[duplicates..., tail copy...]`
    /// and return its range. Used when a spatial split produced duplicate
    /// right-side references and the right child can no longer alias the
    /// parent's slice.
    pub fn alloc_right_block(&mut self, duplicates: &[Ref], tail: RefRange) -> RefRange {
        let start = self.refs.len();
        self.refs.extend_from_slice(duplicates);
        self.refs.extend_from_within(tail.start..tail.end());
        RefRange {
            start,
            count: self.refs.len() - start,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn r(id: u32, x: f32) -> Ref {
        Ref {
            id,
            bb: BBox::new(Vec3::splat(x), Vec3::splat(x + 1.0)),
        }
    }

    #[test]
    fn right_block_layout() {
        let mut arena = RefArena::with_capacity(8);
        for i in 0..4 {
            arena.push(r(i, i as f32));
        }
        let dups = [r(9, 9.0), r(8, 8.0)];
        let block = arena.alloc_right_block(&dups, RefRange { start: 2, count: 2 });

        assert_eq!(block.start, 4);
        assert_eq!(block.count, 4);
        let ids: Vec<u32> = arena.slice(block).iter().map(|r| r.id).collect();
        assert_eq!(ids, [9, 8, 2, 3]);
        // The parent's entries are untouched.
        assert_eq!(arena.refs[2].id, 2);
    }
}
