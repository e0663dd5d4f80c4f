//! Depth-first SBVH construction driver.
//!
//! The builder walks a bounded work stack of nodes. Each popped node seeds a
//! multi-node that is greedily expanded: the cheapest untested child is
//! searched for the best object split and, when the object split leaves
//! significant overlap, the best spatial split; the winner replaces the
//! child if it beats the SAH cost of leaving the child a leaf. Once the
//! multi-node is full or out of candidates it is emitted through the
//! caller's sinks and its children are pushed for further processing.

pub(crate) mod arena;
mod object_split;
mod spatial_split;
pub mod timing;


use std::marker::PhantomData;
use std::time::Instant;

use crate::bbox::BBox;
use crate::cost::CostFn;
use crate::tri::Tri;
use crate::{BuildStats, BuilderConfig};

use arena::{Ref, RefArena, RefRange};
use object_split::ObjectSplit;
use spatial_split::{Bin, SpatialSplit};
use timing::Timer;

/// A working node: a contiguous reference range plus its bounds and SAH
/// leaf cost. `tested` marks a child the driver has already refused to
/// split further.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Node {
    refs: RefRange,
    bbox: BBox,
    cost: f32,
    tested: bool,
}

impl Node {
    fn new<C: CostFn>(refs: RefRange, bbox: BBox) -> Self {
        Self {
            refs,
            bbox,
            cost: C::leaf_cost(refs.count, bbox.half_area()),
            tested: false,
        }
    }

    #[inline]
    fn size(&self) -> usize {
        self.refs.count
    }
}

impl Default for Node {
    fn default() -> Self {
        Self {
            refs: RefRange::default(),
            bbox: BBox::empty(),
            cost: 0.0,
            tested: false,
        }
    }
}

/// Up to `N` children being grown before emission as one interior node.
struct MultiNode<const N: usize> {
    nodes: [Node; N],
    bbox: BBox,
    count: usize,
}

impl<const N: usize> MultiNode<N> {
    fn new(node: Node) -> Self {
        let mut nodes = [Node::default(); N];
        let bbox = node.bbox;
        nodes[0] = node;
        Self {
            nodes,
            bbox,
            count: 1,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.count == N
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.count == 1
    }

    /// The cheapest untested child, ties to the lowest slot. `None` when
    /// every child has been sealed.
    fn next_untested(&self) -> Option<usize> {
        if N == 2 {
            // Binary fast path: the sole slot is the only candidate.
            return (!self.nodes[0].tested).then_some(0);
        }
        let mut best = None;
        let mut best_cost = f32::MAX;
        for (i, node) in self.nodes[..self.count].iter().enumerate() {
            if !node.tested && node.cost < best_cost {
                best = Some(i);
                best_cost = node.cost;
            }
        }
        best
    }

    fn split_node(&mut self, slot: usize, left: Node, right: Node) {
        debug_assert!(self.count < N);
        self.nodes[slot] = left;
        self.nodes[self.count] = right;
        self.count += 1;
    }

    /// Order children by ascending reference count so the smallest work is
    /// popped first. Stable, so equal sizes keep their slot order and the
    /// emitted sequence stays deterministic.
    fn sort_by_size(&mut self) {
        self.nodes[..self.count].sort_by(|a, b| a.size().cmp(&b.size()));
    }
}

/// Fixed-capacity depth-first work stack.
struct NodeStack {
    elems: Vec<Node>,
    capacity: usize,
}

impl NodeStack {
    fn new(capacity: usize) -> Self {
        Self {
            elems: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    fn push(&mut self, node: Node) {
        debug_assert!(self.elems.len() < self.capacity);
        self.elems.push(node);
    }

    #[inline]
    fn pop(&mut self) -> Option<Node> {
        self.elems.pop()
    }

    /// Whether `count` more nodes fit without reaching the capacity bound.
    #[inline]
    fn has_room_for(&self, count: usize) -> bool {
        self.elems.len() + count < self.capacity
    }
}

/// Build state shared by the split-search and split-apply passes: the input
/// triangles, the reference arena, and the reusable scratch buffers.
pub(crate) struct Builder<'t, C: CostFn> {
    tris: &'t [Tri],
    arena: RefArena,
    mesh_bb: BBox,
    /// Suffix-box scratch shared by the object sweep and the bin sweep,
    /// sized to `max(spatial_bins, tri_count)`.
    right_bbs: Vec<BBox>,
    bins: Vec<Bin>,
    /// Duplicated right-side pieces of the current spatial split; reused
    /// across splits to keep the hot path allocation-free.
    dup_scratch: Vec<Ref>,
    leaf_threshold: usize,
    binning_passes: usize,
    spatial_threshold: f32,
    /// Arena size at which spatial splitting shuts off and construction
    /// continues with object splits only.
    ref_cap: usize,
    stats: BuildStats,
    _cost: PhantomData<C>,
}

impl<'t, C: CostFn> Builder<'t, C> {
    pub(crate) fn new(tris: &'t [Tri], config: &BuilderConfig) -> Self {
        let tri_count = tris.len();

        let mut arena = RefArena::with_capacity(tri_count + tri_count / 4);
        let mut mesh_bb = BBox::empty();
        for (i, tri) in tris.iter().enumerate() {
            let bb = tri.bbox();
            mesh_bb.extend_box(&bb);
            arena.push(Ref { id: i as u32, bb });
        }

        let stats = BuildStats {
            tri_count,
            ..BuildStats::default()
        };

        Self {
            tris,
            arena,
            mesh_bb,
            right_bbs: vec![BBox::empty(); config.spatial_bins.max(tri_count)],
            bins: vec![Bin::EMPTY; config.spatial_bins],
            dup_scratch: Vec::new(),
            leaf_threshold: config.leaf_threshold,
            binning_passes: config.binning_passes,
            spatial_threshold: mesh_bb.half_area() * config.alpha,
            ref_cap: (config.max_duplication as f64 * tri_count as f64).ceil() as usize,
            stats,
            _cost: PhantomData,
        }
    }

    pub(crate) fn run<const N: usize, NS, LS>(
        mut self,
        stack_capacity: usize,
        mut write_node: NS,
        mut write_leaf: LS,
    ) -> BuildStats
    where
        NS: FnMut(BBox, usize, &dyn Fn(usize) -> BBox),
        LS: FnMut(BBox, usize, &dyn Fn(usize) -> u32),
    {
        let build_start = Instant::now();

        let root = Node::new::<C>(
            RefRange {
                start: 0,
                count: self.tris.len(),
            },
            self.mesh_bb,
        );
        let mut stack = NodeStack::new(stack_capacity);
        stack.push(root);

        while let Some(popped) = stack.pop() {
            let mut multi = MultiNode::<N>::new(popped);

            while !multi.is_full() {
                let Some(slot) = multi.next_untested() else {
                    break;
                };
                let node = multi.nodes[slot];
                debug_assert!(node.refs.count > 0);

                if node.refs.count <= self.leaf_threshold {
                    multi.nodes[slot].tested = true;
                    continue;
                }

                let t = Timer::start();
                let mut object = ObjectSplit::default();
                for axis in 0..3 {
                    self.find_object_split(&mut object, axis, node.refs);
                }
                self.stats.phases.add_object_search(&t);

                // Spatial splits are only worth searching when the object
                // split leaves the children significantly overlapping
                // (teapot-in-stadium), and only while the duplication cap
                // has not been hit.
                let mut spatial = SpatialSplit::default();
                if self.arena.len() < self.ref_cap
                    && object.left_bb.overlap(&object.right_bb).half_area()
                        > self.spatial_threshold
                {
                    let t = Timer::start();
                    for axis in 0..3 {
                        if node.bbox.min[axis] == node.bbox.max[axis] {
                            continue;
                        }
                        self.find_spatial_split(&mut spatial, &node.bbox, axis, node.refs);
                    }
                    self.stats.phases.add_spatial_search(&t);
                }

                let use_spatial = spatial.cost < object.cost;
                let split_cost = if use_spatial { spatial.cost } else { object.cost };

                if split_cost + C::traversal_cost(node.bbox.half_area()) >= node.cost {
                    // Splitting does not beat making a leaf here.
                    multi.nodes[slot].tested = true;
                    continue;
                }

                let (left, right) = if use_spatial {
                    let t = Timer::start();
                    let children = self.apply_spatial_split(&spatial, node.refs);
                    self.stats.phases.add_spatial_apply(&t);
                    self.stats.spatial_splits += 1;
                    children
                } else {
                    self.stats.object_splits += 1;
                    self.apply_object_split(&object, node.refs)
                };
                multi.split_node(slot, left, right);
            }

            multi.sort_by_size();

            if multi.is_leaf() {
                debug_assert!(multi.nodes[0].tested);
                self.emit_leaf(&multi.nodes[0], &mut write_leaf);
            } else {
                self.emit_node(&multi, &mut write_node);
                if stack.has_room_for(multi.count) {
                    // Reverse push so the smallest child is processed next.
                    for i in (0..multi.count).rev() {
                        stack.push(multi.nodes[i]);
                    }
                } else {
                    // Out of stack: seal every child as a leaf. Correct,
                    // merely suboptimal.
                    for i in 0..multi.count {
                        self.emit_leaf(&multi.nodes[i], &mut write_leaf);
                    }
                }
            }
        }

        self.stats.peak_refs = self.arena.len();
        self.stats.build_time = build_start.elapsed();
        self.stats
    }

    fn emit_node<const N: usize, NS>(&mut self, multi: &MultiNode<N>, write_node: &mut NS)
    where
        NS: FnMut(BBox, usize, &dyn Fn(usize) -> BBox),
    {
        write_node(multi.bbox, multi.count, &|i| multi.nodes[i].bbox);
        self.stats.nodes += 1;
    }

    fn emit_leaf<LS>(&mut self, node: &Node, write_leaf: &mut LS)
    where
        LS: FnMut(BBox, usize, &dyn Fn(usize) -> u32),
    {
        let refs = self.arena.slice(node.refs);
        write_leaf(node.bbox, node.refs.count, &|i| refs[i].id);
        self.stats.leaves += 1;
        self.stats.emitted_refs += node.refs.count;
    }
}
