//! Spatial-split BVH (SBVH) construction for triangle meshes.
//!
//! This crate builds a bounding volume hierarchy over a triangle set using
//! the surface area heuristic, extended with spatial splits in the style of
//! Stich et al. (2009): where an object partition leaves the two children
//! badly overlapping, the builder considers cutting at an arbitrary plane,
//! clipping straddling triangles and duplicating their references across
//! both children, then undoing the duplication per reference whenever
//! absorbing it whole into one side is cheaper.
//!
//! The tree is not materialized here. The builder walks the hierarchy in
//! depth-first pre-order and hands every interior node and leaf to a pair of
//! caller-supplied sinks, which own whatever encoding the downstream
//! traversal engine wants.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use sbvh::{build, BBox, Tri};
//!
//! let tris = vec![
//!     Tri::new(
//!         Vec3::new(0.0, 0.0, 0.0),
//!         Vec3::new(1.0, 0.0, 0.0),
//!         Vec3::new(0.0, 1.0, 0.0),
//!     ),
//!     Tri::new(
//!         Vec3::new(3.0, 0.0, 0.0),
//!         Vec3::new(4.0, 0.0, 0.0),
//!         Vec3::new(3.0, 1.0, 0.0),
//!     ),
//! ];
//!
//! let mut leaf_refs = Vec::new();
//! let stats = build(
//!     &tris,
//!     |_bbox: BBox, _count: usize, _child_bb: &dyn Fn(usize) -> BBox| {},
//!     |_bbox: BBox, count: usize, ref_id: &dyn Fn(usize) -> u32| {
//!         for i in 0..count {
//!             leaf_refs.push(ref_id(i));
//!         }
//!     },
//! );
//!
//! leaf_refs.sort();
//! assert_eq!(leaf_refs, [0, 1]);
//! assert_eq!(stats.leaves, 2);
//! ```

mod bbox;
mod builder;
mod cost;
mod tri;

use std::time::Duration;

pub use bbox::BBox;
pub use builder::timing::PhaseTimings;
pub use cost::{CostFn, SahCost};
pub use tri::Tri;

/// Construction parameters.
///
/// The defaults reproduce the reference SBVH setup: single-triangle leaves
/// where the SAH allows them, spatial splits enabled almost everywhere
/// (`alpha = 1e-5`), 64 bins with one refinement pass.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Children with at most this many references are never split.
    pub leaf_threshold: usize,
    /// Spatial-split trigger: a spatial split is searched when the object
    /// split's children overlap by more than `alpha` times the root
    /// half-area. `0.0` always searches, `1.0` never does.
    pub alpha: f32,
    /// Bin count per spatial-split binning pass.
    pub spatial_bins: usize,
    /// Total binning passes per axis; passes after the first narrow the
    /// search window around the best plane so far.
    pub binning_passes: usize,
    /// Bound on the depth-first work stack. On overflow the builder emits
    /// the pending children directly as leaves instead of recursing, which
    /// degrades quality but never correctness.
    pub stack_capacity: usize,
    /// Cap on reference duplication: once the arena holds this multiple of
    /// the input triangle count, further splits are object splits only.
    pub max_duplication: f32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            leaf_threshold: 1,
            alpha: 1e-5,
            spatial_bins: 64,
            binning_passes: 2,
            stack_capacity: 128,
            max_duplication: 4.0,
        }
    }
}

/// Counters and timing for one build. Purely observational: nothing here
/// feeds back into cost decisions or emission order.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Input triangle count.
    pub tri_count: usize,
    /// Interior nodes emitted.
    pub nodes: usize,
    /// Leaves emitted.
    pub leaves: usize,
    /// Object splits applied.
    pub object_splits: usize,
    /// Spatial splits applied.
    pub spatial_splits: usize,
    /// References across all emitted leaves; exceeds `tri_count` by the
    /// number of live duplicates.
    pub emitted_refs: usize,
    /// Arena high-water mark, counting references abandoned by
    /// re-allocation as well.
    pub peak_refs: usize,
    /// Wall time of the whole build.
    pub build_time: Duration,
    /// Per-phase durations; populated under the `timing` feature.
    pub phases: PhaseTimings,
}

impl BuildStats {
    /// Emitted references in excess of the input, as a percentage of the
    /// input triangle count.
    pub fn duplication_percent(&self) -> usize {
        if self.tri_count == 0 {
            return 0;
        }
        self.emitted_refs.saturating_sub(self.tri_count) * 100 / self.tri_count
    }

    /// Print a one-line summary (and the phase breakdown, with the
    /// `timing` feature) to stderr.
    pub fn report(&self) {
        eprintln!(
            "[sbvh] built in {:.1}ms ({} nodes, {} leaves, {} object splits, {} spatial splits, +{}% references)",
            self.build_time.as_secs_f64() * 1000.0,
            self.nodes,
            self.leaves,
            self.object_splits,
            self.spatial_splits,
            self.duplication_percent(),
        );
        #[cfg(feature = "timing")]
        self.phases.report(self.build_time);
    }
}

/// Build an SBVH with the default binary layout, cost model and
/// configuration.
///
/// See [`build_with`] for the sink contracts.
pub fn build<NS, LS>(tris: &[Tri], write_node: NS, write_leaf: LS) -> BuildStats
where
    NS: FnMut(BBox, usize, &dyn Fn(usize) -> BBox),
    LS: FnMut(BBox, usize, &dyn Fn(usize) -> u32),
{
    build_with::<2, SahCost, NS, LS>(tris, &BuilderConfig::default(), write_node, write_leaf)
}

/// Build an SBVH over `tris`, emitting the tree through the two sinks.
///
/// `N` is the maximum number of children per emitted interior node; `2`
/// gives the classic binary SBVH. `C` is the SAH cost model.
///
/// `write_node(bbox, child_count, child_bb)` is called once per interior
/// node, before any of its children are emitted, with
/// `child_count ∈ [2, N]`; `child_bb(i)` returns the bounds of child `i`.
/// `write_leaf(bbox, ref_count, ref_id)` is called once per leaf with
/// `ref_count >= 1`; `ref_id(i)` returns a triangle index, and the same
/// index may appear in several leaves once spatial splits have duplicated
/// it. Neither accessor may be retained beyond the call (the borrow
/// enforces this). Given identical input and configuration, the sequence of
/// sink calls is identical between runs.
///
/// # Panics
///
/// Panics if `tris` is empty, or if `N` or any configuration value is out
/// of range (see [`BuilderConfig`]).
pub fn build_with<const N: usize, C, NS, LS>(
    tris: &[Tri],
    config: &BuilderConfig,
    write_node: NS,
    write_leaf: LS,
) -> BuildStats
where
    C: CostFn,
    NS: FnMut(BBox, usize, &dyn Fn(usize) -> BBox),
    LS: FnMut(BBox, usize, &dyn Fn(usize) -> u32),
{
    assert!(N >= 2, "multi-node width N must be at least 2");
    assert!(!tris.is_empty(), "cannot build over an empty triangle set");
    assert!(
        tris.len() <= u32::MAX as usize,
        "triangle indices must fit in u32"
    );
    assert!(config.leaf_threshold >= 1, "leaf_threshold must be positive");
    assert!(
        (0.0..=1.0).contains(&config.alpha),
        "alpha must lie in [0, 1]"
    );
    assert!(config.spatial_bins >= 16, "need at least 16 spatial bins");
    assert!(config.binning_passes >= 1, "need at least one binning pass");
    assert!(config.stack_capacity >= 1, "stack capacity must be positive");
    assert!(
        config.max_duplication >= 1.0,
        "max_duplication below 1 would reject the input itself"
    );

    builder::Builder::<C>::new(tris, config).run::<N, NS, LS>(
        config.stack_capacity,
        write_node,
        write_leaf,
    )
}
