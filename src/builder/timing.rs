//! Zero-cost phase timing for the builder.
//!
//! With the `timing` feature enabled, the builder accumulates per-phase
//! durations that [`BuildStats::report`](crate::BuildStats::report) prints.
//! When disabled, the timer and the phase record are zero-sized and every
//! call compiles away.

#[cfg(feature = "timing")]
use std::time::{Duration, Instant};

#[cfg(feature = "timing")]
pub(crate) struct Timer(Instant);

#[cfg(feature = "timing")]
impl Timer {
    #[inline]
    pub fn start() -> Self {
        Self(Instant::now())
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

#[cfg(not(feature = "timing"))]
pub(crate) struct Timer;

#[cfg(not(feature = "timing"))]
impl Timer {
    #[inline(always)]
    pub fn start() -> Self {
        Timer
    }
}

/// Accumulated time per builder phase.
#[cfg(feature = "timing")]
#[derive(Debug, Clone, Default)]
pub struct PhaseTimings {
    /// Sorted-sweep object-split searches (all axes).
    pub object_search: Duration,
    /// Binned spatial-split searches, including refinement passes.
    pub spatial_search: Duration,
    /// Spatial-split application: partition, unsplit decisions, duplication.
    pub spatial_apply: Duration,
}

#[cfg(feature = "timing")]
impl PhaseTimings {
    #[inline]
    pub(crate) fn add_object_search(&mut self, t: &Timer) {
        self.object_search += t.elapsed();
    }

    #[inline]
    pub(crate) fn add_spatial_search(&mut self, t: &Timer) {
        self.spatial_search += t.elapsed();
    }

    #[inline]
    pub(crate) fn add_spatial_apply(&mut self, t: &Timer) {
        self.spatial_apply += t.elapsed();
    }

    pub(crate) fn report(&self, total: Duration) {
        let pct = |d: Duration| {
            if total.as_nanos() == 0 {
                0.0
            } else {
                d.as_secs_f64() / total.as_secs_f64() * 100.0
            }
        };
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;

        eprintln!(
            "  object_search:  {:7.1}ms ({:4.1}%)",
            ms(self.object_search),
            pct(self.object_search)
        );
        eprintln!(
            "  spatial_search: {:7.1}ms ({:4.1}%)",
            ms(self.spatial_search),
            pct(self.spatial_search)
        );
        eprintln!(
            "  spatial_apply:  {:7.1}ms ({:4.1}%)",
            ms(self.spatial_apply),
            pct(self.spatial_apply)
        );
    }
}

/// Dummy phase record when the `timing` feature is disabled.
#[cfg(not(feature = "timing"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseTimings;

#[cfg(not(feature = "timing"))]
impl PhaseTimings {
    #[inline(always)]
    pub(crate) fn add_object_search(&mut self, _t: &Timer) {}

    #[inline(always)]
    pub(crate) fn add_spatial_search(&mut self, _t: &Timer) {}

    #[inline(always)]
    pub(crate) fn add_spatial_apply(&mut self, _t: &Timer) {}
}
