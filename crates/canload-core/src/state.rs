#![forbid(unsafe_code)]

//! Per-activation loader state.

use std::time::Duration;

/// Everything the aggregator reads, owned by one [`Loader`](crate::Loader).
///
/// # Invariants
///
/// 1. `structure_done`, `fonts_done` and `finished` only go `false -> true`.
/// 2. `image_loaded <= image_total`; `image_total` is fixed once enumerated.
/// 3. `start_time` never changes after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderState {
    start_time: Duration,
    pub(crate) structure_done: bool,
    pub(crate) fonts_done: bool,
    pub(crate) image_total: u32,
    pub(crate) image_loaded: u32,
    pub(crate) finished: bool,
    pub(crate) current_percent: u8,
}

impl LoaderState {
    /// Fresh state captured at `start_time`.
    #[must_use]
    pub const fn new(start_time: Duration) -> Self {
        Self {
            start_time,
            structure_done: false,
            fonts_done: false,
            image_total: 0,
            image_loaded: 0,
            finished: false,
            current_percent: 0,
        }
    }

    /// Build a state directly from signal values. `image_loaded` is capped
    /// at `image_total`.
    #[must_use]
    pub fn from_parts(
        structure_done: bool,
        fonts_done: bool,
        image_total: u32,
        image_loaded: u32,
        finished: bool,
    ) -> Self {
        Self {
            structure_done,
            fonts_done,
            image_total,
            image_loaded: image_loaded.min(image_total),
            finished,
            ..Self::new(Duration::ZERO)
        }
    }

    #[must_use]
    pub const fn start_time(&self) -> Duration {
        self.start_time
    }

    #[must_use]
    pub const fn structure_done(&self) -> bool {
        self.structure_done
    }

    #[must_use]
    pub const fn fonts_done(&self) -> bool {
        self.fonts_done
    }

    #[must_use]
    pub const fn image_total(&self) -> u32 {
        self.image_total
    }

    #[must_use]
    pub const fn image_loaded(&self) -> u32 {
        self.image_loaded
    }

    #[must_use]
    pub const fn finished(&self) -> bool {
        self.finished
    }

    /// Last percentage handed to the overlay.
    #[must_use]
    pub const fn current_percent(&self) -> u8 {
        self.current_percent
    }

    /// Time since activation, saturating at zero if `now` is earlier.
    #[must_use]
    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.start_time)
    }

    pub(crate) fn mark_structure_done(&mut self) -> bool {
        !std::mem::replace(&mut self.structure_done, true)
    }

    pub(crate) fn mark_fonts_done(&mut self) -> bool {
        !std::mem::replace(&mut self.fonts_done, true)
    }

    pub(crate) fn mark_finished(&mut self) -> bool {
        !std::mem::replace(&mut self.finished, true)
    }

    pub(crate) fn set_image_total(&mut self, total: u32) {
        self.image_total = total;
        self.image_loaded = 0;
    }

    pub(crate) fn record_image(&mut self) {
        if self.image_loaded < self.image_total {
            self.image_loaded += 1;
        }
    }
}
