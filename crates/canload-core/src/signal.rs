#![forbid(unsafe_code)]

//! The three readiness signals.
//!
//! Each tracker observes one readiness class and exposes a `settle` method
//! that returns `true` only for the settlement that changed something. A
//! `false` return means the call was a duplicate or referred to something
//! the tracker never asked for, and the caller must not recompute.
//!
//! Failures are settlements too: a broken image or a rejected font future
//! counts as resolved so the overlay can never get stuck.

use std::collections::HashSet;
use std::fmt;

use crate::host::ReadyState;
use crate::images::ImageSet;

/// Readiness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Structure,
    Fonts,
    Images,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Structure => "structure",
            Self::Fonts => "fonts",
            Self::Images => "images",
        })
    }
}

/// How an asset settled. Both outcomes count as resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Loaded,
    Failed,
}

/// Structure-parsed signal.
#[derive(Debug, Clone, Default)]
pub struct StructureTracker {
    done: bool,
}

impl StructureTracker {
    /// Observe `ready`. Already-parsed documents complete immediately.
    #[must_use]
    pub fn start(ready: ReadyState) -> Self {
        Self {
            done: ready.structure_ready(),
        }
    }

    /// Whether the host still needs to deliver the structure event.
    #[must_use]
    pub const fn needs_listener(&self) -> bool {
        !self.done
    }

    /// The structure event fired.
    pub fn settle(&mut self) -> bool {
        !std::mem::replace(&mut self.done, true)
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.done
    }
}

/// Font-readiness signal.
#[derive(Debug, Clone, Default)]
pub struct FontTracker {
    done: bool,
    outcome: Option<Outcome>,
}

impl FontTracker {
    /// Without a readiness facility nothing can be tracked, so the signal
    /// is satisfied from the start.
    #[must_use]
    pub fn start(has_font_readiness: bool) -> Self {
        Self {
            done: !has_font_readiness,
            outcome: None,
        }
    }

    /// Whether the host still needs to await the font future.
    #[must_use]
    pub const fn needs_listener(&self) -> bool {
        !self.done
    }

    /// The font future settled with `outcome`.
    pub fn settle(&mut self, outcome: Outcome) -> bool {
        if self.done {
            return false;
        }
        self.done = true;
        self.outcome = Some(outcome);
        true
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.done
    }

    /// How the font future settled, if it was tracked and has settled.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }
}

/// Image signal over a fixed URL set.
///
/// # Invariants
///
/// 1. `total` is fixed at [`start`](Self::start).
/// 2. Each URL settles at most once; `resolved <= total`.
/// 3. An empty set is complete only after [`settle_empty`](Self::settle_empty).
#[derive(Debug, Clone, Default)]
pub struct ImageTracker {
    pending: HashSet<String>,
    total: u32,
    resolved: u32,
    failed: u32,
    grace_elapsed: bool,
}

impl ImageTracker {
    /// Track every URL in `set`.
    #[must_use]
    pub fn start(set: &ImageSet) -> Self {
        let pending: HashSet<String> = set.urls().iter().cloned().collect();
        let total = u32::try_from(pending.len()).unwrap_or(u32::MAX);
        Self {
            pending,
            total,
            resolved: 0,
            failed: 0,
            grace_elapsed: false,
        }
    }

    /// One preload settled. Unknown or already-settled URLs are ignored.
    pub fn settle(&mut self, url: &str, outcome: Outcome) -> bool {
        if !self.pending.remove(url) {
            return false;
        }
        self.resolved += 1;
        if outcome == Outcome::Failed {
            self.failed += 1;
        }
        true
    }

    /// The empty-set grace delay elapsed. Only meaningful when nothing was
    /// enumerated.
    pub fn settle_empty(&mut self) -> bool {
        if self.total != 0 || self.grace_elapsed {
            return false;
        }
        self.grace_elapsed = true;
        true
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub const fn resolved(&self) -> u32 {
        self.resolved
    }

    /// How many of the resolved images failed to load.
    #[must_use]
    pub const fn failed(&self) -> u32 {
        self.failed
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        if self.total == 0 {
            self.grace_elapsed
        } else {
            self.resolved >= self.total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(urls: &[&str]) -> ImageSet {
        let mut set = ImageSet::new();
        for url in urls {
            set.insert(url);
        }
        set
    }

    #[test]
    fn structure_already_parsed() {
        let t = StructureTracker::start(ReadyState::Interactive);
        assert!(t.is_complete());
        assert!(!t.needs_listener());
    }

    #[test]
    fn structure_settles_once() {
        let mut t = StructureTracker::start(ReadyState::Loading);
        assert!(t.needs_listener());
        assert!(t.settle());
        assert!(!t.settle());
        assert!(t.is_complete());
    }

    #[test]
    fn fonts_without_facility_are_vacuously_done() {
        let mut t = FontTracker::start(false);
        assert!(t.is_complete());
        assert!(!t.settle(Outcome::Loaded));
        assert_eq!(t.outcome(), None);
    }

    #[test]
    fn font_failure_still_completes() {
        let mut t = FontTracker::start(true);
        assert!(!t.is_complete());
        assert!(t.settle(Outcome::Failed));
        assert!(t.is_complete());
        assert_eq!(t.outcome(), Some(Outcome::Failed));
    }

    #[test]
    fn images_count_failures_as_resolved() {
        let mut t = ImageTracker::start(&set(&["a", "b"]));
        assert!(t.settle("a", Outcome::Failed));
        assert!(!t.is_complete());
        assert!(t.settle("b", Outcome::Loaded));
        assert!(t.is_complete());
        assert_eq!((t.resolved(), t.failed()), (2, 1));
    }

    #[test]
    fn images_ignore_duplicate_and_unknown_settlements() {
        let mut t = ImageTracker::start(&set(&["a", "b"]));
        assert!(t.settle("a", Outcome::Loaded));
        assert!(!t.settle("a", Outcome::Loaded));
        assert!(!t.settle("zzz", Outcome::Loaded));
        assert_eq!(t.resolved(), 1);
        assert!(!t.is_complete());
    }

    #[test]
    fn empty_set_waits_for_grace() {
        let mut t = ImageTracker::start(&ImageSet::new());
        assert_eq!(t.total(), 0);
        assert!(!t.is_complete());
        assert!(t.settle_empty());
        assert!(!t.settle_empty());
        assert!(t.is_complete());
    }

    #[test]
    fn grace_is_ignored_when_images_exist() {
        let mut t = ImageTracker::start(&set(&["a"]));
        assert!(!t.settle_empty());
        assert!(!t.is_complete());
    }
}
