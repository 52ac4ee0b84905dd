#![forbid(unsafe_code)]

//! Lifecycle controller.
//!
//! [`Loader`] owns one overlay activation: it mounts the surface, runs the
//! three readiness trackers, repaints after every settlement, and runs the
//! finish sequence exactly once:
//!
//! ```text
//! Active --finish()--> Finishing --(min duration)--> hide --(settle)--> Removed
//! ```
//!
//! The host drives everything. After [`Loader::activate`] it subscribes to
//! what the returned [`Activation`] asks for, forwards each settlement with
//! [`Loader::handle`], and calls [`Loader::advance`] whenever the clock
//! reaches [`Loader::next_deadline`].
//!
//! # Invariants
//!
//! 1. The phase only moves forward; there is no way back to `Active`.
//! 2. `finish` has effect at most once, whichever of its callers (all
//!    signals complete, page-load fallback, explicit request) gets there
//!    first.
//! 3. After `finish`, the only paint is the forced 100.
//! 4. The hide transition never starts before `start_time + min_duration`.
//! 5. The surface is detached at most once, and only while attached.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::config::{HIDE_SETTLE, LoaderOptions};
use crate::host::{LoadHost, ReadyState};
use crate::images::enumerate_images;
use crate::progress::compute_progress;
use crate::schedule::Schedule;
use crate::signal::{FontTracker, ImageTracker, Outcome, SignalKind, StructureTracker};
use crate::state::LoaderState;
use crate::surface::OverlaySurface;

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Tracking signals and painting progress.
    Active,
    /// Committed to finishing; waiting out the minimum duration or the fade.
    Finishing,
    /// Overlay detached. Terminal.
    Removed,
}

/// Why the finish sequence started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    /// Structure, fonts and images all completed.
    SignalsComplete,
    /// The whole-page load fallback fired.
    PageLoaded,
    /// The host called [`Loader::finish`] directly.
    Requested,
}

/// A settlement pushed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Document structure was parsed.
    StructureReady,
    /// The font-readiness future settled.
    FontsSettled(Outcome),
    /// The preload of `url` settled.
    ImageSettled { url: String, outcome: Outcome },
    /// The whole page finished loading (liveness fallback).
    PageLoaded,
}

/// Subscriptions the host must set up after activation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// The page had already finished loading. Deliver
    /// [`LoaderEvent::PageLoaded`] right away instead of waiting for a load
    /// event that will not fire again. Otherwise subscribe to it.
    pub page_loaded: bool,
    /// Deliver [`LoaderEvent::StructureReady`] when structure is parsed.
    pub listen_structure: bool,
    /// Deliver [`LoaderEvent::FontsSettled`] when the font future settles.
    pub await_fonts: bool,
    /// Preload each URL and deliver [`LoaderEvent::ImageSettled`] for it.
    pub preload: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deadline {
    EmptyImages,
    Hide,
    Remove,
}

/// One overlay activation.
pub struct Loader<S: OverlaySurface> {
    options: LoaderOptions,
    state: LoaderState,
    phase: Phase,
    finish_reason: Option<FinishReason>,
    structure: StructureTracker,
    fonts: FontTracker,
    images: ImageTracker,
    schedule: Schedule<Deadline>,
    surface: S,
}

impl<S: OverlaySurface + std::fmt::Debug> std::fmt::Debug for Loader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loader")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("surface", &self.surface)
            .finish_non_exhaustive()
    }
}

impl<S: OverlaySurface> Loader<S> {
    /// Activate at `now`: mount `surface`, paint 0%, and start the three
    /// trackers against `host`.
    ///
    /// Options are taken as given; run [`LoaderOptions::validate`] first if
    /// they come from outside.
    pub fn activate(
        options: LoaderOptions,
        host: &dyn LoadHost,
        mut surface: S,
        now: Duration,
    ) -> (Self, Activation) {
        let span = crate::info_span!("canload.activate");
        let _guard = span.enter();

        surface.mount();
        surface.paint(0, options.label_for(0).as_deref());

        let ready_state = host.ready_state();
        let structure = StructureTracker::start(ready_state);
        let fonts = FontTracker::start(host.has_font_readiness());
        let image_set = enumerate_images(host, options.include_background_images);
        let images = ImageTracker::start(&image_set);

        let mut state = LoaderState::new(now);
        if structure.is_complete() {
            state.mark_structure_done();
        }
        if fonts.is_complete() {
            state.mark_fonts_done();
        }
        state.set_image_total(images.total());

        let mut schedule = Schedule::new();
        if images.total() == 0 {
            schedule.at(
                now.saturating_add(options.empty_images_delay()),
                Deadline::EmptyImages,
            );
        }

        let activation = Activation {
            page_loaded: ready_state == ReadyState::Complete,
            listen_structure: structure.needs_listener(),
            await_fonts: fonts.needs_listener(),
            preload: image_set.into_urls(),
        };

        crate::info!(
            images = activation.preload.len(),
            listen_structure = activation.listen_structure,
            await_fonts = activation.await_fonts,
            "loader activated"
        );

        let mut loader = Self {
            options,
            state,
            phase: Phase::Active,
            finish_reason: None,
            structure,
            fonts,
            images,
            schedule,
            surface,
        };
        loader.update();
        (loader, activation)
    }

    /// Apply one host settlement observed at `now`.
    pub fn handle(&mut self, event: LoaderEvent, now: Duration) {
        match event {
            LoaderEvent::StructureReady => {
                if self.structure.settle() {
                    self.state.mark_structure_done();
                    self.on_signal(SignalKind::Structure, now);
                } else {
                    crate::trace!("duplicate structure settlement ignored");
                }
            }
            LoaderEvent::FontsSettled(outcome) => {
                if self.fonts.settle(outcome) {
                    if outcome == Outcome::Failed {
                        crate::warn!("font readiness rejected; treating fonts as loaded");
                    }
                    self.state.mark_fonts_done();
                    self.on_signal(SignalKind::Fonts, now);
                } else {
                    crate::trace!("duplicate font settlement ignored");
                }
            }
            LoaderEvent::ImageSettled { url, outcome } => {
                if self.images.settle(&url, outcome) {
                    if outcome == Outcome::Failed {
                        crate::debug!(url = %url, "image failed; counted as resolved");
                    }
                    self.state.record_image();
                    self.on_signal(SignalKind::Images, now);
                } else {
                    crate::trace!(url = %url, "untracked image settlement ignored");
                }
            }
            LoaderEvent::PageLoaded => {
                self.finish_with(FinishReason::PageLoaded, now);
            }
        }
    }

    /// Fire every deadline due at `now`. Returns how many fired.
    pub fn advance(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.schedule.pop_due(now) {
            fired += 1;
            match deadline {
                Deadline::EmptyImages => {
                    if self.images.settle_empty() {
                        self.on_signal(SignalKind::Images, now);
                    }
                }
                Deadline::Hide => {
                    crate::debug!("overlay hide started");
                    self.surface.hide();
                    self.schedule
                        .at(now.saturating_add(HIDE_SETTLE), Deadline::Remove);
                }
                Deadline::Remove => self.remove(),
            }
        }
        fired
    }

    /// Earliest time the host should call [`advance`](Self::advance).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.schedule.next_deadline()
    }

    /// Start the finish sequence now. Returns `false` if it already started.
    pub fn finish(&mut self, now: Duration) -> bool {
        self.finish_with(FinishReason::Requested, now)
    }

    /// Detach the overlay if it is still attached and enter
    /// [`Phase::Removed`]. Safe to call any number of times, and at any
    /// point: removing early drops every pending deadline and suppresses
    /// further paints.
    pub fn remove(&mut self) {
        if self.surface.is_attached() {
            self.surface.detach();
            crate::info!("overlay removed");
        }
        self.state.mark_finished();
        self.phase = Phase::Removed;
        self.schedule.clear();
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn state(&self) -> &LoaderState {
        &self.state
    }

    #[must_use]
    pub const fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// What started the finish sequence, once it has started.
    #[must_use]
    pub const fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    #[must_use]
    pub const fn images(&self) -> &ImageTracker {
        &self.images
    }

    #[must_use]
    pub const fn fonts(&self) -> &FontTracker {
        &self.fonts
    }

    #[must_use]
    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Whether structure, fonts and images have all completed.
    #[must_use]
    pub fn signals_complete(&self) -> bool {
        self.structure.is_complete() && self.fonts.is_complete() && self.images.is_complete()
    }

    fn on_signal(&mut self, kind: SignalKind, now: Duration) {
        crate::debug!(signal = %kind, "signal settled");
        if self.signals_complete() {
            self.finish_with(FinishReason::SignalsComplete, now);
        } else {
            self.update();
        }
    }

    /// Recompute and repaint while unfinished.
    fn update(&mut self) {
        if self.state.finished() {
            return;
        }
        let percent = compute_progress(&self.state);
        if percent == self.state.current_percent {
            return;
        }
        self.state.current_percent = percent;
        self.paint(percent);
    }

    fn paint(&mut self, percent: u8) {
        let label = self.options.label_for(percent);
        self.surface.paint(percent, label.as_deref());
    }

    fn finish_with(&mut self, reason: FinishReason, now: Duration) -> bool {
        if !self.state.mark_finished() {
            crate::trace!(?reason, "finish already started");
            return false;
        }
        self.finish_reason = Some(reason);
        if self.phase == Phase::Active {
            self.phase = Phase::Finishing;
        }
        self.schedule.cancel(Deadline::EmptyImages);

        self.state.current_percent = 100;
        self.paint(100);

        let elapsed = self.state.elapsed(now);
        let remaining = self.options.min_duration().saturating_sub(elapsed);
        self.schedule
            .at(now.saturating_add(remaining), Deadline::Hide);

        crate::info!(
            ?reason,
            elapsed_ms = elapsed.as_millis() as u64,
            remaining_ms = remaining.as_millis() as u64,
            "finish sequence started"
        );
        true
    }
}

/// A [`Loader`] behind a mutex, for hosts that settle signals from several
/// threads. Every mutation goes through the lock, which is the single
/// serialization point for the image counter and the finished flag.
pub struct SharedLoader<S: OverlaySurface> {
    inner: Arc<Mutex<Loader<S>>>,
}

impl<S: OverlaySurface> Clone for SharedLoader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: OverlaySurface> SharedLoader<S> {
    #[must_use]
    pub fn new(loader: Loader<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(loader)),
        }
    }

    /// Run `f` with exclusive access to the loader.
    ///
    /// A panic in another holder does not wedge the overlay: the lock is
    /// recovered and the loader state (which is only ever advanced, never
    /// left half-written across a call) is used as is.
    pub fn with<R>(&self, f: impl FnOnce(&mut Loader<S>) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    pub fn handle(&self, event: LoaderEvent, now: Duration) {
        self.with(|loader| loader.handle(event, now));
    }

    pub fn advance(&self, now: Duration) -> usize {
        self.with(|loader| loader.advance(now))
    }

    pub fn finish(&self, now: Duration) -> bool {
        self.with(|loader| loader.finish(now))
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.with(|loader| loader.phase())
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.with(|loader| loader.next_deadline())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticHost;
    use crate::surface::RecordingSurface;

    const fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn host_with_images(urls: &[&str]) -> StaticHost {
        StaticHost {
            image_sources: urls.iter().map(|s| (*s).to_owned()).collect(),
            ..StaticHost::default()
        }
    }

    fn activate(host: &StaticHost) -> (Loader<RecordingSurface>, Activation) {
        Loader::activate(LoaderOptions::default(), host, RecordingSurface::new(), ms(0))
    }

    #[test]
    fn activation_mounts_and_paints_zero() {
        let (loader, activation) = activate(&host_with_images(&["a.png"]));
        assert_eq!(loader.surface().mounts, 1);
        assert!(loader.surface().is_attached());
        let first = &loader.surface().paints[0];
        assert_eq!((first.percent, first.label.as_deref()), (0, Some("0%")));
        assert!(activation.listen_structure);
        assert!(activation.await_fonts);
        assert_eq!(activation.preload, vec!["a.png".to_owned()]);
        assert_eq!(loader.phase(), Phase::Active);
    }

    #[test]
    fn parsed_document_and_no_font_facility_start_at_fifty() {
        let host = StaticHost {
            ready_state: ReadyState::Complete,
            font_readiness: false,
            image_sources: vec!["a.png".into()],
            ..StaticHost::default()
        };
        let (loader, activation) = activate(&host);
        assert!(!activation.listen_structure);
        assert!(!activation.await_fonts);
        assert!(activation.page_loaded);
        assert_eq!(loader.surface().last_percent(), Some(50));
    }

    #[test]
    fn page_load_is_only_pending_before_complete() {
        for (ready_state, loaded) in [
            (ReadyState::Loading, false),
            (ReadyState::Interactive, false),
            (ReadyState::Complete, true),
        ] {
            let host = StaticHost {
                ready_state,
                ..host_with_images(&["a.png"])
            };
            let (_, activation) = activate(&host);
            assert_eq!(activation.page_loaded, loaded, "{ready_state:?}");
        }
    }

    #[test]
    fn late_activation_still_reaches_removal() {
        // Activated after the load event: the image preload never settles,
        // so only the immediate page-load delivery can end the overlay.
        let host = StaticHost {
            ready_state: ReadyState::Complete,
            ..host_with_images(&["stuck.png"])
        };
        let (mut loader, activation) = activate(&host);
        assert!(activation.page_loaded);
        loader.handle(LoaderEvent::PageLoaded, ms(0));
        assert_eq!(loader.finish_reason(), Some(FinishReason::PageLoaded));

        while let Some(deadline) = loader.next_deadline() {
            loader.advance(deadline);
        }
        assert_eq!(loader.phase(), Phase::Removed);
        assert_eq!(loader.surface().detaches, 1);
    }

    #[test]
    fn settlements_repaint_progressively() {
        let (mut loader, _) = activate(&host_with_images(&["a.png", "b.png"]));
        loader.handle(LoaderEvent::StructureReady, ms(10));
        assert_eq!(loader.surface().last_percent(), Some(30));
        loader.handle(LoaderEvent::FontsSettled(Outcome::Loaded), ms(20));
        assert_eq!(loader.surface().last_percent(), Some(50));
        loader.handle(
            LoaderEvent::ImageSettled {
                url: "a.png".into(),
                outcome: Outcome::Failed,
            },
            ms(30),
        );
        assert_eq!(loader.surface().last_percent(), Some(75));
        assert_eq!(loader.phase(), Phase::Active);
    }

    #[test]
    fn last_signal_finishes_with_forced_hundred() {
        let (mut loader, _) = activate(&host_with_images(&["a.png"]));
        loader.handle(LoaderEvent::StructureReady, ms(1));
        loader.handle(LoaderEvent::FontsSettled(Outcome::Loaded), ms(2));
        loader.handle(
            LoaderEvent::ImageSettled {
                url: "a.png".into(),
                outcome: Outcome::Loaded,
            },
            ms(3),
        );
        assert_eq!(loader.phase(), Phase::Finishing);
        assert_eq!(loader.finish_reason(), Some(FinishReason::SignalsComplete));
        assert_eq!(loader.surface().last_percent(), Some(100));
        assert!(
            !loader.surface().paints.iter().any(|p| p.percent == 99),
            "99 is only shown while something is still outstanding"
        );
    }

    #[test]
    fn fonts_and_images_without_structure_stay_active() {
        let (mut loader, _) = activate(&host_with_images(&["a.png"]));
        loader.handle(LoaderEvent::FontsSettled(Outcome::Loaded), ms(1));
        loader.handle(
            LoaderEvent::ImageSettled {
                url: "a.png".into(),
                outcome: Outcome::Loaded,
            },
            ms(2),
        );
        assert_eq!(loader.surface().last_percent(), Some(70));
        assert_eq!(loader.phase(), Phase::Active);
    }

    #[test]
    fn finish_is_idempotent() {
        let (mut loader, _) = activate(&host_with_images(&["a.png"]));
        assert!(loader.finish(ms(5)));
        assert!(!loader.finish(ms(6)));
        loader.handle(LoaderEvent::PageLoaded, ms(7));
        assert_eq!(loader.finish_reason(), Some(FinishReason::Requested));
        loader.advance(ms(10_000));
        loader.advance(ms(20_000));
        assert_eq!(loader.surface().hides, 1);
        assert_eq!(loader.surface().detaches, 1);
        assert_eq!(loader.phase(), Phase::Removed);
    }

    #[test]
    fn settlements_after_finish_do_not_repaint() {
        let (mut loader, _) = activate(&host_with_images(&["a.png", "b.png"]));
        loader.handle(LoaderEvent::PageLoaded, ms(5));
        let paints = loader.surface().paints.len();
        loader.handle(LoaderEvent::StructureReady, ms(6));
        loader.handle(
            LoaderEvent::ImageSettled {
                url: "a.png".into(),
                outcome: Outcome::Loaded,
            },
            ms(7),
        );
        assert_eq!(loader.surface().paints.len(), paints);
        assert_eq!(loader.surface().last_percent(), Some(100));
        assert_eq!(loader.state().current_percent(), 100);
    }

    #[test]
    fn remove_twice_detaches_once() {
        let (mut loader, _) = activate(&host_with_images(&[]));
        loader.remove();
        loader.remove();
        assert_eq!(loader.surface().detaches, 1);
        assert_eq!(loader.phase(), Phase::Removed);
    }

    #[test]
    fn early_remove_drops_pending_deadlines() {
        let (mut loader, _) = activate(&host_with_images(&[]));
        assert!(loader.next_deadline().is_some());
        loader.remove();
        assert_eq!(loader.next_deadline(), None);
        assert_eq!(loader.advance(ms(10_000)), 0);
        assert!(!loader.finish(ms(10_000)));
        assert_eq!(loader.surface().hides, 0);
    }

    #[test]
    fn externally_removed_overlay_is_not_detached_again() {
        let (mut loader, _) = activate(&host_with_images(&["a.png"]));
        loader.finish(ms(0));
        loader.surface_mut().remove_externally();
        loader.advance(ms(300));
        loader.advance(ms(720));
        assert_eq!(loader.surface().detaches, 0);
        assert_eq!(loader.phase(), Phase::Removed);
    }

    #[test]
    fn shared_loader_serializes_finish() {
        let (loader, _) = activate(&host_with_images(&["a.png"]));
        let shared = SharedLoader::new(loader);
        let wins = (0..8)
            .map(|i| {
                let shared = shared.clone();
                std::thread::spawn(move || shared.finish(ms(i)))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        shared.advance(ms(10_000));
        shared.advance(ms(20_000));
        assert_eq!(shared.phase(), Phase::Removed);
        shared.with(|l| {
            assert_eq!(l.surface().hides, 1);
            assert_eq!(l.surface().detaches, 1);
        });
    }
}
