#![forbid(unsafe_code)]

//! The overlay render target.
//!
//! [`OverlaySurface`] is the only way the loader touches the screen. The
//! browser binding implements it over DOM nodes; [`RecordingSurface`]
//! captures every call for tests and headless hosts.

/// Render target exclusively owned by a [`Loader`](crate::Loader).
pub trait OverlaySurface {
    /// Insert the overlay into the page.
    fn mount(&mut self);

    /// Show `percent` (0..=100) as fill level, and `label` as text when
    /// given.
    fn paint(&mut self, percent: u8, label: Option<&str>);

    /// Start the fade-out transition.
    fn hide(&mut self);

    /// Whether the overlay is still in the page.
    fn is_attached(&self) -> bool;

    /// Remove the overlay from the page. Only called while attached.
    fn detach(&mut self);
}

impl<S: OverlaySurface + ?Sized> OverlaySurface for Box<S> {
    fn mount(&mut self) {
        (**self).mount();
    }

    fn paint(&mut self, percent: u8, label: Option<&str>) {
        (**self).paint(percent, label);
    }

    fn hide(&mut self) {
        (**self).hide();
    }

    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }

    fn detach(&mut self) {
        (**self).detach();
    }
}

/// One recorded paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paint {
    pub percent: u8,
    pub label: Option<String>,
}

/// Surface that records what it was asked to do.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    attached: bool,
    hidden: bool,
    /// Every paint in call order.
    pub paints: Vec<Paint>,
    pub mounts: u32,
    pub hides: u32,
    pub detaches: u32,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent paint.
    #[must_use]
    pub fn last_paint(&self) -> Option<&Paint> {
        self.paints.last()
    }

    /// Percent of the most recent paint.
    #[must_use]
    pub fn last_percent(&self) -> Option<u8> {
        self.paints.last().map(|p| p.percent)
    }

    #[must_use]
    pub const fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Simulate the page removing the overlay behind the loader's back.
    pub fn remove_externally(&mut self) {
        self.attached = false;
    }
}

impl OverlaySurface for RecordingSurface {
    fn mount(&mut self) {
        self.mounts += 1;
        self.attached = true;
    }

    fn paint(&mut self, percent: u8, label: Option<&str>) {
        self.paints.push(Paint {
            percent,
            label: label.map(str::to_owned),
        });
    }

    fn hide(&mut self) {
        self.hides += 1;
        self.hidden = true;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn detach(&mut self) {
        self.detaches += 1;
        self.attached = false;
    }
}
