#![forbid(unsafe_code)]

//! What the loader needs to know about the page at activation time.
//!
//! The host answers these queries once, synchronously, when the loader is
//! activated. Everything that happens later (structure parsed, fonts
//! settled, an image resolved, the page finished loading) is pushed into the
//! [`Loader`](crate::Loader) as a [`LoaderEvent`](crate::LoaderEvent).

/// Document parsing progress as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadyState {
    /// Still parsing markup.
    Loading,
    /// Markup parsed; subresources may still be loading.
    Interactive,
    /// Everything, including subresources, has loaded.
    Complete,
}

impl ReadyState {
    /// Parse a `document.readyState` string. Unknown values read as
    /// [`Loading`](Self::Loading), which only delays the structure signal.
    #[must_use]
    pub fn from_dom(value: &str) -> Self {
        match value {
            "interactive" => Self::Interactive,
            "complete" => Self::Complete,
            _ => Self::Loading,
        }
    }

    /// Whether document structure is already available.
    #[must_use]
    pub const fn structure_ready(self) -> bool {
        matches!(self, Self::Interactive | Self::Complete)
    }
}

/// Page queries answered at activation.
pub trait LoadHost {
    /// Current parsing state of the document.
    fn ready_state(&self) -> ReadyState;

    /// Whether the host exposes a font-readiness future. Without one the
    /// font signal is satisfied immediately.
    fn has_font_readiness(&self) -> bool;

    /// Resolved source of every rendered image (`currentSrc`, else `src`).
    /// Empty strings are allowed and skipped.
    fn image_sources(&self) -> Vec<String>;

    /// Computed `background-image` value of every element, verbatim
    /// (`none`, `url("a.png")`, `url(a.png), linear-gradient(...)`, ...).
    /// Only queried when background images are enabled.
    fn background_images(&self) -> Vec<String>;
}

/// Fixed answers, for tests and non-browser hosts.
#[derive(Debug, Clone)]
pub struct StaticHost {
    pub ready_state: ReadyState,
    pub font_readiness: bool,
    pub image_sources: Vec<String>,
    pub background_images: Vec<String>,
}

impl Default for StaticHost {
    fn default() -> Self {
        Self {
            ready_state: ReadyState::Loading,
            font_readiness: true,
            image_sources: Vec::new(),
            background_images: Vec::new(),
        }
    }
}

impl LoadHost for StaticHost {
    fn ready_state(&self) -> ReadyState {
        self.ready_state
    }

    fn has_font_readiness(&self) -> bool {
        self.font_readiness
    }

    fn image_sources(&self) -> Vec<String> {
        self.image_sources.clone()
    }

    fn background_images(&self) -> Vec<String> {
        self.background_images.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_strings() {
        assert_eq!(ReadyState::from_dom("loading"), ReadyState::Loading);
        assert_eq!(ReadyState::from_dom("interactive"), ReadyState::Interactive);
        assert_eq!(ReadyState::from_dom("complete"), ReadyState::Complete);
        assert_eq!(ReadyState::from_dom("bogus"), ReadyState::Loading);
    }

    #[test]
    fn structure_ready_states() {
        assert!(!ReadyState::Loading.structure_ready());
        assert!(ReadyState::Interactive.structure_ready());
        assert!(ReadyState::Complete.structure_ready());
    }
}
