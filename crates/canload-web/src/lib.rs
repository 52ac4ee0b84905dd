#![forbid(unsafe_code)]

//! WASM frontend for canload.
//!
//! Binds the host-agnostic [`canload_core::Loader`] to a browser page:
//! - a DOM overlay implementing [`canload_core::OverlaySurface`],
//! - `document.readyState` / `DOMContentLoaded` for the structure signal,
//! - `document.fonts.ready` for the font signal,
//! - one `Image` preload per enumerated URL for the image signal,
//! - `window` `load` as the liveness fallback,
//! - `setTimeout` to wake the loader at its next deadline.
//!
//! Markup templates live in [`markup`] and build on every target.

pub mod markup;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::CanLoader;

/// Off the web there is no page to track. The native build renders the
/// overlay markup only, for server-side previews and tests.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone, Default)]
pub struct CanLoader {
    options: canload_core::LoaderOptions,
}

#[cfg(not(target_arch = "wasm32"))]
impl CanLoader {
    /// Parse `options` with the same JSON rules as the browser binding.
    pub fn from_json(options: &str) -> Result<Self, canload_core::ConfigError> {
        Ok(Self {
            options: canload_core::LoaderOptions::from_json_str(options)?,
        })
    }

    pub fn options(&self) -> &canload_core::LoaderOptions {
        &self.options
    }

    /// Markup the browser binding would mount as overlay `id`.
    pub fn render(&self, id: u32) -> Result<markup::OverlayMarkup, canload_core::ConfigError> {
        Ok(markup::render_overlay(&self.options, id)?)
    }
}
