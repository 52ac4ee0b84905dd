#![forbid(unsafe_code)]

//! Core: progress aggregation, readiness signals, and the overlay lifecycle.
//!
//! This crate is host-agnostic. The embedding environment (a browser binding,
//! a test harness) pushes readiness settlements and a monotonic timestamp;
//! the [`loader::Loader`] decides what to paint and when to hide and detach
//! the overlay. No threads, no timers, no blocking.

pub mod color;
pub mod config;
pub mod fill;
pub mod host;
pub mod images;
pub mod loader;
pub mod logging;
pub mod progress;
pub mod schedule;
pub mod signal;
pub mod state;
pub mod surface;

pub use color::{ColorParseError, HexColor, lighten};
pub use config::{ConfigError, LoaderOptions};
pub use fill::{FillGeometry, Skin};
pub use host::{LoadHost, ReadyState, StaticHost};
pub use loader::{Activation, FinishReason, Loader, LoaderEvent, Phase, SharedLoader};
pub use progress::compute_progress;
pub use signal::Outcome;
pub use state::LoaderState;
pub use surface::{OverlaySurface, RecordingSurface};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, info, info_span, trace, warn};
