#![forbid(unsafe_code)]

//! Activation options.
//!
//! Field names follow the JS-facing camelCase keys so the same struct reads
//! a host options object (via JSON) and a config file. Every field has a
//! default; unknown keys are ignored.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::{ColorParseError, HexColor};
use crate::fill::Skin;

/// Time between adding the hide class and detaching the overlay. Covers the
/// 400 ms opacity transition with a little slack.
pub const HIDE_SETTLE: Duration = Duration::from_millis(420);

/// Overlay configuration recognized by `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoaderOptions {
    /// Liquid color, `#rrggbb` or `#rgb`.
    pub color: String,
    /// Overlay backdrop, any CSS color.
    pub background: String,
    /// Percentage label color.
    pub text_color: String,
    pub show_percentage: bool,
    /// Count CSS `background-image` URLs as part of the image signal.
    pub include_background_images: bool,
    pub z_index: i64,
    /// Minimum time the overlay stays visible, in milliseconds.
    pub min_duration: u64,
    /// Period of the decorative wave animation.
    pub wave_speed_sec: f64,
    pub skin: Skin,
    /// Grace period before an empty image set counts as complete.
    pub empty_images_delay_ms: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            color: "#ff7a00".to_owned(),
            background: "rgba(18, 18, 20, 0.92)".to_owned(),
            text_color: "#ffffff".to_owned(),
            show_percentage: true,
            include_background_images: true,
            z_index: 999_999,
            min_duration: 300,
            wave_speed_sec: 3.5,
            skin: Skin::Can,
            empty_images_delay_ms: 200,
        }
    }
}

/// Rejected configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The options document was not valid JSON for [`LoaderOptions`].
    Json(String),
    /// `color` is not a hex color.
    Color(ColorParseError),
    /// `waveSpeedSec` must be finite and positive.
    WaveSpeed(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid loader options: {msg}"),
            Self::Color(err) => write!(f, "invalid color: {err}"),
            Self::WaveSpeed(v) => write!(f, "waveSpeedSec must be positive, got {v}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Color(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ColorParseError> for ConfigError {
    fn from(err: ColorParseError) -> Self {
        Self::Color(err)
    }
}

impl LoaderOptions {
    /// Parse options from a JSON object, filling absent keys with defaults,
    /// then [`validate`](Self::validate).
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self =
            serde_json::from_str(s).map_err(|err| ConfigError::Json(err.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check the fields the lifecycle and markup depend on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.liquid_color()?;
        if !self.wave_speed_sec.is_finite() || self.wave_speed_sec <= 0.0 {
            return Err(ConfigError::WaveSpeed(self.wave_speed_sec));
        }
        Ok(())
    }

    /// Parsed [`color`](Self::color).
    pub fn liquid_color(&self) -> Result<HexColor, ColorParseError> {
        HexColor::parse(&self.color)
    }

    #[must_use]
    pub fn min_duration(&self) -> Duration {
        Duration::from_millis(self.min_duration)
    }

    #[must_use]
    pub fn empty_images_delay(&self) -> Duration {
        Duration::from_millis(self.empty_images_delay_ms)
    }

    /// Text shown under the container for `percent`, if labels are enabled.
    #[must_use]
    pub fn label_for(&self, percent: u8) -> Option<String> {
        self.show_percentage.then(|| format!("{percent}%"))
    }
}
