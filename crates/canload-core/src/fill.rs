#![forbid(unsafe_code)]

//! Fill-level geometry: percentage to vertical offset of the liquid group.
//!
//! The liquid is a wide wave path translated vertically inside a clipped
//! viewport (the container's interior). 0% puts the crest at the bottom of
//! the clip rect, 100% at its top.

use serde::{Deserialize, Serialize};

/// Container artwork.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skin {
    /// Full-height can; the wave crest sits at local y = 60.
    #[default]
    Can,
    /// Can drawn with an inset interior; the wave crest sits at local y = 0.
    Cup,
}

impl Skin {
    #[must_use]
    pub const fn geometry(self) -> FillGeometry {
        match self {
            Self::Can => FillGeometry {
                clip_y: 50.0,
                clip_height: 200.0,
                crest_y: 60.0,
            },
            Self::Cup => FillGeometry {
                clip_y: 58.0,
                clip_height: 187.0,
                crest_y: 0.0,
            },
        }
    }

    /// Stable lowercase name, used in markup class names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Can => "can",
            Self::Cup => "cup",
        }
    }
}

/// Clip viewport and wave crest position, in SVG user units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FillGeometry {
    pub clip_y: f64,
    pub clip_height: f64,
    /// Local y of the wave crest inside the translated group.
    pub crest_y: f64,
}

impl FillGeometry {
    /// `translateY` for the liquid group at `percent` (clamped to 100).
    #[must_use]
    pub fn offset_for(&self, percent: u8) -> f64 {
        let p = f64::from(percent.min(100)) / 100.0;
        let surface_y = self.clip_y + self.clip_height - p * self.clip_height;
        surface_y - self.crest_y
    }

    /// CSS transform value for `percent`.
    #[must_use]
    pub fn transform_for(&self, percent: u8) -> String {
        format!("translateY({}px)", self.offset_for(percent))
    }
}
