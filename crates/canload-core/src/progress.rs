#![forbid(unsafe_code)]

//! Weighted progress aggregation.
//!
//! Structure and fonts contribute fixed jumps; images, usually the slowest
//! and most variable class, cover the remaining half of the range in
//! proportion to how many have resolved.

use crate::state::LoaderState;

/// Contribution of the structure signal.
pub const STRUCTURE_WEIGHT: f64 = 30.0;
/// Contribution of the font signal.
pub const FONTS_WEIGHT: f64 = 20.0;
/// Contribution of the image signal at full resolution.
pub const IMAGES_WEIGHT: f64 = 50.0;

/// Highest value shown before the loader commits to finishing.
pub const UNFINISHED_CEILING: f64 = 99.0;

/// Unclamped weighted sum in `[0, 100]`.
#[must_use]
pub fn raw_progress(state: &LoaderState) -> f64 {
    let structure = if state.structure_done() {
        STRUCTURE_WEIGHT
    } else {
        0.0
    };
    let fonts = if state.fonts_done() { FONTS_WEIGHT } else { 0.0 };
    let images = if state.image_total() > 0 {
        IMAGES_WEIGHT * f64::from(state.image_loaded()) / f64::from(state.image_total())
    } else {
        0.0
    };
    structure + fonts + images
}

/// Percentage to display for `state`.
///
/// While `state` is unfinished anything at or above 99 reads as 99, so 100
/// only ever appears through the finish sequence. A finished state reads as
/// 100 whatever its signals say.
#[must_use]
pub fn compute_progress(state: &LoaderState) -> u8 {
    if state.finished() {
        return 100;
    }
    let mut progress = raw_progress(state);
    if progress >= UNFINISHED_CEILING {
        progress = UNFINISHED_CEILING;
    }
    progress.round().clamp(0.0, 100.0) as u8
}
