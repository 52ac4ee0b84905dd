#![forbid(unsafe_code)]

//! Hex colors and the foam-layer lightening blend.

use std::fmt;
use std::str::FromStr;

/// Default blend toward white used by [`HexColor::lighten_default`].
pub const DEFAULT_LIGHTEN_PERCENT: f64 = 25.0;

/// Opaque RGB color parsed from `#rrggbb` or `#rgb` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Why a string could not be read as a hex color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    /// Digit count after the optional `#` was neither 3 nor 6.
    Length(usize),
    /// A character outside `[0-9a-fA-F]`.
    Digit(char),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length(n) => write!(f, "expected 3 or 6 hex digits, got {n}"),
            Self::Digit(c) => write!(f, "invalid hex digit {c:?}"),
        }
    }
}

impl std::error::Error for ColorParseError {}

impl HexColor {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, `#rgb` or `rgb`.
    ///
    /// Shorthand digits are doubled, so `#f80` reads as `#ff8800`.
    pub fn parse(input: &str) -> Result<Self, ColorParseError> {
        let digits = input.trim();
        let digits = digits.strip_prefix('#').unwrap_or(digits);

        let mut nibbles = [0u8; 6];
        let count = digits.chars().count();
        match count {
            6 => {
                for (slot, c) in nibbles.iter_mut().zip(digits.chars()) {
                    *slot = hex_nibble(c)?;
                }
            }
            3 => {
                for (i, c) in digits.chars().enumerate() {
                    let v = hex_nibble(c)?;
                    nibbles[i * 2] = v;
                    nibbles[i * 2 + 1] = v;
                }
            }
            n => return Err(ColorParseError::Length(n)),
        }

        Ok(Self {
            r: (nibbles[0] << 4) | nibbles[1],
            g: (nibbles[2] << 4) | nibbles[3],
            b: (nibbles[4] << 4) | nibbles[5],
        })
    }

    /// Blend each channel toward white by `percent` (clamped to `0..=100`).
    #[must_use]
    pub fn lighten(self, percent: f64) -> Self {
        let t = if percent.is_finite() {
            percent.clamp(0.0, 100.0) / 100.0
        } else {
            0.0
        };
        let blend = |c: u8| -> u8 {
            let c = f64::from(c);
            (c + (255.0 - c) * t).round().clamp(0.0, 255.0) as u8
        };
        Self {
            r: blend(self.r),
            g: blend(self.g),
            b: blend(self.b),
        }
    }

    /// [`lighten`](Self::lighten) with the 25% default.
    #[must_use]
    pub fn lighten_default(self) -> Self {
        self.lighten(DEFAULT_LIGHTEN_PERCENT)
    }

    /// Lowercase `#rrggbb`.
    #[must_use]
    pub fn to_hex_string(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse `color` and return it lightened by `percent`, as `#rrggbb`.
pub fn lighten(color: &str, percent: f64) -> Result<String, ColorParseError> {
    Ok(HexColor::parse(color)?.lighten(percent).to_hex_string())
}

fn hex_nibble(c: char) -> Result<u8, ColorParseError> {
    c.to_digit(16)
        .map(|v| v as u8)
        .ok_or(ColorParseError::Digit(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_half_way_to_white() {
        assert_eq!(lighten("#000000", 50.0).unwrap(), "#808080");
    }

    #[test]
    fn shorthand_white_zero_percent() {
        assert_eq!(lighten("#fff", 0.0).unwrap(), "#ffffff");
    }

    #[test]
    fn shorthand_doubles_digits() {
        assert_eq!(HexColor::parse("#f80").unwrap(), HexColor::new(0xff, 0x88, 0x00));
    }

    #[test]
    fn hash_is_optional() {
        assert_eq!(
            HexColor::parse("ff7a00").unwrap(),
            HexColor::parse("#FF7A00").unwrap()
        );
    }

    #[test]
    fn full_percent_is_white() {
        assert_eq!(lighten("#123456", 100.0).unwrap(), "#ffffff");
    }

    #[test]
    fn default_percent_is_quarter_blend() {
        // 0 + 255 * 0.25 = 63.75 -> 64
        assert_eq!(
            HexColor::new(0, 0, 0).lighten_default(),
            HexColor::new(64, 64, 64)
        );
    }

    #[test]
    fn foam_of_default_orange() {
        // ff7a00 at 30%: 7a -> 122 + 133*0.3 = 161.9 -> a2; 00 -> 76.5 -> 4d
        assert_eq!(lighten("#ff7a00", 30.0).unwrap(), "#ffa24d");
    }

    #[test]
    fn out_of_range_percent_is_clamped() {
        assert_eq!(lighten("#000", 250.0).unwrap(), "#ffffff");
        assert_eq!(lighten("#000", -10.0).unwrap(), "#000000");
        assert_eq!(lighten("#000", f64::NAN).unwrap(), "#000000");
    }

    #[test]
    fn rejects_bad_length() {
        assert_eq!(HexColor::parse("#ffff"), Err(ColorParseError::Length(4)));
        assert_eq!(HexColor::parse(""), Err(ColorParseError::Length(0)));
    }

    #[test]
    fn rejects_bad_digit() {
        assert_eq!(HexColor::parse("#ggg"), Err(ColorParseError::Digit('g')));
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(HexColor::new(0xAB, 0xCD, 0xEF).to_string(), "#abcdef");
    }
}
