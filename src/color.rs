//! Color-space helpers for the human-facing API.
//!
//! Lights speak 16-bit HSBK on the wire; callers usually think in RGB or in
//! degrees and percent. These helpers convert between the two.

use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Hue ceiling in degrees for the human-facing API.
pub const HUE_MAX: u16 = 360;
/// Saturation and brightness ceiling in percent.
pub const PERCENT_MAX: u8 = 100;
/// Kelvin range accepted by lights.
pub const KELVIN_MIN: u16 = 2500;
pub const KELVIN_MAX: u16 = 9000;
/// Default kelvin used when the caller does not care about temperature.
pub const KELVIN_DEFAULT: u16 = 3500;

/// A color in human units: hue in degrees, saturation and brightness in
/// percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsbColor {
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
}

/// Convert an RGB triple to human-unit HSB.
///
/// RGB poorly represents the color of light; prefer working in HSBK where
/// possible.
pub fn rgb_to_hsb(red: u8, green: u8, blue: u8) -> HsbColor {
    let r = f32::from(red) / 255.0;
    let g = f32::from(green) / 255.0;
    let b = f32::from(blue) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;

    let hue = if chroma == 0.0 {
        0.0
    } else if max == r {
        let mut h = (g - b) / chroma;
        if h < 0.0 {
            h += 6.0;
        }
        h
    } else if max == g {
        2.0 + (b - r) / chroma
    } else {
        4.0 + (r - g) / chroma
    };

    let saturation = if chroma == 0.0 { 0.0 } else { chroma / max };

    HsbColor {
        hue: (60.0 * hue).round() as u16,
        saturation: (saturation * 100.0).round() as u8,
        brightness: (max * 100.0).round() as u8,
    }
}

/// Parse an RGB hex string (`#RRGGBB` or `#RGB`, leading `#` required).
pub fn parse_rgb_hex(hex: &str) -> Result<(u8, u8, u8)> {
    let invalid = || Error::validation(format!("invalid color string: {hex:?}"));

    let rest = hex.strip_prefix('#').ok_or_else(invalid)?;
    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    match rest.len() {
        6 => Ok((
            channel(&rest[0..2])?,
            channel(&rest[2..4])?,
            channel(&rest[4..6])?,
        )),
        3 => {
            let double = |s: &str| channel(&format!("{s}{s}"));
            Ok((
                double(&rest[0..1])?,
                double(&rest[1..2])?,
                double(&rest[2..3])?,
            ))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_to_hsb_primaries() {
        assert_eq!(
            rgb_to_hsb(255, 0, 0),
            HsbColor {
                hue: 0,
                saturation: 100,
                brightness: 100
            }
        );
        assert_eq!(
            rgb_to_hsb(0, 255, 0),
            HsbColor {
                hue: 120,
                saturation: 100,
                brightness: 100
            }
        );
        assert_eq!(
            rgb_to_hsb(0, 0, 255),
            HsbColor {
                hue: 240,
                saturation: 100,
                brightness: 100
            }
        );
    }

    #[test]
    fn test_rgb_to_hsb_greys_have_no_saturation() {
        for value in [0u8, 128, 255] {
            let hsb = rgb_to_hsb(value, value, value);
            assert_eq!(hsb.hue, 0);
            assert_eq!(hsb.saturation, 0);
        }
        assert_eq!(rgb_to_hsb(255, 255, 255).brightness, 100);
        assert_eq!(rgb_to_hsb(0, 0, 0).brightness, 0);
    }

    #[test]
    fn test_parse_rgb_hex_six_digits() {
        assert_eq!(parse_rgb_hex("#FF0000").unwrap(), (255, 0, 0));
        assert_eq!(parse_rgb_hex("#00ff7f").unwrap(), (0, 255, 127));
    }

    #[test]
    fn test_parse_rgb_hex_three_digits() {
        assert_eq!(parse_rgb_hex("#F00").unwrap(), (255, 0, 0));
        assert_eq!(parse_rgb_hex("#abc").unwrap(), (0xaa, 0xbb, 0xcc));
    }

    #[test]
    fn test_parse_rgb_hex_rejects_malformed() {
        for bad in ["FF0000", "#FF00", "#GGHHII", "#", "#1234567"] {
            assert!(matches!(parse_rgb_hex(bad), Err(Error::Validation(_))));
        }
    }
}
