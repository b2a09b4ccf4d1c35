//! Color values accepted in configuration files.

use std::fmt;
use std::str::FromStr;

use image::Rgba;
use palette::Srgb;
use serde::{Deserialize, Deserializer};

use crate::error::Error;

/// An 8-bit RGBA color.
///
/// Parsed from `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
/// `rgba(r, g, b, a)` or a CSS named color such as `white`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub const BLACK: Self = Self(Rgba([0, 0, 0, 255]));
    pub const TRANSPARENT: Self = Self(Rgba([0, 0, 0, 0]));

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(Rgba([r, g, b, 255]))
    }

    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(Rgba([r, g, b, a]))
    }

    /// The red, green and blue channels.
    pub fn channels(&self) -> [u8; 3] {
        let [r, g, b, _] = self.0.0;
        [r, g, b]
    }

    pub fn alpha(&self) -> u8 {
        self.0.0[3]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0.0;
        if a == 255 {
            write!(f, "#{r:02x}{g:02x}{b:02x}")
        } else {
            write!(f, "#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || Error::validation(format!("invalid color \"{s}\""));

        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(invalid);
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(args) = functional_args(&lower, "rgba") {
            return parse_channels(args, 4).ok_or_else(invalid);
        }
        if let Some(args) = functional_args(&lower, "rgb") {
            return parse_channels(args, 3).ok_or_else(invalid);
        }

        palette::named::from_str(&lower)
            .map(|named: Srgb<u8>| Self::rgb(named.red, named.green, named.blue))
            .ok_or_else(invalid)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.is_ascii() {
        return None;
    }

    // palette handles the three and six digit forms; the alpha digits are split off first.
    let (rgb, alpha) = match hex.len() {
        3 | 6 => (hex, None),
        4 => (&hex[..3], Some(u8::from_str_radix(&hex[3..].repeat(2), 16).ok()?)),
        8 => (&hex[..6], Some(u8::from_str_radix(&hex[6..], 16).ok()?)),
        _ => return None,
    };

    let parsed = Srgb::<u8>::from_str(rgb).ok()?;
    Some(Color::rgba(
        parsed.red,
        parsed.green,
        parsed.blue,
        alpha.unwrap_or(255),
    ))
}

fn functional_args<'a>(value: &'a str, name: &str) -> Option<&'a str> {
    value
        .strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_channels(args: &str, expected: usize) -> Option<Color> {
    let channels = args
        .split(',')
        .map(|part| part.trim().parse::<u8>().ok())
        .collect::<Option<Vec<_>>>()?;

    match channels[..] {
        [r, g, b] if expected == 3 => Some(Color::rgb(r, g, b)),
        [r, g, b, a] if expected == 4 => Some(Color::rgba(r, g, b, a)),
        _ => None,
    }
}
