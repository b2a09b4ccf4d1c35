//! Margin specifications and the core size they leave.

use serde_yaml::Value;

use crate::error::Error;
use crate::registry::value_type;

/// Space kept clear on each side of the core image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Margin {
    #[default]
    None,
    /// Whole pixels per side.
    Pixels(i64),
    /// Percentage of the target size per side.
    Percent(f64),
}

impl Margin {
    /// Parses a configured margin.
    ///
    /// Accepts an integer, `"<n>px"` or `"<n>%"`. Null, zero and the empty
    /// string mean no margin.
    pub fn from_value(value: &Value) -> Result<Self, Error> {
        match value {
            Value::Null => Ok(Self::None),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(Self::None),
                Some(pixels) => Ok(Self::Pixels(pixels)),
                None => Err(invalid(value)),
            },
            Value::String(s) => Self::parse(s).ok_or_else(|| invalid(value)),
            other => Err(invalid(other)),
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return Some(Self::None);
        }
        if let Some(pixels) = raw.strip_suffix("px") {
            let pixels = finite(pixels)?.round_ties_even();
            if pixels.abs() > f64::from(u32::MAX) {
                return None;
            }
            return Some(Self::Pixels(pixels as i64));
        }
        if let Some(percent) = raw.strip_suffix('%') {
            return finite(percent).map(Self::Percent);
        }
        None
    }

    /// Side of the core image inside a `target` px canvas.
    ///
    /// Returns zero when the margin leaves no room.
    pub fn core_size(&self, target: u32) -> u32 {
        let max = i64::from(u32::MAX);
        let core = match *self {
            Self::None => return target,
            Self::Pixels(pixels) => i64::from(target).saturating_sub(pixels.saturating_mul(2)),
            Self::Percent(percent) => {
                let margin = (f64::from(target) * (percent / 100.0) * 2.0).round_ties_even();
                // Saturating float-to-int cast; NaN becomes zero.
                (f64::from(target) - margin).clamp(0.0, max as f64) as i64
            }
        };
        core.clamp(0, max) as u32
    }
}

fn finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn invalid(value: &Value) -> Error {
    let detail = match value {
        Value::String(s) => format!("str \"{s}\""),
        other => value_type(other).to_owned(),
    };
    Error::validation(format!("invalid margin type: {detail}"))
}
