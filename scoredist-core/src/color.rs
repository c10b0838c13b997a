//! Value → color mapping over a five-stop red → green gradient.
//!
//! Values are normalized linearly into `[0, 1]` over a [`ScoreDomain`]
//! (clamped), then interpolated channel-wise between the two surrounding
//! stops. A value sitting exactly on a stop position reproduces that stop.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ColorScaleError {
    #[error("invalid hex color '{0}'")]
    InvalidHex(String),

    #[error("a color scale needs at least two stops, got {0}")]
    TooFewStops(usize),

    #[error("stop positions must start at 0.0, end at 1.0 and strictly increase")]
    BadPositions,
}

/// An sRGB color with channels on the 0–255 scale.
///
/// Channels stay fractional between stops; [`Rgb::to_hex`] rounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    /// Neutral fill for regions without a value.
    pub const MISSING: Rgb = Rgb::new(238.0, 238.0, 238.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: &str) -> Result<Self, ColorScaleError> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.is_ascii() {
            return Err(ColorScaleError::InvalidHex(hex.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16)
                .map(f64::from)
                .map_err(|_| ColorScaleError::InvalidHex(hex.to_string()))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    /// `#RRGGBB`, uppercase, channels rounded to the nearest integer.
    pub fn to_hex(&self) -> String {
        let q = |c: f64| c.round().clamp(0.0, 255.0) as u8;
        format!("#{:02X}{:02X}{:02X}", q(self.r), q(self.g), q(self.b))
    }

    fn lerp(a: Rgb, b: Rgb, t: f64) -> Rgb {
        let mix = |x: f64, y: f64| x * (1.0 - t) + y * t;
        Rgb::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Rgb {
    type Err = ColorScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rgb::from_hex(s)
    }
}

impl From<Rgb> for String {
    fn from(rgb: Rgb) -> Self {
        rgb.to_hex()
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorScaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub position: f64,
    pub color: Rgb,
}

/// Red, orange, mustard, light green, dark green.
pub const EXAM_STOPS: [ColorStop; 5] = [
    ColorStop { position: 0.0, color: Rgb::new(215.0, 48.0, 39.0) },
    ColorStop { position: 0.25, color: Rgb::new(252.0, 141.0, 89.0) },
    ColorStop { position: 0.5, color: Rgb::new(204.0, 204.0, 0.0) },
    ColorStop { position: 0.75, color: Rgb::new(145.0, 207.0, 96.0) },
    ColorStop { position: 1.0, color: Rgb::new(26.0, 152.0, 80.0) },
];

/// Piecewise-linear gradient through validated stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    stops: Vec<ColorStop>,
}

impl ColorScale {
    pub fn new(stops: Vec<ColorStop>) -> Result<Self, ColorScaleError> {
        if stops.len() < 2 {
            return Err(ColorScaleError::TooFewStops(stops.len()));
        }
        let ends_ok = stops.first().map(|s| s.position) == Some(0.0)
            && stops.last().map(|s| s.position) == Some(1.0);
        let increasing = stops.windows(2).all(|w| w[0].position < w[1].position);
        if !ends_ok || !increasing {
            return Err(ColorScaleError::BadPositions);
        }
        Ok(Self { stops })
    }

    /// The gradient used by every chart and map.
    pub fn exam() -> Self {
        Self {
            stops: EXAM_STOPS.to_vec(),
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    /// Color at normalized position `t` (clamped into `[0, 1]`).
    pub fn at(&self, t: f64) -> Rgb {
        interpolate(&self.stops, t)
    }

    /// Color for `value` over `domain`; [`Rgb::MISSING`] for non-finite values.
    pub fn color_for(&self, value: f64, domain: ScoreDomain) -> Rgb {
        match domain.normalize(value) {
            Some(t) => self.at(t),
            None => Rgb::MISSING,
        }
    }
}

impl Default for ColorScale {
    fn default() -> Self {
        Self::exam()
    }
}

fn interpolate(stops: &[ColorStop], t: f64) -> Rgb {
    let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.position {
            let u = (t - lo.position) / (hi.position - lo.position);
            return Rgb::lerp(lo.color, hi.color, u);
        }
    }
    stops.last().map(|s| s.color).unwrap_or(Rgb::MISSING)
}

/// Value range mapped onto the full gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreDomain {
    pub vmin: f64,
    pub vmax: f64,
}

impl ScoreDomain {
    pub const fn new(vmin: f64, vmax: f64) -> Self {
        Self { vmin, vmax }
    }

    /// `(0, max)`, the fallback when no tuned range exists.
    pub const fn full(max: f64) -> Self {
        Self::new(0.0, max)
    }

    /// Linear position of `value` in the domain, clamped to `[0, 1]`.
    ///
    /// `None` for non-finite values. A degenerate domain (`vmax <= vmin`)
    /// maps everything to 0.
    pub fn normalize(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let span = self.vmax - self.vmin;
        if span.is_nan() || span <= 0.0 {
            return Some(0.0);
        }
        Some(((value - self.vmin) / span).clamp(0.0, 1.0))
    }
}

/// Color for `value` on the exam gradient over `domain`.
pub fn color_at(value: f64, domain: ScoreDomain) -> Rgb {
    match domain.normalize(value) {
        Some(t) => interpolate(&EXAM_STOPS, t),
        None => Rgb::MISSING,
    }
}
