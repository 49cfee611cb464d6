//! Colors and the linear color scale used by the choropleth.
//!
//! Colors are interpolated channel-wise in RGB and written as
//! `rgb(r, g, b)` strings for direct SVG embedding.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ScaleError {
    #[error("Unrecognised color: {0}")]
    BadColor(String),
    #[error("Color scale needs matching domain and range of at least two stops (got {domain} and {range})")]
    StopMismatch { domain: usize, range: usize },
    #[error("Color scale domain must be strictly ascending")]
    UnsortedDomain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

// ColorBrewer sequential Reds, 9 classes
const REDS: [&str; 9] = [
    "#fff5f0", "#fee0d2", "#fcbba1", "#fc9272", "#fb6a4a", "#ef3b2c", "#cb181d", "#a50f15", "#67000d",
];

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn from_channels(r: f64, g: f64, b: f64) -> Self {
        let channel = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Linear RGB interpolation, `t` in [0, 1].
    pub fn lerp(self, other: Color, t: f64) -> Color {
        let mix = |a: u8, b: u8| a as f64 + (b as f64 - a as f64) * t;
        Self::from_channels(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ScaleError;

    /// Accepts `#rgb`, `#rrggbb`, `rgb(r, g, b)`, a few CSS names and
    /// `reds(t)` for a sample of the sequential Reds ramp.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let bad = || ScaleError::BadColor(s.clone());

        match s.as_str() {
            "white" => return Ok(Color::new(255, 255, 255)),
            "black" => return Ok(Color::new(0, 0, 0)),
            "red" => return Ok(Color::new(255, 0, 0)),
            "gray" | "grey" => return Ok(Color::new(128, 128, 128)),
            _ => {}
        }

        if let Some(hex) = s.strip_prefix('#') {
            if !hex.is_ascii() {
                return Err(bad());
            }
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map_err(|_| bad());
            let pair = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
            return match hex.len() {
                3 => Ok(Color::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
                6 => Ok(Color::new(pair(0)?, pair(2)?, pair(4)?)),
                _ => Err(bad()),
            };
        }

        if let Some(args) = s.strip_prefix("rgb(").and_then(|r| r.strip_suffix(')')) {
            let channels: Vec<u8> = args
                .split(',')
                .map(|c| c.trim().parse::<u8>())
                .collect::<Result<_, _>>()
                .map_err(|_| bad())?;
            return match channels.as_slice() {
                [r, g, b] => Ok(Color::new(*r, *g, *b)),
                _ => Err(bad()),
            };
        }

        if let Some(arg) = s.strip_prefix("reds(").and_then(|r| r.strip_suffix(')')) {
            let t: f64 = arg.trim().parse().map_err(|_| bad())?;
            return Ok(reds(t));
        }

        Err(bad())
    }
}

// Uniform cubic B-spline basis
fn basis(t1: f64, v0: f64, v1: f64, v2: f64, v3: f64) -> f64 {
    let t2 = t1 * t1;
    let t3 = t2 * t1;
    ((1.0 - 3.0 * t1 + 3.0 * t2 - t3) * v0
        + (4.0 - 6.0 * t2 + 3.0 * t3) * v1
        + (1.0 + 3.0 * t1 + 3.0 * t2 - 3.0 * t3) * v2
        + t3 * v3)
        / 6.0
}

fn spline(values: &[f64], t: f64) -> f64 {
    let n = values.len() - 1;
    let (t, i) = if t <= 0.0 {
        (0.0, 0)
    } else if t >= 1.0 {
        (1.0, n - 1)
    } else {
        (t, (t * n as f64).floor() as usize)
    };

    let v1 = values[i];
    let v2 = values[i + 1];
    let v0 = if i > 0 { values[i - 1] } else { 2.0 * v1 - v2 };
    let v3 = if i < n - 1 { values[i + 2] } else { 2.0 * v2 - v1 };
    basis((t - i as f64 / n as f64) * n as f64, v0, v1, v2, v3)
}

/// Sample the sequential Reds ramp, `t` in [0, 1] (light to dark).
pub fn reds(t: f64) -> Color {
    let stops: Vec<Color> = REDS
        .iter()
        .filter_map(|hex| hex.parse().ok())
        .collect();
    let channel = |f: fn(&Color) -> u8| -> Vec<f64> { stops.iter().map(|c| f(c) as f64).collect() };

    Color::from_channels(
        spline(&channel(|c| c.r), t),
        spline(&channel(|c| c.g), t),
        spline(&channel(|c| c.b), t),
    )
}

/// Piecewise-linear color scale over an ascending domain.
#[derive(Debug, Clone)]
pub struct LinearColorScale {
    domain: Vec<f64>,
    range: Vec<Color>,
    clamp: bool,
}

impl LinearColorScale {
    pub fn new(domain: Vec<f64>, range: Vec<Color>) -> Result<Self, ScaleError> {
        if domain.len() < 2 || domain.len() != range.len() {
            return Err(ScaleError::StopMismatch {
                domain: domain.len(),
                range: range.len(),
            });
        }
        if domain.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(ScaleError::UnsortedDomain);
        }

        Ok(Self { domain, range, clamp: false })
    }

    pub fn from_config(domain: &[f64], range: &[String]) -> Result<Self, ScaleError> {
        let colors = range
            .iter()
            .map(|c| c.parse())
            .collect::<Result<Vec<Color>, _>>()?;
        Self::new(domain.to_vec(), colors)
    }

    pub fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    pub fn color(&self, value: f64) -> Color {
        let last = self.domain.len() - 1;
        let value = if self.clamp {
            value.clamp(self.domain[0], self.domain[last])
        } else {
            value
        };

        // Segment whose upper stop is the first above the value, extrapolating at the ends
        let upper = self.domain[1..last]
            .iter()
            .position(|&stop| value < stop)
            .map(|i| i + 1)
            .unwrap_or(last);
        let (d0, d1) = (self.domain[upper - 1], self.domain[upper]);
        let t = (value - d0) / (d1 - d0);

        self.range[upper - 1].lerp(self.range[upper], t)
    }
}
