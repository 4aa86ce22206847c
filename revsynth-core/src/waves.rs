//! Raw oscillator shapes.
//!
//! Unlike a free-running phase accumulator, these are pure functions of
//! elapsed time: `raw_sample(t, f, wave)` only looks at where `t` falls inside
//! the current period `1/f`. Time is `f64` so the position inside the period
//! stays exact for sample counters that run for hours.

use core::f32::consts::PI;

use crate::dsp::{fast_sin, TAU};

/// Frequencies below this (including zero, negatives and NaN) are raised to it.
pub const MIN_FREQ_HZ: f32 = 0.01;

/// Oscillator waveform of the engine voice.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WaveForm {
    Sine,
    /// Cosine half-pulse once per period, silent for the rest of it.
    #[default]
    Pop,
    /// Cube-root shaped ramp.
    Sawtooth,
    Square,
    /// Four overlapping sine pulses per period, one per cylinder.
    Cylinders,
}

impl WaveForm {
    pub const ALL: [WaveForm; 5] = [
        WaveForm::Sine,
        WaveForm::Pop,
        WaveForm::Sawtooth,
        WaveForm::Square,
        WaveForm::Cylinders,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WaveForm::Sine => "sine",
            WaveForm::Pop => "pop",
            WaveForm::Sawtooth => "sawtooth",
            WaveForm::Square => "square",
            WaveForm::Cylinders => "cylinders",
        }
    }
}

impl core::fmt::Display for WaveForm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl core::str::FromStr for WaveForm {
    type Err = UnknownWaveForm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        WaveForm::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "sin" => Some(WaveForm::Sine),
                "saw" => Some(WaveForm::Sawtooth),
                _ => None,
            })
            .ok_or_else(|| UnknownWaveForm(s.to_owned()))
    }
}

/// Returned by `WaveForm::from_str` for names it does not know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownWaveForm(pub String);

impl core::fmt::Display for UnknownWaveForm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown waveform `{}` (expected one of sine, pop, sawtooth, square, cylinders)", self.0)
    }
}

impl std::error::Error for UnknownWaveForm {}

/// Position inside the current period, normalized to `[0, 1)`.
///
/// Same as `(t mod 1/f) · f`, computed as `(t · f) mod 1` to avoid the
/// rounding of `1/f`.
#[inline]
pub fn period_fraction(t: f64, freq_hz: f32) -> f32 {
    let f = if freq_hz.is_nan() { MIN_FREQ_HZ } else { freq_hz.max(MIN_FREQ_HZ) };
    let frac = (t * f64::from(f)).rem_euclid(1.0) as f32;
    // rem_euclid can round up to exactly 1.0 for tiny negative products,
    // and an infinite product yields NaN
    if frac.is_finite() && frac < 1.0 { frac } else { 0.0 }
}

/// One raw oscillator value in `[-1, 1]` for elapsed time `t` (seconds).
#[inline]
pub fn raw_sample(t: f64, freq_hz: f32, wave: WaveForm) -> f32 {
    let x = period_fraction(t, freq_hz);
    match wave {
        WaveForm::Sine => fast_sin(TAU * x),
        WaveForm::Pop => {
            if x < 0.5 { (PI * x).cos() } else { 0.0 }
        }
        WaveForm::Sawtooth => 1.0 - x.cbrt() - 0.5,
        WaveForm::Square => {
            if x < 0.5 { 1.0 } else { -1.0 }
        }
        WaveForm::Cylinders => cylinders(x),
    }
}

/// Cylinder `i` fires at `i/4` of the period for half a period; pulses do not
/// wrap into the next period. Scaled by ½ so the sum stays in `[0, 1]`.
#[inline]
fn cylinders(x: f32) -> f32 {
    let mut sum = 0.0;
    for i in 0..4 {
        let start = i as f32 * 0.25;
        if x >= start && x < start + 0.5 {
            sum += fast_sin(TAU * (x - start));
        }
    }
    0.5 * sum
}
