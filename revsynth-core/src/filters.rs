//! Filters: the single-pole low-pass that closes the voice chain.
//!
//! `OnePoleLP` uses the inexpensive `y += β · (x − y)` form, written out as
//! `y[n] = y[n−1] − β · (y[n−1] − x[n])`. β = 1 passes the input through,
//! β → 0 smooths harder. The state lives across calls so consecutive buffers
//! join without a step at the boundary.

use crate::dsp::{clamp01, kill_denormals, one_pole_coeff_hz, sanitize};

/// One-pole low-pass `y += β * (x - y)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct OnePoleLP {
    beta: f32,
    y: f32,
}

impl Default for OnePoleLP {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl OnePoleLP {
    /// Create a low-pass with smoothing coefficient `beta` (clamped to `[0, 1]`).
    #[inline]
    pub fn new(beta: f32) -> Self {
        Self { beta: clamp01(beta), y: 0.0 }
    }

    /// Create a low-pass from a cutoff in Hz: `β = 1 - exp(-2π fc / sr)`.
    #[inline]
    pub fn from_cutoff_hz(cut_hz: f32, sr: f32) -> Self {
        Self::new(1.0 - one_pole_coeff_hz(cut_hz, sr))
    }

    #[inline]
    pub fn set_beta(&mut self, beta: f32) {
        self.beta = clamp01(beta);
    }

    #[inline] pub fn beta(&self) -> f32 { self.beta }

    /// Process one sample. The memory never holds NaN/inf.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let x = sanitize(x);
        self.y = if self.beta >= 1.0 { x } else { self.y - self.beta * (self.y - x) };
        self.y = kill_denormals(self.y);
        self.y
    }

    /// Forget the filter memory.
    #[inline]
    pub fn reset(&mut self) { self.y = 0.0; }

    #[inline] pub fn value(&self) -> f32 { self.y }
}

// ------------------------------------ Tests --------------------------------------
