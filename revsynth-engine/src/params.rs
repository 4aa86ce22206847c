//! Tunable voice parameters and the fixed per-instance stream configuration.
//!
//! `Parameters` is a plain value replaced wholesale. The engine publishes it
//! through a [`ParamHandle`], an `Arc` swapped under a lock held only for the
//! pointer copy, so a reader always sees one complete parameter set.

use std::sync::Arc;

use parking_lot::Mutex;
use revsynth_core::dsp::{clamp01, lerp};
use revsynth_core::waves::WaveForm;
use serde::{Deserialize, Serialize};

/// Output sample rate assumed by the engine.
pub const SAMPLE_RATE: u32 = 44_100;

/// Default duration of each of the two stream buffers.
pub const BUFFER_MS: u32 = 50;

/// Voice parameters. Ranges are advisory; the voice clamps at point of use.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub waveform: WaveForm,
    /// Hz at speed 0.
    pub min_frequency: f32,
    /// Hz at speed 1.
    pub max_frequency: f32,
    /// Exponent of the `|v|^(1/gain)` curve.
    pub gain: f32,
    /// Randomization depth in `[0, 1]`; each sample is scaled by a factor in `[1 - noise, 1]`.
    pub noise: f32,
    /// `[0, 1]`, 0 disables amplitude modulation.
    pub modulation_strength: f32,
    /// Hz.
    pub modulation_frequency: f32,
    /// `[0, 1]`, 0 disables the echo.
    pub echo_strength: f32,
    /// Seconds.
    pub echo_delay: f32,
    /// Low-pass β in `[0, 1]`; 1 passes the signal through.
    pub lpf_beta: f32,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            waveform: WaveForm::Pop,
            min_frequency: 40.0,
            max_frequency: 250.0,
            gain: 1.0,
            noise: 0.4,
            modulation_strength: 0.0,
            modulation_frequency: 10.0,
            echo_strength: 0.0,
            echo_delay: 0.2,
            lpf_beta: 1.0,
        }
    }
}

impl Parameters {
    /// Oscillator frequency for a speed fraction: `lerp(min, max, speed)`.
    #[inline]
    pub fn frequency_at(&self, speed: f32) -> f32 {
        lerp(self.min_frequency, self.max_frequency, clamp01(speed))
    }

    /// Copy with every field pulled into its documented range and
    /// `min_frequency <= max_frequency`. The voice does not need this; it is for
    /// callers that load parameters from outside.
    pub fn clamped(&self) -> Self {
        let finite_or = |v: f32, d: f32| if v.is_finite() { v } else { d };
        let d = Self::default();
        let lo = finite_or(self.min_frequency, d.min_frequency).max(0.01);
        let hi = finite_or(self.max_frequency, d.max_frequency).max(0.01);
        Self {
            waveform: self.waveform,
            min_frequency: lo.min(hi),
            max_frequency: lo.max(hi),
            gain: finite_or(self.gain, d.gain).max(revsynth_core::dsp::MIN_GAIN),
            noise: clamp01(self.noise),
            modulation_strength: clamp01(self.modulation_strength),
            modulation_frequency: finite_or(self.modulation_frequency, d.modulation_frequency).max(0.0),
            echo_strength: clamp01(self.echo_strength),
            echo_delay: finite_or(self.echo_delay, d.echo_delay)
                .clamp(0.0, revsynth_core::delay::MAX_DELAY_S),
            lpf_beta: clamp01(self.lpf_beta),
        }
    }
}

/// Fixed stream settings of one synth instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub buffer_ms: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self { sample_rate: SAMPLE_RATE, buffer_ms: BUFFER_MS }
    }
}

impl SynthConfig {
    /// Samples per stream buffer (at least one).
    pub fn buffer_len(&self) -> usize {
        let n = u64::from(self.sample_rate) * u64::from(self.buffer_ms) / 1000;
        (n as usize).max(1)
    }

    #[inline]
    pub fn sample_rate_f32(&self) -> f32 {
        self.sample_rate.max(1) as f32
    }
}

/// Shared, cloneable publisher of the current [`Parameters`].
#[derive(Clone, Debug, Default)]
pub struct ParamHandle(Arc<Mutex<Arc<Parameters>>>);

impl ParamHandle {
    pub fn new(params: Parameters) -> Self {
        Self(Arc::new(Mutex::new(Arc::new(params))))
    }

    /// Replace the whole set. Visible to the next fill that starts after this returns.
    pub fn set(&self, params: Parameters) {
        let next = Arc::new(params);
        *self.0.lock() = next;
    }

    /// Current set; the lock is held only for the `Arc` clone.
    pub fn get(&self) -> Arc<Parameters> {
        Arc::clone(&self.0.lock())
    }

    /// Read-modify-write helper for single-knob tweaks.
    pub fn update(&self, f: impl FnOnce(&mut Parameters)) {
        let mut p = *self.get();
        f(&mut p);
        self.set(p);
    }
}
