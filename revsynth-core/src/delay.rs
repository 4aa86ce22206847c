//! Echo: a circular delay line indexed by the absolute sample counter.
//!
//! The write slot for sample `n` is `n mod capacity`; the read slot is
//! `delay` samples behind it, wrapped forward. Reading happens before writing,
//! so `delay == capacity` returns the value stored exactly one capacity ago.
//! Growing the delay past the capacity allocates a new zero-filled line;
//! shrinking keeps the allocation and only moves the read offset.

/// Longest delay honored; longer requests are clamped.
pub const MAX_DELAY_S: f32 = 10.0;

#[derive(Clone, Debug, Default)]
pub struct EchoLine {
    line: Vec<f32>,
    delay: usize,
}

impl EchoLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay_s: f32, sr: f32) -> Self {
        let mut e = Self::new();
        e.set_delay(delay_s, sr);
        e
    }

    /// Delay in samples for `delay_s` seconds at `sr`, at least one sample.
    pub fn delay_samples_for(delay_s: f32, sr: f32) -> usize {
        let d = if delay_s.is_finite() { delay_s.clamp(0.0, MAX_DELAY_S) } else { 0.0 };
        let sr = if sr.is_finite() { sr.max(1.0) } else { 1.0 };
        ((d * sr).round() as usize).max(1)
    }

    /// Set the delay. Reallocates (zeroed) only when the line has to grow.
    pub fn set_delay(&mut self, delay_s: f32, sr: f32) {
        let samples = Self::delay_samples_for(delay_s, sr);
        if samples > self.line.len() {
            self.line = vec![0.0; samples];
        }
        self.delay = samples;
    }

    #[inline] pub fn capacity(&self) -> usize { self.line.len() }
    #[inline] pub fn delay(&self) -> usize { self.delay }

    /// Feed sample `n` of value `x`; returns `x + delayed · strength`.
    #[inline]
    pub fn process(&mut self, n: u64, x: f32, strength: f32) -> f32 {
        let cap = self.line.len();
        if cap == 0 {
            return x;
        }
        let w = (n % cap as u64) as usize;
        let r = (w + cap - self.delay) % cap;
        let delayed = self.line[r];
        self.line[w] = x;
        x + delayed * strength
    }
}
