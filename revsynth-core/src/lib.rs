//! revsynth core: DSP primitives for procedural engine sounds.
//!
//! Features
//! - `fast-math`: polynomial sine on the hot path
//! - `serde`    : (de)serialize [`waves::WaveForm`]
//!
//! Modules
//! - [`dsp`]     : clamps, lerp, gain curve, AM carrier, fast sine
//! - [`waves`]   : time-indexed oscillator shapes (sine, pop, saw, square, cylinders)
//! - [`delay`]   : echo delay line keyed by the absolute sample index
//! - [`filters`] : single-pole low-pass with a β coefficient
//!
//! Design
//! - No allocation per sample; the echo line only reallocates when it grows
//! - Out-of-range arguments are clamped where they are used, never rejected

pub mod delay;
pub mod dsp;
pub mod filters;
pub mod waves;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::delay::EchoLine;
    pub use crate::dsp::{am_carrier, clamp, clamp01, hard_limit, lerp, shape_gain, TAU};
    pub use crate::filters::OnePoleLP;
    pub use crate::waves::{raw_sample, WaveForm};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let v = raw_sample(0.0, 100.0, WaveForm::Pop);
        let v = shape_gain(v, 1.5) * am_carrier(0.0, 10.0, 0.2);
        let mut echo = EchoLine::with_delay(0.1, 44_100.0);
        let mut lp = OnePoleLP::new(0.5);
        let _ = hard_limit(lp.process(echo.process(0, v, 0.3)));
    }
}
