//! revsynth engine: procedural engine sound, streamed without glitches.
//!
//! Crate layout:
//! - [`params`]        : `Parameters`, `SynthConfig`, `ParamHandle`
//! - [`voice`]         : `EngineVoice`, the oscillator + post-processing chain
//! - [`double_buffer`] : the play/work buffer trade between the two threads
//! - [`sink`]          : `AudioSink` trait (the output device seam) and `SinkError`
//! - [`synth`]         : `EngineSynth`, the controller-facing streaming engine
//! - [`output`]        : cpal-backed sink (feature `realtime`)
//!
//! The controller thread fills buffers; the audio thread only swaps and
//! writes. No lock is held across a fill or a device write.

pub mod double_buffer;
pub mod params;
pub mod sink;
pub mod synth;
pub mod voice;

#[cfg(feature = "realtime")]
pub mod output;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use params::{ParamHandle, Parameters, SynthConfig, SAMPLE_RATE};
pub use revsynth_core::waves::WaveForm;
pub use sink::{AudioSink, SinkError};
pub use synth::{EngineSynth, Lifecycle, SynthError};
pub use voice::EngineVoice;

#[cfg(feature = "realtime")]
pub use output::{CpalOutput, CpalSink};
