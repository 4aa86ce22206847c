//! Streaming engine: one synth instance, one background audio thread.
//!
//! The controller thread owns the [`EngineSynth`] and calls
//! [`request_playback`](EngineSynth::request_playback) once per control tick.
//! That call refills the work buffer if the audio thread has swapped since
//! the last fill, and starts the audio thread on first use. The audio thread
//! loops `swap → check cancel → blocking write` until cancelled or until the
//! sink fails.
//!
//! Lifecycle: `Idle` (no thread) → `Running` → `Stopped` (cancelled, joined,
//! sink dropped). Dropping a synth that is still running disposes it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::double_buffer::DoubleBuffer;
use crate::params::{ParamHandle, Parameters, SynthConfig};
use crate::sink::{AudioSink, SinkError};
use crate::voice::EngineVoice;

/// Name of the background audio thread.
pub const AUDIO_THREAD_NAME: &str = "revsynth-audio";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Error, Debug)]
pub enum SynthError {
    #[error("synth has been disposed")]
    Disposed,
    #[error("audio loop has stopped; dispose the synth for the cause")]
    Ceased,
    #[error("audio device error: {0}")]
    Device(#[from] SinkError),
    #[error("failed to spawn audio thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("audio thread panicked")]
    WorkerPanicked,
}

/// State shared with the audio thread.
#[derive(Debug)]
struct Shared {
    buffers: DoubleBuffer,
    cancel: AtomicBool,
    ceased: AtomicBool,
}

/// Sets `ceased` however the audio loop exits, panics included.
struct CeaseOnDrop<'a>(&'a AtomicBool);

impl Drop for CeaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

pub struct EngineSynth<S: AudioSink> {
    config: SynthConfig,
    shared: Arc<Shared>,
    params: ParamHandle,
    voice: EngineVoice,
    speed: f32,
    /// Moved into the audio thread on start.
    sink: Option<S>,
    worker: Option<JoinHandle<Result<(), SinkError>>>,
    lifecycle: Lifecycle,
}

impl<S: AudioSink> EngineSynth<S> {
    /// 44.1 kHz, 50 ms buffers, default parameters.
    pub fn new(sink: S) -> Self {
        Self::with_config(sink, SynthConfig::default(), Parameters::default())
    }

    pub fn with_config(sink: S, config: SynthConfig, params: Parameters) -> Self {
        Self::with_voice(sink, config, params, EngineVoice::new(config.sample_rate))
    }

    /// Use a prepared voice (e.g. seeded). Its sample rate should match `config`.
    pub fn with_voice(sink: S, config: SynthConfig, params: Parameters, voice: EngineVoice) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                buffers: DoubleBuffer::new(config.buffer_len()),
                cancel: AtomicBool::new(false),
                ceased: AtomicBool::new(false),
            }),
            params: ParamHandle::new(params),
            voice,
            speed: 0.0,
            sink: Some(sink),
            worker: None,
            lifecycle: Lifecycle::Idle,
        }
    }

    #[inline] pub fn config(&self) -> SynthConfig { self.config }
    #[inline] pub fn lifecycle(&self) -> Lifecycle { self.lifecycle }

    /// Last speed passed to `request_playback`.
    #[inline] pub fn speed(&self) -> f32 { self.speed }

    #[inline] pub fn voice(&self) -> &EngineVoice { &self.voice }

    /// Samples per stream buffer.
    #[inline] pub fn buffer_len(&self) -> usize { self.shared.buffers.len() }

    /// Buffer swaps performed by the audio thread so far.
    pub fn swaps(&self) -> u64 { self.shared.buffers.swaps() }

    /// The audio loop has exited (cancelled, device failure or panic).
    pub fn is_ceased(&self) -> bool {
        self.shared.ceased.load(Ordering::Acquire)
    }

    /// Replace the parameter set; used from the next fill on.
    pub fn set_parameters(&self, params: Parameters) {
        self.params.set(params);
    }

    pub fn parameters(&self) -> Arc<Parameters> {
        self.params.get()
    }

    /// Handle for publishing parameters from another thread.
    pub fn param_handle(&self) -> ParamHandle {
        self.params.clone()
    }

    /// Record `speed`, refill the work buffer if it was drained, and start
    /// the audio thread on first call. Never blocks on audio I/O.
    pub fn request_playback(&mut self, speed: f32) -> Result<(), SynthError> {
        match self.lifecycle {
            Lifecycle::Stopped => return Err(SynthError::Disposed),
            Lifecycle::Running if self.is_ceased() => return Err(SynthError::Ceased),
            _ => {}
        }
        self.speed = speed;
        self.fill_if_dirty();
        if self.lifecycle == Lifecycle::Idle {
            self.start()?;
        }
        Ok(())
    }

    /// Best-effort copy of the buffer not owned by the audio thread, for
    /// visualizers. `false` while that buffer is being filled.
    pub fn copy_work_buffer(&self, out: &mut Vec<f32>) -> bool {
        self.shared.buffers.copy_work(out)
    }

    /// Stop the audio thread, wait for it, and release the sink. Returns the
    /// device error if the loop died on one. Later calls are no-ops.
    pub fn dispose(&mut self) -> Result<(), SynthError> {
        let previous = std::mem::replace(&mut self.lifecycle, Lifecycle::Stopped);
        self.shared.cancel.store(true, Ordering::Release);
        self.shared.buffers.close();
        self.sink = None;
        if previous != Lifecycle::Running {
            return Ok(());
        }
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        let result = match worker.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SynthError::Device(e)),
            Err(_) => Err(SynthError::WorkerPanicked),
        };
        debug!(swaps = self.swaps(), "audio thread joined");
        result
    }

    fn fill_if_dirty(&mut self) -> bool {
        let Some(mut work) = self.shared.buffers.take_work() else {
            return false;
        };
        let params = self.params.get();
        self.voice.fill(&mut work, &params, self.speed);
        self.shared.buffers.return_work(work);
        true
    }

    fn start(&mut self) -> Result<(), SynthError> {
        let Some(sink) = self.sink.take() else {
            self.lifecycle = Lifecycle::Stopped;
            return Err(SynthError::Disposed);
        };
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(AUDIO_THREAD_NAME.into())
            .spawn(move || run_loop(&shared, sink));
        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.lifecycle = Lifecycle::Running;
                debug!(
                    sample_rate = self.config.sample_rate,
                    buffer_len = self.buffer_len(),
                    "audio thread started"
                );
                Ok(())
            }
            Err(e) => {
                self.lifecycle = Lifecycle::Stopped;
                Err(SynthError::Spawn(e))
            }
        }
    }
}

impl<S: AudioSink> Drop for EngineSynth<S> {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        if let Err(e) = self.dispose() {
            warn!("audio loop ended with error: {e}");
        }
    }
}

impl<S: AudioSink> core::fmt::Debug for EngineSynth<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineSynth")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("speed", &self.speed)
            .field("sink", &"(skipped)")
            .finish()
    }
}

/// Audio thread body.
fn run_loop<S: AudioSink>(shared: &Shared, mut sink: S) -> Result<(), SinkError> {
    let _ceased = CeaseOnDrop(&shared.ceased);
    let Some(mut play) = shared.buffers.claim_play() else {
        return Ok(());
    };
    debug!("audio loop started");

    while let Some(index) = shared.buffers.swap(&mut play) {
        trace!(index, "buffers swapped");
        if shared.cancel.load(Ordering::Acquire) {
            break;
        }
        if let Err(e) = sink.write_samples(&play) {
            error!("audio device write failed, stopping loop: {e}");
            return Err(e);
        }
    }

    debug!("audio loop finished");
    Ok(())
}
