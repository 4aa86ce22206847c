//! cpal output device behind the [`AudioSink`] seam.
//!
//! [`CpalOutput::open`] returns two halves:
//! - [`CpalOutput`] owns the `cpal::Stream` (not `Send` on every host) and
//!   stays with the caller; dropping it releases the device.
//! - [`CpalSink`] is the `Send` producer side of an SPSC ring that the stream
//!   callback drains. It moves into the synth's audio thread.
//!
//! The ring holds mono samples; the callback copies each one to every device
//! channel and converts to the device sample format. `write_samples` blocks
//! until the whole slice is queued, sleeping on a condition variable the
//! callback notifies after each period.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::{Condvar, Mutex};
use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tracing::{debug, error, warn};

use crate::sink::{AudioSink, SinkError};

/// Upper bound on one condvar sleep; covers a notify racing the wait.
const WAKE_TIMEOUT: Duration = Duration::from_millis(5);

/// No ring space for this long means the device stopped pulling samples.
const STALL_LIMIT: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct StreamShared {
    space: (Mutex<()>, Condvar),
    failure: Mutex<Option<String>>,
}

/// Owner of the running cpal stream.
pub struct CpalOutput {
    _stream: cpal::Stream,
    device_name: String,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
}

impl core::fmt::Debug for CpalOutput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpalOutput")
            .field("device", &self.device_name)
            .field("config", &self.config)
            .field("sample_format", &self.sample_format)
            .field("cpal_stream", &"(skipped)")
            .finish()
    }
}

impl CpalOutput {
    /// Open the default output device at (or as close as possible to)
    /// `sample_rate`, with a ring of `capacity` mono samples.
    pub fn open(sample_rate: u32, capacity: usize) -> Result<(Self, CpalSink), SinkError> {
        Self::open_device(None, sample_rate, capacity)
    }

    /// Same as [`open`](Self::open) but picks the device by name.
    pub fn open_device(
        name: Option<&str>,
        sample_rate: u32,
        capacity: usize,
    ) -> Result<(Self, CpalSink), SinkError> {
        let host = cpal::default_host();
        let device = pick_device(&host, name)?;
        let supported = choose_config(&device, sample_rate)?;
        let sample_format = supported.sample_format();
        let config = supported.config();
        if config.sample_rate.0 != sample_rate {
            warn!(
                requested = sample_rate,
                actual = config.sample_rate.0,
                "device does not run at the requested rate; pitch will shift"
            );
        }

        let ring = HeapRb::<f32>::new(capacity.max(1));
        let (producer, consumer) = ring.split();
        let shared = Arc::new(StreamShared::default());

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, consumer, &shared)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, consumer, &shared)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, consumer, &shared)?,
            other => return Err(SinkError::UnsupportedFormat(format!("{other:?}"))),
        };
        stream.play()?;

        let device_name = device.name()?;
        debug!(device = %device_name, ?config, ?sample_format, "audio output opened");

        let output = Self { _stream: stream, device_name, config, sample_format };
        let sink = CpalSink { producer, shared, capacity: capacity.max(1) };
        Ok((output, sink))
    }

    /// Names of the host's output devices.
    pub fn list_devices() -> Result<Vec<String>, SinkError> {
        let host = cpal::default_host();
        let mut names = Vec::new();
        for dev in host.output_devices()? {
            names.push(dev.name()?);
        }
        Ok(names)
    }

    pub fn device_name(&self) -> &str { &self.device_name }
    pub fn sample_rate(&self) -> u32 { self.config.sample_rate.0 }
    pub fn channels(&self) -> u16 { self.config.channels }
}

/// Blocking writer into the stream's ring buffer.
pub struct CpalSink {
    producer: HeapProd<f32>,
    shared: Arc<StreamShared>,
    capacity: usize,
}

impl core::fmt::Debug for CpalSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CpalSink").field("capacity", &self.capacity).finish()
    }
}

impl AudioSink for CpalSink {
    fn write_samples(&mut self, samples: &[f32]) -> Result<(), SinkError> {
        let mut rest = samples;
        let mut last_progress = Instant::now();
        while !rest.is_empty() {
            if let Some(msg) = self.shared.failure.lock().clone() {
                return Err(SinkError::Stream(msg));
            }
            let pushed = self.producer.push_slice(rest);
            rest = &rest[pushed..];
            if rest.is_empty() {
                break;
            }
            if pushed > 0 {
                last_progress = Instant::now();
            } else if last_progress.elapsed() > STALL_LIMIT {
                return Err(SinkError::Disconnected);
            }
            let (lock, cvar) = &self.shared.space;
            let mut guard = lock.lock();
            if self.producer.vacant_len() == 0 {
                cvar.wait_for(&mut guard, WAKE_TIMEOUT);
            }
        }
        Ok(())
    }
}

fn pick_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, SinkError> {
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        return Err(SinkError::DeviceNotFound(name.to_string()));
    }
    host.default_output_device().ok_or(SinkError::NoDevice)
}

/// Closest supported config to `req_sr`; prefers fewer channels and f32.
fn choose_config(device: &cpal::Device, req_sr: u32) -> Result<cpal::SupportedStreamConfig, SinkError> {
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let sr_pen = if (sr_min..=sr_max).contains(&req_sr) {
            0
        } else {
            u64::from(sr_min.abs_diff(req_sr).min(sr_max.abs_diff(req_sr)))
        };
        let ch_pen = u64::from(range.channels().saturating_sub(1));
        let fmt_pen = u64::from(range.sample_format() != cpal::SampleFormat::F32);

        let score = sr_pen.saturating_mul(1000) + ch_pen * 10 + fmt_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.ok_or(SinkError::NoSupportedConfig)?;
    let lo = range.min_sample_rate().0;
    let hi = range.max_sample_rate().0;
    Ok(range.with_sample_rate(cpal::SampleRate(req_sr.clamp(lo, hi))))
}

fn build_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut consumer: HeapCons<f32>,
    shared: &Arc<StreamShared>,
) -> Result<cpal::Stream, SinkError>
where
    T: cpal::Sample + cpal::FromSample<f32> + cpal::SizedSample + Send + 'static,
{
    let channels = usize::from(cfg.channels).max(1);
    let data_shared = Arc::clone(shared);
    let err_shared = Arc::clone(shared);

    let stream = device.build_output_stream(
        cfg,
        move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in output.chunks_mut(channels) {
                // underrun plays silence
                let s = consumer.try_pop().unwrap_or(0.0);
                let v: T = T::from_sample(s);
                for ch in frame.iter_mut() {
                    *ch = v;
                }
            }
            // notify_one() doesn't require holding the lock
            data_shared.space.1.notify_one();
        },
        move |e: cpal::StreamError| {
            error!("audio stream error: {e}");
            *err_shared.failure.lock() = Some(e.to_string());
            err_shared.space.1.notify_one();
        },
        None,
    )?;

    Ok(stream)
}
