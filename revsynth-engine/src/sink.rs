//! Output device seam.
//!
//! The streaming loop only needs "accepts blocking writes of mono f32 samples
//! at a fixed rate". Opening the device is the job of the concrete sink's
//! constructor; releasing it is its `Drop`.

use thiserror::Error;

/// A blocking consumer of mono samples, driven from the audio thread.
pub trait AudioSink: Send + 'static {
    /// Write every sample of `samples`. Returns once they are consumed or
    /// queued by the device. An error is fatal for the synth instance.
    fn write_samples(&mut self, samples: &[f32]) -> Result<(), SinkError>;
}

impl<S: AudioSink + ?Sized> AudioSink for Box<S> {
    fn write_samples(&mut self, samples: &[f32]) -> Result<(), SinkError> {
        (**self).write_samples(samples)
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("requested device not found: {0}")]
    DeviceNotFound(String),
    #[error("no supported output configs")]
    NoSupportedConfig,
    #[error("unsupported device sample format: {0}")]
    UnsupportedFormat(String),
    #[cfg(feature = "realtime")]
    #[error("failed to enumerate devices: {0}")]
    Devices(#[from] cpal::DevicesError),
    #[cfg(feature = "realtime")]
    #[error("failed to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),
    #[cfg(feature = "realtime")]
    #[error("failed to list supported output configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),
    #[cfg(feature = "realtime")]
    #[error("failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[cfg(feature = "realtime")]
    #[error("failed to play audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("audio stream error: {0}")]
    Stream(String),
    #[error("audio output disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<f32>);

    impl AudioSink for Collect {
        fn write_samples(&mut self, samples: &[f32]) -> Result<(), SinkError> {
            if samples.is_empty() {
                return Err(SinkError::Disconnected);
            }
            self.0.extend_from_slice(samples);
            Ok(())
        }
    }

    #[test]
    fn boxed_sink_forwards_writes_and_errors() {
        let mut sink: Box<Collect> = Box::new(Collect(Vec::new()));
        sink.write_samples(&[0.5, -0.5]).unwrap();
        assert!(matches!(sink.write_samples(&[]), Err(SinkError::Disconnected)));
        assert_eq!(sink.0, vec![0.5, -0.5]);
    }

    #[test]
    fn errors_name_their_cause() {
        assert_eq!(
            SinkError::DeviceNotFound("USB DAC".into()).to_string(),
            "requested device not found: USB DAC"
        );
        assert_eq!(SinkError::Stream("xrun".into()).to_string(), "audio stream error: xrun");
    }
}
