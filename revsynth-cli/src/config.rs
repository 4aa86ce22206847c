//! TOML lab file: stream settings plus the voice parameters.
//!
//! ```toml
//! [synth]
//! sample_rate = 44100
//! buffer_ms = 50
//!
//! [params]
//! waveform = "sawtooth"
//! max_frequency = 180.0
//! ```
//!
//! Missing tables and keys fall back to the defaults.

use std::path::Path;

use anyhow::{Context, Result};
use revsynth_engine::{Parameters, SynthConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub synth: SynthConfig,
    pub params: Parameters,
}

impl LabConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Defaults when no file is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn generate_default(path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
