//! revsynth engine lab: play the synth live with a simulated throttle, or
//! render the same sweep to a WAV file.

mod config;
mod scope;
mod sweep;

use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use hound::{SampleFormat, WavSpec, WavWriter};
use revsynth_engine::{CpalOutput, EngineSynth, EngineVoice, SynthError, WaveForm};
use tracing::{debug, info, warn};

use crate::config::LabConfig;

/// Control tick of the live player.
const TICK: Duration = Duration::from_millis(10);

/// Redraw interval of the `--scope` view.
const SCOPE_INTERVAL: Duration = Duration::from_millis(100);

/// Procedural engine-sound synthesizer
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play on an output device while sweeping the speed
    Play(PlayArgs),
    /// Render the speed sweep offline to a 16-bit mono WAV file
    Render(RenderArgs),
    /// List output devices
    ListDevices,
    /// Write a lab file with the default settings and exit
    GenerateConfig(ConfigArgs),
}

#[derive(ClapArgs)]
struct VoiceArgs {
    /// Lab file (TOML) with `[synth]` and `[params]` tables
    #[arg(long)]
    params: Option<PathBuf>,
    /// Override the waveform (sine, pop, sawtooth, square, cylinders)
    #[arg(long)]
    waveform: Option<WaveForm>,
}

impl VoiceArgs {
    fn lab(&self) -> Result<LabConfig> {
        let mut lab = LabConfig::load_or_default(self.params.as_deref())?;
        if let Some(w) = self.waveform {
            lab.params.waveform = w;
        }
        lab.params = lab.params.clamped();
        Ok(lab)
    }
}

#[derive(ClapArgs)]
struct PlayArgs {
    #[command(flatten)]
    voice: VoiceArgs,
    /// Output device name (default device if omitted)
    #[arg(long)]
    device: Option<String>,
    /// Seconds for one 0 → 1 → 0 speed sweep
    #[arg(long, default_value_t = 8.0)]
    sweep: f32,
    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<f32>,
    /// Draw an ASCII oscilloscope of the work buffer
    #[arg(long, default_value_t = false)]
    scope: bool,
}

#[derive(ClapArgs)]
struct RenderArgs {
    #[command(flatten)]
    voice: VoiceArgs,
    /// Output WAV path
    #[arg(long, default_value = "revsynth.wav")]
    out: PathBuf,
    /// Length of the render in seconds
    #[arg(long, default_value_t = 8.0)]
    seconds: f32,
    /// Seconds for one sweep (defaults to the render length)
    #[arg(long)]
    sweep: Option<f32>,
    /// Seed for the randomization stage, for reproducible renders
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(ClapArgs)]
struct ConfigArgs {
    /// Output path for the generated lab file
    #[arg(long, default_value = "revsynth.toml")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Play(args) => play(&args),
        Commands::Render(args) => render(&args),
        Commands::ListDevices => list_devices(),
        Commands::GenerateConfig(args) => {
            LabConfig::generate_default(&args.out)?;
            println!("Generated default lab file at {}", args.out.display());
            Ok(())
        }
    }
}

fn list_devices() -> Result<()> {
    println!("Available output devices:");
    for name in CpalOutput::list_devices()? {
        println!("- {name}");
    }
    Ok(())
}

fn play(args: &PlayArgs) -> Result<()> {
    let lab = args.voice.lab()?;
    let (output, sink) = CpalOutput::open_device(
        args.device.as_deref(),
        lab.synth.sample_rate,
        lab.synth.buffer_len(),
    )
    .context("opening audio output")?;
    info!(
        device = output.device_name(),
        sample_rate = output.sample_rate(),
        channels = output.channels(),
        waveform = %lab.params.waveform,
        "playing; press Ctrl+C to stop"
    );

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))?;
    }

    let mut synth = EngineSynth::with_config(sink, lab.synth, lab.params);
    let limit = args.duration.map(Duration::from_secs_f32);
    let start = Instant::now();
    let mut last_scope = start;
    let mut scope_buf = Vec::with_capacity(synth.buffer_len());

    while running.load(Ordering::SeqCst) {
        let elapsed = start.elapsed();
        if limit.is_some_and(|d| elapsed >= d) {
            break;
        }
        let speed = sweep::triangle(elapsed.as_secs_f32(), args.sweep);
        match synth.request_playback(speed) {
            Ok(()) => {}
            // the cause comes back from dispose below
            Err(SynthError::Ceased) => break,
            Err(e) => return Err(e.into()),
        }
        if args.scope && last_scope.elapsed() >= SCOPE_INTERVAL && synth.copy_work_buffer(&mut scope_buf) {
            last_scope = Instant::now();
            print!("\x1b[2J\x1b[H{}", scope::render(&scope_buf, 100, 21));
            println!("speed {speed:.2}  {:.1} Hz", lab.params.frequency_at(speed));
        }
        std::thread::sleep(TICK);
    }

    debug!(swaps = synth.swaps(), "stopping");
    synth.dispose().context("audio loop failed")?;
    drop(output);
    Ok(())
}

fn render(args: &RenderArgs) -> Result<()> {
    if !(args.seconds.is_finite() && args.seconds > 0.0) {
        bail!("--seconds must be positive, got {}", args.seconds);
    }
    let lab = args.voice.lab()?;
    let voice = match args.seed {
        Some(seed) => EngineVoice::with_seed(lab.synth.sample_rate, seed),
        None => EngineVoice::new(lab.synth.sample_rate),
    };
    let file = std::fs::File::create(&args.out)
        .with_context(|| format!("creating {}", args.out.display()))?;
    let started = Instant::now();
    let frames = render_wav(
        std::io::BufWriter::new(file),
        &lab,
        voice,
        args.seconds,
        args.sweep.unwrap_or(args.seconds),
    )?;
    info!(
        path = %args.out.display(),
        frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "render finished"
    );
    warn_if_silent(&args.out);
    Ok(())
}

/// Write `seconds` of the sweep as 16-bit mono PCM. Returns the frame count.
fn render_wav<W: Write + Seek>(
    writer: W,
    lab: &LabConfig,
    mut voice: EngineVoice,
    seconds: f32,
    sweep_s: f32,
) -> Result<u64> {
    let sample_rate = lab.synth.sample_rate;
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut wav = WavWriter::new(writer, spec)?;
    let total = (f64::from(seconds) * f64::from(sample_rate)).round() as u64;
    let mut buf = vec![0.0_f32; lab.synth.buffer_len()];
    let mut written = 0_u64;

    while written < total {
        let n = buf.len().min((total - written) as usize);
        let t = written as f32 / sample_rate.max(1) as f32;
        voice.fill(&mut buf[..n], &lab.params, sweep::triangle(t, sweep_s));
        for s in &buf[..n] {
            wav.write_sample((s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16)?;
        }
        written += n as u64;
    }

    wav.finalize()?;
    Ok(written)
}

fn warn_if_silent(path: &Path) {
    let Ok(reader) = hound::WavReader::open(path) else {
        return;
    };
    let mut samples = reader.into_samples::<i16>();
    if samples.all(|s| s.map_or(true, |v| v == 0)) {
        warn!(path = %path.display(), "rendered file is silent");
    }
}
