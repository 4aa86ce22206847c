//! The engine voice: oscillator plus the stateful post-processing chain.
//!
//! `EngineVoice` owns everything that must carry over from one buffer to the
//! next: the absolute sample counter (elapsed time is `n / sr`), the echo
//! line, the low-pass memory and the randomization RNG. Each sample runs
//!
//! ```text
//! raw(t, f, wave) → × rand[1-noise, 1] → gain curve → AM → echo → low-pass → clamp
//! ```
//!
//! AM and echo are skipped entirely when their strength is zero. Frequency is
//! interpolated from the speed fraction once per [`EngineVoice::fill`] call.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use revsynth_core::delay::EchoLine;
use revsynth_core::dsp::{am_carrier, clamp01, hard_limit, shape_gain};
use revsynth_core::filters::OnePoleLP;
use revsynth_core::waves::raw_sample;

use crate::params::Parameters;

#[derive(Clone, Debug)]
pub struct EngineVoice {
    sr: f32,
    n: u64,
    echo: EchoLine,
    lp: OnePoleLP,
    rng: SmallRng,
}

impl EngineVoice {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_rng(sample_rate, SmallRng::from_entropy())
    }

    /// Deterministic randomization, for tests and offline renders.
    pub fn with_seed(sample_rate: u32, seed: u64) -> Self {
        Self::with_rng(sample_rate, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(sample_rate: u32, rng: SmallRng) -> Self {
        Self {
            sr: sample_rate.max(1) as f32,
            n: 0,
            echo: EchoLine::new(),
            lp: OnePoleLP::default(),
            rng,
        }
    }

    /// Return the voice’s sample rate.
    #[inline] pub fn sample_rate(&self) -> f32 { self.sr }

    /// Samples produced since creation.
    #[inline] pub fn sample_index(&self) -> u64 { self.n }

    /// Elapsed time (seconds) of the next sample.
    #[inline] pub fn time(&self) -> f64 { self.n as f64 / f64::from(self.sr) }

    #[inline] pub fn echo(&self) -> &EchoLine { &self.echo }

    /// Fill `out` with the next `out.len()` samples at `speed` ∈ [0, 1].
    pub fn fill(&mut self, out: &mut [f32], params: &Parameters, speed: f32) {
        let freq = params.frequency_at(speed);
        let noise = clamp01(params.noise);
        let mod_strength = clamp01(params.modulation_strength);
        let echo_strength = clamp01(params.echo_strength);
        if echo_strength > 0.0 {
            self.echo.set_delay(params.echo_delay, self.sr);
        }
        self.lp.set_beta(params.lpf_beta);

        for y in out.iter_mut() {
            let t = self.time();
            let mut v = raw_sample(t, freq, params.waveform);
            if noise > 0.0 {
                v *= self.rng.gen_range(1.0 - noise..=1.0);
            }
            v = shape_gain(v, params.gain);
            if mod_strength > 0.0 {
                v *= am_carrier(t, params.modulation_frequency, mod_strength);
            }
            if echo_strength > 0.0 {
                v = self.echo.process(self.n, v, echo_strength);
            }
            v = self.lp.process(v);
            *y = hard_limit(v);
            self.n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::PI;
    use revsynth_core::waves::WaveForm;

    const SR: u32 = 44_100;

    fn quiet(p: Parameters) -> Parameters {
        Parameters { noise: 0.0, ..p }
    }

    #[test]
    fn default_pop_at_full_speed_is_a_250hz_half_cosine() {
        let mut voice = EngineVoice::with_seed(SR, 7);
        let mut buf = vec![0.0; 2205];
        voice.fill(&mut buf, &quiet(Parameters::default()), 1.0);

        // 5 ms = 220 samples; period at 250 Hz = 176.4 samples
        for (n, &y) in buf.iter().enumerate().take(220) {
            let x = (n as f64 * 250.0 / f64::from(SR)).fract() as f32;
            let expected = if x < 0.5 { (PI * x).cos() } else { 0.0 };
            assert!((y - expected).abs() < 1e-4, "n={n} y={y} expected={expected}");
        }
        // second half of the first period is silent
        assert!(buf[89..176].iter().all(|v| v.abs() < 1e-6));
    }

    #[test]
    fn default_randomization_stays_inside_the_pulse_envelope() {
        let mut voice = EngineVoice::with_seed(SR, 11);
        let mut buf = vec![0.0; 2205];
        voice.fill(&mut buf, &Parameters::default(), 1.0);
        for (n, &y) in buf.iter().enumerate().take(220) {
            let x = (n as f64 * 250.0 / f64::from(SR)).fract() as f32;
            let pulse = if x < 0.5 { (PI * x).cos() } else { 0.0 };
            assert!(y <= pulse + 1e-5 && y >= 0.6 * pulse - 1e-5, "n={n} y={y} pulse={pulse}");
        }
    }

    #[test]
    fn sample_counter_advances_across_fills() {
        let mut voice = EngineVoice::with_seed(SR, 1);
        let p = quiet(Parameters { waveform: WaveForm::Sine, ..Parameters::default() });
        let mut whole = vec![0.0; 300];
        voice.fill(&mut whole, &p, 0.3);
        assert_eq!(voice.sample_index(), 300);

        let mut split_voice = EngineVoice::with_seed(SR, 1);
        let mut a = vec![0.0; 120];
        let mut b = vec![0.0; 180];
        split_voice.fill(&mut a, &p, 0.3);
        split_voice.fill(&mut b, &p, 0.3);
        a.extend_from_slice(&b);
        assert_eq!(whole, a);
    }

    #[test]
    fn output_is_clamped_for_hostile_parameters() {
        let hostile = Parameters {
            waveform: WaveForm::Square,
            min_frequency: -50.0,
            max_frequency: f32::INFINITY,
            gain: 0.0,
            noise: 5.0,
            modulation_strength: 9.0,
            modulation_frequency: f32::NAN,
            echo_strength: 4.0,
            echo_delay: -1.0,
            lpf_beta: 3.0,
        };
        for wave in WaveForm::ALL {
            let mut voice = EngineVoice::with_seed(SR, 3);
            let mut buf = vec![0.0; 4096];
            for speed in [0.0, 0.5, 1.0, 2.0] {
                voice.fill(&mut buf, &Parameters { waveform: wave, ..hostile }, speed);
                assert!(buf.iter().all(|v| (-1.0..=1.0).contains(v)), "{wave}");
            }
        }
    }

    #[test]
    fn zero_echo_strength_leaves_signal_untouched() {
        let base = quiet(Parameters { waveform: WaveForm::Sawtooth, ..Parameters::default() });
        let mut dry = EngineVoice::with_seed(SR, 5);
        let mut wet = EngineVoice::with_seed(SR, 5);
        let mut a = vec![0.0; 2000];
        let mut b = vec![0.0; 2000];
        dry.fill(&mut a, &base, 0.4);
        wet.fill(&mut b, &Parameters { echo_strength: 0.0, echo_delay: 0.01, ..base }, 0.4);
        assert_eq!(a, b);
        assert_eq!(wet.echo().capacity(), 0);
    }

    #[test]
    fn echo_delay_growth_reads_silence_then_echoes() {
        // square at 1 Hz, speed 0: constant +1 for the first half second
        let p = quiet(Parameters {
            waveform: WaveForm::Square,
            min_frequency: 1.0,
            max_frequency: 1.0,
            echo_strength: 0.5,
            echo_delay: 0.2,
            ..Parameters::default()
        });
        let mut voice = EngineVoice::with_seed(1000, 9);
        let mut buf = vec![0.0; 250];
        voice.fill(&mut buf, &p, 0.0);
        assert_eq!(buf[199], 1.0);
        assert_eq!(buf[200], 1.0, "echo adds on top but clamp holds it at 1");

        let grown = Parameters { echo_delay: 0.5, waveform: WaveForm::Sine, ..p };
        let mut dry_voice = EngineVoice::with_seed(1000, 9);
        let mut skip = vec![0.0; 250];
        dry_voice.fill(&mut skip, &Parameters { echo_strength: 0.0, ..p }, 0.0);

        let mut wet = vec![0.0; 500];
        let mut dry = vec![0.0; 500];
        voice.fill(&mut wet, &grown, 0.0);
        assert_eq!(voice.echo().capacity(), 500);
        dry_voice.fill(&mut dry, &Parameters { echo_strength: 0.0, ..grown }, 0.0);
        assert_eq!(wet, dry, "new region of the line must be silent");
    }

    #[test]
    fn low_pass_smooths_across_buffer_boundaries() {
        let p = quiet(Parameters {
            waveform: WaveForm::Square,
            min_frequency: 50.0,
            max_frequency: 50.0,
            lpf_beta: 0.05,
            ..Parameters::default()
        });
        let mut voice = EngineVoice::with_seed(SR, 2);
        let mut a = vec![0.0; 64];
        let mut b = vec![0.0; 64];
        voice.fill(&mut a, &p, 0.0);
        voice.fill(&mut b, &p, 0.0);
        // a rising one-pole response, continuous at the seam
        assert!(a[0] > 0.0 && a[0] < 0.1);
        assert!(b[0] > a[63]);
        assert!(b[0] - a[63] < 0.05);
    }

    #[test]
    fn modulation_changes_the_envelope() {
        let p = quiet(Parameters {
            waveform: WaveForm::Square,
            modulation_strength: 0.5,
            modulation_frequency: 10.0,
            ..Parameters::default()
        });
        let mut voice = EngineVoice::with_seed(SR, 4);
        let mut buf = vec![0.0; 4410];
        voice.fill(&mut buf, &p, 0.0);
        let peak = buf.iter().fold(0.0_f32, |m, v| m.max(v.abs()));
        assert!(peak <= 0.5 + 1e-4, "peak={peak}");
        assert!(peak > 0.4, "peak={peak}");
    }
}
