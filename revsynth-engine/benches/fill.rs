use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use revsynth_engine::{EngineVoice, Parameters, SynthConfig, WaveForm};

fn bench_fill(c: &mut Criterion) {
    let config = SynthConfig::default();
    let len = config.buffer_len();
    let mut group = c.benchmark_group("voice_fill");
    group.throughput(Throughput::Elements(len as u64));

    for wave in WaveForm::ALL {
        let params = Parameters { waveform: wave, ..Parameters::default() };
        group.bench_with_input(BenchmarkId::new("dry", wave), &params, |b, p| {
            let mut voice = EngineVoice::with_seed(config.sample_rate, 1);
            let mut buf = vec![0.0_f32; len];
            b.iter(|| voice.fill(black_box(&mut buf), p, black_box(0.6)));
        });
    }

    let full_chain = Parameters {
        waveform: WaveForm::Sawtooth,
        modulation_strength: 0.4,
        echo_strength: 0.5,
        lpf_beta: 0.2,
        ..Parameters::default()
    };
    group.bench_function("full_chain", |b| {
        let mut voice = EngineVoice::with_seed(config.sample_rate, 1);
        let mut buf = vec![0.0_f32; len];
        b.iter(|| voice.fill(black_box(&mut buf), &full_chain, black_box(0.6)));
    });

    group.finish();
}

criterion_group!(benches, bench_fill);
criterion_main!(benches);
