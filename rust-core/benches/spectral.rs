//! Spectral estimation benchmarks
//!
//! Compares averaged vs dense spectrograms and serial vs parallel rows.
//!
//! Run with: cargo bench -p gwspectra-core --bench spectral

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

use gwspectra::filters::WhitenConfig;
use gwspectra::spectrum::{Method, SpectralConfig, SpectrogramConfig};
use gwspectra::TimeSeries;

const SAMPLE_RATE: f64 = 4096.0;

fn noise(seconds: usize) -> TimeSeries {
    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let data = (0..seconds * SAMPLE_RATE as usize)
        .map(|_| normal.sample(&mut rng))
        .collect();
    TimeSeries::new(data, SAMPLE_RATE)
}

/// Benchmark PSD estimation across averaging methods
fn bench_psd(c: &mut Criterion) {
    let mut group = c.benchmark_group("psd");
    let series = noise(64);
    group.throughput(Throughput::Elements(series.len() as u64));

    for method in [Method::Welch, Method::Median, Method::MedianMean] {
        let config = SpectralConfig::new().fftlength(4.0).overlap(2.0).method(method.clone());
        group.bench_with_input(BenchmarkId::new("method", &method), &config, |b, config| {
            b.iter(|| series.psd(black_box(config)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark averaged vs segment-reusing spectrograms
fn bench_spectrogram(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrogram");
    group.measurement_time(Duration::from_secs(10));

    for seconds in [64, 256].iter() {
        let series = noise(*seconds);
        let config = SpectrogramConfig::new(
            SpectralConfig::new().fftlength(1.0).overlap(0.5).method(Method::Median),
        )
        .block_length(4.0);
        group.throughput(Throughput::Elements(series.len() as u64));

        group.bench_with_input(BenchmarkId::new("averaged", seconds), &series, |b, series| {
            b.iter(|| series.spectrogram(1.0, black_box(&config)).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("dense", seconds), &series, |b, series| {
            b.iter(|| series.spectrogram2(1.0, black_box(&config)).unwrap())
        });
    }

    group.finish();
}

/// Benchmark spectrogram rows: sequential vs parallel
fn bench_parallel_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("spectrogram_nproc");
    group.measurement_time(Duration::from_secs(10));
    let series = noise(256);

    for nproc in [1, 2, 4, 8].iter() {
        let config =
            SpectrogramConfig::new(SpectralConfig::new().fftlength(2.0).overlap(1.0)).nproc(*nproc);
        group.bench_with_input(BenchmarkId::from_parameter(nproc), &config, |b, config| {
            b.iter(|| series.spectrogram(4.0, black_box(config)).unwrap())
        });
    }

    group.finish();
}

fn bench_whiten(c: &mut Criterion) {
    let series = noise(64);
    let config = WhitenConfig::new(4.0, 2.0);
    c.bench_function("whiten_64s", |b| b.iter(|| series.whiten(black_box(&config)).unwrap()));
}

criterion_group!(benches, bench_psd, bench_spectrogram, bench_parallel_rows, bench_whiten);
criterion_main!(benches);
