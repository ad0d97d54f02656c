//! Time-frequency maps built from per-block spectral estimates
//!
//! `spectrogram` reduces every outer block independently (optionally in
//! parallel); `spectrogram2` transforms each segment of the shared grid
//! once and reuses it for every block containing it. Both produce
//! identical rows.

use super::averaging::Method;
use super::estimator::{
    align_rates, check_cross_method, check_pair, power_unit, CrossEstimator, Geometry, PowerEstimator,
    SpectralConfig,
};
use super::fft::{Normalization, SegmentTransform};
use super::segment::{seconds_to_samples, SegmentPlan};
use super::windowing::Detrend;
use crate::dispatch::{partition, ChunkDispatcher};
use crate::error::{Result, SpectralError};
use crate::series::{Spectrogram, TimeSeries, Unit};
use ndarray::{s, Array2, ArrayView1};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Spectrogram configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// Per-row estimator; `fftlength` defaults to the block length
    #[serde(flatten)]
    pub spectral: SpectralConfig,

    /// Outer block length in seconds, at least the stride (default: the stride)
    pub block_length: Option<f64>,

    /// Worker threads for row computation
    pub nproc: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            spectral: SpectralConfig::default(),
            block_length: None,
            nproc: 1,
        }
    }
}

impl SpectrogramConfig {
    pub fn new(spectral: SpectralConfig) -> Self {
        Self {
            spectral,
            ..Self::default()
        }
    }

    pub fn block_length(mut self, seconds: f64) -> Self {
        self.block_length = Some(seconds);
        self
    }

    pub fn nproc(mut self, nproc: usize) -> Self {
        self.nproc = nproc;
        self
    }
}

/// Outer-block layout in samples
#[derive(Debug, Clone, Copy)]
struct RowPlan {
    stride: usize,
    block: usize,
    rows: usize,
    geometry: Geometry,
}

impl RowPlan {
    fn block_range(&self, row: usize) -> Range<usize> {
        let start = row * self.stride;
        start..start + self.block
    }
}

fn plan_rows(series: &TimeSeries, stride: f64, config: &SpectrogramConfig) -> Result<RowPlan> {
    series.require_samples("spectrogram")?;
    let fs = series.sample_rate();
    if stride > series.duration() {
        return Err(SpectralError::InvalidSegmentation(format!(
            "stride ({stride} s) cannot be greater than the duration of the series ({} s)",
            series.duration()
        )));
    }
    let nstride = seconds_to_samples(stride, fs)?;
    if nstride == 0 {
        return Err(SpectralError::InvalidSegmentation(
            "stride must be at least one sample".into(),
        ));
    }
    let nblock = match config.block_length {
        Some(seconds) => seconds_to_samples(seconds, fs)?,
        None => nstride,
    };
    if nblock < nstride || nblock > series.len() {
        return Err(SpectralError::InvalidSegmentation(format!(
            "block length ({nblock} samples) must lie between the stride ({nstride} samples) and the series length ({} samples)",
            series.len()
        )));
    }

    let geometry = config.spectral.geometry(nblock, fs)?;
    if geometry.nfft == 0 || geometry.nfft > nblock {
        return Err(SpectralError::InvalidSegmentation(format!(
            "fftlength ({} samples) must be positive and no greater than the block length ({nblock} samples)",
            geometry.nfft
        )));
    }
    if geometry.noverlap >= geometry.nfft {
        return Err(SpectralError::InvalidSegmentation(format!(
            "overlap ({} samples) must be less than fftlength ({} samples)",
            geometry.noverlap, geometry.nfft
        )));
    }

    let rows = (series.len() - nblock) / nstride + 1;
    log::debug!(
        "spectrogram layout: {rows} rows, stride {nstride}, block {nblock}, nfft {}, overlap {}",
        geometry.nfft,
        geometry.noverlap
    );
    Ok(RowPlan {
        stride: nstride,
        block: nblock,
        rows,
        geometry,
    })
}

fn assemble<T: Clone>(
    series: &TimeSeries,
    plan: &RowPlan,
    rows: Vec<Vec<T>>,
    unit: Unit,
) -> Result<Spectrogram<T>> {
    let fs = series.sample_rate();
    Ok(Spectrogram::from_rows(
        rows,
        plan.geometry.nbins(),
        series.epoch(),
        plan.stride as f64 / fs,
        fs / plan.geometry.nfft as f64,
    )?
    .with_unit(unit)
    .with_channel(series.channel())
    .with_name(series.name().map(str::to_string)))
}

/// Average power spectrogram: one estimate per `stride` seconds
///
/// Row `i` is the estimate of the block starting `i * stride` into the
/// series; the trailing partial block is dropped. Rows are spread across
/// `config.nproc` workers and returned in order.
pub fn spectrogram(series: &TimeSeries, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
    let plan = plan_rows(series, stride, config)?;
    let average = config.spectral.method.resolve()?;
    let fs = series.sample_rate();
    let data = series.data();

    let dispatcher = ChunkDispatcher::new(config.nproc);
    let chunks = partition(plan.rows, dispatcher.nproc());
    let results = dispatcher.run(chunks, |_, rows: Range<usize>| {
        let mut estimator = PowerEstimator::new(&config.spectral, plan.geometry, fs)?;
        rows.map(|row| estimator.estimate(&data[plan.block_range(row)]))
            .collect::<Result<Vec<_>>>()
    })?;
    let rows: Vec<Vec<f64>> = results.into_iter().flatten().collect();

    let unit = average.output_unit(&power_unit(series.unit(), config.spectral.scaling));
    assemble(series, &plan, rows, unit)
}

/// Dense-mode spectrogram with segment reuse across blocks
///
/// The block stride must be a whole number of segment strides, otherwise
/// fails with [`SpectralError::Alignment`]. Rows are identical to
/// [`spectrogram`] with the same arguments.
pub fn spectrogram2(series: &TimeSeries, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
    let plan = plan_rows(series, stride, config)?;
    let Geometry { nfft, noverlap } = plan.geometry;
    let grid = SegmentPlan::aligned(series.len(), nfft, noverlap, plan.stride)?;
    let step = plan.stride / grid.stride();
    let per_block = SegmentPlan::new(plan.block, nfft, noverlap)?.count();
    let total = (plan.rows - 1) * step + per_block;

    let mut estimator = PowerEstimator::new(&config.spectral, plan.geometry, series.sample_rate())?;

    let mut needed = vec![false; total];
    for row in 0..plan.rows {
        needed[row * step..row * step + per_block].fill(true);
    }
    let mut powers = Array2::zeros((total, plan.geometry.nbins()));
    let data = series.data();
    for (index, mut slot) in powers.outer_iter_mut().enumerate() {
        if needed[index] {
            let power = estimator.transform.power(&data[grid.range(index)])?;
            slot.assign(&ArrayView1::from(power));
        }
    }
    log::debug!(
        "dense spectrogram: {} distinct segments for {} rows",
        needed.iter().filter(|n| **n).count(),
        plan.rows
    );

    let rows = (0..plan.rows)
        .map(|row| {
            let first = row * step;
            estimator
                .average
                .combine(powers.slice(s![first..first + per_block, ..]))
        })
        .collect::<Result<Vec<_>>>()?;

    let unit = estimator
        .average
        .output_unit(&power_unit(series.unit(), config.spectral.scaling));
    assemble(series, &plan, rows, unit)
}

/// Complex cross-spectrogram of two equally sampled series
///
/// Non-linear methods warn once, before any work is dispatched, and
/// proceed with Welch averaging.
pub fn csd_spectrogram(
    a: &TimeSeries,
    b: &TimeSeries,
    stride: f64,
    config: &SpectrogramConfig,
) -> Result<Spectrogram<Complex64>> {
    check_pair(a, b)?;
    check_cross_method(&config.spectral.method)?;
    let plan = plan_rows(a, stride, config)?;
    let fs = a.sample_rate();
    let (x, y) = (a.data(), b.data());

    let dispatcher = ChunkDispatcher::new(config.nproc);
    let chunks = partition(plan.rows, dispatcher.nproc());
    let results = dispatcher.run(chunks, |_, rows: Range<usize>| {
        let mut estimator = CrossEstimator::new(&config.spectral, plan.geometry, fs)?;
        rows.map(|row| {
            let range = plan.block_range(row);
            estimator.estimate(&x[range.clone()], &y[range])
        })
        .collect::<Result<Vec<_>>>()
    })?;
    let rows: Vec<Vec<Complex64>> = results.into_iter().flatten().collect();

    let unit = power_unit(&Unit::dimensionless(), config.spectral.scaling).multiply(&(a.unit() * b.unit()));
    assemble(a, &plan, rows, unit)
}

/// Magnitude-squared coherence per `stride` seconds
///
/// Inputs are rate-aligned as for [`coherence`](super::estimator::coherence)
/// and every row is a Welch estimate regardless of `config.spectral.method`.
pub fn coherence_spectrogram(
    a: &TimeSeries,
    b: &TimeSeries,
    stride: f64,
    config: &SpectrogramConfig,
) -> Result<Spectrogram<f64>> {
    let (a, b) = align_rates(a, b)?;
    let mut config = config.clone();
    config.spectral.method = Method::Welch;
    let plan = plan_rows(&a, stride, &config)?;
    let fs = a.sample_rate();
    let (x, y) = (a.data(), b.data());

    let dispatcher = ChunkDispatcher::new(config.nproc);
    let chunks = partition(plan.rows, dispatcher.nproc());
    let results = dispatcher.run(chunks, |_, rows: Range<usize>| {
        let mut cross = CrossEstimator::new(&config.spectral, plan.geometry, fs)?;
        let mut power = PowerEstimator::new(&config.spectral, plan.geometry, fs)?;
        rows.map(|row| {
            let range = plan.block_range(row);
            let pxy = cross.estimate(&x[range.clone()], &y[range.clone()])?;
            let pxx = power.estimate(&x[range.clone()])?;
            let pyy = power.estimate(&y[range])?;
            Ok(pxy
                .iter()
                .zip(pxx.iter().zip(pyy.iter()))
                .map(|(xy, (xx, yy))| xy.norm_sqr() / (xx * yy))
                .collect())
        })
        .collect::<Result<Vec<Vec<f64>>>>()
    })?;
    let rows: Vec<Vec<f64>> = results.into_iter().flatten().collect();

    assemble(&a, &plan, rows, Unit::dimensionless())
}

/// Rayleigh-statistic spectrogram
pub fn rayleigh_spectrogram(series: &TimeSeries, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
    let mut config = config.clone();
    config.spectral.method = Method::Plugin("rayleigh".into());
    spectrogram(series, stride, &config)
}

/// One complex amplitude spectrum per `stride` seconds
pub fn fftgram(series: &TimeSeries, stride: f64) -> Result<Spectrogram<Complex64>> {
    series.require_samples("fftgram")?;
    let fs = series.sample_rate();
    let nstride = seconds_to_samples(stride, fs)?;
    if nstride == 0 || nstride > series.len() {
        return Err(SpectralError::InvalidSegmentation(format!(
            "fftgram stride ({nstride} samples) must be between one sample and the series length"
        )));
    }
    let plan = SegmentPlan::new(series.len(), nstride, 0)?;
    let mut transform = SegmentTransform::new(vec![1.0; nstride], Detrend::None, Normalization::Amplitude, fs);
    let mut rows = Array2::zeros((plan.count(), transform.num_bins()));
    for (mut row, range) in rows.outer_iter_mut().zip(plan.ranges()) {
        let spectrum = transform.amplitude(&series.data()[range])?;
        row.assign(&ArrayView1::from(spectrum));
    }

    Ok(Spectrogram::from_array(rows, series.epoch(), nstride as f64 / fs, fs / nstride as f64)
        .with_unit(series.unit().clone())
        .with_channel(series.channel())
        .with_name(series.name().map(str::to_string)))
}

impl TimeSeries {
    /// See [`spectrogram`]
    pub fn spectrogram(&self, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
        spectrogram(self, stride, config)
    }

    /// See [`spectrogram2`]
    pub fn spectrogram2(&self, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
        spectrogram2(self, stride, config)
    }

    /// See [`csd_spectrogram`]
    pub fn csd_spectrogram(
        &self,
        other: &TimeSeries,
        stride: f64,
        config: &SpectrogramConfig,
    ) -> Result<Spectrogram<Complex64>> {
        csd_spectrogram(self, other, stride, config)
    }

    /// See [`coherence_spectrogram`]
    pub fn coherence_spectrogram(
        &self,
        other: &TimeSeries,
        stride: f64,
        config: &SpectrogramConfig,
    ) -> Result<Spectrogram<f64>> {
        coherence_spectrogram(self, other, stride, config)
    }

    /// See [`rayleigh_spectrogram`]
    pub fn rayleigh_spectrogram(&self, stride: f64, config: &SpectrogramConfig) -> Result<Spectrogram<f64>> {
        rayleigh_spectrogram(self, stride, config)
    }

    /// See [`fftgram`]
    pub fn fftgram(&self, stride: f64) -> Result<Spectrogram<Complex64>> {
        fftgram(self, stride)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::{self, SpectralWarning};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Distribution, Normal};

    fn noise(seed: u64, n: usize, rate: f64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let data = (0..n).map(|_| normal.sample(&mut rng)).collect();
        TimeSeries::new(data, rate).with_epoch(1_000_000_000.0)
    }

    fn init_logging() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Warn)
            .try_init();
    }

    fn config(fftlength: f64, overlap: f64) -> SpectrogramConfig {
        SpectrogramConfig::new(SpectralConfig::new().fftlength(fftlength).overlap(overlap))
    }

    #[test]
    fn test_shape_and_axes() {
        let ts = noise(0, 16384 * 4 + 100, 16384.0);
        let gram = ts.spectrogram(1.0, &config(0.25, 0.125)).unwrap();
        assert_eq!(gram.shape(), (4, 4096 / 2 + 1));
        assert_eq!(gram.dt(), 1.0);
        assert_eq!(gram.df(), 4.0);
        assert_eq!(gram.epoch(), 1_000_000_000.0);
        assert_eq!(gram.times()[3], 1_000_000_003.0);
    }

    #[test]
    fn test_first_row_matches_psd_of_first_block() {
        let ts = noise(1, 4096 * 3, 4096.0);
        let cfg = config(0.25, 0.125);
        let gram = ts.spectrogram(1.0, &cfg).unwrap();
        let head = ts.slice(0, 4096).unwrap();
        let psd = head.psd(&cfg.spectral).unwrap();
        assert_eq!(gram.row(0).unwrap().to_vec(), psd.data().to_vec());
        assert_eq!(gram.unit(), psd.unit());
    }

    #[test]
    fn test_fftlength_defaults_to_stride() {
        let ts = noise(2, 2048, 1024.0);
        let gram = ts.spectrogram(0.5, &SpectrogramConfig::default()).unwrap();
        assert_eq!(gram.shape(), (4, 257));
    }

    #[test]
    fn test_parallel_matches_serial() {
        let ts = noise(3, 1024 * 10, 1024.0);
        for method in [Method::Welch, Method::Median, Method::MedianMean] {
            let mut cfg = config(0.25, 0.125);
            cfg.spectral.method = method;
            let serial = ts.spectrogram(0.5, &cfg).unwrap();
            let parallel = ts.spectrogram(0.5, &cfg.clone().nproc(4)).unwrap();
            assert_eq!(serial, parallel);
            assert_eq!(serial.shape().0, 20);
        }
    }

    #[test]
    fn test_dense_mode_matches_per_block() {
        let ts = noise(4, 1024 * 8, 1024.0);
        let cases = [
            (config(0.25, 0.125), 0.5),
            (config(0.25, 0.0), 1.0),
            (config(0.5, 0.25).block_length(1.0), 0.5),
        ];
        for (cfg, stride) in cases {
            let gram = ts.spectrogram(stride, &cfg).unwrap();
            let dense = ts.spectrogram2(stride, &cfg).unwrap();
            assert_eq!(gram, dense);
        }
    }

    #[test]
    fn test_dense_mode_median_matches_per_block() {
        let ts = noise(5, 1024 * 6, 1024.0);
        let mut cfg = config(0.125, 0.0625).block_length(1.0);
        cfg.spectral.method = Method::Median;
        let gram = ts.spectrogram(0.25, &cfg).unwrap();
        let dense = ts.spectrogram2(0.25, &cfg).unwrap();
        assert_eq!(gram.shape(), (21, 65));
        assert_eq!(gram, dense);
    }

    #[test]
    fn test_dense_mode_alignment_error() {
        let ts = noise(6, 1024 * 4, 1024.0);
        // Segment stride 0.2 s does not divide the 0.5 s block stride
        let cfg = config(0.3, 0.1);
        assert!(ts.spectrogram(0.5, &cfg).is_ok());
        assert!(matches!(ts.spectrogram2(0.5, &cfg), Err(SpectralError::Alignment(_))));
    }

    #[test]
    fn test_invalid_layouts() {
        let ts = noise(7, 1024, 1024.0);
        assert!(matches!(
            ts.spectrogram(2.0, &SpectrogramConfig::default()),
            Err(SpectralError::InvalidSegmentation(_))
        ));
        assert!(matches!(
            ts.spectrogram(0.25, &config(0.5, 0.0)),
            Err(SpectralError::InvalidSegmentation(_))
        ));
        assert!(matches!(
            ts.spectrogram(0.5, &config(0.25, 0.25)),
            Err(SpectralError::InvalidSegmentation(_))
        ));
    }

    #[test]
    fn test_unknown_method_fails_before_dispatch() {
        let ts = noise(8, 2048, 1024.0);
        let mut cfg = config(0.25, 0.0).nproc(2);
        cfg.spectral.method = Method::Plugin("nonexistent".into());
        assert!(matches!(ts.spectrogram(0.5, &cfg), Err(SpectralError::UnknownMethod(_))));
    }

    #[test]
    fn test_csd_spectrogram_of_self() {
        let ts = noise(9, 4096, 1024.0);
        let cfg = config(0.25, 0.125);
        let auto = ts.spectrogram(1.0, &cfg).unwrap();
        let cross = ts.csd_spectrogram(&ts, 1.0, &cfg.clone().nproc(2)).unwrap();
        assert_eq!(cross.shape(), auto.shape());
        assert_eq!(cross.unit(), auto.unit());
        for (c, p) in cross.data().iter().zip(auto.data().iter()) {
            assert_eq!(c.re, *p);
            assert_eq!(c.im, 0.0);
        }
    }

    #[test]
    fn test_csd_spectrogram_warns_once_for_median() {
        init_logging();
        let ts = noise(10, 4096, 1024.0);
        let mut cfg = config(0.25, 0.125).nproc(4);
        cfg.spectral.method = Method::Median;
        let (result, captured) = warnings::capture(|| ts.csd_spectrogram(&ts, 0.5, &cfg));
        assert!(result.is_ok());
        assert_eq!(
            captured,
            vec![SpectralWarning::NonLinearCrossAverage {
                method: "median".into()
            }]
        );
    }

    #[test]
    fn test_coherence_spectrogram_of_shared_line() {
        let fs = 1024.0;
        let mut a = noise(12, 1024 * 8, fs);
        let mut b = noise(13, 1024 * 8, fs);
        for series in [&mut a, &mut b] {
            for (i, x) in series.data_mut().iter_mut().enumerate() {
                *x += 2.0 * (2.0 * std::f64::consts::PI * 64.0 * i as f64 / fs).sin();
            }
        }
        let cfg = config(0.25, 0.125);
        let gram = a.coherence_spectrogram(&b, 2.0, &cfg).unwrap();
        assert_eq!(gram.shape(), (4, 129));
        assert_eq!(gram.df(), 4.0);
        assert_eq!(gram.dt(), 2.0);
        assert!(gram.unit().is_dimensionless());
        for row in gram.data().outer_iter() {
            assert!(row[16] > 0.9);
            let mean = row.slice(s![30..120]).sum() / 90.0;
            assert!(mean < 0.3);
        }

        let parallel = a.coherence_spectrogram(&b, 2.0, &cfg.clone().nproc(3)).unwrap();
        assert_eq!(parallel, gram);
    }

    #[test]
    fn test_coherence_spectrogram_of_self() {
        let ts = noise(14, 4096, 1024.0);
        let mut cfg = config(0.25, 0.125);
        cfg.spectral.method = Method::Median;
        let gram = ts.coherence_spectrogram(&ts, 1.0, &cfg).unwrap();
        for row in gram.data().outer_iter() {
            assert!(row.iter().skip(1).take(100).all(|c| (c - 1.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_rayleigh_spectrogram_unit() {
        let ts = noise(11, 4096, 1024.0);
        let gram = ts.rayleigh_spectrogram(1.0, &config(0.125, 0.0)).unwrap();
        assert!(gram.unit().is_dimensionless());
        assert_eq!(gram.shape(), (4, 65));
    }

    #[test]
    fn test_fftgram() {
        let ts = noise(12, 1000, 100.0);
        let gram = ts.fftgram(2.0).unwrap();
        assert_eq!(gram.shape(), (5, 101));
        assert_eq!(gram.dt(), 2.0);
        assert_eq!(gram.df(), 0.5);
        let head = ts.slice(0, 200).unwrap().fft(None).unwrap();
        assert_eq!(gram.row(0).unwrap().to_vec(), head.data().to_vec());
    }

    #[test]
    fn test_config_json_round_trip() {
        let cfg = config(4.0, 2.0).block_length(8.0).nproc(3);
        let json = serde_json::to_string(&cfg).unwrap();
        let back: SpectrogramConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }
}
