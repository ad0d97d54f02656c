//! Averaged spectral estimates of a single time series or a pair
//!
//! Every estimate follows the same pipeline: plan segments, detrend and
//! taper each one, transform, normalise, then reduce with the selected
//! averaging method.

use super::averaging::{mean_cross, Average, Method};
use super::fft::{Normalization, Scaling, SegmentTransform};
use super::segment::{seconds_to_samples, SegmentPlan};
use super::windowing::{window_correction_factor, Detrend, Window};
use crate::error::{Result, SpectralError};
use crate::filters::windows::WindowType;
use crate::series::{FrequencySeries, TimeSeries, Unit};
use crate::warnings::{self, SpectralWarning};
use ndarray::{Array2, ArrayView1};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Spectral estimator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// Segment duration in seconds (default: the whole series)
    pub fftlength: Option<f64>,

    /// Overlap between segments in seconds (default: none)
    pub overlap: Option<f64>,

    /// Averaging method
    pub method: Method,

    /// Segment taper (default: periodic Hann)
    pub window: Window,

    pub scaling: Scaling,

    pub detrend: Detrend,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            fftlength: None,
            overlap: None,
            method: Method::Welch,
            window: Window::default(),
            scaling: Scaling::Density,
            detrend: Detrend::Constant,
        }
    }
}

impl SpectralConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fftlength(mut self, seconds: f64) -> Self {
        self.fftlength = Some(seconds);
        self
    }

    pub fn overlap(mut self, seconds: f64) -> Self {
        self.overlap = Some(seconds);
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn window(mut self, window: impl Into<Window>) -> Self {
        self.window = window.into();
        self
    }

    pub fn scaling(mut self, scaling: Scaling) -> Self {
        self.scaling = scaling;
        self
    }

    pub fn detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }

    /// Configuration from keyword-style options; the method is given by
    /// name and an absent window keeps the Hann default
    pub fn from_options(
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<WindowType>,
    ) -> Result<Self> {
        let mut config = Self::new().method(method.parse()?);
        config.fftlength = fftlength;
        config.overlap = overlap;
        if let Some(window) = window {
            config.window = Window::Named(window);
        }
        Ok(config)
    }

    /// Segment length and overlap in samples for a series of `samples`
    pub(crate) fn geometry(&self, samples: usize, sample_rate: f64) -> Result<Geometry> {
        let nfft = match self.fftlength {
            Some(seconds) => seconds_to_samples(seconds, sample_rate)?,
            None => samples,
        };
        let noverlap = match self.overlap {
            _ if self.method.forces_zero_overlap() => 0,
            Some(seconds) => seconds_to_samples(seconds, sample_rate)?,
            None => 0,
        };
        Ok(Geometry { nfft, noverlap })
    }
}

/// Segment geometry in samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Geometry {
    pub nfft: usize,
    pub noverlap: usize,
}

impl Geometry {
    pub fn stride(&self) -> usize {
        self.nfft.saturating_sub(self.noverlap)
    }

    pub fn nbins(&self) -> usize {
        self.nfft / 2 + 1
    }
}

/// Unit of a power estimate of data in `unit`
pub(crate) fn power_unit(unit: &Unit, scaling: Scaling) -> Unit {
    match scaling {
        Scaling::Density => unit.power_density(),
        Scaling::Spectrum => unit * unit,
    }
}

/// Auto-power estimator bound to one segment geometry
///
/// Holds its own FFT plan and buffers; workers each build their own.
pub(crate) struct PowerEstimator {
    pub(crate) transform: SegmentTransform,
    pub(crate) average: Average,
    geometry: Geometry,
}

impl PowerEstimator {
    pub fn new(config: &SpectralConfig, geometry: Geometry, sample_rate: f64) -> Result<Self> {
        let average = config.method.resolve()?;
        if geometry.nfft == 0 {
            return Err(SpectralError::InvalidSegmentation(
                "fftlength must be at least one sample".into(),
            ));
        }
        let window = config.window.coefficients(geometry.nfft)?;
        let transform = SegmentTransform::new(
            window,
            config.detrend,
            Normalization::Power(config.scaling),
            sample_rate,
        );
        Ok(Self {
            transform,
            average,
            geometry,
        })
    }

    /// `(segments, bins)` array of scaled segment powers
    pub fn segment_powers(&mut self, data: &[f64]) -> Result<Array2<f64>> {
        let plan = SegmentPlan::new(data.len(), self.geometry.nfft, self.geometry.noverlap)?;
        log::debug!(
            "estimating power over {} segments of {} samples (stride {})",
            plan.count(),
            plan.length(),
            plan.stride()
        );
        let mut powers = Array2::zeros((plan.count(), self.transform.num_bins()));
        for (mut row, range) in powers.outer_iter_mut().zip(plan.ranges()) {
            let power = self.transform.power(&data[range])?;
            row.assign(&ArrayView1::from(power));
        }
        Ok(powers)
    }

    pub fn estimate(&mut self, data: &[f64]) -> Result<Vec<f64>> {
        let powers = self.segment_powers(data)?;
        self.average.combine(powers.view())
    }
}

/// Cross-power estimator (always mean-averaged)
pub(crate) struct CrossEstimator {
    transform: SegmentTransform,
    geometry: Geometry,
}

impl CrossEstimator {
    pub fn new(config: &SpectralConfig, geometry: Geometry, sample_rate: f64) -> Result<Self> {
        if geometry.nfft == 0 {
            return Err(SpectralError::InvalidSegmentation(
                "fftlength must be at least one sample".into(),
            ));
        }
        let window = config.window.coefficients(geometry.nfft)?;
        let transform = SegmentTransform::new(
            window,
            config.detrend,
            Normalization::Power(config.scaling),
            sample_rate,
        );
        Ok(Self { transform, geometry })
    }

    pub fn estimate(&mut self, a: &[f64], b: &[f64]) -> Result<Vec<Complex64>> {
        let plan = SegmentPlan::new(a.len(), self.geometry.nfft, self.geometry.noverlap)?;
        let mut cross = Array2::zeros((plan.count(), self.transform.num_bins()));
        for (mut row, range) in cross.outer_iter_mut().zip(plan.ranges()) {
            let values = self.transform.cross(&a[range.clone()], &b[range])?;
            row.assign(&ArrayView1::from(values));
        }
        mean_cross(cross.view())
    }
}

/// Warn (on the calling thread) when a cross-spectrum asks for
/// non-linear averaging; the estimate proceeds with the mean.
pub(crate) fn check_cross_method(method: &Method) -> Result<()> {
    method.resolve()?;
    if !method.is_linear() {
        warnings::emit(SpectralWarning::NonLinearCrossAverage {
            method: method.to_string(),
        });
    }
    Ok(())
}

pub(crate) fn check_pair(a: &TimeSeries, b: &TimeSeries) -> Result<()> {
    a.require_samples("cross spectral density")?;
    b.require_samples("cross spectral density")?;
    if a.len() != b.len() {
        return Err(SpectralError::InvalidArgument(format!(
            "cross-spectral inputs differ in length ({} vs {} samples)",
            a.len(),
            b.len()
        )));
    }
    if a.sample_rate() != b.sample_rate() {
        return Err(SpectralError::InvalidArgument(format!(
            "cross-spectral inputs differ in sample rate ({} vs {} Hz)",
            a.sample_rate(),
            b.sample_rate()
        )));
    }
    Ok(())
}

/// Power spectral density (or power spectrum, per `config.scaling`)
pub fn psd(series: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
    series.require_samples("psd")?;
    let fs = series.sample_rate();
    let geometry = config.geometry(series.len(), fs)?;
    let mut estimator = PowerEstimator::new(config, geometry, fs)?;
    let values = estimator.estimate(series.data())?;
    let unit = estimator
        .average
        .output_unit(&power_unit(series.unit(), config.scaling));

    Ok(FrequencySeries::new(values, 0.0, fs / geometry.nfft as f64)
        .with_epoch(series.epoch())
        .with_unit(unit)
        .with_channel(series.channel())
        .with_name(series.name().map(str::to_string)))
}

/// Amplitude spectral density, `sqrt(psd)`
pub fn asd(series: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
    Ok(psd(series, config)?.sqrt())
}

/// Complex cross-spectral density `conj(A) · B`
///
/// Non-linear methods warn and fall back to Welch averaging. For
/// `csd(x, x)` the real part equals `psd(x)` exactly.
pub fn csd(a: &TimeSeries, b: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<Complex64>> {
    check_pair(a, b)?;
    check_cross_method(&config.method)?;
    let fs = a.sample_rate();
    let geometry = config.geometry(a.len(), fs)?;
    let mut estimator = CrossEstimator::new(config, geometry, fs)?;
    let values = estimator.estimate(a.data(), b.data())?;
    let unit = match config.scaling {
        Scaling::Density => &(a.unit() * b.unit()) / &Unit::hertz(),
        Scaling::Spectrum => a.unit() * b.unit(),
    };

    Ok(FrequencySeries::new(values, 0.0, fs / geometry.nfft as f64)
        .with_epoch(a.epoch())
        .with_unit(unit)
        .with_channel(a.channel())
        .with_name(a.name().map(str::to_string)))
}

/// One-sided amplitude spectrum of `nfft` points (default: whole series)
///
/// Equivalent to a single zero-overlap segment with a rectangular window
/// and no detrending, normalised by `1/nfft` with non-DC bins doubled.
/// Shorter series are zero-padded, longer ones truncated.
pub fn fft(series: &TimeSeries, nfft: Option<usize>) -> Result<FrequencySeries<Complex64>> {
    series.require_samples("fft")?;
    let nfft = nfft.unwrap_or(series.len());
    if nfft == 0 {
        return Err(SpectralError::InvalidArgument("nfft must be positive".into()));
    }
    let fs = series.sample_rate();
    let mut segment = vec![0.0; nfft];
    let copy_len = nfft.min(series.len());
    segment[..copy_len].copy_from_slice(&series.data()[..copy_len]);

    let mut transform = SegmentTransform::new(vec![1.0; nfft], Detrend::None, Normalization::Amplitude, fs);
    let values = transform.amplitude(&segment)?.to_vec();

    Ok(FrequencySeries::new(values, 0.0, fs / nfft as f64)
        .with_epoch(series.epoch())
        .with_unit(series.unit().clone())
        .with_channel(series.channel())
        .with_name(series.name().map(str::to_string)))
}

/// Mean of per-segment amplitude spectra
///
/// Each segment is mean-subtracted and tapered, then the transform is
/// corrected by `1/mean(|w|)`. The default window is rectangular.
pub fn average_fft(
    series: &TimeSeries,
    fftlength: Option<f64>,
    overlap: Option<f64>,
    window: Option<&Window>,
) -> Result<FrequencySeries<Complex64>> {
    series.require_samples("average_fft")?;
    let fs = series.sample_rate();
    let config = SpectralConfig {
        fftlength,
        overlap,
        window: window.cloned().unwrap_or(Window::Named(WindowType::Rectangular)),
        ..SpectralConfig::default()
    };
    let geometry = config.geometry(series.len(), fs)?;
    let plan = SegmentPlan::new(series.len(), geometry.nfft, geometry.noverlap)?;
    let coefficients = config.window.coefficients(geometry.nfft)?;
    let abs_window: Vec<f64> = coefficients.iter().map(|w| w.abs()).collect();
    let correction = window_correction_factor(&abs_window);

    let mut transform = SegmentTransform::new(coefficients, Detrend::Constant, Normalization::Amplitude, fs);
    let mut segments = Array2::zeros((plan.count(), transform.num_bins()));
    for (mut row, range) in segments.outer_iter_mut().zip(plan.ranges()) {
        let spectrum = transform.amplitude(&series.data()[range])?;
        row.assign(&ArrayView1::from(spectrum));
    }
    let mut values = mean_cross(segments.view())?;
    values.iter_mut().for_each(|v| *v *= correction);

    Ok(FrequencySeries::new(values, 0.0, fs / geometry.nfft as f64)
        .with_epoch(series.epoch())
        .with_unit(series.unit().clone())
        .with_channel(series.channel())
        .with_name(series.name().map(str::to_string)))
}

/// Resample the faster series to the slower rate and trim both to a common length
pub(crate) fn align_rates(a: &TimeSeries, b: &TimeSeries) -> Result<(TimeSeries, TimeSeries)> {
    a.check_sample_rate()?;
    b.check_sample_rate()?;
    let (a, b) = match a.sample_rate().partial_cmp(&b.sample_rate()) {
        Some(std::cmp::Ordering::Greater) => (a.resample(b.sample_rate())?, b.clone()),
        Some(std::cmp::Ordering::Less) => (a.clone(), b.resample(a.sample_rate())?),
        _ => (a.clone(), b.clone()),
    };
    let n = a.len().min(b.len());
    Ok((a.slice(0, n)?, b.slice(0, n)?))
}

/// Magnitude-squared coherence `|Pxy|² / (Pxx · Pyy)`
///
/// The higher-rate input is first resampled to the lower rate. All three
/// estimates use Welch averaging.
pub fn coherence(a: &TimeSeries, b: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
    let (a, b) = align_rates(a, b)?;
    let welch = SpectralConfig {
        method: Method::Welch,
        ..config.clone()
    };
    let pxy = csd(&a, &b, &welch)?;
    let pxx = psd(&a, &welch)?;
    let pyy = psd(&b, &welch)?;
    let values: Vec<f64> = pxy
        .data()
        .iter()
        .zip(pxx.data().iter().zip(pyy.data().iter()))
        .map(|(xy, (xx, yy))| xy.norm_sqr() / (xx * yy))
        .collect();

    Ok(FrequencySeries::new(values, 0.0, pxx.df())
        .with_epoch(a.epoch())
        .with_unit(Unit::dimensionless())
        .with_channel(a.channel())
        .with_name(a.name().map(str::to_string)))
}

/// Coherence of a series with itself delayed by `dt` seconds
///
/// The sign of `dt` is ignored. The series is cropped into the first and
/// last `duration - dt` seconds, which are then passed to [`coherence`].
pub fn auto_coherence(series: &TimeSeries, dt: f64, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
    let dt = dt.abs();
    if !dt.is_finite() || dt >= series.duration() {
        return Err(SpectralError::InvalidArgument(format!(
            "time shift ({dt} s) must be shorter than the series ({} s)",
            series.duration()
        )));
    }
    let (start, end) = series.span();
    let early = series.crop(start, end - dt)?;
    let late = series.crop(start + dt, end)?;
    coherence(&early, &late, config)
}

/// Rayleigh statistic spectrum (std/mean of segment powers per bin)
pub fn rayleigh_spectrum(series: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
    let config = SpectralConfig {
        method: Method::Plugin("rayleigh".into()),
        ..config.clone()
    };
    psd(series, &config)
}

impl TimeSeries {
    /// See [`psd`]
    pub fn psd(&self, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
        psd(self, config)
    }

    /// See [`asd`]
    pub fn asd(&self, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
        asd(self, config)
    }

    /// See [`csd`]
    pub fn csd(&self, other: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<Complex64>> {
        csd(self, other, config)
    }

    /// See [`fft`]
    pub fn fft(&self, nfft: Option<usize>) -> Result<FrequencySeries<Complex64>> {
        fft(self, nfft)
    }

    /// See [`average_fft`]
    pub fn average_fft(
        &self,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        window: Option<&Window>,
    ) -> Result<FrequencySeries<Complex64>> {
        average_fft(self, fftlength, overlap, window)
    }

    /// See [`coherence`]
    pub fn coherence(&self, other: &TimeSeries, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
        coherence(self, other, config)
    }

    /// See [`auto_coherence`]
    pub fn auto_coherence(&self, dt: f64, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
        auto_coherence(self, dt, config)
    }

    /// See [`rayleigh_spectrum`]
    pub fn rayleigh_spectrum(&self, config: &SpectralConfig) -> Result<FrequencySeries<f64>> {
        rayleigh_spectrum(self, config)
    }
}
