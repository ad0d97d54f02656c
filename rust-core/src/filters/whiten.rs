//! Spectral whitening by inverse-ASD filtering
//!
//! The series is cut into overlapping tapered segments; each segment is
//! divided by the amplitude spectral density in the frequency domain and
//! the results are overlap-added. With a periodic Hann taper at 50 %
//! overlap the tapers sum to one, so stationary Gaussian noise comes out
//! with zero mean and unit variance while transients keep their timing.

use crate::error::{Result, SpectralError};
use crate::series::{FrequencySeries, TimeSeries, Unit};
use crate::spectrum::averaging::Method;
use crate::spectrum::fft::{FftEngine, Scaling};
use crate::spectrum::segment::{seconds_to_samples, SegmentPlan};
use crate::spectrum::windowing::{apply_window_inplace, detrend_in_place, Detrend, Window};
use crate::spectrum::{asd, SpectralConfig};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitenConfig {
    /// Segment duration in seconds
    pub fftlength: f64,
    /// Segment overlap in seconds (default: half a segment)
    pub overlap: Option<f64>,
    /// Averaging method for the ASD estimate (default: Welch)
    pub method: Method,
    pub window: Window,
    pub detrend: Detrend,
}

impl Default for WhitenConfig {
    fn default() -> Self {
        Self {
            fftlength: 2.0,
            overlap: None,
            method: Method::Welch,
            window: Window::default(),
            detrend: Detrend::Constant,
        }
    }
}

impl WhitenConfig {
    pub fn new(fftlength: f64, overlap: f64) -> Self {
        Self {
            fftlength,
            overlap: Some(overlap),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn detrend(mut self, detrend: Detrend) -> Self {
        self.detrend = detrend;
        self
    }

    fn overlap_seconds(&self) -> f64 {
        self.overlap.unwrap_or(self.fftlength / 2.0)
    }

    fn spectral(&self) -> SpectralConfig {
        SpectralConfig::new()
            .fftlength(self.fftlength)
            .overlap(self.overlap_seconds())
            .method(self.method.clone())
            .window(self.window.clone())
            .scaling(Scaling::Density)
            .detrend(self.detrend)
    }
}

/// Whiten against this series' own ASD
pub fn whiten(series: &TimeSeries, config: &WhitenConfig) -> Result<TimeSeries> {
    series.require_samples("whiten")?;
    let spectrum = asd(series, &config.spectral())?;
    whiten_with_asd(series, &spectrum, config)
}

/// Whiten against a precomputed ASD with `fftlength / 2 + 1` bins
///
/// Bins at DC, Nyquist, or with a non-positive ASD are zeroed. Samples
/// not covered by any segment are left at zero.
pub fn whiten_with_asd(
    series: &TimeSeries,
    spectrum: &FrequencySeries<f64>,
    config: &WhitenConfig,
) -> Result<TimeSeries> {
    series.require_samples("whiten")?;
    let fs = series.sample_rate();
    let nfft = seconds_to_samples(config.fftlength, fs)?;
    let noverlap = seconds_to_samples(config.overlap_seconds(), fs)?;
    let plan = SegmentPlan::new(series.len(), nfft, noverlap)?;
    let nbins = nfft / 2 + 1;
    if spectrum.len() != nbins {
        return Err(SpectralError::InvalidArgument(format!(
            "ASD has {} bins but {nfft}-sample segments need {nbins}",
            spectrum.len()
        )));
    }

    let norm = (2.0 / fs).sqrt();
    let nyquist = (nfft % 2 == 0).then_some(nfft / 2);
    let inverse: Vec<f64> = spectrum
        .data()
        .iter()
        .enumerate()
        .map(|(bin, amplitude)| {
            if bin == 0 || Some(bin) == nyquist || !(amplitude.is_finite() && *amplitude > 0.0) {
                0.0
            } else {
                norm / amplitude
            }
        })
        .collect();

    let window = config.window.coefficients(nfft)?;
    let mut engine = FftEngine::new(nfft);
    let mut segment = vec![0.0; nfft];
    let mut output = vec![0.0; series.len()];
    log::debug!("whitening {} segments of {nfft} samples", plan.count());

    for range in plan.ranges() {
        segment.copy_from_slice(&series.data()[range.clone()]);
        detrend_in_place(&mut segment, config.detrend);
        apply_window_inplace(&mut segment, &window);
        let filtered: Vec<Complex64> = engine
            .transform(&segment)?
            .iter()
            .zip(inverse.iter())
            .map(|(x, w)| x * w)
            .collect();
        let whitened = engine.inverse(&filtered)?;
        for (out, value) in output[range].iter_mut().zip(whitened.iter()) {
            *out += value / nfft as f64;
        }
    }

    let mut out = series.with_data(output);
    out.set_unit(Unit::dimensionless());
    Ok(out)
}

impl TimeSeries {
    /// See [`whiten`]
    pub fn whiten(&self, config: &WhitenConfig) -> Result<TimeSeries> {
        whiten(self, config)
    }
}
