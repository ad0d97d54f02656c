//! Spectral variance: how often each frequency sits at each amplitude
//!
//! A spectrogram is reduced to its amplitude spectral density and every
//! frequency column is histogrammed over a shared set of amplitude bins.

use super::spectrogram::{spectrogram, SpectrogramConfig};
use crate::error::{Result, SpectralError};
use crate::series::{SpectralVariance, Spectrogram, TimeSeries};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Amplitude binning options
///
/// Explicit `bins` (edges, including the rightmost) win over
/// `low`/`high`/`nbins`/`log`. Open `low`/`high` bounds default to the
/// smallest and largest finite values in the data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceConfig {
    pub bins: Option<Vec<f64>>,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub nbins: usize,
    /// Logarithmically spaced bins
    pub log: bool,
    /// Normalise each frequency's counts to a unit sum
    pub norm: bool,
    /// Normalise each frequency's counts to a unit integral
    pub density: bool,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            bins: None,
            low: None,
            high: None,
            nbins: 500,
            log: false,
            norm: false,
            density: false,
        }
    }
}

impl VarianceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bins(mut self, edges: Vec<f64>) -> Self {
        self.bins = Some(edges);
        self
    }

    pub fn range(mut self, low: f64, high: f64) -> Self {
        self.low = Some(low);
        self.high = Some(high);
        self
    }

    pub fn nbins(mut self, nbins: usize) -> Self {
        self.nbins = nbins;
        self
    }

    pub fn log(mut self, log: bool) -> Self {
        self.log = log;
        self
    }

    pub fn norm(mut self, norm: bool) -> Self {
        self.norm = norm;
        self
    }

    pub fn density(mut self, density: bool) -> Self {
        self.density = density;
        self
    }

    fn edges(&self, values: &Array2<f64>) -> Result<Vec<f64>> {
        if let Some(edges) = &self.bins {
            if edges.len() < 2 || edges.windows(2).any(|pair| pair[1] <= pair[0]) {
                return Err(SpectralError::InvalidArgument(
                    "histogram bins must be at least two strictly increasing edges".into(),
                ));
            }
            return Ok(edges.clone());
        }
        if self.nbins == 0 {
            return Err(SpectralError::InvalidArgument("nbins must be positive".into()));
        }

        let finite = values.iter().copied().filter(|v| v.is_finite());
        let (data_low, data_high) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let mut low = self.low.unwrap_or(data_low);
        let mut high = self.high.unwrap_or(data_high);
        if !(low.is_finite() && high.is_finite()) {
            return Err(SpectralError::InvalidArgument(
                "no finite amplitudes to derive histogram bounds from".into(),
            ));
        }
        if high < low {
            return Err(SpectralError::InvalidArgument(format!(
                "histogram upper bound {high} is below lower bound {low}"
            )));
        }

        let n = self.nbins;
        if self.log {
            if low <= 0.0 || high <= low {
                return Err(SpectralError::InvalidArgument(format!(
                    "logarithmic bins need 0 < low < high, got [{low}, {high}]"
                )));
            }
            let (a, b) = (low.log10(), high.log10());
            let mut edges: Vec<f64> = (0..=n).map(|i| 10f64.powf(a + (b - a) * i as f64 / n as f64)).collect();
            edges[0] = low;
            edges[n] = high;
            return Ok(edges);
        }
        if high == low {
            low -= 0.5;
            high += 0.5;
        }
        let mut edges: Vec<f64> = (0..=n).map(|i| low + (high - low) * i as f64 / n as f64).collect();
        edges[n] = high;
        Ok(edges)
    }
}

/// Bin index of `value`, or `None` outside `[edges[0], edges[last]]`
fn bin_of(edges: &[f64], value: f64) -> Option<usize> {
    let last = edges.len() - 1;
    if !(value >= edges[0] && value <= edges[last]) {
        return None;
    }
    if value == edges[last] {
        return Some(last - 1);
    }
    Some(edges.partition_point(|edge| *edge <= value) - 1)
}

impl Spectrogram<f64> {
    /// Histogram every frequency column of this spectrogram
    pub fn variance(&self, config: &VarianceConfig) -> Result<SpectralVariance> {
        let edges = config.edges(self.data())?;
        let nbins = edges.len() - 1;
        let (_, nfreqs) = self.shape();
        let mut counts = Array2::zeros((nfreqs, nbins));

        for (column, mut histogram) in self.data().columns().into_iter().zip(counts.outer_iter_mut()) {
            for value in column.iter() {
                if let Some(bin) = bin_of(&edges, *value) {
                    histogram[bin] += 1.0;
                }
            }
            let total = histogram.sum();
            if total == 0.0 {
                continue;
            }
            if config.density {
                for (count, pair) in histogram.iter_mut().zip(edges.windows(2)) {
                    *count /= total * (pair[1] - pair[0]);
                }
            } else if config.norm {
                histogram.mapv_inplace(|count| count / total);
            }
        }
        log::debug!("spectral variance: {nfreqs} frequencies x {nbins} amplitude bins");

        Ok(SpectralVariance::new(counts, edges, self.f0(), self.df())
            .with_epoch(self.epoch())
            .with_unit(self.unit().clone())
            .with_channel(self.channel())
            .with_name(self.name().map(str::to_string)))
    }
}

/// Amplitude histogram of an ASD spectrogram with one row per `stride`
pub fn spectral_variance(
    series: &TimeSeries,
    stride: f64,
    config: &SpectrogramConfig,
    bins: &VarianceConfig,
) -> Result<SpectralVariance> {
    let power = spectrogram(series, stride, config)?;
    let amplitude = power.map(power.unit().sqrt(), |p| p.sqrt());
    amplitude.variance(bins)
}

impl TimeSeries {
    /// See [`spectral_variance`]
    pub fn spectral_variance(
        &self,
        stride: f64,
        config: &SpectrogramConfig,
        bins: &VarianceConfig,
    ) -> Result<SpectralVariance> {
        spectral_variance(self, stride, config, bins)
    }
}
