//! Frequency-amplitude histograms

use super::channel::ChannelId;
use super::units::Unit;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Per-frequency histogram of spectral amplitudes
///
/// Row `k` holds the counts for frequency `f0 + k * df`; column `j`
/// covers amplitudes in `[bins[j], bins[j + 1])`, the last bin closed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpectralVariance {
    counts: Array2<f64>,
    bins: Vec<f64>,
    f0: f64,
    df: f64,
    epoch: f64,
    /// Unit of the binned amplitudes
    unit: Unit,
    channel: Option<ChannelId>,
    name: Option<String>,
}

impl SpectralVariance {
    pub(crate) fn new(counts: Array2<f64>, bins: Vec<f64>, f0: f64, df: f64) -> Self {
        Self {
            counts,
            bins,
            f0,
            df,
            epoch: 0.0,
            unit: Unit::dimensionless(),
            channel: None,
            name: None,
        }
    }

    pub fn with_epoch(mut self, epoch: f64) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_channel(mut self, channel: Option<ChannelId>) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn counts(&self) -> &Array2<f64> {
        &self.counts
    }

    /// Amplitude bin edges, one more than the number of bins
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Histogram of one frequency bin
    pub fn histogram(&self, frequency_index: usize) -> Option<ArrayView1<'_, f64>> {
        (frequency_index < self.counts.nrows()).then(|| self.counts.row(frequency_index))
    }

    /// `(frequency bins, amplitude bins)`
    pub fn shape(&self) -> (usize, usize) {
        self.counts.dim()
    }

    pub fn f0(&self) -> f64 {
        self.f0
    }

    pub fn df(&self) -> f64 {
        self.df
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.counts.nrows())
            .map(|k| self.f0 + k as f64 * self.df)
            .collect()
    }
}
