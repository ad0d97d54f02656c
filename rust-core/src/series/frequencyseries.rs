//! Frequency-domain data on a uniform frequency grid

use super::channel::ChannelId;
use super::units::Unit;
use serde::{Deserialize, Serialize};

/// Samples at frequencies `f0 + k * df`
///
/// Real (`f64`) for power/amplitude spectra, complex for cross-spectra
/// and raw transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencySeries<T> {
    data: Vec<T>,
    f0: f64,
    df: f64,
    epoch: f64,
    unit: Unit,
    channel: Option<ChannelId>,
    name: Option<String>,
}

impl<T> FrequencySeries<T> {
    pub fn new(data: Vec<T>, f0: f64, df: f64) -> Self {
        Self {
            data,
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

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
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
        (0..self.data.len())
            .map(|k| self.f0 + k as f64 * self.df)
            .collect()
    }

    /// Apply `f` to every sample, keeping the axis and metadata
    pub fn map<U>(&self, unit: Unit, f: impl Fn(&T) -> U) -> FrequencySeries<U> {
        FrequencySeries {
            data: self.data.iter().map(f).collect(),
            f0: self.f0,
            df: self.df,
            epoch: self.epoch,
            unit,
            channel: self.channel,
            name: self.name.clone(),
        }
    }
}

impl FrequencySeries<f64> {
    /// Element-wise square root, e.g. PSD to ASD
    pub fn sqrt(&self) -> FrequencySeries<f64> {
        self.map(self.unit.sqrt(), |x| x.sqrt())
    }

    /// Value at the bin nearest `frequency`
    pub fn value_at(&self, frequency: f64) -> Option<f64> {
        let k = ((frequency - self.f0) / self.df).round();
        if k < 0.0 {
            return None;
        }
        self.data.get(k as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_axis() {
        let fs = FrequencySeries::new(vec![1.0, 4.0, 9.0], 0.0, 0.5).with_unit(Unit::named("m"));
        assert_eq!(fs.frequencies(), vec![0.0, 0.5, 1.0]);
        assert_eq!(fs.value_at(0.9), Some(9.0));
        assert_eq!(fs.value_at(7.0), None);
    }

    #[test]
    fn test_sqrt_halves_unit_power() {
        let psd = FrequencySeries::new(vec![4.0, 16.0], 0.0, 1.0)
            .with_unit(Unit::named("m").power_density());
        let asd = psd.sqrt();
        assert_eq!(asd.data(), &[2.0, 4.0]);
        assert_eq!(asd.unit(), &Unit::named("m").power_density().sqrt());
    }
}
