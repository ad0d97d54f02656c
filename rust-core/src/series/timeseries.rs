//! Uniformly sampled time-domain data

use super::channel::ChannelId;
use super::units::Unit;
use crate::error::{Result, SpectralError};
use serde::{Deserialize, Serialize};

/// Real samples at a fixed rate starting at `epoch` (GPS seconds)
///
/// The sample rate is validated when a transform needs it, so building
/// a series never fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    data: Vec<f64>,
    epoch: f64,
    sample_rate: f64,
    unit: Unit,
    channel: Option<ChannelId>,
    name: Option<String>,
}

impl TimeSeries {
    pub fn new(data: Vec<f64>, sample_rate: f64) -> Self {
        Self {
            data,
            epoch: 0.0,
            sample_rate,
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

    pub fn with_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// New series carrying this one's metadata around different samples
    pub fn with_data(&self, data: Vec<f64>) -> Self {
        Self {
            data,
            epoch: self.epoch,
            sample_rate: self.sample_rate,
            unit: self.unit.clone(),
            channel: self.channel,
            name: self.name.clone(),
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn dt(&self) -> f64 {
        1.0 / self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.sample_rate
    }

    /// Half-open `[start, end)` interval covered by the samples
    pub fn span(&self) -> (f64, f64) {
        (self.epoch, self.epoch + self.duration())
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

    pub(crate) fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    pub(crate) fn set_unit(&mut self, unit: Unit) {
        self.unit = unit;
    }

    /// Sample times
    pub fn times(&self) -> Vec<f64> {
        let dt = self.dt();
        (0..self.data.len())
            .map(|i| self.epoch + i as f64 * dt)
            .collect()
    }

    /// Error unless the sample rate is positive and finite
    pub fn check_sample_rate(&self) -> Result<()> {
        if self.sample_rate.is_finite() && self.sample_rate > 0.0 {
            Ok(())
        } else {
            Err(SpectralError::InvalidArgument(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )))
        }
    }

    pub(crate) fn require_samples(&self, what: &'static str) -> Result<()> {
        self.check_sample_rate()?;
        if self.data.is_empty() {
            return Err(SpectralError::EmptySeries(what));
        }
        Ok(())
    }

    /// Sub-series over sample indices `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start > end || end > self.data.len() {
            return Err(SpectralError::InvalidArgument(format!(
                "slice {start}..{end} out of bounds for {} samples",
                self.data.len()
            )));
        }
        let mut out = self.with_data(self.data[start..end].to_vec());
        out.epoch = self.epoch + start as f64 * self.dt();
        Ok(out)
    }

    /// Sample index nearest to GPS time `t`, clamped to `[0, len]`
    pub fn index_of(&self, t: f64) -> usize {
        let idx = ((t - self.epoch) * self.sample_rate).round();
        if idx <= 0.0 {
            0
        } else {
            (idx as usize).min(self.data.len())
        }
    }

    /// Sub-series covering `[start, end)` in GPS seconds
    pub fn crop(&self, start: f64, end: f64) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        if end < start {
            return Err(SpectralError::InvalidArgument(format!(
                "crop end {end} precedes start {start}"
            )));
        }
        self.slice(self.index_of(start), self.index_of(end))
    }

    /// Append samples that start exactly where this series ends
    pub fn append(&mut self, other: &TimeSeries) -> Result<()> {
        if (other.sample_rate - self.sample_rate).abs() > 1e-9 * self.sample_rate.abs() {
            return Err(SpectralError::InvalidArgument(format!(
                "cannot append {} Hz data to {} Hz data",
                other.sample_rate, self.sample_rate
            )));
        }
        if self.data.is_empty() {
            self.epoch = other.epoch;
        } else {
            let (_, end) = self.span();
            if (other.epoch - end).abs() > 0.5 * self.dt() {
                return Err(SpectralError::InvalidArgument(format!(
                    "cannot append discontiguous data: series ends at {end}, next starts at {}",
                    other.epoch
                )));
            }
        }
        self.data.extend_from_slice(&other.data);
        Ok(())
    }

    pub fn mean(&self) -> Result<f64> {
        if self.data.is_empty() {
            return Err(SpectralError::EmptySeries("mean"));
        }
        Ok(self.data.iter().sum::<f64>() / self.data.len() as f64)
    }

    /// Population standard deviation
    pub fn std(&self) -> Result<f64> {
        let mean = self.mean().map_err(|_| SpectralError::EmptySeries("std"))?;
        let var = self
            .data
            .iter()
            .map(|x| (x - mean) * (x - mean))
            .sum::<f64>()
            / self.data.len() as f64;
        Ok(var.sqrt())
    }

    pub fn max(&self) -> Result<f64> {
        self.data
            .iter()
            .copied()
            .reduce(f64::max)
            .ok_or(SpectralError::EmptySeries("max"))
    }

    pub fn min(&self) -> Result<f64> {
        self.data
            .iter()
            .copied()
            .reduce(f64::min)
            .ok_or(SpectralError::EmptySeries("min"))
    }

    /// Index of the largest sample (first one on ties)
    pub fn argmax(&self) -> Result<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &x) in self.data.iter().enumerate() {
            match best {
                Some((_, b)) if x <= b => {}
                _ => best = Some((i, x)),
            }
        }
        best.map(|(i, _)| i).ok_or(SpectralError::EmptySeries("argmax"))
    }

    /// Root-mean-square over consecutive blocks of `stride` seconds
    pub fn rms(&self, stride: f64) -> Result<TimeSeries> {
        self.require_samples("rms")?;
        let step = (stride * self.sample_rate).round();
        if !(step >= 1.0) {
            return Err(SpectralError::InvalidArgument(format!(
                "rms stride {stride} s is shorter than one sample"
            )));
        }
        let step = step as usize;
        let values: Vec<f64> = self
            .data
            .chunks_exact(step)
            .map(|block| (block.iter().map(|x| x * x).sum::<f64>() / step as f64).sqrt())
            .collect();
        let mut out = self.with_data(values);
        out.sample_rate = self.sample_rate / step as f64;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> TimeSeries {
        TimeSeries::new((0..n).map(|i| i as f64).collect(), 4.0).with_epoch(10.0)
    }

    #[test]
    fn test_metadata() {
        let ts = ramp(8).with_unit(Unit::named("m")).with_name("ramp");
        assert_eq!(ts.len(), 8);
        assert_eq!(ts.dt(), 0.25);
        assert_eq!(ts.duration(), 2.0);
        assert_eq!(ts.span(), (10.0, 12.0));
        assert_eq!(ts.times()[3], 10.75);
        assert_eq!(ts.name(), Some("ramp"));
    }

    #[test]
    fn test_statistics() {
        let ts = ramp(5);
        assert_eq!(ts.mean().unwrap(), 2.0);
        assert!((ts.std().unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
        assert_eq!(ts.max().unwrap(), 4.0);
        assert_eq!(ts.min().unwrap(), 0.0);
        assert_eq!(ts.argmax().unwrap(), 4);
    }

    #[test]
    fn test_empty_statistics_fail() {
        let ts = TimeSeries::new(Vec::new(), 16.0);
        assert!(matches!(ts.mean(), Err(SpectralError::EmptySeries("mean"))));
        assert!(matches!(ts.std(), Err(SpectralError::EmptySeries("std"))));
        assert!(matches!(ts.argmax(), Err(SpectralError::EmptySeries("argmax"))));
        assert!(matches!(ts.max(), Err(SpectralError::EmptySeries(_))));
    }

    #[test]
    fn test_crop_and_slice() {
        let ts = ramp(16);
        let cropped = ts.crop(11.0, 12.5).unwrap();
        assert_eq!(cropped.epoch(), 11.0);
        assert_eq!(cropped.data(), &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert!(ts.slice(4, 20).is_err());
    }

    #[test]
    fn test_append_contiguous() {
        let ts = ramp(16);
        let mut head = ts.slice(0, 6).unwrap();
        let tail = ts.slice(6, 16).unwrap();
        head.append(&tail).unwrap();
        assert_eq!(head, ts);

        let gap = ts.slice(8, 16).unwrap();
        let mut head = ts.slice(0, 6).unwrap();
        assert!(head.append(&gap).is_err());
    }

    #[test]
    fn test_rms() {
        let ts = TimeSeries::new(vec![3.0, -3.0, 4.0, 4.0, 1.0], 2.0);
        let rms = ts.rms(1.0).unwrap();
        assert_eq!(rms.data(), &[3.0, 4.0]);
        assert_eq!(rms.sample_rate(), 1.0);
    }

    #[test]
    fn test_invalid_sample_rate() {
        let ts = TimeSeries::new(vec![1.0], 0.0);
        assert!(ts.check_sample_rate().is_err());
    }
}
