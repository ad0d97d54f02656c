//! Time-frequency arrays

use super::channel::ChannelId;
use super::units::Unit;
use crate::error::{Result, SpectralError};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Rows are time bins (`epoch + i * dt`), columns are frequency bins
/// (`f0 + k * df`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram<T> {
    data: Array2<T>,
    epoch: f64,
    dt: f64,
    f0: f64,
    df: f64,
    unit: Unit,
    channel: Option<ChannelId>,
    name: Option<String>,
}

impl<T: Clone> Spectrogram<T> {
    /// Stack equally sized rows into a spectrogram
    pub fn from_rows(rows: Vec<Vec<T>>, nfreqs: usize, epoch: f64, dt: f64, df: f64) -> Result<Self> {
        let nrows = rows.len();
        let mut flat = Vec::with_capacity(nrows * nfreqs);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != nfreqs {
                return Err(SpectralError::InvalidArgument(format!(
                    "spectrogram row {i} has {} bins, expected {nfreqs}",
                    row.len()
                )));
            }
            flat.extend(row);
        }
        let data = Array2::from_shape_vec((nrows, nfreqs), flat)
            .map_err(|e| SpectralError::InvalidArgument(e.to_string()))?;
        Ok(Self::from_array(data, epoch, dt, df))
    }
}

impl<T> Spectrogram<T> {
    pub fn from_array(data: Array2<T>, epoch: f64, dt: f64, df: f64) -> Self {
        Self {
            data,
            epoch,
            dt,
            f0: 0.0,
            df,
            unit: Unit::dimensionless(),
            channel: None,
            name: None,
        }
    }

    pub fn with_f0(mut self, f0: f64) -> Self {
        self.f0 = f0;
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

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// `(time bins, frequency bins)`
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, T>> {
        (index < self.data.nrows()).then(|| self.data.row(index))
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn f0(&self) -> f64 {
        self.f0
    }

    pub fn df(&self) -> f64 {
        self.df
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

    pub fn times(&self) -> Vec<f64> {
        (0..self.data.nrows())
            .map(|i| self.epoch + i as f64 * self.dt)
            .collect()
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.data.ncols())
            .map(|k| self.f0 + k as f64 * self.df)
            .collect()
    }

    /// Element-wise conversion keeping axes and metadata
    pub fn map<U>(&self, unit: Unit, f: impl Fn(&T) -> U) -> Spectrogram<U> {
        Spectrogram {
            data: self.data.map(f),
            epoch: self.epoch,
            dt: self.dt,
            f0: self.f0,
            df: self.df,
            unit,
            channel: self.channel,
            name: self.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows() {
        let gram = Spectrogram::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]], 2, 5.0, 0.5, 2.0)
            .unwrap();
        assert_eq!(gram.shape(), (3, 2));
        assert_eq!(gram.times(), vec![5.0, 5.5, 6.0]);
        assert_eq!(gram.frequencies(), vec![0.0, 2.0]);
        assert_eq!(gram.row(1).unwrap().to_vec(), vec![3.0, 4.0]);
        assert!(gram.row(3).is_none());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let result = Spectrogram::from_rows(vec![vec![1.0, 2.0], vec![3.0]], 2, 0.0, 1.0, 1.0);
        assert!(matches!(result, Err(SpectralError::InvalidArgument(_))));
    }

    #[test]
    fn test_empty_spectrogram() {
        let gram: Spectrogram<f64> = Spectrogram::from_rows(Vec::new(), 5, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(gram.shape(), (0, 5));
    }
}
