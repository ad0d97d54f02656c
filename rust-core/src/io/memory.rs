//! In-memory archive for pipelines and tests

use super::{assemble, ReadProvider, Record, SourceSet, WriteProvider};
use crate::error::{Result, SpectralError};
use crate::series::TimeSeries;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Records stored under source keys; time series are read back by
/// their `name()`
#[derive(Debug, Default)]
pub struct MemoryArchive {
    store: RwLock<HashMap<PathBuf, Vec<Record>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `series` under `key`, replacing anything stored there
    pub fn insert(&self, key: impl Into<PathBuf>, series: Vec<TimeSeries>) {
        self.insert_records(key, series.into_iter().map(Record::from).collect());
    }

    pub fn insert_records(&self, key: impl Into<PathBuf>, records: Vec<Record>) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), records);
    }

    pub fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self
            .store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl ReadProvider for MemoryArchive {
    fn read(&self, sources: &SourceSet, channel: &str, start: Option<f64>, end: Option<f64>) -> Result<TimeSeries> {
        sources.require_nonempty()?;
        let store = self.store.read().unwrap_or_else(PoisonError::into_inner);
        let pieces: Vec<TimeSeries> = sources
            .iter()
            .filter_map(|key| store.get(key))
            .flatten()
            .filter_map(Record::as_time_series)
            .filter(|series| series.name() == Some(channel))
            .cloned()
            .collect();
        drop(store);
        assemble(channel, pieces, start, end)
    }

    fn read_records(&self, source: &Path) -> Result<Vec<Record>> {
        self.store
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(source)
            .cloned()
            .ok_or_else(|| SpectralError::InvalidArgument(format!("nothing stored at {}", source.display())))
    }
}

impl WriteProvider for MemoryArchive {
    fn write_records(&self, records: &[Record], destination: &Path) -> Result<()> {
        self.insert_records(destination, records.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_parallel;
    use crate::series::{FrequencySeries, Spectrogram, Unit};
    use num_complex::Complex64;

    fn ramp(epoch: f64, n: usize) -> TimeSeries {
        TimeSeries::new((0..n).map(|i| epoch + i as f64 / 8.0).collect(), 8.0)
            .with_epoch(epoch)
            .with_name("K1:RAMP")
    }

    #[test]
    fn test_write_then_read() {
        let archive = MemoryArchive::new();
        let series = ramp(0.0, 16);
        archive.write(&[series.clone()], Path::new("mem://a")).unwrap();
        let read = archive
            .read(&SourceSet::new(["mem://a"]), "K1:RAMP", None, None)
            .unwrap();
        assert_eq!(read, series);
        assert_eq!(archive.keys(), vec![PathBuf::from("mem://a")]);
    }

    #[test]
    fn test_read_many() {
        let archive = MemoryArchive::new();
        let other = TimeSeries::new(vec![0.0; 16], 8.0).with_name("K1:FLAT");
        archive.insert("mem://a", vec![ramp(0.0, 16), other]);
        let sources = SourceSet::new(["mem://a"]);
        let both = archive.read_many(&sources, &["K1:RAMP", "K1:FLAT"], None, None).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both["K1:FLAT"].len(), 16);
    }

    #[test]
    fn test_parallel_ordering() {
        let archive = MemoryArchive::new();
        archive.insert("mem://a", vec![ramp(0.0, 32)]);
        archive.insert("mem://b", vec![ramp(4.0, 32)]);
        let sources = SourceSet::new(["mem://b", "mem://a"]);
        let read = read_parallel(&archive, &sources, "K1:RAMP", 0.0, 8.0, 4).unwrap();
        assert_eq!(read.len(), 64);
        // Values equal their own timestamps
        for (t, v) in read.times().iter().zip(read.data()) {
            assert!((t - v).abs() < 1e-12);
        }
    }

    #[test]
    fn test_spectra_are_stored_alongside_series() {
        let archive = MemoryArchive::new();
        let psd = FrequencySeries::<f64>::new(vec![1.0, 0.5, 0.25], 0.0, 2.0)
            .with_unit(Unit::named("m").power_density())
            .with_name(Some("K1:RAMP".into()));
        let csd = FrequencySeries::new(vec![Complex64::new(1.0, -1.0)], 4.0, 1.0);
        let gram = Spectrogram::<f64>::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]], 2, 8.0, 0.5, 2.0).unwrap();
        let records = vec![
            Record::from(ramp(0.0, 16)),
            Record::from(psd),
            Record::from(csd),
            Record::from(gram),
        ];
        archive.write_records(&records, Path::new("mem://spectra")).unwrap();

        assert_eq!(archive.read_records(Path::new("mem://spectra")).unwrap(), records);
        // Only time series take part in channel reads
        let read = archive
            .read(&SourceSet::new(["mem://spectra"]), "K1:RAMP", None, None)
            .unwrap();
        assert_eq!(read, ramp(0.0, 16));
        assert!(archive.read_records(Path::new("mem://none")).is_err());
    }

    #[test]
    fn test_unknown_source_is_missing_data() {
        let archive = MemoryArchive::new();
        assert!(matches!(
            archive.read(&SourceSet::new(["mem://none"]), "K1:RAMP", None, None),
            Err(SpectralError::MissingData { .. })
        ));
    }
}
