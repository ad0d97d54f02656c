//! Lossless JSON channel archive
//!
//! Each file holds a list of tagged records: channel time series, real or
//! complex spectra, and real or complex spectrograms. Floating-point
//! values are written with round-trip precision, so reading back what was
//! written reproduces every sample and axis exactly.

use super::{assemble, ReadProvider, Record, SourceSet, WriteProvider};
use crate::error::{Result, SpectralError};
use crate::series::{ChannelId, ChannelRegistry, FrequencySeries, Spectrogram, TimeSeries, Unit};
use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChannelRecord {
    channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    epoch: f64,
    sample_rate: f64,
    #[serde(default)]
    unit: Unit,
    data: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpectrumRecord<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    epoch: f64,
    f0: f64,
    df: f64,
    #[serde(default)]
    unit: Unit,
    data: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpectrogramRecord<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    epoch: f64,
    dt: f64,
    f0: f64,
    df: f64,
    #[serde(default)]
    unit: Unit,
    data: Array2<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum StoredRecord {
    TimeSeries(ChannelRecord),
    Spectrum(SpectrumRecord<f64>),
    CrossSpectrum(SpectrumRecord<Complex64>),
    Spectrogram(SpectrogramRecord<f64>),
    CrossSpectrogram(SpectrogramRecord<Complex64>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ArchiveFile {
    records: Vec<StoredRecord>,
}

/// Archive provider over JSON files
///
/// Channel names are interned in the shared registry so series read from
/// different files carry the same channel id.
#[derive(Debug, Clone)]
pub struct JsonArchive {
    registry: Arc<ChannelRegistry>,
}

impl JsonArchive {
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    fn load(path: &Path) -> Result<ArchiveFile> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    fn registered_name(&self, channel: Option<ChannelId>) -> Option<String> {
        channel
            .and_then(|id| self.registry.get(id))
            .map(|channel| channel.name().to_string())
    }

    fn channel_name(&self, series: &TimeSeries) -> Result<String> {
        if let Some(name) = self.registered_name(series.channel()) {
            return Ok(name);
        }
        series
            .name()
            .map(str::to_string)
            .ok_or_else(|| SpectralError::InvalidArgument("series has neither a channel nor a name".into()))
    }

    fn to_series(&self, record: ChannelRecord) -> TimeSeries {
        let id = self.registry.intern_name(&record.channel);
        let name = record.name.unwrap_or_else(|| record.channel.clone());
        TimeSeries::new(record.data, record.sample_rate)
            .with_epoch(record.epoch)
            .with_unit(record.unit)
            .with_channel(id)
            .with_name(name)
    }

    fn intern(&self, channel: Option<String>) -> Option<ChannelId> {
        channel.map(|name| self.registry.intern_name(&name))
    }

    fn store_spectrum<T: Clone>(&self, spectrum: &FrequencySeries<T>) -> SpectrumRecord<T> {
        SpectrumRecord {
            channel: self.registered_name(spectrum.channel()),
            name: spectrum.name().map(str::to_string),
            epoch: spectrum.epoch(),
            f0: spectrum.f0(),
            df: spectrum.df(),
            unit: spectrum.unit().clone(),
            data: spectrum.data().to_vec(),
        }
    }

    fn load_spectrum<T>(&self, record: SpectrumRecord<T>) -> FrequencySeries<T> {
        FrequencySeries::new(record.data, record.f0, record.df)
            .with_epoch(record.epoch)
            .with_unit(record.unit)
            .with_channel(self.intern(record.channel))
            .with_name(record.name)
    }

    fn store_spectrogram<T: Clone>(&self, gram: &Spectrogram<T>) -> SpectrogramRecord<T> {
        SpectrogramRecord {
            channel: self.registered_name(gram.channel()),
            name: gram.name().map(str::to_string),
            epoch: gram.epoch(),
            dt: gram.dt(),
            f0: gram.f0(),
            df: gram.df(),
            unit: gram.unit().clone(),
            data: gram.data().clone(),
        }
    }

    fn load_spectrogram<T>(&self, record: SpectrogramRecord<T>) -> Spectrogram<T> {
        Spectrogram::from_array(record.data, record.epoch, record.dt, record.df)
            .with_f0(record.f0)
            .with_unit(record.unit)
            .with_channel(self.intern(record.channel))
            .with_name(record.name)
    }

    fn store(&self, record: &Record) -> Result<StoredRecord> {
        Ok(match record {
            Record::TimeSeries(series) => {
                series.check_sample_rate()?;
                StoredRecord::TimeSeries(ChannelRecord {
                    channel: self.channel_name(series)?,
                    name: series.name().map(str::to_string),
                    epoch: series.epoch(),
                    sample_rate: series.sample_rate(),
                    unit: series.unit().clone(),
                    data: series.data().to_vec(),
                })
            }
            Record::Spectrum(spectrum) => StoredRecord::Spectrum(self.store_spectrum(spectrum)),
            Record::CrossSpectrum(spectrum) => StoredRecord::CrossSpectrum(self.store_spectrum(spectrum)),
            Record::Spectrogram(gram) => StoredRecord::Spectrogram(self.store_spectrogram(gram)),
            Record::CrossSpectrogram(gram) => StoredRecord::CrossSpectrogram(self.store_spectrogram(gram)),
        })
    }

    fn load_record(&self, stored: StoredRecord) -> Record {
        match stored {
            StoredRecord::TimeSeries(record) => Record::TimeSeries(self.to_series(record)),
            StoredRecord::Spectrum(record) => Record::Spectrum(self.load_spectrum(record)),
            StoredRecord::CrossSpectrum(record) => Record::CrossSpectrum(self.load_spectrum(record)),
            StoredRecord::Spectrogram(record) => Record::Spectrogram(self.load_spectrogram(record)),
            StoredRecord::CrossSpectrogram(record) => Record::CrossSpectrogram(self.load_spectrogram(record)),
        }
    }
}

impl ReadProvider for JsonArchive {
    fn read(&self, sources: &SourceSet, channel: &str, start: Option<f64>, end: Option<f64>) -> Result<TimeSeries> {
        sources.require_nonempty()?;
        let mut pieces = Vec::new();
        for path in sources.iter() {
            let archive = Self::load(path)?;
            pieces.extend(archive.records.into_iter().filter_map(|stored| match stored {
                StoredRecord::TimeSeries(record) if record.channel == channel => Some(self.to_series(record)),
                _ => None,
            }));
        }
        log::debug!("{channel}: {} record(s) in {} file(s)", pieces.len(), sources.len());
        assemble(channel, pieces, start, end)
    }

    fn read_records(&self, source: &Path) -> Result<Vec<Record>> {
        let archive = Self::load(source)?;
        Ok(archive
            .records
            .into_iter()
            .map(|stored| self.load_record(stored))
            .collect())
    }
}

impl WriteProvider for JsonArchive {
    fn write_records(&self, records: &[Record], destination: &Path) -> Result<()> {
        let records = records
            .iter()
            .map(|record| self.store(record))
            .collect::<Result<Vec<_>>>()?;

        let mut writer = BufWriter::new(File::create(destination)?);
        serde_json::to_writer(&mut writer, &ArchiveFile { records })?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::read_parallel;
    use crate::spectrum::{SpectralConfig, SpectrogramConfig};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::TempDir;

    fn archive() -> JsonArchive {
        JsonArchive::new(Arc::new(ChannelRegistry::new()))
    }

    fn noisy(archive: &JsonArchive, channel: &str, epoch: f64, n: usize, seed: u64) -> TimeSeries {
        let mut rng = StdRng::seed_from_u64(seed);
        let id = archive.registry().intern_name(channel);
        TimeSeries::new((0..n).map(|_| rng.gen::<f64>() * 1e-21).collect(), 16.0)
            .with_epoch(epoch)
            .with_unit(Unit::named("m"))
            .with_channel(id)
            .with_name(channel)
    }

    #[test]
    fn test_round_trip_is_lossless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.json");
        let archive = archive();
        let original = noisy(&archive, "L1:LSC-DARM_ERR", 1_126_259_462.0, 64, 3);

        archive.write(&[original.clone()], &path).unwrap();
        let read = archive
            .read(&SourceSet::new([path]), "L1:LSC-DARM_ERR", None, None)
            .unwrap();
        assert_eq!(read, original);
    }

    #[test]
    fn test_read_spans_files() {
        let dir = TempDir::new().unwrap();
        let archive = archive();
        let first = noisy(&archive, "H1:TEST", 100.0, 32, 1);
        let second = noisy(&archive, "H1:TEST", 102.0, 32, 2);
        let other = noisy(&archive, "H1:OTHER", 100.0, 64, 4);
        archive.write(&[second.clone()], &dir.path().join("b.json")).unwrap();
        archive.write(&[first.clone(), other], &dir.path().join("a.json")).unwrap();

        let sources = SourceSet::from_dir(dir.path(), "json").unwrap();
        assert_eq!(sources.len(), 2);
        let read = archive.read(&sources, "H1:TEST", Some(101.0), Some(103.0)).unwrap();
        assert_eq!(read.epoch(), 101.0);
        assert_eq!(read.len(), 32);
        assert_eq!(&read.data()[..16], &first.data()[16..]);
        assert_eq!(&read.data()[16..], &second.data()[..16]);
    }

    #[test]
    fn test_missing_channel() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("frame.json");
        let archive = archive();
        archive.write(&[noisy(&archive, "H1:TEST", 0.0, 16, 1)], &path).unwrap();
        assert!(matches!(
            archive.read(&SourceSet::new([path]), "H1:NOPE", None, None),
            Err(SpectralError::MissingData { .. })
        ));
    }

    #[test]
    fn test_parallel_read_matches_serial() {
        let dir = TempDir::new().unwrap();
        let archive = archive();
        for (i, name) in ["a.json", "b.json", "c.json"].iter().enumerate() {
            let piece = noisy(&archive, "V1:TEST", 10.0 + 4.0 * i as f64, 64, i as u64);
            archive.write(&[piece], &dir.path().join(name)).unwrap();
        }
        let sources = SourceSet::from_dir(dir.path(), "json").unwrap();
        let serial = archive.read(&sources, "V1:TEST", Some(10.0), Some(22.0)).unwrap();
        let parallel = read_parallel(&archive, &sources, "V1:TEST", 10.0, 22.0, 3).unwrap();
        assert_eq!(parallel, serial);
    }

    #[test]
    fn test_parallel_read_propagates_gap() {
        let dir = TempDir::new().unwrap();
        let archive = archive();
        archive.write(&[noisy(&archive, "V1:TEST", 0.0, 32, 1)], &dir.path().join("a.json")).unwrap();
        archive.write(&[noisy(&archive, "V1:TEST", 6.0, 32, 2)], &dir.path().join("b.json")).unwrap();
        let sources = SourceSet::from_dir(dir.path(), "json").unwrap();
        assert!(matches!(
            read_parallel(&archive, &sources, "V1:TEST", 0.0, 8.0, 4),
            Err(SpectralError::MissingData { .. })
        ));
    }

    #[test]
    fn test_spectral_records_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spectra.json");
        let archive = archive();
        let strain = noisy(&archive, "H1:GDS-CALIB_STRAIN", 1_187_008_882.0, 256, 5);
        let aux = noisy(&archive, "H1:PEM-MAG", 1_187_008_882.0, 256, 6);
        let config = SpectralConfig::new().fftlength(4.0).overlap(2.0);
        let gram_config = SpectrogramConfig::new(SpectralConfig::new().fftlength(2.0).overlap(1.0));

        let records = vec![
            Record::from(strain.clone()),
            Record::from(strain.psd(&config).unwrap()),
            Record::from(strain.csd(&aux, &config).unwrap()),
            Record::from(strain.spectrogram(4.0, &gram_config).unwrap()),
            Record::from(strain.csd_spectrogram(&aux, 4.0, &gram_config).unwrap()),
            Record::from(FrequencySeries::<f64>::new(vec![0.1, 0.2], 10.0, 0.5)),
        ];
        archive.write_records(&records, &path).unwrap();

        let read = archive.read_records(&path).unwrap();
        assert_eq!(read, records);
        assert_eq!(read[1].channel(), strain.channel());
        assert_eq!(read[3].name(), Some("H1:GDS-CALIB_STRAIN"));

        // A fresh registry still resolves the same channel names
        let other = self::archive();
        let reread = other.read_records(&path).unwrap();
        let channel = reread[1].channel().and_then(|id| other.registry().get(id)).unwrap();
        assert_eq!(channel.name(), "H1:GDS-CALIB_STRAIN");

        let series = archive
            .read(&SourceSet::new([path]), "H1:GDS-CALIB_STRAIN", None, None)
            .unwrap();
        assert_eq!(series, strain);
    }

    #[test]
    fn test_write_requires_channel_or_name() {
        let dir = TempDir::new().unwrap();
        let anonymous = TimeSeries::new(vec![1.0; 4], 4.0);
        assert!(archive().write(&[anonymous], &dir.path().join("x.json")).is_err());
    }
}
