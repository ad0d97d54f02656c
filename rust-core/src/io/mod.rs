//! Read/write provider contract and time-series assembly
//!
//! Providers return fully populated series (sample rate, epoch, unit,
//! channel). Multi-source reads are gathered, ordered by epoch, cropped
//! to the requested interval and concatenated; gaps are errors.
//!
//! Archives also store spectra and spectrograms as [`Record`]s, which are
//! written and read back whole.

pub mod json;
pub mod memory;

pub use json::JsonArchive;
pub use memory::MemoryArchive;

use crate::dispatch::{partition_interval, ChunkDispatcher};
use crate::error::{Result, SpectralError};
use crate::series::{ChannelId, FrequencySeries, Spectrogram, TimeSeries};
use num_complex::Complex64;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Ordered collection of data sources (file paths or archive keys)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    paths: Vec<PathBuf>,
}

impl SourceSet {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every file in `dir` with the given extension, sorted by path
    pub fn from_dir(dir: &Path, extension: &str) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(Self { paths })
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Fails with `EmptySource` when there is nothing to read
    pub fn require_nonempty(&self) -> Result<()> {
        if self.paths.is_empty() {
            Err(SpectralError::EmptySource)
        } else {
            Ok(())
        }
    }
}

impl<P: Into<PathBuf>> FromIterator<P> for SourceSet {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// One stored container
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    TimeSeries(TimeSeries),
    Spectrum(FrequencySeries<f64>),
    CrossSpectrum(FrequencySeries<Complex64>),
    Spectrogram(Spectrogram<f64>),
    CrossSpectrogram(Spectrogram<Complex64>),
}

impl Record {
    pub fn name(&self) -> Option<&str> {
        match self {
            Record::TimeSeries(series) => series.name(),
            Record::Spectrum(spectrum) => spectrum.name(),
            Record::CrossSpectrum(spectrum) => spectrum.name(),
            Record::Spectrogram(gram) => gram.name(),
            Record::CrossSpectrogram(gram) => gram.name(),
        }
    }

    pub fn channel(&self) -> Option<ChannelId> {
        match self {
            Record::TimeSeries(series) => series.channel(),
            Record::Spectrum(spectrum) => spectrum.channel(),
            Record::CrossSpectrum(spectrum) => spectrum.channel(),
            Record::Spectrogram(gram) => gram.channel(),
            Record::CrossSpectrogram(gram) => gram.channel(),
        }
    }

    pub fn as_time_series(&self) -> Option<&TimeSeries> {
        match self {
            Record::TimeSeries(series) => Some(series),
            _ => None,
        }
    }
}

impl From<TimeSeries> for Record {
    fn from(series: TimeSeries) -> Self {
        Record::TimeSeries(series)
    }
}

impl From<FrequencySeries<f64>> for Record {
    fn from(spectrum: FrequencySeries<f64>) -> Self {
        Record::Spectrum(spectrum)
    }
}

impl From<FrequencySeries<Complex64>> for Record {
    fn from(spectrum: FrequencySeries<Complex64>) -> Self {
        Record::CrossSpectrum(spectrum)
    }
}

impl From<Spectrogram<f64>> for Record {
    fn from(gram: Spectrogram<f64>) -> Self {
        Record::Spectrogram(gram)
    }
}

impl From<Spectrogram<Complex64>> for Record {
    fn from(gram: Spectrogram<Complex64>) -> Self {
        Record::CrossSpectrogram(gram)
    }
}

/// Source of channel data
pub trait ReadProvider: Send + Sync {
    /// Every record stored at `source`, in stored order
    fn read_records(&self, source: &Path) -> Result<Vec<Record>>;

    /// Read `channel` over `[start, end)`; open bounds extend to the data
    fn read(&self, sources: &SourceSet, channel: &str, start: Option<f64>, end: Option<f64>) -> Result<TimeSeries>;

    /// Read several channels over the same interval
    fn read_many(
        &self,
        sources: &SourceSet,
        channels: &[&str],
        start: Option<f64>,
        end: Option<f64>,
    ) -> Result<BTreeMap<String, TimeSeries>> {
        sources.require_nonempty()?;
        channels
            .iter()
            .map(|channel| Ok((channel.to_string(), self.read(sources, channel, start, end)?)))
            .collect()
    }
}

/// Sink for fully-formed series and spectra
pub trait WriteProvider {
    /// Replace whatever is stored at `destination` with `records`
    fn write_records(&self, records: &[Record], destination: &Path) -> Result<()>;

    fn write(&self, series: &[TimeSeries], destination: &Path) -> Result<()> {
        let records: Vec<Record> = series.iter().cloned().map(Record::from).collect();
        self.write_records(&records, destination)
    }
}

/// Concatenate epoch-ordered pieces of one channel over `[start, end)`
///
/// Overlapping samples are taken from the earlier piece. Any gap, or an
/// interval not fully covered, is reported as `MissingData`.
pub(crate) fn assemble(
    channel: &str,
    mut pieces: Vec<TimeSeries>,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<TimeSeries> {
    let missing = |lo: f64, hi: f64| SpectralError::MissingData {
        channel: channel.to_string(),
        start: lo,
        end: hi,
    };
    pieces.sort_by(|a, b| a.epoch().total_cmp(&b.epoch()));

    let data_start = pieces.first().map(TimeSeries::epoch);
    let data_end = pieces.iter().map(|p| p.span().1).reduce(f64::max);
    let (Some(data_start), Some(data_end)) = (data_start, data_end) else {
        return Err(missing(start.unwrap_or(f64::NAN), end.unwrap_or(f64::NAN)));
    };
    let start = start.unwrap_or(data_start);
    let end = end.unwrap_or(data_end);
    if end < start {
        return Err(SpectralError::InvalidArgument(format!("read end {end} precedes start {start}")));
    }

    let mut assembled: Option<TimeSeries> = None;
    for piece in pieces {
        let (piece_start, piece_end) = piece.span();
        if piece_end <= start || piece_start >= end {
            continue;
        }
        let half_dt = piece.dt() / 2.0;
        let from = match &assembled {
            Some(current) => {
                let current_end = current.span().1;
                if piece_start > current_end + half_dt {
                    return Err(missing(current_end, piece_start));
                }
                if piece_end <= current_end + half_dt {
                    continue;
                }
                current_end.max(start)
            }
            None => {
                if piece_start > start + half_dt {
                    return Err(missing(start, piece_start));
                }
                start
            }
        };
        let cropped = piece.crop(from.max(piece_start), end.min(piece_end))?;
        match assembled.as_mut() {
            Some(current) => current.append(&cropped)?,
            None => assembled = Some(cropped),
        }
    }

    let series = assembled.ok_or_else(|| missing(start, end))?;
    let (_, covered_end) = series.span();
    if covered_end < end - series.dt() / 2.0 {
        return Err(missing(covered_end, end));
    }
    Ok(series)
}

/// Read `[start, end)` as `nproc` sub-intervals in parallel and join
/// them in order; the first failing sub-read aborts the whole read
pub fn read_parallel<P: ReadProvider + ?Sized>(
    provider: &P,
    sources: &SourceSet,
    channel: &str,
    start: f64,
    end: f64,
    nproc: usize,
) -> Result<TimeSeries> {
    sources.require_nonempty()?;
    if end <= start {
        return Err(SpectralError::InvalidArgument(format!("read end {end} precedes start {start}")));
    }
    let intervals = partition_interval(start, end, nproc);
    log::debug!("reading {channel} over [{start}, {end}) in {} parts", intervals.len());

    let parts = ChunkDispatcher::new(nproc).run(intervals, |_, (lo, hi)| {
        provider.read(sources, channel, Some(lo), Some(hi))
    })?;

    let mut parts = parts.into_iter();
    let mut joined = parts.next().ok_or_else(|| SpectralError::MissingData {
        channel: channel.to_string(),
        start,
        end,
    })?;
    for part in parts {
        if !part.is_empty() {
            joined.append(&part)?;
        }
    }
    Ok(joined)
}
