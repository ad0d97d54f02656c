//! Series data model: time series, frequency series, spectrograms,
//! units and channel metadata

mod channel;
mod frequencyseries;
mod spectrogram;
mod timeseries;
mod units;
mod variance;

pub use channel::{Channel, ChannelId, ChannelRegistry};
pub use frequencyseries::FrequencySeries;
pub use spectrogram::Spectrogram;
pub use timeseries::TimeSeries;
pub use units::{Exponent, Hertz, Unit};
pub use variance::SpectralVariance;
