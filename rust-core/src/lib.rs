//! GW Spectra - Spectral estimation for gravitational-wave strain data
//!
//! Welch/median PSD and ASD estimates, cross spectra, averaged and dense
//! spectrograms, whitening, notch and IIR filtering, rational-ratio
//! resampling and parallel archive reads, with optional Python bindings.

// Suppress PyO3 non-local impl warnings (harmless macro-generated code)
#![allow(non_local_definitions)]

pub mod dispatch;
pub mod error;
pub mod filters;
pub mod io;
pub mod series;
pub mod spectrum;
pub mod warnings;

#[cfg(feature = "python")]
mod python_bindings;

pub use error::{Result, SpectralError};
pub use filters::{FilterCoefficients, NotchConfig, WhitenConfig, WindowType};
pub use series::{FrequencySeries, SpectralVariance, Spectrogram, TimeSeries, Unit};
pub use spectrum::{Method, SpectralConfig, SpectrogramConfig, VarianceConfig};
