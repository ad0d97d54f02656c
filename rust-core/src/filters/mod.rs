//! Filter design and application: FIR and IIR design, notch filters,
//! resampling and whitening

pub mod coefficients;
pub mod design;
pub mod fast_fir;
pub mod fir;
pub mod iir;
pub mod notch;
pub mod resample;
pub mod whiten;
pub mod windows;

pub use coefficients::{AnalogUnit, ButterworthConfig, FilterCoefficients, FilterForm};
pub use design::{design_lowpass_fir, frequency_response, magnitude_response_db};
pub use fast_fir::FastFirFilter;
pub use fir::FirFilter;
pub use iir::{bilinear_zpk, butter, buttord, ellip, ellipord, zpk_to_ba, zpk_to_sos, BandType, Zpk};
pub use notch::{create_notch, NotchConfig, NotchKind};
pub use resample::{rational_ratio, resample, ResampleConfig, ResampleMethod};
pub use whiten::{whiten, whiten_with_asd, WhitenConfig};
pub use windows::{generate_periodic_window, generate_window, WindowType};
