//! Spectral estimation: segmentation, transforms, averaging, spectrograms

pub mod averaging;
pub mod estimator;
pub mod fft;
pub mod segment;
pub mod spectrogram;
pub mod variance;
pub mod windowing;

pub use averaging::{lookup_method, register_method, Average, Averager, Method, Rayleigh};
pub use estimator::{
    asd, auto_coherence, average_fft, coherence, csd, fft, psd, rayleigh_spectrum, SpectralConfig,
};
pub use fft::{FftEngine, Scaling, SegmentTransform};
pub use segment::{seconds_to_samples, SegmentPlan};
pub use spectrogram::{
    coherence_spectrogram, csd_spectrogram, fftgram, rayleigh_spectrogram, spectrogram, spectrogram2,
    SpectrogramConfig,
};
pub use variance::{spectral_variance, VarianceConfig};
pub use windowing::{Detrend, Window};
