//! Error taxonomy shared by the spectral, filtering and archive layers

use thiserror::Error;

/// Errors raised at the public API boundary
///
/// None of these are retried internally: configuration problems are
/// surfaced to the caller as-is so they can pick different parameters.
#[derive(Error, Debug)]
pub enum SpectralError {
    /// Segment length/overlap incompatible with the input length
    #[error("invalid segmentation: {0}")]
    InvalidSegmentation(String),

    /// Dense (segment-reuse) mode needs the outer stride on the segment grid
    #[error("segment alignment error: {0}")]
    Alignment(String),

    /// Averaging method needs more segments than are available
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// Averaging or window method name not recognised
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    /// Resampling ratio outside the supported set
    #[error("unsupported resample rate: {0}")]
    UnsupportedRate(String),

    /// Deliberately unsupported feature (not a bug)
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Malformed argument (bad window length, mismatched series, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Per-sample statistic requested on a zero-length series
    #[error("cannot compute {0} of an empty series")]
    EmptySeries(&'static str),

    /// Read requested over an empty source collection
    #[error("no data sources given")]
    EmptySource,

    /// Requested interval not (fully) covered by the sources
    #[error("no data for {channel} in [{start}, {end})")]
    MissingData {
        channel: String,
        start: f64,
        end: f64,
    },

    /// Filter applied at a sample rate other than its design rate
    #[error("filter designed for {expected} Hz cannot be applied to data at {found} Hz")]
    SampleRateMismatch { expected: f64, found: f64 },

    #[error("FFT failed: {0}")]
    Fft(String),

    #[error("resampler failed: {0}")]
    Resample(String),

    #[error("worker pool failed: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<realfft::FftError> for SpectralError {
    fn from(err: realfft::FftError) -> Self {
        SpectralError::Fft(err.to_string())
    }
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, SpectralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SpectralError::UnknownMethod("fancy".into());
        assert_eq!(err.to_string(), "unknown method 'fancy'");

        let err = SpectralError::EmptySeries("mean");
        assert_eq!(err.to_string(), "cannot compute mean of an empty series");

        let err = SpectralError::SampleRateMismatch {
            expected: 16384.0,
            found: 4096.0,
        };
        assert!(err.to_string().contains("16384"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.json");
        let err: SpectralError = io.into();
        assert!(matches!(err, SpectralError::Io(_)));
    }
}
