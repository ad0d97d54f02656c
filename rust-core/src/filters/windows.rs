//! Window functions for FIR design and spectral segment tapering
//!
//! FIR design uses the symmetric form; spectral estimation uses the
//! periodic (DFT-even) form so that overlapping segments tile cleanly.

use crate::error::SpectralError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Window function types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    /// Hann window: w[n] = 0.5 - 0.5*cos(2πn/(M-1))
    /// Sidelobe attenuation: ~44 dB
    Hann,

    /// Hamming window: w[n] = 0.54 - 0.46*cos(2πn/(M-1))
    /// Sidelobe attenuation: ~53 dB
    Hamming,

    /// Blackman window: w[n] = 0.42 - 0.5*cos(2πn/(M-1)) + 0.08*cos(4πn/(M-1))
    /// Sidelobe attenuation: ~74 dB
    Blackman,

    /// Rectangular window (no tapering)
    Rectangular,
}

impl FromStr for WindowType {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowType::Hann),
            "hamming" => Ok(WindowType::Hamming),
            "blackman" => Ok(WindowType::Blackman),
            "boxcar" | "rectangular" | "rect" => Ok(WindowType::Rectangular),
            other => Err(SpectralError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Rectangular => "boxcar",
        };
        f.write_str(name)
    }
}

/// Cosine-sum coefficient at sample `n` with period `denom`
fn cosine_sum(window_type: WindowType, n: usize, denom: f64) -> f64 {
    let angle = 2.0 * PI * n as f64 / denom;
    match window_type {
        WindowType::Hann => 0.5 - 0.5 * angle.cos(),
        WindowType::Hamming => 0.54 - 0.46 * angle.cos(),
        WindowType::Blackman => 0.42 - 0.5 * angle.cos() + 0.08 * (2.0 * angle).cos(),
        WindowType::Rectangular => 1.0,
    }
}

/// Generate symmetric window coefficients
///
/// # Arguments
/// * `window_type` - Type of window function
/// * `length` - Number of samples (M)
///
/// # Returns
/// Vector of window coefficients w[n] for n = 0..M-1, with w[0] == w[M-1]
pub fn generate_window(window_type: WindowType, length: usize) -> Vec<f64> {
    if length == 1 {
        return vec![1.0];
    }
    let denom = length as f64 - 1.0;
    (0..length)
        .map(|n| cosine_sum(window_type, n, denom))
        .collect()
}

/// Generate periodic (DFT-even) window coefficients
///
/// Equal to the first `length` samples of the symmetric window of
/// length `length + 1`.
pub fn generate_periodic_window(window_type: WindowType, length: usize) -> Vec<f64> {
    let denom = length as f64;
    (0..length)
        .map(|n| cosine_sum(window_type, n, denom))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_generation() {
        let length = 161;

        let hann = generate_window(WindowType::Hann, length);
        let hamming = generate_window(WindowType::Hamming, length);
        let blackman = generate_window(WindowType::Blackman, length);

        assert_eq!(hann.len(), length);

        // Symmetric about the centre
        assert!((hann[0] - hann[length - 1]).abs() < 1e-10);
        assert!((blackman[0] - blackman[length - 1]).abs() < 1e-10);

        let center = length / 2;
        assert!((hann[center] - 1.0).abs() < 1e-10);
        assert!((hamming[center] - 1.0).abs() < 1e-10);

        assert!(hamming[0] > 0.07 && hamming[0] < 0.09);
    }

    #[test]
    fn test_periodic_hann_tiles_at_half_overlap() {
        let n = 64;
        let hann = generate_periodic_window(WindowType::Hann, n);
        assert_eq!(hann[0], 0.0);
        assert!((hann[n / 2] - 1.0).abs() < 1e-12);
        for i in 0..n / 2 {
            assert!((hann[i] + hann[i + n / 2] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_periodic_matches_truncated_symmetric() {
        let periodic = generate_periodic_window(WindowType::Blackman, 50);
        let symmetric = generate_window(WindowType::Blackman, 51);
        for (p, s) in periodic.iter().zip(symmetric.iter()) {
            assert!((p - s).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rectangular_window() {
        let window = generate_window(WindowType::Rectangular, 100);
        assert!(window.iter().all(|&w| w == 1.0));
        assert_eq!(generate_window(WindowType::Hann, 1), vec![1.0]);
    }

    #[test]
    fn test_window_names() {
        assert_eq!("hanning".parse::<WindowType>().unwrap(), WindowType::Hann);
        assert_eq!("boxcar".parse::<WindowType>().unwrap(), WindowType::Rectangular);
        assert!(matches!("kaiser".parse::<WindowType>(), Err(SpectralError::UnknownMethod(_))));
        assert_eq!(WindowType::Hamming.to_string(), "hamming");
    }
}
