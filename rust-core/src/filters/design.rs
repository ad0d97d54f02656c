//! FIR filter design using the windowing method

use super::windows::{generate_window, WindowType};
use crate::error::{Result, SpectralError};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Design a linear-phase low-pass FIR filter
///
/// # Arguments
/// * `cutoff` - Cutoff frequency (normalized, units of π rad/sample, 0 < cutoff < 1)
/// * `numtaps` - Filter length M (odd lengths give a Type I filter)
/// * `window_type` - Taper applied to the ideal sinc response
///
/// # Returns
/// Coefficients h[n] for n = 0..M-1, scaled so the DC gain is exactly 1
pub fn design_lowpass_fir(cutoff: f64, numtaps: usize, window_type: WindowType) -> Result<Vec<f64>> {
    if numtaps == 0 {
        return Err(SpectralError::InvalidArgument("FIR filter needs at least one tap".into()));
    }
    if !(cutoff > 0.0 && cutoff < 1.0) {
        return Err(SpectralError::InvalidArgument(format!(
            "FIR cutoff must lie strictly between 0 and Nyquist, got {cutoff}"
        )));
    }

    let window = generate_window(window_type, numtaps);
    let wc_rad = cutoff * PI;
    let center = (numtaps - 1) as f64 / 2.0;

    let mut h: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(n, w)| {
            let n_shifted = n as f64 - center;
            // Limit at the centre tap: wc/π
            let h_ideal = if n_shifted.abs() < 1e-10 {
                wc_rad / PI
            } else {
                (wc_rad * n_shifted).sin() / (PI * n_shifted)
            };
            h_ideal * w
        })
        .collect();

    let dc: f64 = h.iter().sum();
    if dc.abs() > f64::EPSILON {
        h.iter_mut().for_each(|c| *c /= dc);
    }
    Ok(h)
}

/// Calculate frequency response at given frequencies
///
/// # Arguments
/// * `h` - Polynomial coefficients in z^-1 (FIR taps, or an IIR numerator/denominator)
/// * `frequencies` - Normalized frequencies (units of π rad/sample)
///
/// # Returns
/// Complex frequency response H(e^jω)
pub fn frequency_response(h: &[f64], frequencies: &[f64]) -> Vec<Complex64> {
    frequencies
        .iter()
        .map(|&omega| {
            let omega_rad = omega * PI;
            h.iter().enumerate().fold(Complex64::new(0.0, 0.0), |sum, (n, &h_n)| {
                sum + h_n * Complex64::from_polar(1.0, -(omega_rad * n as f64))
            })
        })
        .collect()
}

/// Calculate magnitude response in dB
pub fn magnitude_response_db(h: &[f64], frequencies: &[f64]) -> Vec<f64> {
    frequency_response(h, frequencies)
        .iter()
        .map(|c| 20.0 * c.norm().log10())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowpass_design() {
        let h = design_lowpass_fir(0.1, 61, WindowType::Hamming).unwrap();
        assert_eq!(h.len(), 61);

        // Check symmetry (Type I FIR)
        for i in 0..h.len() / 2 {
            assert!((h[i] - h[h.len() - 1 - i]).abs() < 1e-12);
        }

        // Exact unity DC gain
        let sum: f64 = h.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lowpass_stopband_attenuation() {
        let h = design_lowpass_fir(0.1, 61, WindowType::Hamming).unwrap();
        let db = magnitude_response_db(&h, &[0.02, 0.5, 0.9]);
        assert!(db[0].abs() < 0.1, "passband ripple {}", db[0]);
        assert!(db[1] < -40.0, "stopband {}", db[1]);
        assert!(db[2] < -40.0, "stopband {}", db[2]);
    }

    #[test]
    fn test_invalid_design_arguments() {
        assert!(design_lowpass_fir(1.2, 11, WindowType::Hann).is_err());
        assert!(design_lowpass_fir(0.2, 0, WindowType::Hann).is_err());
    }

    #[test]
    fn test_frequency_response_of_delay() {
        // Pure one-sample delay has unit magnitude and linear phase
        let response = frequency_response(&[0.0, 1.0], &[0.0, 0.5]);
        assert!((response[0].re - 1.0).abs() < 1e-12);
        assert!((response[1].norm() - 1.0).abs() < 1e-12);
        assert!((response[1].arg() + PI / 2.0).abs() < 1e-12);
    }
}
