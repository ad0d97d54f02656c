//! Segment tapering and detrending applied before each transform

use crate::error::{Result, SpectralError};
use crate::filters::windows::{generate_periodic_window, WindowType};
use serde::{Deserialize, Serialize};

/// Window choice: a named function or explicit coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Window {
    Named(WindowType),
    Custom(Vec<f64>),
}

impl Default for Window {
    fn default() -> Self {
        Window::Named(WindowType::Hann)
    }
}

impl From<WindowType> for Window {
    fn from(window_type: WindowType) -> Self {
        Window::Named(window_type)
    }
}

impl From<Vec<f64>> for Window {
    fn from(coefficients: Vec<f64>) -> Self {
        Window::Custom(coefficients)
    }
}

impl Window {
    /// Coefficients for a segment of `length` samples
    ///
    /// Named windows are generated in periodic form; explicit
    /// coefficients must already have the right length.
    pub fn coefficients(&self, length: usize) -> Result<Vec<f64>> {
        match self {
            Window::Named(window_type) => Ok(generate_periodic_window(*window_type, length)),
            Window::Custom(coefficients) if coefficients.len() == length => Ok(coefficients.clone()),
            Window::Custom(coefficients) => Err(SpectralError::InvalidArgument(format!(
                "window has {} coefficients but segments have {length} samples",
                coefficients.len()
            ))),
        }
    }
}

/// Per-segment trend removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detrend {
    None,
    /// Subtract the mean
    #[default]
    Constant,
    /// Subtract the least-squares line
    Linear,
}

/// Remove the requested trend in place
pub fn detrend_in_place(data: &mut [f64], kind: Detrend) {
    let n = data.len();
    if n == 0 {
        return;
    }
    match kind {
        Detrend::None => {}
        Detrend::Constant => {
            let mean = data.iter().sum::<f64>() / n as f64;
            data.iter_mut().for_each(|x| *x -= mean);
        }
        Detrend::Linear => {
            let nf = n as f64;
            let t_mean = (nf - 1.0) / 2.0;
            let y_mean = data.iter().sum::<f64>() / nf;
            let mut sxy = 0.0;
            let mut sxx = 0.0;
            for (i, &y) in data.iter().enumerate() {
                let t = i as f64 - t_mean;
                sxy += t * (y - y_mean);
                sxx += t * t;
            }
            let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
            for (i, x) in data.iter_mut().enumerate() {
                *x -= y_mean + slope * (i as f64 - t_mean);
            }
        }
    }
}

/// Multiply a segment by window coefficients in place
pub fn apply_window_inplace(signal: &mut [f64], window: &[f64]) {
    for (s, w) in signal.iter_mut().zip(window.iter()) {
        *s *= w;
    }
}

/// Amplitude correction factor: `length / Σw`
///
/// Multiplying a windowed transform by this restores the amplitude of a
/// coherent sinusoid.
pub fn window_correction_factor(window: &[f64]) -> f64 {
    let sum: f64 = window.iter().sum();
    window.len() as f64 / sum
}

/// Power correction factor: `length / Σw²`
pub fn window_power_correction_factor(window: &[f64]) -> f64 {
    let sum_sq: f64 = window.iter().map(|&w| w * w).sum();
    window.len() as f64 / sum_sq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_window_is_periodic() {
        let w = Window::default().coefficients(8).unwrap();
        assert_eq!(w.len(), 8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_window_length_checked() {
        let window = Window::from(vec![1.0; 4]);
        assert_eq!(window.coefficients(4).unwrap(), vec![1.0; 4]);
        assert!(matches!(window.coefficients(5), Err(SpectralError::InvalidArgument(_))));
    }

    #[test]
    fn test_detrend_constant() {
        let mut data = vec![1.0, 2.0, 3.0, 6.0];
        detrend_in_place(&mut data, Detrend::Constant);
        assert!(data.iter().sum::<f64>().abs() < 1e-12);
        assert_eq!(data[0], -2.0);
    }

    #[test]
    fn test_detrend_linear_removes_ramp() {
        let mut data: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();
        detrend_in_place(&mut data, Detrend::Linear);
        assert!(data.iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn test_correction_factor() {
        let rect = vec![1.0; 100];
        assert!((window_correction_factor(&rect) - 1.0).abs() < 1e-12);
        let hamming = crate::filters::windows::generate_window(WindowType::Hamming, 100);
        let factor = window_correction_factor(&hamming);
        assert!(factor > 1.5 && factor < 2.5);
        assert!(window_power_correction_factor(&hamming) > 2.0);
    }
}
