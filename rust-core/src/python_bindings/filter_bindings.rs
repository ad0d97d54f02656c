//! Python bindings for filter design

use crate::filters::{self, NotchConfig, NotchKind, WindowType};
use num_complex::Complex64;
use numpy::PyArray1;
use pyo3::prelude::*;

/// Window type enum exposed to Python
#[pyclass(name = "WindowType")]
#[derive(Clone)]
pub enum PyWindowType {
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl From<PyWindowType> for WindowType {
    fn from(py_win: PyWindowType) -> Self {
        match py_win {
            PyWindowType::Hann => WindowType::Hann,
            PyWindowType::Hamming => WindowType::Hamming,
            PyWindowType::Blackman => WindowType::Blackman,
            PyWindowType::Rectangular => WindowType::Rectangular,
        }
    }
}

/// Design a notch filter
///
/// Args:
///     frequency: Notch frequency in Hz
///     sample_rate: Sample rate in Hz
///     kind: "iir" (only supported design) or "fir"
///     q: Optional quality factor for a second-order resonant notch
///
/// Returns:
///     (zeros, poles, gain) of the digital filter
#[pyfunction]
#[pyo3(signature = (frequency, sample_rate, kind="iir", q=None))]
pub fn create_notch<'py>(
    py: Python<'py>,
    frequency: f64,
    sample_rate: f64,
    kind: &str,
    q: Option<f64>,
) -> PyResult<(&'py PyArray1<Complex64>, &'py PyArray1<Complex64>, f64)> {
    let mut config = NotchConfig::default().kind(kind.parse::<NotchKind>()?);
    config.q = q;
    let coefficients = filters::create_notch(frequency, sample_rate, &config)?;
    let zpk = coefficients
        .zpk()
        .cloned()
        .ok_or_else(|| pyo3::exceptions::PyRuntimeError::new_err("notch design is not in zpk form"))?;
    Ok((
        PyArray1::from_vec(py, zpk.zeros),
        PyArray1::from_vec(py, zpk.poles),
        zpk.gain,
    ))
}
