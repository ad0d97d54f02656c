//! PyO3 bindings for Python integration

use pyo3::exceptions::{PyIOError, PyNotImplementedError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::SpectralError;

mod filter_bindings;
mod timeseries_bindings;

impl From<SpectralError> for PyErr {
    fn from(err: SpectralError) -> PyErr {
        let message = err.to_string();
        match err {
            SpectralError::NotImplemented(_) => PyNotImplementedError::new_err(message),
            SpectralError::Io(_) => PyIOError::new_err(message),
            SpectralError::MissingData { .. }
            | SpectralError::Fft(_)
            | SpectralError::Resample(_)
            | SpectralError::WorkerPool(_) => PyRuntimeError::new_err(message),
            _ => PyValueError::new_err(message),
        }
    }
}

/// Python module definition
#[pymodule]
fn gwspectra(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<timeseries_bindings::PyTimeSeries>()?;
    m.add_class::<filter_bindings::PyWindowType>()?;
    m.add_function(wrap_pyfunction!(filter_bindings::create_notch, m)?)?;
    Ok(())
}
