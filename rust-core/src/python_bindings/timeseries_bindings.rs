//! Python bindings for time-series spectral analysis

use super::filter_bindings::PyWindowType;
use crate::filters::{NotchConfig, WhitenConfig};
use crate::series::{TimeSeries, Unit};
use crate::spectrum::{Method, SpectralConfig, SpectrogramConfig, VarianceConfig, Window};
use num_complex::Complex64;
use numpy::{PyArray1, PyArray2, PyReadonlyArray1};
use pyo3::prelude::*;

type Spectrum<'py, T> = (&'py PyArray1<f64>, &'py PyArray1<T>);

fn spectral_config(
    fftlength: Option<f64>,
    overlap: Option<f64>,
    method: &str,
    window: Option<PyWindowType>,
) -> PyResult<SpectralConfig> {
    Ok(SpectralConfig::from_options(fftlength, overlap, method, window.map(Into::into))?)
}

/// Evenly sampled time series
#[pyclass(name = "TimeSeries")]
pub struct PyTimeSeries {
    inner: TimeSeries,
}

#[pymethods]
impl PyTimeSeries {
    #[new]
    #[pyo3(signature = (data, sample_rate, epoch=0.0, unit=None, name=None))]
    fn new(
        data: PyReadonlyArray1<f64>,
        sample_rate: f64,
        epoch: f64,
        unit: Option<&str>,
        name: Option<String>,
    ) -> PyResult<Self> {
        let mut inner = TimeSeries::new(data.as_slice()?.to_vec(), sample_rate).with_epoch(epoch);
        inner.check_sample_rate()?;
        if let Some(unit) = unit {
            inner = inner.with_unit(Unit::named(unit));
        }
        if let Some(name) = name {
            inner = inner.with_name(name);
        }
        Ok(Self { inner })
    }

    #[getter]
    fn sample_rate(&self) -> f64 {
        self.inner.sample_rate()
    }

    #[getter]
    fn epoch(&self) -> f64 {
        self.inner.epoch()
    }

    #[getter]
    fn unit(&self) -> String {
        self.inner.unit().to_string()
    }

    #[getter]
    fn name(&self) -> Option<String> {
        self.inner.name().map(str::to_string)
    }

    /// Sample values as a numpy array
    #[getter]
    fn value<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        PyArray1::from_slice(py, self.inner.data())
    }

    fn times<'py>(&self, py: Python<'py>) -> &'py PyArray1<f64> {
        PyArray1::from_vec(py, self.inner.times())
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Averaged power spectral density
    ///
    /// Returns:
    ///     (frequencies, psd)
    #[pyo3(signature = (fftlength=None, overlap=None, method=Method::DEFAULT_NAME, window=None))]
    fn psd<'py>(
        &self,
        py: Python<'py>,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, f64>> {
        let config = spectral_config(fftlength, overlap, method, window)?;
        let spectrum = py.allow_threads(|| self.inner.psd(&config))?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    /// Averaged amplitude spectral density
    #[pyo3(signature = (fftlength=None, overlap=None, method=Method::DEFAULT_NAME, window=None))]
    fn asd<'py>(
        &self,
        py: Python<'py>,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, f64>> {
        let config = spectral_config(fftlength, overlap, method, window)?;
        let spectrum = py.allow_threads(|| self.inner.asd(&config))?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    /// Cross spectral density against `other`
    ///
    /// Methods other than welch/bartlett log a precision warning and
    /// fall back to welch.
    #[pyo3(signature = (other, fftlength=None, overlap=None, method=Method::DEFAULT_NAME, window=None))]
    fn csd<'py>(
        &self,
        py: Python<'py>,
        other: &PyTimeSeries,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, Complex64>> {
        let config = spectral_config(fftlength, overlap, method, window)?;
        let spectrum = py.allow_threads(|| self.inner.csd(&other.inner, &config))?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    /// Averaged spectrogram with one row per `stride` seconds
    ///
    /// Returns:
    ///     2D array of shape (rows, frequencies)
    #[pyo3(signature = (stride, fftlength=None, overlap=None, method=Method::DEFAULT_NAME, window=None, nproc=1))]
    #[allow(clippy::too_many_arguments)]
    fn spectrogram<'py>(
        &self,
        py: Python<'py>,
        stride: f64,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<PyWindowType>,
        nproc: usize,
    ) -> PyResult<&'py PyArray2<f64>> {
        let config = SpectrogramConfig::new(spectral_config(fftlength, overlap, method, window)?).nproc(nproc);
        let gram = py.allow_threads(|| self.inner.spectrogram(stride, &config))?;
        Ok(PyArray2::from_owned_array(py, gram.data().clone()))
    }

    /// Spectrogram reusing segments shared between neighbouring rows
    ///
    /// `stride` must be a whole number of segment strides.
    #[pyo3(signature = (stride, fftlength=None, overlap=None, method=Method::DEFAULT_NAME, window=None))]
    fn spectrogram2<'py>(
        &self,
        py: Python<'py>,
        stride: f64,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        window: Option<PyWindowType>,
    ) -> PyResult<&'py PyArray2<f64>> {
        let config = SpectrogramConfig::new(spectral_config(fftlength, overlap, method, window)?);
        let gram = py.allow_threads(|| self.inner.spectrogram2(stride, &config))?;
        Ok(PyArray2::from_owned_array(py, gram.data().clone()))
    }

    /// Magnitude-squared coherence against `other`
    #[pyo3(signature = (other, fftlength=None, overlap=None, window=None))]
    fn coherence<'py>(
        &self,
        py: Python<'py>,
        other: &PyTimeSeries,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, f64>> {
        let config = spectral_config(fftlength, overlap, Method::DEFAULT_NAME, window)?;
        let spectrum = py.allow_threads(|| self.inner.coherence(&other.inner, &config))?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    /// Coherence between this series and itself shifted by `dt` seconds
    #[pyo3(signature = (dt, fftlength=None, overlap=None, window=None))]
    fn auto_coherence<'py>(
        &self,
        py: Python<'py>,
        dt: f64,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, f64>> {
        let config = spectral_config(fftlength, overlap, Method::DEFAULT_NAME, window)?;
        let spectrum = py.allow_threads(|| self.inner.auto_coherence(dt, &config))?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    #[pyo3(signature = (other, stride, fftlength=None, overlap=None, window=None, nproc=1))]
    #[allow(clippy::too_many_arguments)]
    fn coherence_spectrogram<'py>(
        &self,
        py: Python<'py>,
        other: &PyTimeSeries,
        stride: f64,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        window: Option<PyWindowType>,
        nproc: usize,
    ) -> PyResult<&'py PyArray2<f64>> {
        let config = SpectrogramConfig::new(spectral_config(fftlength, overlap, Method::DEFAULT_NAME, window)?)
            .nproc(nproc);
        let gram = py.allow_threads(|| self.inner.coherence_spectrogram(&other.inner, stride, &config))?;
        Ok(PyArray2::from_owned_array(py, gram.data().clone()))
    }

    /// Per-frequency histogram of ASD amplitudes
    ///
    /// Returns:
    ///     (bin edges, counts of shape (frequencies, bins))
    #[pyo3(signature = (stride, fftlength=None, overlap=None, method=Method::DEFAULT_NAME, nbins=500, low=None, high=None, log=false, norm=false, density=false))]
    #[allow(clippy::too_many_arguments)]
    fn spectral_variance<'py>(
        &self,
        py: Python<'py>,
        stride: f64,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        method: &str,
        nbins: usize,
        low: Option<f64>,
        high: Option<f64>,
        log: bool,
        norm: bool,
        density: bool,
    ) -> PyResult<(&'py PyArray1<f64>, &'py PyArray2<f64>)> {
        let config = SpectrogramConfig::new(spectral_config(fftlength, overlap, method, None)?);
        let bins = VarianceConfig {
            low,
            high,
            nbins,
            log,
            norm,
            density,
            ..VarianceConfig::default()
        };
        let variance = py.allow_threads(|| self.inner.spectral_variance(stride, &config, &bins))?;
        Ok((
            PyArray1::from_slice(py, variance.bins()),
            PyArray2::from_owned_array(py, variance.counts().clone()),
        ))
    }

    /// Whole-series one-sided FFT
    #[pyo3(signature = (nfft=None))]
    fn fft<'py>(&self, py: Python<'py>, nfft: Option<usize>) -> PyResult<Spectrum<'py, Complex64>> {
        let spectrum = self.inner.fft(nfft)?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    /// Mean of per-segment FFTs
    #[pyo3(signature = (fftlength=None, overlap=None, window=None))]
    fn average_fft<'py>(
        &self,
        py: Python<'py>,
        fftlength: Option<f64>,
        overlap: Option<f64>,
        window: Option<PyWindowType>,
    ) -> PyResult<Spectrum<'py, Complex64>> {
        let window = window.map(|w| Window::Named(w.into()));
        let spectrum = self.inner.average_fft(fftlength, overlap, window.as_ref())?;
        Ok((PyArray1::from_vec(py, spectrum.frequencies()), PyArray1::from_vec(py, spectrum.into_data())))
    }

    #[pyo3(signature = (fftlength=2.0, overlap=None, method=Method::DEFAULT_NAME))]
    fn whiten(&self, py: Python<'_>, fftlength: f64, overlap: Option<f64>, method: &str) -> PyResult<PyTimeSeries> {
        let mut config = WhitenConfig::default().method(method.parse::<Method>()?);
        config.fftlength = fftlength;
        config.overlap = overlap;
        let inner = py.allow_threads(|| self.inner.whiten(&config))?;
        Ok(PyTimeSeries { inner })
    }

    /// Remove a narrow line at `frequency` Hz
    #[pyo3(signature = (frequency, q=None, filtfilt=true))]
    fn notch(&self, py: Python<'_>, frequency: f64, q: Option<f64>, filtfilt: bool) -> PyResult<PyTimeSeries> {
        let mut config = NotchConfig::default();
        config.q = q;
        config.filtfilt = filtfilt;
        let inner = py.allow_threads(|| self.inner.notch(frequency, &config))?;
        Ok(PyTimeSeries { inner })
    }

    fn resample(&self, py: Python<'_>, rate: f64) -> PyResult<PyTimeSeries> {
        let inner = py.allow_threads(|| self.inner.resample(rate))?;
        Ok(PyTimeSeries { inner })
    }

    fn __repr__(&self) -> String {
        format!(
            "TimeSeries(len={}, sample_rate={}, epoch={}, unit='{}')",
            self.inner.len(),
            self.inner.sample_rate(),
            self.inner.epoch(),
            self.inner.unit()
        )
    }
}
