//! Real-input FFT engine and the per-segment spectral transform
//!
//! The engine owns reusable plans and buffers, so one engine per worker
//! thread transforms any number of equally sized segments without
//! reallocating.

use super::windowing::{apply_window_inplace, detrend_in_place, Detrend};
use crate::error::{Result, SpectralError};
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Normalisation of a one-sided power estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scaling {
    /// Power spectral density, units²/Hz: `1 / (fs Σw²)`
    #[default]
    Density,
    /// Power spectrum, units²: `1 / (Σw)²`
    Spectrum,
}

/// Per-bin normalisation applied after the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Normalization {
    Power(Scaling),
    /// Raw amplitude: `1 / nfft`, non-DC bins doubled
    Amplitude,
}

/// Per-bin scale factors for a one-sided spectrum of `window.len()` points
///
/// Power bins other than DC (and Nyquist for even lengths) are doubled to
/// fold in the negative frequencies.
pub(crate) fn one_sided_scale(window: &[f64], normalization: Normalization, sample_rate: f64) -> Vec<f64> {
    let nfft = window.len();
    let nbins = nfft / 2 + 1;
    match normalization {
        Normalization::Power(scaling) => {
            let base = match scaling {
                Scaling::Density => {
                    let sum_sq: f64 = window.iter().map(|w| w * w).sum();
                    1.0 / (sample_rate * sum_sq)
                }
                Scaling::Spectrum => {
                    let sum: f64 = window.iter().sum();
                    1.0 / (sum * sum)
                }
            };
            (0..nbins)
                .map(|k| {
                    let nyquist = nfft % 2 == 0 && k == nfft / 2;
                    if k == 0 || nyquist {
                        base
                    } else {
                        2.0 * base
                    }
                })
                .collect()
        }
        Normalization::Amplitude => {
            let base = 1.0 / nfft as f64;
            (0..nbins)
                .map(|k| if k == 0 { base } else { 2.0 * base })
                .collect()
        }
    }
}

/// FFT engine for real-valued signals
pub struct FftEngine {
    fft_size: usize,
    r2c: Arc<dyn RealToComplex<f64>>,
    c2r: Arc<dyn ComplexToReal<f64>>,
    input_buffer: Vec<f64>,
    output_buffer: Vec<Complex64>,
    spectrum_buffer: Vec<Complex64>,
    time_buffer: Vec<f64>,
}

impl FftEngine {
    /// Create new FFT engine
    ///
    /// # Arguments
    /// * `fft_size` - FFT size (number of samples)
    pub fn new(fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f64>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let c2r = planner.plan_fft_inverse(fft_size);
        let nbins = fft_size / 2 + 1;

        Self {
            fft_size,
            r2c,
            c2r,
            input_buffer: vec![0.0; fft_size],
            output_buffer: vec![Complex64::new(0.0, 0.0); nbins],
            spectrum_buffer: vec![Complex64::new(0.0, 0.0); nbins],
            time_buffer: vec![0.0; fft_size],
        }
    }

    /// Forward transform (unnormalised)
    ///
    /// # Arguments
    /// * `signal` - Input signal, zero-padded or truncated to `fft_size`
    ///
    /// # Returns
    /// Complex bins X[k] for k = 0..=fft_size/2
    pub fn transform(&mut self, signal: &[f64]) -> Result<&[Complex64]> {
        let copy_len = signal.len().min(self.fft_size);
        self.input_buffer[..copy_len].copy_from_slice(&signal[..copy_len]);
        self.input_buffer[copy_len..].fill(0.0);

        self.r2c
            .process(&mut self.input_buffer, &mut self.output_buffer)?;
        Ok(&self.output_buffer)
    }

    /// Inverse transform (unnormalised: the result is `fft_size` times the
    /// original signal)
    ///
    /// Imaginary parts of the DC and Nyquist bins are ignored.
    pub fn inverse(&mut self, spectrum: &[Complex64]) -> Result<&[f64]> {
        if spectrum.len() != self.num_bins() {
            return Err(SpectralError::Fft(format!(
                "expected {} bins, got {}",
                self.num_bins(),
                spectrum.len()
            )));
        }
        self.spectrum_buffer.copy_from_slice(spectrum);
        self.spectrum_buffer[0].im = 0.0;
        if self.fft_size % 2 == 0 {
            if let Some(last) = self.spectrum_buffer.last_mut() {
                last.im = 0.0;
            }
        }
        self.c2r
            .process(&mut self.spectrum_buffer, &mut self.time_buffer)?;
        Ok(&self.time_buffer)
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of one-sided frequency bins (fft_size/2 + 1)
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frequency axis in Hz
    pub fn frequency_axis(&self, sample_rate: f64) -> Vec<f64> {
        let df = sample_rate / self.fft_size as f64;
        (0..self.num_bins()).map(|bin| bin as f64 * df).collect()
    }
}

/// Detrend, taper, transform and normalise one segment at a time
///
/// Segment length is fixed by the window. Auto- and cross-power go
/// through the same transform so that `cross(x, x)` reproduces
/// `power(x)` exactly in its real part.
pub struct SegmentTransform {
    engine: FftEngine,
    window: Vec<f64>,
    detrend: Detrend,
    scale: Vec<f64>,
    work: Vec<f64>,
    held: Vec<Complex64>,
    power: Vec<f64>,
    complex: Vec<Complex64>,
}

impl SegmentTransform {
    pub(crate) fn new(window: Vec<f64>, detrend: Detrend, normalization: Normalization, sample_rate: f64) -> Self {
        let nfft = window.len();
        let engine = FftEngine::new(nfft);
        let nbins = engine.num_bins();
        let scale = one_sided_scale(&window, normalization, sample_rate);
        Self {
            engine,
            window,
            detrend,
            scale,
            work: vec![0.0; nfft],
            held: vec![Complex64::new(0.0, 0.0); nbins],
            power: vec![0.0; nbins],
            complex: vec![Complex64::new(0.0, 0.0); nbins],
        }
    }

    pub fn segment_length(&self) -> usize {
        self.window.len()
    }

    pub fn num_bins(&self) -> usize {
        self.engine.num_bins()
    }

    pub fn window(&self) -> &[f64] {
        &self.window
    }

    fn raw(&mut self, segment: &[f64]) -> Result<&[Complex64]> {
        if segment.len() != self.window.len() {
            return Err(SpectralError::InvalidArgument(format!(
                "segment has {} samples, transform expects {}",
                segment.len(),
                self.window.len()
            )));
        }
        self.work.copy_from_slice(segment);
        detrend_in_place(&mut self.work, self.detrend);
        apply_window_inplace(&mut self.work, &self.window);
        self.engine.transform(&self.work)
    }

    /// Scaled one-sided power `|X[k]|² · s[k]`
    pub fn power(&mut self, segment: &[f64]) -> Result<&[f64]> {
        self.raw(segment)?;
        let spectrum = &self.engine.output_buffer;
        for ((p, x), s) in self.power.iter_mut().zip(spectrum.iter()).zip(self.scale.iter()) {
            *p = x.norm_sqr() * s;
        }
        Ok(&self.power)
    }

    /// Scaled one-sided cross power `conj(X[k]) · Y[k] · s[k]`
    pub fn cross(&mut self, a: &[f64], b: &[f64]) -> Result<&[Complex64]> {
        self.raw(a)?;
        self.held.copy_from_slice(&self.engine.output_buffer);
        self.raw(b)?;
        let spectrum = &self.engine.output_buffer;
        for (((c, x), y), s) in self
            .complex
            .iter_mut()
            .zip(self.held.iter())
            .zip(spectrum.iter())
            .zip(self.scale.iter())
        {
            *c = (x.conj() * y) * *s;
        }
        Ok(&self.complex)
    }

    /// Scaled complex spectrum `X[k] · s[k]`
    pub fn amplitude(&mut self, segment: &[f64]) -> Result<&[Complex64]> {
        self.raw(segment)?;
        let spectrum = &self.engine.output_buffer;
        for ((c, x), s) in self.complex.iter_mut().zip(spectrum.iter()).zip(self.scale.iter()) {
            *c = x * *s;
        }
        Ok(&self.complex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_fft_dc_signal() {
        let mut fft = FftEngine::new(1024);
        let signal = vec![1.0; 100];
        let spectrum = fft.transform(&signal).unwrap();
        assert!((spectrum[0].re - 100.0).abs() < 1e-9);
        assert!(spectrum[300].norm() < 100.0);
    }

    #[test]
    fn test_fft_sine_wave() {
        let mut fft = FftEngine::new(1024);
        let signal: Vec<f64> = (0..1024)
            .map(|n| (2.0 * PI * 64.0 * n as f64 / 1024.0).sin())
            .collect();
        let spectrum = fft.transform(&signal).unwrap();
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, 64);
        assert!((spectrum[64].norm() - 512.0).abs() < 1e-6);
    }

    #[test]
    fn test_inverse_round_trip() {
        let mut fft = FftEngine::new(16);
        let signal: Vec<f64> = (0..16).map(|n| (n as f64 * 0.3).cos() + 0.1 * n as f64).collect();
        let spectrum = fft.transform(&signal).unwrap().to_vec();
        let restored = fft.inverse(&spectrum).unwrap();
        for (a, b) in signal.iter().zip(restored.iter()) {
            assert!((a - b / 16.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_frequency_axis() {
        let fft = FftEngine::new(1024);
        let freqs = fft.frequency_axis(2048.0);
        assert_eq!(freqs.len(), 513);
        assert_eq!(freqs[0], 0.0);
        assert_eq!(freqs[512], 1024.0);
    }

    #[test]
    fn test_one_sided_scale_even_and_odd() {
        let even = one_sided_scale(&[1.0; 8], Normalization::Power(Scaling::Spectrum), 1.0);
        assert_eq!(even.len(), 5);
        assert_eq!(even[0], 1.0 / 64.0);
        assert_eq!(even[1], 2.0 / 64.0);
        assert_eq!(even[4], 1.0 / 64.0);

        let odd = one_sided_scale(&[1.0; 7], Normalization::Power(Scaling::Density), 2.0);
        assert_eq!(odd.len(), 4);
        assert_eq!(odd[0], 1.0 / 14.0);
        assert_eq!(odd[3], 2.0 / 14.0);
    }

    #[test]
    fn test_cross_of_identical_segments_matches_power() {
        let window = crate::filters::windows::generate_periodic_window(
            crate::filters::windows::WindowType::Hann,
            32,
        );
        let mut transform = SegmentTransform::new(window, Detrend::Constant, Normalization::Power(Scaling::Density), 32.0);
        let segment: Vec<f64> = (0..32).map(|n| ((n * n) % 7) as f64 - 3.0).collect();
        let power = transform.power(&segment).unwrap().to_vec();
        let cross = transform.cross(&segment, &segment).unwrap().to_vec();
        for (p, c) in power.iter().zip(cross.iter()) {
            assert_eq!(*p, c.re);
            assert_eq!(c.im, 0.0);
        }
    }

    #[test]
    fn test_segment_length_checked() {
        let mut transform = SegmentTransform::new(vec![1.0; 8], Detrend::None, Normalization::Amplitude, 1.0);
        assert!(transform.power(&[1.0; 7]).is_err());
    }
}
