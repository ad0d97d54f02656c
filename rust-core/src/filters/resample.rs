//! Sample-rate conversion by low-order rational ratios

use super::design::design_lowpass_fir;
use super::fast_fir::FastFirFilter;
use super::windows::WindowType;
use crate::error::{Result, SpectralError};
use crate::series::TimeSeries;
use num_complex::Complex64;
use rubato::{FftFixedInOut, Resampler};
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

/// Largest numerator/denominator accepted after reduction
pub const MAX_RATIO_TERM: usize = 1024;

const POLYPHASE_CHUNK: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleMethod {
    /// FIR decimation for integer down-factors, rubato otherwise
    #[default]
    Polyphase,
    /// Spectrum truncation or zero-padding of the whole series
    Fourier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResampleConfig {
    pub method: ResampleMethod,
    /// Anti-alias window for integer decimation
    pub window: WindowType,
    /// Anti-alias filter length for integer decimation
    pub numtaps: usize,
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            method: ResampleMethod::Polyphase,
            window: WindowType::Hamming,
            numtaps: 61,
        }
    }
}

/// Reduced `(up, down)` with `to / from == up / down`
pub fn rational_ratio(from: f64, to: f64) -> Result<(usize, usize)> {
    if !(from > 0.0 && from.is_finite() && to > 0.0 && to.is_finite()) {
        return Err(SpectralError::UnsupportedRate(format!("cannot resample from {from} Hz to {to} Hz")));
    }
    let ratio = to / from;
    for down in 1..=MAX_RATIO_TERM {
        let up = (ratio * down as f64).round();
        if up < 1.0 || up > MAX_RATIO_TERM as f64 {
            continue;
        }
        if (up - ratio * down as f64).abs() <= 1e-9 * up {
            return Ok((up as usize, down));
        }
    }
    Err(SpectralError::UnsupportedRate(format!(
        "{from} Hz -> {to} Hz is not a ratio of integers up to {MAX_RATIO_TERM}"
    )))
}

/// `floor(len * up / down)` without floating-point rounding
fn output_length(len: usize, up: usize, down: usize) -> usize {
    ((len as u128 * up as u128) / down as u128) as usize
}

fn decimate(data: &[f64], factor: usize, n_out: usize, config: &ResampleConfig) -> Result<Vec<f64>> {
    let taps = design_lowpass_fir(1.0 / factor as f64, config.numtaps, config.window)?;
    let block = data.len().clamp(1, 1 << 16);
    let smoothed = FastFirFilter::new(taps, block).convolve_same(data);
    Ok(smoothed.into_iter().step_by(factor).take(n_out).collect())
}

fn polyphase(data: &[f64], up: usize, down: usize, n_out: usize) -> Result<Vec<f64>> {
    let mut resampler = FftFixedInOut::<f64>::new(down, up, POLYPHASE_CHUNK, 1)
        .map_err(|e| SpectralError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();
    let mut output: Vec<f64> = Vec::with_capacity(n_out + delay + POLYPHASE_CHUNK);
    let mut position = 0;

    while output.len() < n_out + delay {
        let needed = resampler.input_frames_next();
        let mut chunk = vec![0.0; needed];
        if position < data.len() {
            let take = needed.min(data.len() - position);
            chunk[..take].copy_from_slice(&data[position..position + take]);
        }
        position += needed;
        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| SpectralError::Resample(e.to_string()))?;
        match frames.first() {
            Some(channel) if !channel.is_empty() => output.extend_from_slice(channel),
            _ => return Err(SpectralError::Resample("resampler produced no output".into())),
        }
    }

    output.drain(..delay);
    output.truncate(n_out);
    Ok(output)
}

/// Band-limited resampling of the whole series in the frequency domain
fn fourier(data: &[f64], num: usize) -> Vec<f64> {
    let nx = data.len();
    if num == 0 || nx == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let mut spectrum: Vec<Complex64> = data.iter().map(|&x| Complex64::new(x, 0.0)).collect();
    planner.plan_fft_forward(nx).process(&mut spectrum);

    let n = num.min(nx);
    let nyq = n / 2 + 1;
    let mut resized = vec![Complex64::new(0.0, 0.0); num];
    resized[..nyq].copy_from_slice(&spectrum[..nyq]);
    if n > 2 {
        let negative = n - nyq;
        resized[num - negative..].copy_from_slice(&spectrum[nx - negative..]);
    }
    // Split or fold the Nyquist bin of the shorter transform
    if n % 2 == 0 {
        if num < nx {
            resized[num - n / 2] += spectrum[nx - n / 2];
        } else if nx < num {
            resized[n / 2] *= 0.5;
            resized[num - n / 2] = resized[n / 2];
        }
    }

    planner.plan_fft_inverse(num).process(&mut resized);
    resized.iter().map(|c| c.re / nx as f64).collect()
}

/// Resample to `rate` Hz
///
/// The output holds `floor(N * rate / sample_rate)` samples and keeps the
/// epoch, unit, channel and name; its sample rate is exactly `rate`.
pub fn resample(series: &TimeSeries, rate: f64, config: &ResampleConfig) -> Result<TimeSeries> {
    series.require_samples("resample")?;
    let (up, down) = rational_ratio(series.sample_rate(), rate)?;
    let n_out = output_length(series.len(), up, down);
    log::debug!(
        "resampling {} samples {} Hz -> {rate} Hz (up {up}, down {down}, {n_out} out)",
        series.len(),
        series.sample_rate()
    );

    let data = if up == down {
        series.data().to_vec()
    } else {
        match config.method {
            ResampleMethod::Fourier => fourier(series.data(), n_out),
            ResampleMethod::Polyphase if up == 1 => decimate(series.data(), down, n_out, config)?,
            ResampleMethod::Polyphase => polyphase(series.data(), up, down, n_out)?,
        }
    };

    let mut out = series.with_data(data);
    out.set_sample_rate(rate);
    Ok(out)
}

impl TimeSeries {
    /// Resample with default options; see [`resample`]
    pub fn resample(&self, rate: f64) -> Result<TimeSeries> {
        resample(self, rate, &ResampleConfig::default())
    }

    pub fn resample_with(&self, rate: f64, config: &ResampleConfig) -> Result<TimeSeries> {
        resample(self, rate, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / rate).sin()).collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    #[test]
    fn test_rational_ratio() {
        assert_eq!(rational_ratio(1000.0, 100.0).unwrap(), (1, 10));
        assert_eq!(rational_ratio(100.0, 250.0).unwrap(), (5, 2));
        assert_eq!(rational_ratio(16384.0, 4096.0).unwrap(), (1, 4));
        assert_eq!(rational_ratio(44100.0, 48000.0).unwrap(), (160, 147));
        assert!(matches!(rational_ratio(1000.0, 997.3), Err(SpectralError::UnsupportedRate(_))));
        assert!(matches!(rational_ratio(1000.0, 0.0), Err(SpectralError::UnsupportedRate(_))));
    }

    #[test]
    fn test_decimate_by_ten() {
        let rate = 1000.0;
        let series = TimeSeries::new(sine(5.0, rate, 4005), rate).with_epoch(12.5);
        let out = series.resample(rate / 10.0).unwrap();
        assert_eq!(out.sample_rate(), rate / 10.0);
        assert_eq!(out.len(), 400);
        assert_eq!(out.epoch(), 12.5);
        // Low-frequency tone passes unchanged and in phase
        let expected = sine(5.0, 100.0, 400);
        for i in 20..380 {
            assert!((out.data()[i] - expected[i]).abs() < 0.01, "sample {i}");
        }
    }

    #[test]
    fn test_decimation_removes_aliases() {
        let rate = 1000.0;
        // 430 Hz would alias to 30 Hz at 100 Hz
        let series = TimeSeries::new(sine(430.0, rate, 4000), rate);
        let out = series.resample(100.0).unwrap();
        assert!(rms(&out.data()[20..380]) < 0.01, "alias rms {}", rms(&out.data()[20..380]));
    }

    #[test]
    fn test_polyphase_upsample() {
        let series = TimeSeries::new(sine(3.0, 100.0, 1001), 100.0);
        let out = series.resample(250.0).unwrap();
        assert_eq!(out.len(), 2502);
        assert_eq!(out.sample_rate(), 250.0);
        let amplitude = rms(&out.data()[250..2250]) * 2f64.sqrt();
        assert!((amplitude - 1.0).abs() < 0.02, "amplitude {amplitude}");
    }

    #[test]
    fn test_fourier_upsample_is_exact_for_periodic_tone() {
        let series = TimeSeries::new(sine(2.0, 64.0, 64), 64.0);
        let config = ResampleConfig {
            method: ResampleMethod::Fourier,
            ..ResampleConfig::default()
        };
        let out = series.resample_with(128.0, &config).unwrap();
        let expected = sine(2.0, 128.0, 128);
        assert_eq!(out.len(), 128);
        for (a, b) in out.data().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fourier_downsample() {
        let series = TimeSeries::new(sine(2.0, 64.0, 64), 64.0);
        let config = ResampleConfig {
            method: ResampleMethod::Fourier,
            ..ResampleConfig::default()
        };
        let out = series.resample_with(16.0, &config).unwrap();
        let expected = sine(2.0, 16.0, 16);
        for (a, b) in out.data().iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_same_rate_is_copy() {
        let series = TimeSeries::new(vec![1.0, 2.0, 3.0], 10.0);
        assert_eq!(series.resample(10.0).unwrap(), series);
    }

    #[test]
    fn test_empty_series_rejected() {
        let series = TimeSeries::new(Vec::new(), 10.0);
        assert!(matches!(series.resample(5.0), Err(SpectralError::EmptySeries(_))));
    }
}
