//! Designed filters and their application to time series

use super::design::frequency_response;
use super::fast_fir::FastFirFilter;
use super::fir::FirFilter;
use super::iir::{bilinear_zpk, butter, buttord, zpk_to_sos, BandType, Zpk};
use crate::error::{Result, SpectralError};
use crate::series::TimeSeries;
use crate::spectrum::windowing::{detrend_in_place, Detrend};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// FIR filters longer than this are applied by FFT overlap-add
pub const FAST_FIR_THRESHOLD: usize = 128;

const FAST_FIR_BLOCK: usize = 4096;

/// Digital filter representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterForm {
    Zpk(Zpk),
    Ba { b: Vec<f64>, a: Vec<f64> },
    /// Second-order sections `[b0, b1, b2, a0, a1, a2]`
    Sos(Vec<[f64; 6]>),
}

/// A digital filter together with the sample rate it was designed for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCoefficients {
    form: FilterForm,
    sample_rate: f64,
}

impl FilterCoefficients {
    pub fn from_zpk(zpk: Zpk, sample_rate: f64) -> Self {
        Self { form: FilterForm::Zpk(zpk), sample_rate }
    }

    pub fn from_ba(b: Vec<f64>, a: Vec<f64>, sample_rate: f64) -> Result<Self> {
        match a.first() {
            Some(a0) if *a0 != 0.0 && !b.is_empty() => Ok(Self {
                form: FilterForm::Ba { b, a },
                sample_rate,
            }),
            _ => Err(SpectralError::InvalidArgument(
                "transfer function needs a numerator and a non-zero leading denominator".into(),
            )),
        }
    }

    pub fn from_sos(sections: Vec<[f64; 6]>, sample_rate: f64) -> Result<Self> {
        if sections.is_empty() || sections.iter().any(|s| s[3] == 0.0) {
            return Err(SpectralError::InvalidArgument(
                "second-order sections need a non-zero a0 in every section".into(),
            ));
        }
        Ok(Self { form: FilterForm::Sos(sections), sample_rate })
    }

    /// FIR taps as a `Ba` form with unit denominator
    pub fn fir(taps: Vec<f64>, sample_rate: f64) -> Result<Self> {
        Self::from_ba(taps, vec![1.0], sample_rate)
    }

    pub fn form(&self) -> &FilterForm {
        &self.form
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn zpk(&self) -> Option<&Zpk> {
        match &self.form {
            FilterForm::Zpk(zpk) => Some(zpk),
            _ => None,
        }
    }

    pub fn is_fir(&self) -> bool {
        matches!(&self.form, FilterForm::Ba { a, .. } if a.len() == 1)
    }

    /// Cascade form, when the filter is recursive
    pub fn to_sos(&self) -> Option<Vec<[f64; 6]>> {
        match &self.form {
            FilterForm::Zpk(zpk) => Some(zpk_to_sos(zpk)),
            FilterForm::Sos(sections) => Some(sections.clone()),
            FilterForm::Ba { .. } => None,
        }
    }

    fn check_rate(&self, rate: f64) -> Result<()> {
        if (rate - self.sample_rate).abs() > 1e-9 * self.sample_rate.abs() {
            return Err(SpectralError::SampleRateMismatch {
                expected: self.sample_rate,
                found: rate,
            });
        }
        Ok(())
    }

    /// Complex response at the given frequencies (Hz)
    pub fn response(&self, frequencies: &[f64]) -> Vec<Complex64> {
        let nyquist = self.sample_rate / 2.0;
        let normalized: Vec<f64> = frequencies.iter().map(|f| f / nyquist).collect();
        match &self.form {
            FilterForm::Zpk(zpk) => normalized
                .iter()
                .map(|w| {
                    let z = Complex64::from_polar(1.0, PI * w);
                    let num = zpk.zeros.iter().fold(Complex64::new(zpk.gain, 0.0), |acc, zero| acc * (z - zero));
                    zpk.poles.iter().fold(num, |acc, pole| acc / (z - pole))
                })
                .collect(),
            FilterForm::Ba { b, a } => frequency_response(b, &normalized)
                .into_iter()
                .zip(frequency_response(a, &normalized))
                .map(|(num, den)| num / den)
                .collect(),
            FilterForm::Sos(sections) => {
                let mut total = vec![Complex64::new(1.0, 0.0); normalized.len()];
                for s in sections {
                    let num = frequency_response(&s[..3], &normalized);
                    let den = frequency_response(&s[3..], &normalized);
                    for ((t, n), d) in total.iter_mut().zip(num).zip(den) {
                        *t *= n / d;
                    }
                }
                total
            }
        }
    }

    /// Causal filtering from rest
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        match &self.form {
            FilterForm::Ba { b, a } if a.len() == 1 => {
                let taps: Vec<f64> = b.iter().map(|c| c / a[0]).collect();
                if taps.len() > FAST_FIR_THRESHOLD {
                    FastFirFilter::new(taps, FAST_FIR_BLOCK).filter(data)
                } else {
                    FirFilter::new(taps).process_block(data)
                }
            }
            FilterForm::Ba { b, a } => lfilter(b, a, data, None),
            FilterForm::Zpk(zpk) => sosfilt(&zpk_to_sos(zpk), data, None),
            FilterForm::Sos(sections) => sosfilt(sections, data, None),
        }
    }

    /// Forward-backward (zero-phase) filtering with odd-extension padding
    pub fn apply_zero_phase(&self, data: &[f64]) -> Vec<f64> {
        match &self.form {
            FilterForm::Ba { b, a } => filtfilt(b, a, data),
            FilterForm::Zpk(zpk) => sosfiltfilt(&zpk_to_sos(zpk), data),
            FilterForm::Sos(sections) => sosfiltfilt(sections, data),
        }
    }
}

fn normalized_section(s: &[f64; 6]) -> ([f64; 3], [f64; 3]) {
    let a0 = s[3];
    ([s[0] / a0, s[1] / a0, s[2] / a0], [1.0, s[4] / a0, s[5] / a0])
}

/// Cascaded transposed direct-form II filtering
pub(crate) fn sosfilt(sections: &[[f64; 6]], data: &[f64], zi: Option<&[[f64; 2]]>) -> Vec<f64> {
    let mut signal = data.to_vec();
    for (index, section) in sections.iter().enumerate() {
        let (b, a) = normalized_section(section);
        let [mut z0, mut z1] = zi.and_then(|states| states.get(index).copied()).unwrap_or([0.0; 2]);
        for x in signal.iter_mut() {
            let input = *x;
            let y = b[0] * input + z0;
            z0 = b[1] * input - a[1] * y + z1;
            z1 = b[2] * input - a[2] * y;
            *x = y;
        }
    }
    signal
}

/// Per-section steady-state for a unit step input
pub(crate) fn sosfilt_zi(sections: &[[f64; 6]]) -> Vec<[f64; 2]> {
    let mut scale = 1.0;
    sections
        .iter()
        .map(|section| {
            let (b, a) = normalized_section(section);
            let a_sum: f64 = a.iter().sum();
            let gain = if a_sum.abs() > f64::EPSILON { b.iter().sum::<f64>() / a_sum } else { 0.0 };
            let z1 = b[2] - a[2] * gain;
            let z0 = b[1] - a[1] * gain + z1;
            let state = [z0 * scale, z1 * scale];
            scale *= gain;
            state
        })
        .collect()
}

fn padded_coefficients(b: &[f64], a: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = b.len().max(a.len());
    let a0 = a[0];
    let mut bn: Vec<f64> = b.iter().map(|c| c / a0).collect();
    let mut an: Vec<f64> = a.iter().map(|c| c / a0).collect();
    bn.resize(n, 0.0);
    an.resize(n, 0.0);
    (bn, an)
}

/// Transposed direct-form II filtering of a rational transfer function
pub(crate) fn lfilter(b: &[f64], a: &[f64], data: &[f64], zi: Option<&[f64]>) -> Vec<f64> {
    let (b, a) = padded_coefficients(b, a);
    let order = b.len() - 1;
    let mut z = match zi {
        Some(state) => state.to_vec(),
        None => vec![0.0; order],
    };
    z.resize(order, 0.0);

    data.iter()
        .map(|&x| {
            let y = b[0] * x + z.first().copied().unwrap_or(0.0);
            for k in 0..order {
                let next = if k + 1 < order { z[k + 1] } else { 0.0 };
                z[k] = b[k + 1] * x - a[k + 1] * y + next;
            }
            y
        })
        .collect()
}

/// Steady-state of [`lfilter`] for a unit step input
pub(crate) fn lfilter_zi(b: &[f64], a: &[f64]) -> Vec<f64> {
    let (b, a) = padded_coefficients(b, a);
    let order = b.len() - 1;
    let a_sum: f64 = a.iter().sum();
    let gain = if a_sum.abs() > f64::EPSILON { b.iter().sum::<f64>() / a_sum } else { 0.0 };
    let mut z = vec![0.0; order];
    for k in (0..order).rev() {
        let next = if k + 1 < order { z[k + 1] } else { 0.0 };
        z[k] = b[k + 1] - a[k + 1] * gain + next;
    }
    z
}

/// Odd extension by `padlen` samples at both ends
fn odd_extend(data: &[f64], padlen: usize) -> Vec<f64> {
    let n = data.len();
    let first = data[0];
    let last = data[n - 1];
    let mut out = Vec::with_capacity(n + 2 * padlen);
    out.extend((0..padlen).map(|i| 2.0 * first - data[padlen - i]));
    out.extend_from_slice(data);
    out.extend((0..padlen).map(|i| 2.0 * last - data[n - 2 - i]));
    out
}

fn zero_phase(data: &[f64], padlen: usize, run: impl Fn(&[f64]) -> Vec<f64>) -> Vec<f64> {
    if data.len() < 2 {
        return data.to_vec();
    }
    let padlen = padlen.min(data.len() - 1);
    let extended = odd_extend(data, padlen);
    let mut forward = run(&extended);
    forward.reverse();
    let mut backward = run(&forward);
    backward.reverse();
    backward[padlen..padlen + data.len()].to_vec()
}

fn sosfiltfilt(sections: &[[f64; 6]], data: &[f64]) -> Vec<f64> {
    let zi = sosfilt_zi(sections);
    let padlen = 3 * (2 * sections.len() + 1);
    zero_phase(data, padlen, |x| {
        let x0 = x[0];
        let scaled: Vec<[f64; 2]> = zi.iter().map(|[a, b]| [a * x0, b * x0]).collect();
        sosfilt(sections, x, Some(&scaled))
    })
}

fn filtfilt(b: &[f64], a: &[f64], data: &[f64]) -> Vec<f64> {
    let zi = lfilter_zi(b, a);
    let padlen = 3 * b.len().max(a.len());
    zero_phase(data, padlen, |x| {
        let x0 = x[0];
        let scaled: Vec<f64> = zi.iter().map(|z| z * x0).collect();
        lfilter(b, a, x, Some(&scaled))
    })
}

/// Units of analog zeros and poles passed to [`TimeSeries::zpk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalogUnit {
    /// Roots given as frequencies in Hz; scaled by `-2π`
    #[default]
    Hertz,
    /// Roots given directly in rad/s
    RadiansPerSecond,
}

/// Options for Butterworth high/low/band-pass filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButterworthConfig {
    /// Fixed order; chosen from `gpass`/`gstop` when unset
    pub order: Option<usize>,
    /// Maximum passband loss (dB)
    pub gpass: f64,
    /// Minimum stopband attenuation (dB)
    pub gstop: f64,
    /// Zero-phase forward-backward application
    pub filtfilt: bool,
}

impl Default for ButterworthConfig {
    fn default() -> Self {
        Self {
            order: None,
            gpass: 2.0,
            gstop: 30.0,
            filtfilt: true,
        }
    }
}

impl ButterworthConfig {
    fn design(&self, wp: &[f64], ws: &[f64], band: BandType) -> Result<Zpk> {
        let (order, wn) = match self.order {
            Some(order) => (order, wp.to_vec()),
            None => buttord(wp, ws, self.gpass, self.gstop)?,
        };
        log::debug!("butterworth {band:?} order {order} edges {wn:?}");
        butter(order, &wn, band)
    }
}

impl TimeSeries {
    /// Causal filtering; the result keeps this series' metadata
    pub fn filter(&self, coefficients: &FilterCoefficients) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        coefficients.check_rate(self.sample_rate())?;
        Ok(self.with_data(coefficients.apply(self.data())))
    }

    /// Zero-phase (forward-backward) filtering
    pub fn filtfilt(&self, coefficients: &FilterCoefficients) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        coefficients.check_rate(self.sample_rate())?;
        Ok(self.with_data(coefficients.apply_zero_phase(self.data())))
    }

    /// Causal filtering that overwrites this series' samples
    ///
    /// Discouraged while other code still reads this series; prefer
    /// [`TimeSeries::filter`].
    pub fn filter_in_place(&mut self, coefficients: &FilterCoefficients) -> Result<()> {
        self.check_sample_rate()?;
        coefficients.check_rate(self.sample_rate())?;
        let filtered = coefficients.apply(self.data());
        self.data_mut().copy_from_slice(&filtered);
        Ok(())
    }

    /// Apply an analog zero-pole-gain filter, discretised with the
    /// bilinear transform at this series' sample rate
    pub fn zpk(&self, zeros: &[f64], poles: &[f64], gain: f64, unit: AnalogUnit) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        let scale = match unit {
            AnalogUnit::Hertz => -2.0 * PI,
            AnalogUnit::RadiansPerSecond => 1.0,
        };
        let analog = Zpk::new(
            zeros.iter().map(|z| Complex64::new(z * scale, 0.0)).collect(),
            poles.iter().map(|p| Complex64::new(p * scale, 0.0)).collect(),
            gain,
        );
        let digital = bilinear_zpk(&analog, self.sample_rate());
        self.filter(&FilterCoefficients::from_zpk(digital, self.sample_rate()))
    }

    fn butterworth(&self, wp: &[f64], ws: &[f64], band: BandType, config: &ButterworthConfig) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        let coefficients = FilterCoefficients::from_zpk(config.design(wp, ws, band)?, self.sample_rate());
        if config.filtfilt {
            self.filtfilt(&coefficients)
        } else {
            self.filter(&coefficients)
        }
    }

    /// Remove content below `frequency` (Hz); stop edge at half of it
    pub fn highpass(&self, frequency: f64, config: &ButterworthConfig) -> Result<TimeSeries> {
        let nyquist = self.sample_rate() / 2.0;
        self.butterworth(&[frequency / nyquist], &[frequency / 2.0 / nyquist], BandType::Highpass, config)
    }

    /// Remove content above `frequency` (Hz); stop edge at 1.5 times it
    pub fn lowpass(&self, frequency: f64, config: &ButterworthConfig) -> Result<TimeSeries> {
        let nyquist = self.sample_rate() / 2.0;
        let stop = (1.5 * frequency).min(nyquist * 0.999_999);
        self.butterworth(&[frequency / nyquist], &[stop / nyquist], BandType::Lowpass, config)
    }

    /// Keep content between `flow` and `fhigh` (Hz)
    pub fn bandpass(&self, flow: f64, fhigh: f64, config: &ButterworthConfig) -> Result<TimeSeries> {
        let nyquist = self.sample_rate() / 2.0;
        let stop_high = (1.5 * fhigh).min(nyquist * 0.999_999);
        self.butterworth(
            &[flow / nyquist, fhigh / nyquist],
            &[flow / 2.0 / nyquist, stop_high / nyquist],
            BandType::Bandpass,
            config,
        )
    }

    /// Whole-series trend removal
    pub fn detrend(&self, kind: Detrend) -> TimeSeries {
        let mut data = self.data().to_vec();
        detrend_in_place(&mut data, kind);
        self.with_data(data)
    }
}
