//! Narrow band-stop (notch) filters for line removal

use super::coefficients::FilterCoefficients;
use super::iir::{ellip, ellipord, BandType, Zpk};
use crate::error::{Result, SpectralError};
use crate::series::{Hertz, TimeSeries};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Half-width of the pass edges around the notch (Hz)
const PASS_HALF_WIDTH: f64 = 1.0;
/// Half-width of the stop edges around the notch (Hz)
const STOP_HALF_WIDTH: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotchKind {
    #[default]
    Iir,
    /// Not supported; requests fail with `NotImplemented`
    Fir,
}

impl FromStr for NotchKind {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iir" => Ok(NotchKind::Iir),
            "fir" => Ok(NotchKind::Fir),
            other => Err(SpectralError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for NotchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotchKind::Iir => "iir",
            NotchKind::Fir => "fir",
        })
    }
}

/// Notch design options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotchConfig {
    pub kind: NotchKind,
    /// Quality factor; selects the second-order resonant design
    pub q: Option<f64>,
    /// Passband ripple of the elliptic design (dB)
    pub gpass: f64,
    /// Stopband attenuation of the elliptic design (dB)
    pub gstop: f64,
    /// Zero-phase application in [`TimeSeries::notch`]
    pub filtfilt: bool,
}

impl Default for NotchConfig {
    fn default() -> Self {
        Self {
            kind: NotchKind::Iir,
            q: None,
            gpass: 1.0,
            gstop: 10.0,
            filtfilt: true,
        }
    }
}

impl NotchConfig {
    pub fn kind(mut self, kind: NotchKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn q(mut self, q: f64) -> Self {
        self.q = Some(q);
        self
    }
}

/// Second-order notch of quality `q` at Nyquist-normalised `w0`
fn resonant_notch(w0: f64, q: f64) -> Result<Zpk> {
    if !(q > 0.0) {
        return Err(SpectralError::InvalidArgument(format!("notch quality factor must be positive, got {q}")));
    }
    let w0 = PI * w0;
    let bandwidth = w0 / q;
    let gain = 1.0 / (1.0 + (bandwidth / 2.0).tan());

    let zero = Complex64::from_polar(1.0, w0);
    // Roots of z^2 - 2g cos(w0) z + (2g - 1)
    let centre = gain * w0.cos();
    let disc = Complex64::new(centre * centre - (2.0 * gain - 1.0), 0.0).sqrt();
    let poles = vec![centre + disc, centre - disc];
    Ok(Zpk::new(vec![zero, zero.conj()], poles, gain))
}

/// Design an IIR notch at `frequency` for data sampled at `sample_rate`
///
/// Both arguments accept bare numbers (Hz) or [`Hertz`] quantities.
/// The default design is a first-order elliptic band-stop with pass
/// edges at ±1 Hz and stop edges at ±0.1 Hz.
pub fn create_notch(
    frequency: impl Into<Hertz>,
    sample_rate: impl Into<Hertz>,
    config: &NotchConfig,
) -> Result<FilterCoefficients> {
    let frequency = frequency.into().value();
    let sample_rate = sample_rate.into().value();
    if config.kind == NotchKind::Fir {
        return Err(SpectralError::NotImplemented("FIR notch filters".into()));
    }
    let nyquist = sample_rate / 2.0;
    if !(sample_rate > 0.0) || !(frequency > 0.0 && frequency < nyquist) {
        return Err(SpectralError::InvalidArgument(format!(
            "notch at {frequency} Hz is not inside (0, {nyquist}) Hz"
        )));
    }

    let zpk = match config.q {
        Some(q) => resonant_notch(frequency / nyquist, q)?,
        None => {
            let wp = [(frequency - PASS_HALF_WIDTH) / nyquist, (frequency + PASS_HALF_WIDTH) / nyquist];
            let ws = [(frequency - STOP_HALF_WIDTH) / nyquist, (frequency + STOP_HALF_WIDTH) / nyquist];
            let (order, wn) = ellipord(&wp, &ws, config.gpass, config.gstop)?;
            log::debug!("notch at {frequency} Hz: elliptic order {order}, edges {wn:?}");
            ellip(order, config.gpass, config.gstop, &wn, BandType::Bandstop)?
        }
    };
    Ok(FilterCoefficients::from_zpk(zpk, sample_rate))
}

impl TimeSeries {
    /// Remove a narrow line at `frequency` (Hz)
    pub fn notch(&self, frequency: impl Into<Hertz>, config: &NotchConfig) -> Result<TimeSeries> {
        self.check_sample_rate()?;
        let coefficients = create_notch(frequency, self.sample_rate(), config)?;
        if config.filtfilt {
            self.filtfilt(&coefficients)
        } else {
            self.filter(&coefficients)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(roots: &[Complex64], re: f64, im: f64) -> bool {
        roots.iter().any(|r| (r.re - re).abs() < 1e-7 && (r.im - im).abs() < 1e-7)
    }

    #[test]
    fn test_notch_60hz_reference() {
        let notch = create_notch(60.0, 16384.0, &NotchConfig::default()).unwrap();
        let zpk = notch.zpk().unwrap();
        assert_eq!(zpk.zeros.len(), 2);
        assert_eq!(zpk.poles.len(), 2);
        assert!(contains(&zpk.zeros, 0.99973536, 0.02300468));
        assert!(contains(&zpk.zeros, 0.99973536, -0.02300468));
        assert!(contains(&zpk.poles, 0.99954635, 0.02299956));
        assert!(contains(&zpk.poles, 0.99954635, -0.02299956));
        assert!((zpk.gain - 0.99981094420429639).abs() < 1e-9, "gain {}", zpk.gain);
    }

    #[test]
    fn test_notch_accepts_quantities() {
        let bare = create_notch(60.0, 16384.0, &NotchConfig::default()).unwrap();
        let tagged = create_notch(Hertz(60.0), Hertz(16384.0), &NotchConfig::default()).unwrap();
        assert_eq!(bare, tagged);
    }

    #[test]
    fn test_fir_notch_not_implemented() {
        let config = NotchConfig::default().kind(NotchKind::Fir);
        assert!(matches!(
            create_notch(60.0, 16384.0, &config),
            Err(SpectralError::NotImplemented(_))
        ));
        assert_eq!("FIR".parse::<NotchKind>().unwrap(), NotchKind::Fir);
    }

    #[test]
    fn test_notch_out_of_band_rejected() {
        assert!(create_notch(9000.0, 16384.0, &NotchConfig::default()).is_err());
        assert!(create_notch(-1.0, 16384.0, &NotchConfig::default()).is_err());
    }

    #[test]
    fn test_resonant_notch_response() {
        let notch = create_notch(50.0, 1000.0, &NotchConfig::default().q(30.0)).unwrap();
        let response = notch.response(&[0.0, 50.0, 250.0]);
        assert!((response[0].norm() - 1.0).abs() < 1e-9);
        assert!(response[1].norm() < 1e-9);
        assert!((response[2].norm() - 1.0).abs() < 0.01);
        let zpk = notch.zpk().unwrap();
        assert!(zpk.poles.iter().all(|p| p.norm() < 1.0));
    }

    #[test]
    fn test_notch_removes_line() {
        let rate = 1024.0;
        let n = 8192;
        let data: Vec<f64> = (0..n)
            .map(|i| {
                let t = i as f64 / rate;
                (2.0 * PI * 60.0 * t).sin() + 0.5 * (2.0 * PI * 200.0 * t).sin()
            })
            .collect();
        let series = TimeSeries::new(data, rate);
        let out = series.notch(60.0, &NotchConfig::default().q(10.0)).unwrap();
        let spectrum = out.crop(1.0, 7.0).unwrap().fft(None).unwrap();
        let df = spectrum.df();
        let at = |f: f64| spectrum.data()[(f / df).round() as usize].norm();
        assert!(at(60.0) < 0.01, "residual line {}", at(60.0));
        assert!((at(200.0) - 0.5).abs() < 0.05, "tone {}", at(200.0));
    }
}
