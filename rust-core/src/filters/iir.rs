//! IIR filter design in zero-pole-gain form
//!
//! Analog low-pass prototypes are frequency-transformed and mapped to the
//! z-plane with the bilinear transform. Digital band edges are
//! normalised to the Nyquist frequency (`0 < w < 1`).

use crate::error::{Result, SpectralError};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Zeros, poles and overall gain of a rational transfer function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    pub fn new(zeros: Vec<Complex64>, poles: Vec<Complex64>, gain: f64) -> Self {
        Self { zeros, poles, gain }
    }

    /// Excess of poles over zeros
    pub fn degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }
}

/// Frequency-band shape of a design
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BandType {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
}

fn product(values: impl Iterator<Item = Complex64>) -> Complex64 {
    values.fold(Complex64::new(1.0, 0.0), |acc, v| acc * v)
}

/// Analog Butterworth prototype of order `n` (cutoff 1 rad/s)
pub fn butter_prototype(order: usize) -> Zpk {
    let n = order as i64;
    let poles = (0..order as i64)
        .map(|i| {
            let m = (-n + 1 + 2 * i) as f64;
            -Complex64::from_polar(1.0, PI * m / (2.0 * order as f64))
        })
        .collect();
    Zpk::new(Vec::new(), poles, 1.0)
}

/// Analog elliptic prototype with `rp` dB passband ripple
///
/// Only the first-order design is supported; the stopband attenuation
/// `_rs` does not enter a first-order design.
pub fn ellip_prototype(order: usize, rp: f64, _rs: f64) -> Result<Zpk> {
    match order {
        0 => Ok(Zpk::new(Vec::new(), Vec::new(), 10f64.powf(-rp / 20.0))),
        1 => {
            let eps = (10f64.powf(0.1 * rp) - 1.0).sqrt();
            let pole = -1.0 / eps;
            Ok(Zpk::new(Vec::new(), vec![Complex64::new(pole, 0.0)], -pole))
        }
        n => Err(SpectralError::NotImplemented(format!(
            "elliptic designs of order {n} (only first-order elliptic filters are supported)"
        ))),
    }
}

/// Scale the cutoff of a low-pass prototype to `wo` rad/s
pub fn lp2lp_zpk(zpk: &Zpk, wo: f64) -> Zpk {
    let degree = zpk.degree() as i32;
    Zpk::new(
        zpk.zeros.iter().map(|z| z * wo).collect(),
        zpk.poles.iter().map(|p| p * wo).collect(),
        zpk.gain * wo.powi(degree),
    )
}

/// Low-pass prototype to high-pass with cutoff `wo` rad/s
pub fn lp2hp_zpk(zpk: &Zpk, wo: f64) -> Zpk {
    let degree = zpk.degree();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|z| wo / z).collect();
    let poles: Vec<Complex64> = zpk.poles.iter().map(|p| wo / p).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    let gain = zpk.gain
        * (product(zpk.zeros.iter().map(|z| -z)) / product(zpk.poles.iter().map(|p| -p))).re;
    Zpk::new(zeros, poles, gain)
}

fn split_roots(scaled: &[Complex64], wo: f64) -> Vec<Complex64> {
    let plus = scaled.iter().map(|r| r + (r * r - wo * wo).sqrt());
    let minus = scaled.iter().map(|r| r - (r * r - wo * wo).sqrt());
    plus.chain(minus).collect()
}

/// Low-pass prototype to band-pass centred on `wo` with width `bw` (rad/s)
pub fn lp2bp_zpk(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.degree();
    let z_lp: Vec<Complex64> = zpk.zeros.iter().map(|z| z * (bw / 2.0)).collect();
    let p_lp: Vec<Complex64> = zpk.poles.iter().map(|p| p * (bw / 2.0)).collect();
    let mut zeros = split_roots(&z_lp, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    Zpk::new(zeros, split_roots(&p_lp, wo), zpk.gain * bw.powi(degree as i32))
}

/// Low-pass prototype to band-stop centred on `wo` with width `bw` (rad/s)
pub fn lp2bs_zpk(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.degree();
    let z_hp: Vec<Complex64> = zpk.zeros.iter().map(|z| (bw / 2.0) / z).collect();
    let p_hp: Vec<Complex64> = zpk.poles.iter().map(|p| (bw / 2.0) / p).collect();
    let mut zeros = split_roots(&z_hp, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, wo)).take(degree));
    zeros.extend(std::iter::repeat(Complex64::new(0.0, -wo)).take(degree));
    let gain = zpk.gain
        * (product(zpk.zeros.iter().map(|z| -z)) / product(zpk.poles.iter().map(|p| -p))).re;
    Zpk::new(zeros, split_roots(&p_hp, wo), gain)
}

/// Bilinear transform of an analog design at sample rate `fs`
///
/// Zeros at infinity map to `z = -1`.
pub fn bilinear_zpk(zpk: &Zpk, fs: f64) -> Zpk {
    let fs2 = 2.0 * fs;
    let degree = zpk.degree();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|z| (fs2 + z) / (fs2 - z)).collect();
    let poles: Vec<Complex64> = zpk.poles.iter().map(|p| (fs2 + p) / (fs2 - p)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let gain = zpk.gain
        * (product(zpk.zeros.iter().map(|z| fs2 - z)) / product(zpk.poles.iter().map(|p| fs2 - p))).re;
    Zpk::new(zeros, poles, gain)
}

fn check_edges(wn: &[f64], band: BandType) -> Result<()> {
    let expected = match band {
        BandType::Lowpass | BandType::Highpass => 1,
        BandType::Bandpass | BandType::Bandstop => 2,
    };
    if wn.len() != expected {
        return Err(SpectralError::InvalidArgument(format!(
            "{band:?} designs need {expected} band edge(s), got {}",
            wn.len()
        )));
    }
    if wn.iter().any(|w| !(*w > 0.0 && *w < 1.0)) {
        return Err(SpectralError::InvalidArgument(format!(
            "digital band edges must lie strictly between 0 and Nyquist, got {wn:?}"
        )));
    }
    if expected == 2 && wn[0] >= wn[1] {
        return Err(SpectralError::InvalidArgument(format!(
            "band edges must be increasing, got {wn:?}"
        )));
    }
    Ok(())
}

/// Digital filter from an analog prototype and Nyquist-normalised edges
pub fn iirfilter(prototype: &Zpk, wn: &[f64], band: BandType) -> Result<Zpk> {
    check_edges(wn, band)?;
    // Pre-warp for the bilinear transform at fs = 2
    let warped: Vec<f64> = wn.iter().map(|w| 4.0 * (PI * w / 2.0).tan()).collect();
    let analog = match band {
        BandType::Lowpass => lp2lp_zpk(prototype, warped[0]),
        BandType::Highpass => lp2hp_zpk(prototype, warped[0]),
        BandType::Bandpass => lp2bp_zpk(prototype, (warped[0] * warped[1]).sqrt(), warped[1] - warped[0]),
        BandType::Bandstop => lp2bs_zpk(prototype, (warped[0] * warped[1]).sqrt(), warped[1] - warped[0]),
    };
    Ok(bilinear_zpk(&analog, 2.0))
}

/// Digital Butterworth design
pub fn butter(order: usize, wn: &[f64], band: BandType) -> Result<Zpk> {
    if order == 0 {
        return Err(SpectralError::InvalidArgument("filter order must be positive".into()));
    }
    iirfilter(&butter_prototype(order), wn, band)
}

/// Digital elliptic design (first order only)
pub fn ellip(order: usize, rp: f64, rs: f64, wn: &[f64], band: BandType) -> Result<Zpk> {
    iirfilter(&ellip_prototype(order, rp, rs)?, wn, band)
}

fn classify(wp: &[f64], ws: &[f64]) -> Result<BandType> {
    match (wp, ws) {
        ([p], [s]) if p < s => Ok(BandType::Lowpass),
        ([_], [_]) => Ok(BandType::Highpass),
        ([p0, p1], [s0, s1]) if p0 < p1 && s0 < s1 => {
            if p0 >= s0 {
                Ok(BandType::Bandpass)
            } else {
                Ok(BandType::Bandstop)
            }
        }
        _ => Err(SpectralError::InvalidArgument(format!(
            "mismatched pass {wp:?} and stop {ws:?} band edges"
        ))),
    }
}

fn prewarp(edges: &[f64]) -> Vec<f64> {
    edges.iter().map(|w| (PI * w / 2.0).tan()).collect()
}

fn bandstop_nat(passb: &[f64], stopb: &[f64]) -> f64 {
    stopb
        .iter()
        .map(|s| (s * (passb[0] - passb[1]) / (s * s - passb[0] * passb[1])).abs())
        .fold(f64::INFINITY, f64::min)
}

fn bandpass_nat(passb: &[f64], stopb: &[f64]) -> f64 {
    stopb
        .iter()
        .map(|s| ((s * s - passb[0] * passb[1]) / (s * (passb[0] - passb[1]))).abs())
        .fold(f64::INFINITY, f64::min)
}

/// Complete elliptic integral of the first kind, `K(m)`, via the
/// arithmetic-geometric mean
pub(crate) fn ellipk(m: f64) -> f64 {
    if m >= 1.0 {
        return f64::INFINITY;
    }
    let mut a = 1.0;
    let mut b = (1.0 - m.max(0.0)).sqrt();
    for _ in 0..64 {
        if (a - b).abs() <= f64::EPSILON * a {
            break;
        }
        let next = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = next;
    }
    PI / (2.0 * a)
}

fn ellip_order(nat: f64, gpass: f64, gstop: f64) -> f64 {
    let gs = 10f64.powf(0.1 * gstop);
    let gp = 10f64.powf(0.1 * gpass);
    let arg1 = ((gp - 1.0) / (gs - 1.0)).sqrt();
    let arg0 = 1.0 / nat;
    let d0 = (ellipk(arg0 * arg0), ellipk(1.0 - arg0 * arg0));
    let d1 = (ellipk(arg1 * arg1), ellipk(1.0 - arg1 * arg1));
    d0.0 * d1.1 / (d0.1 * d1.0)
}

fn butter_order(nat: f64, gpass: f64, gstop: f64) -> f64 {
    let gs = 10f64.powf(0.1 * gstop);
    let gp = 10f64.powf(0.1 * gpass);
    ((gs - 1.0) / (gp - 1.0)).log10() / (2.0 * nat.log10())
}

/// Bounded scalar minimisation (Brent's method with golden-section
/// fallback) on `[lower, upper]`
pub(crate) fn fminbound(f: impl Fn(f64) -> f64, lower: f64, upper: f64, xatol: f64, maxfun: usize) -> f64 {
    let sqrt_eps = 2.2e-16_f64.sqrt();
    let golden_mean = 0.5 * (3.0 - 5f64.sqrt());
    let (mut a, mut b) = (lower, upper);
    let mut fulc = a + golden_mean * (b - a);
    let mut nfc = fulc;
    let mut xf = fulc;
    let mut rat = 0.0_f64;
    let mut e = 0.0_f64;
    let mut fx = f(xf);
    let mut num = 1;
    let mut ffulc = fx;
    let mut fnfc = fx;
    let mut xm = 0.5 * (a + b);
    let mut tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
    let mut tol2 = 2.0 * tol1;

    let sign = |v: f64| -> f64 {
        if v > 0.0 {
            1.0
        } else if v < 0.0 {
            -1.0
        } else {
            1.0
        }
    };

    while (xf - xm).abs() > tol2 - 0.5 * (b - a) {
        let mut golden = true;
        if e.abs() > tol1 {
            golden = false;
            let mut r = (xf - nfc) * (fx - ffulc);
            let mut q = (xf - fulc) * (fx - fnfc);
            let mut p = (xf - fulc) * q - (xf - nfc) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            }
            q = q.abs();
            r = e;
            e = rat;

            if p.abs() < (0.5 * q * r).abs() && p > q * (a - xf) && p < q * (b - xf) {
                rat = p / q;
                let x = xf + rat;
                if (x - a) < tol2 || (b - x) < tol2 {
                    rat = tol1 * sign(xm - xf);
                }
            } else {
                golden = true;
            }
        }
        if golden {
            e = if xf >= xm { a - xf } else { b - xf };
            rat = golden_mean * e;
        }

        let x = xf + sign(rat) * rat.abs().max(tol1);
        let fu = f(x);
        num += 1;

        if fu <= fx {
            if x >= xf {
                a = xf;
            } else {
                b = xf;
            }
            fulc = nfc;
            ffulc = fnfc;
            nfc = xf;
            fnfc = fx;
            xf = x;
            fx = fu;
        } else {
            if x < xf {
                a = x;
            } else {
                b = x;
            }
            if fu <= fnfc || nfc == xf {
                fulc = nfc;
                ffulc = fnfc;
                nfc = x;
                fnfc = fu;
            } else if fu <= ffulc || fulc == xf || fulc == nfc {
                fulc = x;
                ffulc = fu;
            }
        }

        xm = 0.5 * (a + b);
        tol1 = sqrt_eps * xf.abs() + xatol / 3.0;
        tol2 = 2.0 * tol1;

        if num >= maxfun {
            log::debug!("fminbound stopped after {num} evaluations");
            break;
        }
    }
    xf
}

/// Minimum elliptic order meeting the pass/stop band requirements
///
/// Returns the order and the Nyquist-normalised natural edges. Band-stop
/// pass edges are first moved as close to the stop band as the order
/// allows.
pub fn ellipord(wp: &[f64], ws: &[f64], gpass: f64, gstop: f64) -> Result<(usize, Vec<f64>)> {
    let band = classify(wp, ws)?;
    let mut passb = prewarp(wp);
    let stopb = prewarp(ws);

    let nat = match band {
        BandType::Lowpass => stopb[0] / passb[0],
        BandType::Highpass => passb[0] / stopb[0],
        BandType::Bandstop => {
            for index in 0..2 {
                let (lo, hi) = if index == 0 {
                    (passb[0], stopb[0] - 1e-12)
                } else {
                    (stopb[1] + 1e-12, passb[1])
                };
                let current = passb.clone();
                let objective = |edge: f64| {
                    let mut trial = current.clone();
                    trial[index] = edge;
                    ellip_order(bandstop_nat(&trial, &stopb), gpass, gstop)
                };
                passb[index] = fminbound(objective, lo, hi, 1e-5, 500);
            }
            bandstop_nat(&passb, &stopb)
        }
        BandType::Bandpass => bandpass_nat(&passb, &stopb),
    };

    let order = ellip_order(nat, gpass, gstop).ceil();
    if !order.is_finite() || order < 1.0 {
        return Err(SpectralError::InvalidArgument(format!(
            "cannot satisfy pass {wp:?} / stop {ws:?} with {gpass} dB / {gstop} dB"
        )));
    }
    let wn = passb.iter().map(|p| p.atan() * 2.0 / PI).collect();
    Ok((order as usize, wn))
}

/// Minimum Butterworth order meeting the pass/stop band requirements
///
/// Returns the order and the Nyquist-normalised 3 dB edges.
pub fn buttord(wp: &[f64], ws: &[f64], gpass: f64, gstop: f64) -> Result<(usize, Vec<f64>)> {
    let band = classify(wp, ws)?;
    let passb = prewarp(wp);
    let stopb = prewarp(ws);

    let nat = match band {
        BandType::Lowpass => stopb[0] / passb[0],
        BandType::Highpass => passb[0] / stopb[0],
        BandType::Bandpass => bandpass_nat(&passb, &stopb),
        BandType::Bandstop => bandstop_nat(&passb, &stopb),
    };
    let order = butter_order(nat, gpass, gstop).ceil();
    if !order.is_finite() || order < 1.0 {
        return Err(SpectralError::InvalidArgument(format!(
            "cannot satisfy pass {wp:?} / stop {ws:?} with {gpass} dB / {gstop} dB"
        )));
    }

    let gp = 10f64.powf(0.1 * gpass);
    let w0 = (gp - 1.0).powf(-1.0 / (2.0 * order));
    let natural: Vec<f64> = match band {
        BandType::Lowpass => vec![w0 * passb[0]],
        BandType::Highpass => vec![passb[0] / w0],
        BandType::Bandpass => {
            let half = w0 * (passb[1] - passb[0]) / 2.0;
            let mut edges: Vec<f64> = [-half, half]
                .iter()
                .map(|w| (w + (w * w + passb[0] * passb[1]).sqrt()).abs())
                .collect();
            edges.sort_by(|a, b| a.total_cmp(b));
            edges
        }
        BandType::Bandstop => {
            let half = (passb[1] - passb[0]) / (2.0 * w0);
            let mut edges: Vec<f64> = [-half, half]
                .iter()
                .map(|w| (w + (w * w + passb[0] * passb[1]).sqrt()).abs())
                .collect();
            edges.sort_by(|a, b| a.total_cmp(b));
            edges
        }
    };
    let wn = natural.iter().map(|w| w.atan() * 2.0 / PI).collect();
    Ok((order as usize, wn))
}

fn is_real(root: &Complex64) -> bool {
    root.im.abs() <= 1e-10 * root.norm().max(1.0)
}

/// Group roots into conjugate (or real) pairs, padding with the origin
fn pair_roots(roots: &[Complex64]) -> Vec<(Complex64, Complex64)> {
    let origin = Complex64::new(0.0, 0.0);
    let mut pairs: Vec<(Complex64, Complex64)> = roots
        .iter()
        .filter(|r| !is_real(r) && r.im > 0.0)
        .map(|r| (*r, r.conj()))
        .collect();
    let mut reals: Vec<f64> = roots.iter().filter(|r| is_real(r)).map(|r| r.re).collect();
    reals.sort_by(|a, b| a.total_cmp(b));
    for chunk in reals.chunks(2) {
        let first = Complex64::new(chunk[0], 0.0);
        let second = chunk.get(1).map_or(origin, |r| Complex64::new(*r, 0.0));
        pairs.push((first, second));
    }
    pairs
}

fn quadratic(pair: (Complex64, Complex64)) -> [f64; 3] {
    [1.0, -(pair.0 + pair.1).re, (pair.0 * pair.1).re]
}

/// Convert to cascaded second-order sections `[b0, b1, b2, a0, a1, a2]`
///
/// Poles nearest the unit circle go in the last section; each pole pair
/// takes the nearest remaining zero pair. The gain is folded into the
/// first section.
pub fn zpk_to_sos(zpk: &Zpk) -> Vec<[f64; 6]> {
    let origin = Complex64::new(0.0, 0.0);
    let mut zero_pairs = pair_roots(&zpk.zeros);
    let mut pole_pairs = pair_roots(&zpk.poles);
    let nsections = zero_pairs.len().max(pole_pairs.len()).max(1);
    zero_pairs.resize(nsections, (origin, origin));
    pole_pairs.resize(nsections, (origin, origin));

    // Closest to the unit circle first; reversed at the end
    pole_pairs.sort_by(|a, b| b.0.norm().total_cmp(&a.0.norm()));

    let mut sections: Vec<[f64; 6]> = Vec::with_capacity(nsections);
    for poles in pole_pairs {
        let nearest = zero_pairs
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (a.0 - poles.0).norm().total_cmp(&(b.0 - poles.0).norm()))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let zeros = zero_pairs.swap_remove(nearest);
        let b = quadratic(zeros);
        let a = quadratic(poles);
        sections.push([b[0], b[1], b[2], a[0], a[1], a[2]]);
    }
    sections.reverse();

    if let Some(first) = sections.first_mut() {
        for coeff in first.iter_mut().take(3) {
            *coeff *= zpk.gain;
        }
    }
    sections
}

/// Expand roots into monic polynomial coefficients (highest power first)
pub(crate) fn poly(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for root in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * root;
        }
        coeffs = next;
    }
    coeffs.iter().map(|c| c.re).collect()
}

/// Transfer-function numerator and denominator
pub fn zpk_to_ba(zpk: &Zpk) -> (Vec<f64>, Vec<f64>) {
    let b = poly(&zpk.zeros).iter().map(|c| c * zpk.gain).collect();
    (b, poly(&zpk.poles))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Complex64, re: f64, im: f64, tol: f64) -> bool {
        (a.re - re).abs() < tol && (a.im - im).abs() < tol
    }

    #[test]
    fn test_ellipk_reference_values() {
        assert!((ellipk(0.0) - PI / 2.0).abs() < 1e-15);
        assert!((ellipk(0.5) - 1.854_074_677_301_372).abs() < 1e-13);
        assert!(ellipk(1.0).is_infinite());
    }

    #[test]
    fn test_fminbound_parabola() {
        let x = fminbound(|x| (x - 0.3).powi(2) + 1.0, -1.0, 2.0, 1e-8, 500);
        assert!((x - 0.3).abs() < 1e-6);
        // Minimum on the boundary
        let x = fminbound(|x| x, 1.0, 3.0, 1e-5, 500);
        assert!((x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_butter_prototype_poles_on_unit_circle() {
        let proto = butter_prototype(4);
        assert_eq!(proto.poles.len(), 4);
        for p in &proto.poles {
            assert!((p.norm() - 1.0).abs() < 1e-12);
            assert!(p.re < 0.0);
        }
    }

    #[test]
    fn test_bilinear_maps_left_half_plane_inside_unit_circle() {
        let analog = Zpk::new(Vec::new(), vec![Complex64::new(-10.0, 5.0), Complex64::new(-10.0, -5.0)], 125.0);
        let digital = bilinear_zpk(&analog, 100.0);
        assert_eq!(digital.zeros.len(), 2);
        assert!(digital.zeros.iter().all(|z| close(*z, -1.0, 0.0, 1e-15)));
        assert!(digital.poles.iter().all(|p| p.norm() < 1.0));
    }

    #[test]
    fn test_butter_lowpass_unity_dc_gain() {
        let zpk = butter(3, &[0.25], BandType::Lowpass).unwrap();
        let (b, a) = zpk_to_ba(&zpk);
        let dc = b.iter().sum::<f64>() / a.iter().sum::<f64>();
        assert!((dc - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_buttord_lowpass() {
        // Classic textbook case: pass 0.2, stop 0.3, 3 dB / 40 dB
        let (order, wn) = buttord(&[0.2], &[0.3], 3.0, 40.0).unwrap();
        assert_eq!(order, 11);
        assert!(wn[0] > 0.2 && wn[0] < 0.3);
    }

    #[test]
    fn test_ellipord_notch_is_first_order() {
        let nyq = 8192.0;
        let wp = [59.0 / nyq, 61.0 / nyq];
        let ws = [59.9 / nyq, 60.1 / nyq];
        let (order, wn) = ellipord(&wp, &ws, 1.0, 10.0).unwrap();
        assert_eq!(order, 1);
        assert!(wn[0] > wp[0] && wn[0] < ws[0]);
        assert!(wn[1] > ws[1] && wn[1] < wp[1]);
    }

    #[test]
    fn test_higher_order_elliptic_not_implemented() {
        assert!(matches!(ellip_prototype(3, 1.0, 40.0), Err(SpectralError::NotImplemented(_))));
    }

    #[test]
    fn test_zpk_to_sos_pairs_conjugates() {
        let zpk = Zpk::new(
            vec![Complex64::new(0.0, 1.0), Complex64::new(0.0, -1.0), Complex64::new(-1.0, 0.0)],
            vec![
                Complex64::new(0.5, 0.5),
                Complex64::new(0.5, -0.5),
                Complex64::new(0.9, 0.0),
            ],
            2.0,
        );
        let sos = zpk_to_sos(&zpk);
        assert_eq!(sos.len(), 2);
        // Gain in the first section only
        assert_eq!(sos[0][0], 2.0);
        assert_eq!(sos[1][0], 1.0);
        for section in &sos {
            assert_eq!(section[3], 1.0);
        }
        // Real pole 0.9 (closest to the unit circle) ends up last
        assert!((sos[1][4] + 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_poly_expansion() {
        let coeffs = poly(&[Complex64::new(1.0, 0.0), Complex64::new(2.0, 0.0)]);
        assert_eq!(coeffs, vec![1.0, -3.0, 2.0]);
        let conj = poly(&[Complex64::new(0.0, 1.0), Complex64::new(0.0, -1.0)]);
        assert_eq!(conj, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_band_edges_validated() {
        assert!(butter(2, &[1.5], BandType::Lowpass).is_err());
        assert!(butter(2, &[0.4, 0.2], BandType::Bandpass).is_err());
        assert!(butter(2, &[0.2], BandType::Bandpass).is_err());
    }
}
