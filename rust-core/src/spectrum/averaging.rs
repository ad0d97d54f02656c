//! Combination of per-segment spectra into a single estimate
//!
//! Built-in methods are the arithmetic mean (Welch, Bartlett), the
//! bias-corrected median and the median-mean of even/odd segments.
//! Further methods are registered by name in a process-wide table.

use crate::error::{Result, SpectralError};
use crate::series::Unit;
use ndarray::{ArrayView1, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Named averaging method
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    /// Mean of overlapping segments
    #[default]
    Welch,
    /// Mean of non-overlapping segments (overlap forced to zero)
    Bartlett,
    /// Bias-corrected median
    Median,
    /// Mean of the even- and odd-segment medians
    MedianMean,
    /// Method from the registry
    Plugin(String),
}

impl Method {
    /// Name of the default method, as accepted by `FromStr`
    pub const DEFAULT_NAME: &'static str = "welch";

    /// Linear (mean) averaging, the only kind valid for complex cross-spectra
    pub fn is_linear(&self) -> bool {
        matches!(self, Method::Welch | Method::Bartlett)
    }

    pub fn forces_zero_overlap(&self) -> bool {
        matches!(self, Method::Bartlett)
    }

    /// Look up the averaging implementation
    pub fn resolve(&self) -> Result<Average> {
        match self {
            Method::Welch | Method::Bartlett => Ok(Average::Mean),
            Method::Median => Ok(Average::Median),
            Method::MedianMean => Ok(Average::MedianMean),
            Method::Plugin(name) => lookup_method(name)
                .map(Average::Plugin)
                .ok_or_else(|| SpectralError::UnknownMethod(name.clone())),
        }
    }
}

impl FromStr for Method {
    type Err = SpectralError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase().replace('_', "-");
        match name.as_str() {
            "welch" | "mean" => Ok(Method::Welch),
            "bartlett" => Ok(Method::Bartlett),
            "median" => Ok(Method::Median),
            "median-mean" => Ok(Method::MedianMean),
            other if lookup_method(other).is_some() => Ok(Method::Plugin(other.to_string())),
            _ => Err(SpectralError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Welch => f.write_str("welch"),
            Method::Bartlett => f.write_str("bartlett"),
            Method::Median => f.write_str("median"),
            Method::MedianMean => f.write_str("median-mean"),
            Method::Plugin(name) => f.write_str(name),
        }
    }
}

/// Pluggable reduction of a `(segments, bins)` power array to one spectrum
pub trait Averager: Send + Sync {
    fn combine(&self, powers: ArrayView2<'_, f64>) -> Result<Vec<f64>>;

    /// Unit of the result given the unit of the segment powers
    fn output_unit(&self, power_unit: &Unit) -> Unit {
        power_unit.clone()
    }
}

/// Resolved averaging implementation
#[derive(Clone)]
pub enum Average {
    Mean,
    Median,
    MedianMean,
    Plugin(Arc<dyn Averager>),
}

impl fmt::Debug for Average {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Average::Mean => f.write_str("Mean"),
            Average::Median => f.write_str("Median"),
            Average::MedianMean => f.write_str("MedianMean"),
            Average::Plugin(_) => f.write_str("Plugin(..)"),
        }
    }
}

impl Average {
    pub fn combine(&self, powers: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        match self {
            Average::Mean => mean_power(powers),
            Average::Median => median_power(powers),
            Average::MedianMean => median_mean_power(powers),
            Average::Plugin(averager) => averager.combine(powers),
        }
    }

    pub fn output_unit(&self, power_unit: &Unit) -> Unit {
        match self {
            Average::Plugin(averager) => averager.output_unit(power_unit),
            _ => power_unit.clone(),
        }
    }
}

fn require_segments(powers: &ArrayView2<'_, impl Sized>, needed: usize, method: &str) -> Result<()> {
    let have = powers.nrows();
    if have < needed {
        return Err(SpectralError::InsufficientData(format!(
            "{method} averaging needs at least {needed} segment(s), got {have}"
        )));
    }
    Ok(())
}

/// Arithmetic mean over segments
///
/// Sums accumulate segment by segment from zero, in the same order as
/// [`mean_cross`], so real and complex estimates of the same data agree
/// bit for bit.
pub fn mean_power(powers: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
    require_segments(&powers, 1, "mean")?;
    let mut acc = vec![0.0; powers.ncols()];
    for row in powers.outer_iter() {
        for (a, p) in acc.iter_mut().zip(row.iter()) {
            *a += *p;
        }
    }
    let n = powers.nrows() as f64;
    acc.iter_mut().for_each(|a| *a /= n);
    Ok(acc)
}

/// Arithmetic mean of complex cross-spectra over segments
pub fn mean_cross(cross: ArrayView2<'_, Complex64>) -> Result<Vec<Complex64>> {
    require_segments(&cross, 1, "mean")?;
    let mut acc = vec![Complex64::new(0.0, 0.0); cross.ncols()];
    for row in cross.outer_iter() {
        for (a, c) in acc.iter_mut().zip(row.iter()) {
            *a += *c;
        }
    }
    let n = cross.nrows() as f64;
    acc.iter_mut().for_each(|a| *a /= n);
    Ok(acc)
}

/// Expected ratio of sample median to mean for `n` exponentially
/// distributed values: `1 + Σ_{i=1}^{(n-1)/2} (1/(2i+1) - 1/(2i))`
pub fn median_bias(n: usize) -> f64 {
    let mut bias = 1.0;
    for i in 1..=(n.saturating_sub(1) / 2) {
        let i = i as f64;
        bias += 1.0 / (2.0 * i + 1.0) - 1.0 / (2.0 * i);
    }
    bias
}

fn median_of(column: ArrayView1<'_, f64>, scratch: &mut Vec<f64>) -> f64 {
    scratch.clear();
    scratch.extend(column.iter().copied());
    scratch.sort_by(|a, b| a.total_cmp(b));
    let n = scratch.len();
    if n % 2 == 1 {
        scratch[n / 2]
    } else {
        0.5 * (scratch[n / 2 - 1] + scratch[n / 2])
    }
}

fn biased_median(powers: ArrayView2<'_, f64>) -> Vec<f64> {
    let bias = median_bias(powers.nrows());
    let mut scratch = Vec::with_capacity(powers.nrows());
    powers
        .columns()
        .into_iter()
        .map(|column| median_of(column, &mut scratch) / bias)
        .collect()
}

/// Median over segments, divided by [`median_bias`]
pub fn median_power(powers: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
    require_segments(&powers, 1, "median")?;
    Ok(biased_median(powers))
}

/// Mean of the bias-corrected medians of even- and odd-indexed segments
pub fn median_mean_power(powers: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
    require_segments(&powers, 2, "median-mean")?;
    let even = biased_median(powers.slice(ndarray::s![0..;2, ..]));
    let odd = biased_median(powers.slice(ndarray::s![1..;2, ..]));
    Ok(even
        .iter()
        .zip(odd.iter())
        .map(|(e, o)| 0.5 * (e + o))
        .collect())
}

/// Rayleigh statistic: per-bin standard deviation over mean
///
/// Close to 1 for Gaussian noise; the result is dimensionless.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rayleigh;

impl Averager for Rayleigh {
    fn combine(&self, powers: ArrayView2<'_, f64>) -> Result<Vec<f64>> {
        require_segments(&powers, 1, "rayleigh")?;
        let n = powers.nrows() as f64;
        Ok(powers
            .columns()
            .into_iter()
            .map(|column| {
                let mean = column.iter().sum::<f64>() / n;
                let var = column.iter().map(|p| (p - mean) * (p - mean)).sum::<f64>() / n;
                if mean == 0.0 {
                    0.0
                } else {
                    var.sqrt() / mean
                }
            })
            .collect())
    }

    fn output_unit(&self, _power_unit: &Unit) -> Unit {
        Unit::dimensionless()
    }
}

type Registry = RwLock<HashMap<String, Arc<dyn Averager>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut methods: HashMap<String, Arc<dyn Averager>> = HashMap::new();
        methods.insert("rayleigh".to_string(), Arc::new(Rayleigh));
        RwLock::new(methods)
    })
}

/// Register an averaging method under `name`, returning any method it replaces
///
/// Built-in names (`welch`, `bartlett`, `median`, `median-mean`) always
/// resolve to the built-ins.
pub fn register_method(name: &str, averager: Arc<dyn Averager>) -> Option<Arc<dyn Averager>> {
    let name = name.trim().to_ascii_lowercase();
    log::debug!("registering averaging method '{name}'");
    registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name, averager)
}

pub fn lookup_method(name: &str) -> Option<Arc<dyn Averager>> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&name.trim().to_ascii_lowercase())
        .cloned()
}
