//! Physical units with rational exponents
//!
//! Spectral quantities need fractional powers (an ASD carries Hz^-1/2),
//! so each base symbol maps to a reduced fraction rather than an integer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Div, Mul};

/// Reduced rational exponent with a positive denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Exponent {
    num: i32,
    den: i32,
}

fn gcd(a: i32, b: i32) -> i32 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

impl Exponent {
    /// Build `num/den`; a zero denominator is treated as 1
    pub fn new(num: i32, den: i32) -> Self {
        let den = if den == 0 { 1 } else { den };
        let sign = if den < 0 { -1 } else { 1 };
        let g = gcd(num, den);
        Self {
            num: sign * num / g,
            den: sign * den / g,
        }
    }

    pub fn integer(n: i32) -> Self {
        Self { num: n, den: 1 }
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    fn add(self, other: Exponent) -> Exponent {
        Exponent::new(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    fn scale(self, factor: Exponent) -> Exponent {
        Exponent::new(self.num * factor.num, self.den * factor.den)
    }
}

impl fmt::Display for Exponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Product of named base symbols raised to rational powers
///
/// The empty product is the dimensionless unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Unit {
    terms: BTreeMap<String, Exponent>,
}

impl Unit {
    pub fn dimensionless() -> Self {
        Self::default()
    }

    /// Single base symbol, e.g. `"m"` or `"ct"`; an empty symbol is dimensionless
    pub fn named(symbol: &str) -> Self {
        let mut terms = BTreeMap::new();
        let symbol = symbol.trim();
        if !symbol.is_empty() {
            terms.insert(symbol.to_string(), Exponent::integer(1));
        }
        Self { terms }
    }

    pub fn hertz() -> Self {
        Self::named("Hz")
    }

    pub fn second() -> Self {
        Self::named("s")
    }

    pub fn is_dimensionless(&self) -> bool {
        self.terms.is_empty()
    }

    /// Exponent of a base symbol (zero when absent)
    pub fn exponent(&self, symbol: &str) -> Exponent {
        self.terms
            .get(symbol)
            .copied()
            .unwrap_or_else(|| Exponent::integer(0))
    }

    pub fn multiply(&self, other: &Unit) -> Unit {
        let mut terms = self.terms.clone();
        for (symbol, exp) in &other.terms {
            let entry = terms.entry(symbol.clone()).or_insert(Exponent::integer(0));
            *entry = entry.add(*exp);
        }
        terms.retain(|_, exp| !exp.is_zero());
        Unit { terms }
    }

    pub fn invert(&self) -> Unit {
        self.pow(Exponent::integer(-1))
    }

    pub fn pow(&self, power: Exponent) -> Unit {
        let mut terms: BTreeMap<String, Exponent> = self
            .terms
            .iter()
            .map(|(symbol, exp)| (symbol.clone(), exp.scale(power)))
            .collect();
        terms.retain(|_, exp| !exp.is_zero());
        Unit { terms }
    }

    pub fn sqrt(&self) -> Unit {
        self.pow(Exponent::new(1, 2))
    }

    /// Unit of a one-sided power spectral density of data in `self`
    pub fn power_density(&self) -> Unit {
        self.pow(Exponent::integer(2)).multiply(&Unit::hertz().invert())
    }
}

impl Mul for &Unit {
    type Output = Unit;

    fn mul(self, rhs: &Unit) -> Unit {
        self.multiply(rhs)
    }
}

impl Div for &Unit {
    type Output = Unit;

    fn div(self, rhs: &Unit) -> Unit {
        self.multiply(&rhs.invert())
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (symbol, exp) in &self.terms {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            if *exp == Exponent::integer(1) {
                write!(f, "{symbol}")?;
            } else {
                write!(f, "{symbol}^{exp}")?;
            }
        }
        Ok(())
    }
}

/// Frequency quantity in Hz
///
/// Filter design entry points take `impl Into<Hertz>` so that a bare
/// number and an explicit quantity produce identical designs.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Hertz {
    fn from(value: f64) -> Self {
        Hertz(value)
    }
}

impl fmt::Display for Hertz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponent_reduction() {
        assert_eq!(Exponent::new(2, 4), Exponent::new(1, 2));
        assert_eq!(Exponent::new(1, -2), Exponent::new(-1, 2));
        assert_eq!(Exponent::new(3, 3), Exponent::integer(1));
    }

    #[test]
    fn test_power_density_unit() {
        let unit = Unit::named("m").power_density();
        assert_eq!(unit.exponent("m"), Exponent::integer(2));
        assert_eq!(unit.exponent("Hz"), Exponent::integer(-1));
        assert_eq!(unit.to_string(), "Hz^-1 m^2");
    }

    #[test]
    fn test_amplitude_density_unit() {
        let unit = Unit::named("m").power_density().sqrt();
        assert_eq!(unit.exponent("m"), Exponent::integer(1));
        assert_eq!(unit.exponent("Hz"), Exponent::new(-1, 2));
        assert_eq!(unit.to_string(), "Hz^-1/2 m");
    }

    #[test]
    fn test_multiply_cancels_terms() {
        let hz = Unit::hertz();
        assert!((&hz / &hz).is_dimensionless());
        let squared = &Unit::named("V") * &Unit::named("V");
        assert_eq!(squared, Unit::named("V").pow(Exponent::integer(2)));
    }

    #[test]
    fn test_empty_symbol_is_dimensionless() {
        assert!(Unit::named("  ").is_dimensionless());
        assert_eq!(Unit::dimensionless().to_string(), "");
    }

    #[test]
    fn test_hertz_from_number() {
        let direct: Hertz = 60.0.into();
        assert_eq!(direct, Hertz(60.0));
        assert_eq!(direct.value(), 60.0);
    }
}
