//! Numeric model for the engine.
//!
//! Every number is one of three representations:
//!
//! - [`Number::Integer`] for whole numbers read from input data
//! - [`Number::Float`] for native binary floating point values
//! - [`Number::Decimal`] for exact decimal values, produced by literals and
//!   operators while an engine runs in [`NumericMode::Exact`]
//!
//! Operators are written once against the [`Arithmetic`] trait, which is
//! implemented for both [`Decimal`] and `f64`. Exact mode tries the decimal
//! implementation first and drops to `f64` only when a value cannot be
//! represented exactly (overflow, NaN, division by zero).
//!
//! # Examples
//!
//! ```
//! use sprig_lang::number::{Arithmetic, Number};
//! use rust_decimal::Decimal;
//!
//! let a = Decimal::parse_text("0.1").unwrap();
//! let b = Decimal::parse_text("0.2").unwrap();
//! let sum = a.add(b).unwrap().into_number();
//!
//! assert_eq!(sum, Number::Float(0.3));
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, MathematicalOps};

use crate::value::Value;

/// Largest integer magnitude an `f64` holds without losing precision (2^53).
const MAX_SAFE_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

static NUMERIC_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)\s*$").expect("numeric text pattern compiles")
});

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-+]?(\d+\.?\d*|\.\d+)([eE][-+]?\d+)?").expect("float prefix pattern compiles")
});

/// Which arithmetic the operator table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumericMode {
    /// Exact decimal arithmetic, falling back to floats when a value has no
    /// decimal representation.
    #[default]
    Exact,
    /// Native `f64` arithmetic.
    Native,
}

/// A numeric value.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
}

/// The double nearest to `value`. Goes through the decimal text, since
/// `Decimal::to_f64` can land one ulp off.
fn decimal_to_f64(value: Decimal) -> f64 {
    value.to_string().parse::<f64>().unwrap_or(f64::NAN)
}

impl Number {
    /// Builds a native number, preferring `Integer` for whole values that are
    /// exactly representable.
    pub fn from_f64(value: f64) -> Number {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < MAX_SAFE_FLOAT_INT {
            Number::Integer(value as i64)
        } else {
            Number::Float(value)
        }
    }

    /// Converts an exact decimal into the closest native number.
    pub fn from_decimal(value: Decimal) -> Number {
        if value.is_integer()
            && let Some(i) = value.to_i64()
        {
            return Number::Integer(i);
        }
        Number::Float(decimal_to_f64(value))
    }

    /// Parses numeric text such as `"12"`, `"-0.5"`, `"5."` or `".25"`.
    ///
    /// The result is exact when the text fits a decimal, otherwise a float.
    pub fn parse(text: &str) -> Option<Number> {
        if let Some(d) = Decimal::parse_text(text) {
            return Some(Number::Decimal(d));
        }
        f64::parse_text(text).map(Number::Float)
    }

    /// Parses the longest numeric prefix of `text`, the way a lenient
    /// string-to-number conversion does (`"12px"` becomes `12`).
    pub fn parse_prefix(text: &str) -> Option<Number> {
        let found = FLOAT_PREFIX.find(text)?;
        found.as_str().trim().parse::<f64>().ok().map(Number::from_f64)
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
            Number::Decimal(d) => decimal_to_f64(*d),
        }
    }

    /// Exact decimal form of the number, if it has one.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Number::Integer(i) => Some(Decimal::from(*i)),
            Number::Float(f) if f.is_finite() => {
                // The shortest round-trip text of a float is what a reader of the
                // document wrote, so 0.1 becomes exactly 0.1.
                Decimal::from_str(&f.to_string())
                    .ok()
                    .or_else(|| Decimal::from_f64(*f))
            }
            Number::Float(_) => None,
            Number::Decimal(d) => Some(*d),
        }
    }

    /// Drops exactness: decimals become integers or floats, everything else is
    /// returned as is.
    pub fn to_native(self) -> Number {
        match self {
            Number::Decimal(d) => Number::from_decimal(d),
            other => other,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Decimal(_))
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Number::Float(f) if f.is_nan())
    }

    /// The value as an `i64`, when it is a whole number in range.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(i) => Some(*i),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 => f.to_i64(),
            Number::Float(_) => None,
            Number::Decimal(d) if d.is_integer() => d.to_i64(),
            Number::Decimal(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Integer(i) => *i == 0,
            Number::Float(f) => *f == 0.0,
            Number::Decimal(d) => d.is_zero(),
        }
    }

    pub fn negate(self) -> Number {
        match self {
            Number::Integer(i) => match i.checked_neg() {
                Some(n) => Number::Integer(n),
                None => Number::Float(-(i as f64)),
            },
            Number::Float(f) => Number::Float(-f),
            Number::Decimal(d) => Number::Decimal(-d),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(b)),
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(b),
            _ => match (self.to_decimal(), other.to_decimal()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => self.to_f64().partial_cmp(&other.to_f64()),
            },
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Float(x) => f.write_str(&format_float(*x)),
            Number::Decimal(d) => write!(f, "{}", d.normalize()),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::from_f64(value)
    }
}

impl From<Decimal> for Number {
    fn from(value: Decimal) -> Self {
        Number::Decimal(value)
    }
}

/// Renders a float the way data documents expect: no trailing `.0`, no
/// negative zero, and named non-finite values.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// True when `text` is a plain signed decimal such as `"-12.5"` or `" 3 "`.
pub fn is_numeric_text(text: &str) -> bool {
    NUMERIC_TEXT.is_match(text)
}

/// Trims, drops a leading `+`, and completes bare `"5."` / `".5"` forms.
fn canonical_text(text: &str) -> String {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let (sign, digits) = match unsigned.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", unsigned),
    };
    let mut out = String::with_capacity(digits.len() + 2);
    out.push_str(sign);
    if digits.starts_with('.') {
        out.push('0');
    }
    out.push_str(digits);
    if out.ends_with('.') {
        out.push('0');
    }
    out
}

// ============================================================================
// Arithmetic
// ============================================================================

/// The arithmetic the operator table needs, implemented once per numeric
/// representation.
///
/// Every operation returns `None` when the result cannot be represented, which
/// lets exact mode retry the same operation with `f64`.
pub trait Arithmetic: Copy + Sized {
    fn from_number(number: Number) -> Option<Self>;
    fn parse_text(text: &str) -> Option<Self>;
    fn add(self, rhs: Self) -> Option<Self>;
    fn sub(self, rhs: Self) -> Option<Self>;
    fn mul(self, rhs: Self) -> Option<Self>;
    fn div(self, rhs: Self) -> Option<Self>;
    fn rem(self, rhs: Self) -> Option<Self>;
    fn pow(self, rhs: Self) -> Option<Self>;
    fn compare(self, rhs: Self) -> Option<Ordering>;
    fn into_number(self) -> Number;

    /// Reads a number or a numeric string.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Self::from_number(*n),
            Value::String(s) if is_numeric_text(s) => Self::parse_text(s),
            _ => None,
        }
    }
}

impl Arithmetic for Decimal {
    fn from_number(number: Number) -> Option<Self> {
        number.to_decimal()
    }

    fn parse_text(text: &str) -> Option<Self> {
        let canonical = canonical_text(text);
        if canonical.contains(['e', 'E']) {
            return Decimal::from_scientific(&canonical).ok();
        }
        Decimal::from_str(&canonical).ok()
    }

    fn add(self, rhs: Self) -> Option<Self> {
        self.checked_add(rhs)
    }

    fn sub(self, rhs: Self) -> Option<Self> {
        self.checked_sub(rhs)
    }

    fn mul(self, rhs: Self) -> Option<Self> {
        self.checked_mul(rhs)
    }

    fn div(self, rhs: Self) -> Option<Self> {
        self.checked_div(rhs)
    }

    fn rem(self, rhs: Self) -> Option<Self> {
        self.checked_rem(rhs)
    }

    fn pow(self, rhs: Self) -> Option<Self> {
        // Fractional exponents have no exact answer.
        if !rhs.is_integer() {
            return None;
        }
        let exponent = rhs.to_i64()?;
        if exponent >= 0 {
            self.checked_powi(exponent)
        } else {
            Decimal::ONE.checked_div(self.checked_powi(exponent.checked_neg()?)?)
        }
    }

    fn compare(self, rhs: Self) -> Option<Ordering> {
        Some(self.cmp(&rhs))
    }

    fn into_number(self) -> Number {
        Number::Decimal(self)
    }
}

impl Arithmetic for f64 {
    fn from_number(number: Number) -> Option<Self> {
        Some(number.to_f64())
    }

    fn parse_text(text: &str) -> Option<Self> {
        canonical_text(text).parse::<f64>().ok()
    }

    fn add(self, rhs: Self) -> Option<Self> {
        Some(self + rhs)
    }

    fn sub(self, rhs: Self) -> Option<Self> {
        Some(self - rhs)
    }

    fn mul(self, rhs: Self) -> Option<Self> {
        Some(self * rhs)
    }

    fn div(self, rhs: Self) -> Option<Self> {
        Some(self / rhs)
    }

    fn rem(self, rhs: Self) -> Option<Self> {
        Some(self % rhs)
    }

    fn pow(self, rhs: Self) -> Option<Self> {
        Some(self.powf(rhs))
    }

    fn compare(self, rhs: Self) -> Option<Ordering> {
        self.partial_cmp(&rhs)
    }

    fn into_number(self) -> Number {
        Number::from_f64(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Decimal {
        Decimal::parse_text(text).unwrap()
    }

    #[test]
    fn test_decimal_addition_is_exact() {
        let sum = dec("0.1").add(dec("0.2")).unwrap();
        assert_eq!(sum, dec("0.3"));
    }

    #[test]
    fn test_large_integer_addition() {
        let sum = dec("9999999999999999").add(dec("1")).unwrap();
        assert_eq!(Number::from_decimal(sum), Number::Integer(10_000_000_000_000_000));
    }

    #[test]
    fn test_repeating_decimal_to_nearest_double() {
        let third = dec("1").div(dec("3")).unwrap();
        assert_eq!(Number::Decimal(third).to_f64(), 1.0 / 3.0);
        let seventh = dec("1").div(dec("7")).unwrap();
        assert!(matches!(Number::from_decimal(seventh), Number::Float(f) if f == 1.0 / 7.0));
    }

    #[test]
    fn test_float_addition_drifts() {
        let sum = 0.1f64.add(0.2).unwrap();
        assert_ne!(Number::Float(sum), Number::Float(0.3));
    }

    #[test]
    fn test_numeric_text() {
        assert!(is_numeric_text("42"));
        assert!(is_numeric_text("-0.5"));
        assert!(is_numeric_text(" +3. "));
        assert!(is_numeric_text(".25"));
        assert!(!is_numeric_text(""));
        assert!(!is_numeric_text("1.2.3"));
        assert!(!is_numeric_text("12px"));
    }

    #[test]
    fn test_canonical_forms_parse() {
        assert_eq!(Decimal::parse_text("5."), Some(dec("5")));
        assert_eq!(Decimal::parse_text("-.5"), Some(dec("-0.5")));
        assert_eq!(Decimal::parse_text("+7"), Some(dec("7")));
    }

    #[test]
    fn test_cross_representation_equality() {
        assert_eq!(Number::Integer(3), Number::Decimal(dec("3.00")));
        assert_eq!(Number::Float(0.5), Number::Decimal(dec("0.5")));
        assert_ne!(Number::Float(f64::NAN), Number::Float(f64::NAN));
    }

    #[test]
    fn test_negative_exponent() {
        assert_eq!(dec("2").pow(dec("-2")), Some(dec("0.25")));
        assert_eq!(dec("2").pow(dec("0.5")), None);
    }

    #[test]
    fn test_division_by_zero_has_no_decimal_result() {
        assert_eq!(dec("1").div(dec("0")), None);
        assert_eq!(1f64.div(0.0), Some(f64::INFINITY));
    }

    #[test]
    fn test_parse_prefix() {
        assert_eq!(Number::parse_prefix("12px"), Some(Number::Integer(12)));
        assert_eq!(Number::parse_prefix(" -1.5e2x"), Some(Number::Integer(-150)));
        assert_eq!(Number::parse_prefix("px"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Number::Decimal(dec("0.30")).to_string(), "0.3");
        assert_eq!(Number::Float(2.0).to_string(), "2");
        assert_eq!(Number::Float(-0.0).to_string(), "0");
        assert_eq!(Number::Float(f64::INFINITY).to_string(), "Infinity");
    }
}
