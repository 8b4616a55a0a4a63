//! Fixed-point decimal arithmetic with overflow-safe widening.
//!
//! [`Decimal`] stores a signed value scaled by `10^18` in an `i128`. Ordinary
//! addition and subtraction stay within `i128`; multiplication and division
//! widen both operands into a 256-bit unsigned magnitude via
//! [`primitive_types::U256`] before scaling back down, so that
//! `price * quantity` or `price * (1 +/- fraction)` never overflows once both
//! operands already carry the `10^18` scale (a typical price around `10^4`
//! times a typical quantity around `1`, both scaled, already needs more than
//! 128 bits of intermediate precision).

mod error;

pub use error::{DecimalError, ParseDecimalError};

use primitive_types::U256;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits represented by [`Decimal::SCALE`].
pub const FRACTIONAL_DIGITS: u32 = 18;

/// `10^18`, the fixed-point scale shared by every `Decimal` value.
pub const SCALE: i128 = 1_000_000_000_000_000_000;

/// Narrows a `U256` back to `u128`, returning `None` if it doesn't fit
/// (rather than relying on a `TryFrom` impl the crate may not expose).
fn u256_to_u128(value: U256) -> Option<u128> {
    if value > U256::from(u128::MAX) {
        None
    } else {
        Some(value.as_u128())
    }
}

/// A signed fixed-point decimal with 18 fractional digits of precision.
///
/// Exact equality and ordering are those of the underlying scaled integer.
#[derive(Clone, Copy, Default)]
pub struct Decimal {
    raw: i128,
}

impl Decimal {
    /// The value zero.
    pub const ZERO: Decimal = Decimal { raw: 0 };
    /// The value one.
    pub const ONE: Decimal = Decimal { raw: SCALE };

    /// Builds a `Decimal` directly from its scaled-integer representation.
    #[inline]
    pub const fn from_raw(raw: i128) -> Self {
        Decimal { raw }
    }

    /// Builds a `Decimal` from an integer value (scaled by `10^18`).
    #[inline]
    pub const fn from_integer(value: i64) -> Self {
        Decimal {
            raw: (value as i128) * SCALE,
        }
    }

    /// Returns the raw scaled-integer representation.
    #[inline]
    pub const fn raw(&self) -> i128 {
        self.raw
    }

    /// Builds a `Decimal` from an `f64`, rounding to the nearest representable
    /// scaled value (ties away from zero, matching `llround`).
    pub fn from_double(value: f64) -> Self {
        let scaled = value * SCALE as f64;
        Decimal {
            raw: scaled.round() as i128,
        }
    }

    /// Converts back to an approximate `f64`.
    pub fn to_double(&self) -> f64 {
        self.raw as f64 / SCALE as f64
    }

    /// Parses a decimal string: optional sign, required integer part,
    /// optional `.` followed by up to 18 fractional digits. Trailing
    /// fractional digits beyond 18 are truncated; missing ones are
    /// right-padded with zeros.
    pub fn from_string(text: &str) -> Result<Self, ParseDecimalError> {
        if text.is_empty() {
            return Err(ParseDecimalError::Empty);
        }

        let mut chars = text.chars().peekable();
        let negative = match chars.peek() {
            Some('+') => {
                chars.next();
                false
            }
            Some('-') => {
                chars.next();
                true
            }
            _ => false,
        };

        let mut integral: i128 = 0;
        let mut saw_integer_digit = false;
        while let Some(&c) = chars.peek() {
            if c.is_ascii_digit() {
                integral = integral * 10 + (c as i128 - '0' as i128);
                saw_integer_digit = true;
                chars.next();
            } else {
                break;
            }
        }
        if !saw_integer_digit {
            return Err(ParseDecimalError::MissingIntegerDigits);
        }

        let mut fractional: i128 = 0;
        if let Some(&c) = chars.peek() {
            if c == '.' {
                chars.next();
                let mut fractional_digits = 0u32;
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_digit() {
                        if fractional_digits < FRACTIONAL_DIGITS {
                            fractional = fractional * 10 + (c as i128 - '0' as i128);
                            fractional_digits += 1;
                        }
                        chars.next();
                    } else {
                        break;
                    }
                }
                while fractional_digits < FRACTIONAL_DIGITS {
                    fractional *= 10;
                    fractional_digits += 1;
                }
                if chars.peek().is_some() {
                    return Err(ParseDecimalError::UnexpectedCharacter);
                }
            } else {
                return Err(ParseDecimalError::UnexpectedCharacter);
            }
        }

        let mut raw = integral * SCALE + fractional;
        if negative {
            raw = -raw;
        }
        Ok(Decimal { raw })
    }

    /// Formats this value with exactly `precision` fractional digits.
    /// `precision` is clamped to `[0, 18]`.
    pub fn to_string_with_precision(&self, precision: u32) -> String {
        let precision = precision.min(FRACTIONAL_DIGITS);
        let negative = self.raw < 0;
        let magnitude = self.raw.unsigned_abs();
        let integral = magnitude / SCALE as u128;
        let fractional = magnitude % SCALE as u128;

        let mut out = String::new();
        if negative {
            out.push('-');
        }
        out.push_str(&integral.to_string());

        if precision > 0 {
            let fractional_str = format!("{fractional:018}");
            out.push('.');
            out.push_str(&fractional_str[..precision as usize]);
        }
        out
    }

    /// Multiplication, widening through a 256-bit unsigned intermediate so
    /// that `(a * b) / SCALE` never overflows `i128`.
    pub fn checked_mul(&self, other: Decimal) -> Option<Decimal> {
        let negative = (self.raw < 0) != (other.raw < 0);
        let a = U256::from(self.raw.unsigned_abs());
        let b = U256::from(other.raw.unsigned_abs());
        let wide = a * b;
        let scale = U256::from(SCALE as u128);
        let result = wide / scale;
        let magnitude = u256_to_u128(result)?;
        let magnitude: i128 = magnitude.try_into().ok()?;
        Some(Decimal {
            raw: if negative { -magnitude } else { magnitude },
        })
    }

    /// Division, widening the numerator by `SCALE` through a 256-bit
    /// intermediate before dividing by the (unwidened) denominator.
    pub fn checked_div(&self, other: Decimal) -> Result<Decimal, DecimalError> {
        if other.raw == 0 {
            return Err(DecimalError::DivideByZero);
        }
        let negative = (self.raw < 0) != (other.raw < 0);
        let a = U256::from(self.raw.unsigned_abs());
        let scale = U256::from(SCALE as u128);
        let b = U256::from(other.raw.unsigned_abs());
        let wide = a * scale;
        let result = wide / b;
        let magnitude = u256_to_u128(result).ok_or(DecimalError::Overflow)?;
        let magnitude: i128 = magnitude.try_into().map_err(|_| DecimalError::Overflow)?;
        Ok(Decimal {
            raw: if negative { -magnitude } else { magnitude },
        })
    }

    /// Absolute value.
    #[inline]
    pub fn abs(&self) -> Decimal {
        Decimal {
            raw: self.raw.abs(),
        }
    }

    /// Returns whether this value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.raw == 0
    }

    /// Returns whether this value is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.raw > 0
    }

    /// Returns the smaller of two values.
    #[inline]
    pub fn min(self, other: Decimal) -> Decimal {
        if self.raw <= other.raw { self } else { other }
    }

    /// Returns the larger of two values.
    #[inline]
    pub fn max(self, other: Decimal) -> Decimal {
        if self.raw >= other.raw { self } else { other }
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({})", self.to_string_with_precision(FRACTIONAL_DIGITS))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_precision(8))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_string(s)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl Eq for Decimal {}

impl PartialOrd for Decimal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Decimal {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl std::hash::Hash for Decimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;
    fn add(self, rhs: Self) -> Self::Output {
        Decimal {
            raw: self.raw + rhs.raw,
        }
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;
    fn sub(self, rhs: Self) -> Self::Output {
        Decimal {
            raw: self.raw - rhs.raw,
        }
    }
}

impl std::ops::Neg for Decimal {
    type Output = Decimal;
    fn neg(self) -> Self::Output {
        Decimal { raw: -self.raw }
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;
    fn mul(self, rhs: Self) -> Self::Output {
        self.checked_mul(rhs)
            .expect("decimal multiplication overflowed 256-bit intermediate")
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;
    fn div(self, rhs: Self) -> Self::Output {
        self.checked_div(rhs)
            .expect("decimal division failed (divide by zero or overflow)")
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, rhs: Self) {
        self.raw += rhs.raw;
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, rhs: Self) {
        self.raw -= rhs.raw;
    }
}

impl serde::Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string_with_precision(FRACTIONAL_DIGITS))
    }
}

impl<'de> serde::Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        Decimal::from_string(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_to_string_from_string() {
        for raw in [0i128, 1, -1, SCALE, -SCALE, 123_456_789_000_000_000_000, -42] {
            let d = Decimal::from_raw(raw);
            let s = d.to_string_with_precision(18);
            assert_eq!(Decimal::from_string(&s).unwrap(), d, "round trip for {raw}");
        }
    }

    #[test]
    fn from_string_pads_and_truncates_fractional_digits() {
        assert_eq!(Decimal::from_string("1.5").unwrap().raw(), SCALE + SCALE / 2);
        assert_eq!(
            Decimal::from_string("1.1234567890123456789999").unwrap().raw(),
            Decimal::from_string("1.123456789012345678").unwrap().raw()
        );
    }

    #[test]
    fn from_string_rejects_malformed_input() {
        assert!(matches!(Decimal::from_string(""), Err(ParseDecimalError::Empty)));
        assert!(matches!(
            Decimal::from_string("."),
            Err(ParseDecimalError::MissingIntegerDigits)
        ));
        assert!(matches!(
            Decimal::from_string("1.2.3"),
            Err(ParseDecimalError::UnexpectedCharacter)
        ));
        assert!(matches!(
            Decimal::from_string("1x"),
            Err(ParseDecimalError::UnexpectedCharacter)
        ));
    }

    #[test]
    fn to_string_precision_is_clamped() {
        let d = Decimal::from_string("3.14159").unwrap();
        assert_eq!(d.to_string_with_precision(0), "3");
        assert_eq!(d.to_string_with_precision(2), "3.14");
        assert_eq!(d.to_string_with_precision(100), d.to_string_with_precision(18));
    }

    #[test]
    fn multiplication_uses_wide_intermediate_without_overflow() {
        // price ~30000, quantity ~5, both already scaled by 1e18: naive
        // i128 multiplication of the raw values would overflow.
        let price = Decimal::from_integer(30_000);
        let qty = Decimal::from_string("5.12345678").unwrap();
        let notional = price * qty;
        assert_eq!(notional.to_string_with_precision(8), "153703.70340000");
    }

    #[test]
    fn division_round_trips_through_multiplication() {
        let a = Decimal::from_string("123.456").unwrap();
        let b = Decimal::from_string("7.89").unwrap();
        let quotient = a / b;
        let back = quotient * b;
        // allow 1 ulp of rounding at scale 1e-18
        assert!((back.raw() - a.raw()).abs() <= 1);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            Decimal::ONE.checked_div(Decimal::ZERO),
            Err(DecimalError::DivideByZero)
        ));
    }

    #[test]
    fn from_double_round_trips_within_tolerance() {
        for x in [0.0, 1.0, -1.0, 30045.49, -999999.123456, 1e14] {
            let d = Decimal::from_double(x);
            assert!((d.to_double() - x).abs() < 1e-6, "{x} round-tripped to {}", d.to_double());
        }
    }

    #[test]
    fn ordering_matches_integer_semantics() {
        let a = Decimal::from_integer(1);
        let b = Decimal::from_integer(2);
        assert!(a < b);
        assert!(-a > -b);
        assert_eq!(a.abs(), a);
        assert_eq!((-a).abs(), a);
    }
}
