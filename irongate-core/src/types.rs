//! Field types, scaled decimals and time units.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Latin-1 text, space padded.
    String,
    /// Latin-1 alphanumeric text, space padded.
    Alpha,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Single precision float carried as a scaled integer.
    Float32,
    /// Double precision float carried as a scaled integer.
    Float64,
    /// Unsigned scaled decimal (attribute `Type=Uint64`).
    DecimalUint,
    /// Signed scaled price (attribute `Type=Price`).
    DecimalPrice,
    /// Timestamp carried as an epoch count.
    DateTime,
}

const SCALED_WIDTHS: &[usize] = &[1, 2, 4, 8];
const DATETIME_WIDTHS: &[usize] = &[4, 8];

impl FieldType {
    /// Returns the canonical type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Alpha => "Alpha",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::DecimalUint => "DecimalUint",
            Self::DecimalPrice => "DecimalPrice",
            Self::DateTime => "DateTime",
        }
    }

    /// Returns the widths this type can be encoded with, `None` meaning any positive width.
    #[must_use]
    pub const fn supported_lengths(&self) -> Option<&'static [usize]> {
        match self {
            Self::String | Self::Alpha => None,
            Self::Int32 => Some(&[4]),
            Self::Int64 => Some(&[8]),
            Self::Float32 | Self::Float64 | Self::DecimalUint | Self::DecimalPrice => {
                Some(SCALED_WIDTHS)
            }
            Self::DateTime => Some(DATETIME_WIDTHS),
        }
    }

    /// Returns true if a field of this type may be `length` bytes wide.
    #[must_use]
    pub fn supports_length(&self, length: usize) -> bool {
        match self.supported_lengths() {
            None => length > 0,
            Some(widths) => widths.contains(&length),
        }
    }

    /// Returns true for text types.
    #[must_use]
    pub const fn is_text(&self) -> bool {
        matches!(self, Self::String | Self::Alpha)
    }

    /// Returns true for types that honour a `precision`.
    #[must_use]
    pub const fn is_scaled(&self) -> bool {
        matches!(
            self,
            Self::Float32 | Self::Float64 | Self::DecimalUint | Self::DecimalPrice
        )
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "String" => Ok(Self::String),
            "Alpha" => Ok(Self::Alpha),
            "Int32" | "Integer" => Ok(Self::Int32),
            "Int64" | "Long" => Ok(Self::Int64),
            "Float32" | "Float" => Ok(Self::Float32),
            "Float64" | "Double" => Ok(Self::Float64),
            "DecimalUint" => Ok(Self::DecimalUint),
            "DecimalPrice" => Ok(Self::DecimalPrice),
            "DateTime" => Ok(Self::DateTime),
            _ => Err(Error::UnknownFieldType { name: s.to_string() }),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decimal type for fixed-point numbers.
///
/// The value is `mantissa * 10^exponent`. Equality is numeric, so `10e0 == 1000e-2`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Decimal {
    /// The mantissa (significand).
    pub mantissa: i64,
    /// The exponent (power of 10).
    pub exponent: i8,
}

impl Decimal {
    /// Creates a new decimal value.
    #[must_use]
    pub const fn new(mantissa: i64, exponent: i8) -> Self {
        Self { mantissa, exponent }
    }

    /// Creates a decimal from the shortest decimal representation of a double.
    ///
    /// Magnitudes too small for an `i8` exponent round to zero.
    ///
    /// # Errors
    /// Returns [`Error::InvalidDecimal`] for non-finite values or values whose
    /// exponent exceeds `i8::MAX`.
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::invalid_decimal(value.to_string()));
        }
        Self::from_exp_notation(&format!("{value:e}"))
    }

    /// Creates a decimal from the shortest decimal representation of a float.
    ///
    /// # Errors
    /// See [`Decimal::from_f64`].
    pub fn from_f32(value: f32) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::invalid_decimal(value.to_string()));
        }
        Self::from_exp_notation(&format!("{value:e}"))
    }

    /// Parses `<digits>[.<digits>]e<exp>` as produced by `{:e}`.
    fn from_exp_notation(text: &str) -> Result<Self> {
        let invalid = || Error::invalid_decimal(text);
        let (significand, exp) = text.split_once('e').ok_or_else(invalid)?;
        let exp: i32 = exp.parse().map_err(|_| invalid())?;
        let (int_part, frac_part) = significand.split_once('.').unwrap_or((significand, ""));
        let mut mantissa: i64 = format!("{int_part}{frac_part}")
            .parse()
            .map_err(|_| invalid())?;
        let frac_digits = i32::try_from(frac_part.len()).map_err(|_| invalid())?;
        let mut exponent = exp - frac_digits;
        while exponent < i32::from(i8::MIN) && mantissa != 0 {
            mantissa = (mantissa + 5 * mantissa.signum()) / 10;
            exponent += 1;
        }
        if mantissa == 0 {
            return Ok(Self::new(0, 0));
        }
        let exponent = i8::try_from(exponent).map_err(|_| invalid())?;
        Ok(Self::new(mantissa, exponent))
    }

    /// Converts the decimal to a floating point value.
    #[must_use]
    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 * 10f64.powi(i32::from(self.exponent))
    }

    /// Returns `self * 10^precision` rounded half-up (ties away from zero).
    ///
    /// Returns `None` when the result does not fit an `i128`.
    #[must_use]
    pub fn scaled(&self, precision: u8) -> Option<i128> {
        let mantissa = i128::from(self.mantissa);
        let shift = i32::from(self.exponent) + i32::from(precision);
        if shift >= 0 {
            return mantissa.checked_mul(10i128.checked_pow(shift as u32)?);
        }
        // |mantissa| < 10^19, so anything below 10^-20 rounds to zero
        let drop = (-shift) as u32;
        if drop >= 20 {
            return Some(0);
        }
        let divisor = 10i128.pow(drop);
        let quotient = mantissa / divisor;
        let remainder = (mantissa % divisor).abs();
        if remainder * 2 >= divisor {
            Some(quotient + mantissa.signum())
        } else {
            Some(quotient)
        }
    }

    /// Returns the same value with trailing zeros folded into the exponent.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let mut result = *self;
        if result.mantissa == 0 {
            return Self::new(0, 0);
        }
        while result.mantissa % 10 == 0 && result.exponent < i8::MAX {
            result.mantissa /= 10;
            result.exponent += 1;
        }
        result
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.normalized(), other.normalized());
        a.mantissa == b.mantissa && a.exponent == b.exponent
    }
}

impl Eq for Decimal {}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(value, 0)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_decimal(s);
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let frac_part = frac_part.trim_end_matches('0');
        let exponent = i8::try_from(frac_part.len()).map_err(|_| invalid())?;
        let digits = format!("{int_part}{frac_part}");
        let digits = digits.trim_start_matches('0');
        let magnitude: i64 = if digits.is_empty() {
            0
        } else {
            digits.parse().map_err(|_| invalid())?
        };
        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self::new(mantissa, -exponent))
    }
}

impl std::fmt::Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.exponent >= 0 {
            let zeros = "0".repeat(self.exponent as usize);
            return write!(f, "{}{}", self.mantissa, zeros);
        }
        let places = self.exponent.unsigned_abs() as usize;
        let digits = format!("{:0>width$}", self.mantissa.unsigned_abs(), width = places + 1);
        let (int_part, frac_part) = digits.split_at(digits.len() - places);
        let sign = if self.mantissa < 0 { "-" } else { "" };
        write!(f, "{sign}{int_part}.{frac_part}")
    }
}

/// Unit of an epoch-based timestamp field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimeUnit {
    /// Seconds since the epoch.
    #[default]
    Seconds,
    /// Milliseconds since the epoch.
    Millis,
    /// Microseconds since the epoch.
    Micros,
    /// Nanoseconds since the epoch.
    Nanos,
}

impl TimeUnit {
    /// Converts a timestamp to an epoch count in this unit.
    ///
    /// Returns `None` when the count overflows an `i64` (nanoseconds past 2262).
    #[must_use]
    pub fn to_epoch(&self, value: &DateTime<Utc>) -> Option<i64> {
        match self {
            Self::Seconds => Some(value.timestamp()),
            Self::Millis => Some(value.timestamp_millis()),
            Self::Micros => Some(value.timestamp_micros()),
            Self::Nanos => value.timestamp_nanos_opt(),
        }
    }

    /// Converts an epoch count in this unit to a timestamp.
    #[must_use]
    pub fn from_epoch(&self, count: i64) -> Option<DateTime<Utc>> {
        match self {
            Self::Seconds => DateTime::from_timestamp(count, 0),
            Self::Millis => DateTime::from_timestamp_millis(count),
            Self::Micros => DateTime::from_timestamp_micros(count),
            Self::Nanos => Some(DateTime::from_timestamp_nanos(count)),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s" | "sec" | "seconds" => Ok(Self::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(Self::Millis),
            "us" | "micros" | "microseconds" => Ok(Self::Micros),
            "ns" | "nanos" | "nanoseconds" => Ok(Self::Nanos),
            _ => Err(Error::UnknownTimeUnit { name: s.to_string() }),
        }
    }
}
