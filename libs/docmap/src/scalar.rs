//! Scalar coercion: Rust primitives ↔ [`Scalar`] entries.
//!
//! Every numeric kind round-trips losslessly. Reading accepts any scalar
//! variant that converts to the declared kind without loss; anything else is
//! a [`ConversionError`]. Enumerations travel as their integer discriminant.

use chrono::{DateTime, Utc};

use crate::config::CodecConfig;
use crate::error::ConversionError;
use crate::value::{Entry, EntryKind, Scalar};

/// Canonical scalar representation a declared type maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Timestamp,
    /// Fieldless enumeration stored as its integer discriminant.
    Enum,
}

/// A type stored as a single [`Scalar`].
pub trait ScalarValue: Sized + Send + Sync + 'static {
    const KIND: ScalarKind;

    fn to_scalar(&self) -> Scalar;

    fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError>;
}

/// Wrap a scalar value into an entry.
pub fn scalar_to_entry<V: ScalarValue>(value: &V) -> Entry {
    Entry::Scalar(value.to_scalar())
}

/// Read a scalar value back; any non-scalar entry is a shape mismatch.
pub fn entry_to_scalar<V: ScalarValue>(entry: &Entry, config: &CodecConfig) -> Result<V, ConversionError> {
    match entry {
        Entry::Scalar(scalar) => V::from_scalar(scalar, config),
        other => Err(ConversionError::unexpected(
            std::any::type_name::<V>(),
            EntryKind::Scalar,
            other.kind(),
        )),
    }
}

/// Normalize `scalar` into the canonical variant for `kind`.
pub fn coerce(scalar: &Scalar, kind: ScalarKind, config: &CodecConfig) -> Result<Scalar, ConversionError> {
    let lenient = config.lenient_numbers;
    let coerced = match kind {
        ScalarKind::Bool => as_bool(scalar, lenient).map(Scalar::Bool),
        ScalarKind::Int | ScalarKind::Enum => as_i64(scalar, lenient).map(Scalar::Int),
        ScalarKind::UInt => as_u64(scalar, lenient).map(Scalar::UInt),
        ScalarKind::Float => as_f64(scalar, lenient).map(Scalar::Float),
        ScalarKind::String => as_string(scalar).map(Scalar::String),
        ScalarKind::Timestamp => as_micros(scalar, lenient).map(Scalar::Timestamp),
    };
    coerced.map_err(|msg| ConversionError::new(format!("{kind:?}"), msg).with_found(EntryKind::Scalar))
}

/// Integer discriminant carried by an enumeration entry.
pub fn enum_discriminant<E: ScalarValue>(scalar: &Scalar, config: &CodecConfig) -> Result<i64, ConversionError> {
    as_i64(scalar, config.lenient_numbers).map_err(fail::<E>)
}

/// Error for a discriminant that names no variant.
pub fn unknown_discriminant<E>(value: i64) -> ConversionError {
    ConversionError::new(
        std::any::type_name::<E>(),
        format!("no variant with discriminant {value}"),
    )
    .with_found(EntryKind::Scalar)
}

fn fail<V>(msg: String) -> ConversionError {
    ConversionError::new(std::any::type_name::<V>(), msg).with_found(EntryKind::Scalar)
}

fn mismatch(scalar: &Scalar, expected: &str) -> String {
    format!("expected {expected}, found {} scalar", scalar.type_name())
}

fn as_bool(scalar: &Scalar, lenient: bool) -> Result<bool, String> {
    match scalar {
        Scalar::Bool(b) => Ok(*b),
        Scalar::String(s) if lenient => s
            .trim()
            .parse::<bool>()
            .map_err(|_| format!("'{s}' is not a boolean")),
        other => Err(mismatch(other, "bool")),
    }
}

fn as_i64(scalar: &Scalar, lenient: bool) -> Result<i64, String> {
    match scalar {
        Scalar::Int(i) => Ok(*i),
        Scalar::UInt(u) => i64::try_from(*u).map_err(|_| format!("{u} out of range for i64")),
        Scalar::Float(f) => float_to_i64(*f),
        Scalar::String(s) if lenient => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{s}' is not an integer")),
        other => Err(mismatch(other, "integer")),
    }
}

fn as_u64(scalar: &Scalar, lenient: bool) -> Result<u64, String> {
    match scalar {
        Scalar::UInt(u) => Ok(*u),
        Scalar::Int(i) => u64::try_from(*i).map_err(|_| format!("{i} out of range for u64")),
        Scalar::Float(f) => float_to_u64(*f),
        Scalar::String(s) if lenient => s
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("'{s}' is not an unsigned integer")),
        other => Err(mismatch(other, "unsigned integer")),
    }
}

fn as_f64(scalar: &Scalar, lenient: bool) -> Result<f64, String> {
    match scalar {
        Scalar::Float(f) => Ok(*f),
        Scalar::Int(i) => {
            let f = *i as f64;
            if f as i128 == *i as i128 {
                Ok(f)
            } else {
                Err(format!("{i} has no exact f64 representation"))
            }
        }
        Scalar::UInt(u) => {
            let f = *u as f64;
            if f as u128 == *u as u128 {
                Ok(f)
            } else {
                Err(format!("{u} has no exact f64 representation"))
            }
        }
        Scalar::String(s) if lenient => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number")),
        other => Err(mismatch(other, "float")),
    }
}

fn as_string(scalar: &Scalar) -> Result<String, String> {
    match scalar {
        Scalar::String(s) => Ok(s.clone()),
        other => Err(mismatch(other, "string")),
    }
}

fn as_micros(scalar: &Scalar, lenient: bool) -> Result<i64, String> {
    match scalar {
        Scalar::Timestamp(micros) | Scalar::Int(micros) => Ok(*micros),
        Scalar::String(s) if lenient => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc).timestamp_micros())
            .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp: {e}")),
        other => Err(mismatch(other, "timestamp")),
    }
}

// -2^63 is exact in f64; 2^63 is the first value past i64::MAX.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;
const U64_UPPER: f64 = 18_446_744_073_709_551_616.0;

fn float_to_i64(f: f64) -> Result<i64, String> {
    if f.fract() == 0.0 && (I64_LOWER..I64_UPPER).contains(&f) {
        Ok(f as i64)
    } else {
        Err(format!("{f} is not an integral value in i64 range"))
    }
}

fn float_to_u64(f: f64) -> Result<u64, String> {
    if f.fract() == 0.0 && (0.0..U64_UPPER).contains(&f) {
        Ok(f as u64)
    } else {
        Err(format!("{f} is not an integral value in u64 range"))
    }
}

// ---------------------------------------------------------------------------
// ScalarValue impls
// ---------------------------------------------------------------------------

macro_rules! signed_scalar {
    ($($ty:ty),*) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::Int;

                fn to_scalar(&self) -> Scalar {
                    Scalar::Int(*self as i64)
                }

                fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
                    let wide = as_i64(scalar, config.lenient_numbers).map_err(fail::<$ty>)?;
                    <$ty>::try_from(wide)
                        .map_err(|_| fail::<$ty>(format!("{wide} out of range")))
                }
            }
        )*
    };
}

macro_rules! unsigned_scalar {
    ($($ty:ty),*) => {
        $(
            impl ScalarValue for $ty {
                const KIND: ScalarKind = ScalarKind::UInt;

                fn to_scalar(&self) -> Scalar {
                    Scalar::UInt(*self as u64)
                }

                fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
                    let wide = as_u64(scalar, config.lenient_numbers).map_err(fail::<$ty>)?;
                    <$ty>::try_from(wide)
                        .map_err(|_| fail::<$ty>(format!("{wide} out of range")))
                }
            }
        )*
    };
}

signed_scalar!(i8, i16, i32, i64, isize);
unsigned_scalar!(u8, u16, u32, u64, usize);

impl ScalarValue for f64 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_scalar(&self) -> Scalar {
        Scalar::Float(*self)
    }

    fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
        as_f64(scalar, config.lenient_numbers).map_err(fail::<f64>)
    }
}

impl ScalarValue for f32 {
    const KIND: ScalarKind = ScalarKind::Float;

    fn to_scalar(&self) -> Scalar {
        Scalar::Float(*self as f64)
    }

    fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
        let wide = as_f64(scalar, config.lenient_numbers).map_err(fail::<f32>)?;
        if wide.is_finite() && wide.abs() > f32::MAX as f64 {
            return Err(fail::<f32>(format!("{wide} out of range")));
        }
        Ok(wide as f32)
    }
}

impl ScalarValue for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    fn to_scalar(&self) -> Scalar {
        Scalar::Bool(*self)
    }

    fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
        as_bool(scalar, config.lenient_numbers).map_err(fail::<bool>)
    }
}

impl ScalarValue for String {
    const KIND: ScalarKind = ScalarKind::String;

    fn to_scalar(&self) -> Scalar {
        Scalar::String(self.clone())
    }

    fn from_scalar(scalar: &Scalar, _config: &CodecConfig) -> Result<Self, ConversionError> {
        as_string(scalar).map_err(fail::<String>)
    }
}

impl ScalarValue for char {
    const KIND: ScalarKind = ScalarKind::String;

    fn to_scalar(&self) -> Scalar {
        Scalar::String(self.to_string())
    }

    fn from_scalar(scalar: &Scalar, _config: &CodecConfig) -> Result<Self, ConversionError> {
        let s = as_string(scalar).map_err(fail::<char>)?;
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(fail::<char>(format!("'{s}' is not a single character"))),
        }
    }
}

impl ScalarValue for DateTime<Utc> {
    const KIND: ScalarKind = ScalarKind::Timestamp;

    fn to_scalar(&self) -> Scalar {
        Scalar::Timestamp(self.timestamp_micros())
    }

    fn from_scalar(scalar: &Scalar, config: &CodecConfig) -> Result<Self, ConversionError> {
        let micros = as_micros(scalar, config.lenient_numbers).map_err(fail::<DateTime<Utc>>)?;
        DateTime::<Utc>::from_timestamp_micros(micros)
            .ok_or_else(|| fail::<DateTime<Utc>>(format!("{micros} out of range")))
    }
}
