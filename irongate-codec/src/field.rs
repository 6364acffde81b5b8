//! Per-field encode/decode rules.
//!
//! Each function works on the field's own byte window (exactly `length` bytes
//! starting at the field offset) and dispatches on the field type once.

use crate::error::{CodecError, Result};
use irongate_core::buffer::{fits_signed, fits_unsigned};
use irongate_core::{Decimal, FieldType, ReadBuffer, Value, WriteBuffer, encode_latin1};
use irongate_schema::{FieldDescriptor, TYPE_ATTRIBUTE};

/// `Type` attribute value selecting an unsigned decimal representation.
pub const UINT64_REPRESENTATION: &str = "Uint64";

/// `Type` attribute value selecting a signed decimal representation.
pub const PRICE_REPRESENTATION: &str = "Price";

/// Encodes one value into the field window `out`.
///
/// `out` must be exactly `field.length` bytes.
///
/// # Errors
/// Returns [`CodecError`] if the value cannot be represented; `out` may be
/// partially written in that case.
pub fn encode_field(field: &FieldDescriptor, value: &Value, out: &mut [u8]) -> Result<()> {
    check_width(field)?;
    if value.is_null() {
        return Err(CodecError::NullFieldValue {
            field: field.name.clone(),
        });
    }

    let width = field.length;
    match field.field_type {
        FieldType::String | FieldType::Alpha => {
            let text = value
                .as_str()
                .ok_or_else(|| CodecError::type_mismatch(&field.name, field.field_type, value.kind()))?;
            let bytes = encode_latin1(text).map_err(|character| CodecError::UnmappableCharacter {
                field: field.name.clone(),
                character,
            })?;
            if bytes.len() > width {
                return Err(CodecError::TooLongStringValue {
                    field: field.name.clone(),
                    length: bytes.len(),
                    max: width,
                });
            }
            out.put_padded_bytes(0, &bytes, width);
        }
        FieldType::Int32 => {
            let raw = integral(field, value)?;
            let raw = i32::try_from(raw).map_err(|_| CodecError::out_of_range(&field.name, raw))?;
            out.put_int_le(0, width, i64::from(raw));
        }
        FieldType::Int64 => {
            let raw = integral(field, value)?;
            out.put_int_le(0, width, raw);
        }
        FieldType::Float32 | FieldType::Float64 => {
            let raw = scaled(field, value)?;
            put_signed(field, raw, out)?;
        }
        FieldType::DecimalUint | FieldType::DecimalPrice => {
            let raw = scaled(field, value)?;
            if representation_is_signed(field)? {
                put_signed(field, raw, out)?;
            } else {
                let raw = u64::try_from(raw)
                    .ok()
                    .filter(|v| fits_unsigned(*v, width))
                    .ok_or_else(|| CodecError::out_of_range(&field.name, raw))?;
                out.put_uint_le(0, width, raw);
            }
        }
        FieldType::DateTime => {
            let unit = time_unit(field)?;
            let count = match value {
                Value::DateTime(ts) => unit
                    .to_epoch(ts)
                    .ok_or_else(|| CodecError::out_of_range(&field.name, ts))?,
                Value::Int32(_) | Value::Int64(_) => integral(field, value)?,
                other => {
                    return Err(CodecError::type_mismatch(&field.name, field.field_type, other.kind()));
                }
            };
            put_signed(field, i128::from(count), out)?;
        }
    }
    Ok(())
}

/// Writes the filler used for an absent optional field: spaces for text, zeros otherwise.
pub fn encode_absent(field: &FieldDescriptor, out: &mut [u8]) {
    if field.field_type.is_text() {
        out.put_padded_bytes(0, &[], field.length);
    } else {
        out.fill(0);
    }
}

/// Decodes one value from the field window `bytes`.
///
/// `bytes` must be exactly `field.length` bytes.
///
/// # Errors
/// Returns [`CodecError`] if the width or attributes are unusable or the raw
/// value cannot be represented.
pub fn decode_field(field: &FieldDescriptor, bytes: &[u8]) -> Result<Value> {
    check_width(field)?;

    let width = field.length;
    let value = match field.field_type {
        FieldType::String | FieldType::Alpha => Value::Str(bytes.get_padded_str(0, width)),
        FieldType::Int32 => {
            let raw = bytes.get_int_le(0, width);
            Value::Int32(i32::try_from(raw).map_err(|_| CodecError::out_of_range(&field.name, raw))?)
        }
        FieldType::Int64 => Value::Int64(bytes.get_int_le(0, width)),
        FieldType::Float32 => {
            let raw = bytes.get_int_le(0, width);
            Value::Float32(unscale(raw, field.precision) as f32)
        }
        FieldType::Float64 => {
            let raw = bytes.get_int_le(0, width);
            Value::Float64(unscale(raw, field.precision))
        }
        FieldType::DecimalUint | FieldType::DecimalPrice => {
            let raw = if representation_is_signed(field)? {
                bytes.get_int_le(0, width)
            } else {
                let raw = bytes.get_uint_le(0, width);
                i64::try_from(raw).map_err(|_| CodecError::out_of_range(&field.name, raw))?
            };
            let exponent = i8::try_from(field.precision)
                .map_err(|_| CodecError::out_of_range(&field.name, field.precision))?;
            Value::Decimal(Decimal::new(raw, -exponent))
        }
        FieldType::DateTime => {
            let raw = bytes.get_int_le(0, width);
            let ts = time_unit(field)?
                .from_epoch(raw)
                .ok_or_else(|| CodecError::out_of_range(&field.name, raw))?;
            Value::DateTime(ts)
        }
    };
    Ok(value)
}

fn check_width(field: &FieldDescriptor) -> Result<()> {
    if field.field_type.supports_length(field.length) {
        Ok(())
    } else {
        Err(CodecError::UnsupportedLength {
            field: field.name.clone(),
            field_type: field.field_type,
            length: field.length,
        })
    }
}

fn integral(field: &FieldDescriptor, value: &Value) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| CodecError::type_mismatch(&field.name, field.field_type, value.kind()))
}

/// Converts a numeric value to `value * 10^precision`, rounded half-up.
fn scaled(field: &FieldDescriptor, value: &Value) -> Result<i128> {
    let decimal = match value {
        Value::Int32(v) => Decimal::from(i64::from(*v)),
        Value::Int64(v) => Decimal::from(*v),
        Value::Float32(v) => Decimal::from_f32(*v).map_err(|_| CodecError::out_of_range(&field.name, v))?,
        Value::Float64(v) => Decimal::from_f64(*v).map_err(|_| CodecError::out_of_range(&field.name, v))?,
        Value::Decimal(v) => *v,
        Value::Str(text) => text
            .trim()
            .parse()
            .map_err(|_| CodecError::type_mismatch(&field.name, field.field_type, value.kind()))?,
        other => {
            return Err(CodecError::type_mismatch(&field.name, field.field_type, other.kind()));
        }
    };
    decimal
        .scaled(field.precision)
        .ok_or_else(|| CodecError::out_of_range(&field.name, decimal))
}

fn put_signed(field: &FieldDescriptor, raw: i128, out: &mut [u8]) -> Result<()> {
    let raw = i64::try_from(raw)
        .ok()
        .filter(|v| fits_signed(*v, field.length))
        .ok_or_else(|| CodecError::out_of_range(&field.name, raw))?;
    out.put_int_le(0, field.length, raw);
    Ok(())
}

fn unscale(raw: i64, precision: u8) -> f64 {
    raw as f64 / 10f64.powi(i32::from(precision))
}

fn representation_is_signed(field: &FieldDescriptor) -> Result<bool> {
    match field.get_attribute(TYPE_ATTRIBUTE) {
        Some(UINT64_REPRESENTATION) => Ok(false),
        Some(PRICE_REPRESENTATION) => Ok(true),
        other => Err(CodecError::UnknownAttributeType {
            field: field.name.clone(),
            value: other.map(str::to_string),
        }),
    }
}

fn time_unit(field: &FieldDescriptor) -> Result<irongate_core::TimeUnit> {
    field.time_unit().ok_or_else(|| CodecError::UnknownAttributeType {
        field: field.name.clone(),
        value: field
            .get_attribute(irongate_schema::UNIT_ATTRIBUTE)
            .map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use irongate_schema::UNIT_ATTRIBUTE;

    fn encode(field: &FieldDescriptor, value: impl Into<Value>) -> Result<Vec<u8>> {
        let mut out = vec![0u8; field.length];
        encode_field(field, &value.into(), &mut out)?;
        Ok(out)
    }

    #[test]
    fn test_int32_max() {
        let field = FieldDescriptor::new("Qty", FieldType::Int32, 4);
        let bytes = encode(&field, 2_147_483_647i32).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xFF, 0xFF, 0x7F]);
        assert_eq!(decode_field(&field, &bytes).unwrap(), Value::Int32(2_147_483_647));
    }

    #[test]
    fn test_int32_rejects_out_of_range_int64() {
        let field = FieldDescriptor::new("Qty", FieldType::Int32, 4);
        assert!(matches!(
            encode(&field, i64::from(i32::MAX) + 1),
            Err(CodecError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_integer_width_validation() {
        for (field_type, length) in [(FieldType::Int32, 8), (FieldType::Int32, 2), (FieldType::Int64, 4)] {
            let field = FieldDescriptor::new("N", field_type, length);
            assert!(matches!(encode(&field, 1i32), Err(CodecError::UnsupportedLength { .. })));
            assert!(matches!(
                decode_field(&field, &vec![0u8; length]),
                Err(CodecError::UnsupportedLength { .. })
            ));
        }
    }

    #[test]
    fn test_decimal_uint() {
        let field = FieldDescriptor::new("Qty", FieldType::DecimalUint, 8).attribute(TYPE_ATTRIBUTE, "Uint64");
        let bytes = encode(&field, 10i64).unwrap();
        assert_eq!(bytes, 10u64.to_le_bytes().to_vec());
        assert_eq!(decode_field(&field, &bytes).unwrap(), Value::Decimal(Decimal::from(10)));

        assert!(matches!(encode(&field, -1i64), Err(CodecError::ValueOutOfRange { .. })));
    }

    #[test]
    fn test_decimal_price_scaling() {
        let field = FieldDescriptor::new("Px", FieldType::DecimalPrice, 8)
            .precision(4)
            .attribute(TYPE_ATTRIBUTE, "Price");
        let bytes = encode(&field, -150.12345).unwrap();
        // half-up away from zero
        assert_eq!(bytes, (-1_501_235i64).to_le_bytes().to_vec());
        assert_eq!(
            decode_field(&field, &bytes).unwrap(),
            Value::Decimal("-150.1235".parse().unwrap())
        );
    }

    #[test]
    fn test_unknown_attribute_type() {
        let missing = FieldDescriptor::new("Px", FieldType::DecimalPrice, 8);
        assert_eq!(
            encode(&missing, 1i32),
            Err(CodecError::UnknownAttributeType {
                field: "Px".to_string(),
                value: None
            })
        );
        let bogus = missing.attribute(TYPE_ATTRIBUTE, "Int128");
        assert!(matches!(
            decode_field(&bogus, &[0u8; 8]),
            Err(CodecError::UnknownAttributeType { value: Some(_), .. })
        ));
    }

    #[test]
    fn test_float_rounding_half_up() {
        let field = FieldDescriptor::new("Rate", FieldType::Float64, 4).precision(2);
        let bytes = encode(&field, 2.675f64).unwrap();
        assert_eq!(bytes, 268i32.to_le_bytes().to_vec());
        assert_eq!(decode_field(&field, &bytes).unwrap(), Value::Float64(2.68));

        let narrow = FieldDescriptor::new("Rate", FieldType::Float32, 1);
        assert!(matches!(encode(&narrow, 128.0f32), Err(CodecError::ValueOutOfRange { .. })));
        assert_eq!(encode(&narrow, -127.6f32).unwrap(), vec![0x80]);
    }

    #[test]
    fn test_string_padding_and_truncation_guard() {
        let field = FieldDescriptor::new("CompID", FieldType::Alpha, 6);
        assert_eq!(encode(&field, "ABC").unwrap(), b"ABC   ".to_vec());
        assert_eq!(encode(&field, "ABCDEF").unwrap(), b"ABCDEF".to_vec());
        assert_eq!(
            encode(&field, "ABCDEFG"),
            Err(CodecError::TooLongStringValue {
                field: "CompID".to_string(),
                length: 7,
                max: 6
            })
        );
        assert!(matches!(
            encode(&field, "\u{20AC}"),
            Err(CodecError::UnmappableCharacter { character: '\u{20AC}', .. })
        ));
        assert_eq!(decode_field(&field, b"AB\0\0  ").unwrap(), Value::Str("AB".to_string()));
    }

    #[test]
    fn test_null_value() {
        let field = FieldDescriptor::new("Qty", FieldType::Int64, 8);
        assert_eq!(
            encode(&field, Value::Null),
            Err(CodecError::NullFieldValue {
                field: "Qty".to_string()
            })
        );
    }

    #[test]
    fn test_datetime_units() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let seconds = FieldDescriptor::new("SendingTime", FieldType::DateTime, 4);
        let bytes = encode(&seconds, ts).unwrap();
        assert_eq!(bytes, (ts.timestamp() as i32).to_le_bytes().to_vec());
        assert_eq!(decode_field(&seconds, &bytes).unwrap(), Value::DateTime(ts));

        let millis = FieldDescriptor::new("SendingTime", FieldType::DateTime, 8).attribute(UNIT_ATTRIBUTE, "ms");
        let bytes = encode(&millis, ts).unwrap();
        assert_eq!(bytes, ts.timestamp_millis().to_le_bytes().to_vec());
    }

    fn assert_round_trip(field: &FieldDescriptor, value: Value) {
        let context = format!(
            "{:?} width {} precision {} value {value:?}",
            field.field_type, field.length, field.precision
        );
        let bytes = encode(field, value.clone()).unwrap_or_else(|err| panic!("{context}: {err}"));
        assert_eq!(decode_field(field, &bytes).unwrap(), value, "{context}");
    }

    /// Smallest and largest signed integers of `width` bytes.
    fn signed_bounds(width: usize) -> (i64, i64) {
        let shift = 64 - 8 * width as u32;
        (i64::MIN >> shift, i64::MAX >> shift)
    }

    #[test]
    fn test_scaled_types_round_trip_at_every_width() {
        for width in [1usize, 2, 4, 8] {
            let (min, max) = signed_bounds(width);
            let unsigned_max = i64::try_from(u64::MAX >> (64 - 8 * width as u32)).unwrap_or(i64::MAX);
            for precision in [0u8, 2, 4] {
                let exponent = -i8::try_from(precision).unwrap();
                let divisor = 10f64.powi(i32::from(precision));

                let price = FieldDescriptor::new("Px", FieldType::DecimalPrice, width)
                    .precision(precision)
                    .attribute(TYPE_ATTRIBUTE, PRICE_REPRESENTATION);
                for raw in [min, -1, 0, 1, max] {
                    assert_round_trip(&price, Value::Decimal(Decimal::new(raw, exponent)));
                }

                let qty = FieldDescriptor::new("Qty", FieldType::DecimalUint, width)
                    .precision(precision)
                    .attribute(TYPE_ATTRIBUTE, UINT64_REPRESENTATION);
                for raw in [0, 1, unsigned_max] {
                    assert_round_trip(&qty, Value::Decimal(Decimal::new(raw, exponent)));
                }

                // 15 significant digits survive a trip through f64, 6 through f32
                let rate = FieldDescriptor::new("Rate", FieldType::Float64, width).precision(precision);
                let limit = 999_999_999_999_999;
                for raw in [min.max(-limit), -1, 0, max.min(limit)] {
                    assert_round_trip(&rate, Value::Float64(raw as f64 / divisor));
                }

                let ratio = FieldDescriptor::new("Ratio", FieldType::Float32, width).precision(precision);
                for raw in [min.max(-999_999), 0, 1, max.min(999_999)] {
                    assert_round_trip(&ratio, Value::Float32((raw as f64 / divisor) as f32));
                }
            }
        }
    }

    #[test]
    fn test_integers_round_trip_at_bounds() {
        let int32 = FieldDescriptor::new("Qty", FieldType::Int32, 4);
        for value in [i32::MIN, -1, 0, i32::MAX] {
            assert_round_trip(&int32, Value::Int32(value));
        }
        let int64 = FieldDescriptor::new("SeqNum", FieldType::Int64, 8);
        for value in [i64::MIN, -1, 0, i64::MAX] {
            assert_round_trip(&int64, Value::Int64(value));
        }
    }

    #[test]
    fn test_datetime_round_trip_per_unit() {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let cases = [
            ("s", base),
            ("ms", base + chrono::Duration::milliseconds(123)),
            ("us", base + chrono::Duration::microseconds(123_456)),
            ("ns", base + chrono::Duration::nanoseconds(123_456_789)),
        ];
        for (unit, ts) in cases {
            let field = FieldDescriptor::new("TransactTime", FieldType::DateTime, 8).attribute(UNIT_ATTRIBUTE, unit);
            assert_round_trip(&field, Value::DateTime(ts));
        }

        let seconds = FieldDescriptor::new("SendingTime", FieldType::DateTime, 4);
        for count in [i64::from(i32::MIN), 0, i64::from(i32::MAX)] {
            let ts = DateTime::from_timestamp(count, 0).unwrap();
            assert_round_trip(&seconds, Value::DateTime(ts));
        }

        let short_millis = FieldDescriptor::new("Elapsed", FieldType::DateTime, 4).attribute(UNIT_ATTRIBUTE, "ms");
        assert_round_trip(&short_millis, Value::DateTime(DateTime::from_timestamp_millis(1_500).unwrap()));

        let nanos = FieldDescriptor::new("TransactTime", FieldType::DateTime, 8).attribute(UNIT_ATTRIBUTE, "ns");
        assert_round_trip(&nanos, Value::DateTime(DateTime::from_timestamp_nanos(i64::MAX)));
    }

    #[test]
    fn test_tiny_float_encodes_as_zero() {
        let field = FieldDescriptor::new("Rate", FieldType::Float64, 8).precision(4);
        assert_eq!(encode(&field, 1e-200f64).unwrap(), vec![0u8; 8]);
    }

    #[test]
    fn test_type_mismatch() {
        let field = FieldDescriptor::new("Qty", FieldType::Int32, 4);
        assert!(matches!(encode(&field, "ten"), Err(CodecError::TypeMismatch { found: "string", .. })));
    }
}
