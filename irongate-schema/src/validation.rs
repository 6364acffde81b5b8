//! Schema validation utilities.
//!
//! Checks run once when a [`MessageSchema`](crate::MessageSchema) is built and
//! when a codec is assembled from a set of schemas.

use crate::error::SchemaError;
use crate::field::{FieldDescriptor, TYPE_ATTRIBUTE, UNIT_ATTRIBUTE};
use crate::messages::MessageSchema;
use irongate_core::FieldType;
use std::collections::{HashMap, HashSet};

/// Largest payload the 16-bit MessageLength header can describe.
pub const MAX_PAYLOAD_LENGTH: usize = u16::MAX as usize;

/// Validates the fields of one message.
///
/// # Errors
/// Returns `SchemaError` describing the first problem found.
pub fn validate_fields(message: &str, fields: &[FieldDescriptor]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                message: message.to_string(),
                field: field.name.clone(),
            });
        }
        validate_field(field)?;
    }

    let mut by_offset: Vec<&FieldDescriptor> = fields.iter().collect();
    by_offset.sort_by_key(|f| f.offset());
    let mut end = 0;
    for field in by_offset {
        if field.offset() < end {
            return Err(SchemaError::OverlappingField {
                message: message.to_string(),
                field: field.name.clone(),
                offset: field.offset(),
            });
        }
        end = field.end_offset();
    }

    if end > MAX_PAYLOAD_LENGTH {
        return Err(SchemaError::PayloadTooLarge {
            message: message.to_string(),
            length: end,
            max: MAX_PAYLOAD_LENGTH,
        });
    }

    Ok(())
}

/// Validates a single field descriptor.
fn validate_field(field: &FieldDescriptor) -> Result<(), SchemaError> {
    if field.length == 0 {
        return Err(SchemaError::missing_attr(&field.name, "length"));
    }
    if !field.field_type.supports_length(field.length) {
        return Err(SchemaError::UnsupportedLength {
            field: field.name.clone(),
            field_type: field.field_type,
            length: field.length,
        });
    }

    match field.field_type {
        FieldType::DecimalUint | FieldType::DecimalPrice => {
            if field.get_attribute(TYPE_ATTRIBUTE).is_none() {
                return Err(SchemaError::missing_attr(&field.name, TYPE_ATTRIBUTE));
            }
        }
        FieldType::DateTime => {
            if field.time_unit().is_none() {
                return Err(SchemaError::InvalidAttribute {
                    field: field.name.clone(),
                    attribute: UNIT_ATTRIBUTE.to_string(),
                    value: field
                        .get_attribute(UNIT_ATTRIBUTE)
                        .unwrap_or_default()
                        .to_string(),
                });
            }
        }
        _ => {}
    }

    Ok(())
}

/// Checks that no two schemas share a wire type code.
///
/// # Errors
/// Returns [`SchemaError::DuplicateTypeCode`] naming both schemas.
pub fn validate_type_codes<'a, I>(schemas: I) -> Result<(), SchemaError>
where
    I: IntoIterator<Item = &'a MessageSchema>,
{
    let mut codes: HashMap<u8, &str> = HashMap::new();
    for schema in schemas {
        if let Some(first) = codes.insert(schema.type_code(), schema.name()) {
            return Err(SchemaError::DuplicateTypeCode {
                type_code: schema.type_code(),
                first: first.to_string(),
                second: schema.name().to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(name: &str, code: u8) -> MessageSchema {
        MessageSchema::new(
            name,
            "T",
            code,
            vec![FieldDescriptor::new("A", FieldType::Int32, 4)],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_type_code() {
        let schemas = [schema("Logon", b'A'), schema("Heartbeat", b'0'), schema("Other", b'A')];
        let err = validate_type_codes(&schemas).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateTypeCode {
                type_code: b'A',
                first: "Logon".to_string(),
                second: "Other".to_string(),
            }
        );
        assert!(validate_type_codes(&schemas[..2]).is_ok());
    }

    #[test]
    fn test_zero_length_field() {
        let fields = [FieldDescriptor::new("Text", FieldType::Alpha, 0).at(0)];
        assert_eq!(
            validate_fields("M", &fields),
            Err(SchemaError::missing_attr("Text", "length"))
        );
    }

    #[test]
    fn test_invalid_time_unit() {
        let fields = [FieldDescriptor::new("Ts", FieldType::DateTime, 8)
            .at(0)
            .attribute(UNIT_ATTRIBUTE, "weeks")];
        assert!(matches!(
            validate_fields("M", &fields),
            Err(SchemaError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_payload_too_large() {
        let fields = [FieldDescriptor::new("Blob", FieldType::Alpha, MAX_PAYLOAD_LENGTH + 1).at(0)];
        assert!(matches!(
            validate_fields("M", &fields),
            Err(SchemaError::PayloadTooLarge { .. })
        ));
    }
}
