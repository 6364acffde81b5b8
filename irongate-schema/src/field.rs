//! Field descriptors.

use irongate_core::{FieldType, TimeUnit, Value};
use std::collections::BTreeMap;

/// Attribute selecting the representation of decimal fields (`Uint64` or `Price`).
pub const TYPE_ATTRIBUTE: &str = "Type";

/// Attribute selecting the epoch unit of `DateTime` fields.
pub const UNIT_ATTRIBUTE: &str = "Unit";

/// Field presence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Presence {
    /// Field is mandatory; absent values fail unless a default is declared.
    #[default]
    Required,
    /// Field may be absent; absent values are written as padding.
    Optional,
}

/// Description of one field in a binary message layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: String,
    /// Namespace the field belongs to.
    pub namespace: String,
    /// Semantic type.
    pub field_type: FieldType,
    /// Offset relative to the payload start, assigned sequentially when `None`.
    pub offset: Option<usize>,
    /// Width in bytes.
    pub length: usize,
    /// Decimal digits applied to scaled numeric fields.
    pub precision: u8,
    /// Free-form protocol attributes.
    pub attributes: BTreeMap<String, String>,
    /// Presence.
    pub presence: Presence,
    /// Value used when the message does not carry the field.
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// Creates a required field with sequential offset and precision 0.
    #[must_use]
    pub fn new(name: impl Into<String>, field_type: FieldType, length: usize) -> Self {
        Self {
            name: name.into(),
            namespace: String::new(),
            field_type,
            offset: None,
            length,
            precision: 0,
            attributes: BTreeMap::new(),
            presence: Presence::Required,
            default: None,
        }
    }

    /// Sets an explicit offset.
    #[must_use]
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the precision.
    #[must_use]
    pub fn precision(mut self, precision: u8) -> Self {
        self.precision = precision;
        self
    }

    /// Adds a protocol attribute.
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Marks the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.presence = Presence::Optional;
        self
    }

    /// Declares a default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Returns the resolved offset (0 before the owning schema assigned one).
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or_default()
    }

    /// Returns the end offset (offset + length).
    #[must_use]
    pub fn end_offset(&self) -> usize {
        self.offset() + self.length
    }

    /// Returns an attribute value.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns the epoch unit of a `DateTime` field, `None` if the attribute is malformed.
    #[must_use]
    pub fn time_unit(&self) -> Option<TimeUnit> {
        match self.get_attribute(UNIT_ATTRIBUTE) {
            None => Some(TimeUnit::default()),
            Some(unit) => unit.parse().ok(),
        }
    }

    /// Returns true if the field is optional.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        self.presence == Presence::Optional
    }
}
