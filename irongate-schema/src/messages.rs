//! Message schema definitions.

use crate::error::SchemaError;
use crate::field::FieldDescriptor;
use crate::validation::validate_fields;

/// Immutable description of one message layout.
///
/// Fields are kept in declaration order, which is also encode/decode order.
/// Offsets left unset on the descriptors are assigned sequentially at
/// construction, after which the schema never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    name: String,
    namespace: String,
    type_code: u8,
    fields: Vec<FieldDescriptor>,
    payload_length: usize,
}

impl MessageSchema {
    /// Builds and validates a message schema.
    ///
    /// # Arguments
    /// * `name` - Message name
    /// * `namespace` - Dictionary namespace
    /// * `type_code` - Wire discriminator written into the MessageType header field
    /// * `fields` - Field descriptors in encode order
    ///
    /// # Errors
    /// Returns [`SchemaError`] if a width is unsupported, a required attribute
    /// is missing, a name is duplicated or two fields overlap.
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        type_code: u8,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let namespace = namespace.into();

        let mut next_offset = 0;
        let fields: Vec<FieldDescriptor> = fields
            .into_iter()
            .map(|mut field| {
                let offset = *field.offset.get_or_insert(next_offset);
                next_offset = offset + field.length;
                if field.namespace.is_empty() {
                    field.namespace.clone_from(&namespace);
                }
                field
            })
            .collect();

        validate_fields(&name, &fields)?;

        let payload_length = fields
            .iter()
            .map(FieldDescriptor::end_offset)
            .max()
            .unwrap_or(0);

        Ok(Self {
            name,
            namespace,
            type_code,
            fields,
            payload_length,
        })
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(
        name: impl Into<String>,
        namespace: impl Into<String>,
        type_code: u8,
    ) -> MessageSchemaBuilder {
        MessageSchemaBuilder {
            name: name.into(),
            namespace: namespace.into(),
            type_code,
            fields: Vec::new(),
        }
    }

    /// Returns the message name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the wire type code.
    #[must_use]
    pub const fn type_code(&self) -> u8 {
        self.type_code
    }

    /// Returns the fields in encode order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the payload length in bytes (frame length minus header).
    #[must_use]
    pub const fn payload_length(&self) -> usize {
        self.payload_length
    }
}

/// Builder for [`MessageSchema`].
#[derive(Debug)]
pub struct MessageSchemaBuilder {
    name: String,
    namespace: String,
    type_code: u8,
    fields: Vec<FieldDescriptor>,
}

impl MessageSchemaBuilder {
    /// Appends a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Validates and builds the schema.
    ///
    /// # Errors
    /// See [`MessageSchema::new`].
    pub fn build(self) -> Result<MessageSchema, SchemaError> {
        MessageSchema::new(self.name, self.namespace, self.type_code, self.fields)
    }
}
