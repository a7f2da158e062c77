//! Filtering untrusted inventory input against the field schema.

use mockcn_id::ServerUuid;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::schema::{field_spec, fields, FIELD_SCHEMA};
use super::InventoryRecord;

/// Errors that reject a whole inventory payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more recognized fields failed their validator.
    #[error("invalid value for field(s): {}", .fields.join(", "))]
    InvalidField { fields: Vec<String> },

    /// The payload names a different server than the request path.
    #[error("UUID in payload ({payload}) does not match target ({target})")]
    IdentifierMismatch { payload: String, target: String },
}

/// How strictly composite fields are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Composite fields are accepted as-is.
    #[default]
    Lenient,
    /// Composite fields must be mappings of mappings.
    Strict,
}

/// Validates client-supplied inventory records.
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryValidator {
    mode: ValidationMode,
}

impl InventoryValidator {
    /// Create a validator.
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    /// Validate `record` for the server `server_uuid`.
    ///
    /// Returns only the recognized fields. Unknown fields are dropped. Any
    /// invalid recognized field, or a `UUID` naming another server, rejects
    /// the record as a whole.
    pub fn validate(
        &self,
        server_uuid: &ServerUuid,
        record: &InventoryRecord,
    ) -> Result<InventoryRecord, ValidationError> {
        let mut validated = InventoryRecord::new();
        let mut invalid = Vec::new();

        for (key, value) in record {
            let Some(spec) = field_spec(key) else {
                info!(field = %key, "Ignoring field");
                continue;
            };

            if spec.kind.accepts(value, self.mode) {
                validated.insert(key.clone(), value.clone());
            } else {
                debug!(field = %key, value = %value, "Field failed validation");
                invalid.push(key.clone());
            }
        }

        if let Some(payload) = record.get(fields::UUID) {
            let target = server_uuid.to_string();
            if payload.as_str() != Some(target.as_str()) {
                let payload = match payload {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                return Err(ValidationError::IdentifierMismatch { payload, target });
            }
        }

        if !invalid.is_empty() {
            return Err(ValidationError::InvalidField { fields: invalid });
        }

        Ok(validated)
    }
}

/// Required schema fields absent from `record`.
pub fn missing_required(record: &InventoryRecord) -> Vec<&'static str> {
    FIELD_SCHEMA
        .iter()
        .filter(|spec| !spec.optional && !record.contains_key(spec.name))
        .map(|spec| spec.name)
        .collect()
}
