//! Compute node inventory records.
//!
//! An inventory record is the sysinfo-style document a compute node reports
//! about itself. Records arrive from clients partially filled and untrusted;
//! this module defines the field schema and filters input down to the
//! recognized, valid subset before defaults are applied.

mod schema;
mod validate;

pub use schema::{fields, field_spec, CompositeKind, FieldSpec, ValidatorKind, FIELD_SCHEMA};
pub use validate::{missing_required, InventoryValidator, ValidationError, ValidationMode};

/// A compute node inventory record: field name to JSON value, in insertion
/// order.
pub type InventoryRecord = serde_json::Map<String, serde_json::Value>;
