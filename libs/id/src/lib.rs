//! # mockcn-id
//!
//! Server identifier parsing and validation for mock compute nodes.
//!
//! ## Design Principles
//!
//! - Server identifiers are UUIDs in their canonical textual form
//! - Parsing is strict: exactly 36 characters, lowercase hex, hyphens at
//!   the 8-4-4-4-12 group boundaries
//! - Identifiers roundtrip through their string form (parse → format → parse)
//!
//! ## Example
//!
//! ```
//! use mockcn_id::{is_uuid, ServerUuid};
//!
//! let id: ServerUuid = "564d6fa9-b1e2-4cd4-a9d2-3f3c6e1b0a4d".parse().unwrap();
//! assert_eq!(id.to_string(), "564d6fa9-b1e2-4cd4-a9d2-3f3c6e1b0a4d");
//!
//! assert!(!is_uuid("564D6FA9-B1E2-4CD4-A9D2-3F3C6E1B0A4D"));
//! assert!(!is_uuid("123"));
//! ```

mod error;
mod types;

pub use error::IdError;
pub use types::{is_uuid, ServerUuid};
