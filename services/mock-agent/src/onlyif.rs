//! Preconditions for running mock CN tooling.
//!
//! Tools that act on behalf of a mock CN must know which server they are
//! acting as; the identity comes from `MOCKCN_SERVER_UUID`.

use thiserror::Error;

/// Environment variable naming the mock CN a tool acts as.
pub const SERVER_UUID_VAR: &str = "MOCKCN_SERVER_UUID";

/// A precondition that does not hold.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OnlyIfError {
    #[error("You must set MOCKCN_SERVER_UUID")]
    MissingServerUuid,
}

/// Check that we run as a mock CN in the global zone.
///
/// Returns the server UUID from the environment.
pub fn root_in_smartos_global() -> Result<String, OnlyIfError> {
    check_server_uuid(std::env::var(SERVER_UUID_VAR).ok())
}

fn check_server_uuid(value: Option<String>) -> Result<String, OnlyIfError> {
    match value {
        Some(uuid) if !uuid.is_empty() => Ok(uuid),
        _ => Err(OnlyIfError::MissingServerUuid),
    }
}
