//! Local state persistence for the mock agent.
//!
//! This module provides JSON-file storage for node index assignments:
//! each mock CN that has ever been created gets a small integer index,
//! stable across requests and restarts, which is embedded in its MAC
//! addresses.

mod store;

pub use store::{NodeIndexAssignment, NodeState, StateStore, StateStoreError};
