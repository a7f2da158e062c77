//! Mock compute node agent library.
//!
//! The mock agent emulates a fleet of compute nodes (CNs) on a single host
//! so that orchestration services can be exercised without real hardware.
//!
//! ## Architecture
//!
//! ```text
//! main
//! ├── NodeInstanceRegistry  (one agent per entry of the mock CN directory)
//! │   └── UrAgent(uuid)     (per-CN registration heartbeat)
//! └── ControlAPI            (create/read/delete mock CN records)
//!     ├── InventoryValidator
//!     └── DefaultsEngine    (metadata, canned profiles, node indexes)
//! ```
//!
//! ## Modules
//!
//! - `agent`: Mock CN agent trait and the built-in agent
//! - `api`: HTTP routing and handlers
//! - `defaults`: Inventory completion
//! - `inventory`: Field schema and validation
//! - `registry`: Directory-driven reconciliation loop
//! - `state`: Node index persistence

pub mod agent;
pub mod api;
pub mod config;
pub mod context;
pub mod defaults;
pub mod inventory;
pub mod metadata;
pub mod onlyif;
pub mod profiles;
pub mod registry;
pub mod state;

// Re-export commonly used types
pub use agent::{AgentFactory, AgentSpec, NodeAgent, UrAgentFactory};
pub use context::AppState;
pub use defaults::DefaultsEngine;
pub use registry::NodeInstanceRegistry;
