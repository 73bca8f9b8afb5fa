/*!
 * Prelude module for canflow Core.
 *
 * This module re-exports commonly used types and functions from the canflow
 * Core crate to make them easier to import.
 */

// Re-export error types
pub use crate::error::{Error, Result};

// Re-export core types
pub use crate::types::{NodeId, PluginRef, MAX_NODE_ID};

// Re-export config types
pub use crate::config::{BusConfig, Config, ConfigBuilder, SharedConfig};

// Re-export utility functions
pub use crate::utils::spawn_task;

// Re-export logging macros
pub use tracing::{debug, error, info, trace, warn};

// Re-export core initialization
pub use crate::init;
