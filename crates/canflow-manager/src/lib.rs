/*!
 * canflow Manager
 *
 * This crate provides the device lifecycle manager for canflow: the
 * component that decides which configured devices have a running driver,
 * wires every driver into the shared execution context next to the bus
 * master, and exposes load/unload/list to external callers.
 */

#![warn(missing_docs)]

// Re-export core types
pub use canflow_core::prelude;

pub mod error;
pub mod executor;
pub mod manager;
pub mod master;
pub mod service;

// Re-export the manager surface
pub use error::{LifecycleError, Result};
pub use executor::{ContextHandle, Executor};
pub use manager::{DeviceManager, LifecycleEvent};
pub use master::{BusMaster, MasterSupervisor};
pub use service::DeviceService;

/// canflow manager crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
