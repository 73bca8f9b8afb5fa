/*!
 * Driver trait and core driver abstractions.
 *
 * This module defines the interface every device driver implements and the
 * shared bus-master handle drivers are initialized against.
 */
use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use canflow_core::error::Error as CoreError;
use canflow_core::types::{NodeId, PluginRef};

/// Error type for driver operations
#[derive(Error, Debug)]
pub enum DriverError {
    /// The driver failed to instantiate
    #[error("Instantiation failed: {0}")]
    Instantiation(String),

    /// The driver is in an invalid state for the operation
    #[error("Invalid driver state: {0}")]
    InvalidState(String),

    /// Communication error with the device
    #[error("Communication error: {0}")]
    Communication(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for driver operations
pub type Result<T> = std::result::Result<T, DriverError>;

/// Static description of a driver instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverInfo {
    /// The bus address of the device this driver serves
    pub node_id: NodeId,
    /// The device name
    pub name: String,
    /// The plugin reference the driver was instantiated from
    pub plugin: PluginRef,
}

/// Per-device data handed to a driver factory
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// The bus address of the device
    pub node_id: NodeId,
    /// The device name
    pub name: String,
    /// The plugin reference being instantiated
    pub plugin: PluginRef,
    /// Path to the device's object-dictionary file, if any
    pub object_dictionary: Option<PathBuf>,
    /// Path to the device's binary configuration cache, if any
    pub binary_cache: Option<PathBuf>,
}

/// Read-only view of the initialized bus master
///
/// Exactly one master handle exists per bus. It is created by the master
/// supervisor before any driver is attached, shared by handle with every
/// driver afterwards, and destroyed only at process teardown. Drivers never
/// reinitialize or replace it.
#[derive(Debug, Clone)]
pub struct MasterHandle {
    node_id: NodeId,
    can_interface: String,
}

impl MasterHandle {
    /// Create a master handle
    ///
    /// Intended for the master supervisor; drivers only ever receive one.
    pub fn new(node_id: NodeId, can_interface: impl Into<String>) -> Self {
        Self {
            node_id,
            can_interface: can_interface.into(),
        }
    }

    /// The master's own bus address
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// The CAN interface the master is bound to
    pub fn can_interface(&self) -> &str {
        &self.can_interface
    }
}

/// The core driver trait
///
/// A driver is the running software unit responsible for one device's
/// protocol behavior. The lifecycle manager instantiates drivers through the
/// plugin catalogue, initializes them against the shared master handle, and
/// multiplexes their `poll` work slices onto the shared execution context.
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Get the driver information
    fn info(&self) -> &DriverInfo;

    /// Get the bus address of the device this driver serves
    fn node_id(&self) -> NodeId {
        self.info().node_id
    }

    /// Get the device name
    fn name(&self) -> &str {
        &self.info().name
    }

    /// One-time bring-up against the initialized bus master
    ///
    /// Called exactly once, after the master is fully initialized and before
    /// the driver is attached to the execution context.
    async fn init(&self, master: &MasterHandle) -> Result<()>;

    /// One cooperative work slice
    ///
    /// Invoked repeatedly by the execution context while the driver is
    /// attached. Never invoked after detach has returned.
    async fn poll(&self) -> Result<()>;

    /// Release device-side resources
    ///
    /// Called after the driver has been detached from the execution context.
    async fn shutdown(&self) -> Result<()>;
}
