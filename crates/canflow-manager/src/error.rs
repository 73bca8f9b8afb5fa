/*!
 * Error types for the canflow manager crate.
 */
use thiserror::Error;

use canflow_core::types::PluginRef;
use canflow_devices::{CatalogueError, DriverError, TopologyError};

/// Error type for device lifecycle operations
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Malformed or inconsistent topology or registration input
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The bus master failed to initialize; fatal to startup
    #[error("Master initialization failed: {0}")]
    MasterInit(String),

    /// The requested plugin is unresolvable
    #[error("Plugin not found: {0}")]
    PluginNotFound(PluginRef),

    /// The device name collides with a currently running driver
    #[error("Name conflict: a driver named '{0}' is already running")]
    NameConflict(String),

    /// No running driver exists under the device name
    #[error("Not found: no running driver named '{0}'")]
    NotFound(String),

    /// Driver error
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] canflow_core::error::Error),
}

/// Result type for device lifecycle operations
pub type Result<T> = std::result::Result<T, LifecycleError>;

impl LifecycleError {
    /// Create a new configuration error
    pub fn configuration<S: AsRef<str>>(msg: S) -> Self {
        LifecycleError::Configuration(msg.as_ref().to_string())
    }

    /// Create a new master initialization error
    pub fn master_init<S: AsRef<str>>(msg: S) -> Self {
        LifecycleError::MasterInit(msg.as_ref().to_string())
    }

    /// Create a new name conflict error
    pub fn name_conflict<S: AsRef<str>>(name: S) -> Self {
        LifecycleError::NameConflict(name.as_ref().to_string())
    }

    /// Create a new not found error
    pub fn not_found<S: AsRef<str>>(name: S) -> Self {
        LifecycleError::NotFound(name.as_ref().to_string())
    }
}

impl From<TopologyError> for LifecycleError {
    fn from(err: TopologyError) -> Self {
        LifecycleError::Configuration(err.to_string())
    }
}

impl From<CatalogueError> for LifecycleError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::PluginNotFound(plugin) => LifecycleError::PluginNotFound(plugin),
            other => LifecycleError::Configuration(other.to_string()),
        }
    }
}
