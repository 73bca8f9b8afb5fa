/*!
 * canflow Devices
 *
 * This crate provides the driver abstraction, the plugin catalogue, and the
 * bus topology registry for the canflow device lifecycle manager.
 */

#![warn(missing_docs)]

// Re-export core types
pub use canflow_core::prelude;

pub mod catalogue;
pub mod driver;
pub mod drivers;
pub mod topology;

// Re-export the driver trait and supporting types
pub use catalogue::{CatalogueError, DriverFactory, PluginCatalogue};
pub use driver::{Driver, DriverConfig, DriverError, DriverInfo, MasterHandle};
pub use topology::{BusTopology, RegisteredDevice, TopologyError};

/// canflow devices crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the device system
pub fn init() -> Result<(), canflow_core::error::Error> {
    tracing::info!("canflow Devices {} initialized", VERSION);
    Ok(())
}
