/*!
 * canflow Core
 *
 * This crate provides the foundation for the canflow system: core bus
 * types, error handling, configuration, and logging.
 */

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod types;
pub mod utils;

/// Re-export of dependencies that are part of the public API
pub mod deps {
    pub use anyhow;
    pub use futures;
    pub use serde;
    pub use tokio;
    pub use tracing;
}

/// canflow core crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization
pub fn init() -> Result<(), error::Error> {
    logging::init()?;
    tracing::info!("canflow Core {} initialized", VERSION);
    Ok(())
}
