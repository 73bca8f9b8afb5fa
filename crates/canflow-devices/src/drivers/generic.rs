/*!
 * Generic node driver for canflow.
 *
 * This module provides a plugin-loadable driver with no device-specific
 * protocol behavior. It serves devices whose topology entry does not name a
 * specialized driver, and doubles as an observable instance in demos.
 */
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::driver::{Driver, DriverConfig, DriverError, DriverInfo, MasterHandle, Result};

/// A driver with observable lifecycle state and no protocol behavior
#[derive(Debug)]
pub struct GenericNodeDriver {
    info: DriverInfo,
    initialized: AtomicBool,
    shut_down: AtomicBool,
    polls: AtomicU64,
}

impl GenericNodeDriver {
    /// Create a generic driver from per-device configuration
    pub fn new(config: DriverConfig) -> Self {
        Self {
            info: DriverInfo {
                node_id: config.node_id,
                name: config.name,
                plugin: config.plugin,
            },
            initialized: AtomicBool::new(false),
            shut_down: AtomicBool::new(false),
            polls: AtomicU64::new(0),
        }
    }

    /// Whether `init` has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether `shutdown` has completed
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of work slices executed so far
    pub fn poll_count(&self) -> u64 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Driver for GenericNodeDriver {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    async fn init(&self, master: &MasterHandle) -> Result<()> {
        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(DriverError::InvalidState(format!(
                "Driver for node {} already initialized",
                self.info.node_id
            )));
        }
        debug!(
            "Driver '{}' (node {}) initialized against master on {}",
            self.info.name,
            self.info.node_id,
            master.can_interface()
        );
        Ok(())
    }

    async fn poll(&self) -> Result<()> {
        let count = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Driver '{}' poll #{}", self.info.name, count);
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        self.shut_down.store(true, Ordering::SeqCst);
        debug!(
            "Driver '{}' (node {}) shut down after {} polls",
            self.info.name,
            self.info.node_id,
            self.poll_count()
        );
        Ok(())
    }
}
