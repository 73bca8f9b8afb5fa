/*!
 * Bus master supervisor for canflow.
 *
 * This module owns bringing up the single bus master: validating the CAN
 * interface and master configuration, binding the master's own unit of work
 * into the shared execution context, and handing out the read-only master
 * handle every driver is initialized against.
 *
 * The master must be fully initialized before any driver attaches; its
 * failure is fatal to the whole lifecycle manager.
 */
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, trace, warn};

use canflow_core::types::{NodeId, PluginRef};
use canflow_devices::driver::{Driver, DriverInfo, MasterHandle, Result as DriverResult};

use crate::error::{LifecycleError, Result};
use crate::executor::{ContextHandle, Executor};

/// Master configuration file schema
#[derive(Debug, Deserialize)]
struct MasterSpec {
    node_id: u8,
    #[serde(default)]
    baudrate: Option<u32>,
    #[serde(default)]
    heartbeat_ms: Option<u64>,
}

/// The master's own unit of work on the execution context
///
/// The protocol engine behind it is an external collaborator; this unit only
/// keeps the master's slot in the cooperative schedule alive.
#[derive(Debug)]
struct MasterWork {
    info: DriverInfo,
    ticks: AtomicU64,
}

#[async_trait]
impl Driver for MasterWork {
    fn info(&self) -> &DriverInfo {
        &self.info
    }

    async fn init(&self, _master: &MasterHandle) -> DriverResult<()> {
        Ok(())
    }

    async fn poll(&self) -> DriverResult<()> {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Master tick #{}", tick);
        Ok(())
    }

    async fn shutdown(&self) -> DriverResult<()> {
        Ok(())
    }
}

/// The running bus master: shared handle plus its execution-context binding
#[derive(Debug)]
pub struct BusMaster {
    handle: Arc<MasterHandle>,
    context: ContextHandle,
}

impl BusMaster {
    /// The shared read-only handle drivers are initialized against
    pub fn handle(&self) -> Arc<MasterHandle> {
        self.handle.clone()
    }

    /// Surrender the execution-context binding for teardown
    pub fn into_context(self) -> ContextHandle {
        self.context
    }
}

/// Supervisor owning bus master bring-up
pub struct MasterSupervisor;

impl MasterSupervisor {
    /// Initialize the bus master and bind it into the execution context
    ///
    /// Runs to completion before any driver may attach. Fails with
    /// `MasterInit` when the CAN interface is not named or the master
    /// configuration is missing or malformed; such a failure is fatal and
    /// the lifecycle manager must refuse to become ready.
    pub async fn initialize(
        master_config: &Path,
        can_interface: &str,
        master_bin: Option<&Path>,
        executor: &Executor,
    ) -> Result<BusMaster> {
        if can_interface.trim().is_empty() {
            return Err(LifecycleError::master_init("no CAN interface configured"));
        }

        let raw = std::fs::read_to_string(master_config).map_err(|e| {
            LifecycleError::master_init(format!(
                "cannot read master configuration {}: {}",
                master_config.display(),
                e
            ))
        })?;
        let spec: MasterSpec = toml::from_str(&raw).map_err(|e| {
            LifecycleError::master_init(format!("malformed master configuration: {}", e))
        })?;
        let node_id = NodeId::new(spec.node_id).ok_or_else(|| {
            LifecycleError::master_init(format!("master node id {} out of range", spec.node_id))
        })?;

        if let Some(bin) = master_bin {
            if std::fs::metadata(bin).is_ok() {
                debug!("Master binary cache found at {}", bin.display());
            } else {
                warn!(
                    "Master binary cache {} not readable, starting without it",
                    bin.display()
                );
            }
        }

        let handle = Arc::new(MasterHandle::new(node_id, can_interface));
        let work = Arc::new(MasterWork {
            info: DriverInfo {
                node_id,
                name: "master".to_string(),
                plugin: PluginRef::new("canflow-manager", "BusMaster"),
            },
            ticks: AtomicU64::new(0),
        });
        let context = executor.attach(work).await;

        info!(
            "Bus master initialized on {} (node {}, baudrate {:?}, heartbeat {:?} ms)",
            can_interface, node_id, spec.baudrate, spec.heartbeat_ms
        );

        Ok(BusMaster { handle, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_master_config(dir: &Path, contents: &[u8]) -> std::path::PathBuf {
        let path = dir.join("master.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let dir = tempdir().unwrap();
        let config = write_master_config(dir.path(), b"node_id = 1\nbaudrate = 500000\n");
        let executor = Executor::new();

        let master = MasterSupervisor::initialize(&config, "vcan0", None, &executor)
            .await
            .unwrap();
        assert_eq!(master.handle().node_id().raw(), 1);
        assert_eq!(master.handle().can_interface(), "vcan0");
        assert_eq!(executor.active_units().await, 1);

        executor.detach(master.into_context()).await;
        assert_eq!(executor.active_units().await, 0);
    }

    #[tokio::test]
    async fn test_missing_interface_is_fatal() {
        let dir = tempdir().unwrap();
        let config = write_master_config(dir.path(), b"node_id = 1\n");
        let executor = Executor::new();

        let err = MasterSupervisor::initialize(&config, "  ", None, &executor)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::MasterInit(_)));
        assert_eq!(executor.active_units().await, 0);
    }

    #[tokio::test]
    async fn test_unreadable_config_is_fatal() {
        let dir = tempdir().unwrap();
        let executor = Executor::new();

        let err = MasterSupervisor::initialize(
            &dir.path().join("missing.toml"),
            "vcan0",
            None,
            &executor,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LifecycleError::MasterInit(_)));
    }

    #[tokio::test]
    async fn test_malformed_config_is_fatal() {
        let dir = tempdir().unwrap();
        let config = write_master_config(dir.path(), b"node_id = \"not a number\"\n");
        let executor = Executor::new();

        let err = MasterSupervisor::initialize(&config, "vcan0", None, &executor)
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::MasterInit(_)));
    }

    #[tokio::test]
    async fn test_missing_binary_cache_is_tolerated() {
        let dir = tempdir().unwrap();
        let config = write_master_config(dir.path(), b"node_id = 2\n");
        let executor = Executor::new();

        let master = MasterSupervisor::initialize(
            &config,
            "vcan0",
            Some(&dir.path().join("missing.bin")),
            &executor,
        )
        .await
        .unwrap();
        executor.detach(master.into_context()).await;
    }
}
