/*!
 * Device lifecycle manager for canflow.
 *
 * This module composes the bus topology registry, the plugin catalogue, the
 * bus master supervisor, and the execution context binder into the
 * lifecycle manager: the component that decides when a driver instance for
 * a configured device exists and how it is wired into the shared execution
 * context.
 *
 * One record map carries both configured and running state for every
 * device, so a concurrent reader can never observe the two halves
 * disagreeing. All structural operations serialize on the single mutex
 * guarding that map.
 */
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

use canflow_core::config::SharedConfig;
use canflow_core::types::{NodeId, PluginRef};
use canflow_devices::{BusTopology, Driver, DriverConfig, PluginCatalogue};

use crate::error::{LifecycleError, Result};
use crate::executor::{ContextHandle, Executor};
use crate::master::{BusMaster, MasterSupervisor};

/// Buffered lifecycle events per subscriber
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle events emitted by the device manager
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// The manager finished startup and accepts requests
    ManagerReady,
    /// A driver instance was created and attached
    DriverLoaded {
        /// The bus address of the device
        node_id: NodeId,
        /// The device name
        name: String,
    },
    /// A driver instance was detached and destroyed
    DriverUnloaded {
        /// The bus address of the device
        node_id: NodeId,
        /// The device name
        name: String,
    },
}

/// How a device became known to the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Declared in the bus topology
    Configured,
    /// Registered ad hoc through a load request
    Dynamic,
}

/// A running driver and its execution-context binding
struct ActiveDriver {
    driver: Arc<dyn Driver>,
    context: ContextHandle,
}

/// One device as the manager sees it
///
/// A record with `active: None` is a configured device awaiting a driver; a
/// record with `active: Some` has a running driver. Devices with no record
/// are unknown to the manager.
struct DeviceRecord {
    name: String,
    plugin: PluginRef,
    object_dictionary: Option<PathBuf>,
    binary_cache: Option<PathBuf>,
    origin: Origin,
    active: Option<ActiveDriver>,
}

/// Mutable manager state, guarded as one unit
struct ManagerState {
    records: BTreeMap<NodeId, DeviceRecord>,
    master: Option<BusMaster>,
    ready: bool,
}

/// The device lifecycle manager
///
/// Owns the device record map exclusively; shares the plugin catalogue and
/// the execution context with its host by `Arc`.
pub struct DeviceManager {
    config: SharedConfig,
    catalogue: Arc<PluginCatalogue>,
    executor: Arc<Executor>,
    state: Mutex<ManagerState>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl DeviceManager {
    /// Create a manager from configuration, catalogue, and execution context
    ///
    /// The manager is not ready until `init` succeeds.
    pub fn new(
        config: SharedConfig,
        catalogue: Arc<PluginCatalogue>,
        executor: Arc<Executor>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            catalogue,
            executor,
            state: Mutex::new(ManagerState {
                records: BTreeMap::new(),
                master: None,
                ready: false,
            }),
            events,
        }
    }

    /// Start the manager: topology, master, and optionally all drivers
    ///
    /// Builds the device registry from the bus topology, initializes the bus
    /// master, and, unless lazy loading is enabled, loads every registered
    /// device in ascending node-id order. Individual device failures during
    /// eager startup are reported and skipped; topology or master failures
    /// abort startup and the manager never becomes ready.
    pub async fn init(&self) -> Result<()> {
        let bus = self.config.get().bus.clone();

        let topology = BusTopology::from_file(&bus.bus_config)?;
        info!(
            "Bus topology registered {} devices from {}",
            topology.len(),
            bus.bus_config.display()
        );

        {
            let mut state = self.state.lock().await;
            for device in topology.devices() {
                state.records.insert(
                    device.node_id,
                    DeviceRecord {
                        name: device.name.clone(),
                        plugin: device.plugin.clone(),
                        object_dictionary: device.object_dictionary.clone(),
                        binary_cache: device.binary_cache.clone(),
                        origin: Origin::Configured,
                        active: None,
                    },
                );
            }

            let master = MasterSupervisor::initialize(
                &bus.master_config,
                &bus.can_interface,
                bus.master_bin.as_deref(),
                &self.executor,
            )
            .await?;
            state.master = Some(master);
            state.ready = true;
        }

        if !bus.enable_lazy_loading {
            self.load_all_registered().await;
        }

        let _ = self.events.send(LifecycleEvent::ManagerReady);
        info!("Device manager ready");
        Ok(())
    }

    /// Eagerly load every registered device, skipping individual failures
    async fn load_all_registered(&self) {
        let pending: Vec<(NodeId, PluginRef, String)> = {
            let state = self.state.lock().await;
            state
                .records
                .iter()
                .filter(|(_, r)| r.active.is_none())
                .map(|(id, r)| (*id, r.plugin.clone(), r.name.clone()))
                .collect()
        };

        let mut loaded = 0usize;
        let mut failed = 0usize;
        for (node_id, plugin, name) in pending {
            match self.load(&plugin.package, &plugin.name, node_id, &name).await {
                Ok(()) => loaded += 1,
                Err(e) => {
                    failed += 1;
                    error!("Skipping device '{}' (node {}): {}", name, node_id, e);
                }
            }
        }
        info!("Eager startup loaded {} drivers, {} failed", loaded, failed);
    }

    /// Instantiate a driver for a device and attach it to the execution context
    ///
    /// The device may be known from the bus topology or registered
    /// dynamically by this call, provided its node id and name are both
    /// unused. The plugin reference is resolved through the catalogue, the
    /// instance initialized against the master handle, and attached to the
    /// execution context; only then is the record map mutated, so a failed
    /// load leaves no trace.
    pub async fn load(
        &self,
        package: &str,
        plugin_name: &str,
        node_id: NodeId,
        device_name: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        let master = state
            .master
            .as_ref()
            .map(|m| m.handle())
            .ok_or_else(|| LifecycleError::master_init("bus master is not initialized"))?;

        if state
            .records
            .values()
            .any(|r| r.active.is_some() && r.name == device_name)
        {
            return Err(LifecycleError::name_conflict(device_name));
        }

        let plugin = PluginRef::new(package, plugin_name);

        let (object_dictionary, binary_cache) = match state.records.get(&node_id) {
            Some(record) if record.active.is_some() => {
                return Err(LifecycleError::configuration(format!(
                    "node id {} already has a running driver ('{}')",
                    node_id, record.name
                )));
            }
            Some(record) => {
                let name_taken = state
                    .records
                    .iter()
                    .any(|(id, r)| *id != node_id && r.name == device_name);
                if name_taken {
                    return Err(LifecycleError::configuration(format!(
                        "device name '{}' is registered to another node",
                        device_name
                    )));
                }
                (record.object_dictionary.clone(), record.binary_cache.clone())
            }
            None => {
                // Dynamic registration path
                if plugin.is_empty() {
                    return Err(LifecycleError::configuration(
                        "empty plugin reference in load request",
                    ));
                }
                if state.records.values().any(|r| r.name == device_name) {
                    return Err(LifecycleError::configuration(format!(
                        "device name '{}' is already registered",
                        device_name
                    )));
                }
                (None, None)
            }
        };

        let factory = self.catalogue.resolve(&plugin)?;
        let driver = factory(&DriverConfig {
            node_id,
            name: device_name.to_string(),
            plugin: plugin.clone(),
            object_dictionary: object_dictionary.clone(),
            binary_cache: binary_cache.clone(),
        })?;
        driver.init(master.as_ref()).await?;
        let context = self.executor.attach(driver.clone()).await;

        let record = state.records.entry(node_id).or_insert_with(|| DeviceRecord {
            name: device_name.to_string(),
            plugin: plugin.clone(),
            object_dictionary,
            binary_cache,
            origin: Origin::Dynamic,
            active: None,
        });
        // The record describes the running instance; the request may name a
        // different plugin than the topology declared.
        record.name = device_name.to_string();
        record.plugin = plugin;
        record.active = Some(ActiveDriver { driver, context });

        info!("Loaded driver '{}' for node {}", device_name, node_id);
        let _ = self.events.send(LifecycleEvent::DriverLoaded {
            node_id,
            name: device_name.to_string(),
        });
        Ok(())
    }

    /// Detach a running driver from the execution context and destroy it
    ///
    /// Blocks until the driver's in-flight work slice drains, then shuts the
    /// instance down and releases it. A device declared in the bus topology
    /// remains registered; a dynamically registered device is forgotten
    /// entirely.
    pub async fn unload(&self, device_name: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        let node_id = state
            .records
            .iter()
            .find(|(_, r)| r.active.is_some() && r.name == device_name)
            .map(|(id, _)| *id)
            .ok_or_else(|| LifecycleError::not_found(device_name))?;

        let mut record = state
            .records
            .remove(&node_id)
            .ok_or_else(|| LifecycleError::not_found(device_name))?;
        let active = match record.active.take() {
            Some(active) => active,
            None => {
                state.records.insert(node_id, record);
                return Err(LifecycleError::not_found(device_name));
            }
        };

        self.executor.detach(active.context).await;
        if let Err(e) = active.driver.shutdown().await {
            warn!("Driver '{}' shutdown reported: {}", device_name, e);
        }
        drop(active.driver);

        if record.origin == Origin::Configured {
            state.records.insert(node_id, record);
        } else {
            debug!("Dynamically registered node {} forgotten", node_id);
        }

        info!("Unloaded driver '{}' from node {}", device_name, node_id);
        let _ = self.events.send(LifecycleEvent::DriverUnloaded {
            node_id,
            name: device_name.to_string(),
        });
        Ok(())
    }

    /// List running drivers as (node id, device name), ascending by node id
    ///
    /// A snapshot under the same lock as structural mutations, so the two
    /// halves of device state are never observed mid-update. Never fails.
    pub async fn list(&self) -> Vec<(NodeId, String)> {
        let state = self.state.lock().await;
        state
            .records
            .iter()
            .filter(|(_, r)| r.active.is_some())
            .map(|(id, r)| (*id, r.name.clone()))
            .collect()
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    /// Whether startup completed and requests are accepted
    pub async fn is_ready(&self) -> bool {
        self.state.lock().await.ready
    }

    /// Number of devices known to the manager, running or not
    pub async fn registered_count(&self) -> usize {
        self.state.lock().await.records.len()
    }

    /// Whether a device is known under the given node id
    pub async fn is_registered(&self, node_id: NodeId) -> bool {
        self.state.lock().await.records.contains_key(&node_id)
    }

    /// Unload every driver and detach the bus master
    ///
    /// Drivers go down in descending node-id order, the reverse of eager
    /// startup; the master goes last, after its dependents.
    pub async fn shutdown(&self) -> Result<()> {
        let names: Vec<String> = {
            let state = self.state.lock().await;
            state
                .records
                .iter()
                .rev()
                .filter(|(_, r)| r.active.is_some())
                .map(|(_, r)| r.name.clone())
                .collect()
        };

        for name in names {
            if let Err(e) = self.unload(&name).await {
                warn!("Shutdown unload of '{}' failed: {}", name, e);
            }
        }

        let mut state = self.state.lock().await;
        if let Some(master) = state.master.take() {
            self.executor.detach(master.into_context()).await;
        }
        state.ready = false;

        info!("Device manager shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use canflow_core::config::Config;
    use canflow_devices::driver::{DriverInfo, MasterHandle, Result as DriverResult};

    const GENERIC: (&str, &str) = ("canflow-devices", "GenericNodeDriver");

    fn write_file(path: &Path, contents: &str) {
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    /// Build a manager over a temp bus: (node_id, name, package, driver) per device
    fn manager_with_bus(
        lazy: bool,
        devices: &[(u8, &str, &str, &str)],
    ) -> (DeviceManager, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir.path().join("master.toml"), "node_id = 1\n");

        let mut bus_toml = String::new();
        for (node_id, name, package, driver) in devices {
            bus_toml.push_str(&format!(
                "[devices.{}]\nnode_id = {}\npackage = \"{}\"\ndriver = \"{}\"\n\n",
                name, node_id, package, driver
            ));
        }
        write_file(&dir.path().join("bus.toml"), &bus_toml);

        let mut config = Config::default();
        config.bus.can_interface = "vcan0".to_string();
        config.bus.master_config = dir.path().join("master.toml");
        config.bus.bus_config = dir.path().join("bus.toml");
        config.bus.enable_lazy_loading = lazy;

        let manager = DeviceManager::new(
            SharedConfig::new(config),
            Arc::new(PluginCatalogue::with_builtin_drivers()),
            Arc::new(Executor::with_poll_interval(Duration::from_millis(1))),
        );
        (manager, dir)
    }

    fn names(listing: &[(NodeId, String)]) -> Vec<&str> {
        listing.iter().map(|(_, n)| n.as_str()).collect()
    }

    #[tokio::test]
    async fn test_lazy_startup_loads_nothing() {
        let (manager, _dir) = manager_with_bus(
            true,
            &[(2, "axis_left", GENERIC.0, GENERIC.1), (3, "axis_right", GENERIC.0, GENERIC.1)],
        );
        manager.init().await.unwrap();

        assert!(manager.is_ready().await);
        assert_eq!(manager.registered_count().await, 2);
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_eager_startup_loads_all_in_order() {
        let (manager, _dir) = manager_with_bus(
            false,
            &[
                (5, "gripper", GENERIC.0, GENERIC.1),
                (2, "axis_left", GENERIC.0, GENERIC.1),
                (3, "axis_right", GENERIC.0, GENERIC.1),
            ],
        );
        manager.init().await.unwrap();

        let listing = manager.list().await;
        let ids: Vec<u8> = listing.iter().map(|(id, _)| id.raw()).collect();
        assert_eq!(ids, vec![2, 3, 5]); // ascending node-id order
        assert_eq!(names(&listing), vec!["axis_left", "axis_right", "gripper"]);
    }

    #[tokio::test]
    async fn test_eager_startup_skips_misconfigured_device() {
        let (manager, _dir) = manager_with_bus(
            false,
            &[
                (2, "good_a", GENERIC.0, GENERIC.1),
                (3, "broken", "acme-drivers", "DoesNotExist"),
                (4, "good_b", GENERIC.0, GENERIC.1),
            ],
        );
        manager.init().await.unwrap();

        // N-1 drivers run; the manager is still ready
        assert!(manager.is_ready().await);
        let listing = manager.list().await;
        assert_eq!(listing.len(), 2);
        assert_eq!(names(&listing), vec!["good_a", "good_b"]);
        // The broken device stays registered for a later corrected load
        assert!(manager.is_registered(NodeId::new(3).unwrap()).await);
    }

    #[tokio::test]
    async fn test_master_failure_prevents_all_loads() {
        let (manager, dir) = manager_with_bus(true, &[(2, "axis", GENERIC.0, GENERIC.1)]);
        // Corrupt the master configuration after construction
        write_file(&dir.path().join("master.toml"), "node_id = \"oops\"\n");

        let err = manager.init().await.unwrap_err();
        assert!(matches!(err, LifecycleError::MasterInit(_)));
        assert!(!manager.is_ready().await);

        let err = manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::MasterInit(_)));
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_then_list_then_unload() {
        let (manager, _dir) = manager_with_bus(true, &[(2, "axis", GENERIC.0, GENERIC.1)]);
        manager.init().await.unwrap();

        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();
        assert_eq!(names(&manager.list().await), vec!["axis"]);

        manager.unload("axis").await.unwrap();
        assert!(manager.list().await.is_empty());
        // Configured device survives unload
        assert!(manager.is_registered(NodeId::new(2).unwrap()).await);
    }

    #[tokio::test]
    async fn test_load_unload_accounting() {
        let (manager, _dir) = manager_with_bus(true, &[]);
        manager.init().await.unwrap();

        // Interleaved loads and unloads on distinct names; the table must
        // end up holding exactly the currently loaded set.
        for (node, name) in [(10u8, "a"), (11, "b"), (12, "c")] {
            manager
                .load(GENERIC.0, GENERIC.1, NodeId::new(node).unwrap(), name)
                .await
                .unwrap();
        }
        manager.unload("b").await.unwrap();
        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(11).unwrap(), "b")
            .await
            .unwrap();
        manager.unload("a").await.unwrap();
        manager.unload("b").await.unwrap();

        assert_eq!(names(&manager.list().await), vec!["c"]);
    }

    #[tokio::test]
    async fn test_name_conflict_leaves_table_unchanged() {
        let (manager, _dir) = manager_with_bus(true, &[]);
        manager.init().await.unwrap();

        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();
        let before = manager.list().await;

        let err = manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(3).unwrap(), "axis")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::NameConflict(_)));
        assert_eq!(manager.list().await, before);
        // No partial insert for the rejected node id
        assert!(!manager.is_registered(NodeId::new(3).unwrap()).await);
    }

    #[tokio::test]
    async fn test_unload_unknown_name_leaves_table_unchanged() {
        let (manager, _dir) = manager_with_bus(true, &[]);
        manager.init().await.unwrap();

        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();
        let before = manager.list().await;

        let err = manager.unload("phantom").await.unwrap_err();
        assert!(matches!(err, LifecycleError::NotFound(_)));
        assert_eq!(manager.list().await, before);
    }

    #[tokio::test]
    async fn test_plugin_not_found_leaves_no_trace() {
        let (manager, _dir) = manager_with_bus(true, &[]);
        manager.init().await.unwrap();

        let err = manager
            .load("acme-drivers", "DoesNotExist", NodeId::new(9).unwrap(), "ghost")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PluginNotFound(_)));
        assert!(!manager.is_registered(NodeId::new(9).unwrap()).await);
        assert!(manager.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_dynamic_device_forgotten_after_unload() {
        let (manager, _dir) = manager_with_bus(true, &[(2, "axis", GENERIC.0, GENERIC.1)]);
        manager.init().await.unwrap();

        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(20).unwrap(), "adhoc")
            .await
            .unwrap();
        assert!(manager.is_registered(NodeId::new(20).unwrap()).await);

        manager.unload("adhoc").await.unwrap();
        assert!(!manager.is_registered(NodeId::new(20).unwrap()).await);
        // Configured device untouched
        assert!(manager.is_registered(NodeId::new(2).unwrap()).await);
    }

    #[tokio::test]
    async fn test_dynamic_registration_rejects_taken_id_and_name() {
        let (manager, _dir) = manager_with_bus(true, &[(2, "axis", GENERIC.0, GENERIC.1)]);
        manager.init().await.unwrap();

        // Registered (inactive) name claimed by another node
        let err = manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(30).unwrap(), "axis")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));

        // Busy node id under a different name
        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();
        let err = manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "other")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));

        // Empty plugin reference on dynamic registration
        let err = manager
            .load("", "", NodeId::new(31).unwrap(), "blank")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_load_with_different_plugin_updates_record() {
        let (mut manager, _dir) = manager_with_bus(true, &[(2, "axis", GENERIC.0, GENERIC.1)]);

        let alt = PluginRef::new("acme-drivers", "AltDriver");
        let mut catalogue = PluginCatalogue::with_builtin_drivers();
        catalogue
            .register(
                alt.clone(),
                Arc::new(|config: &DriverConfig| {
                    Ok(Arc::new(canflow_devices::drivers::GenericNodeDriver::new(
                        config.clone(),
                    )) as Arc<dyn Driver>)
                }),
            )
            .unwrap();
        manager.catalogue = Arc::new(catalogue);
        manager.init().await.unwrap();

        manager
            .load(&alt.package, &alt.name, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();

        let state = manager.state.lock().await;
        let record = state.records.get(&NodeId::new(2).unwrap()).unwrap();
        assert_eq!(record.plugin, alt);
        assert_eq!(record.origin, Origin::Configured);
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let (manager, _dir) = manager_with_bus(true, &[]);
        let mut events = manager.subscribe();
        manager.init().await.unwrap();

        manager
            .load(GENERIC.0, GENERIC.1, NodeId::new(2).unwrap(), "axis")
            .await
            .unwrap();
        manager.unload("axis").await.unwrap();

        assert!(matches!(events.recv().await.unwrap(), LifecycleEvent::ManagerReady));
        assert!(matches!(
            events.recv().await.unwrap(),
            LifecycleEvent::DriverLoaded { name, .. } if name == "axis"
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            LifecycleEvent::DriverUnloaded { name, .. } if name == "axis"
        ));
    }

    /// Driver that records a violation if polled after unload returned
    #[derive(Debug)]
    struct PostUnloadSentinel {
        info: DriverInfo,
        unloaded: Arc<AtomicBool>,
        violated: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Driver for PostUnloadSentinel {
        fn info(&self) -> &DriverInfo {
            &self.info
        }

        async fn init(&self, _master: &MasterHandle) -> DriverResult<()> {
            Ok(())
        }

        async fn poll(&self) -> DriverResult<()> {
            if self.unloaded.load(Ordering::SeqCst) {
                self.violated.store(true, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            Ok(())
        }

        async fn shutdown(&self) -> DriverResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_no_work_slice_after_unload_returns() {
        let (mut manager, _dir) = manager_with_bus(true, &[]);

        let unloaded = Arc::new(AtomicBool::new(false));
        let violated = Arc::new(AtomicBool::new(false));
        let factory_unloaded = unloaded.clone();
        let factory_violated = violated.clone();
        let mut catalogue = PluginCatalogue::new();
        catalogue
            .register(
                PluginRef::new("test", "Sentinel"),
                Arc::new(move |config: &DriverConfig| {
                    Ok(Arc::new(PostUnloadSentinel {
                        info: DriverInfo {
                            node_id: config.node_id,
                            name: config.name.clone(),
                            plugin: config.plugin.clone(),
                        },
                        unloaded: factory_unloaded.clone(),
                        violated: factory_violated.clone(),
                    }) as Arc<dyn Driver>)
                }),
            )
            .unwrap();
        manager.catalogue = Arc::new(catalogue);
        manager.init().await.unwrap();

        for _ in 0..5 {
            manager
                .load("test", "Sentinel", NodeId::new(40).unwrap(), "sentinel")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
            manager.unload("sentinel").await.unwrap();
            unloaded.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            unloaded.store(false, Ordering::SeqCst);
        }
        assert!(!violated.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_shutdown_unloads_everything() {
        let (manager, _dir) = manager_with_bus(
            false,
            &[(2, "axis_left", GENERIC.0, GENERIC.1), (3, "axis_right", GENERIC.0, GENERIC.1)],
        );
        manager.init().await.unwrap();
        assert_eq!(manager.list().await.len(), 2);

        manager.shutdown().await.unwrap();
        assert!(manager.list().await.is_empty());
        assert!(!manager.is_ready().await);
        assert_eq!(manager.executor.active_units().await, 0);
    }
}
