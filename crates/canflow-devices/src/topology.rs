/*!
 * Bus topology registry for canflow.
 *
 * This module parses a bus topology description into a registry of
 * addressable devices: which node ids exist on the bus, which plugin serves
 * each, and where each device's per-device files live.
 */
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use canflow_core::types::{NodeId, PluginRef};

/// Error type for topology construction
#[derive(Error, Debug)]
pub enum TopologyError {
    /// The topology file could not be read
    #[error("Cannot read bus configuration {0}: {1}")]
    Unreadable(PathBuf, String),

    /// The topology file could not be parsed
    #[error("Malformed bus configuration: {0}")]
    Malformed(String),

    /// Two devices declare the same node id
    #[error("Duplicate node id {node_id} (devices '{first}' and '{second}')")]
    DuplicateNodeId {
        /// The conflicting bus address
        node_id: NodeId,
        /// The device that declared it first
        first: String,
        /// The device that declared it again
        second: String,
    },

    /// A device declares a node id outside the addressable range
    #[error("Device '{0}' declares node id {1} outside 1..=127")]
    NodeIdOutOfRange(String, u8),

    /// A device declares an empty plugin reference
    #[error("Device '{0}' declares an empty plugin reference")]
    EmptyPluginRef(String),

    /// A device's object-dictionary file is not readable
    #[error("Object dictionary for device '{0}' not readable: {1}")]
    ObjectDictionaryUnreadable(String, PathBuf),
}

/// A device known from configuration, regardless of whether a driver runs
#[derive(Debug, Clone)]
pub struct RegisteredDevice {
    /// The bus address of the device
    pub node_id: NodeId,
    /// The device name
    pub name: String,
    /// The plugin serving this device
    pub plugin: PluginRef,
    /// Path to the device's object-dictionary file, if any
    pub object_dictionary: Option<PathBuf>,
    /// Path to the device's binary configuration cache, if any
    pub binary_cache: Option<PathBuf>,
}

/// Raw per-device table as it appears in the topology file
#[derive(Debug, Deserialize)]
struct DeviceSpec {
    node_id: u8,
    #[serde(default)]
    package: String,
    #[serde(default)]
    driver: String,
    #[serde(default)]
    eds: Option<PathBuf>,
    #[serde(default)]
    bin: Option<PathBuf>,
}

/// Raw topology file schema
#[derive(Debug, Deserialize)]
struct TopologySpec {
    #[serde(default)]
    devices: BTreeMap<String, DeviceSpec>,
}

/// Parsed view of the devices declared on the bus
///
/// Construction is a pure function of the topology description: it validates
/// and returns the registry without side effects.
#[derive(Debug, Clone, Default)]
pub struct BusTopology {
    devices: BTreeMap<NodeId, RegisteredDevice>,
}

impl BusTopology {
    /// Read and build a topology from a TOML bus description file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::Unreadable(path.to_path_buf(), e.to_string()))?;
        Self::from_str(&raw)
    }

    /// Build a topology from TOML text
    pub fn from_str(raw: &str) -> Result<Self, TopologyError> {
        let spec: TopologySpec =
            toml::from_str(raw).map_err(|e| TopologyError::Malformed(e.to_string()))?;
        Self::build(spec)
    }

    fn build(spec: TopologySpec) -> Result<Self, TopologyError> {
        let mut devices: BTreeMap<NodeId, RegisteredDevice> = BTreeMap::new();

        for (name, dev) in spec.devices {
            let node_id = NodeId::new(dev.node_id)
                .ok_or_else(|| TopologyError::NodeIdOutOfRange(name.clone(), dev.node_id))?;

            let plugin = PluginRef::new(dev.package, dev.driver);
            if plugin.is_empty() {
                return Err(TopologyError::EmptyPluginRef(name));
            }

            if let Some(eds) = &dev.eds {
                if std::fs::metadata(eds).is_err() {
                    return Err(TopologyError::ObjectDictionaryUnreadable(name, eds.clone()));
                }
            }

            if let Some(existing) = devices.get(&node_id) {
                return Err(TopologyError::DuplicateNodeId {
                    node_id,
                    first: existing.name.clone(),
                    second: name,
                });
            }

            debug!("Registered device '{}' at node id {}", name, node_id);
            devices.insert(
                node_id,
                RegisteredDevice {
                    node_id,
                    name,
                    plugin,
                    object_dictionary: dev.eds,
                    binary_cache: dev.bin,
                },
            );
        }

        Ok(Self { devices })
    }

    /// Iterate the registered devices in ascending node-id order
    pub fn devices(&self) -> impl Iterator<Item = &RegisteredDevice> {
        self.devices.values()
    }

    /// Get a registered device by node id
    pub fn get(&self, node_id: NodeId) -> Option<&RegisteredDevice> {
        self.devices.get(&node_id)
    }

    /// Count registered devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the topology declares no devices
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Consume the topology, yielding the device registry
    pub fn into_devices(self) -> BTreeMap<NodeId, RegisteredDevice> {
        self.devices
    }
}
