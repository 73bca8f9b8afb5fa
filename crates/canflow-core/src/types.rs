/*!
 * Core data types for canflow.
 *
 * This module defines the fundamental bus addressing types used throughout
 * the canflow ecosystem.
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// A numeric bus address for a logical device
///
/// Node ids are assigned by configuration and are immutable once a device
/// is registered. Valid regular-device addresses are 1..=127; address 0 is
/// reserved for broadcast on the wire and never names a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct NodeId(u8);

/// Highest addressable regular-device node id
pub const MAX_NODE_ID: u8 = 127;

impl NodeId {
    /// Create a node id, validating the addressable range
    pub fn new(raw: u8) -> Option<Self> {
        if raw >= 1 && raw <= MAX_NODE_ID {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Get the raw bus address
    pub fn raw(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for NodeId {
    type Error = crate::error::Error;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        NodeId::new(raw)
            .ok_or_else(|| crate::error::Error::config(format!("node id {} out of range 1..=127", raw)))
    }
}

impl From<NodeId> for u8 {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Identifier pair used to resolve a driver implementation at runtime
///
/// A plugin reference names the providing package and the driver within it.
/// It is the lookup key of the plugin catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PluginRef {
    /// Name of the package providing the driver
    pub package: String,
    /// Name of the driver implementation within the package
    pub name: String,
}

impl PluginRef {
    /// Create a plugin reference
    pub fn new<P: Into<String>, N: Into<String>>(package: P, name: N) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Whether either half of the reference is blank
    pub fn is_empty(&self) -> bool {
        self.package.trim().is_empty() || self.name.trim().is_empty()
    }
}

impl fmt::Display for PluginRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.package, self.name)
    }
}
