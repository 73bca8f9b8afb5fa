/*!
 * Plugin catalogue for canflow.
 *
 * This module provides the capability-keyed factory registry that resolves a
 * plugin reference to a constructor for a driver instance. The lifecycle
 * manager depends only on this registry, never on concrete driver types.
 */
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use canflow_core::types::PluginRef;

use crate::driver::{Driver, DriverConfig, Result as DriverResult};
use crate::drivers::generic::GenericNodeDriver;

/// A constructor producing a driver instance from per-device configuration
pub type DriverFactory = Arc<dyn Fn(&DriverConfig) -> DriverResult<Arc<dyn Driver>> + Send + Sync>;

/// Error type for catalogue operations
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// No factory is registered for the plugin reference
    #[error("Plugin not found: {0}")]
    PluginNotFound(PluginRef),

    /// A factory is already registered for the plugin reference
    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(PluginRef),
}

/// Registry of driver factories keyed by plugin reference
///
/// The catalogue is populated at startup and read-only afterwards, so it is
/// shared between callers by `Arc` without synchronization.
#[derive(Default)]
pub struct PluginCatalogue {
    factories: HashMap<PluginRef, DriverFactory>,
}

impl std::fmt::Debug for PluginCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginCatalogue")
            .field("plugins", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PluginCatalogue {
    /// Create an empty catalogue
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalogue with the built-in drivers registered
    pub fn with_builtin_drivers() -> Self {
        let mut catalogue = Self::new();
        catalogue.factories.insert(
            PluginRef::new("canflow-devices", "GenericNodeDriver"),
            Arc::new(|config: &DriverConfig| {
                Ok(Arc::new(GenericNodeDriver::new(config.clone())) as Arc<dyn Driver>)
            }),
        );
        catalogue
    }

    /// Register a driver factory under a plugin reference
    pub fn register(
        &mut self,
        plugin: PluginRef,
        factory: DriverFactory,
    ) -> Result<(), CatalogueError> {
        if self.factories.contains_key(&plugin) {
            return Err(CatalogueError::AlreadyRegistered(plugin));
        }
        debug!("Registered driver factory for {}", plugin);
        self.factories.insert(plugin, factory);
        Ok(())
    }

    /// Resolve a plugin reference to its driver factory
    pub fn resolve(&self, plugin: &PluginRef) -> Result<DriverFactory, CatalogueError> {
        self.factories
            .get(plugin)
            .cloned()
            .ok_or_else(|| CatalogueError::PluginNotFound(plugin.clone()))
    }

    /// Check whether a plugin reference is registered
    pub fn contains(&self, plugin: &PluginRef) -> bool {
        self.factories.contains_key(plugin)
    }

    /// Get all registered plugin references
    pub fn plugin_refs(&self) -> Vec<PluginRef> {
        self.factories.keys().cloned().collect()
    }

    /// Count registered plugins
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalogue is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
