/*!
 * Request/response surface for the device lifecycle manager.
 *
 * This module is a thin shim over `DeviceManager`: it shapes the three
 * canonical operations as request/response pairs carrying a request
 * identifier, and preserves the historical operation names as deprecated
 * pass-throughs. No orchestration logic lives here.
 */
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use canflow_core::types::NodeId;

use crate::manager::DeviceManager;

/// Request to load a driver for a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadRequest {
    /// Request identifier, echoed in the response
    pub request_id: Uuid,
    /// Name of the package providing the driver
    pub package: String,
    /// Name of the driver implementation within the package
    pub plugin_name: String,
    /// The bus address of the device
    pub node_id: NodeId,
    /// The device name
    pub device_name: String,
}

/// Response to a load request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    /// The identifier of the request being answered
    pub request_id: Uuid,
    /// Whether the driver was loaded
    pub success: bool,
    /// Error description when `success` is false
    pub error_message: Option<String>,
    /// The name the driver runs under when `success` is true
    pub full_node_name: Option<String>,
}

/// Request to unload a running driver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnloadRequest {
    /// Request identifier, echoed in the response
    pub request_id: Uuid,
    /// The device name
    pub device_name: String,
}

/// Response to an unload request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnloadResponse {
    /// The identifier of the request being answered
    pub request_id: Uuid,
    /// Whether the driver was unloaded
    pub success: bool,
    /// Error description when `success` is false
    pub error_message: Option<String>,
}

/// Request to list running drivers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest {
    /// Request identifier, echoed in the response
    pub request_id: Uuid,
}

/// One running driver in a list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// The bus address of the device
    pub node_id: NodeId,
    /// The device name
    pub device_name: String,
}

/// Response to a list request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    /// The identifier of the request being answered
    pub request_id: Uuid,
    /// Running drivers in ascending node-id order
    pub nodes: Vec<NodeDescriptor>,
}

/// Service facade over the device lifecycle manager
#[derive(Clone)]
pub struct DeviceService {
    manager: Arc<DeviceManager>,
}

impl DeviceService {
    /// Create a service over a manager
    pub fn new(manager: Arc<DeviceManager>) -> Self {
        Self { manager }
    }

    /// Load a driver for a device
    pub async fn load(&self, request: LoadRequest) -> LoadResponse {
        debug!("load request {} for '{}'", request.request_id, request.device_name);
        let result = self
            .manager
            .load(
                &request.package,
                &request.plugin_name,
                request.node_id,
                &request.device_name,
            )
            .await;
        match result {
            Ok(()) => LoadResponse {
                request_id: request.request_id,
                success: true,
                error_message: None,
                full_node_name: Some(request.device_name),
            },
            Err(e) => LoadResponse {
                request_id: request.request_id,
                success: false,
                error_message: Some(e.to_string()),
                full_node_name: None,
            },
        }
    }

    /// Unload a running driver
    pub async fn unload(&self, request: UnloadRequest) -> UnloadResponse {
        debug!("unload request {} for '{}'", request.request_id, request.device_name);
        let result = self.manager.unload(&request.device_name).await;
        UnloadResponse {
            request_id: request.request_id,
            success: result.is_ok(),
            error_message: result.err().map(|e| e.to_string()),
        }
    }

    /// List running drivers
    pub async fn list(&self, request: ListRequest) -> ListResponse {
        let nodes = self
            .manager
            .list()
            .await
            .into_iter()
            .map(|(node_id, device_name)| NodeDescriptor { node_id, device_name })
            .collect();
        ListResponse {
            request_id: request.request_id,
            nodes,
        }
    }

    /// Historical name for [`DeviceService::load`]
    #[deprecated(note = "Use load() instead")]
    pub async fn load_node(&self, request: LoadRequest) -> LoadResponse {
        self.load(request).await
    }

    /// Historical name for [`DeviceService::unload`]
    #[deprecated(note = "Use unload() instead")]
    pub async fn unload_node(&self, request: UnloadRequest) -> UnloadResponse {
        self.unload(request).await
    }

    /// Historical name for [`DeviceService::list`]
    #[deprecated(note = "Use list() instead")]
    pub async fn list_nodes(&self, request: ListRequest) -> ListResponse {
        self.list(request).await
    }
}
