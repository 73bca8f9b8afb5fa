use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use canflow_core::config::{ConfigBuilder, SharedConfig};
use canflow_core::types::NodeId;
use canflow_devices::PluginCatalogue;

use canflow_manager::executor::Executor;
use canflow_manager::manager::DeviceManager;
use canflow_manager::service::{DeviceService, ListRequest, LoadRequest, UnloadRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    canflow_core::init()?;

    // Write a small bus setup for the example; a real deployment points the
    // configuration at files maintained alongside the installation.
    let dir = tempfile::tempdir()?;
    let master_path = dir.path().join("master.toml");
    std::fs::File::create(&master_path)?.write_all(b"node_id = 1\nbaudrate = 500000\n")?;
    let bus_path = dir.path().join("bus.toml");
    std::fs::File::create(&bus_path)?.write_all(
        br#"
[devices.axis_left]
node_id = 2
package = "canflow-devices"
driver = "GenericNodeDriver"

[devices.axis_right]
node_id = 3
package = "canflow-devices"
driver = "GenericNodeDriver"
"#,
    )?;

    let config_path = dir.path().join("canflow.toml");
    std::fs::File::create(&config_path)?.write_all(
        format!(
            "[bus]\n\
             can_interface = \"vcan0\"\n\
             master_config = \"{}\"\n\
             bus_config = \"{}\"\n\
             enable_lazy_loading = false\n",
            master_path.display(),
            bus_path.display()
        )
        .as_bytes(),
    )?;

    // Layer the file over defaults, with CANFLOW__ environment overrides
    let config = ConfigBuilder::new()
        .with_config_file(&config_path)
        .with_environment_prefix("canflow")
        .build()?;

    println!("Starting the device manager with eager loading...");
    let manager = Arc::new(DeviceManager::new(
        SharedConfig::new(config),
        Arc::new(PluginCatalogue::with_builtin_drivers()),
        Arc::new(Executor::new()),
    ));
    manager.init().await?;

    let service = DeviceService::new(manager.clone());

    let listing = service
        .list(ListRequest { request_id: Uuid::new_v4() })
        .await;
    println!("Running drivers after startup:");
    for node in &listing.nodes {
        println!("  node {} -> {}", node.node_id, node.device_name);
    }

    // Register and load a device that was not in the bus topology
    println!("Loading an ad-hoc device...");
    let response = service
        .load(LoadRequest {
            request_id: Uuid::new_v4(),
            package: "canflow-devices".to_string(),
            plugin_name: "GenericNodeDriver".to_string(),
            node_id: NodeId::new(10).ok_or("bad node id")?,
            device_name: "diagnostics".to_string(),
        })
        .await;
    println!("  load success: {}", response.success);

    // Let the execution context run the drivers for a moment
    tokio::time::sleep(Duration::from_millis(100)).await;

    println!("Unloading the ad-hoc device...");
    let response = service
        .unload(UnloadRequest {
            request_id: Uuid::new_v4(),
            device_name: "diagnostics".to_string(),
        })
        .await;
    println!("  unload success: {}", response.success);

    manager.shutdown().await?;
    println!("Done.");
    Ok(())
}
