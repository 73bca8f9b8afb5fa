/*!
 * Execution context binder for canflow.
 *
 * This module binds driver instances into the shared cooperative
 * execution context. Each attached driver becomes an independent unit of
 * work multiplexed onto the tokio worker pool; the bus master and every
 * active driver share the same context.
 *
 * The executor is passed explicitly to its users (dependency injection),
 * never reached through ambient state, so tests can run it in isolation.
 */
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use canflow_core::utils::spawn_task;
use canflow_devices::Driver;

/// Default pacing between two work slices of the same unit
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Opaque token tying a unit of work to the execution context
///
/// Holding the token is what keeps the unit schedulable; surrendering it to
/// `detach` is the only way the unit ends.
#[derive(Debug)]
pub struct ContextHandle {
    unit_id: u64,
    cancel: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ContextHandle {
    /// Identifier of the unit within the context's bookkeeping
    pub fn unit_id(&self) -> u64 {
        self.unit_id
    }
}

/// Shared cooperative multi-worker execution context binder
#[derive(Debug)]
pub struct Executor {
    next_unit_id: AtomicU64,
    units: Mutex<HashMap<u64, String>>,
    poll_interval: Duration,
}

impl Executor {
    /// Create an executor with default pacing
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create an executor with a specific pacing interval
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            next_unit_id: AtomicU64::new(1),
            units: Mutex::new(HashMap::new()),
            poll_interval,
        }
    }

    /// Register a driver's work loop with the execution context
    ///
    /// The driver's `poll` runs as an independent unit of work until the
    /// returned handle is detached. A failing poll is logged and does not
    /// evict the unit; fairness between units is the runtime's concern.
    pub async fn attach(&self, driver: Arc<dyn Driver>) -> ContextHandle {
        let unit_id = self.next_unit_id.fetch_add(1, Ordering::SeqCst);
        let label = format!("{} (node {})", driver.name(), driver.node_id());
        let (cancel, mut cancelled) = watch::channel(false);
        let poll_interval = self.poll_interval;

        let loop_label = label.clone();
        let join = spawn_task(async move {
            loop {
                if *cancelled.borrow() {
                    break;
                }
                // A work slice always runs to completion; cancellation is
                // only observed between slices.
                if let Err(e) = driver.poll().await {
                    warn!("Work unit '{}' poll failed: {}", loop_label, e);
                }
                tokio::select! {
                    changed = cancelled.changed() => {
                        // A dropped sender means no detach will ever come;
                        // treat it as cancellation.
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(poll_interval) => {}
                }
            }
            trace!("Work unit '{}' drained", loop_label);
        });

        let mut units = self.units.lock().await;
        units.insert(unit_id, label.clone());
        debug!("Attached work unit #{} '{}'", unit_id, label);

        ContextHandle {
            unit_id,
            cancel,
            join,
        }
    }

    /// Remove a unit of work from the execution context
    ///
    /// Blocks until any in-flight work slice for the unit completes; after
    /// detach returns, no further invocation of the unit occurs, so the
    /// caller may immediately destroy the instance.
    pub async fn detach(&self, handle: ContextHandle) {
        let _ = handle.cancel.send(true);
        if let Err(e) = handle.join.await {
            warn!("Work unit #{} terminated abnormally: {}", handle.unit_id, e);
        }

        let mut units = self.units.lock().await;
        if let Some(label) = units.remove(&handle.unit_id) {
            debug!("Detached work unit #{} '{}'", handle.unit_id, label);
        }
    }

    /// Number of currently attached units
    pub async fn active_units(&self) -> usize {
        self.units.lock().await.len()
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}
