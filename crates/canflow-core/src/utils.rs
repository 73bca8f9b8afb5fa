/*!
 * Utility functions and helpers for canflow.
 */
use std::future::Future;

/// Create a task that runs in the background
///
/// # Arguments
///
/// * `fut` - The future to run
///
/// # Returns
///
/// A handle to the spawned task
pub fn spawn_task<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(fut)
}
