//! Periodic refresh of raw analytics

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

use crate::analytics::timescale::PerTimescale;
use crate::dashboard::actor::{DashboardError, DashboardHandle};
use crate::fetch::{fetch_all_timescales, ServiceDataSource};

/// Fetch every timescale and hand the results to the dashboard.
///
/// Returns the per-timescale outcome; fails only when the actor is gone or
/// every fetch failed.
pub async fn refresh(
    handle: &DashboardHandle,
    source: Arc<dyn ServiceDataSource>,
) -> Result<PerTimescale<String>, DashboardError> {
    let report = fetch_all_timescales(source).await;
    let summary = report.summary();
    handle.apply_fetch(report).await?;
    Ok(summary)
}

/// Refresh on a fixed interval until `shutdown` flips to true
pub fn start_refresh_task(
    handle: DashboardHandle,
    source: Arc<dyn ServiceDataSource>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match refresh(&handle, Arc::clone(&source)).await {
                        Ok(_) => {}
                        Err(DashboardError::Closed) => {
                            warn!("Dashboard stopped, ending refresh task");
                            break;
                        }
                        Err(e) => error!("Analytics refresh failed: {}", e),
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Shutdown signal received, stopping refresh task");
                        break;
                    }
                }
            }
        }
    })
}
