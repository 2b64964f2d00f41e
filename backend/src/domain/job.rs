use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Periodic background work
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Time between two ticks
    fn interval(&self) -> Duration;

    async fn tick(&self) -> Result<()>;
}

/// Run `job` on a ticker until the returned handle is aborted.
///
/// The first tick fires immediately. A failing tick is logged and the
/// ticker keeps going.
pub fn spawn_job(job: Arc<dyn Job>) -> Result<JoinHandle<()>> {
    let interval = job.interval();
    if interval.is_zero() {
        return Err(anyhow!("interval of job '{}' must be greater than zero", job.name()));
    }

    info!("Scheduling job '{}' every {:?}", job.name(), interval);
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            debug!("Running job '{}'", job.name());
            if let Err(e) = job.tick().await {
                error!("Job '{}' failed: {:#}", job.name(), e);
            }
        }
    });

    Ok(handle)
}
