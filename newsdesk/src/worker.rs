use std::sync::Arc;
use std::time::Duration;

use tokio::select;
use tokio::sync::{Notify, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::info;

use crate::processing::{Pipeline, RunReport};

/// Signals shared between the worker, the HTTP server and `main`.
#[derive(Clone, Default)]
pub struct WorkerControl {
    /// Ask the worker to run the pipeline now.
    pub refresh: Arc<Notify>,
    /// Ask the worker to exit after the current run.
    pub shutdown: Arc<Notify>,
    /// Report of the most recent completed run.
    pub last_run: Arc<RwLock<Option<RunReport>>>,
}

impl WorkerControl {
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    pub fn request_shutdown(&self) {
        self.shutdown.notify_one();
    }

    pub async fn last_run(&self) -> Option<RunReport> {
        self.last_run.read().await.clone()
    }
}

/// Background worker entrypoint: one run immediately, then one per `period`,
/// plus any run requested through `control.refresh`. Returns once shutdown is signalled.
pub async fn run_worker(pipeline: Pipeline, period: Duration, control: WorkerControl) {
    info!(interval_secs = period.as_secs(), "worker: starting");

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let report = pipeline.run_once().await;
        *control.last_run.write().await = Some(report);

        select! {
            biased;
            _ = control.shutdown.notified() => {
                info!("worker: shutdown requested, exiting loop");
                break;
            }
            _ = control.refresh.notified() => {
                info!("worker: refresh requested");
            }
            _ = ticker.tick() => {
                info!("worker: scheduled run");
            }
        }
    }

    info!("worker: cleanup complete");
}
