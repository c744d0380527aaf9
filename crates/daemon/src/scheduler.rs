//! Fixed-delay job scheduler for collectors.
//!
//! The job runs once immediately, then `period` after each run returns.
//! Failed runs are logged and the schedule carries on. After a successful run
//! the completion time is published on a watch channel and, when a reporter is
//! configured, sent to the platform.

use std::sync::Arc;
use std::time::Duration;

use bas_client::AgentApi;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Boxed async job run on every tick.
pub type Job = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct LastExecutionReporter {
    api: Arc<dyn AgentApi>,
    collector_id: String,
}

pub struct PeriodicScheduler {
    name: String,
    period: Duration,
    job: Job,
    reporter: Option<LastExecutionReporter>,
    last_execution: watch::Sender<Option<DateTime<Utc>>>,
}

impl PeriodicScheduler {
    pub fn new<F, Fut>(name: impl Into<String>, period: Duration, job: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let (last_execution, _) = watch::channel(None);
        Self {
            name: name.into(),
            period,
            job: Box::new(move || Box::pin(job())),
            reporter: None,
            last_execution,
        }
    }

    /// Report the completion time of each successful run as the collector's
    /// last execution.
    pub fn report_to(mut self, api: Arc<dyn AgentApi>, collector_id: impl Into<String>) -> Self {
        self.reporter = Some(LastExecutionReporter {
            api,
            collector_id: collector_id.into(),
        });
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Completion time of the latest successful run.
    pub fn last_execution(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_execution.subscribe()
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run until `cancel` fires. A run in progress is not interrupted.
    pub async fn run(self, cancel: CancellationToken) {
        info!(job = %self.name, period = ?self.period, "starting scheduler");

        while !cancel.is_cancelled() {
            self.tick().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.period) => {}
            }
        }

        info!(job = %self.name, "scheduler stopped");
    }

    async fn tick(&self) {
        debug!(job = %self.name, "running scheduled job");
        if let Err(e) = (self.job)().await {
            error!(job = %self.name, error = %e, "error collecting");
            return;
        }

        let now = Utc::now();
        self.last_execution.send_replace(Some(now));

        if let Some(reporter) = &self.reporter {
            if let Err(e) = reporter
                .api
                .collector_last_execution(&reporter.collector_id, now)
                .await
            {
                error!(
                    job = %self.name,
                    collector_id = %reporter.collector_id,
                    error = %e,
                    "failed to report last execution"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests;
