//! Presence heartbeat.
//!
//! Agents stay "alive" on the platform by re-sending their registration on a
//! fixed interval. The registration endpoint is an idempotent upsert, so the
//! ping is just another `create` without an icon.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bas_client::{AgentApi, ClientError, CollectorConfig, InjectorConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Wait between two pings.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(40);

/// Boxed async function performing one ping.
pub type PingFn =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(), ClientError>> + Send>> + Send + Sync>;

// ── HeartbeatWorker ──────────────────────────────────────────────────

/// Background task that pings the platform until stopped.
pub struct HeartbeatWorker {
    name: String,
    interval: Duration,
    ping: PingFn,
}

impl HeartbeatWorker {
    pub fn new<F, Fut>(name: impl Into<String>, ping: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ClientError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            interval: DEFAULT_HEARTBEAT_INTERVAL,
            ping: Box::new(move || Box::pin(ping())),
        }
    }

    /// Heartbeat that re-registers a collector.
    pub fn collector(api: Arc<dyn AgentApi>, config: CollectorConfig) -> Self {
        let name = format!("collector {}", config.collector_id);
        let config = Arc::new(config);
        Self::new(name, move || {
            let api = api.clone();
            let config = config.clone();
            async move {
                api.register_collector(&config, None).await?;
                Ok::<_, ClientError>(())
            }
        })
    }

    /// Heartbeat that re-registers an injector.
    pub fn injector(api: Arc<dyn AgentApi>, config: InjectorConfig) -> Self {
        let name = format!("injector {}", config.injector_id);
        let config = Arc::new(config);
        Self::new(name, move || {
            let api = api.clone();
            let config = config.clone();
            async move {
                api.register_injector(&config, None).await?;
                Ok::<_, ClientError>(())
            }
        })
    }

    /// Set the ping interval (default: 40s).
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn start(self) -> HeartbeatHandle {
        self.start_with_token(CancellationToken::new())
    }

    /// Spawn the ping loop; cancelling `cancel` stops it.
    pub fn start_with_token(self, cancel: CancellationToken) -> HeartbeatHandle {
        let task = tokio::spawn(self.run(cancel.clone()));
        HeartbeatHandle { cancel, task }
    }

    async fn run(self, cancel: CancellationToken) {
        info!(agent = %self.name, interval = ?self.interval, "starting heartbeat");

        while !cancel.is_cancelled() {
            match (self.ping)().await {
                Ok(()) => debug!(agent = %self.name, "heartbeat sent"),
                Err(e) => error!(agent = %self.name, error = %e, "error pinging the API"),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(agent = %self.name, "heartbeat stopped");
    }
}

// ── HeartbeatHandle ──────────────────────────────────────────────────

pub struct HeartbeatHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HeartbeatHandle {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop pinging and wait for the loop to exit.
    pub async fn stop(self) {
        info!("preparing heartbeat for clean shutdown");
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "heartbeat task failed");
        }
    }
}
