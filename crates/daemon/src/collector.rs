//! Poll-style agent: register, keep alive, run a callback on a fixed period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bas_client::{AgentApi, CollectorConfig, FileAttachment, SecurityPlatformInput};
use bas_core::{BasError, Configuration};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::daemon::{api_from_configuration, DaemonBase, DaemonContext};
use crate::error::DaemonError;
use crate::heartbeat::HeartbeatWorker;
use crate::scheduler::PeriodicScheduler;

pub const COLLECTOR_NAME: &str = "collector_name";
pub const COLLECTOR_TYPE: &str = "collector_type";
pub const COLLECTOR_PERIOD: &str = "collector_period";
pub const COLLECTOR_ICON_FILEPATH: &str = "collector_icon_filepath";
pub const COLLECTOR_PLATFORM: &str = "collector_platform";

/// Seconds between two runs when `collector_period` is unset.
pub const DEFAULT_PERIOD_SECONDS: u64 = 60;

/// Callback run on every collector tick.
pub type CollectorCallback =
    Arc<dyn Fn(Arc<DaemonContext>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

pub struct CollectorDaemon {
    base: DaemonBase,
    callback: Option<CollectorCallback>,
}

impl CollectorDaemon {
    /// Daemon talking to the platform named by `bas_url` / `bas_token`.
    pub fn new(configuration: Configuration) -> Result<Self, DaemonError> {
        let api = api_from_configuration(&configuration)?;
        Self::with_api(configuration, api)
    }

    pub fn with_api(configuration: Configuration, api: Arc<dyn AgentApi>) -> Result<Self, DaemonError> {
        Ok(Self {
            base: DaemonBase::new(configuration, api)?,
            callback: None,
        })
    }

    /// Set the callback run on every tick.
    pub fn on_tick<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<DaemonContext>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.callback = Some(Arc::new(move |ctx| Box::pin(callback(ctx))));
        self
    }

    /// Set the heartbeat interval (default: 40s).
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.base.heartbeat_interval = interval;
        self
    }

    pub fn context(&self) -> Arc<DaemonContext> {
        self.base.context.clone()
    }

    pub fn id(&self) -> &str {
        &self.base.context.id
    }

    /// Token that stops the daemon when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.base.shutdown.clone()
    }

    pub fn shutdown(&self) {
        info!(collector = %self.id(), "preparing collector for clean shutdown");
        self.base.shutdown.cancel();
    }

    /// Register, start the heartbeat, then run the callback until shutdown.
    pub async fn start(&self) -> Result<(), DaemonError> {
        let callback = self.callback.clone().ok_or(DaemonError::MissingCallback)?;
        let ctx = self.context();
        let config = self.setup().await?;

        let heartbeat = HeartbeatWorker::collector(ctx.api.clone(), config.clone())
            .interval(self.base.heartbeat_interval)
            .start_with_token(self.base.shutdown.child_token());

        let tick_ctx = ctx.clone();
        let scheduler = PeriodicScheduler::new(
            format!("collector {}", ctx.id),
            Duration::from_secs(config.collector_period),
            move || callback(tick_ctx.clone()),
        )
        .report_to(ctx.api.clone(), ctx.id.clone());

        scheduler.run(self.base.shutdown.clone()).await;
        heartbeat.stop().await;
        info!(collector = %ctx.id, "collector stopped");
        Ok(())
    }

    /// Upsert icon and security platform, then register the collector.
    async fn setup(&self) -> Result<CollectorConfig, DaemonError> {
        let ctx = &self.base.context;
        let settings = &ctx.configuration;

        let collector_name = settings.require_str(COLLECTOR_NAME)?;
        let collector_type = settings.require_str(COLLECTOR_TYPE)?;
        let collector_period = period(settings)?;

        let icon = settings
            .get_str(COLLECTOR_ICON_FILEPATH)?
            .map(|path| FileAttachment::from_path(path, format!("{}.png", ctx.id), "image/png"))
            .transpose()?;

        let collector_security_platform = match settings.get_str(COLLECTOR_PLATFORM)? {
            None => None,
            Some(platform_type) => {
                let logo = match &icon {
                    Some(icon) => Some(ctx.api.upsert_document(icon).await?.document_id),
                    None => None,
                };
                let platform = ctx
                    .api
                    .upsert_security_platform(&SecurityPlatformInput {
                        asset_name: collector_name.clone(),
                        asset_external_reference: Some(ctx.id.clone()),
                        asset_description: None,
                        security_platform_type: platform_type,
                        security_platform_logo_light: logo.clone(),
                        security_platform_logo_dark: logo,
                    })
                    .await?;
                Some(platform.asset_id)
            }
        };

        let config = CollectorConfig {
            collector_id: ctx.id.clone(),
            collector_name,
            collector_type,
            collector_period,
            collector_security_platform,
        };
        ctx.api.register_collector(&config, icon.as_ref()).await?;
        info!(
            collector = %config.collector_id,
            period = config.collector_period,
            "collector registered"
        );
        Ok(config)
    }
}

fn period(settings: &Configuration) -> Result<u64, DaemonError> {
    match settings.get_i64(COLLECTOR_PERIOD)? {
        None => Ok(DEFAULT_PERIOD_SECONDS),
        Some(seconds) if seconds > 0 => Ok(seconds.unsigned_abs()),
        Some(seconds) => Err(BasError::InvalidValue {
            key: COLLECTOR_PERIOD.to_string(),
            reason: format!("period must be positive, got {seconds}"),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests;
