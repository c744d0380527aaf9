//! Pieces shared by the collector and injector daemons.

use std::sync::Arc;
use std::time::Duration;

use bas_client::{AgentApi, BasClient};
use bas_core::{init_logging, BasError, Configuration};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::DaemonError;
use crate::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;

/// Platform base URL.
pub const BAS_URL: &str = "bas_url";
/// Platform API token.
pub const BAS_TOKEN: &str = "bas_token";

const ID_KEYS: &[&str] = &["id", "collector_id", "injector_id"];
const LOG_LEVEL_KEYS: &[&str] = &["log_level", "collector_log_level", "injector_log_level"];
const JSON_LOGGING_KEYS: &[&str] = &["json_logging", "collector_json_logging", "injector_json_logging"];

/// What callbacks get to work with.
pub struct DaemonContext {
    pub api: Arc<dyn AgentApi>,
    pub configuration: Arc<Configuration>,
    /// First of `id`, `collector_id`, `injector_id`.
    pub id: String,
}

impl std::fmt::Debug for DaemonContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaemonContext")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Resolve the daemon id from configuration.
pub fn daemon_id(configuration: &Configuration) -> Result<String, DaemonError> {
    configuration
        .first_str(ID_KEYS)?
        .ok_or_else(|| BasError::Missing("id".to_string()).into())
}

/// Install logging from `log_level` (default `info`) and `json_logging`
/// (default true). Legacy `collector_*` / `injector_*` names are honoured.
pub fn init_daemon_logging(configuration: &Configuration) -> Result<bool, DaemonError> {
    let level = configuration
        .first_str(LOG_LEVEL_KEYS)?
        .unwrap_or_else(|| "info".to_string());

    let mut json = true;
    for key in JSON_LOGGING_KEYS {
        if let Some(value) = configuration.get_bool(key)? {
            json = value;
            break;
        }
    }

    Ok(init_logging(&level, json))
}

/// Build the platform client from `bas_url` and `bas_token`.
pub fn api_from_configuration(configuration: &Configuration) -> Result<Arc<dyn AgentApi>, DaemonError> {
    let url = configuration.require_str(BAS_URL)?;
    let token = configuration.require_str(BAS_TOKEN)?;
    Ok(Arc::new(BasClient::new(url, token)?))
}

/// Cancel `token` on SIGINT or SIGTERM (Ctrl+C elsewhere).
pub fn shutdown_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = os_signal() => {
                info!("shutdown signal received");
                token.cancel();
            }
        }
    });
}

async fn os_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let (mut sigint, mut sigterm) = match (
            signal(SignalKind::interrupt()),
            signal(SignalKind::terminate()),
        ) {
            (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to register signal handlers");
                return std::future::pending().await;
            }
        };
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl_c");
            std::future::pending::<()>().await;
        }
    }
}

// ── DaemonBase ───────────────────────────────────────────────────────

/// State common to both daemon kinds.
pub(crate) struct DaemonBase {
    pub(crate) context: Arc<DaemonContext>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) heartbeat_interval: Duration,
}

impl DaemonBase {
    pub(crate) fn new(configuration: Configuration, api: Arc<dyn AgentApi>) -> Result<Self, DaemonError> {
        init_daemon_logging(&configuration)?;
        let id = daemon_id(&configuration)?;
        Ok(Self {
            context: Arc::new(DaemonContext {
                api,
                configuration: Arc::new(configuration),
                id,
            }),
            shutdown: CancellationToken::new(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
        })
    }
}
