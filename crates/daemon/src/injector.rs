//! Push-style agent: register, keep alive, execute orders from a queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bas_client::{
    prepare_contracts, AgentApi, Contract, FileAttachment, InjectorConfig, InjectorRegistration,
};
use bas_core::{BasError, Configuration};
use bas_queue::{
    mq_tls_hints, AmqpConfig, AmqpConnector, BrokerConnector, MessagePayload, MqTlsConfig,
    QueueConsumer,
};
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::daemon::{api_from_configuration, DaemonBase, DaemonContext};
use crate::error::DaemonError;
use crate::heartbeat::HeartbeatWorker;

pub const INJECTOR_NAME: &str = "injector_name";
pub const INJECTOR_TYPE: &str = "injector_type";
pub const INJECTOR_CONTRACTS: &str = "injector_contracts";
pub const INJECTOR_CUSTOM_CONTRACTS: &str = "injector_custom_contracts";
pub const INJECTOR_CATEGORY: &str = "injector_category";
pub const INJECTOR_EXECUTOR_COMMANDS: &str = "injector_executor_commands";
pub const INJECTOR_EXECUTOR_CLEAR_COMMANDS: &str = "injector_executor_clear_commands";
pub const INJECTOR_ICON_FILEPATH: &str = "injector_icon_filepath";

/// Callback run for every execution order received.
pub type InjectorCallback = Arc<
    dyn Fn(Arc<DaemonContext>, MessagePayload) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

pub struct InjectorDaemon {
    base: DaemonBase,
    callback: Option<InjectorCallback>,
    connector: Option<Arc<dyn BrokerConnector>>,
    contracts: Vec<Contract>,
}

impl InjectorDaemon {
    /// Daemon talking to the platform named by `bas_url` / `bas_token`.
    pub fn new(configuration: Configuration) -> Result<Self, DaemonError> {
        let api = api_from_configuration(&configuration)?;
        Self::with_api(configuration, api)
    }

    pub fn with_api(mut configuration: Configuration, api: Arc<dyn AgentApi>) -> Result<Self, DaemonError> {
        configuration.add_hints(mq_tls_hints());
        Ok(Self {
            base: DaemonBase::new(configuration, api)?,
            callback: None,
            connector: None,
            contracts: Vec::new(),
        })
    }

    /// Set the callback run for every message.
    pub fn on_message<F, Fut>(mut self, callback: F) -> Self
    where
        F: Fn(Arc<DaemonContext>, MessagePayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.callback = Some(Arc::new(move |ctx, payload| Box::pin(callback(ctx, payload))));
        self
    }

    /// Declare these contracts on registration instead of the configured
    /// `injector_contracts`.
    pub fn contracts(mut self, contracts: Vec<Contract>) -> Self {
        self.contracts = contracts;
        self
    }

    /// Consume through `connector` instead of the broker the platform hands
    /// out at registration.
    pub fn with_connector(mut self, connector: Arc<dyn BrokerConnector>) -> Self {
        self.connector = Some(connector);
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
        info!(injector = %self.id(), "preparing injector for clean shutdown");
        self.base.shutdown.cancel();
    }

    /// Register, start the heartbeat and the queue consumer, then wait for
    /// shutdown. In-flight messages are drained before returning.
    pub async fn start(&self) -> Result<(), DaemonError> {
        let callback = self.callback.clone().ok_or(DaemonError::MissingCallback)?;
        let ctx = self.context();
        let config = self.injector_config()?;
        let icon = self.icon(&config)?;

        let registration = ctx.api.register_injector(&config, icon.as_ref()).await?;
        info!(
            injector = %config.injector_id,
            queue = %registration.listen,
            "injector registered"
        );
        let connector = self.connector(&registration)?;

        let heartbeat = HeartbeatWorker::injector(ctx.api.clone(), config)
            .interval(self.base.heartbeat_interval)
            .start_with_token(self.base.shutdown.child_token());

        let handler_ctx = ctx.clone();
        let consumer = QueueConsumer::new(connector, move |payload| callback(handler_ctx.clone(), payload))
            .start_with_token(self.base.shutdown.child_token());

        self.base.shutdown.cancelled().await;
        consumer.stop().await;
        heartbeat.stop().await;
        info!(injector = %ctx.id, "injector stopped");
        Ok(())
    }

    fn injector_config(&self) -> Result<InjectorConfig, DaemonError> {
        let ctx = &self.base.context;
        let settings = &ctx.configuration;

        let injector_contracts = if self.contracts.is_empty() {
            settings
                .get(INJECTOR_CONTRACTS)?
                .ok_or_else(|| BasError::Missing(INJECTOR_CONTRACTS.to_string()))?
        } else {
            prepare_contracts(&self.contracts)?
        };

        Ok(InjectorConfig {
            injector_id: ctx.id.clone(),
            injector_name: settings.require_str(INJECTOR_NAME)?,
            injector_type: settings.require_str(INJECTOR_TYPE)?,
            injector_contracts,
            injector_custom_contracts: settings.get_bool(INJECTOR_CUSTOM_CONTRACTS)?.unwrap_or(false),
            injector_category: settings.get_str(INJECTOR_CATEGORY)?,
            injector_executor_commands: settings.get(INJECTOR_EXECUTOR_COMMANDS)?,
            injector_executor_clear_commands: settings.get(INJECTOR_EXECUTOR_CLEAR_COMMANDS)?,
        })
    }

    fn icon(&self, config: &InjectorConfig) -> Result<Option<FileAttachment>, DaemonError> {
        let path = self.base.context.configuration.get_str(INJECTOR_ICON_FILEPATH)?;
        Ok(path
            .map(|path| {
                FileAttachment::from_path(path, format!("{}.png", config.injector_type), "image/png")
            })
            .transpose()?)
    }

    fn connector(&self, registration: &InjectorRegistration) -> Result<Arc<dyn BrokerConnector>, DaemonError> {
        if let Some(connector) = &self.connector {
            return Ok(connector.clone());
        }

        let connection = &registration.connection;
        let config = AmqpConfig {
            host: connection.host.clone(),
            port: connection.port,
            vhost: connection.vhost.clone(),
            user: connection.user.clone(),
            password: connection.pass.clone(),
            use_ssl: connection.use_ssl,
            queue: registration.listen.clone(),
            consumer_tag: self.id().to_string(),
            tls: MqTlsConfig::from_configuration(&self.base.context.configuration)?,
        };
        Ok(Arc::new(AmqpConnector::new(config)))
    }
}
