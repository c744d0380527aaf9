//! Supervised queue consumption.
//!
//! [`QueueConsumer`] keeps one broker session open and consumes it one message
//! at a time:
//!
//! 1. **Connect** through the [`BrokerConnector`] (prefetch 1).
//! 2. **Receive** a delivery, parse it, and **ack it immediately**, before the
//!    handler runs. A message is never redelivered because its handler broke.
//! 3. **Dispatch** the payload to the handler on its own task.
//!
//! Any failure closes the session, waits a fixed backoff and reconnects,
//! forever. `stop()` cancels the loop, closes the session and waits for
//! handlers still running.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::consumer::{BrokerConnector, BrokerSession, ConsumerState};
use crate::error::QueueError;
use crate::parser::{parse_message, MessagePayload};

/// Wait between a failure and the next connection attempt.
pub const DEFAULT_RECONNECT_BACKOFF: Duration = Duration::from_secs(10);

/// Boxed async function that handles one decoded message.
pub type MessageHandler = Box<
    dyn Fn(MessagePayload) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>
        + Send
        + Sync,
>;

/// At-least-once consumer of a single queue.
pub struct QueueConsumer {
    connector: Arc<dyn BrokerConnector>,
    handler: MessageHandler,
    backoff: Duration,
}

impl QueueConsumer {
    pub fn new<F, Fut>(connector: Arc<dyn BrokerConnector>, handler: F) -> Self
    where
        F: Fn(MessagePayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            connector,
            handler: Box::new(move |payload| Box::pin(handler(payload))),
            backoff: DEFAULT_RECONNECT_BACKOFF,
        }
    }

    /// Set the reconnect backoff (default: 10s).
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Spawn the consume loop.
    pub fn start(self) -> ConsumerHandle {
        self.start_with_token(CancellationToken::new())
    }

    /// Spawn the consume loop; cancelling `cancel` stops it.
    pub fn start_with_token(self, cancel: CancellationToken) -> ConsumerHandle {
        let (state_tx, state_rx) = watch::channel(ConsumerState::Disconnected);
        let task = tokio::spawn(self.run(cancel.clone(), state_tx));
        ConsumerHandle {
            cancel,
            state: state_rx,
            task,
        }
    }

    async fn run(self, cancel: CancellationToken, state: watch::Sender<ConsumerState>) {
        let broker = self.connector.describe();
        info!(broker = %broker, "starting queue consumer");
        let handlers = TaskTracker::new();

        while !cancel.is_cancelled() {
            state.send_replace(ConsumerState::Connecting);
            info!(broker = %broker, "connecting to broker");

            let connected = tokio::select! {
                _ = cancel.cancelled() => break,
                connected = self.connector.connect() => connected,
            };

            let outcome = match connected {
                Ok(mut session) => {
                    state.send_replace(ConsumerState::Consuming);
                    let outcome = self.consume(&mut *session, &cancel, &handlers).await;
                    if let Err(e) = session.close().await {
                        error!(error = %e, "failed to close broker connection");
                    }
                    outcome
                }
                Err(e) => Err(e),
            };

            if let Err(e) = outcome {
                error!(broker = %broker, error = %e, "queue consumer failed");
            }
            if cancel.is_cancelled() {
                break;
            }

            state.send_replace(ConsumerState::Disconnected);
            debug!(backoff = ?self.backoff, "waiting before reconnecting");
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }

        handlers.close();
        if !handlers.is_empty() {
            info!(in_flight = handlers.len(), "waiting for message handlers to finish");
        }
        handlers.wait().await;
        state.send_replace(ConsumerState::Stopped);
        info!(broker = %broker, "queue consumer stopped");
    }

    /// Consume until cancelled (`Ok`) or until the session fails (`Err`).
    async fn consume(
        &self,
        session: &mut dyn BrokerSession,
        cancel: &CancellationToken,
        handlers: &TaskTracker,
    ) -> Result<(), QueueError> {
        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                delivery = session.next_delivery() => delivery?,
            };
            let Some(message) = delivery else {
                return Err(QueueError::Connection("broker ended the consumer stream".into()));
            };

            let payload = parse_message(&message);
            session.ack(message.delivery_tag).await?;

            match payload {
                Ok(payload) => {
                    debug!(delivery_tag = message.delivery_tag, "dispatching message");
                    let handling = (self.handler)(payload);
                    let delivery_tag = message.delivery_tag;
                    handlers.spawn(async move {
                        if let Err(e) = handling.await {
                            error!(delivery_tag, error = %e, "message handler failed");
                        }
                    });
                }
                Err(e) => {
                    warn!(
                        delivery_tag = message.delivery_tag,
                        error = %e,
                        "dropping unparseable message"
                    );
                }
            }
        }
    }
}

/// Control handle for a running [`QueueConsumer`].
pub struct ConsumerHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ConsumerState>,
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ConsumerState> {
        self.state.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop consuming, close the connection and wait for in-flight handlers.
    pub async fn stop(self) {
        info!("preparing queue consumer for clean shutdown");
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the consumer to finish without cancelling it.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "queue consumer task failed");
        }
    }
}
