//! AMQP 0-9-1 transport backed by `lapin`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use lapin::options::{BasicAckOptions, BasicConsumeOptions, BasicQosOptions, ConfirmSelectOptions};
use lapin::tcp::{HandshakeResult, RustlsConnector, TcpStream};
use lapin::types::FieldTable;
use lapin::uri::{AMQPAuthority, AMQPScheme, AMQPUri, AMQPUserInfo};
use lapin::{Channel, Connection, ConnectionProperties, Consumer};
use tracing::{debug, error, info};

use crate::consumer::{BrokerConnector, BrokerSession, QueueMessage};
use crate::error::QueueError;
use crate::tls::MqTlsConfig;

/// Deliveries in flight per consumer.
pub const PREFETCH_COUNT: u16 = 1;

/// Where and how to consume.
#[derive(Clone)]
pub struct AmqpConfig {
    pub host: String,
    pub port: u16,
    pub vhost: String,
    pub user: String,
    pub password: String,
    pub use_ssl: bool,
    pub queue: String,
    pub consumer_tag: String,
    pub tls: MqTlsConfig,
}

impl std::fmt::Debug for AmqpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("vhost", &self.vhost)
            .field("user", &self.user)
            .field("use_ssl", &self.use_ssl)
            .field("queue", &self.queue)
            .field("consumer_tag", &self.consumer_tag)
            .finish_non_exhaustive()
    }
}

impl AmqpConfig {
    pub fn uri(&self) -> AMQPUri {
        AMQPUri {
            scheme: if self.use_ssl {
                AMQPScheme::AMQPS
            } else {
                AMQPScheme::AMQP
            },
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.user.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost: self.vhost.clone(),
            query: Default::default(),
        }
    }
}

/// Connects to RabbitMQ (or any AMQP 0-9-1 broker) and starts consuming.
pub struct AmqpConnector {
    config: AmqpConfig,
}

impl AmqpConnector {
    pub fn new(config: AmqpConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> Result<Connection, QueueError> {
        let uri = self.config.uri();
        let properties = ConnectionProperties::default();
        let connection = if self.config.use_ssl {
            let tls = RustlsConnector::from(Arc::new(self.config.tls.client_config()?));
            Connection::connector(
                uri,
                Box::new(move |uri: &AMQPUri| tls_handshake(uri, &tls)),
                properties,
            )
            .await?
        } else {
            Connection::connect_uri(uri, properties).await?
        };
        Ok(connection)
    }

    async fn start_consuming(&self, connection: &Connection) -> Result<(Channel, Consumer), QueueError> {
        let channel = connection.create_channel().await?;

        // Publisher confirms are refused outside clustered setups; not fatal.
        if let Err(e) = channel.confirm_select(ConfirmSelectOptions::default()).await {
            error!(error = %e, "broker refused publisher confirms");
        }

        channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await?;

        let consumer = channel
            .basic_consume(
                &self.config.queue,
                &self.config.consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok((channel, consumer))
    }
}

/// TCP connect, then the TLS handshake against the broker host name.
fn tls_handshake(uri: &AMQPUri, tls: &RustlsConnector) -> HandshakeResult {
    let host = uri.authority.host.as_str();
    let stream = TcpStream::connect((host, uri.authority.port))?;
    let stream = stream.into_rustls(tls, host)?;
    stream.set_nonblocking(true)?;
    Ok(stream)
}

#[async_trait]
impl BrokerConnector for AmqpConnector {
    async fn connect(&self) -> Result<Box<dyn BrokerSession>, QueueError> {
        let connection = self.open().await?;
        info!(broker = %self.describe(), "connected to broker");

        match self.start_consuming(&connection).await {
            Ok((channel, consumer)) => Ok(Box::new(AmqpSession {
                connection,
                channel,
                consumer,
            })),
            Err(e) => {
                if let Err(close_err) = connection.close(200, "OK").await {
                    error!(error = %close_err, "failed to close broker connection");
                }
                Err(e)
            }
        }
    }

    fn describe(&self) -> String {
        let vhost = if self.config.vhost.starts_with('/') {
            self.config.vhost.clone()
        } else {
            format!("/{}", self.config.vhost)
        };
        format!(
            "{}:{}{} queue={}",
            self.config.host, self.config.port, vhost, self.config.queue
        )
    }
}

struct AmqpSession {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
}

#[async_trait]
impl BrokerSession for AmqpSession {
    async fn next_delivery(&mut self) -> Result<Option<QueueMessage>, QueueError> {
        match self.consumer.next().await {
            Some(Ok(delivery)) => Ok(Some(QueueMessage {
                delivery_tag: delivery.delivery_tag,
                body: delivery.data,
                redelivered: delivery.redelivered,
                received_at: Utc::now(),
            })),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), QueueError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| QueueError::Ack(format!("delivery {delivery_tag}: {e}")))
    }

    async fn close(&mut self) -> Result<(), QueueError> {
        debug!("closing broker connection");
        self.connection.close(200, "OK").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(use_ssl: bool) -> AmqpConfig {
        AmqpConfig {
            host: "mq.local".into(),
            port: 5672,
            vhost: "/".into(),
            user: "injector".into(),
            password: "s3cret".into(),
            use_ssl,
            queue: "injector_queue".into(),
            consumer_tag: "bas-injector".into(),
            tls: MqTlsConfig::default(),
        }
    }

    #[test]
    fn uri_reflects_config() {
        let uri = config(false).uri();
        assert_eq!(uri.scheme, AMQPScheme::AMQP);
        assert_eq!(uri.authority.host, "mq.local");
        assert_eq!(uri.authority.port, 5672);
        assert_eq!(uri.authority.userinfo.username, "injector");
        assert_eq!(uri.vhost, "/");

        assert_eq!(config(true).uri().scheme, AMQPScheme::AMQPS);
    }

    #[test]
    fn debug_hides_password() {
        let rendered = format!("{:?}", config(false));
        assert!(!rendered.contains("s3cret"));
    }

    #[test]
    fn describe_names_queue() {
        let connector = AmqpConnector::new(config(false));
        assert_eq!(connector.describe(), "mq.local:5672/ queue=injector_queue");
    }
}
