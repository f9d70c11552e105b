//! NATS order bus.

use super::OrderSubscriber;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use ordercache_config::NatsConfig;
use ordercache_core::{Order, OrderError, OrderResult};
use tracing::{debug, info};

async fn connect(config: &NatsConfig) -> OrderResult<async_nats::Client> {
    async_nats::ConnectOptions::new()
        .name(&config.client_name)
        .connect(&config.url)
        .await
        .map_err(|e| OrderError::bus(format!("Failed to connect to NATS at {}: {}", config.url, e)))
}

/// Core NATS subscription on the configured subject.
pub struct NatsOrderSubscriber {
    client: Option<async_nats::Client>,
    subscriber: Option<async_nats::Subscriber>,
    subject: String,
}

impl NatsOrderSubscriber {
    /// Connects and subscribes.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Bus`] if the server is unreachable or refuses
    /// the subscription.
    pub async fn connect(config: &NatsConfig) -> OrderResult<Self> {
        let client = connect(config).await?;
        let subscriber = client
            .subscribe(config.subject.clone())
            .await
            .map_err(|e| OrderError::bus(format!("Failed to subscribe to '{}': {}", config.subject, e)))?;

        info!(url = %config.url, subject = %config.subject, "Subscribed to NATS");
        Ok(Self {
            client: Some(client),
            subscriber: Some(subscriber),
            subject: config.subject.clone(),
        })
    }
}

impl std::fmt::Debug for NatsOrderSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsOrderSubscriber")
            .field("subject", &self.subject)
            .field("open", &self.subscriber.is_some())
            .finish()
    }
}

#[async_trait]
impl OrderSubscriber for NatsOrderSubscriber {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        let message = self.subscriber.as_mut()?.next().await?;
        Some(message.payload)
    }

    async fn close(&mut self) -> OrderResult<()> {
        let Some(mut subscriber) = self.subscriber.take() else {
            return Ok(());
        };

        subscriber
            .unsubscribe()
            .await
            .map_err(|e| OrderError::bus(format!("Failed to unsubscribe from '{}': {}", self.subject, e)))?;

        if let Some(client) = self.client.take() {
            if let Err(e) = client.flush().await {
                debug!(error = %e, "Flush on close failed");
            }
        }

        info!(subject = %self.subject, "NATS subscription closed");
        Ok(())
    }
}

/// Publishes orders to the configured subject.
#[derive(Clone, Debug)]
pub struct NatsOrderPublisher {
    client: async_nats::Client,
    subject: String,
}

impl NatsOrderPublisher {
    /// Connects to the server.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Bus`] if the server is unreachable.
    pub async fn connect(config: &NatsConfig) -> OrderResult<Self> {
        let client = connect(config).await?;
        Ok(Self {
            client,
            subject: config.subject.clone(),
        })
    }

    /// Subject orders are published on.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Encodes and publishes one order, waiting until the server has it.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Bus`] if the publish or flush fails.
    pub async fn publish(&self, order: &Order) -> OrderResult<()> {
        let payload = Bytes::from(order.encode()?);
        self.client
            .publish(self.subject.clone(), payload)
            .await
            .map_err(|e| OrderError::bus(format!("Failed to publish to '{}': {}", self.subject, e)))?;
        self.client
            .flush()
            .await
            .map_err(|e| OrderError::bus(format!("Failed to flush: {}", e)))?;

        debug!(subject = %self.subject, order_uid = %order.order_uid, "Order published");
        Ok(())
    }
}
