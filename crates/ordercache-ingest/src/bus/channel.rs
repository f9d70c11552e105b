//! In-process order bus backed by a tokio mpsc channel.
//!
//! Used for local runs and tests where no NATS server is available.

use super::OrderSubscriber;
use async_trait::async_trait;
use bytes::Bytes;
use ordercache_core::{OrderError, OrderResult};
use tokio::sync::mpsc;
use tracing::debug;

/// Creates a connected publisher/subscriber pair for `subject`.
#[must_use]
pub fn order_channel(
    subject: impl Into<String>,
    capacity: usize,
) -> (ChannelOrderPublisher, ChannelOrderSubscriber) {
    let subject = subject.into();
    let (tx, rx) = mpsc::channel(capacity);
    (
        ChannelOrderPublisher {
            sender: tx,
            subject: subject.clone(),
        },
        ChannelOrderSubscriber {
            receiver: rx,
            subject,
            closed: false,
        },
    )
}

/// Sending half of an in-process order bus.
#[derive(Clone, Debug)]
pub struct ChannelOrderPublisher {
    sender: mpsc::Sender<Bytes>,
    subject: String,
}

impl ChannelOrderPublisher {
    /// Publishes a raw payload.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Bus`] once the subscriber has closed.
    pub async fn publish(&self, payload: impl Into<Bytes>) -> OrderResult<()> {
        self.sender
            .send(payload.into())
            .await
            .map_err(|_| OrderError::bus(format!("Subscriber for '{}' is gone", self.subject)))
    }
}

/// Receiving half of an in-process order bus.
#[derive(Debug)]
pub struct ChannelOrderSubscriber {
    receiver: mpsc::Receiver<Bytes>,
    subject: String,
    closed: bool,
}

#[async_trait]
impl OrderSubscriber for ChannelOrderSubscriber {
    fn subject(&self) -> &str {
        &self.subject
    }

    async fn next_payload(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    async fn close(&mut self) -> OrderResult<()> {
        if self.closed {
            return Ok(());
        }
        self.receiver.close();
        self.closed = true;
        debug!(subject = %self.subject, "Channel subscription closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_payloads_arrive_in_order() {
        let (publisher, mut subscriber) = order_channel("subject_orders", 4);
        publisher.publish("one").await.unwrap();
        publisher.publish("two").await.unwrap();

        assert_eq!(subscriber.subject(), "subject_orders");
        assert_eq!(subscriber.next_payload().await.unwrap(), Bytes::from("one"));
        assert_eq!(subscriber.next_payload().await.unwrap(), Bytes::from("two"));
    }

    #[tokio::test]
    async fn test_dropping_publisher_ends_subscription() {
        let (publisher, mut subscriber) = order_channel("subject_orders", 1);
        drop(publisher);
        assert!(subscriber.next_payload().await.is_none());
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_publishers() {
        let (publisher, mut subscriber) = order_channel("subject_orders", 1);

        subscriber.close().await.unwrap();
        subscriber.close().await.unwrap();

        let err = publisher.publish("late").await.unwrap_err();
        assert!(matches!(err, OrderError::Bus(_)));
    }
}
