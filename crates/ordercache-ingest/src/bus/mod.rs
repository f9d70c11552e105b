//! Message bus subscriptions delivering raw order event payloads.
//!
//! Delivery is at-most-once: a payload handed out by [`OrderSubscriber::next_payload`]
//! is never redelivered, whatever the pipeline does with it.

mod channel;
mod nats;

pub use channel::{order_channel, ChannelOrderPublisher, ChannelOrderSubscriber};
pub use nats::{NatsOrderPublisher, NatsOrderSubscriber};

use async_trait::async_trait;
use bytes::Bytes;
use ordercache_core::OrderResult;

/// A subscription to one subject.
#[async_trait]
pub trait OrderSubscriber: Send {
    /// Subject this subscription listens on.
    fn subject(&self) -> &str;

    /// Waits for the next payload. `None` once the subscription has ended.
    ///
    /// Must be cancel-safe: dropping the future loses no payload.
    async fn next_payload(&mut self) -> Option<Bytes>;

    /// Unsubscribes and releases the connection.
    ///
    /// Calling this more than once has no further effect.
    async fn close(&mut self) -> OrderResult<()>;
}
