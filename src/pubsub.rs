// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Publish/Subscribe Capabilities
//!
//! Broker-neutral traits that application code depends on. Concrete providers
//! (such as [`crate::provider::RabbitProvider`]) implement them so callers never
//! touch broker-specific APIs directly.

use crate::{errors::PubSubError, values::Table};
use async_trait::async_trait;
use tokio::sync::mpsc::Receiver;

/// A queue as seen by a subscription.
pub trait Queue: Send + Sync {
    /// The effective queue name.
    ///
    /// May be empty before the first declaration when the broker is asked to
    /// generate a name.
    fn name(&self) -> String;
}

/// One delivered message awaiting a terminal action.
///
/// A message is terminal once acked or rejected. Acting on it again is a usage
/// error whose outcome is decided by the broker.
#[async_trait]
pub trait Message: Send + Sync {
    /// Message headers.
    fn headers(&self) -> &Table;

    /// Opaque message payload.
    fn body(&self) -> &[u8];

    /// Acknowledges the message.
    async fn ack(&self) -> Result<(), PubSubError>;

    /// Rejects the message, optionally asking the broker to requeue it.
    async fn reject(&self, requeue: bool) -> Result<(), PubSubError>;
}

/// A subscribe capable broker binding.
#[async_trait]
pub trait Provider: Send + Sync {
    type Subscription: Send + Sync;
    type Message: Message + 'static;

    /// Declares everything the subscription needs and starts consuming.
    ///
    /// The returned receiver yields messages in broker delivery order and is
    /// closed once the underlying consumer goes away.
    async fn subscribe(
        &self,
        subscription: &Self::Subscription,
    ) -> Result<Receiver<Self::Message>, PubSubError>;

    /// Releases the broker resources held by the provider.
    async fn close(&self) -> Result<(), PubSubError>;
}

/// Marker for notifications raised when the broker closes a channel or connection.
pub trait CloseError: std::error::Error + Send + Sync {
    fn is_close(&self) -> bool {
        true
    }
}

/// Marker for notifications raised when a consumer is cancelled.
pub trait CancelError: std::error::Error + Send + Sync {
    fn is_cancel(&self) -> bool {
        true
    }
}
