// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Delivered Messages
//!
//! [`RabbitMessage`] adapts one broker delivery to the [`Message`] contract. Ack and
//! reject go straight to the broker client; no local state tracks whether a terminal
//! action already happened, so acting twice yields whatever the broker decides.

use crate::{
    broker::{DeliveryAcker, InboundDelivery},
    errors::PubSubError,
    pubsub::Message,
    values::Table,
};
use async_trait::async_trait;
use lapin::options::{BasicAckOptions, BasicRejectOptions};
use std::fmt;
use tracing::error;

/// A message received from RabbitMQ.
pub struct RabbitMessage {
    delivery_tag: u64,
    exchange: String,
    routing_key: String,
    redelivered: bool,
    headers: Table,
    body: Vec<u8>,
    acker: Box<dyn DeliveryAcker>,
}

impl RabbitMessage {
    pub fn new(delivery: InboundDelivery) -> RabbitMessage {
        RabbitMessage {
            delivery_tag: delivery.delivery_tag,
            exchange: delivery.exchange,
            routing_key: delivery.routing_key,
            redelivered: delivery.redelivered,
            headers: delivery.headers,
            body: delivery.body,
            acker: delivery.acker,
        }
    }

    pub fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    /// The exchange the message was published to.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    /// The routing key the message was published with.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Whether the broker delivered this message before.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }
}

impl fmt::Debug for RabbitMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RabbitMessage")
            .field("delivery_tag", &self.delivery_tag)
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("redelivered", &self.redelivered)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

#[async_trait]
impl Message for RabbitMessage {
    fn headers(&self) -> &Table {
        &self.headers
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn ack(&self) -> Result<(), PubSubError> {
        match self.acker.ack(BasicAckOptions { multiple: false }).await {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    delivery_tag = self.delivery_tag,
                    "error to ack msg"
                );
                Err(PubSubError::AckMessageError(err.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn reject(&self, requeue: bool) -> Result<(), PubSubError> {
        match self.acker.reject(BasicRejectOptions { requeue }).await {
            Err(err) => {
                error!(
                    error = err.to_string(),
                    delivery_tag = self.delivery_tag,
                    requeue,
                    "error to reject msg"
                );
                Err(PubSubError::RejectMessageError(err.to_string()))
            }
            _ => Ok(()),
        }
    }
}
