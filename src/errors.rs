// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types
//!
//! `PubSubError` covers every failure the crate returns to callers, one variant
//! per step so a caller can tell which part of a subscribe or connect failed.
//! `BrokerError` carries a failure reported by the broker client itself.

use thiserror::Error;

/// Represents errors that can occur during publish/subscribe operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PubSubError {
    /// A configuration value was rejected before talking to the broker
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect: {0}")]
    ConnectionError(String),

    /// Error creating a channel from an established connection
    #[error("failure to create a channel: {0}")]
    ChannelError(String),

    /// Error closing the channel or the connection
    #[error("failure to close: {0}")]
    CloseConnectionError(String),

    /// Error configuring Quality of Service parameters
    #[error("failure to configure qos: {0}")]
    QoSDeclarationError(String),

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`: {1}")]
    DeclareExchangeError(String, String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`: {1}")]
    DeclareQueueError(String, String),

    /// Error binding a queue to an exchange with a routing key
    #[error("failure to bind exchange `{0}` to queue `{1}` with key `{2}`: {3}")]
    BindingExchangeToQueueError(String, String, String, String),

    /// Error starting a consumer on a queue
    #[error("failure to declare consumer on queue `{0}`: {1}")]
    BindingConsumerError(String, String),

    /// Error acknowledging a message
    #[error("failure to ack message: {0}")]
    AckMessageError(String),

    /// Error rejecting a message
    #[error("failure to reject message: {0}")]
    RejectMessageError(String),
}

/// A failure reported by the broker client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BrokerError(pub String);

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        BrokerError(err.to_string())
    }
}

impl From<&str> for BrokerError {
    fn from(message: &str) -> Self {
        BrokerError(message.to_owned())
    }
}
