// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Publish/Subscribe over RabbitMQ
//!
//! A thin publish/subscribe abstraction and its RabbitMQ binding. Application code
//! depends on the broker-neutral traits in [`pubsub`]; [`provider::RabbitProvider`]
//! implements them on top of an AMQP 0-9-1 channel.
//!
//! ```no_run
//! # async fn run() -> Result<(), pubsub_rabbitmq::errors::PubSubError> {
//! use pubsub_rabbitmq::{
//!     connection::ConnectionConfig,
//!     provider::{ProviderConfig, RabbitProvider},
//!     pubsub::{Message, Provider},
//!     queue::RabbitQueue,
//!     subscription::Subscription,
//! };
//! use std::sync::Arc;
//!
//! let provider = RabbitProvider::connect(&ConnectionConfig::default(), ProviderConfig::new()).await?;
//! let queue = Arc::new(RabbitQueue::new("orders"));
//! let subscription = Subscription::new(queue).topics(["orders.created"]);
//!
//! let mut messages = provider.subscribe(&subscription).await?;
//! while let Some(msg) = messages.recv().await {
//!     println!("{} bytes", msg.body().len());
//!     msg.ack().await?;
//! }
//! provider.close().await
//! # }
//! ```

pub mod broker;
pub mod connection;
pub mod errors;
pub mod exchange;
pub mod message;
pub mod notify;
pub mod provider;
pub mod pubsub;
pub mod queue;
pub mod subscription;
pub mod values;
