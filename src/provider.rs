// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Provider
//!
//! [`RabbitProvider`] implements the [`Provider`] capability on one broker channel.
//! A subscribe call is a direct pass-through to the broker client, in order:
//!
//! 1. declare the subscription's topic exchange (only when it has a name and at
//!    least one topic is given)
//! 2. declare the queue and record the effective name back onto it
//! 3. bind the queue once per topic, in the order the topics were given
//! 4. start a consumer with the subscription's flags
//! 5. spawn a task forwarding deliveries to the returned receiver
//!
//! The first failing step aborts the call. Earlier declarations and bindings stay
//! on the broker: nothing is rolled back.
//!
//! QoS is applied once at construction and is shared by every consumer started
//! through the provider. Every background task observes a provider wide
//! cancellation token which [`RabbitProvider::close`] cancels.

use crate::{
    broker::{BrokerChannel, ConsumerStream},
    connection::{Connection, ConnectionConfig, OwnedConnection},
    errors::PubSubError,
    message::RabbitMessage,
    notify::{cancel_notification, close_notification, spawn_forwarder, CancelSender, CloseSender},
    pubsub::{Provider, Queue},
    subscription::Subscription,
    values::field_table_from_table,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::{
    options::{BasicQosOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel,
};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Capacity of each subscription's message receiver
const MESSAGE_BUFFER: usize = 1;

/// Provider wide settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub(crate) consumer_tag: Option<String>,
    pub(crate) prefetch_count: u16,
    pub(crate) prefetch_size: u32,
    pub(crate) global: bool,
    pub(crate) close_tx: Option<CloseSender>,
    pub(crate) cancel_tx: Option<CancelSender>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            consumer_tag: None,
            prefetch_count: 1,
            prefetch_size: 0,
            global: false,
            close_tx: None,
            cancel_tx: None,
        }
    }
}

impl ProviderConfig {
    pub fn new() -> Self {
        ProviderConfig::default()
    }

    /// Sets the tag consumers are started with instead of a broker generated one.
    pub fn consumer_tag(mut self, tag: &str) -> Self {
        self.consumer_tag = Some(tag.to_owned());
        self
    }

    /// Sets the maximum number of unacknowledged deliveries.
    pub fn prefetch_count(mut self, count: u16) -> Self {
        self.prefetch_count = count;
        self
    }

    /// Sets the maximum size in bytes of unacknowledged deliveries. RabbitMQ only
    /// accepts 0 (no limit).
    pub fn prefetch_size(mut self, size: u32) -> Self {
        self.prefetch_size = size;
        self
    }

    /// Sets whether the prefetch limits are shared by every consumer on the channel.
    pub fn global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    /// Registers a sender receiving a notification whenever the broker closes the
    /// channel or connection.
    pub fn notify_close(mut self, sender: CloseSender) -> Self {
        self.close_tx = Some(sender);
        self
    }

    /// Registers a sender receiving a notification whenever a consumer stops while
    /// the provider is still open.
    pub fn notify_cancel(mut self, sender: CancelSender) -> Self {
        self.cancel_tx = Some(sender);
        self
    }

    fn validate(&self) -> Result<(), PubSubError> {
        if self.prefetch_size != 0 {
            return Err(PubSubError::Configuration(format!(
                "prefetch size {} is not supported, only 0 is accepted",
                self.prefetch_size
            )));
        }
        Ok(())
    }
}

/// RabbitMQ implementation of the [`Provider`] capability.
///
/// Subscribe calls on one provider share its channel. They should be issued one
/// at a time; the provider adds no locking around the declarations.
pub struct RabbitProvider<C = Channel>
where
    C: BrokerChannel,
{
    conn: Option<Arc<Connection>>,
    /// Set when the provider dialed the connection and must close it
    owner: Option<Arc<dyn OwnedConnection>>,
    channel: C,
    consumer_tag: String,
    token: CancellationToken,
    cancel_events: Option<UnboundedSender<String>>,
}

impl RabbitProvider<Channel> {
    /// Dials a new connection and builds a provider that owns it.
    pub async fn connect(
        cfg: &ConnectionConfig,
        config: ProviderConfig,
    ) -> Result<Self, PubSubError> {
        config.validate()?;

        let conn = Arc::new(Connection::connect(cfg).await?);
        let channel = match conn.channel().await {
            Ok(channel) => channel,
            Err(err) => {
                let _ = conn.close().await;
                return Err(err);
            }
        };

        let close_tx = config.close_tx.clone();
        let owner: Arc<dyn OwnedConnection> = conn.clone();
        let provider = Self::build(Some(conn.clone()), Some(owner), channel, config).await?;

        // an owned connection also reports its own errors; a shared one keeps the
        // caller's handler
        if let Some(out) = close_tx {
            let (native_tx, native_rx) = mpsc::unbounded_channel();
            conn.notify_error(native_tx);
            spawn_forwarder(native_rx, out, provider.token.clone(), close_notification);
        }

        Ok(provider)
    }

    /// Builds a provider on a new channel of a caller owned connection.
    ///
    /// The caller must keep the connection open while the provider is in use.
    pub async fn with_connection(
        conn: Arc<Connection>,
        config: ProviderConfig,
    ) -> Result<Self, PubSubError> {
        config.validate()?;

        let channel = conn.channel().await?;
        Self::build(Some(conn), None, channel, config).await
    }
}

impl<C> RabbitProvider<C>
where
    C: BrokerChannel,
{
    /// The connection the provider's channel was opened on, if it knows it.
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.as_deref()
    }

    /// Builds a provider directly on a broker channel.
    pub async fn from_channel(channel: C, config: ProviderConfig) -> Result<Self, PubSubError> {
        config.validate()?;

        Self::build(None, None, channel, config).await
    }

    /// Applies QoS and starts the notification forwarders. An `owner` connection is
    /// closed again when QoS fails.
    async fn build(
        conn: Option<Arc<Connection>>,
        owner: Option<Arc<dyn OwnedConnection>>,
        channel: C,
        config: ProviderConfig,
    ) -> Result<Self, PubSubError> {
        debug!(
            prefetch_count = config.prefetch_count,
            global = config.global,
            "configuring qos..."
        );
        if let Err(err) = channel
            .set_qos(
                config.prefetch_count,
                BasicQosOptions {
                    global: config.global,
                },
            )
            .await
        {
            error!(error = err.to_string(), "error to configure qos");
            if let Some(owner) = &owner {
                let _ = owner.close_connection().await;
            }
            return Err(PubSubError::QoSDeclarationError(err.to_string()));
        }

        let token = CancellationToken::new();

        if let Some(out) = config.close_tx {
            let (native_tx, native_rx) = mpsc::unbounded_channel();
            channel.notify_error(native_tx);
            spawn_forwarder(native_rx, out, token.clone(), close_notification);
        }

        let cancel_events = config.cancel_tx.map(|out| {
            let (native_tx, native_rx) = mpsc::unbounded_channel();
            spawn_forwarder(native_rx, out, token.clone(), cancel_notification);
            native_tx
        });

        Ok(RabbitProvider {
            conn,
            owner,
            channel,
            consumer_tag: config.consumer_tag.unwrap_or_default(),
            token,
            cancel_events,
        })
    }
}

#[async_trait]
impl<C> Provider for RabbitProvider<C>
where
    C: BrokerChannel,
{
    type Subscription = Subscription;
    type Message = RabbitMessage;

    async fn subscribe(
        &self,
        subscription: &Subscription,
    ) -> Result<Receiver<RabbitMessage>, PubSubError> {
        let queue = subscription.queue();
        let exchange = &subscription.exchange;

        if !exchange.name.is_empty() && !subscription.topics.is_empty() {
            debug!("declaring exchange: {}", exchange.name);
            if let Err(err) = self
                .channel
                .declare_exchange(
                    &exchange.name,
                    exchange.kind(),
                    exchange.declare_options(),
                    field_table_from_table(&exchange.args),
                )
                .await
            {
                error!(
                    error = err.to_string(),
                    name = exchange.name.as_str(),
                    "error to declare the exchange"
                );
                return Err(PubSubError::DeclareExchangeError(
                    exchange.name.clone(),
                    err.to_string(),
                ));
            }
        }

        // an empty name asks the broker to generate one, so the effective name
        // is only known from here on
        let requested = queue.name();
        let name = match self
            .channel
            .declare_queue(
                &requested,
                QueueDeclareOptions {
                    passive: false,
                    durable: queue.is_durable(),
                    exclusive: queue.is_exclusive(),
                    auto_delete: queue.is_auto_delete(),
                    nowait: queue.is_no_wait(),
                },
                field_table_from_table(&queue.arguments()),
            )
            .await
        {
            Ok(name) => name,
            Err(err) => {
                error!(
                    error = err.to_string(),
                    name = requested.as_str(),
                    "error to declare the queue"
                );
                return Err(PubSubError::DeclareQueueError(requested, err.to_string()));
            }
        };
        queue.set_name(&name);
        debug!("queue: {} was declared", name);

        for topic in &subscription.topics {
            debug!(
                "binding queue: {} to the exchange: {} with the key: {}",
                name, exchange.name, topic
            );
            if let Err(err) = self
                .channel
                .bind_queue(
                    &name,
                    &exchange.name,
                    topic,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
            {
                error!(error = err.to_string(), "error to bind queue to exchange");
                return Err(PubSubError::BindingExchangeToQueueError(
                    exchange.name.clone(),
                    name,
                    topic.clone(),
                    err.to_string(),
                ));
            }
        }

        let consumer = match self
            .channel
            .consume(
                &name,
                &self.consumer_tag,
                subscription.consume_options(),
                field_table_from_table(&subscription.args),
            )
            .await
        {
            Ok(consumer) => consumer,
            Err(err) => {
                error!(error = err.to_string(), "error to create the consumer");
                return Err(PubSubError::BindingConsumerError(name, err.to_string()));
            }
        };
        debug!(consumer_tag = consumer.tag.as_str(), "consuming queue: {}", name);

        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        tokio::spawn(forward_deliveries(
            consumer,
            tx,
            self.token.clone(),
            self.cancel_events.clone(),
        ));

        Ok(rx)
    }

    async fn close(&self) -> Result<(), PubSubError> {
        self.token.cancel();

        debug!("closing amqp channel...");
        let channel_closed = self.channel.close_channel().await.map_err(|err| {
            error!(error = err.to_string(), "unable to close amqp channel");
            PubSubError::CloseConnectionError(err.to_string())
        });

        // a channel the broker already closed must not keep an owned connection open
        let conn_closed = match &self.owner {
            Some(owner) => owner.close_connection().await,
            None => Ok(()),
        };

        channel_closed.and(conn_closed)
    }
}

impl<C> Drop for RabbitProvider<C>
where
    C: BrokerChannel,
{
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Wraps each delivery of `consumer` into a [`RabbitMessage`] and sends it to `out`
/// in delivery order. Returns when the delivery stream ends or fails, when the
/// caller drops its receiver, or when `token` is cancelled. A stream that ends on
/// its own while `token` is live is reported on `cancel_events`.
async fn forward_deliveries(
    consumer: ConsumerStream,
    out: Sender<RabbitMessage>,
    token: CancellationToken,
    cancel_events: Option<UnboundedSender<String>>,
) {
    let ConsumerStream {
        tag,
        mut deliveries,
    } = consumer;
    let mut stream_ended = false;

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(delivery)) => {
                tokio::select! {
                    _ = token.cancelled() => break,
                    sent = out.send(RabbitMessage::new(delivery)) => {
                        if sent.is_err() {
                            debug!(consumer_tag = tag.as_str(), "message receiver dropped");
                            break;
                        }
                    }
                }
            }
            Some(Err(err)) => {
                error!(
                    error = err.to_string(),
                    consumer_tag = tag.as_str(),
                    "errors consume msg"
                );
                stream_ended = true;
                break;
            }
            None => {
                stream_ended = true;
                break;
            }
        }
    }

    if stream_ended && !token.is_cancelled() {
        if let Some(events) = cancel_events {
            let _ = events.send(tag.clone());
        }
    }

    debug!(consumer_tag = tag.as_str(), "delivery forwarding stopped");
}
