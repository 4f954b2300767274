// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Broker Channel Seam
//!
//! The provider talks to the broker only through [`BrokerChannel`], a one-to-one
//! image of the channel operations it needs: QoS, exchange and queue declaration,
//! bindings, consumers and the error hook. The trait is implemented for
//! [`lapin::Channel`]; tests substitute a mock.
//!
//! Deliveries leave the seam as [`InboundDelivery`] values, already detached from
//! the client's native types apart from the [`DeliveryAcker`] they carry.

use crate::{
    errors::BrokerError,
    values::{table_from_field_table, Table},
};
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use lapin::{
    acker::Acker,
    message::Delivery,
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicQosOptions, BasicRejectOptions,
        ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
    },
    types::FieldTable,
    Channel, ExchangeKind,
};
use std::pin::Pin;
use tokio::sync::mpsc::UnboundedSender;

#[cfg(test)]
use mockall::automock;

/// AMQP reply code for a normal shutdown
pub const REPLY_SUCCESS: u16 = 200;

/// Stream of deliveries produced by one consumer.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<InboundDelivery, BrokerError>> + Send>>;

/// A started consumer: the tag the broker knows it by and its deliveries.
pub struct ConsumerStream {
    pub tag: String,
    pub deliveries: DeliveryStream,
}

/// The channel operations the provider delegates to the broker client.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BrokerChannel: Send + Sync + 'static {
    async fn set_qos(&self, prefetch_count: u16, options: BasicQosOptions) -> Result<(), BrokerError>;

    async fn declare_exchange(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        options: ExchangeDeclareOptions,
        arguments: FieldTable,
    ) -> Result<(), BrokerError>;

    /// Declares a queue and returns the effective name, which is broker generated
    /// when `queue` is empty.
    async fn declare_queue(
        &self,
        queue: &str,
        options: QueueDeclareOptions,
        arguments: FieldTable,
    ) -> Result<String, BrokerError>;

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        options: QueueBindOptions,
        arguments: FieldTable,
    ) -> Result<(), BrokerError>;

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        arguments: FieldTable,
    ) -> Result<ConsumerStream, BrokerError>;

    /// Routes every error the channel reports into `sink`.
    fn notify_error(&self, sink: UnboundedSender<BrokerError>);

    async fn close_channel(&self) -> Result<(), BrokerError>;
}

/// Acknowledgement primitives of one delivery.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeliveryAcker: Send + Sync {
    async fn ack(&self, options: BasicAckOptions) -> Result<(), BrokerError>;

    async fn reject(&self, options: BasicRejectOptions) -> Result<(), BrokerError>;
}

/// One delivery as handed over by the broker client.
pub struct InboundDelivery {
    pub delivery_tag: u64,
    pub exchange: String,
    pub routing_key: String,
    pub redelivered: bool,
    pub headers: Table,
    pub body: Vec<u8>,
    pub acker: Box<dyn DeliveryAcker>,
}

impl From<Delivery> for InboundDelivery {
    fn from(delivery: Delivery) -> Self {
        let headers = delivery
            .properties
            .headers()
            .as_ref()
            .map(table_from_field_table)
            .unwrap_or_default();

        InboundDelivery {
            delivery_tag: delivery.delivery_tag,
            exchange: delivery.exchange.as_str().to_owned(),
            routing_key: delivery.routing_key.as_str().to_owned(),
            redelivered: delivery.redelivered,
            headers,
            body: delivery.data,
            acker: Box::new(delivery.acker),
        }
    }
}

#[async_trait]
impl DeliveryAcker for Acker {
    async fn ack(&self, options: BasicAckOptions) -> Result<(), BrokerError> {
        Acker::ack(self, options).await?;
        Ok(())
    }

    async fn reject(&self, options: BasicRejectOptions) -> Result<(), BrokerError> {
        Acker::reject(self, options).await?;
        Ok(())
    }
}

#[async_trait]
impl BrokerChannel for Channel {
    async fn set_qos(&self, prefetch_count: u16, options: BasicQosOptions) -> Result<(), BrokerError> {
        Ok(self.basic_qos(prefetch_count, options).await?)
    }

    async fn declare_exchange(
        &self,
        exchange: &str,
        kind: ExchangeKind,
        options: ExchangeDeclareOptions,
        arguments: FieldTable,
    ) -> Result<(), BrokerError> {
        Ok(self
            .exchange_declare(exchange, kind, options, arguments)
            .await?)
    }

    async fn declare_queue(
        &self,
        queue: &str,
        options: QueueDeclareOptions,
        arguments: FieldTable,
    ) -> Result<String, BrokerError> {
        let declared = self.queue_declare(queue, options, arguments).await?;
        Ok(declared.name().as_str().to_owned())
    }

    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
        options: QueueBindOptions,
        arguments: FieldTable,
    ) -> Result<(), BrokerError> {
        Ok(self
            .queue_bind(queue, exchange, routing_key, options, arguments)
            .await?)
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
        options: BasicConsumeOptions,
        arguments: FieldTable,
    ) -> Result<ConsumerStream, BrokerError> {
        let consumer = self
            .basic_consume(queue, consumer_tag, options, arguments)
            .await?;

        let tag = consumer.tag().as_str().to_owned();
        let deliveries = consumer
            .map(|result| {
                result
                    .map(InboundDelivery::from)
                    .map_err(BrokerError::from)
            })
            .boxed();

        Ok(ConsumerStream { tag, deliveries })
    }

    fn notify_error(&self, sink: UnboundedSender<BrokerError>) {
        self.on_error(move |err| {
            // the receiver is gone once the provider stops forwarding
            let _ = sink.send(BrokerError::from(err));
        });
    }

    async fn close_channel(&self) -> Result<(), BrokerError> {
        Ok(self.close(REPLY_SUCCESS, "closing channel").await?)
    }
}
