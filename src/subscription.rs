// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Subscriptions
//!
//! A [`Subscription`] gathers everything one subscribe call needs: the exchange to
//! route through, the queue to consume from, the topic filters binding them and
//! the consumer flags.

use crate::{exchange::Exchange, queue::QueueSettings, values::Table};
use lapin::options::BasicConsumeOptions;
use std::sync::Arc;

/// One subscribe request.
///
/// The queue is shared with the caller: once a subscribe call declares it, the
/// caller's handle reports the effective (possibly broker generated) name.
#[derive(Clone)]
pub struct Subscription {
    pub(crate) exchange: Exchange,
    pub(crate) queue: Arc<dyn QueueSettings>,
    pub(crate) topics: Vec<String>,
    pub(crate) auto_ack: bool,
    pub(crate) exclusive: bool,
    pub(crate) no_local: bool,
    pub(crate) no_wait: bool,
    pub(crate) args: Table,
}

impl Subscription {
    /// Creates a subscription on `queue` routed through the default topic exchange.
    pub fn new(queue: Arc<dyn QueueSettings>) -> Subscription {
        Subscription {
            exchange: Exchange::default(),
            queue,
            topics: vec![],
            auto_ack: false,
            exclusive: false,
            no_local: false,
            no_wait: false,
            args: Table::new(),
        }
    }

    /// Sets the topic filters the queue is bound with, in binding order.
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the exchange the queue is bound to.
    pub fn exchange(mut self, exchange: Exchange) -> Self {
        self.exchange = exchange;
        self
    }

    /// Sets whether the broker considers messages acknowledged on delivery.
    pub fn auto_ack(mut self, auto_ack: bool) -> Self {
        self.auto_ack = auto_ack;
        self
    }

    /// Sets whether this must be the only consumer on the queue.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Sets whether messages published on this connection are withheld.
    pub fn no_local(mut self, no_local: bool) -> Self {
        self.no_local = no_local;
        self
    }

    /// Sets whether to skip waiting for the broker to confirm the consumer.
    pub fn no_wait(mut self, no_wait: bool) -> Self {
        self.no_wait = no_wait;
        self
    }

    /// Sets the extra consume arguments.
    pub fn args(mut self, args: Table) -> Self {
        self.args = args;
        self
    }

    pub fn queue(&self) -> Arc<dyn QueueSettings> {
        Arc::clone(&self.queue)
    }

    pub(crate) fn consume_options(&self) -> BasicConsumeOptions {
        BasicConsumeOptions {
            no_local: self.no_local,
            no_ack: self.auto_ack,
            exclusive: self.exclusive,
            nowait: self.no_wait,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pubsub::Queue, queue::RabbitQueue};

    #[test]
    fn defaults_to_the_topic_exchange_without_topics() {
        let subscription = Subscription::new(Arc::new(RabbitQueue::new("orders")));

        assert_eq!(subscription.exchange, Exchange::default());
        assert!(subscription.topics.is_empty());
        let options = subscription.consume_options();
        assert!(!options.no_ack);
        assert!(!options.exclusive);
        assert!(!options.no_local);
        assert!(!options.nowait);
    }

    #[test]
    fn queue_is_shared_with_the_caller() {
        let queue = Arc::new(RabbitQueue::new(""));
        let subscription = Subscription::new(queue.clone());

        subscription.queue().set_name("amq.gen-1");

        assert_eq!(queue.name(), "amq.gen-1");
    }

    #[test]
    fn topics_keep_their_order() {
        let subscription = Subscription::new(Arc::new(RabbitQueue::new("orders")))
            .topics(["orders.created", "orders.*.paid", "#"]);

        assert_eq!(
            subscription.topics,
            vec!["orders.created", "orders.*.paid", "#"]
        );
    }

    #[test]
    fn consumer_flags_map_to_consume_options() {
        let subscription = Subscription::new(Arc::new(RabbitQueue::new("orders")))
            .auto_ack(true)
            .exclusive(true)
            .no_local(true)
            .no_wait(true);

        let options = subscription.consume_options();

        assert!(options.no_ack);
        assert!(options.exclusive);
        assert!(options.no_local);
        assert!(options.nowait);
    }
}
