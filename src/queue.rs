// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Settings
//!
//! Declarative settings for the queue a subscription consumes from. The name may
//! be empty to ask the broker for a generated one; the provider records the
//! effective name back onto the queue after declaring it, and the caller sees it
//! through its own reference.

use crate::{pubsub::Queue, values::Table};
use std::sync::{PoisonError, RwLock};

/// What a provider needs to know to declare a queue.
///
/// Subscriptions hold queues through this trait rather than a concrete type so
/// that other queue implementations can be swapped in.
pub trait QueueSettings: Queue {
    fn is_durable(&self) -> bool;

    fn is_auto_delete(&self) -> bool;

    fn is_exclusive(&self) -> bool;

    fn is_no_wait(&self) -> bool;

    fn arguments(&self) -> Table;

    /// Records the effective name returned by the broker.
    fn set_name(&self, name: &str);
}

/// Settings for declaring a RabbitMQ queue.
///
/// Queues are durable unless told otherwise.
#[derive(Debug)]
pub struct RabbitQueue {
    name: RwLock<String>,
    pub(crate) durable: bool,
    pub(crate) auto_delete: bool,
    pub(crate) exclusive: bool,
    pub(crate) no_wait: bool,
    pub(crate) args: Table,
}

impl RabbitQueue {
    /// Creates queue settings for `target`. An empty target asks the broker to
    /// generate a name on declaration.
    pub fn new(target: &str) -> RabbitQueue {
        RabbitQueue {
            name: RwLock::new(target.to_owned()),
            durable: true,
            auto_delete: false,
            exclusive: false,
            no_wait: false,
            args: Table::new(),
        }
    }

    /// Sets whether the queue survives a broker restart.
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Sets whether the queue is removed once its last consumer goes away.
    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Sets whether the queue is restricted to the declaring connection.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }

    /// Sets whether to skip waiting for the broker to confirm the declaration.
    pub fn no_wait(mut self, no_wait: bool) -> Self {
        self.no_wait = no_wait;
        self
    }

    /// Sets the extra declaration arguments, e.g. `x-message-ttl`.
    pub fn args(mut self, args: Table) -> Self {
        self.args = args;
        self
    }
}

impl Queue for RabbitQueue {
    fn name(&self) -> String {
        self.name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl QueueSettings for RabbitQueue {
    fn is_durable(&self) -> bool {
        self.durable
    }

    fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    fn is_no_wait(&self) -> bool {
        self.no_wait
    }

    fn arguments(&self) -> Table {
        self.args.clone()
    }

    fn set_name(&self, name: &str) {
        let mut current = self.name.write().unwrap_or_else(PoisonError::into_inner);
        *current = name.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::Value;

    #[test]
    fn name_is_the_target_before_declaration() {
        let queue = RabbitQueue::new("orders.created");

        assert_eq!(queue.name(), "orders.created");
    }

    #[test]
    fn defaults_to_a_durable_shared_queue() {
        let queue = RabbitQueue::new("orders");

        assert!(queue.is_durable());
        assert!(!queue.is_auto_delete());
        assert!(!queue.is_exclusive());
        assert!(!queue.is_no_wait());
        assert!(queue.arguments().is_empty());
    }

    #[test]
    fn set_name_replaces_a_generated_name() {
        let queue = RabbitQueue::new("");
        assert_eq!(queue.name(), "");

        queue.set_name("amq.gen-JzTY20BRgKO-HjmUJj0wLg");

        assert_eq!(queue.name(), "amq.gen-JzTY20BRgKO-HjmUJj0wLg");
    }

    #[test]
    fn builder_sets_every_flag() {
        let mut args = Table::new();
        args.insert("x-max-length".to_owned(), Value::from(100));

        let queue = RabbitQueue::new("audit")
            .durable(false)
            .auto_delete(true)
            .exclusive(true)
            .no_wait(true)
            .args(args.clone());

        assert!(!queue.is_durable());
        assert!(queue.is_auto_delete());
        assert!(queue.is_exclusive());
        assert!(queue.is_no_wait());
        assert_eq!(queue.arguments(), args);
    }
}
