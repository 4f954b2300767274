// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Settings
//!
//! Declarative settings for the topic exchange a subscription binds its queue to.
//! Subscriptions always route through a topic exchange: messages published with a
//! routing key reach every queue bound with a matching topic filter.

use crate::values::Table;
use lapin::{options::ExchangeDeclareOptions, ExchangeKind};

/// Name of the exchange used when none is given
pub const DEFAULT_EXCHANGE_NAME: &str = "topic";

/// Settings for declaring a topic exchange.
///
/// Defaults to a durable exchange named [`DEFAULT_EXCHANGE_NAME`].
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) auto_delete: bool,
    pub(crate) no_wait: bool,
    pub(crate) args: Table,
}

impl Default for Exchange {
    fn default() -> Self {
        Exchange {
            name: DEFAULT_EXCHANGE_NAME.to_owned(),
            durable: true,
            auto_delete: false,
            no_wait: false,
            args: Table::new(),
        }
    }
}

impl Exchange {
    pub fn new() -> Exchange {
        Exchange::default()
    }

    /// Sets the exchange name. An empty name skips the exchange declaration for
    /// the subscription using it.
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Sets whether the exchange survives a broker restart.
    pub fn durable(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Sets whether the exchange is removed once its last binding goes away.
    pub fn auto_delete(mut self, auto_delete: bool) -> Self {
        self.auto_delete = auto_delete;
        self
    }

    /// Sets whether to skip waiting for the broker to confirm the declaration.
    pub fn no_wait(mut self, no_wait: bool) -> Self {
        self.no_wait = no_wait;
        self
    }

    /// Sets the extra declaration arguments.
    pub fn args(mut self, args: Table) -> Self {
        self.args = args;
        self
    }

    pub(crate) fn kind(&self) -> ExchangeKind {
        ExchangeKind::Topic
    }

    pub(crate) fn declare_options(&self) -> ExchangeDeclareOptions {
        ExchangeDeclareOptions {
            passive: false,
            durable: self.durable,
            auto_delete: self.auto_delete,
            // consumers have no use for internal exchanges
            internal: false,
            nowait: self.no_wait,
        }
    }
}
