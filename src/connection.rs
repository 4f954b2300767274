// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # AMQP Connection Management
//!
//! This module holds the dial parameters for a RabbitMQ server and the connection
//! built from them. A [`Connection`] owns the network connection and hands out
//! channels on demand. No reconnection is attempted: a failed dial or a lost
//! connection is reported to the caller, who decides what to do next.

use crate::{
    broker::REPLY_SUCCESS,
    errors::{BrokerError, PubSubError},
};
use async_trait::async_trait;
use lapin::{
    types::LongString,
    uri::{AMQPAuthority, AMQPScheme, AMQPUri, AMQPUserInfo},
    Channel, ConnectionProperties,
};
use serde::Deserialize;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

#[cfg(test)]
use mockall::automock;

/// Environment variable overriding the broker host
pub const ENV_HOST: &str = "RABBITMQ_HOST";
/// Environment variable overriding the broker port
pub const ENV_PORT: &str = "RABBITMQ_PORT";
/// Environment variable overriding the user name
pub const ENV_USER: &str = "RABBITMQ_USER";
/// Environment variable overriding the password
pub const ENV_PASSWORD: &str = "RABBITMQ_PASSWORD";
/// Environment variable overriding the virtual host
pub const ENV_VHOST: &str = "RABBITMQ_VHOST";
/// Environment variable toggling TLS (`true`/`false`/`1`/`0`)
pub const ENV_TLS: &str = "RABBITMQ_TLS";
/// Environment variable overriding the connection name shown by the broker
pub const ENV_CONNECTION_NAME: &str = "RABBITMQ_CONNECTION_NAME";

/// Dial parameters for a RabbitMQ server.
///
/// Every field has a default, so a partial configuration file only needs to name
/// what differs from a local development broker.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Virtual host; empty selects the broker default `/`
    pub vhost: String,
    pub tls: bool,
    pub connection_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            host: "localhost".to_owned(),
            port: 5672,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: String::new(),
            tls: false,
            connection_name: env!("CARGO_PKG_NAME").to_owned(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("vhost", &self.vhost)
            .field("tls", &self.tls)
            .field("connection_name", &self.connection_name)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn new() -> Self {
        ConnectionConfig::default()
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_owned();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: &str) -> Self {
        self.user = user.to_owned();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = password.to_owned();
        self
    }

    pub fn vhost(mut self, vhost: &str) -> Self {
        self.vhost = vhost.to_owned();
        self
    }

    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    pub fn connection_name(mut self, name: &str) -> Self {
        self.connection_name = name.to_owned();
        self
    }

    /// Builds a configuration from the `RABBITMQ_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Result<Self, PubSubError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup using the same keys
    /// as [`ConnectionConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PubSubError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = ConnectionConfig::default();

        if let Some(host) = lookup(ENV_HOST) {
            cfg.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            cfg.port = port.trim().parse().map_err(|_| {
                PubSubError::Configuration(format!("{ENV_PORT} is not a valid port: `{port}`"))
            })?;
        }
        if let Some(user) = lookup(ENV_USER) {
            cfg.user = user;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            cfg.password = password;
        }
        if let Some(vhost) = lookup(ENV_VHOST) {
            cfg.vhost = vhost;
        }
        if let Some(tls) = lookup(ENV_TLS) {
            cfg.tls = match tls.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" | "" => false,
                _ => {
                    return Err(PubSubError::Configuration(format!(
                        "{ENV_TLS} is not a boolean: `{tls}`"
                    )))
                }
            };
        }
        if let Some(name) = lookup(ENV_CONNECTION_NAME) {
            cfg.connection_name = name;
        }

        Ok(cfg)
    }

    /// The structured AMQP URI for these parameters.
    pub fn amqp_uri(&self) -> AMQPUri {
        let vhost = if self.vhost.is_empty() {
            "/".to_owned()
        } else {
            self.vhost.clone()
        };

        AMQPUri {
            scheme: if self.tls {
                AMQPScheme::AMQPS
            } else {
                AMQPScheme::AMQP
            },
            authority: AMQPAuthority {
                userinfo: AMQPUserInfo {
                    username: self.user.clone(),
                    password: self.password.clone(),
                },
                host: self.host.clone(),
                port: self.port,
            },
            vhost,
            ..Default::default()
        }
    }
}

/// Shutdown of a connection whose lifetime a provider is responsible for.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait OwnedConnection: Send + Sync + 'static {
    async fn close_connection(&self) -> Result<(), PubSubError>;
}

/// An open connection to a RabbitMQ server.
pub struct Connection {
    conn: lapin::Connection,
}

impl Connection {
    /// Dials the broker described by `cfg`.
    ///
    /// Any dial failure (name resolution, authentication, network) is returned as
    /// [`PubSubError::ConnectionError`].
    pub async fn connect(cfg: &ConnectionConfig) -> Result<Self, PubSubError> {
        debug!(
            host = cfg.host.as_str(),
            port = cfg.port,
            tls = cfg.tls,
            "creating amqp connection..."
        );
        let options = ConnectionProperties::default()
            .with_connection_name(LongString::from(cfg.connection_name.clone()));

        let conn = match lapin::Connection::connect_uri(cfg.amqp_uri(), options).await {
            Ok(c) => Ok(c),
            Err(err) => {
                error!(error = err.to_string(), "failure to connect");
                Err(PubSubError::ConnectionError(err.to_string()))
            }
        }?;
        debug!("amqp connected");

        Ok(Connection { conn })
    }

    /// Opens a new channel on this connection.
    pub async fn channel(&self) -> Result<Channel, PubSubError> {
        debug!("creating amqp channel...");
        match self.conn.create_channel().await {
            Ok(c) => {
                debug!("channel created");
                Ok(c)
            }
            Err(err) => {
                error!(error = err.to_string(), "error to create the channel");
                Err(PubSubError::ChannelError(err.to_string()))
            }
        }
    }

    /// Routes connection level errors into `sink`.
    pub fn notify_error(&self, sink: UnboundedSender<BrokerError>) {
        self.conn.on_error(move |err| {
            let _ = sink.send(BrokerError::from(err));
        });
    }

    /// Closes the network connection. Fails if it is already closed.
    pub async fn close(&self) -> Result<(), PubSubError> {
        debug!("closing amqp connection...");
        self.conn
            .close(REPLY_SUCCESS, "closing connection")
            .await
            .map_err(|err| {
                error!(error = err.to_string(), "unable to close amqp connection");
                PubSubError::CloseConnectionError(err.to_string())
            })
    }
}

#[async_trait]
impl OwnedConnection for Connection {
    async fn close_connection(&self) -> Result<(), PubSubError> {
        self.close().await
    }
}
