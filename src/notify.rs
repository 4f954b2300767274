// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Close and Cancel Notifications
//!
//! Callers may opt into broker lifecycle notifications. Native events (channel
//! errors, ended consumers) are pushed onto an internal unbounded channel; a
//! forwarding task translates each one into a [`CloseError`] or [`CancelError`]
//! value and hands it to the caller's sender. The caller's channel closes when
//! the native source closes or the provider shuts down.

use crate::{
    errors::BrokerError,
    pubsub::{CancelError, CloseError},
};
use thiserror::Error;
use tokio::{
    sync::mpsc::{Sender, UnboundedReceiver},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Where close notifications are delivered.
pub type CloseSender = Sender<Box<dyn CloseError>>;

/// Where cancel notifications are delivered.
pub type CancelSender = Sender<Box<dyn CancelError>>;

/// The broker closed the channel or the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct RmqClose {
    pub reason: String,
}

impl CloseError for RmqClose {}

impl From<BrokerError> for RmqClose {
    fn from(err: BrokerError) -> Self {
        RmqClose { reason: err.0 }
    }
}

/// A consumer stopped receiving deliveries while the provider was still open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("consumer `{consumer_tag}` was cancelled")]
pub struct RmqCancel {
    pub consumer_tag: String,
}

impl CancelError for RmqCancel {}

pub(crate) fn close_notification(err: BrokerError) -> Box<dyn CloseError> {
    Box::new(RmqClose::from(err))
}

pub(crate) fn cancel_notification(consumer_tag: String) -> Box<dyn CancelError> {
    Box::new(RmqCancel { consumer_tag })
}

/// Pipes translated native events to `out` until the native source closes, `out`
/// is dropped by the caller or `token` is cancelled. `out` is dropped on return,
/// which closes the caller's channel.
pub(crate) fn spawn_forwarder<N, T>(
    mut native: UnboundedReceiver<N>,
    out: Sender<T>,
    token: CancellationToken,
    translate: fn(N) -> T,
) -> JoinHandle<()>
where
    N: Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = token.cancelled() => break,
                event = native.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            tokio::select! {
                _ = token.cancelled() => break,
                sent = out.send(translate(event)) => {
                    if sent.is_err() {
                        debug!("notification receiver dropped");
                        break;
                    }
                }
            }
        }

        debug!("notification forwarding stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::{sync::mpsc, time::timeout};

    #[tokio::test]
    async fn broker_errors_become_close_notifications() {
        let (native_tx, native_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        spawn_forwarder(native_rx, out_tx, CancellationToken::new(), close_notification);

        native_tx
            .send(BrokerError::from("CONNECTION_FORCED - broker shutdown"))
            .unwrap();

        let notification = out_rx.recv().await.unwrap();
        assert!(notification.is_close());
        assert_eq!(notification.to_string(), "CONNECTION_FORCED - broker shutdown");
    }

    #[tokio::test]
    async fn consumer_tags_become_cancel_notifications() {
        let (native_tx, native_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        spawn_forwarder(native_rx, out_tx, CancellationToken::new(), cancel_notification);

        native_tx.send("ctag-1".to_owned()).unwrap();

        let notification = out_rx.recv().await.unwrap();
        assert!(notification.is_cancel());
        assert_eq!(notification.to_string(), "consumer `ctag-1` was cancelled");
    }

    #[tokio::test]
    async fn caller_channel_closes_with_the_native_source() {
        let (native_tx, native_rx) = mpsc::unbounded_channel::<BrokerError>();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let handle = spawn_forwarder(native_rx, out_tx, CancellationToken::new(), close_notification);

        drop(native_tx);

        let received = timeout(Duration::from_secs(1), out_rx.recv()).await.unwrap();
        assert!(received.is_none());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_forwarding() {
        let (_native_tx, native_rx) = mpsc::unbounded_channel::<BrokerError>();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let token = CancellationToken::new();
        let handle = spawn_forwarder(native_rx, out_tx, token.clone(), close_notification);

        token.cancel();

        timeout(Duration::from_secs(1), handle).await.unwrap().unwrap();
        assert!(out_rx.recv().await.is_none());
    }
}
