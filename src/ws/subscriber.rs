//! WebSocket-backed [`Subscriber`].
//!
//! A [`WsSubscriber`] never touches the socket itself. `send` pushes onto a
//! bounded queue that the connection's single writer loop drains, which keeps
//! per-subscriber order and lets the publisher return without waiting on the
//! peer.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Notify, mpsc};

use crate::domain::{
    ChannelId, ChannelRegistry, ConnectionState, DeliveryError, Registration, StateCell, Subscriber,
};

/// Subscriber handle for one upgraded WebSocket connection.
#[derive(Debug)]
pub struct WsSubscriber {
    channel: ChannelId,
    outbound: mpsc::Sender<Bytes>,
    state: StateCell,
    membership: OnceLock<Registration>,
    closed: Notify,
}

impl WsSubscriber {
    /// Creates a subscriber in `Connecting` state plus the receiving end of
    /// its outbound queue, which the writer loop owns.
    #[must_use]
    pub fn new(channel: ChannelId, queue_capacity: usize) -> (Arc<Self>, mpsc::Receiver<Bytes>) {
        let (outbound, rx) = mpsc::channel(queue_capacity.max(1));
        let subscriber = Arc::new(Self {
            channel,
            outbound,
            state: StateCell::new(),
            membership: OnceLock::new(),
            closed: Notify::new(),
        });
        (subscriber, rx)
    }

    /// Channel this subscriber listens on.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Registers on the channel and moves to `Open`.
    ///
    /// Returns `false` if the subscriber was closed while registering; the
    /// membership is released again in that case.
    pub async fn open(self: &Arc<Self>, registry: &Arc<ChannelRegistry>) -> bool {
        let membership = Registration::join(registry, self.channel, self).await;
        let membership = self.membership.get_or_init(|| membership);

        if self
            .state
            .transition(ConnectionState::Connecting, ConnectionState::Open)
        {
            tracing::debug!(channel = %self.channel, subscriber = %membership.key(), "subscriber open");
            true
        } else {
            membership.release().await;
            false
        }
    }

    /// Resolves once the subscriber has been closed from outside the
    /// connection task, e.g. after a failed delivery.
    pub async fn closed(&self) {
        self.closed.notified().await;
    }

    async fn shutdown(&self) {
        if !self.state.begin_close() {
            return;
        }
        if let Some(membership) = self.membership.get() {
            membership.release().await;
        }
        self.state.finish_close();
        self.closed.notify_one();
    }
}

impl Subscriber for WsSubscriber {
    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), DeliveryError>> {
        async move {
            if !self.is_open() {
                return Err(DeliveryError::Closed);
            }
            if self.outbound.send(payload).await.is_err() {
                // Writer loop is gone.
                self.shutdown().await;
                return Err(DeliveryError::Closed);
            }
            Ok(())
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.shutdown().boxed()
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }
}
