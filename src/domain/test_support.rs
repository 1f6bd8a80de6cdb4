//! In-memory [`Subscriber`] doubles for unit tests.

use std::sync::{Arc, Mutex, OnceLock};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use super::channel_registry::Registration;
use super::subscriber::{ConnectionState, DeliveryError, StateCell, Subscriber};

/// How a [`MockSubscriber`] reacts to `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Records every payload.
    Healthy,
    /// Fails every send as a broken pipe would.
    Broken,
    /// Never completes a send.
    Stalled,
}

/// Records delivered payloads; can be made to fail or hang.
#[derive(Debug)]
pub struct MockSubscriber {
    behavior: Behavior,
    state: StateCell,
    received: Mutex<Vec<Bytes>>,
    registration: OnceLock<Registration>,
}

impl MockSubscriber {
    /// A healthy subscriber already in the `Open` state.
    pub fn open() -> Arc<Self> {
        Self::with_behavior(Behavior::Healthy)
    }

    /// An open subscriber with the given behaviour.
    pub fn with_behavior(behavior: Behavior) -> Arc<Self> {
        let state = StateCell::new();
        state.transition(ConnectionState::Connecting, ConnectionState::Open);
        Arc::new(Self {
            behavior,
            state,
            received: Mutex::new(Vec::new()),
            registration: OnceLock::new(),
        })
    }

    /// Joins `channel` and keeps the membership so closing unregisters.
    pub async fn join(
        self: &Arc<Self>,
        registry: &Arc<super::ChannelRegistry>,
        channel: super::ChannelId,
    ) {
        let membership = Registration::join(registry, channel, self).await;
        let _ = self.registration.set(membership);
    }

    /// Flips straight to `Closed` without unregistering.
    pub fn mark_closed(&self) {
        self.state.begin_close();
        self.state.finish_close();
    }

    /// Payloads delivered so far, in order.
    pub fn received(&self) -> Vec<Bytes> {
        self.received
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn shut(&self) {
        if self.state.begin_close() {
            if let Some(membership) = self.registration.get() {
                membership.release().await;
            }
            self.state.finish_close();
        }
    }
}

impl Subscriber for MockSubscriber {
    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), DeliveryError>> {
        async move {
            if !self.is_open() {
                return Err(DeliveryError::Closed);
            }
            match self.behavior {
                Behavior::Healthy => {
                    if let Ok(mut received) = self.received.lock() {
                        received.push(payload);
                    }
                    Ok(())
                }
                Behavior::Broken => {
                    self.shut().await;
                    Err(DeliveryError::Closed)
                }
                Behavior::Stalled => std::future::pending().await,
            }
        }
        .boxed()
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.shut().boxed()
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }
}
