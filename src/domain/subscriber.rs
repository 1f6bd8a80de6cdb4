//! Subscriber capability shared by every connection implementation.
//!
//! The registry and the publish path only ever see `dyn Subscriber`; the
//! WebSocket connection in [`crate::ws`] is one implementation, test doubles
//! are another.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use bytes::Bytes;
use futures_util::future::BoxFuture;

/// Why a delivery to a single subscriber failed.
///
/// Always contained to that subscriber; a publish never fails because of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The connection is closing or already closed.
    #[error("subscriber connection closed")]
    Closed,

    /// The outbound path did not accept the payload within the send timeout.
    #[error("subscriber send timed out")]
    TimedOut,
}

/// One live streaming connection able to receive published payloads.
pub trait Subscriber: Send + Sync + fmt::Debug {
    /// Hands `payload` to this subscriber's outbound path.
    ///
    /// Calls made on the same subscriber reach the peer in the order they
    /// were issued. On failure the implementation closes itself and leaves
    /// its channel before returning.
    fn send(&self, payload: Bytes) -> BoxFuture<'_, Result<(), DeliveryError>>;

    /// Closes the connection and leaves its channel. Safe to call from any
    /// number of paths; only the first has an effect.
    fn close(&self) -> BoxFuture<'_, ()>;

    /// Returns the current lifecycle state.
    fn state(&self) -> ConnectionState;

    /// Returns `true` while the subscriber accepts deliveries.
    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

/// Stable handle for a subscriber inside its channel's arena.
///
/// `slot` is the arena index (reused after removal); `id` is unique for the
/// lifetime of the registry, so a stale key can never remove a newer
/// subscriber that landed in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberKey {
    pub(crate) slot: usize,
    pub(crate) id: u64,
}

impl SubscriberKey {
    /// Registry-wide unique subscriber number.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for SubscriberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// Lifecycle of a subscriber connection.
///
/// `Connecting → Open → Closing → Closed`; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    /// Upgrade accepted, not yet registered.
    Connecting = 0,
    /// Registered and accepting deliveries.
    Open = 1,
    /// Shutdown started; no new deliveries accepted.
    Closing = 2,
    /// Unregistered; terminal.
    Closed = 3,
}

impl ConnectionState {
    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Lock-free, forward-only [`ConnectionState`] cell.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Creates a cell in [`ConnectionState::Connecting`].
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Connecting as u8))
    }

    /// Reads the current state.
    #[must_use]
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`. Returns `false` if the cell was not in
    /// `from`, so exactly one caller wins each transition.
    pub fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Moves to `Closing` from any earlier state. Returns `true` only for the
    /// caller that performed the move.
    pub fn begin_close(&self) -> bool {
        self.transition(ConnectionState::Open, ConnectionState::Closing)
            || self.transition(ConnectionState::Connecting, ConnectionState::Closing)
    }

    /// Marks the terminal state.
    pub fn finish_close(&self) {
        self.0.store(ConnectionState::Closed as u8, Ordering::Release);
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_connecting() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), ConnectionState::Connecting);
    }

    #[test]
    fn open_then_close() {
        let cell = StateCell::new();
        assert!(cell.transition(ConnectionState::Connecting, ConnectionState::Open));
        assert_eq!(cell.get(), ConnectionState::Open);

        assert!(cell.begin_close());
        assert_eq!(cell.get(), ConnectionState::Closing);
        cell.finish_close();
        assert_eq!(cell.get(), ConnectionState::Closed);
    }

    #[test]
    fn begin_close_wins_once() {
        let cell = StateCell::new();
        assert!(cell.transition(ConnectionState::Connecting, ConnectionState::Open));
        assert!(cell.begin_close());
        assert!(!cell.begin_close());
        cell.finish_close();
        assert!(!cell.begin_close());
    }

    #[test]
    fn close_before_open() {
        let cell = StateCell::new();
        assert!(cell.begin_close());
        assert!(!cell.transition(ConnectionState::Connecting, ConnectionState::Open));
    }

    #[test]
    fn states_are_ordered() {
        assert!(ConnectionState::Connecting < ConnectionState::Open);
        assert!(ConnectionState::Open < ConnectionState::Closing);
        assert!(ConnectionState::Closing < ConnectionState::Closed);
    }
}
