//! Domain layer: channel identity, subscriber capability, and the channel
//! registry.
//!
//! Nothing here knows about HTTP or WebSockets. Connections plug in through
//! the [`Subscriber`] trait and are tracked by [`ChannelRegistry`].

pub mod channel_id;
pub mod channel_registry;
pub mod subscriber;

#[cfg(test)]
pub(crate) mod test_support;

pub use channel_id::{ChannelId, ChannelIdError, validate};
pub use channel_registry::{ChannelRegistry, Registration, RegistryStats, Snapshot};
pub use subscriber::{ConnectionState, DeliveryError, StateCell, Subscriber, SubscriberKey};
