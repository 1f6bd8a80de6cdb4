//! Concurrent channel → subscriber-set registry.
//!
//! [`ChannelRegistry`] maps each [`ChannelId`] to a [`Slab`] arena of weak
//! subscriber links. The arena gives every subscriber a stable
//! [`SubscriberKey`] and constant-time removal under connection churn. The
//! registry never owns a subscriber: the connection task holds the only
//! strong reference, so a dropped connection simply stops upgrading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use slab::Slab;
use tokio::sync::RwLock;

use super::subscriber::{Subscriber, SubscriberKey};
use super::ChannelId;

/// Arena slot: weak link plus the registry-wide id that owns the slot.
#[derive(Debug)]
struct Slot {
    id: u64,
    subscriber: Weak<dyn Subscriber>,
}

/// Point-in-time copy of a channel's live subscribers.
pub type Snapshot = Vec<(SubscriberKey, Arc<dyn Subscriber>)>;

/// Registry-wide counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RegistryStats {
    /// Channels with at least one registered subscriber.
    pub channels: usize,
    /// Registered subscribers across all channels.
    pub listeners: usize,
}

/// Central store of live subscriptions.
///
/// # Concurrency
///
/// - `register` / `unregister` take the write lock for a single map update.
/// - `snapshot` takes the read lock, copies strong references out and
///   releases it before any delivery I/O happens.
/// - Empty channels are dropped on the last `unregister`.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<ChannelId, Slab<Slot>>>,
    next_id: AtomicU64,
}

impl ChannelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Inserts `subscriber` into the set for `channel`, creating the channel
    /// if this is its first subscriber.
    pub async fn register<S>(&self, channel: ChannelId, subscriber: &Arc<S>) -> SubscriberKey
    where
        S: Subscriber + 'static,
    {
        let weak: Weak<S> = Arc::downgrade(subscriber);
        let weak: Weak<dyn Subscriber> = weak;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut map = self.channels.write().await;
        let arena = map.entry(channel).or_insert_with(|| {
            tracing::info!(%channel, "channel created");
            Slab::new()
        });
        let slot = arena.insert(Slot {
            id,
            subscriber: weak,
        });
        tracing::debug!(%channel, subscriber = id, listeners = arena.len(), "subscriber registered");

        SubscriberKey { slot, id }
    }

    /// Removes the subscriber identified by `key` from `channel`.
    ///
    /// Idempotent: returns `false` if it was already gone. Drops the channel
    /// entry once its arena is empty.
    pub async fn unregister(&self, channel: &ChannelId, key: SubscriberKey) -> bool {
        let mut map = self.channels.write().await;
        let Some(arena) = map.get_mut(channel) else {
            return false;
        };

        let owned = arena.get(key.slot).is_some_and(|slot| slot.id == key.id);
        if !owned {
            return false;
        }
        arena.remove(key.slot);
        tracing::debug!(%channel, subscriber = key.id, listeners = arena.len(), "subscriber unregistered");

        if arena.is_empty() {
            map.remove(channel);
            tracing::info!(%channel, "channel removed");
        }
        true
    }

    /// Returns the open subscribers of `channel` at this instant.
    ///
    /// The result is a copy; later registrations or removals do not affect
    /// it. Links whose connection has already been dropped are skipped.
    pub async fn snapshot(&self, channel: &ChannelId) -> Snapshot {
        let map = self.channels.read().await;
        let Some(arena) = map.get(channel) else {
            return Vec::new();
        };

        arena
            .iter()
            .filter_map(|(slot, entry)| {
                let subscriber = entry.subscriber.upgrade()?;
                subscriber.is_open().then_some((
                    SubscriberKey {
                        slot,
                        id: entry.id,
                    },
                    subscriber,
                ))
            })
            .collect()
    }

    /// Number of registered subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &ChannelId) -> usize {
        self.channels
            .read()
            .await
            .get(channel)
            .map_or(0, Slab::len)
    }

    /// Number of channels with at least one registered subscriber.
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Channel and listener totals.
    pub async fn stats(&self) -> RegistryStats {
        let map = self.channels.read().await;
        RegistryStats {
            channels: map.len(),
            listeners: map.values().map(Slab::len).sum(),
        }
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber's membership in one channel.
///
/// Held by the subscriber itself; [`Registration::release`] unregisters at
/// most once no matter how many close paths race to call it.
#[derive(Debug)]
pub struct Registration {
    registry: Arc<ChannelRegistry>,
    channel: ChannelId,
    key: SubscriberKey,
    released: AtomicBool,
}

impl Registration {
    /// Registers `subscriber` on `channel` and returns the membership.
    pub async fn join<S>(registry: &Arc<ChannelRegistry>, channel: ChannelId, subscriber: &Arc<S>) -> Self
    where
        S: Subscriber + 'static,
    {
        let key = registry.register(channel, subscriber).await;
        Self {
            registry: Arc::clone(registry),
            channel,
            key,
            released: AtomicBool::new(false),
        }
    }

    /// Channel this membership belongs to.
    #[must_use]
    pub const fn channel(&self) -> ChannelId {
        self.channel
    }

    /// Arena key of this membership.
    #[must_use]
    pub const fn key(&self) -> SubscriberKey {
        self.key
    }

    /// Unregisters from the channel. Only the first call has an effect.
    pub async fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.registry.unregister(&self.channel, self.key).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::test_support::MockSubscriber;

    #[tokio::test]
    async fn register_creates_channel() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let sub = MockSubscriber::open();

        assert_eq!(registry.channel_count().await, 0);
        let _key = registry.register(channel, &sub).await;
        assert_eq!(registry.channel_count().await, 1);
        assert_eq!(registry.subscriber_count(&channel).await, 1);
    }

    #[tokio::test]
    async fn unregister_last_drops_channel() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let sub = MockSubscriber::open();

        let key = registry.register(channel, &sub).await;
        assert!(registry.unregister(&channel, key).await);
        assert_eq!(registry.channel_count().await, 0);
        assert!(registry.snapshot(&channel).await.is_empty());
    }

    #[tokio::test]
    async fn unregister_is_idempotent() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let sub = MockSubscriber::open();

        let key = registry.register(channel, &sub).await;
        assert!(registry.unregister(&channel, key).await);
        assert!(!registry.unregister(&channel, key).await);
        assert!(!registry.unregister(&ChannelId::new(), key).await);
    }

    #[tokio::test]
    async fn stale_key_does_not_remove_slot_reuser() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let keep = MockSubscriber::open();
        let first = MockSubscriber::open();
        let second = MockSubscriber::open();

        let _keep_key = registry.register(channel, &keep).await;
        let stale = registry.register(channel, &first).await;
        assert!(registry.unregister(&channel, stale).await);

        let fresh = registry.register(channel, &second).await;
        assert_eq!(fresh.slot, stale.slot);
        assert_ne!(fresh.id, stale.id);

        assert!(!registry.unregister(&channel, stale).await);
        assert_eq!(registry.subscriber_count(&channel).await, 2);
    }

    #[tokio::test]
    async fn snapshot_is_a_copy() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let a = MockSubscriber::open();
        let b = MockSubscriber::open();

        let key_a = registry.register(channel, &a).await;
        let _key_b = registry.register(channel, &b).await;

        let snapshot = registry.snapshot(&channel).await;
        assert_eq!(snapshot.len(), 2);

        registry.unregister(&channel, key_a).await;
        let late = MockSubscriber::open();
        let _late_key = registry.register(channel, &late).await;

        assert_eq!(snapshot.len(), 2);
        assert_eq!(registry.snapshot(&channel).await.len(), 2);
    }

    #[tokio::test]
    async fn snapshot_skips_dropped_and_closed() {
        let registry = ChannelRegistry::new();
        let channel = ChannelId::new();
        let live = MockSubscriber::open();
        let dropped = MockSubscriber::open();
        let closed = MockSubscriber::open();

        let _ = registry.register(channel, &live).await;
        let _ = registry.register(channel, &dropped).await;
        let _ = registry.register(channel, &closed).await;

        drop(dropped);
        closed.mark_closed();

        let snapshot = registry.snapshot(&channel).await;
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_of_unknown_channel_is_empty() {
        let registry = ChannelRegistry::new();
        assert!(registry.snapshot(&ChannelId::new()).await.is_empty());
    }

    #[tokio::test]
    async fn channels_are_isolated() {
        let registry = ChannelRegistry::new();
        let one = ChannelId::new();
        let two = ChannelId::new();
        let sub = MockSubscriber::open();

        let _ = registry.register(one, &sub).await;
        assert_eq!(registry.snapshot(&one).await.len(), 1);
        assert!(registry.snapshot(&two).await.is_empty());
    }

    #[tokio::test]
    async fn stats_count_channels_and_listeners() {
        let registry = ChannelRegistry::new();
        let one = ChannelId::new();
        let two = ChannelId::new();
        let subs: Vec<_> = (0..3).map(|_| MockSubscriber::open()).collect();

        for sub in subs.iter().take(2) {
            let _ = registry.register(one, sub).await;
        }
        let Some(last) = subs.last() else {
            panic!("three subscribers");
        };
        let _ = registry.register(two, last).await;

        assert_eq!(
            registry.stats().await,
            RegistryStats {
                channels: 2,
                listeners: 3
            }
        );
    }

    #[tokio::test]
    async fn concurrent_register_and_unregister() {
        let registry = Arc::new(ChannelRegistry::new());
        let channel = ChannelId::new();

        let mut tasks = Vec::new();
        for _ in 0..64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let sub = MockSubscriber::open();
                let key = registry.register(channel, &sub).await;
                tokio::task::yield_now().await;
                registry.unregister(&channel, key).await
            }));
        }
        for task in tasks {
            let Ok(removed) = task.await else {
                panic!("task panicked");
            };
            assert!(removed);
        }

        assert_eq!(registry.channel_count().await, 0);
    }

    #[tokio::test]
    async fn registration_releases_once() {
        let registry = Arc::new(ChannelRegistry::new());
        let channel = ChannelId::new();
        let sub = MockSubscriber::open();

        let membership = Registration::join(&registry, channel, &sub).await;
        assert_eq!(membership.channel(), channel);
        assert_eq!(registry.subscriber_count(&channel).await, 1);

        assert!(membership.release().await);
        assert!(!membership.release().await);
        assert_eq!(registry.channel_count().await, 0);
    }
}
