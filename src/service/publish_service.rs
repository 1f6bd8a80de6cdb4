//! Publish service: validates a channel and fans a payload out to it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::join_all;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChannelId, ChannelRegistry, DeliveryError, Subscriber, SubscriberKey};
use crate::error::RelayError;

/// Outcome of an accepted publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct PublishReport {
    /// Channel the payload was published on.
    #[schema(value_type = String, format = Uuid)]
    pub channel: ChannelId,
    /// Subscribers whose outbound path accepted the payload.
    pub delivered: usize,
    /// Subscribers that failed and were dropped from the channel.
    pub failed: usize,
}

/// Stateless coordinator between publishers and the [`ChannelRegistry`].
///
/// Every publish follows the same pattern: validate the channel id →
/// snapshot the registry → dispatch to every snapshot member concurrently,
/// each bounded by the send timeout → report.
#[derive(Debug, Clone)]
pub struct PublishService {
    registry: Arc<ChannelRegistry>,
    send_timeout: Duration,
}

impl PublishService {
    /// Creates a new `PublishService`.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, send_timeout: Duration) -> Self {
        Self {
            registry,
            send_timeout,
        }
    }

    /// Returns a reference to the inner [`ChannelRegistry`].
    #[must_use]
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Publishes `payload` to the channel named by the path segment.
    ///
    /// # Errors
    ///
    /// - [`RelayError::InvalidChannel`] if `segment` is not a channel id;
    ///   the registry is not consulted.
    /// - [`RelayError::NoSubscribers`] if the channel has no open
    ///   subscribers; nothing is delivered.
    pub async fn publish(&self, segment: &str, payload: Bytes) -> Result<PublishReport, RelayError> {
        let channel = ChannelId::parse(segment)?;
        self.publish_to(channel, payload).await
    }

    /// Publishes `payload` to an already validated channel.
    ///
    /// Returns once dispatch to every subscriber in the snapshot has been
    /// attempted. A failing or slow subscriber is closed and counted in
    /// [`PublishReport::failed`]; it never fails the publish.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NoSubscribers`] if the channel has no open
    /// subscribers.
    pub async fn publish_to(
        &self,
        channel: ChannelId,
        payload: Bytes,
    ) -> Result<PublishReport, RelayError> {
        let snapshot = self.registry.snapshot(&channel).await;
        if snapshot.is_empty() {
            tracing::debug!(%channel, "publish to channel without subscribers");
            return Err(RelayError::NoSubscribers(channel));
        }

        tracing::debug!(%channel, bytes = payload.len(), subscribers = snapshot.len(), "dispatching message");

        let outcomes = join_all(
            snapshot
                .iter()
                .map(|(key, subscriber)| self.deliver(channel, *key, subscriber.as_ref(), payload.clone())),
        )
        .await;

        let delivered = outcomes.iter().filter(|ok| **ok).count();
        let report = PublishReport {
            channel,
            delivered,
            failed: outcomes.len().saturating_sub(delivered),
        };

        tracing::info!(
            %channel,
            delivered = report.delivered,
            failed = report.failed,
            "message published"
        );
        Ok(report)
    }

    /// Sends to one subscriber, containing any failure to it.
    async fn deliver(
        &self,
        channel: ChannelId,
        key: SubscriberKey,
        subscriber: &dyn Subscriber,
        payload: Bytes,
    ) -> bool {
        let result = match tokio::time::timeout(self.send_timeout, subscriber.send(payload)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut),
        };

        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%channel, subscriber = %key, error = %err, "delivery failed, dropping subscriber");
                subscriber.close().await;
                false
            }
        }
    }
}
