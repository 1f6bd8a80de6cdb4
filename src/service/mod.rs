//! Service layer: publish orchestration.
//!
//! [`PublishService`] validates channel ids, snapshots the
//! [`super::domain::ChannelRegistry`] and fans payloads out to subscribers.

pub mod publish_service;

pub use publish_service::{PublishReport, PublishService};
