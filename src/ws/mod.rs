//! WebSocket layer: subscriber connections.
//!
//! An upgrade request on `/{channel_id}/` becomes a [`WsSubscriber`]
//! registered on that channel. The server pushes every payload published to
//! the channel as one frame, in publish order, until the peer closes, a
//! delivery fails, or the server shuts down.

pub mod connection;
pub mod handler;
pub mod subscriber;

pub use subscriber::WsSubscriber;
