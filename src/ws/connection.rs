//! WebSocket connection lifecycle.
//!
//! Runs the maintenance loop for a single subscriber connection: a read
//! loop watching for the peer to go away, a writer loop draining the
//! subscriber's outbound queue, and the external close / server shutdown
//! signals. Whichever finishes first ends the connection.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};

use super::subscriber::WsSubscriber;
use crate::domain::{ChannelId, ChannelRegistry, Subscriber};

/// Upper bound on flushing the close frame to a peer that stopped reading.
const CLOSE_FRAME_TIMEOUT: Duration = Duration::from_secs(1);

/// Why a subscriber connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
    /// Peer sent a close frame or dropped the stream.
    PeerClosed,
    /// Reading from the socket failed.
    ReadFailed,
    /// Writing a frame to the socket failed.
    WriteFailed,
    /// The subscriber was closed from outside, e.g. after a failed delivery.
    Evicted,
    /// The server is shutting down.
    Shutdown,
}

/// Runs a subscriber connection on `channel` until it closes.
///
/// Registers on entry and unregisters exactly once on exit, whatever the
/// reason for closing.
pub async fn run_connection(
    socket: WebSocket,
    channel: ChannelId,
    registry: Arc<ChannelRegistry>,
    queue_capacity: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let (subscriber, mut outbound) = WsSubscriber::new(channel, queue_capacity);
    if !subscriber.open(&registry).await {
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let reason = {
        let read_loop = async {
            while let Some(msg) = ws_rx.next().await {
                match msg {
                    Ok(Message::Close(_)) => return CloseReason::PeerClosed,
                    Ok(Message::Text(_) | Message::Binary(_)) => {
                        tracing::debug!(%channel, "ignoring inbound data frame");
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::debug!(%channel, error = %err, "ws read failed");
                        return CloseReason::ReadFailed;
                    }
                }
            }
            CloseReason::PeerClosed
        };

        let write_loop = write_frames(&mut ws_tx, &mut outbound, channel);

        tokio::select! {
            reason = read_loop => reason,
            reason = write_loop => reason,
            () = subscriber.closed() => CloseReason::Evicted,
            Ok(_) = shutdown.wait_for(|stopping| *stopping) => CloseReason::Shutdown,
        }
    };

    subscriber.close().await;

    if matches!(reason, CloseReason::Evicted | CloseReason::Shutdown) {
        let _ = tokio::time::timeout(CLOSE_FRAME_TIMEOUT, ws_tx.send(Message::Close(None))).await;
    }

    tracing::debug!(%channel, ?reason, "ws connection closed");
}

/// Drains the outbound queue onto the socket, one frame per payload.
async fn write_frames<S>(
    ws_tx: &mut S,
    outbound: &mut mpsc::Receiver<Bytes>,
    channel: ChannelId,
) -> CloseReason
where
    S: Sink<Message> + Unpin,
    <S as Sink<Message>>::Error: std::fmt::Display,
{
    while let Some(payload) = outbound.recv().await {
        if let Err(err) = ws_tx.send(frame_for(payload)).await {
            tracing::warn!(%channel, error = %err, "ws write failed");
            return CloseReason::WriteFailed;
        }
    }
    // The sender lives in the subscriber, which outlives this loop.
    CloseReason::Evicted
}

/// UTF-8 payloads go out as text frames, anything else as binary.
fn frame_for(payload: Bytes) -> Message {
    match String::from_utf8(payload.to_vec()) {
        Ok(text) => Message::text(text),
        Err(_) => Message::Binary(payload),
    }
}
