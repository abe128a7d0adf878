// ABOUTME: Server-Sent Events push channel bound to one session
// ABOUTME: Emits a handshake frame naming the session, then relays result frames with keep-alives
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use super::resources::ServerResources;
use super::session::SessionRegistry;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use futures_util::stream::Stream;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// One frame queued for delivery over a push channel
#[derive(Debug)]
pub struct SseMessage {
    /// SSE event name
    pub event: String,
    /// Event payload, serialized to a single line
    pub data: String,
}

impl SseMessage {
    /// A protocol result frame
    #[must_use]
    pub fn message(data: String) -> Self {
        Self {
            event: "message".to_owned(),
            data,
        }
    }
}

/// Clears the session's channel handle when the event stream is dropped
///
/// The registry compares the channel id, so a superseded stream going away
/// cannot detach its replacement. The session itself survives; it may still
/// receive synchronous traffic.
struct DetachGuard {
    sessions: Arc<SessionRegistry>,
    session_id: String,
    channel_id: u64,
}

impl Drop for DetachGuard {
    fn drop(&mut self) {
        self.sessions
            .detach_channel(&self.session_id, self.channel_id);
    }
}

/// Open a push channel for the session
///
/// Registers a send handle with the session registry (superseding any prior
/// channel), emits a handshake event naming the session identifier, then
/// relays queued frames until the connection closes. Keep-alive comments go
/// out on the configured interval; they append to the stream and never
/// reorder pending frames.
pub fn open_push_channel(
    resources: &Arc<ServerResources>,
    session_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (sender, mut receiver) = mpsc::unbounded_channel::<SseMessage>();
    let channel_id = resources
        .sessions
        .attach_channel(&session_id, sender, Utc::now());

    info!(%session_id, channel_id, "push channel opened");

    let guard = DetachGuard {
        sessions: resources.sessions.clone(),
        session_id: session_id.clone(),
        channel_id,
    };
    let keepalive = resources.config.session.sse_keepalive;

    let stream = async_stream::stream! {
        // Owned by the stream so client disconnects always detach.
        let _guard = guard;

        let mut event_id: u64 = 1;
        let handshake = serde_json::json!({ "sessionId": session_id });
        yield Ok::<_, Infallible>(Event::default()
            .id(event_id.to_string())
            .event("connected")
            .data(handshake.to_string()));

        while let Some(message) = receiver.recv().await {
            event_id += 1;
            yield Ok(Event::default()
                .id(event_id.to_string())
                .event(message.event)
                .data(message.data));
        }

        info!(%session_id, "push channel closed");
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(keepalive)
            .text("keepalive"),
    )
}
