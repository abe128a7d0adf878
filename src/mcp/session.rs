// ABOUTME: Session registry keying protocol traffic: activity tracking and push-channel handles
// ABOUTME: Periodic sweep evicts idle sessions; at most one live push channel per session
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Session registry
//!
//! A session is the correlation key binding a client's synchronous and push
//! channels. The registry owns the session records and holds only a
//! send-capable handle to the push channel; the channel's real lifetime is
//! governed by the underlying connection. Handles carry a channel id so a
//! disconnecting superseded stream cannot detach its successor.

use super::sse_transport::SseMessage;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Send-capable handle to a session's live push channel
#[derive(Debug, Clone)]
struct PushChannelHandle {
    channel_id: u64,
    sender: mpsc::UnboundedSender<SseMessage>,
}

/// One session record
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque session identifier
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Last protocol activity; the sweep evicts on this
    pub last_activity: DateTime<Utc>,
    /// Whether the client completed the initialize handshake
    pub initialized: bool,
    channel: Option<PushChannelHandle>,
}

/// Session identifier → session record, plus the eviction sweep
pub struct SessionRegistry {
    sessions: DashMap<String, Session>,
    idle_timeout: Duration,
    next_channel_id: AtomicU64,
}

impl SessionRegistry {
    /// Create a registry with the given idle timeout
    #[must_use]
    pub fn new(idle_timeout: std::time::Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout: Duration::seconds(idle_timeout.as_secs() as i64),
            next_channel_id: AtomicU64::new(1),
        }
    }

    /// Resolve the session named by the request header, or allocate a new one
    ///
    /// A header naming an unknown (or already evicted) session gets a fresh
    /// opaque identifier rather than adopting the stale one. Returns the
    /// session id and whether it was newly created.
    pub fn resolve(&self, header: Option<&str>, now: DateTime<Utc>) -> (String, bool) {
        if let Some(candidate) = header {
            if let Some(mut session) = self.sessions.get_mut(candidate) {
                session.last_activity = now;
                return (candidate.to_owned(), false);
            }
        }

        let id = format!("session_{}", Uuid::new_v4());
        self.sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                created_at: now,
                last_activity: now,
                initialized: false,
                channel: None,
            },
        );
        debug!(session_id = %id, "created session");
        (id, true)
    }

    /// Update last-activity for a session
    pub fn touch(&self, session_id: &str, now: DateTime<Utc>) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.last_activity = now;
        }
    }

    /// Record that the client completed the initialize handshake
    pub fn mark_initialized(&self, session_id: &str) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            session.initialized = true;
        }
    }

    /// Whether a session exists and has completed initialization
    #[must_use]
    pub fn is_initialized(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|session| session.initialized)
    }

    /// Attach a push channel to a session, superseding any prior one
    ///
    /// Returns the channel id the caller must present to `detach_channel`.
    /// The session record is recreated if the sweep evicted it between
    /// resolution and attachment.
    pub fn attach_channel(
        &self,
        session_id: &str,
        sender: mpsc::UnboundedSender<SseMessage>,
        now: DateTime<Utc>,
    ) -> u64 {
        let channel_id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        let handle = PushChannelHandle { channel_id, sender };

        self.sessions
            .entry(session_id.to_owned())
            .and_modify(|session| {
                session.channel = Some(handle.clone());
                session.last_activity = now;
            })
            .or_insert_with(|| Session {
                id: session_id.to_owned(),
                created_at: now,
                last_activity: now,
                initialized: false,
                channel: Some(handle),
            });

        debug!(%session_id, channel_id, "attached push channel");
        channel_id
    }

    /// Clear a session's push-channel handle without deleting the session
    ///
    /// No-op when the session has since attached a newer channel: the
    /// channel id must match the one returned from `attach_channel`.
    pub fn detach_channel(&self, session_id: &str, channel_id: u64) {
        if let Some(mut session) = self.sessions.get_mut(session_id) {
            if session
                .channel
                .as_ref()
                .is_some_and(|handle| handle.channel_id == channel_id)
            {
                session.channel = None;
                debug!(%session_id, channel_id, "detached push channel");
            }
        }
    }

    /// Whether the session currently has a live push channel
    #[must_use]
    pub fn has_live_channel(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|session| session.channel.is_some())
    }

    /// Deliver a message over the session's push channel
    ///
    /// Returns `false` when no live channel exists. A send failure means the
    /// receiving stream is gone; the stale handle is cleared so the caller
    /// falls back to the synchronous reply.
    pub fn push_to_session(&self, session_id: &str, message: SseMessage) -> bool {
        let Some(mut session) = self.sessions.get_mut(session_id) else {
            return false;
        };
        let Some(handle) = &session.channel else {
            return false;
        };

        if handle.sender.send(message).is_ok() {
            true
        } else {
            debug!(%session_id, "push channel receiver gone, clearing handle");
            session.channel = None;
            false
        }
    }

    /// Evict every session idle longer than the configured timeout
    ///
    /// Dropping the record also drops the push-channel sender, which ends
    /// the associated event stream.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.idle_timeout;
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.last_activity >= cutoff);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            info!(evicted, remaining = self.sessions.len(), "swept idle sessions");
        }
        evicted
    }

    /// Number of live sessions
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SessionRegistry {
        SessionRegistry::new(std::time::Duration::from_secs(30 * 60))
    }

    #[test]
    fn resolve_allocates_and_then_reuses() {
        let registry = registry();
        let now = Utc::now();

        let (id, created) = registry.resolve(None, now);
        assert!(created);

        let (same, created_again) = registry.resolve(Some(&id), now);
        assert_eq!(same, id);
        assert!(!created_again);
    }

    #[test]
    fn unknown_header_gets_a_fresh_identifier() {
        let registry = registry();
        let (id, created) = registry.resolve(Some("session_bogus"), Utc::now());
        assert!(created);
        assert_ne!(id, "session_bogus");
    }

    #[test]
    fn sweep_evicts_only_idle_sessions() {
        let registry = registry();
        let now = Utc::now();

        let (idle, _) = registry.resolve(None, now - Duration::minutes(31));
        let (active, _) = registry.resolve(None, now - Duration::minutes(5));

        assert_eq!(registry.sweep(now), 1);
        assert!(registry.resolve(Some(&active), now).0 == active);
        let (reissued, created) = registry.resolve(Some(&idle), now);
        assert!(created);
        assert_ne!(reissued, idle);
    }

    #[test]
    fn touch_defers_eviction() {
        let registry = registry();
        let now = Utc::now();
        let (id, _) = registry.resolve(None, now - Duration::minutes(31));

        registry.touch(&id, now);
        assert_eq!(registry.sweep(now), 0);
    }

    #[test]
    fn new_channel_supersedes_and_old_detach_is_a_noop() {
        let registry = registry();
        let now = Utc::now();
        let (id, _) = registry.resolve(None, now);

        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let old_channel = registry.attach_channel(&id, old_tx, now);

        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        let new_channel = registry.attach_channel(&id, new_tx, now);
        assert_ne!(old_channel, new_channel);

        // Superseded stream disconnecting must not clear the new handle.
        registry.detach_channel(&id, old_channel);
        assert!(registry.has_live_channel(&id));

        assert!(registry.push_to_session(
            &id,
            SseMessage {
                event: "message".to_owned(),
                data: "{}".to_owned(),
            }
        ));
        assert!(new_rx.try_recv().is_ok());
        assert!(old_rx.try_recv().is_err());

        registry.detach_channel(&id, new_channel);
        assert!(!registry.has_live_channel(&id));
    }

    #[test]
    fn push_to_dropped_receiver_clears_the_handle() {
        let registry = registry();
        let now = Utc::now();
        let (id, _) = registry.resolve(None, now);

        let (tx, rx) = mpsc::unbounded_channel();
        registry.attach_channel(&id, tx, now);
        drop(rx);

        assert!(!registry.push_to_session(
            &id,
            SseMessage {
                event: "message".to_owned(),
                data: "{}".to_owned(),
            }
        ));
        assert!(!registry.has_live_channel(&id));
    }

    #[test]
    fn detach_leaves_the_session_alive() {
        let registry = registry();
        let now = Utc::now();
        let (id, _) = registry.resolve(None, now);

        let (tx, _rx) = mpsc::unbounded_channel();
        let channel = registry.attach_channel(&id, tx, now);
        registry.detach_channel(&id, channel);

        let (same, created) = registry.resolve(Some(&id), now);
        assert_eq!(same, id);
        assert!(!created);
    }
}
