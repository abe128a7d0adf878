// ABOUTME: Shared server resources passed by reference to every handler
// ABOUTME: Stores are constructed once at startup; there is no ambient global state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use crate::backend::ToolBackend;
use crate::config::environment::ServerConfig;
use crate::mcp::session::SessionRegistry;
use crate::oauth2_server::{CredentialStore, GrantStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Container for all shared server dependencies
///
/// Constructed once in the binary and shared behind an `Arc` across the
/// HTTP handlers, the dispatcher, and the background sweep.
pub struct ServerResources {
    /// Environment-derived configuration
    pub config: ServerConfig,
    /// Registered OAuth clients
    pub credentials: Arc<CredentialStore>,
    /// Authorization codes and access tokens
    pub grants: Arc<GrantStore>,
    /// Protocol sessions and push-channel handles
    pub sessions: Arc<SessionRegistry>,
    /// Tool execution backend
    pub backend: Arc<dyn ToolBackend>,
    /// Process start time, reported in the status resource
    pub started_at: DateTime<Utc>,
}

impl ServerResources {
    /// Assemble resources from configuration and a backend implementation
    #[must_use]
    pub fn new(config: ServerConfig, backend: Arc<dyn ToolBackend>) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.session.idle_timeout));
        Self {
            config,
            credentials: Arc::new(CredentialStore::new()),
            grants: Arc::new(GrantStore::new()),
            sessions,
            backend,
            started_at: Utc::now(),
        }
    }
}
