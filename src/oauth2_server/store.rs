// ABOUTME: In-memory keyed stores for OAuth clients, authorization codes, and access tokens
// ABOUTME: Backed by DashMap so code consumption is an atomic remove-if-present
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Credential and grant storage
//!
//! All state here is intentionally volatile: records live for the process
//! lifetime at most. `take_code` is the single consumption point for
//! authorization codes; the per-key locking of the underlying map guarantees
//! that two concurrent exchanges of the same code observe exactly one
//! successful removal.

use super::models::{AccessToken, AuthorizationCode, OAuth2Client};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

/// Registered-client records keyed by client identifier
///
/// Clients are immutable once created and never deleted.
#[derive(Default)]
pub struct CredentialStore {
    clients: DashMap<String, OAuth2Client>,
}

impl CredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly registered client
    pub fn insert(&self, client: OAuth2Client) {
        debug!(client_id = %client.client_id, auto = client.auto_registered, "storing OAuth client");
        self.clients.insert(client.client_id.clone(), client);
    }

    /// Look up a client by identifier
    #[must_use]
    pub fn lookup(&self, client_id: &str) -> Option<OAuth2Client> {
        self.clients.get(client_id).map(|entry| entry.clone())
    }

    /// Number of registered clients
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no clients are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

/// Authorization codes and access tokens, each a keyed expiring record
#[derive(Default)]
pub struct GrantStore {
    codes: DashMap<String, AuthorizationCode>,
    tokens: DashMap<String, AccessToken>,
}

impl GrantStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly issued authorization code
    pub fn insert_code(&self, code: AuthorizationCode) {
        self.codes.insert(code.code.clone(), code);
    }

    /// Read a code without consuming it
    #[must_use]
    pub fn peek_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.get(code).map(|entry| entry.clone())
    }

    /// Atomically consume a code
    ///
    /// Returns `None` when the code is absent, including when a concurrent
    /// exchange removed it first. Callers validate expiry and client
    /// ownership before calling this; the removal is the final arbiter of
    /// the single-use invariant.
    #[must_use]
    pub fn take_code(&self, code: &str) -> Option<AuthorizationCode> {
        self.codes.remove(code).map(|(_, grant)| grant)
    }

    /// Store a minted access token
    pub fn insert_token(&self, token: AccessToken) {
        self.tokens.insert(token.token.clone(), token);
    }

    /// Look up a token, checking expiry lazily
    ///
    /// Expired tokens are reported as absent but left in place; the periodic
    /// sweep reclaims them.
    #[must_use]
    pub fn validate_token(&self, token: &str, now: DateTime<Utc>) -> Option<AccessToken> {
        self.tokens
            .get(token)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.clone())
    }

    /// Drop expired codes and tokens
    ///
    /// Observably equivalent to lazy-only expiry; it just bounds memory.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> (usize, usize) {
        let codes_before = self.codes.len();
        let tokens_before = self.tokens.len();
        self.codes.retain(|_, code| !code.is_expired(now));
        self.tokens.retain(|_, token| !token.is_expired(now));
        let evicted = (
            codes_before.saturating_sub(self.codes.len()),
            tokens_before.saturating_sub(self.tokens.len()),
        );
        if evicted != (0, 0) {
            debug!(codes = evicted.0, tokens = evicted.1, "swept expired grants");
        }
        evicted
    }

    /// Number of live (stored, possibly expired) codes
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.codes.len()
    }

    /// Number of live (stored, possibly expired) tokens
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}
