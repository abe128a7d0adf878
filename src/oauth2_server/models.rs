// ABOUTME: OAuth 2.0 data models for client registration, grants, and token exchange
// ABOUTME: Implements RFC 7591-style registration and OAuth 2.0 request/response structures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered OAuth 2.0 client
///
/// Records are immutable after creation and live for the process lifetime.
#[derive(Debug, Clone)]
pub struct OAuth2Client {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret, generated at registration
    pub client_secret: String,
    /// Redirect URIs registered for this client
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<String>,
    /// Response types allowed for this client
    pub response_types: Vec<String>,
    /// Space-separated scope string
    pub scope: String,
    /// When the client was registered
    pub created_at: DateTime<Utc>,
    /// Whether the record was created implicitly at the authorization
    /// endpoint rather than via `/register`. Auto-registered clients carry a
    /// placeholder secret the real client never saw, so secret verification
    /// is relaxed for them.
    pub auto_registered: bool,
}

/// Single-use authorization code awaiting exchange
#[derive(Debug, Clone)]
pub struct AuthorizationCode {
    /// The code value
    pub code: String,
    /// Client the code was issued to
    pub client_id: String,
    /// Redirect URI the code is bound to
    pub redirect_uri: String,
    /// Scope carried into the minted token
    pub scope: String,
    /// When the code was issued
    pub created_at: DateTime<Utc>,
    /// Hard expiry; an expired code is indistinguishable from an absent one
    pub expires_at: DateTime<Utc>,
}

impl AuthorizationCode {
    /// Whether the code is past its expiry deadline
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Bearer access token minted by the token endpoint
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The token value
    pub token: String,
    /// Client the token belongs to
    pub client_id: String,
    /// Space-separated granted scopes
    pub scope: String,
    /// When the token was minted
    pub created_at: DateTime<Utc>,
    /// Expiry, checked lazily on lookup
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Whether the token is past its expiry deadline
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// OAuth 2.0 Client Registration Request (RFC 7591)
#[derive(Debug, Default, Deserialize)]
pub struct ClientRegistrationRequest {
    /// Redirect URIs for the authorization code flow
    pub redirect_uris: Option<Vec<String>>,
    /// Optional client name for display
    pub client_name: Option<String>,
    /// Grant types the client can use
    pub grant_types: Option<Vec<String>>,
    /// Response types the client can use
    pub response_types: Option<Vec<String>>,
    /// Scopes the client can request
    pub scope: Option<String>,
}

/// OAuth 2.0 Client Registration Response (RFC 7591)
#[derive(Debug, Serialize)]
pub struct ClientRegistrationResponse {
    /// Unique client identifier
    pub client_id: String,
    /// Client secret for authentication
    pub client_secret: String,
    /// Redirect URIs registered for this client
    pub redirect_uris: Vec<String>,
    /// Grant types allowed for this client
    pub grant_types: Vec<String>,
    /// Response types allowed for this client
    pub response_types: Vec<String>,
    /// Scopes this client can request
    pub scope: String,
}

/// Parsed authorization request (GET /authorize query parameters)
#[derive(Debug, Clone)]
pub struct AuthorizeParams {
    /// Client identifier
    pub client_id: String,
    /// Redirect URI for the response; falls back to the client's first
    /// registered URI when absent
    pub redirect_uri: Option<String>,
    /// Opaque state passed through to the redirect unchanged
    pub state: Option<String>,
    /// Requested scope
    pub scope: Option<String>,
}

/// Successful authorization outcome
#[derive(Debug)]
pub struct AuthorizeGrant {
    /// Redirect target the code is delivered to
    pub redirect_uri: String,
    /// The issued authorization code
    pub code: String,
    /// State parameter echoed back verbatim when present
    pub state: Option<String>,
}

impl AuthorizeGrant {
    /// Build the final redirect URL carrying `code` and optional `state`
    #[must_use]
    pub fn redirect_location(&self) -> String {
        let mut location = format!(
            "{}?code={}",
            self.redirect_uri,
            urlencoding::encode(&self.code)
        );
        if let Some(state) = &self.state {
            use std::fmt::Write;
            write!(&mut location, "&state={}", urlencoding::encode(state)).ok();
        }
        location
    }
}

/// OAuth 2.0 Token Request (form-encoded POST /token body)
#[derive(Debug, Default, Deserialize)]
pub struct TokenRequest {
    /// Grant type; only `authorization_code` is supported
    #[serde(default)]
    pub grant_type: String,
    /// Authorization code being exchanged
    pub code: Option<String>,
    /// Client ID
    #[serde(default)]
    pub client_id: String,
    /// Client secret
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI (must match the code's binding when supplied)
    pub redirect_uri: Option<String>,
}

/// OAuth 2.0 Token Response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    /// Opaque bearer access token
    pub access_token: String,
    /// Token type (always "Bearer")
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    /// Scopes granted
    pub scope: String,
}

/// OAuth 2.0 Error Response
#[derive(Debug, Serialize)]
pub struct OAuth2Error {
    /// Error code
    pub error: String,
    /// Human-readable error description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuth2Error {
    /// Create an `invalid_request` error
    #[must_use]
    pub fn invalid_request(description: &str) -> Self {
        Self {
            error: "invalid_request".to_owned(),
            error_description: Some(description.to_owned()),
        }
    }

    /// Create an `invalid_client` error
    #[must_use]
    pub fn invalid_client() -> Self {
        Self {
            error: "invalid_client".to_owned(),
            error_description: Some("Client authentication failed".to_owned()),
        }
    }

    /// Create an `invalid_grant` error
    #[must_use]
    pub fn invalid_grant(description: &str) -> Self {
        Self {
            error: "invalid_grant".to_owned(),
            error_description: Some(description.to_owned()),
        }
    }
}
