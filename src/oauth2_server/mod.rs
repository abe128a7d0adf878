// ABOUTME: OAuth 2.0 authorization server module (gateway as provider for MCP clients)
// ABOUTME: Dynamic client registration, authorization-code issuance, and token exchange
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! OAuth 2.0 authorization server
//!
//! The gateway issues the bearer credentials MCP clients present. All state
//! is in-memory and volatile; see [`store`] for the keyed stores and
//! [`endpoints`] for the flow logic.

/// Authorization and token endpoint implementation
pub mod endpoints;

/// OAuth 2.0 request/response data models
pub mod models;

/// HTTP route handlers
pub mod routes;

/// In-memory credential and grant stores
pub mod store;

pub use endpoints::OAuth2AuthorizationServer;
pub use store::{CredentialStore, GrantStore};
