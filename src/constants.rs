// ABOUTME: Protocol constants, JSON-RPC error codes, and credential lifetime defaults
// ABOUTME: Provides environment-configurable protocol values with sensible defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Constants shared across the gateway

use std::env;
use std::time::Duration;

/// JSON-RPC version (standard, not configurable)
pub const JSONRPC_VERSION: &str = "2.0";

/// Get MCP protocol version from environment or default
#[must_use]
pub fn mcp_protocol_version() -> String {
    env::var("MCP_PROTOCOL_VERSION").unwrap_or_else(|_| "2025-06-18".into())
}

/// Get server name from environment or default
#[must_use]
pub fn server_name() -> String {
    env::var("SERVER_NAME").unwrap_or_else(|_| "reverb-mcp-gateway".into())
}

/// Server version from Cargo.toml
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Session identifier header used on both protocol endpoints
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// JSON-RPC error codes
pub mod errors {
    /// Body was not valid JSON
    pub const ERROR_PARSE: i32 = -32700;

    /// Message was structurally invalid (wrong version, missing method)
    pub const ERROR_INVALID_REQUEST: i32 = -32600;

    /// Method not found
    pub const ERROR_METHOD_NOT_FOUND: i32 = -32601;

    /// Invalid parameters (includes tool argument shape failures)
    pub const ERROR_INVALID_PARAMS: i32 = -32602;

    /// Internal error (backend faults and timeouts are wrapped here)
    pub const ERROR_INTERNAL_ERROR: i32 = -32603;

    /// Common error messages
    pub const MSG_METHOD_NOT_FOUND: &str = "Method not found";
    pub const MSG_INVALID_PARAMS: &str = "Invalid parameters";
    pub const MSG_INTERNAL_ERROR: &str = "Internal error";
}

/// OAuth grant and session lifetimes
pub mod lifetimes {
    use super::Duration;

    /// Authorization codes are valid for ten minutes and are single-use
    pub const AUTH_CODE_TTL: Duration = Duration::from_secs(10 * 60);

    /// Access tokens are valid for one hour
    pub const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

    /// Sessions are evicted after thirty idle minutes
    pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

    /// The eviction sweep runs every five minutes
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Push channels emit a keep-alive every fifteen seconds
    pub const SSE_KEEPALIVE: Duration = Duration::from_secs(15);

    /// Upper bound on a single backend tool invocation
    pub const BACKEND_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Scope granted to clients that do not request one
pub const DEFAULT_SCOPE: &str = "calls:read transcripts:read";
