// ABOUTME: JSON-RPC message structures for the MCP protocol surface
// ABOUTME: Requests carry an id and mandate one reply; notifications carry none and get none
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! MCP protocol messages
//!
//! A request has `{id, method, params}` and is answered by exactly one
//! response frame addressed to the same id. A notification has no id and
//! must never produce a reply frame, even on failure.

use crate::constants::{errors, JSONRPC_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound MCP protocol message (request or notification)
#[derive(Debug, Clone, Deserialize)]
pub struct McpRequest {
    /// JSON-RPC version; must be "2.0"
    #[serde(default)]
    pub jsonrpc: String,
    /// Method name
    pub method: String,
    /// Method parameters
    pub params: Option<Value>,
    /// Request id; absent for notifications
    pub id: Option<Value>,
}

impl McpRequest {
    /// Whether this message is a notification (no id, never answered)
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The id to address a reply to; `Null` when the request carried none
    /// usable (malformed traffic that still demands an error frame)
    #[must_use]
    pub fn reply_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }
}

/// Outbound MCP response frame
#[derive(Debug, Serialize)]
pub struct McpResponse {
    /// JSON-RPC version, always "2.0"
    pub jsonrpc: String,
    /// Result payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    /// Id of the request being answered
    pub id: Value,
}

impl McpResponse {
    /// Create a successful response
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Create an error response
    #[must_use]
    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_owned(),
            result: None,
            error: Some(McpError::new(code, message)),
            id,
        }
    }

    /// Method-not-found error frame for a request
    #[must_use]
    pub fn method_not_found(id: Value, method: &str) -> Self {
        Self::error(
            id,
            errors::ERROR_METHOD_NOT_FOUND,
            format!("{}: {method}", errors::MSG_METHOD_NOT_FOUND),
        )
    }

    /// Invalid-params error frame for a request
    #[must_use]
    pub fn invalid_params(id: Value, detail: &str) -> Self {
        Self::error(
            id,
            errors::ERROR_INVALID_PARAMS,
            format!("{}: {detail}", errors::MSG_INVALID_PARAMS),
        )
    }

    /// Internal-error frame for a request
    #[must_use]
    pub fn internal_error(id: Value, detail: &str) -> Self {
        Self::error(
            id,
            errors::ERROR_INTERNAL_ERROR,
            format!("{}: {detail}", errors::MSG_INTERNAL_ERROR),
        )
    }
}

/// MCP error object
#[derive(Debug, Serialize)]
pub struct McpError {
    /// JSON-RPC error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Optional structured detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    /// Create a new MCP error
    #[must_use]
    pub const fn new(code: i32, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }
}
