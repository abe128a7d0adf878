// ABOUTME: ToolBackend seam between the protocol dispatcher and the upstream calls API
// ABOUTME: Defines the backend trait and the recoverable fault type the dispatcher wraps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Tool execution backend
//!
//! The dispatcher never talks to the upstream API directly; it goes through
//! [`ToolBackend`] so tests can substitute a stub and faults stay
//! recoverable. Every fault is wrapped into a JSON-RPC error frame by the
//! dispatcher, never propagated as a transport-level failure.

/// Upstream calls/transcripts API client
pub mod calls_api;

use crate::mcp::schema::ToolSchema;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use calls_api::CallsApiClient;

/// Recoverable faults from tool execution
#[derive(Debug, Error)]
pub enum BackendFault {
    /// The requested tool is not in the catalog
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    /// Tool arguments failed shape checks; the upstream API was not called
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
    /// The upstream API reported or caused a failure
    #[error("upstream request failed: {0}")]
    Upstream(String),
    /// The upstream API did not answer within the bounded timeout
    #[error("upstream request timed out")]
    Timeout,
}

impl BackendFault {
    /// Whether the fault is the caller's (argument shape) rather than the
    /// upstream's
    #[must_use]
    pub const fn is_caller_fault(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidArguments(_))
    }
}

/// Executor of the actual tool/business logic
///
/// Implementations must be cheap to share behind an `Arc` across concurrent
/// protocol requests.
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// The fixed tool catalog, independent of any session state
    ///
    /// # Errors
    /// Returns a fault if the catalog cannot be produced
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, BackendFault>;

    /// Execute one tool invocation
    ///
    /// # Errors
    /// Returns a fault for unknown tools, malformed arguments, or upstream
    /// failures
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value, BackendFault>;
}
