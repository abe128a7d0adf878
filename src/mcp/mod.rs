// ABOUTME: Model Context Protocol implementation: dispatch, sessions, and transports
// ABOUTME: Session-keyed protocol surface with dual synchronous/push delivery
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! MCP protocol server

/// Method dispatch over the fixed handler table
pub mod dispatcher;

/// JSON-RPC message structures
pub mod protocol;

/// Shared server resources
pub mod resources;

/// HTTP transport routes
pub mod routes;

/// Protocol schema definitions
pub mod schema;

/// Session registry and eviction sweep
pub mod session;

/// SSE push channel
pub mod sse_transport;
