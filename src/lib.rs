// ABOUTME: Main library entry point for the Reverb MCP gateway
// ABOUTME: OAuth2 authorization server plus session-keyed MCP transport over one HTTP port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

#![deny(unsafe_code)]

//! # Reverb MCP Gateway
//!
//! A gateway exposing the Reverb calls and transcripts API to MCP (Model
//! Context Protocol) clients. The gateway doubles as a minimal OAuth 2.0
//! authorization server issuing the bearer credentials those clients
//! present.
//!
//! ## Architecture
//!
//! - **`oauth2_server`**: dynamic client registration, authorization-code
//!   issuance, and code-for-token exchange over in-memory stores
//! - **`mcp`**: session registry, method dispatch, and dual delivery of
//!   results over the synchronous channel or a per-session SSE push channel
//! - **`backend`**: the outbound client executing tool calls against the
//!   upstream calls/transcripts API
//!
//! All state is intentionally volatile: clients, grants, and sessions live
//! in memory for the process lifetime at most.

/// Tool execution backend and upstream API client
pub mod backend;

/// Configuration management
pub mod config;

/// Application constants and protocol values
pub mod constants;

/// Unified error handling
pub mod errors;

/// Production logging and structured output
pub mod logging;

/// Model Context Protocol server implementation
pub mod mcp;

/// OAuth 2.0 authorization server (gateway as provider for MCP clients)
pub mod oauth2_server;

/// Auxiliary HTTP routes
pub mod routes;

/// Router assembly and server lifecycle
pub mod server;
