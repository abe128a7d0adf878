// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Handles environment variables, policy flags, and runtime configuration parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Environment-based configuration management for production deployment

use crate::constants::lifetimes;
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// OAuth authorization server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuth2ServerConfig {
    /// Issuer URL advertised in the discovery document
    pub issuer_url: String,
    /// Auto-register unknown clients at the authorization endpoint.
    ///
    /// This is a compatibility concession for MCP clients that skip dynamic
    /// registration; disabling it makes unknown clients fail with
    /// `invalid_client`.
    pub auto_register_clients: bool,
    /// Require a valid bearer token on the protocol endpoints
    pub require_bearer_auth: bool,
}

/// Session registry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sessions idle longer than this are evicted by the sweep
    pub idle_timeout: Duration,
    /// Interval between eviction sweeps
    pub sweep_interval: Duration,
    /// Interval between push-channel keep-alive events
    pub sse_keepalive: Duration,
}

/// Upstream calls/transcripts API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsApiConfig {
    /// Base URL of the upstream API
    pub base_url: String,
    /// API key sent as the bearer credential on upstream requests
    pub api_key: String,
    /// Secret used to sign upstream requests
    pub api_secret: String,
    /// Upper bound on a single upstream invocation
    pub timeout: Duration,
}

/// Server configuration assembled from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to
    pub host: String,
    /// Port the HTTP listener binds to
    pub http_port: u16,
    /// OAuth authorization server settings
    pub oauth2_server: OAuth2ServerConfig,
    /// Session registry settings
    pub session: SessionConfig,
    /// Upstream calls API settings
    pub calls_api: CallsApiConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error when a variable is present but fails to parse
    pub fn from_env() -> AppResult<Self> {
        let host = env_var_or("HOST", "127.0.0.1");
        let http_port = parse_env("HTTP_PORT", 8081_u16)?;

        let issuer_url = env::var("ISSUER_URL")
            .unwrap_or_else(|_| format!("http://{host}:{http_port}"));

        Ok(Self {
            host,
            http_port,
            oauth2_server: OAuth2ServerConfig {
                issuer_url,
                auto_register_clients: parse_env("OAUTH_AUTO_REGISTER_CLIENTS", true)?,
                require_bearer_auth: parse_env("MCP_REQUIRE_BEARER_AUTH", false)?,
            },
            session: SessionConfig {
                idle_timeout: parse_secs(
                    "SESSION_IDLE_TIMEOUT_SECS",
                    lifetimes::SESSION_IDLE_TIMEOUT,
                )?,
                sweep_interval: parse_secs(
                    "SESSION_SWEEP_INTERVAL_SECS",
                    lifetimes::SWEEP_INTERVAL,
                )?,
                sse_keepalive: parse_secs("SSE_KEEPALIVE_SECS", lifetimes::SSE_KEEPALIVE)?,
            },
            calls_api: CallsApiConfig {
                base_url: env_var_or("CALLS_API_BASE_URL", "https://api.reverb.example/v1"),
                api_key: env_var_or("CALLS_API_KEY", ""),
                api_secret: env_var_or("CALLS_API_SECRET", ""),
                timeout: parse_secs("BACKEND_TIMEOUT_SECS", lifetimes::BACKEND_TIMEOUT)?,
            },
        })
    }

    /// One-line startup summary for the log
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Reverb MCP Gateway Configuration:\n\
             - Listen: {}:{}\n\
             - Issuer: {}\n\
             - Client Auto-Registration: {}\n\
             - Bearer Auth Required: {}\n\
             - Session Idle Timeout: {}s\n\
             - Sweep Interval: {}s\n\
             - Calls API: {}",
            self.host,
            self.http_port,
            self.oauth2_server.issuer_url,
            self.oauth2_server.auto_register_clients,
            self.oauth2_server.require_bearer_auth,
            self.session.idle_timeout.as_secs(),
            self.session.sweep_interval.as_secs(),
            self.calls_api.base_url,
        )
    }
}

/// Read an environment variable with a default
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to a default when unset
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Parse a seconds-valued environment variable into a `Duration`
fn parse_secs(key: &str, default: Duration) -> AppResult<Duration> {
    Ok(Duration::from_secs(parse_env(
        key,
        default.as_secs(),
    )?))
}
