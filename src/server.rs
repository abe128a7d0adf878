// ABOUTME: Router assembly and server lifecycle: CORS, tracing, and the eviction sweep
// ABOUTME: Binds the listener and runs all HTTP surfaces on one port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Gateway server assembly

use crate::errors::{AppError, AppResult};
use crate::mcp::resources::ServerResources;
use crate::mcp::routes::mcp_routes;
use crate::oauth2_server::routes::oauth2_routes;
use crate::routes::health::HealthRoutes;
use axum::Router;
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

/// The assembled gateway server
pub struct GatewayServer {
    resources: Arc<ServerResources>,
}

impl GatewayServer {
    /// Create a server over shared resources
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        Self { resources }
    }

    /// Build the full router with middleware applied
    ///
    /// Public so integration tests can drive the router without binding a
    /// socket.
    #[must_use]
    pub fn router(&self) -> Router {
        // MCP clients run from arbitrary origins; the bearer token is the
        // actual access control.
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .merge(oauth2_routes())
            .merge(mcp_routes())
            .merge(HealthRoutes::routes())
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(self.resources.clone())
    }

    /// Spawn the periodic sweep evicting idle sessions and expired grants
    fn spawn_sweeper(&self) {
        let sessions = self.resources.sessions.clone();
        let grants = self.resources.grants.clone();
        let interval = self.resources.config.session.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // interval() yields its first tick immediately; skip it.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = Utc::now();
                let evicted = sessions.sweep(now);
                let (codes, tokens) = grants.sweep_expired(now);
                debug!(evicted, codes, tokens, "periodic sweep completed");
            }
        });
    }

    /// Bind the listener and serve until shutdown
    ///
    /// # Errors
    /// Returns an error if the port cannot be bound; this is the only
    /// process-fatal condition
    pub async fn run(&self) -> AppResult<()> {
        self.spawn_sweeper();

        let addr = format!(
            "{}:{}",
            self.resources.config.host, self.resources.config.http_port
        );
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| AppError::config(format!("failed to bind {addr}: {e}")))?;

        info!("listening on {addr}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::internal(format!("server error: {e}")))
    }
}

/// Resolve when the process receives ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    info!("shutdown signal received");
}
