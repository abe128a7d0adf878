// ABOUTME: Gateway server binary: configuration, logging, and server startup
// ABOUTME: Environment-driven configuration with CLI overrides for host and port
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! # Reverb MCP Gateway Binary
//!
//! Starts the HTTP server carrying the OAuth 2.0 authorization endpoints
//! and the MCP protocol transport.

use anyhow::Result;
use clap::Parser;
use reverb_mcp_gateway::{
    backend::CallsApiClient, config::environment::ServerConfig, logging,
    mcp::resources::ServerResources, server::GatewayServer,
};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "reverb-mcp-gateway")]
#[command(about = "Reverb MCP Gateway - MCP access to the Reverb calls and transcripts API")]
struct Args {
    /// Override the HTTP port
    #[arg(long)]
    http_port: Option<u16>,

    /// Override the bind address
    #[arg(long)]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    logging::init_from_env()?;

    info!("Starting Reverb MCP Gateway");
    info!("{}", config.summary());

    let backend = Arc::new(CallsApiClient::new(&config.calls_api)?);
    let resources = Arc::new(ServerResources::new(config, backend));

    GatewayServer::new(resources).run().await?;
    Ok(())
}
