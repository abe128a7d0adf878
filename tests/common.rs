// ABOUTME: Shared helpers for integration tests: router construction and request plumbing
// ABOUTME: Tests drive the axum router in-process through tower::ServiceExt
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use http::{HeaderMap, Request, StatusCode};
use reverb_mcp_gateway::backend::{BackendFault, CallsApiClient, ToolBackend};
use reverb_mcp_gateway::config::environment::{
    CallsApiConfig, OAuth2ServerConfig, ServerConfig, SessionConfig,
};
use reverb_mcp_gateway::mcp::resources::ServerResources;
use reverb_mcp_gateway::mcp::schema::ToolSchema;
use reverb_mcp_gateway::server::GatewayServer;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

/// Deterministic test configuration, independent of the environment
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_owned(),
        http_port: 0,
        oauth2_server: OAuth2ServerConfig {
            issuer_url: "http://127.0.0.1:8081".to_owned(),
            auto_register_clients: true,
            require_bearer_auth: false,
        },
        session: SessionConfig {
            idle_timeout: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(5 * 60),
            sse_keepalive: Duration::from_secs(15),
        },
        calls_api: CallsApiConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            api_key: "test-key".to_owned(),
            api_secret: "test-secret".to_owned(),
            timeout: Duration::from_secs(2),
        },
    }
}

/// Backend stub answering tool calls without touching the network
pub struct StubBackend {
    pub fail_with: Option<fn() -> BackendFault>,
}

impl StubBackend {
    pub fn ok() -> Self {
        Self { fail_with: None }
    }

    pub fn failing(fail_with: fn() -> BackendFault) -> Self {
        Self {
            fail_with: Some(fail_with),
        }
    }
}

#[async_trait]
impl ToolBackend for StubBackend {
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, BackendFault> {
        Ok(CallsApiClient::catalog())
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value, BackendFault> {
        if let Some(fail) = self.fail_with {
            return Err(fail());
        }
        Ok(serde_json::json!({ "tool": name, "echo": arguments }))
    }
}

/// Build a router plus the resources behind it
pub fn build_gateway(config: ServerConfig, backend: Arc<dyn ToolBackend>) -> (Router, Arc<ServerResources>) {
    let resources = Arc::new(ServerResources::new(config, backend));
    let router = GatewayServer::new(resources.clone()).router();
    (router, resources)
}

/// Default gateway: auto-registration on, stub backend
pub fn default_gateway() -> (Router, Arc<ServerResources>) {
    build_gateway(test_config(), Arc::new(StubBackend::ok()))
}

/// Send a request and collect status, headers, and parsed JSON body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

/// POST a JSON body
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// POST a protocol message with an optional session header
pub fn post_mcp(body: &Value, session_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json");
    if let Some(session_id) = session_id {
        builder = builder.header("mcp-session-id", session_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// POST a form-encoded body
pub fn post_form(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = serde_urlencoded::to_string(fields).unwrap();
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

/// Plain GET request
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Register a client and return `(client_id, client_secret)`
pub async fn register_client(router: &Router, redirect_uri: &str) -> (String, String) {
    let (status, _, body) = send(
        router,
        post_json(
            "/register",
            &serde_json::json!({ "redirect_uris": [redirect_uri] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["client_id"].as_str().unwrap().to_owned(),
        body["client_secret"].as_str().unwrap().to_owned(),
    )
}

/// Run the authorize redirect and extract the issued code
pub async fn authorize_code(router: &Router, client_id: &str, redirect_uri: &str, state: &str) -> String {
    let uri = format!(
        "/authorize?client_id={}&redirect_uri={}&state={}",
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(state),
    );
    let (status, headers, _) = send(router, get(&uri)).await;
    assert_eq!(status, StatusCode::FOUND);

    let location = headers.get("location").unwrap().to_str().unwrap();
    let parsed = url::Url::parse(location).unwrap();
    parsed
        .query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .unwrap()
}
