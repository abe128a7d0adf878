// ABOUTME: HTTP surface for the MCP protocol: synchronous POST channel and SSE push channel
// ABOUTME: Routes dispatched results to the session's live push channel when one exists
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Protocol transport routes
//!
//! `POST /mcp` carries one protocol message per request. `GET /mcp` with an
//! event-stream accept preference opens the session's push channel. A
//! client may hold both concurrently; replies go to whichever channel is
//! long-lived, so a dispatched result is delivered over the live push
//! channel when present and the synchronous call is answered with a
//! lightweight acknowledgment instead.

use super::dispatcher::McpDispatcher;
use super::protocol::{McpRequest, McpResponse};
use super::resources::ServerResources;
use super::sse_transport::{open_push_channel, SseMessage};
use crate::constants::{errors, SESSION_ID_HEADER};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use http::{header, HeaderMap, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Protocol routes: synchronous and push channels on one endpoint
pub fn mcp_routes() -> Router<Arc<ServerResources>> {
    Router::new().route("/mcp", get(handle_open_push_channel).post(handle_protocol_message))
}

/// Handle `POST /mcp`: one request or notification per call
async fn handle_protocol_message(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(rejection) = check_bearer(&resources, &headers) {
        return rejection;
    }

    let (session_id, _created) = resources
        .sessions
        .resolve(header_value(&headers, SESSION_ID_HEADER).as_deref(), Utc::now());

    let request: McpRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "unparseable protocol message");
            let frame = McpResponse::error(
                Value::Null,
                errors::ERROR_PARSE,
                format!("Parse error: {e}"),
            );
            return with_session_header(&session_id, Json(frame).into_response());
        }
    };

    let dispatcher = McpDispatcher::new(resources.clone());
    let Some(response) = dispatcher.dispatch(&session_id, request).await else {
        // Notifications are acknowledged with an empty 200, never a frame.
        return with_session_header(&session_id, StatusCode::OK.into_response());
    };

    // Deliver over the push channel when the session holds a live one; the
    // synchronous caller then only gets a delivery acknowledgment.
    match serde_json::to_string(&response) {
        Ok(frame) => {
            if resources
                .sessions
                .push_to_session(&session_id, SseMessage::message(frame))
            {
                debug!(%session_id, "result delivered via push channel");
                let ack = json!({ "status": "accepted", "delivery": "push-channel" });
                with_session_header(&session_id, Json(ack).into_response())
            } else {
                with_session_header(&session_id, Json(response).into_response())
            }
        }
        Err(e) => {
            warn!(error = %e, "failed to serialize response frame");
            let frame = McpResponse::internal_error(Value::Null, "response serialization failed");
            with_session_header(&session_id, Json(frame).into_response())
        }
    }
}

/// Handle `GET /mcp`: open the session's push channel
async fn handle_open_push_channel(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = check_bearer(&resources, &headers) {
        return rejection;
    }

    let accepts_event_stream = header_value(&headers, header::ACCEPT.as_str())
        .is_some_and(|accept| accept.contains("text/event-stream") || accept.contains("*/*"));
    if !accepts_event_stream {
        return (
            StatusCode::NOT_ACCEPTABLE,
            Json(json!({
                "error": "not_acceptable",
                "error_description": "The push channel requires Accept: text/event-stream",
            })),
        )
            .into_response();
    }

    let (session_id, _created) = resources
        .sessions
        .resolve(header_value(&headers, SESSION_ID_HEADER).as_deref(), Utc::now());

    let stream = open_push_channel(&resources, session_id.clone());
    with_session_header(&session_id, stream.into_response())
}

/// Enforce bearer authentication on the protocol endpoints when configured
fn check_bearer(resources: &Arc<ServerResources>, headers: &HeaderMap) -> Result<(), Response> {
    if !resources.config.oauth2_server.require_bearer_auth {
        return Ok(());
    }

    let token = header_value(headers, header::AUTHORIZATION.as_str())
        .and_then(|value| value.strip_prefix("Bearer ").map(str::to_owned));

    // Validity is checked lazily against the grant store on every lookup.
    match token {
        Some(token) if resources.grants.validate_token(&token, Utc::now()).is_some() => Ok(()),
        _ => {
            warn!("protocol request rejected: missing or invalid bearer token");
            Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "invalid_token",
                    "error_description": "A valid bearer access token is required",
                })),
            )
                .into_response())
        }
    }
}

/// Read a header as an owned string
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

/// Stamp the resolved session identifier onto a response
fn with_session_header(session_id: &str, mut response: Response) -> Response {
    if let Ok(value) = session_id.parse() {
        response.headers_mut().insert(SESSION_ID_HEADER, value);
    }
    response
}
