// ABOUTME: Protocol dispatcher mapping method names to handlers through a fixed table
// ABOUTME: Requests get exactly one response frame; notifications never produce output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

//! Method dispatch
//!
//! Handlers live in a method-name-keyed table built once at construction,
//! so adding a method never touches a conditional chain. Backend faults are
//! wrapped into internal-error frames addressed to the request id; they are
//! never allowed to surface as transport-level failures.

use super::protocol::{McpRequest, McpResponse};
use super::resources::ServerResources;
use super::schema::{self, InitializeResponse, ToolResponse};
use crate::constants::{errors, JSONRPC_VERSION};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, warn};

type HandlerFuture = Pin<Box<dyn Future<Output = McpResponse> + Send>>;
type HandlerFn = fn(Arc<ServerResources>, String, McpRequest) -> HandlerFuture;

/// Dispatches protocol messages to method handlers
pub struct McpDispatcher {
    resources: Arc<ServerResources>,
    handlers: HashMap<&'static str, HandlerFn>,
}

impl McpDispatcher {
    /// Build the dispatcher and its method table
    #[must_use]
    pub fn new(resources: Arc<ServerResources>) -> Self {
        let mut handlers: HashMap<&'static str, HandlerFn> = HashMap::new();
        handlers.insert("initialize", handle_initialize as HandlerFn);
        handlers.insert("ping", handle_ping as HandlerFn);
        handlers.insert("tools/list", handle_tools_list as HandlerFn);
        handlers.insert("tools/call", handle_tools_call as HandlerFn);
        handlers.insert("resources/list", handle_resources_list as HandlerFn);
        handlers.insert("resources/read", handle_resources_read as HandlerFn);
        handlers.insert("prompts/list", handle_prompts_list as HandlerFn);
        handlers.insert("prompts/get", handle_prompts_get as HandlerFn);
        handlers.insert("notifications/initialized", handle_initialized as HandlerFn);

        Self {
            resources,
            handlers,
        }
    }

    /// Dispatch one protocol message
    ///
    /// Returns `None` for notifications: they are processed for their side
    /// effects (or silently dropped) and never answered, even when the
    /// method is unknown or the message is malformed.
    pub async fn dispatch(&self, session_id: &str, request: McpRequest) -> Option<McpResponse> {
        if request.is_notification() {
            self.handle_notification(session_id, &request);
            return None;
        }

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(McpResponse::error(
                request.reply_id(),
                errors::ERROR_INVALID_REQUEST,
                format!(
                    "Invalid JSON-RPC version: got '{}', expected '{JSONRPC_VERSION}'",
                    request.jsonrpc
                ),
            ));
        }
        if request.method.is_empty() {
            return Some(McpResponse::error(
                request.reply_id(),
                errors::ERROR_INVALID_REQUEST,
                "Missing method".to_owned(),
            ));
        }

        debug!(session_id, method = %request.method, id = ?request.id, "dispatching request");

        match self.handlers.get(request.method.as_str()) {
            Some(handler) => Some(
                handler(
                    self.resources.clone(),
                    session_id.to_owned(),
                    request,
                )
                .await,
            ),
            None => {
                warn!(method = %request.method, "unknown method");
                Some(McpResponse::method_not_found(
                    request.reply_id(),
                    &request.method,
                ))
            }
        }
    }

    /// Process a notification; never produces output
    fn handle_notification(&self, session_id: &str, request: &McpRequest) {
        match request.method.as_str() {
            "notifications/initialized" => {
                debug!(session_id, "client reported initialization complete");
                self.resources.sessions.mark_initialized(session_id);
            }
            other => {
                // Unknown notifications are dropped without an error frame.
                debug!(session_id, method = other, "ignoring notification");
            }
        }
    }
}

/// Handle `initialize`: mark the session and return protocol metadata
fn handle_initialize(
    resources: Arc<ServerResources>,
    session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        resources.sessions.mark_initialized(&session_id);
        match serde_json::to_value(InitializeResponse::current()) {
            Ok(result) => McpResponse::success(request.reply_id(), result),
            Err(e) => McpResponse::internal_error(request.reply_id(), &e.to_string()),
        }
    })
}

/// Handle `notifications/initialized` sent, unusually, as a request
///
/// The normal no-id form short-circuits in `handle_notification`; a client
/// that attaches an id still gets the mandated single reply.
fn handle_initialized(
    resources: Arc<ServerResources>,
    session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        resources.sessions.mark_initialized(&session_id);
        McpResponse::success(request.reply_id(), json!({}))
    })
}

/// Handle `ping`
fn handle_ping(
    _resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move { McpResponse::success(request.reply_id(), json!({})) })
}

/// Handle `tools/list`: the fixed catalog, independent of session state
fn handle_tools_list(
    resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        match resources.backend.list_tools().await {
            Ok(tools) => McpResponse::success(request.reply_id(), json!({ "tools": tools })),
            Err(fault) => McpResponse::internal_error(request.reply_id(), &fault.to_string()),
        }
    })
}

/// Handle `tools/call`: forward to the backend under a bounded timeout
fn handle_tools_call(
    resources: Arc<ServerResources>,
    session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        let reply_id = request.reply_id();
        let Some(params) = request.params else {
            return McpResponse::invalid_params(reply_id, "Missing parameters for tools/call");
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return McpResponse::invalid_params(reply_id, "Missing tool name");
        };
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        debug!(session_id = %session_id, tool = name, "executing tool call");

        let outcome = tokio::time::timeout(
            resources.config.calls_api.timeout,
            resources.backend.call_tool(name, &arguments),
        )
        .await;

        match outcome {
            Ok(Ok(value)) => match serde_json::to_value(ToolResponse::from_value(value)) {
                Ok(result) => McpResponse::success(reply_id, result),
                Err(e) => McpResponse::internal_error(reply_id, &e.to_string()),
            },
            Ok(Err(fault)) if fault.is_caller_fault() => {
                McpResponse::invalid_params(reply_id, &fault.to_string())
            }
            Ok(Err(fault)) => {
                warn!(tool = name, error = %fault, "tool execution failed");
                McpResponse::internal_error(reply_id, &fault.to_string())
            }
            Err(_) => {
                warn!(tool = name, "tool execution timed out");
                McpResponse::internal_error(reply_id, "tool execution timed out")
            }
        }
    })
}

/// Handle `resources/list`
fn handle_resources_list(
    _resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        McpResponse::success(
            request.reply_id(),
            json!({
                "resources": [{
                    "uri": "reverb://status",
                    "name": "Gateway status",
                    "description": "Live counters for sessions, clients, and issued grants",
                    "mimeType": "application/json",
                }]
            }),
        )
    })
}

/// Handle `resources/read`
fn handle_resources_read(
    resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        let reply_id = request.reply_id();
        let Some(uri) = request
            .params
            .as_ref()
            .and_then(|params| params.get("uri"))
            .and_then(Value::as_str)
        else {
            return McpResponse::invalid_params(reply_id, "Missing uri parameter");
        };

        if uri != "reverb://status" {
            return McpResponse::error(
                reply_id,
                errors::ERROR_METHOD_NOT_FOUND,
                format!("Unknown resource URI: {uri}"),
            );
        }

        let status = json!({
            "sessions": resources.sessions.session_count(),
            "clients": resources.credentials.len(),
            "codes": resources.grants.code_count(),
            "tokens": resources.grants.token_count(),
            "started_at": resources.started_at.to_rfc3339(),
        });
        McpResponse::success(
            reply_id,
            json!({
                "contents": [{
                    "uri": uri,
                    "mimeType": "application/json",
                    "text": status.to_string(),
                }]
            }),
        )
    })
}

/// Handle `prompts/list`
fn handle_prompts_list(
    _resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        McpResponse::success(
            request.reply_id(),
            json!({ "prompts": schema::get_prompts() }),
        )
    })
}

/// Handle `prompts/get`
fn handle_prompts_get(
    _resources: Arc<ServerResources>,
    _session_id: String,
    request: McpRequest,
) -> HandlerFuture {
    Box::pin(async move {
        let reply_id = request.reply_id();
        let Some(name) = request
            .params
            .as_ref()
            .and_then(|params| params.get("name"))
            .and_then(Value::as_str)
        else {
            return McpResponse::invalid_params(reply_id, "Missing prompt name");
        };

        if name != "summarize_call" {
            return McpResponse::invalid_params(reply_id, &format!("Unknown prompt: {name}"));
        }

        let call_id = request
            .params
            .as_ref()
            .and_then(|params| params.get("arguments"))
            .and_then(|arguments| arguments.get("call_id"))
            .and_then(Value::as_str)
            .unwrap_or("the requested call");

        McpResponse::success(
            reply_id,
            json!({
                "description": "Summarize a call transcript",
                "messages": [{
                    "role": "user",
                    "content": {
                        "type": "text",
                        "text": format!(
                            "Fetch the transcript for {call_id} with the get_transcript tool, \
                             then summarize it into key points and action items."
                        ),
                    }
                }]
            }),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendFault, ToolBackend};
    use crate::config::environment::ServerConfig;
    use crate::mcp::schema::ToolSchema;
    use async_trait::async_trait;
    use serial_test::serial;

    struct StubBackend {
        fail_with: Option<fn() -> BackendFault>,
    }

    #[async_trait]
    impl ToolBackend for StubBackend {
        async fn list_tools(&self) -> Result<Vec<ToolSchema>, BackendFault> {
            Ok(crate::backend::CallsApiClient::catalog())
        }

        async fn call_tool(&self, name: &str, _arguments: &Value) -> Result<Value, BackendFault> {
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            Ok(json!({ "tool": name, "ok": true }))
        }
    }

    fn dispatcher(fail_with: Option<fn() -> BackendFault>) -> McpDispatcher {
        let config = ServerConfig::from_env().unwrap();
        let resources = Arc::new(ServerResources::new(
            config,
            Arc::new(StubBackend { fail_with }),
        ));
        McpDispatcher::new(resources)
    }

    fn request(method: &str, params: Option<Value>, id: Option<Value>) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".to_owned(),
            method: method.to_owned(),
            params,
            id,
        }
    }

    #[tokio::test]
    #[serial]
    async fn notifications_never_produce_a_reply() {
        let dispatcher = dispatcher(None);
        for method in ["notifications/initialized", "ping", "tools/call", "no/such/method"] {
            let outcome = dispatcher
                .dispatch("session_a", request(method, Some(json!({"x": 1})), None))
                .await;
            assert!(outcome.is_none(), "{method} notification must stay silent");
        }
    }

    #[tokio::test]
    #[serial]
    async fn unknown_method_on_a_request_is_method_not_found() {
        let dispatcher = dispatcher(None);
        let response = dispatcher
            .dispatch("session_a", request("no/such/method", None, Some(json!(7))))
            .await
            .unwrap();
        assert_eq!(response.id, json!(7));
        assert_eq!(response.error.unwrap().code, errors::ERROR_METHOD_NOT_FOUND);
    }

    #[tokio::test]
    #[serial]
    async fn tools_list_returns_the_full_catalog() {
        let dispatcher = dispatcher(None);
        let response = dispatcher
            .dispatch("session_a", request("tools/list", None, Some(json!(1))))
            .await
            .unwrap();
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 4);
    }

    #[tokio::test]
    #[serial]
    async fn backend_fault_is_wrapped_into_an_internal_error_frame() {
        let dispatcher = dispatcher(Some(|| BackendFault::Upstream("boom".to_owned())));
        let response = dispatcher
            .dispatch(
                "session_a",
                request(
                    "tools/call",
                    Some(json!({"name": "list_calls", "arguments": {}})),
                    Some(json!(2)),
                ),
            )
            .await
            .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, errors::ERROR_INTERNAL_ERROR);
        assert!(error.message.contains("boom"));
    }

    #[tokio::test]
    #[serial]
    async fn argument_shape_failures_are_invalid_params() {
        let dispatcher = dispatcher(Some(|| {
            BackendFault::InvalidArguments("call_id is required".to_owned())
        }));
        let response = dispatcher
            .dispatch(
                "session_a",
                request(
                    "tools/call",
                    Some(json!({"name": "get_call", "arguments": {}})),
                    Some(json!(3)),
                ),
            )
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, errors::ERROR_INVALID_PARAMS);
    }

    #[tokio::test]
    #[serial]
    async fn initialize_marks_the_session() {
        let dispatcher = dispatcher(None);
        let (session_id, _) = dispatcher.resources.sessions.resolve(None, chrono::Utc::now());
        assert!(!dispatcher.resources.sessions.is_initialized(&session_id));

        let response = dispatcher
            .dispatch(&session_id, request("initialize", None, Some(json!(1))))
            .await
            .unwrap();
        assert!(response.result.unwrap()["protocolVersion"].is_string());
        assert!(dispatcher.resources.sessions.is_initialized(&session_id));
    }

    #[tokio::test]
    #[serial]
    async fn wrong_jsonrpc_version_is_invalid_request() {
        let dispatcher = dispatcher(None);
        let mut bad = request("ping", None, Some(json!(1)));
        bad.jsonrpc = "1.0".to_owned();
        let response = dispatcher.dispatch("session_a", bad).await.unwrap();
        assert_eq!(response.error.unwrap().code, errors::ERROR_INVALID_REQUEST);
    }

    #[tokio::test]
    #[serial]
    async fn status_resource_reads_back_counters() {
        let dispatcher = dispatcher(None);
        let response = dispatcher
            .dispatch(
                "session_a",
                request(
                    "resources/read",
                    Some(json!({"uri": "reverb://status"})),
                    Some(json!(9)),
                ),
            )
            .await
            .unwrap();
        let contents = response.result.unwrap()["contents"][0].clone();
        assert_eq!(contents["mimeType"], "application/json");
        let body: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
        assert!(body["sessions"].is_number());
    }
}
