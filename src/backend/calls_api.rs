// ABOUTME: Signed reqwest client for the upstream Reverb calls and transcripts API
// ABOUTME: Maps the fixed tool catalog onto upstream REST endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use super::{BackendFault, ToolBackend};
use crate::config::environment::CallsApiConfig;
use crate::errors::{AppError, AppResult};
use crate::mcp::schema::{JsonSchema, PropertySchema, ToolSchema};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Client for the upstream calls/transcripts REST API
///
/// Requests carry the API key as a bearer credential plus a timestamped
/// SHA-256 signature over the method and path.
pub struct CallsApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl CallsApiClient {
    /// Build a client from configuration
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed
    pub fn new(config: &CallsApiConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        })
    }

    /// The fixed tool catalog exposed over `tools/list`
    #[must_use]
    pub fn catalog() -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: "list_calls".to_owned(),
                description: "List recent calls, newest first".to_owned(),
                input_schema: JsonSchema::object(
                    [
                        ("limit", PropertySchema::integer("Maximum calls to return")),
                        ("offset", PropertySchema::integer("Pagination offset")),
                    ],
                    [],
                ),
            },
            ToolSchema {
                name: "get_call".to_owned(),
                description: "Fetch metadata for a single call".to_owned(),
                input_schema: JsonSchema::object(
                    [("call_id", PropertySchema::string("Call identifier"))],
                    ["call_id"],
                ),
            },
            ToolSchema {
                name: "get_transcript".to_owned(),
                description: "Fetch the transcript of a call".to_owned(),
                input_schema: JsonSchema::object(
                    [("call_id", PropertySchema::string("Call identifier"))],
                    ["call_id"],
                ),
            },
            ToolSchema {
                name: "search_transcripts".to_owned(),
                description: "Full-text search across call transcripts".to_owned(),
                input_schema: JsonSchema::object(
                    [
                        ("query", PropertySchema::string("Search query")),
                        ("limit", PropertySchema::integer("Maximum matches to return")),
                    ],
                    ["query"],
                ),
            },
        ]
    }

    /// Issue a signed GET request and parse the JSON body
    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, BackendFault> {
        let url = format!("{}{path}", self.base_url);
        let timestamp = Utc::now().timestamp().to_string();
        let signature = self.sign("GET", path, &timestamp);

        let response = self
            .http
            .get(&url)
            .query(query)
            .bearer_auth(&self.api_key)
            .header("x-reverb-timestamp", &timestamp)
            .header("x-reverb-signature", signature)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendFault::Timeout
                } else {
                    BackendFault::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendFault::Upstream(format!(
                "{path} returned HTTP {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BackendFault::Upstream(format!("invalid JSON from {path}: {e}")))
    }

    /// Sign a request: hex(SHA-256(secret || timestamp || method || path))
    fn sign(&self, method: &str, path: &str, timestamp: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api_secret.as_bytes());
        hasher.update(timestamp.as_bytes());
        hasher.update(method.as_bytes());
        hasher.update(path.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[async_trait]
impl ToolBackend for CallsApiClient {
    async fn list_tools(&self) -> Result<Vec<ToolSchema>, BackendFault> {
        Ok(Self::catalog())
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<Value, BackendFault> {
        match name {
            "list_calls" => {
                let mut query = Vec::new();
                if let Some(limit) = optional_integer(arguments, "limit")? {
                    query.push(("limit", limit.to_string()));
                }
                if let Some(offset) = optional_integer(arguments, "offset")? {
                    query.push(("offset", offset.to_string()));
                }
                self.get_json("/calls", &query).await
            }
            "get_call" => {
                let call_id = required_string(arguments, "call_id")?;
                self.get_json(&format!("/calls/{call_id}"), &[]).await
            }
            "get_transcript" => {
                let call_id = required_string(arguments, "call_id")?;
                self.get_json(&format!("/calls/{call_id}/transcript"), &[])
                    .await
            }
            "search_transcripts" => {
                let query_text = required_string(arguments, "query")?;
                let mut query = vec![("query", query_text)];
                if let Some(limit) = optional_integer(arguments, "limit")? {
                    query.push(("limit", limit.to_string()));
                }
                self.get_json("/transcripts/search", &query).await
            }
            other => Err(BackendFault::UnknownTool(other.to_owned())),
        }
    }
}

/// Extract a required string argument
fn required_string(arguments: &Value, key: &str) -> Result<String, BackendFault> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(_) => Err(BackendFault::InvalidArguments(format!(
            "{key} must be a non-empty string"
        ))),
        None => Err(BackendFault::InvalidArguments(format!("{key} is required"))),
    }
}

/// Extract an optional non-negative integer argument
fn optional_integer(arguments: &Value, key: &str) -> Result<Option<u64>, BackendFault> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_u64().map(Some).ok_or_else(|| {
            BackendFault::InvalidArguments(format!("{key} must be a non-negative integer"))
        }),
    }
}

/// Flatten catalog names for quick membership checks
#[must_use]
pub fn catalog_tool_names() -> Vec<String> {
    CallsApiClient::catalog()
        .into_iter()
        .map(|tool| tool.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_is_fixed_and_complete() {
        let names = catalog_tool_names();
        assert_eq!(
            names,
            vec!["list_calls", "get_call", "get_transcript", "search_transcripts"]
        );
    }

    #[test]
    fn required_string_rejects_missing_and_non_string() {
        assert!(required_string(&json!({}), "call_id").is_err());
        assert!(required_string(&json!({"call_id": 7}), "call_id").is_err());
        assert!(required_string(&json!({"call_id": ""}), "call_id").is_err());
        assert_eq!(
            required_string(&json!({"call_id": "c_1"}), "call_id").unwrap(),
            "c_1"
        );
    }

    #[test]
    fn optional_integer_rejects_negative_and_fractional() {
        assert_eq!(optional_integer(&json!({}), "limit").unwrap(), None);
        assert_eq!(
            optional_integer(&json!({"limit": 25}), "limit").unwrap(),
            Some(25)
        );
        assert!(optional_integer(&json!({"limit": -1}), "limit").is_err());
        assert!(optional_integer(&json!({"limit": 1.5}), "limit").is_err());
        assert!(optional_integer(&json!({"limit": "10"}), "limit").is_err());
    }

    #[test]
    fn signature_is_deterministic_for_same_inputs() {
        let config = CallsApiConfig {
            base_url: "https://api.reverb.example/v1".to_owned(),
            api_key: "key".to_owned(),
            api_secret: "secret".to_owned(),
            timeout: std::time::Duration::from_secs(5),
        };
        let client = CallsApiClient::new(&config).unwrap();
        let a = client.sign("GET", "/calls", "1700000000");
        let b = client.sign("GET", "/calls", "1700000000");
        assert_eq!(a, b);
        assert_ne!(a, client.sign("GET", "/calls", "1700000001"));
    }
}
