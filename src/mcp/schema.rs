// ABOUTME: MCP schema definitions: tool catalog shapes, capabilities, and initialize payloads
// ABOUTME: Type-safe message bodies so protocol responses are never hand-built JSON blobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use crate::constants::{mcp_protocol_version, server_name, SERVER_VERSION};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// MCP tool schema definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name
    pub name: String,
    /// Human-readable description shown to the model
    pub description: String,
    /// JSON schema of the tool's arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: JsonSchema,
}

/// JSON Schema definition for tool inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSchema {
    /// Schema type, always "object" for tool inputs
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Named properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, PropertySchema>>,
    /// Required property names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl JsonSchema {
    /// Build an object schema from property and required-name lists
    #[must_use]
    pub fn object<const N: usize, const R: usize>(
        properties: [(&str, PropertySchema); N],
        required: [&str; R],
    ) -> Self {
        Self {
            schema_type: "object".to_owned(),
            properties: Some(
                properties
                    .into_iter()
                    .map(|(name, schema)| (name.to_owned(), schema))
                    .collect(),
            ),
            required: if R == 0 {
                None
            } else {
                Some(required.iter().map(|&name| name.to_owned()).collect())
            },
        }
    }
}

/// JSON Schema property definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Property type
    #[serde(rename = "type")]
    pub property_type: String,
    /// Property description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl PropertySchema {
    /// A string-typed property
    #[must_use]
    pub fn string(description: &str) -> Self {
        Self {
            property_type: "string".to_owned(),
            description: Some(description.to_owned()),
        }
    }

    /// An integer-typed property
    #[must_use]
    pub fn integer(description: &str) -> Self {
        Self {
            property_type: "integer".to_owned(),
            description: Some(description.to_owned()),
        }
    }
}

/// Content block inside a tool response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    /// Plain text content
    #[serde(rename = "text")]
    Text {
        /// The text payload
        text: String,
    },
}

/// Tool response after execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Content blocks
    pub content: Vec<Content>,
    /// Whether the execution failed
    #[serde(rename = "isError")]
    pub is_error: bool,
    /// Structured payload mirroring the content
    #[serde(rename = "structuredContent", skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<serde_json::Value>,
}

impl ToolResponse {
    /// Wrap a successful upstream result
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Self {
        let text = serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_owned());
        Self {
            content: vec![Content::Text { text }],
            is_error: false,
            structured_content: Some(value),
        }
    }
}

/// Server capability advertisement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities
    pub tools: ToolCapabilities,
    /// Resource-related capabilities
    pub resources: ResourceCapabilities,
    /// Prompt-related capabilities
    pub prompts: PromptCapabilities,
}

/// Tool capability flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCapabilities {
    /// Whether the server emits list-changed notifications
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource capability flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceCapabilities {
    /// Whether resources can be subscribed to
    pub subscribe: bool,
    /// Whether the server emits list-changed notifications
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Prompt capability flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptCapabilities {
    /// Whether the server emits list-changed notifications
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server identity returned from `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

/// Response payload for the `initialize` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    /// Negotiated protocol version
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Advertised capabilities
    pub capabilities: ServerCapabilities,
    /// Server identity
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

impl InitializeResponse {
    /// Build the gateway's initialize response
    #[must_use]
    pub fn current() -> Self {
        Self {
            protocol_version: mcp_protocol_version(),
            capabilities: ServerCapabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
                resources: ResourceCapabilities {
                    subscribe: false,
                    list_changed: false,
                },
                prompts: PromptCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: server_name(),
                version: SERVER_VERSION.to_owned(),
            },
        }
    }
}

/// Prompt descriptor returned from `prompts/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSchema {
    /// Prompt name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Prompt arguments
    pub arguments: Vec<PromptArgument>,
}

/// One argument of a prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name
    pub name: String,
    /// Argument description
    pub description: String,
    /// Whether the argument is mandatory
    pub required: bool,
}

/// Fixed prompt catalog
#[must_use]
pub fn get_prompts() -> Vec<PromptSchema> {
    vec![PromptSchema {
        name: "summarize_call".to_owned(),
        description: "Summarize a call transcript into key points and action items".to_owned(),
        arguments: vec![PromptArgument {
            name: "call_id".to_owned(),
            description: "Identifier of the call to summarize".to_owned(),
            required: true,
        }],
    }]
}
