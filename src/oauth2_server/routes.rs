// ABOUTME: OAuth 2.0 HTTP route handlers for the axum web framework
// ABOUTME: Provides registration, authorization, token, and discovery endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use super::endpoints::OAuth2AuthorizationServer;
use super::models::{AuthorizeParams, ClientRegistrationRequest, OAuth2Error, TokenRequest};
use crate::mcp::resources::ServerResources;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::Utc;
use http::{header, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;

/// OAuth 2.0 routes: registration, authorization, token, discovery
pub fn oauth2_routes() -> Router<Arc<ServerResources>> {
    Router::new()
        .route("/register", post(handle_client_registration))
        .route("/authorize", get(handle_authorization))
        .route("/token", post(handle_token))
        .route(
            "/.well-known/oauth-authorization-server",
            get(handle_discovery),
        )
}

/// Build the authorization server over the shared stores
fn authorization_server(resources: &Arc<ServerResources>) -> OAuth2AuthorizationServer {
    OAuth2AuthorizationServer::new(
        resources.credentials.clone(),
        resources.grants.clone(),
        resources.config.oauth2_server.clone(),
    )
}

/// Handle client registration (POST /register)
async fn handle_client_registration(
    State(resources): State<Arc<ServerResources>>,
    Json(request): Json<ClientRegistrationRequest>,
) -> Response {
    match authorization_server(&resources).register_client(request) {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(error) => oauth_error_response(&error),
    }
}

/// Handle authorization request (GET /authorize)
///
/// On success replies `302 Found` with the code (and opaque `state`)
/// appended to the bound redirect URI.
async fn handle_authorization(
    State(resources): State<Arc<ServerResources>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let params = AuthorizeParams {
        client_id: params.get("client_id").cloned().unwrap_or_default(),
        redirect_uri: params.get("redirect_uri").cloned(),
        state: params.get("state").cloned(),
        scope: params.get("scope").cloned(),
    };

    match authorization_server(&resources).authorize(params, Utc::now()) {
        Ok(grant) => (
            StatusCode::FOUND,
            [(header::LOCATION, grant.redirect_location())],
        )
            .into_response(),
        Err(error) => {
            tracing::warn!(error = %error.error, "authorization request rejected");
            oauth_error_response(&error)
        }
    }
}

/// Handle token request (POST /token, form-encoded)
async fn handle_token(
    State(resources): State<Arc<ServerResources>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let request = parse_token_request(&form);
    let client_id = request.client_id.clone();

    match authorization_server(&resources).token(request, Utc::now()) {
        Ok(response) => {
            tracing::info!(%client_id, "token exchange succeeded");
            Json(response).into_response()
        }
        Err(error) => {
            tracing::warn!(%client_id, error = %error.error, "token exchange failed");
            oauth_error_response(&error)
        }
    }
}

/// OAuth 2.0 discovery document (GET /.well-known/oauth-authorization-server)
async fn handle_discovery(State(resources): State<Arc<ServerResources>>) -> Json<serde_json::Value> {
    let issuer = &resources.config.oauth2_server.issuer_url;
    Json(serde_json::json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "registration_endpoint": format!("{issuer}/register"),
        "grant_types_supported": ["authorization_code"],
        "response_types_supported": ["code"],
        "token_endpoint_auth_methods_supported": ["client_secret_post"],
        "scopes_supported": ["calls:read", "transcripts:read"],
        "response_modes_supported": ["query"],
    }))
}

/// Parse form fields into a `TokenRequest`
fn parse_token_request(form: &HashMap<String, String>) -> TokenRequest {
    TokenRequest {
        grant_type: form.get("grant_type").cloned().unwrap_or_default(),
        code: form.get("code").cloned(),
        client_id: form.get("client_id").cloned().unwrap_or_default(),
        client_secret: form.get("client_secret").cloned().unwrap_or_default(),
        redirect_uri: form.get("redirect_uri").cloned(),
    }
}

/// All OAuth failures surface as `400` with a small JSON error object
fn oauth_error_response(error: &OAuth2Error) -> Response {
    (StatusCode::BAD_REQUEST, Json(error)).into_response()
}
