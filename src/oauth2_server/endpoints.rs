// ABOUTME: OAuth 2.0 authorization-server core: registration, code issuance, token exchange
// ABOUTME: Enforces single-use codes, lazy expiry, and the auto-registration compatibility policy
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Reverb Audio Intelligence

use super::models::{
    AccessToken, AuthorizationCode, AuthorizeGrant, AuthorizeParams, ClientRegistrationRequest,
    ClientRegistrationResponse, OAuth2Client, OAuth2Error, TokenRequest, TokenResponse,
};
use super::store::{CredentialStore, GrantStore};
use crate::config::environment::OAuth2ServerConfig;
use crate::constants::{lifetimes, DEFAULT_SCOPE};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// OAuth 2.0 Authorization Server
///
/// Owns no state of its own; all records live in the shared stores so the
/// server value can be rebuilt per request if needed.
pub struct OAuth2AuthorizationServer {
    credentials: Arc<CredentialStore>,
    grants: Arc<GrantStore>,
    config: OAuth2ServerConfig,
}

impl OAuth2AuthorizationServer {
    /// Create a new authorization server over the shared stores
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        grants: Arc<GrantStore>,
        config: OAuth2ServerConfig,
    ) -> Self {
        Self {
            credentials,
            grants,
            config,
        }
    }

    /// Register a new OAuth 2.0 client (POST /register)
    ///
    /// # Errors
    /// Returns `invalid_request` when a supplied redirect URI is malformed
    /// or uses a forbidden scheme
    pub fn register_client(
        &self,
        request: ClientRegistrationRequest,
    ) -> Result<ClientRegistrationResponse, OAuth2Error> {
        let redirect_uris = request.redirect_uris.unwrap_or_default();
        for uri in &redirect_uris {
            if !is_valid_redirect_uri(uri) {
                return Err(OAuth2Error::invalid_request(&format!(
                    "Invalid redirect_uri: {uri}"
                )));
            }
        }

        let grant_types = request
            .grant_types
            .unwrap_or_else(|| vec!["authorization_code".to_owned()]);
        for grant_type in &grant_types {
            if grant_type != "authorization_code" {
                return Err(OAuth2Error::invalid_request(&format!(
                    "Unsupported grant_type: {grant_type}"
                )));
            }
        }

        let response_types = request
            .response_types
            .unwrap_or_else(|| vec!["code".to_owned()]);
        for response_type in &response_types {
            if response_type != "code" {
                return Err(OAuth2Error::invalid_request(&format!(
                    "Unsupported response_type: {response_type}"
                )));
            }
        }

        let client = OAuth2Client {
            client_id: generate_client_id(),
            client_secret: generate_secret()?,
            redirect_uris,
            grant_types,
            response_types,
            scope: request.scope.unwrap_or_else(|| DEFAULT_SCOPE.to_owned()),
            created_at: Utc::now(),
            auto_registered: false,
        };

        let response = ClientRegistrationResponse {
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            redirect_uris: client.redirect_uris.clone(),
            grant_types: client.grant_types.clone(),
            response_types: client.response_types.clone(),
            scope: client.scope.clone(),
        };

        tracing::info!(client_id = %client.client_id, "registered OAuth client");
        self.credentials.insert(client);
        Ok(response)
    }

    /// Handle an authorization request (GET /authorize)
    ///
    /// Binds a redirect target and issues a one-time authorization code.
    /// Unknown clients are auto-registered when the compatibility flag is on.
    ///
    /// # Errors
    /// Returns `invalid_client` for unknown clients when auto-registration
    /// is disabled, `invalid_request` for missing or unbindable parameters
    pub fn authorize(
        &self,
        params: AuthorizeParams,
        now: DateTime<Utc>,
    ) -> Result<AuthorizeGrant, OAuth2Error> {
        if params.client_id.is_empty() {
            return Err(OAuth2Error::invalid_request("Missing client_id parameter"));
        }

        let client = match self.credentials.lookup(&params.client_id) {
            Some(client) => client,
            None if self.config.auto_register_clients => {
                self.auto_register(&params)?
            }
            None => {
                tracing::warn!(client_id = %params.client_id, "authorize for unknown client");
                return Err(OAuth2Error::invalid_client());
            }
        };

        let redirect_uri = match params.redirect_uri {
            Some(uri) => {
                if !client.redirect_uris.contains(&uri) {
                    return Err(OAuth2Error::invalid_request("Invalid redirect_uri"));
                }
                uri
            }
            None => client
                .redirect_uris
                .first()
                .cloned()
                .ok_or_else(|| OAuth2Error::invalid_request("Missing redirect_uri parameter"))?,
        };

        let scope = params.scope.unwrap_or_else(|| client.scope.clone());
        let code = AuthorizationCode {
            code: generate_secret()?,
            client_id: client.client_id.clone(),
            redirect_uri: redirect_uri.clone(),
            scope,
            created_at: now,
            expires_at: now + auth_code_ttl(),
        };
        let code_value = code.code.clone();
        self.grants.insert_code(code);

        tracing::info!(client_id = %client.client_id, "issued authorization code");
        Ok(AuthorizeGrant {
            redirect_uri,
            code: code_value,
            state: params.state,
        })
    }

    /// Handle a token request (POST /token)
    ///
    /// Validation order: grant type, code presence and expiry, client
    /// secret. Consumption of the code and minting of the token are a single
    /// indivisible step: the atomic `take_code` removal is the arbiter, so
    /// of two concurrent exchanges exactly one mints a token.
    ///
    /// # Errors
    /// Returns `invalid_grant` for grant-type mismatch and absent, expired,
    /// or already-consumed codes; `invalid_client` for secret mismatch
    pub fn token(
        &self,
        request: TokenRequest,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse, OAuth2Error> {
        if request.grant_type != "authorization_code" {
            return Err(OAuth2Error::invalid_grant(
                "Only the authorization_code grant type is supported",
            ));
        }

        let code_value = request
            .code
            .ok_or_else(|| OAuth2Error::invalid_grant("Missing authorization code"))?;

        // An expired-but-present code is indistinguishable from an absent one.
        let pending = self
            .grants
            .peek_code(&code_value)
            .filter(|code| !code.is_expired(now))
            .ok_or_else(|| OAuth2Error::invalid_grant("Authorization code is invalid or expired"))?;

        if let Some(redirect_uri) = &request.redirect_uri {
            if *redirect_uri != pending.redirect_uri {
                return Err(OAuth2Error::invalid_grant("redirect_uri mismatch"));
            }
        }

        self.verify_client(&pending.client_id, &request.client_id, &request.client_secret)?;

        // Final arbiter: the atomic removal closes the race where two
        // exchanges both observed the code as present.
        let consumed = self
            .grants
            .take_code(&code_value)
            .ok_or_else(|| OAuth2Error::invalid_grant("Authorization code already consumed"))?;

        let token = AccessToken {
            token: generate_secret()?,
            client_id: consumed.client_id.clone(),
            scope: consumed.scope.clone(),
            created_at: now,
            expires_at: now + access_token_ttl(),
        };
        let response = TokenResponse {
            access_token: token.token.clone(),
            token_type: "Bearer".to_owned(),
            expires_in: access_token_ttl().num_seconds(),
            scope: token.scope.clone(),
        };
        self.grants.insert_token(token);

        tracing::info!(client_id = %consumed.client_id, "exchanged authorization code for token");
        Ok(response)
    }

    /// Create a client record for an unknown identifier seen at /authorize
    ///
    /// The record carries a generated placeholder secret the real client
    /// never saw; secret verification is relaxed for such records.
    fn auto_register(&self, params: &AuthorizeParams) -> Result<OAuth2Client, OAuth2Error> {
        let redirect_uri = params
            .redirect_uri
            .clone()
            .ok_or_else(|| OAuth2Error::invalid_request("Missing redirect_uri parameter"))?;
        if !is_valid_redirect_uri(&redirect_uri) {
            return Err(OAuth2Error::invalid_request("Invalid redirect_uri"));
        }

        let client = OAuth2Client {
            client_id: params.client_id.clone(),
            client_secret: generate_secret()?,
            redirect_uris: vec![redirect_uri],
            grant_types: vec!["authorization_code".to_owned()],
            response_types: vec!["code".to_owned()],
            scope: DEFAULT_SCOPE.to_owned(),
            created_at: Utc::now(),
            auto_registered: true,
        };

        tracing::warn!(
            client_id = %client.client_id,
            "auto-registered unknown OAuth client (compatibility mode)"
        );
        self.credentials.insert(client.clone());
        Ok(client)
    }

    /// Verify the supplied client credentials against the code's owner
    fn verify_client(
        &self,
        owner_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<(), OAuth2Error> {
        if client_id != owner_id {
            tracing::warn!(%client_id, %owner_id, "token exchange with foreign client_id");
            return Err(OAuth2Error::invalid_client());
        }

        let client = self
            .credentials
            .lookup(owner_id)
            .ok_or_else(OAuth2Error::invalid_client)?;

        // Auto-registered records hold a placeholder secret the client never
        // received, so the comparison would always fail; accept whatever was
        // supplied. Explicitly registered clients get a constant-time check.
        if client.auto_registered {
            tracing::debug!(%client_id, "skipping secret check for auto-registered client");
            return Ok(());
        }

        let matches: bool = client
            .client_secret
            .as_bytes()
            .ct_eq(client_secret.as_bytes())
            .into();
        if !matches {
            tracing::warn!(%client_id, "client secret validation failed");
            return Err(OAuth2Error::invalid_client());
        }
        Ok(())
    }
}

/// Authorization-code lifetime as a chrono duration
fn auth_code_ttl() -> Duration {
    Duration::seconds(lifetimes::AUTH_CODE_TTL.as_secs() as i64)
}

/// Access-token lifetime as a chrono duration
fn access_token_ttl() -> Duration {
    Duration::seconds(lifetimes::ACCESS_TOKEN_TTL.as_secs() as i64)
}

/// Generate a client identifier
fn generate_client_id() -> String {
    format!("mcp_client_{}", Uuid::new_v4().simple())
}

/// Generate a URL-safe random secret from the system CSPRNG
///
/// Used for client secrets, authorization codes, and access tokens.
///
/// # Errors
/// Returns an error if the system RNG fails to produce random bytes
fn generate_secret() -> Result<String, OAuth2Error> {
    let rng = SystemRandom::new();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(error = ?e, "system RNG failure while generating secret");
        OAuth2Error::invalid_request("Failed to generate secure random value")
    })?;
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(bytes))
}

/// Check if a redirect URI is acceptable
///
/// Absolute URI, no fragment, no wildcard; https everywhere, plain http only
/// for loopback hosts.
fn is_valid_redirect_uri(uri: &str) -> bool {
    if uri.trim().is_empty() || uri.contains('#') || uri.contains('*') {
        return false;
    }

    let Ok(parsed) = url::Url::parse(uri) else {
        return false;
    };

    let is_loopback =
        parsed.host_str() == Some("localhost") || parsed.host_str() == Some("127.0.0.1");
    match parsed.scheme() {
        "https" => true,
        "http" => is_loopback,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(auto_register: bool) -> OAuth2ServerConfig {
        OAuth2ServerConfig {
            issuer_url: "http://127.0.0.1:8081".to_owned(),
            auto_register_clients: auto_register,
            require_bearer_auth: false,
        }
    }

    fn server(auto_register: bool) -> OAuth2AuthorizationServer {
        OAuth2AuthorizationServer::new(
            Arc::new(CredentialStore::new()),
            Arc::new(GrantStore::new()),
            test_config(auto_register),
        )
    }

    fn register(server: &OAuth2AuthorizationServer) -> ClientRegistrationResponse {
        server
            .register_client(ClientRegistrationRequest {
                redirect_uris: Some(vec!["https://cb/x".to_owned()]),
                ..ClientRegistrationRequest::default()
            })
            .unwrap()
    }

    fn authorize_params(client_id: &str) -> AuthorizeParams {
        AuthorizeParams {
            client_id: client_id.to_owned(),
            redirect_uri: Some("https://cb/x".to_owned()),
            state: Some("s1".to_owned()),
            scope: None,
        }
    }

    #[test]
    fn full_code_flow_mints_a_bearer_token() {
        let server = server(false);
        let registration = register(&server);
        let now = Utc::now();

        let grant = server
            .authorize(authorize_params(&registration.client_id), now)
            .unwrap();
        assert!(grant.redirect_location().starts_with("https://cb/x?code="));
        assert!(grant.redirect_location().ends_with("&state=s1"));

        let token = server
            .token(
                TokenRequest {
                    grant_type: "authorization_code".to_owned(),
                    code: Some(grant.code),
                    client_id: registration.client_id,
                    client_secret: registration.client_secret,
                    redirect_uri: None,
                },
                now,
            )
            .unwrap();
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);
    }

    #[test]
    fn second_exchange_of_same_code_fails() {
        let server = server(false);
        let registration = register(&server);
        let now = Utc::now();
        let grant = server
            .authorize(authorize_params(&registration.client_id), now)
            .unwrap();

        let request = || TokenRequest {
            grant_type: "authorization_code".to_owned(),
            code: Some(grant.code.clone()),
            client_id: registration.client_id.clone(),
            client_secret: registration.client_secret.clone(),
            redirect_uri: None,
        };
        assert!(server.token(request(), now).is_ok());
        let err = server.token(request(), now).unwrap_err();
        assert_eq!(err.error, "invalid_grant");
    }

    #[test]
    fn expired_code_fails_even_if_never_consumed() {
        let server = server(false);
        let registration = register(&server);
        let issued_at = Utc::now();
        let grant = server
            .authorize(authorize_params(&registration.client_id), issued_at)
            .unwrap();

        let after_window = issued_at + Duration::minutes(10) + Duration::seconds(1);
        let err = server
            .token(
                TokenRequest {
                    grant_type: "authorization_code".to_owned(),
                    code: Some(grant.code),
                    client_id: registration.client_id,
                    client_secret: registration.client_secret,
                    redirect_uri: None,
                },
                after_window,
            )
            .unwrap_err();
        assert_eq!(err.error, "invalid_grant");
    }

    #[test]
    fn wrong_secret_is_invalid_client_and_code_survives() {
        let server = server(false);
        let registration = register(&server);
        let now = Utc::now();
        let grant = server
            .authorize(authorize_params(&registration.client_id), now)
            .unwrap();

        let err = server
            .token(
                TokenRequest {
                    grant_type: "authorization_code".to_owned(),
                    code: Some(grant.code.clone()),
                    client_id: registration.client_id.clone(),
                    client_secret: "wrong".to_owned(),
                    redirect_uri: None,
                },
                now,
            )
            .unwrap_err();
        assert_eq!(err.error, "invalid_client");

        // The failed attempt must not consume the code.
        let token = server.token(
            TokenRequest {
                grant_type: "authorization_code".to_owned(),
                code: Some(grant.code),
                client_id: registration.client_id,
                client_secret: registration.client_secret,
                redirect_uri: None,
            },
            now,
        );
        assert!(token.is_ok());
    }

    #[test]
    fn grant_type_mismatch_is_invalid_grant() {
        let server = server(false);
        let err = server
            .token(
                TokenRequest {
                    grant_type: "client_credentials".to_owned(),
                    ..TokenRequest::default()
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.error, "invalid_grant");
    }

    #[test]
    fn missing_client_id_is_invalid_request() {
        let server = server(true);
        let err = server
            .authorize(
                AuthorizeParams {
                    client_id: String::new(),
                    redirect_uri: Some("https://cb/x".to_owned()),
                    state: None,
                    scope: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.error, "invalid_request");
    }

    #[test]
    fn unknown_client_is_auto_registered_when_enabled() {
        let server = server(true);
        let now = Utc::now();
        let grant = server.authorize(authorize_params("walk-in"), now).unwrap();
        assert!(!grant.code.is_empty());

        let client = server.credentials.lookup("walk-in").unwrap();
        assert!(client.auto_registered);
        assert_eq!(client.redirect_uris, vec!["https://cb/x".to_owned()]);

        // The placeholder secret is not enforced at the token endpoint.
        let token = server.token(
            TokenRequest {
                grant_type: "authorization_code".to_owned(),
                code: Some(grant.code),
                client_id: "walk-in".to_owned(),
                client_secret: "anything".to_owned(),
                redirect_uri: None,
            },
            now,
        );
        assert!(token.is_ok());
    }

    #[test]
    fn unknown_client_is_rejected_when_auto_registration_is_off() {
        let server = server(false);
        let err = server
            .authorize(authorize_params("walk-in"), Utc::now())
            .unwrap_err();
        assert_eq!(err.error, "invalid_client");
    }

    #[test]
    fn unregistered_redirect_uri_is_rejected() {
        let server = server(false);
        let registration = register(&server);
        let err = server
            .authorize(
                AuthorizeParams {
                    client_id: registration.client_id,
                    redirect_uri: Some("https://evil.example/cb".to_owned()),
                    state: None,
                    scope: None,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err.error, "invalid_request");
    }

    #[test]
    fn redirect_uri_validation_rejects_fragments_and_plain_http() {
        assert!(is_valid_redirect_uri("https://cb/x"));
        assert!(is_valid_redirect_uri("http://localhost:3000/cb"));
        assert!(is_valid_redirect_uri("http://127.0.0.1/cb"));
        assert!(!is_valid_redirect_uri("http://example.com/cb"));
        assert!(!is_valid_redirect_uri("https://cb/x#fragment"));
        assert!(!is_valid_redirect_uri("https://*.example.com/cb"));
        assert!(!is_valid_redirect_uri("not a uri"));
    }
}
