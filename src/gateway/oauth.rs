// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! OAuth2 authorization-code login against the configured provider.
//!
//! ## Flow
//!
//! 1. `/oauth2/authorization/{provider}` generates a state and a PKCE
//!    verifier, stores both in a short-lived cookie and redirects to the
//!    provider's authorization endpoint
//! 2. The provider redirects back to `/login/oauth2/code/{provider}`
//! 3. The callback checks the state, exchanges the code for a provider
//!    access token and fetches the user-info attributes
//! 4. The attributes become an [`ExternalIdentity`] handed to the
//!    [`IdentityBroker`](super::broker::IdentityBroker)

use axum::{
    http::{header::COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use base64ct::{Base64UrlUnpadded, Encoding};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::auth::ExternalIdentity;
use crate::config::ProviderSettings;
use crate::error::ApiError;

/// Cookie holding the pending authorization request.
pub const AUTH_REQUEST_COOKIE: &str = "oauth2_auth_request";

/// Lifetime of the pending-request cookie, in seconds.
const AUTH_REQUEST_MAX_AGE_SECS: u32 = 300;

/// Login failures between authorization redirect and token issuance.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    #[error("provider denied authorization: {0}")]
    ProviderDenied(String),

    #[error("missing '{0}' parameter in callback")]
    MissingParameter(&'static str),

    #[error("authorization state does not match")]
    StateMismatch,

    #[error("code exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),
}

impl LoginError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LoginError::UnknownProvider(_) => StatusCode::NOT_FOUND,
            LoginError::ProviderDenied(_) => StatusCode::UNAUTHORIZED,
            LoginError::MissingParameter(_) | LoginError::StateMismatch => StatusCode::BAD_REQUEST,
            LoginError::TokenExchange(_) | LoginError::UserInfo(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let message = match &self {
            LoginError::TokenExchange(_) | LoginError::UserInfo(_) => "Identity provider unavailable".to_string(),
            other => other.to_string(),
        };
        ApiError::new(self.status_code(), message).into_response()
    }
}

/// State and PKCE verifier of a login in progress.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub state: String,
    pub code_verifier: String,
}

impl std::fmt::Debug for AuthorizationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequest")
            .field("state", &self.state)
            .field("code_verifier", &"[REDACTED]")
            .finish()
    }
}

impl AuthorizationRequest {
    pub fn generate() -> Self {
        Self {
            state: Uuid::new_v4().simple().to_string(),
            // 64 hex chars, within the 43..=128 PKCE range
            code_verifier: format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple()),
        }
    }

    /// S256 code challenge.
    pub fn code_challenge(&self) -> String {
        Base64UrlUnpadded::encode_string(&Sha256::digest(self.code_verifier.as_bytes()))
    }

    /// `Set-Cookie` value storing this request.
    pub fn to_cookie(&self, secure: bool) -> String {
        let mut cookie = format!(
            "{AUTH_REQUEST_COOKIE}={}.{}; Path=/; HttpOnly; SameSite=Lax; Max-Age={AUTH_REQUEST_MAX_AGE_SECS}",
            self.state, self.code_verifier
        );
        if secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value removing the stored request.
    pub fn clear_cookie() -> String {
        format!("{AUTH_REQUEST_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }

    /// Pending request from the inbound `Cookie` headers, if any.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == AUTH_REQUEST_COOKIE)
            .and_then(|(_, value)| value.split_once('.'))
            .filter(|(state, verifier)| !state.is_empty() && !verifier.is_empty())
            .map(|(state, verifier)| Self {
                state: state.to_string(),
                code_verifier: verifier.to_string(),
            })
    }
}

/// Query parameters of the provider's redirect back to the gateway.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for one OAuth2 provider registration.
pub struct OAuthClient {
    settings: ProviderSettings,
    http: reqwest::Client,
}

impl OAuthClient {
    pub fn new(settings: ProviderSettings, http: reqwest::Client) -> Self {
        tracing::info!(
            provider = %settings.provider_id,
            authorization_uri = %settings.authorization_uri,
            "OAuth2 provider configured"
        );
        Self { settings, http }
    }

    pub fn provider_id(&self) -> &str {
        &self.settings.provider_id
    }

    /// Whether the callback is served over TLS (controls the cookie's `Secure` flag).
    pub fn uses_tls(&self) -> bool {
        self.settings.redirect_uri.scheme() == "https"
    }

    /// Provider URL the browser is sent to for `request`.
    pub fn authorization_url(&self, request: &AuthorizationRequest) -> Url {
        let mut url = self.settings.authorization_uri.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("scope", &self.settings.scopes.join(" "))
            .append_pair("state", &request.state)
            .append_pair("redirect_uri", self.settings.redirect_uri.as_str())
            .append_pair("code_challenge", &request.code_challenge())
            .append_pair("code_challenge_method", "S256");
        url
    }

    /// Finish the login described by `params`.
    ///
    /// `Ok(None)` means the provider answered but its attributes carry no
    /// usable subject.
    pub async fn complete(
        &self,
        params: &CallbackParams,
        pending: Option<AuthorizationRequest>,
    ) -> Result<Option<ExternalIdentity>, LoginError> {
        if let Some(error) = &params.error {
            return Err(LoginError::ProviderDenied(error.clone()));
        }

        let state = params.state.as_deref().ok_or(LoginError::MissingParameter("state"))?;
        let pending = pending.ok_or(LoginError::StateMismatch)?;
        if state != pending.state {
            return Err(LoginError::StateMismatch);
        }
        let code = params.code.as_deref().ok_or(LoginError::MissingParameter("code"))?;

        let access_token = self.exchange_code(code, &pending).await?;
        let attributes = self.user_info(&access_token).await?;

        Ok(attributes
            .as_object()
            .and_then(|attributes| ExternalIdentity::from_attributes(attributes, &self.settings.user_name_attribute)))
    }

    async fn exchange_code(&self, code: &str, pending: &AuthorizationRequest) -> Result<String, LoginError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_uri.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
            ("code_verifier", pending.code_verifier.as_str()),
        ];

        let response = self
            .http
            .post(self.settings.token_uri.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| LoginError::TokenExchange(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoginError::TokenExchange(format!("status {}", response.status())));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| LoginError::TokenExchange(e.to_string()))?;
        Ok(token.access_token)
    }

    async fn user_info(&self, access_token: &str) -> Result<Value, LoginError> {
        let response = self
            .http
            .get(self.settings.user_info_uri.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| LoginError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(LoginError::UserInfo(format!("status {}", response.status())));
        }

        response.json().await.map_err(|e| LoginError::UserInfo(e.to_string()))
    }
}
