// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::codec::TokenError;

/// Authentication error type.
///
/// Verification failures are expected outcomes of request authentication:
/// they become a clean 401/403 with a fixed message and never expose token
/// contents or internal detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No authorization header on a route that requires one
    MissingCredential,
    /// Authorization header present but not `Bearer <token>`
    InvalidAuthHeader,
    /// Token could not be parsed
    TokenMalformed,
    /// Token signature does not match the shared secret
    TokenSignatureInvalid,
    /// Token has expired
    TokenExpired,
    /// Token issuer differs from the configured issuer
    InvalidIssuer,
    /// Authenticated, but the route policy denies access.
    /// Reserved: no rule produces it today.
    ForbiddenRoute,
    /// The provider finished login without a usable principal
    IdentityMissing,
    /// Internal error (details are logged, not returned)
    Internal,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: String,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::TokenMalformed => "malformed_token",
            AuthError::TokenSignatureInvalid => "invalid_signature",
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidIssuer => "invalid_issuer",
            AuthError::ForbiddenRoute => "forbidden",
            AuthError::IdentityMissing => "identity_missing",
            AuthError::Internal => "internal_error",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingCredential
            | AuthError::InvalidAuthHeader
            | AuthError::TokenMalformed
            | AuthError::TokenSignatureInvalid
            | AuthError::TokenExpired
            | AuthError::InvalidIssuer => StatusCode::UNAUTHORIZED,
            AuthError::ForbiddenRoute => StatusCode::FORBIDDEN,
            AuthError::IdentityMissing | AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredential => write!(f, "Authentication is required"),
            AuthError::InvalidAuthHeader => {
                write!(f, "Invalid authorization header format (expected 'Bearer <token>')")
            }
            AuthError::TokenMalformed => write!(f, "Token is malformed"),
            AuthError::TokenSignatureInvalid => write!(f, "Token signature is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
            AuthError::InvalidIssuer => write!(f, "Token issuer is invalid"),
            AuthError::ForbiddenRoute => write!(f, "Access to this resource is forbidden"),
            AuthError::IdentityMissing => write!(f, "Login could not be completed"),
            AuthError::Internal => write!(f, "Internal authentication error"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => AuthError::TokenMalformed,
            TokenError::SignatureInvalid => AuthError::TokenSignatureInvalid,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::IssuerMismatch => AuthError::InvalidIssuer,
            TokenError::Signing(_) => AuthError::Internal,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code().to_string(),
        });
        let mut response = (status, body).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
