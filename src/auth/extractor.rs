// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for the verified identity.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(claims): Auth) -> impl IntoResponse {
//!     // claims is TokenClaims
//! }
//! ```

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::middleware::AccessGuard;
use super::{AuthError, TokenClaims};

/// Extractor for authenticated requests.
///
/// Uses the claims attached by [`enforce_access`](super::middleware::enforce_access)
/// and falls back to verifying the `Authorization` header itself, so a handler
/// stays protected even when mounted outside the middleware.
pub struct Auth(pub TokenClaims);

impl<S> FromRequestParts<S> for Auth
where
    AccessGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the claims
        if let Some(claims) = parts.extensions.get::<TokenClaims>().cloned() {
            return Ok(Auth(claims));
        }

        let guard = AccessGuard::from_ref(state);
        let claims = guard.verifier().authenticate(parts.headers.get(AUTHORIZATION))?;
        parts.extensions.insert(claims.clone());

        Ok(Auth(claims))
    }
}

/// Optional authentication extractor.
///
/// Yields `None` when no principal is attached and no valid bearer token is
/// present, instead of rejecting.
pub struct OptionalAuth(pub Option<TokenClaims>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    AccessGuard: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Auth::from_request_parts(parts, state).await {
            Ok(Auth(claims)) => Ok(OptionalAuth(Some(claims))),
            Err(_) => Ok(OptionalAuth(None)),
        }
    }
}
