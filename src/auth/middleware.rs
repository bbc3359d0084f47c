// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access enforcement middleware for Axum.
//!
//! Every service mounts [`enforce_access`] over its whole router, including
//! the fallback:
//!
//! ```rust,ignore
//! let guard = AccessGuard::new(AccessPolicy::resource_service(), verifier);
//! let app = Router::new()
//!     .route("/api/v1/health", get(health))
//!     .layer(axum::middleware::from_fn_with_state(guard, enforce_access));
//! ```
//!
//! On success the verified [`TokenClaims`] are inserted into the request
//! extensions, where the [`Auth`](super::Auth) extractors pick them up.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::policy::{is_ambiguous_path, AccessPolicy, Requirement};
use crate::error::ApiError;
use super::TokenVerifier;

/// Policy plus verifier, shared by every request of a service.
#[derive(Clone)]
pub struct AccessGuard {
    policy: Arc<AccessPolicy>,
    verifier: TokenVerifier,
}

impl AccessGuard {
    pub fn new(policy: AccessPolicy, verifier: TokenVerifier) -> Self {
        Self {
            policy: Arc::new(policy),
            verifier,
        }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    pub fn verifier(&self) -> &TokenVerifier {
        &self.verifier
    }
}

/// Authentication middleware function.
pub async fn enforce_access(State(guard): State<AccessGuard>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if is_ambiguous_path(&path) {
        tracing::debug!(path = %path, "Rejected path with dot segments");
        return ApiError::bad_request("Path must not contain dot segments").into_response();
    }
    let requirement = guard.policy.evaluate(&path);

    let anonymous = match requirement {
        Requirement::Public => true,
        Requirement::Optional => !request.headers().contains_key(AUTHORIZATION),
        Requirement::Authenticated => false,
    };
    if anonymous {
        return next.run(request).await;
    }

    match guard.verifier.authenticate(request.headers().get(AUTHORIZATION)) {
        Ok(claims) => {
            tracing::debug!(subject = %claims.subject, path = %path, "Request authenticated");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error_code = e.error_code(), path = %path, "Request rejected");
            e.into_response()
        }
    }
}
