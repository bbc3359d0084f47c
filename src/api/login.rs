// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Provider login endpoints.

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::gateway::{AuthorizationRequest, CallbackParams, LoginError};
use crate::state::GatewayState;

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(location) => (StatusCode::FOUND, [(LOCATION, location)]).into_response(),
        Err(_) => ApiError::internal("Invalid redirect location").into_response(),
    }
}

/// `/login`: start the configured provider's login.
pub async fn login(State(state): State<GatewayState>) -> Response {
    found(&format!("/oauth2/authorization/{}", state.oauth.provider_id()))
}

/// `/oauth2/authorization/{provider}`: redirect to the provider.
pub async fn authorize(State(state): State<GatewayState>, Path(provider): Path<String>) -> Response {
    if provider != state.oauth.provider_id() {
        return LoginError::UnknownProvider(provider).into_response();
    }

    let request = AuthorizationRequest::generate();
    let mut response = found(state.oauth.authorization_url(&request).as_str());
    match HeaderValue::from_str(&request.to_cookie(state.oauth.uses_tls())) {
        Ok(cookie) => {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        Err(_) => return ApiError::internal("Invalid login cookie").into_response(),
    }

    tracing::debug!(provider = %provider, "Redirecting to provider authorization endpoint");
    response
}

/// `/login/oauth2/code/{provider}`: provider callback.
///
/// Success ends in the identity broker's redirect; every outcome clears the
/// pending-login cookie.
pub async fn callback(
    State(state): State<GatewayState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
    headers: HeaderMap,
) -> Response {
    let mut response = if provider != state.oauth.provider_id() {
        LoginError::UnknownProvider(provider).into_response()
    } else {
        let pending = AuthorizationRequest::from_headers(&headers);
        match state.oauth.complete(&params, pending).await {
            Ok(identity) => state.broker.on_authentication_success(identity.as_ref()),
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "Provider login failed");
                e.into_response()
            }
        }
    };

    if let Ok(cleared) = HeaderValue::from_str(&AuthorizationRequest::clear_cookie()) {
        response.headers_mut().append(SET_COOKIE, cleared);
    }
    response
}
