// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::{Auth, OptionalAuth};

/// `/gw/me`: the caller's verified claims, or a plain "not authenticated".
pub async fn me(OptionalAuth(claims): OptionalAuth) -> Response {
    match claims {
        Some(claims) => Json(claims).into_response(),
        None => "Not Authenticated".into_response(),
    }
}

/// Identity as a resource service sees it.
#[derive(Debug, Serialize)]
pub struct IdentityResponse {
    /// Email when the token carries one, otherwise the subject
    pub user_id: String,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `/api/v1/identity` on a resource service.
pub async fn identity(Auth(claims): Auth) -> Json<IdentityResponse> {
    Json(IdentityResponse {
        user_id: claims.user_identifier().to_string(),
        subject: claims.subject.clone(),
        email: claims.email.clone(),
        name: claims.name.clone(),
    })
}
