// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Liveness probe. Always `{"status":"UP"}` while the process serves requests.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

#[derive(Debug, Serialize)]
pub struct ErrorPage {
    pub status: u16,
    pub error: &'static str,
}

/// Generic error document. Carries no detail about what went wrong.
pub async fn error_page() -> (StatusCode, Json<ErrorPage>) {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (
        status,
        Json(ErrorPage {
            status: status.as_u16(),
            error: "Internal Server Error",
        }),
    )
}
