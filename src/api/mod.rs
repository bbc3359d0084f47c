// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::{
    auth::enforce_access,
    gateway::proxy::proxy,
    state::{GatewayState, ServiceState},
};

pub mod health;
pub mod identity;
pub mod login;

/// Gateway router: login endpoints, `/gw/me`, and the proxy fallback.
///
/// Every route, the fallback included, passes the access policy first.
pub fn gateway_router(state: GatewayState) -> Router {
    let guard = state.guard.clone();

    let routes = Router::new()
        .route("/actuator/health", get(health::health))
        .route("/error", get(health::error_page))
        .route("/gw/me", get(identity::me))
        .route("/login", get(login::login))
        .route("/oauth2/authorization/{provider}", get(login::authorize))
        .route("/login/oauth2/code/{provider}", get(login::callback))
        .fallback(proxy)
        .with_state(state)
        .layer(from_fn_with_state(guard, enforce_access));

    with_http_layers(routes)
}

/// Router of a downstream resource service.
///
/// `business` holds the service's own endpoints; they are protected by the
/// same access policy as the built-in ones.
pub fn resource_router(state: ServiceState, business: Router<ServiceState>) -> Router {
    let guard = state.guard.clone();

    let routes = Router::new()
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/identity", get(identity::identity))
        .merge(business)
        .with_state(state)
        .layer(from_fn_with_state(guard, enforce_access));

    with_http_layers(routes)
}

fn with_http_layers(router: Router) -> Router {
    router
        .layer(CorsLayer::permissive())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
