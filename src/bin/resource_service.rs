// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Reference downstream resource service.
//!
//! Verifies gateway-issued tokens with the shared secret and serves
//! `/api/v1/health` and `/api/v1/identity`. Real services pass their own
//! endpoints to [`resource_router`].

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use token_bridge::{
    api::resource_router,
    config::{AuthSettings, ServerSettings},
    state::ServiceState,
    telemetry,
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let server = match ServerSettings::from_env() {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Invalid server configuration: {e}");
            std::process::exit(1);
        }
    };
    telemetry::init(server.log_format);

    let auth = match AuthSettings::from_env() {
        Ok(auth) => auth,
        Err(e) => {
            tracing::error!(error = %e, "Invalid token configuration");
            std::process::exit(1);
        }
    };

    let app = resource_router(ServiceState::from_settings(&auth), Router::new());

    let handle: Handle<SocketAddr> = Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, draining connections");
            shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
        }
    });

    tracing::info!(addr = %server.addr, "Resource service listening");

    if let Err(e) = axum_server::bind(server.addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!(error = %e, "Resource service failed");
        std::process::exit(1);
    }
}
