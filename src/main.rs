// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::Handle;
use token_bridge::{
    api::gateway_router,
    config::{GatewaySettings, ServerSettings},
    state::GatewayState,
    telemetry,
};

/// In-flight requests get this long to finish after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let server = match ServerSettings::from_env() {
        Ok(server) => server,
        Err(e) => {
            // No subscriber yet: the log format is part of what failed.
            eprintln!("Invalid server configuration: {e}");
            std::process::exit(1);
        }
    };
    telemetry::init(server.log_format);

    let settings = match GatewaySettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Invalid gateway configuration");
            std::process::exit(1);
        }
    };
    let routes = settings.routes.len();

    let state = match GatewayState::from_settings(settings) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build HTTP client");
            std::process::exit(1);
        }
    };
    let app = gateway_router(state);

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    tracing::info!(addr = %server.addr, routes, "Gateway listening");

    if let Err(e) = axum_server::bind(server.addr)
        .handle(handle)
        .serve(app.into_make_service())
        .await
    {
        tracing::error!(error = %e, "Gateway server failed");
        std::process::exit(1);
    }
}

async fn shutdown_on_ctrl_c(handle: Handle<SocketAddr>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutdown signal received, draining connections");
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
    }
}
