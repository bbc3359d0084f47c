// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Token Bridge - OAuth2 login gateway with shared-secret bearer tokens
//!
//! The gateway signs users in with an external OAuth2 provider, mints an
//! HS512 token for them, and forwards that token on every proxied call.
//! Downstream resource services verify the token on their own with the same
//! shared secret; no service keeps session state.
//!
//! ## Modules
//!
//! - `api` - HTTP routers and handlers (Axum)
//! - `auth` - Token codec, verification, access policy and extractors
//! - `gateway` - Provider login, identity broker, filter pipeline and proxy
//! - `config` - Environment configuration
//! - `telemetry` - Tracing subscriber set-up

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod state;
pub mod telemetry;
