// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway
//!
//! The single entry point in front of the downstream services:
//!
//! - [`oauth`]: provider login (authorization redirect and callback)
//! - [`broker`]: turns a provider identity into a signed token redirect
//! - [`filter`]: ordered filters applied to every proxied request
//! - [`proxy`]: route table and HTTP forwarding

pub mod broker;
pub mod filter;
pub mod oauth;
pub mod proxy;

pub use broker::IdentityBroker;
pub use filter::{AuthHeaderForwarder, Exchange, FilterChain, GatewayFilter, OutboundRequest, Pipeline};
pub use oauth::{AuthorizationRequest, CallbackParams, LoginError, OAuthClient};
pub use proxy::{HttpUpstream, RouteTable, Upstream};
