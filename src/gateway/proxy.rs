// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request forwarding to downstream services.
//!
//! Requests the gateway does not serve itself are matched against the route
//! table (first prefix match wins), copied into an [`OutboundRequest`], run
//! through the filter [`Pipeline`](super::filter::Pipeline) and sent upstream.
//! There are no retries: if the client goes away, the in-flight upstream call
//! is dropped with it.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::{Request, State},
    http::{header, request::Parts, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use url::Url;

use super::filter::{BoxFuture, Exchange, OutboundRequest};
use crate::config::RouteSpec;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Largest request body the gateway buffers for forwarding (10 MiB).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Connection-scoped headers that are never copied between hops.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Where a proxied request ends up.
pub trait Upstream: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Response>;
}

/// Upstream reached over HTTP.
pub struct HttpUpstream {
    client: reqwest::Client,
    base: Url,
}

impl HttpUpstream {
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    fn target(&self, path_and_query: &str) -> Result<Url, url::ParseError> {
        let base = self.base.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path_and_query}"))
    }

    async fn forward(&self, request: OutboundRequest) -> Result<Response, ApiError> {
        let target = self.target(&request.path_and_query).map_err(|e| {
            tracing::warn!(error = %e, "Could not build upstream URL");
            ApiError::bad_gateway("Upstream service unavailable")
        })?;

        let upstream = self
            .client
            .request(request.method, target.clone())
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(upstream = %target, error = %e, "Upstream request failed");
                ApiError::bad_gateway("Upstream service unavailable")
            })?;

        let status = upstream.status();
        let headers = end_to_end(upstream.headers());
        let body = upstream.bytes().await.map_err(|e| {
            tracing::warn!(upstream = %target, error = %e, "Upstream response body failed");
            ApiError::bad_gateway("Upstream service unavailable")
        })?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

impl Upstream for HttpUpstream {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Response> {
        Box::pin(async move { self.forward(request).await.unwrap_or_else(IntoResponse::into_response) })
    }
}

/// Prefix routes, checked in order.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<(String, Arc<dyn Upstream>)>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP upstreams for every configured route, sharing one client.
    pub fn from_specs(specs: &[RouteSpec], client: reqwest::Client) -> Self {
        specs.iter().fold(Self::new(), |table, spec| {
            table.with_route(
                spec.prefix.clone(),
                Arc::new(HttpUpstream::new(client.clone(), spec.upstream.clone())),
            )
        })
    }

    pub fn with_route(mut self, prefix: impl Into<String>, upstream: Arc<dyn Upstream>) -> Self {
        self.routes.push((prefix.into(), upstream));
        self
    }

    pub fn resolve(&self, path: &str) -> Option<Arc<dyn Upstream>> {
        self.routes
            .iter()
            .find(|(prefix, _)| path.starts_with(prefix.as_str()))
            .map(|(_, upstream)| upstream.clone())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Copy of `headers` without hop-by-hop headers, `Host` and `Content-Length`.
fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    let mut copy = headers.clone();
    for name in HOP_BY_HOP.iter().chain([&header::HOST, &header::CONTENT_LENGTH]) {
        copy.remove(name);
    }
    copy
}

/// Downstream request mirroring the inbound one.
pub fn outbound_request(parts: &Parts, body: Bytes) -> OutboundRequest {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| parts.uri.path().to_string());

    OutboundRequest {
        method: parts.method.clone(),
        path_and_query,
        headers: end_to_end(&parts.headers),
        body,
    }
}

/// Fallback handler: forward anything the gateway does not serve itself.
pub async fn proxy(State(state): State<GatewayState>, request: Request) -> Response {
    let path = request.uri().path().to_string();
    let Some(upstream) = state.routes.resolve(&path) else {
        tracing::debug!(path = %path, "No gateway route");
        return ApiError::not_found("No route for this path").into_response();
    };

    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(_) => {
            return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let exchange = Exchange {
        inbound_headers: parts.headers.clone(),
        outbound: outbound_request(&parts, body),
    };
    state.pipeline.run(exchange, upstream.as_ref()).await
}
