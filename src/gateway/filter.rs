// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway filter pipeline.
//!
//! A proxied request passes through an ordered list of [`GatewayFilter`]s
//! before reaching its [`Upstream`]. Each filter gets the exchange and the
//! rest of the chain, and decides what to hand on:
//!
//! ```text
//! inbound ──▶ filter(order 1) ──▶ filter(order 2) ──▶ ... ──▶ upstream
//! ```
//!
//! The pipeline is built once at startup and sorted by [`GatewayFilter::order`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::{
    body::Bytes,
    http::{header::AUTHORIZATION, HeaderMap, Method},
    response::Response,
};

use crate::auth::verifier::BEARER_PREFIX;

use super::proxy::Upstream;

/// Boxed future returned by filters and upstreams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Request about to be sent downstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Path plus optional query, e.g. `/api/v1/create-ticket?dry_run=1`
    pub path_and_query: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One proxied request: what the client sent and what goes downstream.
#[derive(Debug, Clone)]
pub struct Exchange {
    /// Headers exactly as received from the client
    pub inbound_headers: HeaderMap,
    pub outbound: OutboundRequest,
}

impl Exchange {
    pub fn path(&self) -> &str {
        let pq = self.outbound.path_and_query.as_str();
        pq.split_once('?').map(|(path, _)| path).unwrap_or(pq)
    }
}

/// A stage of the gateway pipeline.
pub trait GatewayFilter: Send + Sync {
    /// Lower runs first.
    fn order(&self) -> i32;

    fn filter<'a>(&'a self, exchange: Exchange, chain: FilterChain<'a>) -> BoxFuture<'a, Response>;
}

/// The remaining filters plus the upstream at the end.
pub struct FilterChain<'a> {
    filters: &'a [Arc<dyn GatewayFilter>],
    upstream: &'a dyn Upstream,
}

impl<'a> FilterChain<'a> {
    /// Run the next stage.
    pub fn filter(self, exchange: Exchange) -> BoxFuture<'a, Response> {
        match self.filters.split_first() {
            Some((first, rest)) => first.filter(
                exchange,
                FilterChain {
                    filters: rest,
                    upstream: self.upstream,
                },
            ),
            None => self.upstream.send(exchange.outbound),
        }
    }
}

/// Ordered filters, composed once at startup.
#[derive(Clone, Default)]
pub struct Pipeline {
    filters: Vec<Arc<dyn GatewayFilter>>,
}

impl Pipeline {
    pub fn new(mut filters: Vec<Arc<dyn GatewayFilter>>) -> Self {
        filters.sort_by_key(|f| f.order());
        Self { filters }
    }

    /// The gateway's standard pipeline.
    pub fn standard() -> Self {
        Self::new(vec![Arc::new(AuthHeaderForwarder)])
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `exchange` through every filter and into `upstream`.
    pub fn run<'a>(&'a self, exchange: Exchange, upstream: &'a dyn Upstream) -> BoxFuture<'a, Response> {
        FilterChain {
            filters: &self.filters,
            upstream,
        }
        .filter(exchange)
    }
}

/// Keeps the client's bearer credential on the downstream request.
///
/// A `Bearer` header is explicitly set on the outbound request so no earlier
/// mutation can lose it. Any other header, or none, is left alone. This
/// filter never rejects; access decisions belong to the access policy.
pub struct AuthHeaderForwarder;

impl AuthHeaderForwarder {
    pub const ORDER: i32 = 1;
}

impl GatewayFilter for AuthHeaderForwarder {
    fn order(&self) -> i32 {
        Self::ORDER
    }

    fn filter<'a>(&'a self, mut exchange: Exchange, chain: FilterChain<'a>) -> BoxFuture<'a, Response> {
        match exchange.inbound_headers.get(AUTHORIZATION).cloned() {
            Some(value) if value.as_bytes().starts_with(BEARER_PREFIX.as_bytes()) => {
                tracing::debug!(path = %exchange.path(), "Authorization Bearer header found, forwarding downstream");
                exchange.outbound.headers.insert(AUTHORIZATION, value);
            }
            Some(_) => {
                tracing::debug!(path = %exchange.path(), "Authorization header is not a Bearer token, not forwarding");
            }
            None => {
                tracing::debug!(path = %exchange.path(), "No Authorization header found");
            }
        }
        chain.filter(exchange)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{http::HeaderValue, http::StatusCode, response::IntoResponse};
    use std::sync::Mutex;

    /// Upstream that records what it was sent.
    #[derive(Default)]
    pub(crate) struct RecordingUpstream {
        pub(crate) received: Mutex<Vec<OutboundRequest>>,
    }

    impl Upstream for RecordingUpstream {
        fn send(&self, request: OutboundRequest) -> BoxFuture<'_, Response> {
            self.received.lock().unwrap().push(request);
            Box::pin(async { StatusCode::OK.into_response() })
        }
    }

    fn exchange(inbound: &[(&'static str, &'static str)], outbound: &[(&'static str, &'static str)]) -> Exchange {
        let to_map = |pairs: &[(&'static str, &'static str)]| {
            let mut map = HeaderMap::new();
            for (name, value) in pairs {
                map.append(*name, HeaderValue::from_static(value));
            }
            map
        };
        Exchange {
            inbound_headers: to_map(inbound),
            outbound: OutboundRequest {
                method: Method::GET,
                path_and_query: "/api/v1/create-ticket?x=1".to_string(),
                headers: to_map(outbound),
                body: Bytes::new(),
            },
        }
    }

    async fn forwarded_authorization(exchange: Exchange) -> Option<HeaderValue> {
        let upstream = RecordingUpstream::default();
        let pipeline = Pipeline::standard();
        let response = pipeline.run(exchange, &upstream).await;
        assert_eq!(response.status(), StatusCode::OK);

        let received = upstream.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let authorization = received[0].headers.get(AUTHORIZATION).cloned();
        authorization
    }

    #[tokio::test]
    async fn bearer_header_is_forwarded_exactly() {
        let ex = exchange(&[("authorization", "Bearer X")], &[("authorization", "Bearer X")]);
        assert_eq!(forwarded_authorization(ex).await.unwrap(), "Bearer X");
    }

    #[tokio::test]
    async fn bearer_header_survives_earlier_removal() {
        let ex = exchange(&[("authorization", "Bearer abc.def.ghi")], &[]);
        assert_eq!(forwarded_authorization(ex).await.unwrap(), "Bearer abc.def.ghi");
    }

    #[tokio::test]
    async fn basic_header_is_left_unchanged() {
        let ex = exchange(&[("authorization", "Basic Y")], &[("authorization", "Basic Y")]);
        assert_eq!(forwarded_authorization(ex).await.unwrap(), "Basic Y");
    }

    #[tokio::test]
    async fn missing_header_stays_missing() {
        let ex = exchange(&[], &[]);
        assert!(forwarded_authorization(ex).await.is_none());
    }

    struct Tag(i32, &'static str);

    impl GatewayFilter for Tag {
        fn order(&self) -> i32 {
            self.0
        }

        fn filter<'a>(&'a self, mut exchange: Exchange, chain: FilterChain<'a>) -> BoxFuture<'a, Response> {
            exchange.outbound.headers.append("x-trail", HeaderValue::from_static(self.1));
            chain.filter(exchange)
        }
    }

    struct ShortCircuit;

    impl GatewayFilter for ShortCircuit {
        fn order(&self) -> i32 {
            0
        }

        fn filter<'a>(&'a self, _exchange: Exchange, _chain: FilterChain<'a>) -> BoxFuture<'a, Response> {
            Box::pin(async { StatusCode::TOO_MANY_REQUESTS.into_response() })
        }
    }

    #[tokio::test]
    async fn filters_run_in_order() {
        let pipeline = Pipeline::new(vec![Arc::new(Tag(3, "c")), Arc::new(Tag(1, "a")), Arc::new(Tag(2, "b"))]);
        let upstream = RecordingUpstream::default();
        pipeline.run(exchange(&[], &[]), &upstream).await;

        let received = upstream.received.lock().unwrap();
        let trail: Vec<_> = received[0].headers.get_all("x-trail").iter().map(|v| v.to_str().unwrap()).collect();
        assert_eq!(trail, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn filter_can_stop_the_chain() {
        let pipeline = Pipeline::new(vec![Arc::new(AuthHeaderForwarder), Arc::new(ShortCircuit)]);
        let upstream = RecordingUpstream::default();
        let response = pipeline.run(exchange(&[], &[]), &upstream).await;

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(upstream.received.lock().unwrap().is_empty());
    }

    #[test]
    fn exchange_path_drops_query() {
        assert_eq!(exchange(&[], &[]).path(), "/api/v1/create-ticket");
    }
}
