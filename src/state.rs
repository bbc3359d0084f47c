// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;

use crate::auth::{AccessGuard, AccessPolicy, TokenCodec, TokenVerifier};
use crate::config::{AuthSettings, GatewaySettings};
use crate::gateway::{IdentityBroker, OAuthClient, Pipeline, RouteTable};

/// Timeout for calls to the identity provider and upstream services.
const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the gateway's handlers share. Built once at start-up.
#[derive(Clone)]
pub struct GatewayState {
    pub guard: AccessGuard,
    pub broker: Arc<IdentityBroker>,
    pub oauth: Arc<OAuthClient>,
    pub pipeline: Arc<Pipeline>,
    pub routes: Arc<RouteTable>,
}

impl GatewayState {
    pub fn from_settings(settings: GatewaySettings) -> Result<Self, reqwest::Error> {
        let codec = Arc::new(codec_for(&settings.auth, settings.token_lifetime_ms));
        let http = reqwest::Client::builder().timeout(OUTBOUND_TIMEOUT).build()?;

        Ok(Self {
            guard: AccessGuard::new(AccessPolicy::gateway(), TokenVerifier::new(codec.clone())),
            broker: Arc::new(IdentityBroker::new(codec, settings.login_success_redirect)),
            oauth: Arc::new(OAuthClient::new(settings.provider, http.clone())),
            pipeline: Arc::new(Pipeline::standard()),
            routes: Arc::new(RouteTable::from_specs(&settings.routes, http)),
        })
    }
}

impl FromRef<GatewayState> for AccessGuard {
    fn from_ref(state: &GatewayState) -> Self {
        state.guard.clone()
    }
}

/// State of a downstream resource service: verification only.
#[derive(Clone)]
pub struct ServiceState {
    pub guard: AccessGuard,
}

impl ServiceState {
    pub fn from_settings(settings: &AuthSettings) -> Self {
        // Resource services never sign, so the lifetime is unused.
        let codec = Arc::new(codec_for(settings, 0));
        Self {
            guard: AccessGuard::new(AccessPolicy::resource_service(), TokenVerifier::new(codec)),
        }
    }
}

impl FromRef<ServiceState> for AccessGuard {
    fn from_ref(state: &ServiceState) -> Self {
        state.guard.clone()
    }
}

fn codec_for(settings: &AuthSettings, lifetime_ms: u64) -> TokenCodec {
    TokenCodec::new(&settings.secret, settings.issuer.clone(), settings.issuer_policy, lifetime_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{ExternalIdentity, Requirement};
    use crate::config::tests::gateway_vars;
    use crate::config::GATEWAY_ROUTES_ENV;

    #[test]
    fn gateway_state_wires_components() {
        let mut vars = gateway_vars();
        vars.insert(GATEWAY_ROUTES_ENV, "/api/v1/=http://tickets:8081".to_string());
        let settings = GatewaySettings::from_lookup(move |k| vars.get(k).cloned()).unwrap();

        let state = GatewayState::from_settings(settings).unwrap();
        assert_eq!(state.routes.len(), 1);
        assert!(state.routes.resolve("/api/v1/create-ticket").is_some());
        assert_eq!(state.pipeline.len(), 1);
        assert_eq!(state.oauth.provider_id(), "google");
        assert_eq!(state.guard.policy().evaluate("/gw/me"), Requirement::Optional);
    }

    #[test]
    fn service_state_verifies_gateway_tokens() {
        let vars = gateway_vars();
        let auth = AuthSettings::from_lookup(|k| vars.get(k).cloned()).unwrap();
        let service = ServiceState::from_settings(&auth);

        let gateway = codec_for(&auth, 60_000);
        let token = gateway.sign(&ExternalIdentity::new("u1")).unwrap();
        let claims = service.guard.verifier().authenticate_bearer(&format!("Bearer {}", token.as_str())).unwrap();
        assert_eq!(claims.subject, "u1");
        assert_eq!(service.guard.policy().evaluate("/api/v1/health"), Requirement::Public);
    }
}
