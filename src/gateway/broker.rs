// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Login success handling: identity in, token redirect out.

use std::sync::Arc;

use axum::{
    http::{header::LOCATION, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::auth::{AuthError, ExternalIdentity, SignedToken, TokenCodec};

/// Fragment key the frontend reads the token from.
const TOKEN_FRAGMENT_KEY: &str = "access_token";

/// Turns a successful provider login into a token-carrying redirect.
///
/// The browser is sent to `<base>#access_token=<token>`; fragments never
/// reach servers, so the token only travels back to the frontend.
pub struct IdentityBroker {
    codec: Arc<TokenCodec>,
    redirect_base: String,
}

impl IdentityBroker {
    /// `redirect_base` is used verbatim; the token is appended to it.
    pub fn new(codec: Arc<TokenCodec>, redirect_base: impl Into<String>) -> Self {
        let redirect_base = redirect_base.into();
        tracing::info!(redirect_base = %redirect_base, "Identity broker initialized");
        Self { codec, redirect_base }
    }

    /// Location for `token`. The token is form-urlencoded, so the result
    /// contains exactly one `#`.
    pub fn redirect_location(&self, token: &SignedToken) -> String {
        let encoded: String = form_urlencoded::byte_serialize(token.as_str().as_bytes()).collect();
        format!("{}#{}={}", self.redirect_base, TOKEN_FRAGMENT_KEY, encoded)
    }

    /// Respond to the end of a provider login.
    ///
    /// `None` means the provider reported success without a usable principal:
    /// the exchange ends with a 500 and no redirect.
    pub fn on_authentication_success(&self, identity: Option<&ExternalIdentity>) -> Response {
        let Some(identity) = identity else {
            tracing::error!("Provider login finished without a principal; cannot issue token");
            return AuthError::IdentityMissing.into_response();
        };

        tracing::info!(subject = %identity.subject, "Provider authentication successful");

        let token = match self.codec.sign(identity) {
            Ok(token) => token,
            Err(e) => {
                tracing::error!(subject = %identity.subject, error = %e, "Token signing failed");
                return AuthError::from(e).into_response();
            }
        };

        let location = match HeaderValue::from_str(&self.redirect_location(&token)) {
            Ok(location) => location,
            Err(_) => {
                tracing::error!(subject = %identity.subject, "Redirect location is not a valid header value");
                return AuthError::Internal.into_response();
            }
        };

        tracing::info!(
            subject = %identity.subject,
            redirect = %format!("{}#{}=[REDACTED]", self.redirect_base, TOKEN_FRAGMENT_KEY),
            "Redirecting to frontend with token"
        );

        (StatusCode::FOUND, [(LOCATION, location)]).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::tests::test_codec;

    fn broker() -> IdentityBroker {
        IdentityBroker::new(Arc::new(test_codec()), "http://localhost:3000/auth/callback")
    }

    fn token_from_location(location: &str) -> String {
        let (_, fragment) = location.split_once('#').unwrap();
        let encoded = fragment.strip_prefix("access_token=").unwrap();
        form_urlencoded::parse(format!("t={encoded}").as_bytes())
            .next()
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn redirects_with_token_in_fragment() {
        let broker = broker();
        let identity = ExternalIdentity::new("u1").with_email("a@x.com").with_name("Alice");

        let response = broker.on_authentication_success(Some(&identity));
        assert_eq!(response.status(), StatusCode::FOUND);

        let location = response.headers()[LOCATION].to_str().unwrap();
        assert!(location.starts_with("http://localhost:3000/auth/callback#access_token="));
        assert_eq!(location.matches('#').count(), 1);

        let claims = test_codec().verify(&token_from_location(location)).unwrap();
        assert_eq!(claims.subject, "u1");
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn missing_identity_is_500_without_location() {
        let response = broker().on_authentication_success(None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get(LOCATION).is_none());
    }

    #[test]
    fn location_percent_encodes_token() {
        let location = broker().redirect_location(&SignedToken::new("a#b&c=d e/+"));
        assert_eq!(location, "http://localhost:3000/auth/callback#access_token=a%23b%26c%3Dd+e%2F%2B");
        assert_eq!(location.matches('#').count(), 1);
    }

    #[test]
    fn base_without_path_is_not_normalized() {
        let broker = IdentityBroker::new(Arc::new(test_codec()), "http://localhost:3000");
        let location = broker.redirect_location(&SignedToken::new("t"));
        assert_eq!(location, "http://localhost:3000#access_token=t");
    }

    #[test]
    fn hostile_claims_cannot_break_the_redirect() {
        let broker = broker();
        let identity = ExternalIdentity::new("u#1&x=y")
            .with_name("Mallory#access_token=forged")
            .with_picture("https://evil.example/#frag");

        let response = broker.on_authentication_success(Some(&identity));
        let location = response.headers()[LOCATION].to_str().unwrap();
        assert_eq!(location.matches('#').count(), 1);

        let claims = test_codec().verify(&token_from_location(location)).unwrap();
        assert_eq!(claims.subject, "u#1&x=y");
        assert_eq!(claims.name.as_deref(), Some("Mallory#access_token=forged"));
    }
}
