// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer credential verification.

use std::sync::Arc;

use axum::http::HeaderValue;

use super::codec::TokenCodec;
use super::{AuthError, TokenClaims};

/// Scheme prefix of a bearer credential.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Authenticates `Authorization` header values against the shared secret.
///
/// Each service builds its own verifier at startup; they never talk to each
/// other or to the gateway.
#[derive(Clone)]
pub struct TokenVerifier {
    codec: Arc<TokenCodec>,
}

impl TokenVerifier {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }

    /// Verify the `Authorization` header of a request.
    pub fn authenticate(&self, header: Option<&HeaderValue>) -> Result<TokenClaims, AuthError> {
        let header = header.ok_or(AuthError::MissingCredential)?;
        let value = header.to_str().map_err(|_| AuthError::InvalidAuthHeader)?;
        self.authenticate_bearer(value)
    }

    /// Verify a `Bearer <token>` credential string.
    pub fn authenticate_bearer(&self, credential: &str) -> Result<TokenClaims, AuthError> {
        let token = credential
            .strip_prefix(BEARER_PREFIX)
            .ok_or(AuthError::InvalidAuthHeader)?
            .trim();

        if token.is_empty() {
            return Err(AuthError::TokenMalformed);
        }

        self.codec.verify(token).map_err(AuthError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::tests::test_codec;
    use crate::auth::ExternalIdentity;
    use chrono::{Duration, Utc};

    fn verifier() -> (TokenVerifier, Arc<TokenCodec>) {
        let codec = Arc::new(test_codec());
        (TokenVerifier::new(codec.clone()), codec)
    }

    #[test]
    fn accepts_valid_bearer() {
        let (verifier, codec) = verifier();
        let token = codec.sign(&ExternalIdentity::new("u1").with_email("a@x.com")).unwrap();
        let header = HeaderValue::from_str(&format!("Bearer {}", token.as_str())).unwrap();

        let claims = verifier.authenticate(Some(&header)).unwrap();
        assert_eq!(claims.subject, "u1");
        assert_eq!(claims.user_identifier(), "a@x.com");
    }

    #[test]
    fn missing_header() {
        let (verifier, _) = verifier();
        assert_eq!(verifier.authenticate(None), Err(AuthError::MissingCredential));
    }

    #[test]
    fn non_bearer_scheme() {
        let (verifier, _) = verifier();
        let header = HeaderValue::from_static("Basic dXNlcjpwYXNz");
        assert_eq!(verifier.authenticate(Some(&header)), Err(AuthError::InvalidAuthHeader));

        // Scheme match is exact
        let lowercase = HeaderValue::from_static("bearer abc");
        assert_eq!(verifier.authenticate(Some(&lowercase)), Err(AuthError::InvalidAuthHeader));
    }

    #[test]
    fn empty_bearer_is_malformed() {
        let (verifier, _) = verifier();
        assert_eq!(verifier.authenticate_bearer("Bearer "), Err(AuthError::TokenMalformed));
        assert_eq!(verifier.authenticate_bearer("Bearer not.a.jwt"), Err(AuthError::TokenMalformed));
    }

    #[test]
    fn expired_token_is_rejected() {
        let (verifier, codec) = verifier();
        let issued = Utc::now() - Duration::hours(2);
        let token = codec.sign_at(&ExternalIdentity::new("u1"), issued).unwrap();

        let result = verifier.authenticate_bearer(&format!("Bearer {}", token.as_str()));
        assert_eq!(result, Err(AuthError::TokenExpired));
    }
}
