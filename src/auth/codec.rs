// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS512 token signing and verification.
//!
//! Tokens are standard compact JWTs signed with HMAC-SHA512 over the UTF-8
//! bytes of the shared [`ServiceSecret`]. Verification needs nothing but the
//! token and the secret, so every service can run it independently.
//!
//! Expiry is checked here rather than by `jsonwebtoken`: a token is expired
//! as soon as `now >= exp`, with no leeway.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{ExternalIdentity, SignedToken, TokenClaims};
use super::secret::ServiceSecret;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Whether `iss` must match the configured issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuerPolicy {
    /// Reject tokens from any other issuer
    Enforce,
    /// Carry `iss` without checking it
    Informational,
}

/// Why a token was not accepted (or could not be produced).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Signs and verifies tokens with the shared secret.
///
/// Immutable after construction; share it behind an `Arc`.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    lifetime_ms: u64,
}

impl TokenCodec {
    /// Build a codec for `issuer`.
    ///
    /// `lifetime_ms` only matters for services that sign (the gateway).
    pub fn new(secret: &ServiceSecret, issuer: impl Into<String>, issuer_policy: IssuerPolicy, lifetime_ms: u64) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        if issuer_policy == IssuerPolicy::Enforce {
            validation.set_issuer(&[issuer.as_str()]);
        }

        tracing::info!(
            algorithm = ?ALGORITHM,
            issuer = %issuer,
            ?issuer_policy,
            "Token codec initialized"
        );

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            issuer,
            lifetime_ms,
        }
    }

    /// Mint a token for `identity`, issued now.
    pub fn sign(&self, identity: &ExternalIdentity) -> Result<SignedToken, TokenError> {
        self.sign_at(identity, Utc::now())
    }

    /// Mint a token for `identity`, issued at `now`.
    pub fn sign_at(&self, identity: &ExternalIdentity, now: DateTime<Utc>) -> Result<SignedToken, TokenError> {
        let claims = TokenClaims::for_identity(identity, &self.issuer, now.timestamp_millis(), self.lifetime_ms);
        self.sign_claims(&claims)
    }

    /// Sign an already built claim set.
    pub fn sign_claims(&self, claims: &TokenClaims) -> Result<SignedToken, TokenError> {
        let token = encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        tracing::debug!(subject = %claims.subject, expires_at = claims.expires_at, "Signed token");
        Ok(SignedToken::new(token))
    }

    /// Verify `token` against the current time.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify `token` as of `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
            _ => TokenError::Malformed,
        })?;

        let claims = data.claims;
        if now.timestamp() >= claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::tests::TEST_SECRET;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use chrono::{Duration, TimeZone};

    pub(crate) const ONE_HOUR_MS: u64 = 3_600_000;

    pub(crate) fn test_codec() -> TokenCodec {
        codec_with(TEST_SECRET, "api-gateway", IssuerPolicy::Enforce)
    }

    fn codec_with(secret: &str, issuer: &str, policy: IssuerPolicy) -> TokenCodec {
        TokenCodec::new(&ServiceSecret::new(secret).unwrap(), issuer, policy, ONE_HOUR_MS)
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn payload_json(token: &SignedToken) -> serde_json::Value {
        let payload = token.as_str().split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
    }

    #[test]
    fn signs_alice_without_picture() {
        let codec = test_codec();
        let identity = ExternalIdentity::new("u1").with_email("a@x.com").with_name("Alice");

        let token = codec.sign(&identity).unwrap();
        let claims = codec.verify(token.as_str()).unwrap();

        assert_eq!(claims.subject, "u1");
        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
        assert_eq!(claims.name.as_deref(), Some("Alice"));
        assert_eq!(claims.picture, None);
        assert_eq!(claims.expires_at - claims.issued_at, 3600);

        let raw = payload_json(&token);
        assert!(raw.get("picture").is_none());
        assert_eq!(raw["exp"].as_i64().unwrap() - raw["iat"].as_i64().unwrap(), 3600);
    }

    #[test]
    fn header_declares_hs512() {
        let token = test_codec().sign(&ExternalIdentity::new("u1")).unwrap();
        let header = jsonwebtoken::decode_header(token.as_str()).unwrap();
        assert_eq!(header.alg, Algorithm::HS512);
    }

    #[test]
    fn round_trips_every_attribute_subset() {
        let codec = test_codec();
        for mask in 0..8u8 {
            let mut identity = ExternalIdentity::new(format!("subject-{mask}"));
            if mask & 1 != 0 {
                identity = identity.with_email("e@x.com");
            }
            if mask & 2 != 0 {
                identity = identity.with_name("Name With Spaces & ümlauts");
            }
            if mask & 4 != 0 {
                identity = identity.with_picture("https://cdn.example.com/p.png?s=96#frag");
            }

            let token = codec.sign_at(&identity, t0()).unwrap();
            let claims = codec.verify_at(token.as_str(), t0()).unwrap();

            assert_eq!(claims.subject, identity.subject);
            assert_eq!(claims.issuer, "api-gateway");
            assert_eq!(claims.email, identity.email);
            assert_eq!(claims.name, identity.name);
            assert_eq!(claims.picture, identity.picture);

            let raw = payload_json(&token);
            for (bit, key) in [(1u8, "email"), (2, "name"), (4, "picture")] {
                assert_eq!(raw.get(key).is_some(), mask & bit != 0, "mask {mask} key {key}");
            }
        }
    }

    #[test]
    fn valid_until_expiry_then_expired() {
        let codec = test_codec();
        let token = codec.sign_at(&ExternalIdentity::new("u1"), t0()).unwrap();

        for probe in [0, 1, 1800, 3599] {
            let at = t0() + Duration::seconds(probe);
            assert!(codec.verify_at(token.as_str(), at).is_ok(), "probe {probe}s");
        }
        for probe in [3600, 3601, 86_400] {
            let at = t0() + Duration::seconds(probe);
            assert_eq!(codec.verify_at(token.as_str(), at), Err(TokenError::Expired), "probe {probe}s");
        }
    }

    #[test]
    fn any_character_change_is_rejected() {
        let codec = test_codec();
        let identity = ExternalIdentity::new("u1").with_email("a@x.com");
        let token = codec.sign_at(&identity, t0()).unwrap().into_string();

        for (index, original) in token.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered = token.clone();
            tampered.replace_range(index..index + original.len_utf8(), &replacement.to_string());

            let result = codec.verify_at(&tampered, t0());
            assert!(
                matches!(result, Err(TokenError::SignatureInvalid) | Err(TokenError::Malformed)),
                "position {index} accepted: {result:?}"
            );
        }
    }

    #[test]
    fn forged_payload_fails_signature() {
        let codec = test_codec();
        let token = codec.sign_at(&ExternalIdentity::new("u1"), t0()).unwrap().into_string();
        let parts: Vec<&str> = token.split('.').collect();

        let mut payload = payload_json(&SignedToken::new(token.clone()));
        payload["sub"] = serde_json::Value::String("admin".to_string());
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&payload).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert_eq!(codec.verify_at(&forged, t0()), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn different_secret_fails_signature() {
        let token = test_codec().sign_at(&ExternalIdentity::new("u1"), t0()).unwrap();
        let other = codec_with(
            "another-secret-that-is-long-enough-for-hs512-signing-fedcba9876543210",
            "api-gateway",
            IssuerPolicy::Enforce,
        );
        assert_eq!(other.verify_at(token.as_str(), t0()), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = test_codec();
        for garbage in ["", "not-a-token", "a.b", "a.b.c", "....", "Bearer x.y.z"] {
            assert_eq!(codec.verify_at(garbage, t0()), Err(TokenError::Malformed), "{garbage:?}");
        }
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let claims = TokenClaims::for_identity(&ExternalIdentity::new("u1"), "api-gateway", t0().timestamp_millis(), ONE_HOUR_MS);
        let hs256 = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(test_codec().verify_at(&hs256, t0()), Err(TokenError::Malformed));
    }

    #[test]
    fn missing_subject_is_malformed() {
        let payload = serde_json::json!({ "iss": "api-gateway", "iat": 1_700_000_000, "exp": 1_700_003_600 });
        let token = encode(
            &Header::new(Algorithm::HS512),
            &payload,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(test_codec().verify_at(&token, t0()), Err(TokenError::Malformed));
    }

    #[test]
    fn issuer_enforced_by_default() {
        let foreign = codec_with(TEST_SECRET, "someone-else", IssuerPolicy::Enforce);
        let token = foreign.sign_at(&ExternalIdentity::new("u1"), t0()).unwrap();

        assert_eq!(test_codec().verify_at(token.as_str(), t0()), Err(TokenError::IssuerMismatch));

        let lenient = codec_with(TEST_SECRET, "api-gateway", IssuerPolicy::Informational);
        let claims = lenient.verify_at(token.as_str(), t0()).unwrap();
        assert_eq!(claims.issuer, "someone-else");
    }

    #[test]
    fn signing_is_deterministic_for_same_instant() {
        let codec = test_codec();
        let identity = ExternalIdentity::new("u1").with_name("Alice");
        let a = codec.sign_at(&identity, t0()).unwrap();
        let b = codec.sign_at(&identity, t0()).unwrap();
        assert_eq!(a, b);

        let later = codec.sign_at(&identity, t0() + Duration::seconds(5)).unwrap();
        assert_ne!(a, later);
    }
}
