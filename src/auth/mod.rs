// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Shared-secret bearer token authentication, used identically by the gateway
//! and every downstream resource service.
//!
//! ## Auth Flow
//!
//! 1. The gateway completes an OAuth2 login and mints an HS512 token
//!    ([`TokenCodec::sign`])
//! 2. The browser sends `Authorization: Bearer <token>` on every call
//! 3. Each service, on its own:
//!    - Looks up the route in its [`AccessPolicy`]
//!    - Verifies signature, issuer and expiry ([`TokenVerifier`])
//!    - Attaches the [`TokenClaims`] to the request
//!
//! ## Security
//!
//! - Unmatched paths require authentication
//! - Verification is a pure function of token and secret; there is no
//!   session store
//! - Token values and the secret are never logged

pub mod claims;
pub mod codec;
pub mod error;
pub mod extractor;
pub mod middleware;
pub mod policy;
pub mod secret;
pub mod verifier;

pub use claims::{ExternalIdentity, SignedToken, TokenClaims};
pub use codec::{IssuerPolicy, TokenCodec, TokenError};
pub use error::AuthError;
pub use extractor::{Auth, OptionalAuth};
pub use middleware::{enforce_access, AccessGuard};
pub use policy::{AccessPolicy, AccessRule, PathPattern, Requirement};
pub use secret::ServiceSecret;
pub use verifier::TokenVerifier;
