// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Identity and token claim types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attributes the identity provider returned for a successful login.
///
/// Lives only for the duration of the login-success handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Stable provider subject identifier
    pub subject: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl ExternalIdentity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            email: None,
            name: None,
            picture: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }

    /// Build from a provider user-info document.
    ///
    /// The subject comes from `subject_attribute` and may be a string or a
    /// number (some providers use numeric ids). Returns `None` when the
    /// document has no usable subject. Optional attributes are copied only
    /// when they are strings.
    pub fn from_attributes(attributes: &Map<String, Value>, subject_attribute: &str) -> Option<Self> {
        let subject = match attributes.get(subject_attribute)? {
            Value::String(s) if !s.trim().is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };

        let text = |key: &str| attributes.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            subject,
            email: text("email"),
            name: text("name"),
            picture: text("picture"),
        })
    }
}

/// Claim set carried by every token.
///
/// Optional attributes are omitted from the encoded token when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(rename = "sub")]
    pub subject: String,

    #[serde(rename = "iss")]
    pub issuer: String,

    /// Issued at (Unix seconds)
    #[serde(rename = "iat")]
    pub issued_at: i64,

    /// Expiration (Unix seconds)
    #[serde(rename = "exp")]
    pub expires_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

impl TokenClaims {
    /// Claims for `identity`, issued at `issued_at_ms` and valid for
    /// `lifetime_ms`. Both timestamps are truncated to whole seconds.
    pub fn for_identity(
        identity: &ExternalIdentity,
        issuer: &str,
        issued_at_ms: i64,
        lifetime_ms: u64,
    ) -> Self {
        let lifetime_ms = i64::try_from(lifetime_ms).unwrap_or(i64::MAX);
        Self {
            subject: identity.subject.clone(),
            issuer: issuer.to_string(),
            issued_at: issued_at_ms.div_euclid(1000),
            expires_at: issued_at_ms.saturating_add(lifetime_ms).div_euclid(1000),
            email: identity.email.clone(),
            name: identity.name.clone(),
            picture: identity.picture.clone(),
        }
    }

    /// Identifier used when logging on behalf of the user: email if present,
    /// otherwise subject.
    pub fn user_identifier(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.subject)
    }
}

/// Compact signed token. `Debug` never shows the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignedToken([REDACTED])")
    }
}
