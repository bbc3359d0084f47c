// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Shared HMAC secret.

use std::fmt;
use std::sync::Arc;

use crate::config::ConfigError;

/// HS512 keys shorter than the hash output are rejected.
pub const MIN_SECRET_BYTES: usize = 64;

/// Symmetric key shared by the gateway and every resource service.
///
/// The same value must be deployed everywhere: a service holding a different
/// secret rejects every token the gateway issues. Never printed.
#[derive(Clone)]
pub struct ServiceSecret(Arc<[u8]>);

impl ServiceSecret {
    /// Wrap the UTF-8 bytes of `secret`.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::WeakSecret {
                min_bytes: MIN_SECRET_BYTES,
            });
        }
        Ok(Self(Arc::from(secret.into_bytes())))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ServiceSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServiceSecret([REDACTED])")
    }
}
