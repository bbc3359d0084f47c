// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! validated settings structs used throughout the application. Configuration
//! is loaded from the environment once at startup; a missing or blank
//! required value aborts the process before any listener is bound.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | Shared HS512 secret (all services) | Required |
//! | `JWT_ISSUER` | Issuer written to / expected in `iss` | Required |
//! | `JWT_ENFORCE_ISSUER` | Reject tokens whose `iss` differs | `true` |
//! | `JWT_EXPIRATION_MS` | Token lifetime in milliseconds (gateway) | Required |
//! | `FRONTEND_LOGIN_SUCCESS_REDIRECT_URI` | Where the browser lands after login (gateway) | Required |
//! | `OAUTH2_PROVIDER_ID` | Provider registration id used in login paths | `google` |
//! | `OAUTH2_CLIENT_ID` | OAuth2 client id | Required (gateway) |
//! | `OAUTH2_CLIENT_SECRET` | OAuth2 client secret | Required (gateway) |
//! | `OAUTH2_AUTHORIZATION_URI` | Provider authorization endpoint | Google |
//! | `OAUTH2_TOKEN_URI` | Provider token endpoint | Google |
//! | `OAUTH2_USER_INFO_URI` | Provider user-info endpoint | Google |
//! | `OAUTH2_REDIRECT_URI` | Callback URL registered at the provider | Required (gateway) |
//! | `OAUTH2_SCOPES` | Space separated scopes | `openid email profile` |
//! | `OAUTH2_USER_NAME_ATTRIBUTE` | User-info attribute holding the subject | `sub` |
//! | `GATEWAY_ROUTES` | `prefix=url` pairs, comma separated | empty |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;

use url::Url;

use crate::auth::codec::IssuerPolicy;
use crate::auth::secret::ServiceSecret;
use crate::telemetry::LogFormat;

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_ENFORCE_ISSUER_ENV: &str = "JWT_ENFORCE_ISSUER";
pub const JWT_EXPIRATION_MS_ENV: &str = "JWT_EXPIRATION_MS";
pub const LOGIN_SUCCESS_REDIRECT_ENV: &str = "FRONTEND_LOGIN_SUCCESS_REDIRECT_URI";

pub const OAUTH2_PROVIDER_ID_ENV: &str = "OAUTH2_PROVIDER_ID";
pub const OAUTH2_CLIENT_ID_ENV: &str = "OAUTH2_CLIENT_ID";
pub const OAUTH2_CLIENT_SECRET_ENV: &str = "OAUTH2_CLIENT_SECRET";
pub const OAUTH2_AUTHORIZATION_URI_ENV: &str = "OAUTH2_AUTHORIZATION_URI";
pub const OAUTH2_TOKEN_URI_ENV: &str = "OAUTH2_TOKEN_URI";
pub const OAUTH2_USER_INFO_URI_ENV: &str = "OAUTH2_USER_INFO_URI";
pub const OAUTH2_REDIRECT_URI_ENV: &str = "OAUTH2_REDIRECT_URI";
pub const OAUTH2_SCOPES_ENV: &str = "OAUTH2_SCOPES";
pub const OAUTH2_USER_NAME_ATTRIBUTE_ENV: &str = "OAUTH2_USER_NAME_ATTRIBUTE";

pub const GATEWAY_ROUTES_ENV: &str = "GATEWAY_ROUTES";

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROVIDER_ID: &str = "google";
const DEFAULT_SCOPES: &str = "openid email profile";
const DEFAULT_USER_NAME_ATTRIBUTE: &str = "sub";

const GOOGLE_AUTHORIZATION_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URI: &str = "https://www.googleapis.com/oauth2/v4/token";
const GOOGLE_USER_INFO_URI: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

/// Startup configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {0} must not be blank")]
    Blank(&'static str),
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("JWT secret must be at least {min_bytes} bytes for HS512")]
    WeakSecret { min_bytes: usize },
}

/// Reads configuration values by name.
///
/// Production code passes `std::env::var`; tests pass a map.
trait Lookup {
    fn get(&self, key: &str) -> Option<String>;

    fn required(&self, key: &'static str) -> Result<String, ConfigError> {
        let value = self.get(key).ok_or(ConfigError::Missing(key))?;
        if value.trim().is_empty() {
            return Err(ConfigError::Blank(key));
        }
        Ok(value)
    }

    /// Unset and blank both fall back to the default.
    fn optional(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.trim().is_empty())
    }
}

impl<F> Lookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        self(key)
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

// =============================================================================
// Token settings (every service)
// =============================================================================

/// Token settings shared by the gateway and every resource service.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: ServiceSecret,
    pub issuer: String,
    pub issuer_policy: IssuerPolicy,
}

impl AuthSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::load(&lookup)
    }

    fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let secret = ServiceSecret::new(lookup.required(JWT_SECRET_ENV)?)?;
        let issuer = lookup.required(JWT_ISSUER_ENV)?.trim().to_string();

        let enforce = match lookup.optional(JWT_ENFORCE_ISSUER_ENV) {
            Some(raw) => parse_bool(JWT_ENFORCE_ISSUER_ENV, &raw)?,
            None => true,
        };

        Ok(Self {
            secret,
            issuer,
            issuer_policy: if enforce {
                IssuerPolicy::Enforce
            } else {
                IssuerPolicy::Informational
            },
        })
    }
}

// =============================================================================
// Gateway settings
// =============================================================================

/// OAuth2 provider registration.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub provider_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub authorization_uri: Url,
    pub token_uri: Url,
    pub user_info_uri: Url,
    pub redirect_uri: Url,
    pub scopes: Vec<String>,
    pub user_name_attribute: String,
}

impl ProviderSettings {
    fn load(lookup: &impl Lookup) -> Result<Self, ConfigError> {
        let url_or_default = |var: &'static str, default: &str| -> Result<Url, ConfigError> {
            let raw = lookup.optional(var).unwrap_or_else(|| default.to_string());
            parse_url(var, &raw)
        };

        let scopes = lookup
            .optional(OAUTH2_SCOPES_ENV)
            .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
            .split_whitespace()
            .map(str::to_string)
            .collect();

        Ok(Self {
            provider_id: lookup
                .optional(OAUTH2_PROVIDER_ID_ENV)
                .unwrap_or_else(|| DEFAULT_PROVIDER_ID.to_string()),
            client_id: lookup.required(OAUTH2_CLIENT_ID_ENV)?,
            client_secret: lookup.required(OAUTH2_CLIENT_SECRET_ENV)?,
            authorization_uri: url_or_default(OAUTH2_AUTHORIZATION_URI_ENV, GOOGLE_AUTHORIZATION_URI)?,
            token_uri: url_or_default(OAUTH2_TOKEN_URI_ENV, GOOGLE_TOKEN_URI)?,
            user_info_uri: url_or_default(OAUTH2_USER_INFO_URI_ENV, GOOGLE_USER_INFO_URI)?,
            redirect_uri: parse_url(OAUTH2_REDIRECT_URI_ENV, &lookup.required(OAUTH2_REDIRECT_URI_ENV)?)?,
            scopes,
            user_name_attribute: lookup
                .optional(OAUTH2_USER_NAME_ATTRIBUTE_ENV)
                .unwrap_or_else(|| DEFAULT_USER_NAME_ATTRIBUTE.to_string()),
        })
    }
}

/// A gateway route: requests whose path starts with `prefix` go to `upstream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSpec {
    pub prefix: String,
    pub upstream: Url,
}

impl RouteSpec {
    /// Parse `prefix=url[,prefix=url...]`.
    pub fn parse_list(raw: &str) -> Result<Vec<Self>, ConfigError> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (prefix, upstream) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                    var: GATEWAY_ROUTES_ENV,
                    reason: format!("route '{entry}' is not of the form prefix=url"),
                })?;
                let prefix = prefix.trim();
                if !prefix.starts_with('/') {
                    return Err(ConfigError::Invalid {
                        var: GATEWAY_ROUTES_ENV,
                        reason: format!("route prefix '{prefix}' must start with '/'"),
                    });
                }
                Ok(Self {
                    prefix: prefix.to_string(),
                    upstream: parse_url(GATEWAY_ROUTES_ENV, upstream)?,
                })
            })
            .collect()
    }
}

/// Everything the gateway needs beyond [`AuthSettings`].
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub auth: AuthSettings,
    pub token_lifetime_ms: u64,
    /// Absolute URL without fragment, kept exactly as configured
    pub login_success_redirect: String,
    pub provider: ProviderSettings,
    pub routes: Vec<RouteSpec>,
}

impl GatewaySettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let auth = AuthSettings::load(&lookup)?;

        let raw_lifetime = lookup.required(JWT_EXPIRATION_MS_ENV)?;
        let token_lifetime_ms = raw_lifetime
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|ms| *ms > 0)
            .ok_or_else(|| ConfigError::Invalid {
                var: JWT_EXPIRATION_MS_ENV,
                reason: format!("expected a positive number of milliseconds, got '{raw_lifetime}'"),
            })?;

        let login_success_redirect = lookup.required(LOGIN_SUCCESS_REDIRECT_ENV)?.trim().to_string();
        // The token is appended as the fragment.
        if parse_url(LOGIN_SUCCESS_REDIRECT_ENV, &login_success_redirect)?.fragment().is_some() {
            return Err(ConfigError::Invalid {
                var: LOGIN_SUCCESS_REDIRECT_ENV,
                reason: "redirect URI must not contain a fragment".to_string(),
            });
        }
        if !login_success_redirect.bytes().all(|b| b.is_ascii_graphic()) {
            return Err(ConfigError::Invalid {
                var: LOGIN_SUCCESS_REDIRECT_ENV,
                reason: "redirect URI must be printable ASCII without spaces".to_string(),
            });
        }

        let routes = match lookup.optional(GATEWAY_ROUTES_ENV) {
            Some(raw) => RouteSpec::parse_list(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            auth,
            token_lifetime_ms,
            login_success_redirect,
            provider: ProviderSettings::load(&lookup)?,
            routes,
        })
    }
}

// =============================================================================
// Server settings
// =============================================================================

/// Listener and logging settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub log_format: LogFormat,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup
            .optional(HOST_ENV)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup.optional(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let addr = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: HOST_ENV,
                reason: e.to_string(),
            })?;

        let log_format = match lookup.optional(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse().map_err(|reason| ConfigError::Invalid {
                var: LOG_FORMAT_ENV,
                reason,
            })?,
            None => LogFormat::default(),
        };

        Ok(Self { addr, log_format })
    }
}
