// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path-based access rules.
//!
//! ## Evaluation
//!
//! Rules are checked top-down and the first matching pattern decides. A path
//! that matches nothing requires authentication.
//!
//! ## Patterns
//!
//! - `/actuator/health` matches that path exactly
//! - `/login/**` matches `/login` and everything below it

use std::fmt;

/// What a route demands from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Reachable without a token; credentials are not inspected
    Public,
    /// A valid bearer token is required
    Authenticated,
    /// A presented token must be valid, but its absence is not an error.
    /// The handler receives no principal and answers accordingly.
    Optional,
}

/// Path pattern of an [`AccessRule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    /// Base path and every path below it
    Subtree(String),
}

impl PathPattern {
    /// Parse `"/a/b"` (exact) or `"/a/**"` (subtree).
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(base) => PathPattern::Subtree(base.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => path == expected,
            PathPattern::Subtree(base) => match path.strip_prefix(base.as_str()) {
                Some(rest) => rest.is_empty() || rest.starts_with('/'),
                None => false,
            },
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPattern::Exact(path) => f.write_str(path),
            PathPattern::Subtree(base) => write!(f, "{base}/**"),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRule {
    pub pattern: PathPattern,
    pub requirement: Requirement,
}

impl AccessRule {
    pub fn new(pattern: &str, requirement: Requirement) -> Self {
        Self {
            pattern: PathPattern::parse(pattern),
            requirement,
        }
    }

    pub fn public(pattern: &str) -> Self {
        Self::new(pattern, Requirement::Public)
    }

    pub fn authenticated(pattern: &str) -> Self {
        Self::new(pattern, Requirement::Authenticated)
    }
}

/// Ordered rule table with deny-by-default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    rules: Vec<AccessRule>,
}

impl AccessPolicy {
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }

    /// Rule table of the gateway.
    pub fn gateway() -> Self {
        Self::new(vec![
            AccessRule::public("/login/**"),
            AccessRule::public("/oauth2/**"),
            AccessRule::public("/error"),
            AccessRule::public("/actuator/health"),
            AccessRule::new("/gw/me", Requirement::Optional),
        ])
    }

    /// Rule table of a downstream resource service.
    pub fn resource_service() -> Self {
        Self::new(vec![AccessRule::public("/api/v1/health")])
    }

    pub fn rules(&self) -> &[AccessRule] {
        &self.rules
    }

    /// Requirement for `path`; first match wins.
    pub fn evaluate(&self, path: &str) -> Requirement {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.requirement)
            .unwrap_or(Requirement::Authenticated)
    }
}

/// Whether `path` contains a `.` or `..` segment (plain or percent-encoded)
/// or an encoded separator.
///
/// Such paths can name one route to the policy and another once a URL parser
/// resolves them, so they are refused before any rule is evaluated.
pub fn is_ambiguous_path(path: &str) -> bool {
    path.split('/').any(|segment| {
        let segment = segment.to_ascii_lowercase();
        if segment.contains("%2f") || segment.contains("%5c") || segment.contains('\\') {
            return true;
        }
        matches!(segment.replace("%2e", ".").as_str(), "." | "..")
    })
}
