//! Routing errors.
//!
//! Variants fall into two groups. Configuration errors are raised while the route
//! table is being built and signal a programming mistake in the application.
//! Request errors are raised while resolving a single request and are surfaced to
//! the HTTP boundary as client errors.

use std::path::PathBuf;

use thiserror::Error;

use super::params::ParamType;

/// Errors produced while registering routes or resolving a request.
#[derive(Debug, Error)]
pub enum RouterError {
    // ── Request-time ─────────────────────────────────────────────────────────
    #[error("invalid value {value:?} for parameter `{name}`: expected {expected}")]
    InvalidParameterValue {
        name: String,
        value: String,
        expected: ParamType,
    },

    #[error("no route found for {method} {path}")]
    NoRouteFound { method: String, path: String },

    // ── Configuration-time ───────────────────────────────────────────────────
    #[error("unsupported type `{type_name}` declared for parameter `{name}`")]
    UnsupportedParameterType { name: String, type_name: String },

    #[error("invalid route pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("parameter `{name}` is declared more than once on route {route}")]
    DuplicateParameter { name: String, route: String },

    #[error("type declared for unknown parameter `{name}` on route {route}")]
    UnknownParameter { name: String, route: String },

    #[error("a default route is already registered ({controller}.{action})")]
    DefaultAlreadySet { controller: String, action: String },

    #[error("no handler registered for {controller}.{action}")]
    UnknownHandler { controller: String, action: String },

    #[error("failed to read route table {}: {source}", path.display())]
    RouteFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed route table: {0}")]
    RouteFileFormat(#[from] serde_json::Error),
}

impl RouterError {
    /// Returns `true` for errors caused by the incoming request rather than by the
    /// route table. These map to `4xx` responses.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameterValue { .. } | Self::NoRouteFound { .. }
        )
    }
}
