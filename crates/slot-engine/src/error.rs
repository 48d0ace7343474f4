//! Error types for availability resolution.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by the external calendar service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("calendar authorization failed: {0}")]
    Unauthorized(String),

    #[error("calendar rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("calendar unavailable: {0}")]
    Unavailable(String),

    #[error("calendar query timed out after {0:?}")]
    TimedOut(Duration),
}

/// Failures reported by the local reservation store or principal directory.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("reservation store unavailable: {0}")]
    Unavailable(String),

    #[error("reservation query failed: {0}")]
    Query(String),
}

/// Errors raised while loading or validating a [`ResolverConfig`](crate::ResolverConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level error for an availability query.
///
/// Validation errors are raised before any external call is made. Upstream
/// failures fail the whole query; the resolver never reports a slot as free
/// when it could not check it.
#[derive(Error, Debug)]
pub enum AvailabilityError {
    #[error("Invalid query: {0}")]
    Validation(String),

    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Availability query timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Availability query cancelled")]
    Cancelled,

    #[error("Invalid civil time: {0}")]
    CivilTime(String),
}

impl AvailabilityError {
    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AvailabilityError::Validation(_) | AvailabilityError::UnknownPrincipal(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AvailabilityError>;
