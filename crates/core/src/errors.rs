//! Error types for the ProfileMesh core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.
//!
//! "Profile not found" and "identity not found" are *not* errors anywhere in
//! this crate: they are legitimate answers, represented as `Option::None`.
//! Errors describe a failure to answer.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Identity errors
// ---------------------------------------------------------------------------

/// Errors from the identity-virtualization subsystem.
///
/// These indicate caller misuse of the derivation API, not a lookup miss;
/// they should be treated as fatal programming errors.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Inverse derivation was called on a store-owned identity.
    #[error("identity '{0}' is not card-derived")]
    NotVirtual(String),
}

// ---------------------------------------------------------------------------
// Local store errors
// ---------------------------------------------------------------------------

/// Errors from the local-store seam.
///
/// Store failures always surface unchanged to the caller; the engine never
/// silently swallows them.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed (connection, query, corruption).
    #[error("store backend error: {0}")]
    Backend(String),

    /// A record the store is required to have was missing.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Generic I/O wrapper.
    #[error("store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Peer errors
// ---------------------------------------------------------------------------

/// Errors from querying a remote peer server.
#[derive(Debug, Error)]
pub enum PeerError {
    /// HTTP-level transport error (network, TLS, timeout).
    #[error("peer HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The peer returned a non-success status code.
    #[error("peer API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// The peer response could not be decoded.
    #[error("peer response parse error: {0}")]
    ParseError(String),

    /// The peer could not be reached at all.
    #[error("peer unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Reconciliation errors
// ---------------------------------------------------------------------------

/// Errors from the reconciliation merger.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Underlying store error during a merge.
    #[error("reconcile store error: {0}")]
    StoreError(#[from] StoreError),

    /// Underlying peer error during a fan-out.
    #[error("reconcile peer error: {0}")]
    PeerError(#[from] PeerError),

    /// Identity derivation misuse.
    #[error("reconcile identity error: {0}")]
    IdentityError(#[from] IdentityError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = IdentityError::NotVirtual("4021".into());
        assert_eq!(err.to_string(), "identity '4021' is not card-derived");

        let err = StoreError::NotFound {
            entity: "refid".into(),
            id: "remote:E004".into(),
        };
        assert_eq!(err.to_string(), "refid not found: remote:E004");

        let err = PeerError::ApiError {
            status: 503,
            body: "maintenance".into(),
        };
        assert!(err.to_string().contains("503"));

        let err = ConfigError::InvalidValue {
            field: "peers".into(),
            detail: "duplicate peer name".into(),
        };
        assert!(err.to_string().contains("duplicate peer name"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let peer_err = PeerError::Unavailable("connection refused".into());
        let core_err: CoreError = peer_err.into();
        assert!(matches!(core_err, CoreError::Peer(_)));

        let rec_err: ReconcileError = StoreError::Backend("disk full".into()).into();
        assert!(matches!(rec_err, ReconcileError::StoreError(_)));
    }
}
