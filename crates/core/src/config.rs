//! TOML-based configuration for the reconciliation engine.
//!
//! Peer credentials are stored as `token_env` fields that reference
//! environment variable names; the actual secrets are resolved at runtime
//! via [`AppConfig::resolve_env_vars`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Remote behaviour
// ---------------------------------------------------------------------------

/// What a failing peer does to the surrounding fan-out.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PeerFailurePolicy {
    /// Failing peer contributes an empty response; siblings still count.
    /// A sole failing peer still surfaces its error.
    #[default]
    Degrade,
    /// Any peer failure fails the whole operation.
    Fatal,
}

impl std::fmt::Display for PeerFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Degrade => write!(f, "degrade"),
            Self::Fatal => write!(f, "fatal"),
        }
    }
}

/// Remote fan-out behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Failure policy for individual peer queries.
    #[serde(default)]
    pub failure_policy: PeerFailurePolicy,

    /// Per-peer HTTP timeout in seconds (default 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            failure_policy: PeerFailurePolicy::default(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Peers
// ---------------------------------------------------------------------------

/// One federation peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerEntry {
    /// Unique peer name; fan-out results keep peer configuration order.
    pub name: String,

    /// Base URL of the peer's API (e.g. `https://sibling.example.net/api`).
    pub url: String,

    /// Environment variable holding the bearer token for this peer.
    #[serde(default)]
    pub token_env: Option<String>,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level engine configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Remote fan-out behaviour.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Configured federation peers, in fan-out order.
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
}

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!(peers = config.peers.len(), "configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `token_env` fields from environment variables.
    ///
    /// Peers referencing a missing variable log a warning and stay
    /// tokenless -- whether a peer accepts anonymous queries is the peer's
    /// business, not a load-time failure.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        for peer in &mut self.peers {
            let Some(ref env_name) = peer.token_env else {
                continue;
            };
            match std::env::var(env_name) {
                Ok(val) if !val.is_empty() => {
                    debug!(peer = %peer.name, env_name, "resolved peer token");
                    peer.token = Some(val);
                }
                Ok(_) => {
                    warn!(peer = %peer.name, env_name, "env var is set but empty");
                }
                Err(_) => {
                    warn!(peer = %peer.name, env_name, "env var not set");
                }
            }
        }
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (idx, peer) in self.peers.iter().enumerate() {
            if peer.name.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("peers[{idx}].name"),
                    detail: "peer name must not be empty".into(),
                });
            }
            if peer.url.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("peers[{idx}].url"),
                    detail: "peer URL must not be empty".into(),
                });
            }
            if !peer.url.starts_with("http://") && !peer.url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: format!("peers[{idx}].url"),
                    detail: "peer URL must be http(s)".into(),
                });
            }
        }

        let mut names: Vec<&str> = self.peers.iter().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.peers.len() {
            return Err(ConfigError::InvalidValue {
                field: "peers".into(),
                detail: "peer names must be unique".into(),
            });
        }

        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "remote.timeout_secs".into(),
                detail: "timeout must be > 0".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}
