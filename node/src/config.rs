//! Service configuration with TOML file support.

use crate::NodeError;
use concord_consensus::{QuorumConfig, ValidatorConfig};
use concord_ledger::DelegationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the governance core service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every section falls back to
/// its defaults when omitted; the embedded policy configs are validated
/// before the service is constructed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Delegation policy bounds.
    #[serde(default)]
    pub delegation: DelegationConfig,

    /// Quorum growth policy.
    #[serde(default)]
    pub quorum: QuorumConfig,

    /// Validator policy (voting window, caps, safeguards).
    #[serde(default)]
    pub validator: ValidatorConfig,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            delegation: DelegationConfig::default(),
            quorum: QuorumConfig::default(),
            validator: ValidatorConfig::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| NodeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| NodeError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject inconsistent policy sections before construction.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.delegation.validate()?;
        self.quorum.validate()?;
        self.validator.validate()?;
        Ok(())
    }
}
