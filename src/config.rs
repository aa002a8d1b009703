//! Evaluation configuration: topology constants and tool settings.
//!
//! The two numeric constants here encode properties of the experimental
//! setup, not of the routing protocol, which is why they are configurable
//! rather than hard-coded into the analysis engines.

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

/// RREQ/RREP packets one discovery round is expected to leave in the capture
/// of the default test topology.
pub const DEFAULT_PACKETS_PER_DISCOVERY_ROUND: usize = 3;

/// Request attempts a node makes before giving up on a discovery, from the
/// AODVv2 draft (DISCOVERY_ATTEMPTS_MAX).
pub const DEFAULT_DISCOVERY_ATTEMPTS_MAX: u32 = 3;

/// Settings for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// How many request/reply packets a single discovery round leaves in the
    /// capture. Dividing a node's packet count by this yields its discovery
    /// count; a modeling assumption tied to the experimental topology.
    pub packets_per_discovery_round: usize,

    /// Retry budget after which an eventually successful discovery no longer
    /// counts as "within timeout".
    pub discovery_attempts_max: u32,

    /// Fail decoding on detectable field-ordering violations instead of
    /// warning and keeping the best-effort result.
    pub strict_decode: bool,

    /// Dissector binary used to turn pcaps into field-tree dumps.
    pub tshark_bin: String,

    /// Directory where converted capture dumps are kept.
    pub working_dir: PathBuf,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            packets_per_discovery_round: DEFAULT_PACKETS_PER_DISCOVERY_ROUND,
            discovery_attempts_max: DEFAULT_DISCOVERY_ATTEMPTS_MAX,
            strict_decode: false,
            tshark_bin: "tshark".to_string(),
            working_dir: PathBuf::from("dumps"),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("packets_per_discovery_round must be at least 1")]
    ZeroDiscoveryDivisor,
    #[error("discovery_attempts_max must be at least 1")]
    ZeroAttemptBudget,
}

impl EvalConfig {
    /// Load a configuration from a YAML file; unset keys fall back to the
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.packets_per_discovery_round == 0 {
            return Err(ConfigError::ZeroDiscoveryDivisor);
        }
        if self.discovery_attempts_max == 0 {
            return Err(ConfigError::ZeroAttemptBudget);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = EvalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.packets_per_discovery_round, 3);
        assert_eq!(config.discovery_attempts_max, 3);
        assert!(!config.strict_decode);
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "packets_per_discovery_round: 5").unwrap();
        writeln!(file, "strict_decode: true").unwrap();

        let config = EvalConfig::load(file.path()).unwrap();
        assert_eq!(config.packets_per_discovery_round, 5);
        assert!(config.strict_decode);
        // untouched keys keep their defaults
        assert_eq!(config.discovery_attempts_max, 3);
        assert_eq!(config.tshark_bin, "tshark");
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let config = EvalConfig {
            packets_per_discovery_round: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDiscoveryDivisor)
        ));
    }
}
