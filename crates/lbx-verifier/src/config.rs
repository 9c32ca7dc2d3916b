//! # Verifier Configuration
//!
//! Loaded from YAML or built in code. Every field is optional in the file:
//!
//! ```yaml
//! max_revision_depth: 32
//! default_anchor_network: testnet
//! anchor_network_override: ~
//! require_signature_threshold_from_policy: true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Hop limit for revision traversal. Unlimited when absent.
    pub max_revision_depth: Option<usize>,
    /// Network used when the anchor chain id yields none.
    pub default_anchor_network: Option<String>,
    /// Network used for every anchor, ignoring the chain id.
    pub anchor_network_override: Option<String>,
    /// Take the required signer count from the encryption policy threshold.
    /// When false, one valid signature always suffices.
    pub require_signature_threshold_from_policy: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_revision_depth: None,
            default_anchor_network: None,
            anchor_network_override: None,
            require_signature_threshold_from_policy: true,
        }
    }
}

impl VerifierConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// Resolve the network an anchor on `chain` should be verified against.
    ///
    /// The override wins, then the last non-empty `:` segment of `chain`,
    /// then the default network.
    pub fn resolve_anchor_network(&self, chain: &str) -> Option<String> {
        let non_blank = |s: &&String| !s.trim().is_empty();
        if let Some(network) = self.anchor_network_override.as_ref().filter(non_blank) {
            return Some(network.trim().to_string());
        }
        chain
            .split(':')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .last()
            .map(str::to_string)
            .or_else(|| {
                self.default_anchor_network
                    .as_ref()
                    .filter(non_blank)
                    .map(|n| n.trim().to_string())
            })
    }
}
