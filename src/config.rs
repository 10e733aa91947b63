//! Graph build configuration
//!
//! All fields have defaults, so an empty JSON object is a valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::{Result, TrustMapError};

/// How forest membership is inferred across intra-forest edges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ForestInference {
    /// Breadth-first propagation from every node with a known forest until
    /// nothing changes, or until `hop_limit` hops have been walked
    Propagate {
        #[serde(default)]
        hop_limit: Option<usize>,
    },
    /// Run the single-step enrichment over every node a fixed number of times
    FixedPasses { passes: u32 },
}

impl Default for ForestInference {
    fn default() -> Self {
        ForestInference::Propagate { hop_limit: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub forest_inference: ForestInference,
    /// Remove domains whose overlay record says `hide`
    pub apply_overlay_hide: bool,
    /// Keep the data-quality ledger (anomalies are logged either way)
    pub record_data_quality: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            forest_inference: ForestInference::default(),
            apply_overlay_hide: true,
            record_data_quality: true,
        }
    }
}

impl GraphConfig {
    /// Two enrichment passes, as older consolidations did
    pub fn two_pass() -> Self {
        Self {
            forest_inference: ForestInference::FixedPasses { passes: 2 },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.forest_inference {
            ForestInference::FixedPasses { passes: 0 } => Err(TrustMapError::ConfigError(
                "forest inference needs at least one pass".to_string(),
            )),
            ForestInference::Propagate { hop_limit: Some(0) } => Err(TrustMapError::ConfigError(
                "forest inference hop limit must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GraphConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
