//! ecs.toml configuration.
//!
//! ```toml
//! cluster = "production"
//! delimiter = "--"
//! service_role = "ecsServiceRole"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use twelvefactor_core::{DEFAULT_DELIMITER, NameCodec};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EcsConfig {
    /// ECS cluster to operate within.
    pub cluster: String,
    /// Separates app id and process name in service names.
    pub delimiter: String,
    /// IAM role attached to services that have load balancers.
    pub service_role: Option<String>,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            cluster: "default".to_string(),
            delimiter: DEFAULT_DELIMITER.to_string(),
            service_role: None,
        }
    }
}

impl EcsConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: EcsConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Config for a named cluster with default naming.
    pub fn for_cluster(cluster: &str) -> Self {
        Self {
            cluster: cluster.to_string(),
            ..Self::default()
        }
    }

    pub fn codec(&self) -> NameCodec {
        NameCodec::new(self.delimiter.as_str())
    }
}
