//! Node configuration

use iou_flows::FlowConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Root of the journal and key directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_notary_name")]
    pub notary_name: String,

    #[serde(default)]
    pub flow: FlowConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_notary_name() -> String {
    "NOTARY".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            notary_name: default_notary_name(),
            flow: FlowConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..Self::default()
        }
    }

    /// Load configuration from JSON file
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join("journal")
    }

    pub fn keys_path(&self) -> PathBuf {
        self.data_dir.join("keys")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.notary_name, "NOTARY");
        assert_eq!(config.journal_path(), PathBuf::from("./data/journal"));
        assert_eq!(config.flow.signature_timeout_ms, 30_000);
    }

    #[test]
    fn test_nested_flow_config() {
        let json = r#"{
            "data_dir": "/var/lib/iou",
            "flow": { "signature_timeout_ms": 1000 }
        }"#;
        let config: NodeConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.keys_path(), PathBuf::from("/var/lib/iou/keys"));
        assert_eq!(config.notary_name, "NOTARY"); // default
        assert_eq!(config.flow.signature_timeout_ms, 1000);
        assert!(config.flow.verify_attached_signatures);
    }
}
