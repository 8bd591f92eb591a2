//! Flow configuration
//!
//! Loaded from a JSON file; missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Upper bound on waiting for each counterparty's signature
    #[serde(default = "default_signature_timeout_ms")]
    pub signature_timeout_ms: u64,

    /// Responder verifies signatures already attached to a proposal
    #[serde(default = "default_verify_attached_signatures")]
    pub verify_attached_signatures: bool,
}

fn default_signature_timeout_ms() -> u64 {
    30_000
}

fn default_verify_attached_signatures() -> bool {
    true
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            signature_timeout_ms: default_signature_timeout_ms(),
            verify_attached_signatures: default_verify_attached_signatures(),
        }
    }
}

impl FlowConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn signature_timeout(&self) -> Duration {
        Duration::from_millis(self.signature_timeout_ms)
    }

    pub fn with_signature_timeout(mut self, timeout: Duration) -> Self {
        self.signature_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}
