//! Party signing keys
//!
//! A party's Ed25519 seed comes from `IOU_<NAME>_KEY` if set, otherwise from
//! `<keys dir>/<NAME>.key`. Missing key files are generated on first use.

use iou_ledger::PartySigner;
use std::path::{Path, PathBuf};

use crate::context::CommandError;

/// Environment variable holding a party's seed
pub fn key_env_var(name: &str) -> String {
    let sanitized: String = name
        .to_uppercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("IOU_{}_KEY", sanitized)
}

pub fn key_file(keys_dir: &Path, name: &str) -> PathBuf {
    keys_dir.join(format!("{}.key", name.to_uppercase()))
}

/// Load a party's key, generating and saving one if none exists
pub fn load_or_create(keys_dir: &Path, name: &str) -> Result<PartySigner, CommandError> {
    if let Ok(seed) = std::env::var(key_env_var(name)) {
        tracing::debug!(party = name, "Using key from environment");
        return Ok(PartySigner::from_hex(&seed)?);
    }

    let path = key_file(keys_dir, name);
    if path.exists() {
        let seed = std::fs::read_to_string(&path)?;
        return Ok(PartySigner::from_hex(&seed)?);
    }

    let signer = PartySigner::generate();
    write_key(keys_dir, name, &signer)?;
    tracing::info!(party = name, path = %path.display(), "Generated party key");
    Ok(signer)
}

pub fn write_key(keys_dir: &Path, name: &str, signer: &PartySigner) -> Result<PathBuf, CommandError> {
    std::fs::create_dir_all(keys_dir)?;
    let path = key_file(keys_dir, name);
    std::fs::write(&path, signer.seed_hex())?;
    Ok(path)
}
