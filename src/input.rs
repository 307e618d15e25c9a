//! Recorded keyboard input
//!
//! A key log is a JSON array of `{ "at_ms", "code", "edge" }` entries using
//! browser-style key codes. Codes are mapped to lanes through the bindings in
//! [`Settings`]; keys with no binding are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::Settings;
use crate::stream::{KeyEdge, KeyInput};

#[derive(Error, Debug)]
pub enum KeyLogError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid key log {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// One raw keyboard edge as captured by a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedKey {
    pub at_ms: u64,
    pub code: String,
    pub edge: KeyEdge,
}

/// Read a key log from a JSON file
pub fn load_key_log(path: impl AsRef<Path>) -> Result<Vec<RecordedKey>, KeyLogError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| KeyLogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let keys: Vec<RecordedKey> = serde_json::from_str(&json).map_err(|source| KeyLogError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!("Loaded {} key edges from {}", keys.len(), path.display());
    Ok(keys)
}

/// Lane edges for every bound key in a recording
pub fn lane_inputs(recorded: &[RecordedKey], settings: &Settings) -> Vec<KeyInput> {
    let inputs: Vec<KeyInput> = recorded
        .iter()
        .filter_map(|k| KeyInput::from_code(k.at_ms, &k.code, k.edge, settings))
        .collect();
    if inputs.len() < recorded.len() {
        log::debug!("Ignored {} unbound key edges", recorded.len() - inputs.len());
    }
    inputs
}
