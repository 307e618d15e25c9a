//! Player settings and preferences
//!
//! Persisted as JSON next to the binary (or wherever the caller points).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::RNG_SEED;
use crate::sim::ColumnColour;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Lane key binding (browser-style key codes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub code: String,
    pub lane: ColumnColour,
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seed for the ghost-note sequence
    pub rng_seed: u32,

    // === Input ===
    pub key_bindings: Vec<KeyBinding>,

    // === Demo player ===
    /// Seed for autoplay timing jitter
    pub autoplay_seed: u64,
    /// Chance (0.0 - 1.0) that autoplay hits a note cleanly
    pub autoplay_accuracy: f32,

    // === Audio ===
    /// Master volume (0.0 - 1.0)
    pub master_volume: f32,
}

impl Default for Settings {
    fn default() -> Self {
        let key_bindings = ["KeyH", "KeyJ", "KeyK", "KeyL"]
            .into_iter()
            .zip(ColumnColour::ALL)
            .map(|(code, lane)| KeyBinding {
                code: code.to_string(),
                lane,
            })
            .collect();
        Self {
            rng_seed: RNG_SEED,
            key_bindings,
            autoplay_seed: 0,
            autoplay_accuracy: 1.0,
            master_volume: 0.8,
        }
    }
}

impl Settings {
    /// Lane bound to a key code, if any
    pub fn lane_for_key(&self, code: &str) -> Option<ColumnColour> {
        self.key_bindings
            .iter()
            .find(|b| b.code == code)
            .map(|b| b.lane)
    }

    /// Read settings from a JSON file
    pub fn read(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings: Settings =
            serde_json::from_str(&json).map_err(|source| SettingsError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        settings.clamp();
        Ok(settings)
    }

    /// Load settings, falling back to defaults when missing or invalid
    pub fn load(path: impl AsRef<Path>) -> Self {
        match Self::read(path) {
            Ok(settings) => {
                log::info!("Loaded settings");
                settings
            }
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved");
        Ok(())
    }

    fn clamp(&mut self) {
        self.master_volume = self.master_volume.clamp(0.0, 1.0);
        self.autoplay_accuracy = self.autoplay_accuracy.clamp(0.0, 1.0);
    }
}
