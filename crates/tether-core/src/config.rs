// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, TetherError};

/// Startup settings for a bridge instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Value of the `platform` field stamped on every request.
    pub platform: String,
    /// Engine-side receiver the native layer answers to (`targetObject`).
    pub target_object: String,
    /// First correlation handle handed out by the registry (at most `Handle::MAX`).
    pub first_handle: u64,
    /// Queue native-thread responses until the host pumps them on its main thread.
    pub queue_native_responses: bool,
    /// Log stray and duplicate responses at `warn` instead of `debug`.
    pub warn_on_stray_responses: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            platform: "rust".into(),
            target_object: "TetherBridge".into(),
            first_handle: 0,
            queue_native_responses: false,
            warn_on_stray_responses: false,
        }
    }
}

impl BridgeConfig {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&data).map_err(|e| TetherError::Config(e.to_string()))
    }

    /// Read a JSON config file, falling back to defaults if it is missing or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(TetherError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                Self::default()
            }
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| TetherError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.json");

        let config = BridgeConfig {
            platform: "android".into(),
            first_handle: 100,
            queue_native_responses: true,
            ..BridgeConfig::default()
        };
        config.save(&path).expect("save");

        let loaded = BridgeConfig::load(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, r#"{ "platform": "ios" }"#).expect("write");

        let loaded = BridgeConfig::load(&path).expect("load");
        assert_eq!(loaded.platform, "ios");
        assert_eq!(loaded.target_object, "TetherBridge");
        assert!(!loaded.queue_native_responses);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let loaded = BridgeConfig::load_or_default(dir.path().join("absent.json"));
        assert_eq!(loaded, BridgeConfig::default());
    }

    #[test]
    fn garbage_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bridge.json");
        std::fs::write(&path, "not json").expect("write");

        assert!(matches!(BridgeConfig::load(&path), Err(TetherError::Config(_))));
        assert_eq!(BridgeConfig::load_or_default(&path), BridgeConfig::default());
    }
}
