// Ruxi Inspect Gate - Configuration
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Startup configuration. Loaded once, handed to the guard and probes,
// never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sandbox root used when nothing else is configured
pub const DEFAULT_SANDBOX_ROOT: &str = "/ruxi";

/// Gateway configuration loaded from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Only subtree filesystem tools may touch
    pub sandbox_root: String,
    /// Kill external probes after this many seconds (None = wait forever)
    pub command_timeout_secs: Option<u64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            sandbox_root: DEFAULT_SANDBOX_ROOT.to_string(),
            command_timeout_secs: None,
        }
    }
}

impl GateConfig {
    /// Load config from JSON file, falling back to defaults
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            log::warn!("Config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save config to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject configs that would disable the sandbox.
    /// Run after every override, before building the guard.
    pub fn validate(&self) -> anyhow::Result<()> {
        let root = self.sandbox_root.as_str();
        if root.trim().is_empty() {
            anyhow::bail!("sandbox_root is empty");
        }
        if !Path::new(root).is_absolute() {
            anyhow::bail!("sandbox_root must be an absolute path, got {:?}", self.sandbox_root);
        }
        if self.sandbox_root.contains("..") {
            anyhow::bail!("sandbox_root must not contain '..', got {:?}", self.sandbox_root);
        }
        Ok(())
    }

    /// Replace the sandbox root (startup overrides only)
    pub fn with_root(mut self, root: impl Into<String>) -> Self {
        self.sandbox_root = root.into();
        self
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_root_is_ruxi() {
        let config = GateConfig::default();
        assert_eq!(config.sandbox_root, "/ruxi");
        assert_eq!(config.command_timeout_secs, None);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = GateConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, GateConfig::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        let config = GateConfig { sandbox_root: "/srv/data".into(), command_timeout_secs: Some(5) };
        config.save(&path).unwrap();
        assert_eq!(GateConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"command_timeout_secs": 10}"#).unwrap();
        let config = GateConfig::load(&path).unwrap();
        assert_eq!(config.sandbox_root, DEFAULT_SANDBOX_ROOT);
        assert_eq!(config.command_timeout_secs, Some(10));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GateConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_root_is_rejected() {
        assert!(GateConfig::default().with_root("").validate().is_err());
        assert!(GateConfig::default().with_root("   ").validate().is_err());
    }

    #[test]
    fn relative_root_is_rejected() {
        let err = GateConfig::default().with_root("ruxi").validate().unwrap_err();
        assert!(err.to_string().contains("absolute"));
        assert!(GateConfig::default().with_root("./ruxi").validate().is_err());
    }

    #[test]
    fn dotdot_root_is_rejected() {
        assert!(GateConfig::default().with_root("/srv/../etc").validate().is_err());
    }

    #[test]
    fn empty_root_from_json_fails_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, r#"{"sandbox_root": ""}"#).unwrap();
        let config = GateConfig::load(&path).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gate.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(GateConfig::load(&path).is_err());
    }
}
