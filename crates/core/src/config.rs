//! Builder configuration
//!
//! Knobs that change how the model builder fills in structure nobody asked
//! for explicitly. Usually loaded from a `keystone.toml`:
//!
//! ```toml
//! shadow_key_name = "TempId"
//! prune_shadow_properties = true
//! validate_snapshots = true
//! ```

use crate::error::{MetadataError, MetadataResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// BuilderConfig
// ============================================================================

/// Model builder configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Base name for shadow key properties created on a principal that has
    /// no key compatible with a relationship
    pub shadow_key_name: String,

    /// Remove convention-created shadow properties once nothing references them
    pub prune_shadow_properties: bool,

    /// Run the validator before producing a snapshot
    pub validate_snapshots: bool,
}

impl BuilderConfig {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the shadow key name
    pub fn with_shadow_key_name(mut self, name: impl Into<String>) -> Self {
        self.shadow_key_name = name.into();
        self
    }

    /// Keep unused shadow properties instead of pruning them
    pub fn without_shadow_pruning(mut self) -> Self {
        self.prune_shadow_properties = false;
        self
    }

    /// Skip validation when taking snapshots
    pub fn without_snapshot_validation(mut self) -> Self {
        self.validate_snapshots = false;
        self
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> MetadataResult<Self> {
        let config: BuilderConfig = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Load a config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MetadataError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Render the config as TOML
    pub fn to_toml_string(&self) -> MetadataResult<String> {
        Ok(toml::to_string(self)?)
    }

    fn check(&self) -> MetadataResult<()> {
        let name = self.shadow_key_name.trim();
        if name.is_empty() {
            return Err(MetadataError::InvalidConfig(
                "shadow_key_name cannot be empty".to_string(),
            ));
        }
        if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(MetadataError::InvalidConfig(format!(
                "shadow_key_name '{}' must be alphanumeric",
                self.shadow_key_name
            )));
        }
        Ok(())
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            shadow_key_name: "TempId".to_string(),
            prune_shadow_properties: true,
            validate_snapshots: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BuilderConfig::new();
        assert_eq!(config.shadow_key_name, "TempId");
        assert!(config.prune_shadow_properties);
        assert!(config.validate_snapshots);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BuilderConfig::from_toml_str("validate_snapshots = false\n").unwrap();
        assert_eq!(
            config,
            BuilderConfig::default().without_snapshot_validation()
        );
    }

    #[test]
    fn test_invalid_shadow_key_name() {
        let err = BuilderConfig::from_toml_str("shadow_key_name = \"\"").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidConfig(_)));

        let err = BuilderConfig::from_toml_str("shadow_key_name = \"temp id\"").unwrap_err();
        assert!(err.to_string().contains("alphanumeric"));
    }

    #[test]
    fn test_malformed_toml() {
        let err = BuilderConfig::from_toml_str("shadow_key_name = ").unwrap_err();
        assert!(matches!(err, MetadataError::Toml(_)));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = BuilderConfig::new()
            .with_shadow_key_name("KeyValue")
            .without_shadow_pruning();
        let text = config.to_toml_string().unwrap();
        assert_eq!(BuilderConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "shadow_key_name = \"Surrogate\"").unwrap();
        let config = BuilderConfig::load(file.path()).unwrap();
        assert_eq!(config.shadow_key_name, "Surrogate");

        let missing = BuilderConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(MetadataError::FileRead { .. })));
    }
}
