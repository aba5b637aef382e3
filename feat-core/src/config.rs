use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::schema::{default_schema, Schema};

/// Name of the directory holding feature records and configuration
pub const FEATURES_DIR_NAME: &str = ".features";

/// Name of the configuration file inside the features directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Engine-wide settings that sit alongside the schema. Fields missing from
/// the file take their values from [`Settings::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Maintain inverse edges automatically on add/remove
    pub auto_inverse: bool,

    /// Relationship type used for hierarchy trees; `null` disables them
    pub hierarchy_type: Option<String>,

    /// Depth limit for impact analysis when none is given (0 = unlimited)
    pub default_impact_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_inverse: true,
            hierarchy_type: Some("contains".to_string()),
            default_impact_depth: 0,
        }
    }
}

/// The loaded relationship configuration: schema plus settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(flatten)]
    pub schema: Schema,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            schema: default_schema(),
        }
    }
}

impl Config {
    /// Loads the configuration from the provided path.
    /// A missing file yields the built-in default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config
            .schema
            .check()
            .with_context(|| format!("Inconsistent relationship schema in {:?}", path))?;

        if config.schema.types.is_empty() {
            tracing::warn!(
                path = %path.display(),
                categories = config.schema.categories.len(),
                "config defines no relationship types; every relationship will be rejected"
            );
        }

        Ok(config)
    }

    /// Save the configuration to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        // Ensure parent directories exist
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Determines the features directory.
///
/// Order: explicit override, `FEAT_DIR`, the nearest ancestor of the current
/// directory containing `.features/` (stopping at the home directory), and
/// finally `./.features`.
pub fn determine_features_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }

    if let Ok(dir) = std::env::var("FEAT_DIR") {
        return Ok(PathBuf::from(dir));
    }

    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let home = dirs::home_dir();

    for ancestor in cwd.ancestors() {
        let candidate = ancestor.join(FEATURES_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
        if home.as_deref() == Some(ancestor) {
            break;
        }
    }

    Ok(cwd.join(FEATURES_DIR_NAME))
}

/// Gets the path to the configuration file within a features directory
pub fn config_path(features_dir: &Path) -> PathBuf {
    features_dir.join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = Config::load(dir.path().join("config.yaml"))?;
        assert!(config.settings.auto_inverse);
        assert_eq!(config.settings.hierarchy_type.as_deref(), Some("contains"));
        assert!(config.schema.types.contains_key("depends-on"));
        Ok(())
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let path = config_path(dir.path());

        let mut config = Config::default();
        config.settings.auto_inverse = false;
        config.schema.types.remove("duplicates");
        config.save(&path)?;

        let loaded = Config::load(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_settings_keep_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = config_path(dir.path());
        fs::write(&path, "settings:\n  auto_inverse: false\n")?;

        let config = Config::load(&path)?;
        assert!(!config.settings.auto_inverse);
        assert_eq!(config.settings.hierarchy_type.as_deref(), Some("contains"));
        assert_eq!(config.settings.default_impact_depth, 0);
        assert!(config.schema.types.is_empty());
        Ok(())
    }

    #[test]
    fn test_disabled_hierarchy_type_survives_save() -> Result<()> {
        let dir = tempdir()?;
        let path = config_path(dir.path());

        let mut config = Config::default();
        config.settings.hierarchy_type = None;
        config.save(&path)?;

        assert_eq!(Config::load(&path)?.settings.hierarchy_type, None);
        Ok(())
    }

    #[test]
    fn test_load_rejects_inconsistent_schema() -> Result<()> {
        let dir = tempdir()?;
        let path = config_path(dir.path());
        fs::write(
            &path,
            "categories:\n  core:\n    cycle_detection: strict\ntypes:\n  uses:\n    category: nowhere\n",
        )?;

        let err = Config::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown category 'nowhere'"));
        Ok(())
    }

    #[test]
    fn test_explicit_dir_wins() -> Result<()> {
        let dir = tempdir()?;
        let found = determine_features_dir(Some(dir.path()))?;
        assert_eq!(found, dir.path());
        Ok(())
    }
}
