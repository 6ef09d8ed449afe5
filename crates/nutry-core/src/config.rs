use crate::freshness::{ExclusionPolicy, DEFAULT_SPICE_CATEGORY_NAMES};
use crate::models::Settings;
use crate::recommendation::{RecommendationEngine, RecommendationMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Loaded from `<config dir>/nutry/config.toml`; anything missing falls
/// back to defaults. The `[freshness]` table doubles as the stored settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub freshness: Settings,
    #[serde(default)]
    pub exclusion: ExclusionConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load config from default location, or defaults if there isn't one
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            // No config file? Use defaults
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
        config.freshness.validate()?;
        Ok(config)
    }

    /// Save config to disk
    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        self.freshness.validate()?;

        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the config file path
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("nutry");

        Ok(config_dir.join("config.toml"))
    }

    pub fn exclusion_policy(&self) -> ExclusionPolicy {
        ExclusionPolicy::new(
            self.freshness.exclude_spices,
            self.exclusion.category_names.clone(),
        )
    }

    pub fn engine(&self) -> RecommendationEngine {
        RecommendationEngine::new(
            self.engine.default_mode,
            self.exclusion.category_names.clone(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExclusionConfig {
    /// Category name fragments that mark a category as spice-like
    #[serde(default = "default_category_names")]
    pub category_names: Vec<String>,
}

fn default_category_names() -> Vec<String> {
    DEFAULT_SPICE_CATEGORY_NAMES
        .iter()
        .map(|name| name.to_string())
        .collect()
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            category_names: default_category_names(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// How long to let a burst of changes settle before recomputing
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Mode the recommendation list starts in
    #[serde(default)]
    pub default_mode: RecommendationMode,
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            default_mode: RecommendationMode::default(),
        }
    }
}

impl EngineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.freshness.ingredient_window_days, 7);
        assert_eq!(config.freshness.dish_window_days, 14);
        assert!(!config.freshness.exclude_spices);
        assert_eq!(config.engine.debounce_ms, 50);
        assert_eq!(config.engine.default_mode, RecommendationMode::DishBased);
        assert!(config
            .exclusion
            .category_names
            .contains(&"Spices".to_string()));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("dish_window_days"));
        assert!(toml.contains("category_names"));
        assert!(toml.contains("default_mode = \"dish_based\""));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [freshness]
            dish_window_days = 21
            exclude_spices = true
            "#,
        )
        .unwrap();
        assert_eq!(config.freshness.dish_window_days, 21);
        assert_eq!(config.freshness.ingredient_window_days, 7);
        assert!(config.exclusion_policy().enabled);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutry").join("config.toml");

        let mut config = Config::default();
        config.freshness.ingredient_window_days = 3;
        config.engine.default_mode = RecommendationMode::IngredientBased;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.engine().mode(), RecommendationMode::IngredientBased);
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_zero_window_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[freshness]\ningredient_window_days = 0\n").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
