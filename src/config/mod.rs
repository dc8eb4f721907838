use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the settings file inside the config directory.
pub const SETTINGS_FILE: &str = "meshport.yaml";

/// Prefix of environment variables overriding settings, e.g.
/// `MESHPORT__EXPORT__EMBED_TEXTURES=true`.
pub const ENV_PREFIX: &str = "MESHPORT";

const ENV_SEPARATOR: &str = "__";

/// Loads and saves [`Settings`].
///
/// Settings are layered: built-in defaults, then `meshport.yaml` (optional), then
/// `MESHPORT__*` environment variables.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager, creating `config_dir` if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from the file and the process environment.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_with(Self::environment())
    }

    /// Load settings with the given variables standing in for the process environment.
    ///
    /// Keys use the same form as real variables (`MESHPORT__IMPORT__MMD_SCALE`).
    pub fn load_settings_with_env(&self, vars: config::Map<String, String>) -> Result<Settings> {
        self.load_with(Self::environment().source(Some(vars)))
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn load_with(&self, environment: Environment) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: Settings = Config::builder()
            .add_source(File::new(self.settings_path.as_str(), FileFormat::Yaml).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Write settings to `meshport.yaml`.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_dir = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(config_dir).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_create_config_manager() {
        let temp_dir = TempDir::new().unwrap();
        let nested = Utf8PathBuf::try_from(temp_dir.path().join("nested/config")).unwrap();

        let manager = ConfigManager::new(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(manager.settings_path(), nested.join("meshport.yaml"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp) = create_test_config_manager();
        let settings = manager.load_settings_with_env(config::Map::new()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let (manager, _temp) = create_test_config_manager();
        let mut settings = Settings::default();
        settings.import.mmd_scale = 0.2;
        settings.export.limits.max_tris = 32_000;

        manager.save_settings(&settings).unwrap();
        let loaded = manager.load_settings_with_env(config::Map::new()).unwrap();

        assert_eq!(loaded.import.mmd_scale, 0.2);
        assert_eq!(loaded.export.limits.max_tris, 32_000);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let (manager, _temp) = create_test_config_manager();
        fs::write(manager.settings_path(), "export: [unclosed").unwrap();

        assert!(manager.load_settings_with_env(config::Map::new()).is_err());
    }
}
