//! Integration tests for ConfigManager and settings layering
//!
//! These tests verify:
//! - Defaults when no settings file exists
//! - Saving and loading meshport.yaml
//! - Environment overrides on top of the file
//! - Settings flowing into the services

use camino::Utf8PathBuf;
use meshport::ConfigManager;
use meshport::models::Mesh;
use meshport::services::validate;
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
    vars.iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
}

#[test]
fn test_load_default_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings_with_env(env(&[])).unwrap();

    assert_eq!(settings.import.mmd_scale, 0.08);
    assert!(!settings.export.embed_textures);
    assert_eq!(settings.export.limits.max_meshes, 2);
    assert_eq!(settings.export.limits.max_meshes_hard, 8);
    assert_eq!(settings.logging.prefix, "meshport");
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join("meshport.yaml"),
        "export:\n  limits:\n    max_materials: 8\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager.load_settings_with_env(env(&[])).unwrap();

    assert_eq!(settings.export.limits.max_materials, 8);
    assert_eq!(settings.export.limits.max_tris, 70_000);
    assert_eq!(settings.import.mmd_scale, 0.08);
}

#[test]
fn test_environment_overrides_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join("meshport.yaml"),
        "import:\n  legacy_host: false\nexport:\n  embed_textures: false\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = manager
        .load_settings_with_env(env(&[
            ("MESHPORT__EXPORT__EMBED_TEXTURES", "true"),
            ("MESHPORT__IMPORT__LEGACY_HOST", "true"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

    assert!(settings.export.embed_textures);
    assert!(settings.import.legacy_host);
}

#[test]
fn test_save_and_load_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = manager.load_settings_with_env(env(&[])).unwrap();
    settings.export.embed_textures = true;
    settings.logging.debug = true;
    manager.save_settings(&settings).unwrap();

    assert!(config_path.join("meshport.yaml").exists());
    let loaded = manager.load_settings_with_env(env(&[])).unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_configured_limits_change_validation() {
    let (_temp_dir, config_path) = create_test_config_dir();
    fs::write(
        config_path.join("meshport.yaml"),
        "export:\n  limits:\n    max_meshes: 4\n",
    )
    .unwrap();
    let manager = ConfigManager::new(&config_path).unwrap();
    let settings = manager.load_settings_with_env(env(&[])).unwrap();

    let meshes: Vec<_> = (0..3).map(|i| Mesh::new(format!("m{}", i), 10)).collect();

    assert!(!validate(&meshes, None, false, &settings.export.limits).is_blocked());
    assert!(validate(&meshes, None, false, &Default::default()).is_blocked());
}
