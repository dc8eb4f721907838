use serde::{Deserialize, Serialize};

/// User settings from `meshport.yaml`.
///
/// Every section falls back to its defaults when missing, so a partial file (or no
/// file at all) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub import: ImportSettings,
    pub export: ExportSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Scale factor passed to the MMD importer.
    pub mmd_scale: f32,

    /// Host runs the older API branch (affects XNALara parameters and download links).
    pub legacy_host: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            mmd_scale: 0.08,
            legacy_host: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Bundle texture images into the exported file.
    pub embed_textures: bool,

    pub limits: ExportLimits,
}

/// Thresholds used by the export pre-flight check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportLimits {
    /// More meshes than this blocks the export.
    pub max_meshes: usize,

    /// Above this mesh count the warning is worded as severe.
    pub max_meshes_hard: usize,

    pub max_tris: usize,

    pub max_materials: usize,

    /// A shape key coordinate at or above this magnitude marks the key as broken.
    pub broken_shape_threshold: f32,

    /// Number of leading vertices sampled per shape key.
    pub shape_sample_vertices: usize,
}

impl Default for ExportLimits {
    fn default() -> Self {
        Self {
            max_meshes: 2,
            max_meshes_hard: 8,
            max_tris: 70_000,
            max_materials: 4,
            broken_shape_threshold: 10_000.0,
            shape_sample_vertices: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub dir: String,
    pub prefix: String,
    pub debug: bool,
    pub console: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: "logs".to_string(),
            prefix: "meshport".to_string(),
            debug: false,
            console: true,
        }
    }
}
