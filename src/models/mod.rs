//! Data models for meshport.
//!
//! - [`FormatKind`]: the closed set of importable formats and their extensions
//! - [`Mesh`], [`Armature`] and friends: snapshots of host scene objects
//! - [`Settings`]: user settings loaded from `meshport.yaml`
//! - [`AppState`]: UI-facing progress of the current import batch

pub mod app_state;
pub mod config;
pub mod format;
pub mod scene;

pub use app_state::{AppState, FileStatus};
pub use config::{ExportLimits, ExportSettings, ImportSettings, LoggingSettings, Settings};
pub use format::{FormatKind, PluginInfo};
pub use scene::{Armature, Bone, Material, Mesh, ObjectId, SceneSnapshot, ShapeKey};
