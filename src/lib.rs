// meshport - Model import dispatcher and export pre-flight checks
//
// This is the library crate containing the services a host application embeds.
// The binary crate (main.rs) provides a command-line front end for inspection.

pub mod config;
pub mod host;
pub mod logging;
pub mod models;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use models::{AppState, FormatKind, SceneSnapshot, Settings};
pub use services::{ExportService, ImportService};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
