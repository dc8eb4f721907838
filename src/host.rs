//! Seams to the host application.
//!
//! Importer plugins, the exporter and the scene graph all live in the host. The
//! services only ever talk to them through these traits, which keeps them testable
//! with in-memory fakes and mocks.

use crate::models::{Armature, FormatKind, Mesh, ObjectId};
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Outcome of a failed capability call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The plugin providing the capability is not installed or not enabled.
    #[error("capability is not installed or enabled")]
    Absent,

    /// The plugin exists but its interface does not accept our parameters.
    #[error("invocation parameters rejected: {0}")]
    ParameterRejected(String),

    /// The plugin ran and reported a problem with the input itself.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl CapabilityError {
    /// Domain error carrying only a message.
    pub fn domain(message: impl Into<String>) -> Self {
        CapabilityError::Domain(DomainError {
            message: message.into(),
            code: None,
        })
    }
}

/// A domain error as reported by a plugin.
///
/// Plugins that expose structured error codes fill `code`; otherwise only the
/// message is available and has to be classified by pattern.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct DomainError {
    pub message: String,
    pub code: Option<DomainCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCode {
    /// The file's format version is older than the plugin supports.
    UnsupportedVersion { found: Option<u32>, minimum: u32 },
}

/// Fixed parameters for one importer call.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportParams {
    Mmd {
        directory: Utf8PathBuf,
        files: Vec<String>,
        scale: f32,
        types: &'static [MmdImportType],
        log_level: &'static str,
    },
    XnaLara {
        filepath: Utf8PathBuf,
        /// Only passed on the legacy host branch.
        colorize_mesh: Option<bool>,
    },
    SourceEngine {
        directory: Utf8PathBuf,
        files: Vec<String>,
    },
    Fbx {
        filepath: Utf8PathBuf,
        automatic_bone_orientation: bool,
        use_prepost_rot: bool,
        use_anim: bool,
    },
    Vrm {
        filepath: Utf8PathBuf,
    },
    Dae {
        filepath: Utf8PathBuf,
        fix_orientation: bool,
        auto_connect: bool,
    },
}

impl ImportParams {
    pub fn format(&self) -> FormatKind {
        match self {
            ImportParams::Mmd { .. } => FormatKind::Mmd,
            ImportParams::XnaLara { .. } => FormatKind::XnaLara,
            ImportParams::SourceEngine { .. } => FormatKind::SourceEngine,
            ImportParams::Fbx { .. } => FormatKind::Fbx,
            ImportParams::Vrm { .. } => FormatKind::Vrm,
            ImportParams::Dae { .. } => FormatKind::Dae,
        }
    }

    /// Path of the file being imported.
    pub fn file_path(&self) -> Utf8PathBuf {
        match self {
            ImportParams::Mmd {
                directory, files, ..
            }
            | ImportParams::SourceEngine { directory, files } => match files.first() {
                Some(file) => directory.join(file),
                None => directory.clone(),
            },
            ImportParams::XnaLara { filepath, .. }
            | ImportParams::Fbx { filepath, .. }
            | ImportParams::Vrm { filepath }
            | ImportParams::Dae { filepath, .. } => filepath.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmdImportType {
    Mesh,
    Armature,
    Morphs,
}

/// How an importer is invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportInvocation {
    /// Run directly with fixed parameters.
    Configured(ImportParams),
    /// Open the plugin's own dialog with its default parameters.
    Interactive(FormatKind),
}

impl ImportInvocation {
    pub fn format(&self) -> FormatKind {
        match self {
            ImportInvocation::Configured(params) => params.format(),
            ImportInvocation::Interactive(format) => *format,
        }
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self, ImportInvocation::Interactive(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Empty,
    Armature,
    Mesh,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshSmoothing {
    Off,
    Face,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMode {
    Auto,
    Copy,
}

/// Fixed parameters for the exporter call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportParams {
    pub object_types: &'static [ObjectType],
    pub use_mesh_modifiers: bool,
    pub add_leaf_bones: bool,
    pub bake_anim: bool,
    pub apply_scale_all: bool,
    pub path_mode: PathMode,
    pub embed_textures: bool,
    pub mesh_smoothing: MeshSmoothing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportInvocation {
    Configured(ExportParams),
    Interactive,
}

/// Entry point into the host's importer plugins.
pub trait ImporterHost {
    fn import(&mut self, invocation: &ImportInvocation) -> Result<(), CapabilityError>;
}

/// Entry point into the host's exporter.
pub trait ExporterHost {
    fn export(&mut self, invocation: &ExportInvocation) -> Result<(), CapabilityError>;
}

/// Scene queries and the geometry-fix collaborator.
pub trait SceneHost {
    /// Identities of every armature object currently in the scene.
    fn armature_ids(&self) -> Vec<ObjectId>;

    fn armature(&self, id: ObjectId) -> Option<Armature>;

    /// Every mesh object that would be exported.
    fn meshes(&self) -> Vec<Mesh>;

    /// Make the named armature the one the rest of the tooling works on.
    fn set_active_armature(&mut self, name: &str);

    /// Rotate bones so they follow the host's canonical bone orientation.
    fn normalize_bone_orientation(&mut self, id: ObjectId);

    /// Called once before a batch starts importing.
    fn prepare_for_import(&mut self) {}

    /// Directory of the open document, used to resolve `//`-relative paths.
    fn document_dir(&self) -> Option<Utf8PathBuf> {
        None
    }
}

/// Resolve a host texture path.
///
/// Paths starting with `//` are relative to the open document.
pub fn resolve_host_path(path: &Utf8Path, document_dir: Option<&Utf8Path>) -> Utf8PathBuf {
    match (path.as_str().strip_prefix("//"), document_dir) {
        (Some(relative), Some(dir)) => dir.join(relative),
        _ => path.to_path_buf(),
    }
}
