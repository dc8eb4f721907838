//! Export pre-flight check and the exporter call.
//!
//! Before exporting, the scene is checked for things that make a model unusable or
//! unpleasant downstream: too many meshes, polygons or materials, broken shape keys,
//! missing textures while embedding is on, and eye-tracking keys on a mesh that is
//! not called "Body". Any of them blocks the export until the user overrides it.

use crate::host::{
    CapabilityError, ExportInvocation, ExportParams, ExporterHost, MeshSmoothing, ObjectType,
    PathMode, SceneHost, resolve_host_path,
};
use crate::models::{ExportLimits, ExportSettings, Mesh, ShapeKey};
use crate::state::{StateChange, StateManager};
use camino::Utf8Path;
use indexmap::IndexSet;
use std::sync::Arc;

const EXPORT_OBJECT_TYPES: &[ObjectType] = &[
    ObjectType::Empty,
    ObjectType::Armature,
    ObjectType::Mesh,
    ObjectType::Other,
];

const BODY_MESH: &str = "Body";
const EYE_TRACKING_PREFIXES: [&str; 2] = ["vrc.blink", "vrc.lower"];
const COPY_PROTECTION_KEY: &str = "Basis Original";

/// Figures collected from the scene in one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportMetrics {
    pub mesh_count: usize,
    pub tris_count: usize,
    /// Distinct material names in first-seen order.
    pub materials: IndexSet<String>,
    pub broken_shapes: Vec<String>,
    pub textures_found: bool,
    pub eye_meshes_not_named_body: Vec<String>,
}

impl ExportMetrics {
    pub fn collect(
        meshes: &[Mesh],
        document_dir: Option<&Utf8Path>,
        limits: &ExportLimits,
    ) -> Self {
        let body_exists = meshes.iter().any(|mesh| mesh.name == BODY_MESH);
        let mut metrics = Self::default();

        for mesh in meshes {
            metrics.mesh_count += 1;
            metrics.tris_count += mesh.polygon_count;

            for material in mesh.material_slots.iter().flatten() {
                if material.users == 0 || !metrics.materials.insert(material.name.clone()) {
                    continue;
                }
                if !metrics.textures_found {
                    metrics.textures_found = material
                        .textures
                        .iter()
                        .any(|texture| resolve_host_path(texture, document_dir).is_file());
                }
            }

            for key in mesh.morph_keys() {
                if is_broken_shape(key, limits) {
                    metrics.broken_shapes.push(key.name.clone());
                }
            }

            if !body_exists
                && has_eye_tracking(mesh)
                && !metrics.eye_meshes_not_named_body.contains(&mesh.name)
            {
                metrics.eye_meshes_not_named_body.push(mesh.name.clone());
            }
        }

        metrics
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

fn is_broken_shape(key: &ShapeKey, limits: &ExportLimits) -> bool {
    key.coords
        .iter()
        .take(limits.shape_sample_vertices)
        .flatten()
        .any(|coord| coord.abs() >= limits.broken_shape_threshold)
}

fn has_eye_tracking(mesh: &Mesh) -> bool {
    mesh.morph_keys().iter().any(|key| {
        EYE_TRACKING_PREFIXES
            .iter()
            .any(|prefix| key.name.starts_with(prefix))
    })
}

/// One reason to hold back an export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportWarning {
    TooManyPolygons { tris: usize, max: usize },
    TooManyMaterials { count: usize, max: usize },
    MeshesNotJoined { count: usize, extreme: bool },
    BrokenShapeKeys { names: Vec<String> },
    NoTexturesToEmbed,
    EyesNotNamedBody { meshes: Vec<String> },
}

impl ExportWarning {
    pub fn title(&self) -> &'static str {
        match self {
            ExportWarning::TooManyPolygons { .. } => "Too many polygons!",
            ExportWarning::TooManyMaterials { .. } => "Model not optimized!",
            ExportWarning::MeshesNotJoined { .. } => "Meshes not joined!",
            ExportWarning::BrokenShapeKeys { .. } => "Broken shapekeys!",
            ExportWarning::NoTexturesToEmbed => "No textures found!",
            ExportWarning::EyesNotNamedBody { .. } => "Eyes not named 'Body'!",
        }
    }

    /// Explanation shown below the title.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ExportWarning::TooManyPolygons { tris, max } => vec![
                format!(
                    "You have {} tris in this model, but you shouldn't have more than {}!",
                    tris, max
                ),
                "You should decimate before you export this model.".to_string(),
            ],
            ExportWarning::TooManyMaterials { count, max } => vec![
                format!("This model has {} materials!", count),
                format!(
                    "You should try to have a maximum of {} materials on your model.",
                    max
                ),
                "Creating a texture atlas is very easy, so please make use of it.".to_string(),
            ],
            ExportWarning::MeshesNotJoined { count, extreme } => {
                let severity = if *extreme {
                    "It is extremely unoptimized and will cause lag for you and others."
                } else {
                    "It is not very optimized and might cause lag for you and others."
                };
                vec![
                    format!("This model has {} meshes!", count),
                    severity.to_string(),
                    "You should always join your meshes, it's very easy.".to_string(),
                ]
            }
            ExportWarning::BrokenShapeKeys { names } => {
                let mut lines = vec![format!(
                    "This model has {} broken shapekey(s):",
                    names.len()
                )];
                lines.extend(names.iter().map(|name| format!("  - {}", name)));
                lines.push(
                    "You will not be able to upload this model until you fix these shapekeys."
                        .to_string(),
                );
                lines.push("Either delete or repair them before export.".to_string());
                lines
            }
            ExportWarning::NoTexturesToEmbed => vec![
                "This model has no textures assigned but you have 'Embed Textures' enabled."
                    .to_string(),
                "Therefore, no textures will be embedded into the FBX.".to_string(),
                "This is not an issue, but you will have to import the textures manually."
                    .to_string(),
            ],
            ExportWarning::EyesNotNamedBody { meshes } => match meshes.as_slice() {
                [single] => vec![
                    format!(
                        "The mesh '{}' has Eye Tracking shapekeys but is not named 'Body'.",
                        single
                    ),
                    "If you want Eye Tracking to work, rename this mesh to 'Body'.".to_string(),
                ],
                _ => vec![
                    "Multiple meshes have Eye Tracking shapekeys but are not named 'Body'."
                        .to_string(),
                    "Make sure that the mesh containing the eyes is named 'Body' in order to get Eye Tracking to work."
                        .to_string(),
                ],
            },
        }
    }
}

/// Result of a validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub metrics: ExportMetrics,
    pub warnings: Vec<ExportWarning>,
}

impl ExportReport {
    pub fn is_blocked(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Check a scene against the export limits.
pub fn validate(
    meshes: &[Mesh],
    document_dir: Option<&Utf8Path>,
    embed_textures: bool,
    limits: &ExportLimits,
) -> ExportReport {
    let metrics = ExportMetrics::collect(meshes, document_dir, limits);
    let mut warnings = Vec::new();

    if metrics.tris_count > limits.max_tris {
        warnings.push(ExportWarning::TooManyPolygons {
            tris: metrics.tris_count,
            max: limits.max_tris,
        });
    }
    if metrics.material_count() > limits.max_materials {
        warnings.push(ExportWarning::TooManyMaterials {
            count: metrics.material_count(),
            max: limits.max_materials,
        });
    }
    if metrics.mesh_count > limits.max_meshes {
        warnings.push(ExportWarning::MeshesNotJoined {
            count: metrics.mesh_count,
            extreme: metrics.mesh_count > limits.max_meshes_hard,
        });
    }
    if !metrics.broken_shapes.is_empty() {
        warnings.push(ExportWarning::BrokenShapeKeys {
            names: metrics.broken_shapes.clone(),
        });
    }
    if !metrics.textures_found && embed_textures {
        warnings.push(ExportWarning::NoTexturesToEmbed);
    }
    if !metrics.eye_meshes_not_named_body.is_empty() {
        warnings.push(ExportWarning::EyesNotNamedBody {
            meshes: metrics.eye_meshes_not_named_body.clone(),
        });
    }

    ExportReport { metrics, warnings }
}

/// How to run an export.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportMode {
    /// Validate first and block on warnings.
    Checked,

    /// Skip validation. `acknowledged` carries the metrics of the report the user
    /// overrode, if any; only `textures_found` is used from it.
    Unchecked {
        acknowledged: Option<ExportMetrics>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Exported { params: ExportParams },
    /// Our parameters were rejected; the exporter dialog was opened without them.
    ExportedInteractively,
    Blocked(ExportReport),
    ExporterUnavailable,
    Failed(String),
}

/// Runs the pre-flight check and calls the host's exporter.
pub struct ExportService {
    settings: ExportSettings,
    state: Arc<StateManager>,
}

impl ExportService {
    pub fn new(settings: ExportSettings, state: Arc<StateManager>) -> Self {
        Self { settings, state }
    }

    pub fn validate(&self, meshes: &[Mesh], document_dir: Option<&Utf8Path>) -> ExportReport {
        validate(
            meshes,
            document_dir,
            self.settings.embed_textures,
            &self.settings.limits,
        )
    }

    /// Exporter parameters for the current scene.
    pub fn build_params(&self, meshes: &[Mesh], textures_found: bool) -> ExportParams {
        let protected = meshes
            .iter()
            .flat_map(|mesh| mesh.shape_keys.iter())
            .any(|key| key.name == COPY_PROTECTION_KEY);

        ExportParams {
            object_types: EXPORT_OBJECT_TYPES,
            use_mesh_modifiers: false,
            add_leaf_bones: false,
            bake_anim: false,
            apply_scale_all: true,
            path_mode: if textures_found && self.settings.embed_textures {
                PathMode::Copy
            } else {
                PathMode::Auto
            },
            embed_textures: true,
            mesh_smoothing: if protected {
                MeshSmoothing::Face
            } else {
                MeshSmoothing::Off
            },
        }
    }

    pub fn export<H: ExporterHost + SceneHost + ?Sized>(
        &self,
        host: &mut H,
        mode: ExportMode,
    ) -> ExportOutcome {
        let meshes = host.meshes();

        let textures_found = match mode {
            ExportMode::Checked => {
                let document_dir = host.document_dir();
                let report = self.validate(&meshes, document_dir.as_deref());
                if report.is_blocked() {
                    tracing::warn!(
                        "Export blocked by {} pre-flight warning(s)",
                        report.warnings.len()
                    );
                    self.state.set_export_blocked(true);
                    self.state.notify(StateChange::ExportBlocked {
                        warnings: report.warnings.clone(),
                    });
                    return ExportOutcome::Blocked(report);
                }
                report.metrics.textures_found
            }
            ExportMode::Unchecked { acknowledged } => {
                tracing::info!("Exporting without pre-flight check");
                acknowledged.is_some_and(|metrics| metrics.textures_found)
            }
        };
        self.state.set_export_blocked(false);

        let params = self.build_params(&meshes, textures_found);
        tracing::debug!("Export parameters: {:?}", params);

        match host.export(&ExportInvocation::Configured(params.clone())) {
            Ok(()) => ExportOutcome::Exported { params },
            Err(CapabilityError::ParameterRejected(reason)) => {
                tracing::warn!(
                    "Exporter rejected the export parameters ({}), retrying interactively",
                    reason
                );
                match host.export(&ExportInvocation::Interactive) {
                    Ok(()) => ExportOutcome::ExportedInteractively,
                    Err(error) => self.handle_failure(error),
                }
            }
            Err(error) => self.handle_failure(error),
        }
    }

    fn handle_failure(&self, error: CapabilityError) -> ExportOutcome {
        match error {
            CapabilityError::Absent => {
                tracing::error!("FBX exporter not enabled");
                self.state.notify(StateChange::ExporterDisabled);
                ExportOutcome::ExporterUnavailable
            }
            other => {
                tracing::error!("Export failed: {}", other);
                ExportOutcome::Failed(other.to_string())
            }
        }
    }
}
