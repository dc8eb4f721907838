use crate::host::{
    CapabilityError, ImportInvocation, ImportParams, ImporterHost, MmdImportType, SceneHost,
};
use crate::models::{FileStatus, FormatKind, ImportSettings, ObjectId};
use crate::services::archive::{self, ArchiveError, ArchiveMember};
use crate::services::bones;
use crate::services::diagnosis::{Diagnosis, ErrorClassifier};
use crate::state::{StateChange, StateManager};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

const MMD_IMPORT_TYPES: &[MmdImportType] = &[
    MmdImportType::Mesh,
    MmdImportType::Armature,
    MmdImportType::Morphs,
];

/// Errors from resolving an archive choice.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("No archive choice is pending")]
    NoPendingChoice,

    #[error("Not waiting for an archive choice")]
    NotAwaitingChoice,

    #[error("{member} is not an importable member of {archive}")]
    UnknownChoice { archive: Utf8PathBuf, member: String },

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),
}

/// One file to import: a directory and a file name inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    pub directory: Utf8PathBuf,
    pub file_name: String,
}

impl ImportRequest {
    pub fn new(directory: impl Into<Utf8PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
        }
    }

    /// Split a single file path into directory and file name.
    pub fn from_path(path: &Utf8Path) -> Self {
        Self {
            directory: path.parent().map(Utf8Path::to_path_buf).unwrap_or_default(),
            file_name: path.file_name().unwrap_or(path.as_str()).to_string(),
        }
    }

    /// Requests for several files selected in the same directory.
    pub fn from_files<I, S>(directory: &Utf8Path, file_names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        file_names
            .into_iter()
            .map(|name| Self::new(directory, name))
            .collect()
    }

    pub fn path(&self) -> Utf8PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn format(&self) -> Option<FormatKind> {
        FormatKind::classify(&self.file_name)
    }
}

/// Result of a single importer dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// The importer ran; `interactive` when it needed the fallback mode.
    Imported { format: FormatKind, interactive: bool },

    /// The importer plugin is missing; install guidance was shown.
    MissingCapability { format: FormatKind },

    /// The importer rejected the file.
    Failed {
        format: FormatKind,
        diagnosis: Diagnosis,
    },

    /// Not a model file (archive or unknown extension).
    Skipped,
}

/// What happened to one request of a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Model(ImportOutcome),

    /// Archive scanned; its importable members are in the session's index.
    ArchiveScanned { members: usize },

    /// Archive without a single importable model.
    ArchiveEmpty,

    ArchiveUnreadable(String),

    /// Unknown extension.
    Ignored,
}

impl FileOutcome {
    pub fn status(&self) -> FileStatus {
        match self {
            FileOutcome::Model(ImportOutcome::Imported { .. }) => FileStatus::Imported,
            FileOutcome::Model(ImportOutcome::Skipped) | FileOutcome::Ignored => {
                FileStatus::Ignored
            }
            FileOutcome::Model(_)
            | FileOutcome::ArchiveEmpty
            | FileOutcome::ArchiveUnreadable(_) => FileStatus::Failed,
            FileOutcome::ArchiveScanned { .. } => FileStatus::Queued,
        }
    }

    fn describe(&self) -> String {
        match self {
            FileOutcome::Model(ImportOutcome::Imported { format, interactive }) => {
                if *interactive {
                    format!("{} import opened interactively", format)
                } else {
                    format!("Imported as {}", format)
                }
            }
            FileOutcome::Model(ImportOutcome::MissingCapability { format }) => {
                format!("{} importer is not installed or enabled", format)
            }
            FileOutcome::Model(ImportOutcome::Failed { diagnosis, .. }) => diagnosis.to_string(),
            FileOutcome::Model(ImportOutcome::Skipped) => "Not a model file".to_string(),
            FileOutcome::ArchiveScanned { members } => {
                format!("{} importable model(s) found", members)
            }
            FileOutcome::ArchiveEmpty => "The zip file contains no importable models.".to_string(),
            FileOutcome::ArchiveUnreadable(message) => message.clone(),
            FileOutcome::Ignored => "Unsupported file type".to_string(),
        }
    }
}

/// One selectable model inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveChoice {
    pub archive: Utf8PathBuf,
    pub member: ArchiveMember,
}

impl ArchiveChoice {
    pub fn new(archive: impl Into<Utf8PathBuf>, member: ArchiveMember) -> Self {
        Self {
            archive: archive.into(),
            member,
        }
    }

    /// Stable identifier, `<archive> ||| <member>`.
    pub fn id(&self) -> String {
        format!("{} ||| {}", self.archive, self.member.name)
    }

    /// Short label for list entries.
    pub fn label(&self) -> String {
        self.member.file_name()
    }

    /// Hover text for list entries.
    pub fn description(&self) -> String {
        format!(
            "Import model \"{}\" from the zip \"{}\"",
            self.member.file_name(),
            self.archive.file_name().unwrap_or(self.archive.as_str())
        )
    }

    fn sort_key(&self) -> String {
        format!("{} ||| {}", self.archive, self.member.corrected_name()).to_lowercase()
    }
}

/// Importable members of every archive seen in a batch, keyed by archive path.
///
/// Archives are kept in the order they were requested. Members are never archives
/// themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveIndex {
    entries: IndexMap<Utf8PathBuf, Vec<ArchiveMember>>,
}

impl ArchiveIndex {
    /// Record the members of an archive. Non-model members are dropped; an archive
    /// left without members is not recorded. Returns the number of members kept.
    pub fn insert(&mut self, archive: Utf8PathBuf, mut members: Vec<ArchiveMember>) -> usize {
        members.retain(|member| matches!(member.format(), Some(format) if !format.is_archive()));
        let count = members.len();
        if count > 0 {
            self.entries.entry(archive).or_default().extend(members);
        }
        count
    }

    pub fn get(&self, archive: &Utf8Path) -> Option<&[ArchiveMember]> {
        self.entries.get(archive).map(Vec::as_slice)
    }

    pub fn remove(&mut self, archive: &Utf8Path) -> Option<Vec<ArchiveMember>> {
        self.entries.shift_remove(archive)
    }

    pub fn contains(&self, choice: &ArchiveChoice) -> bool {
        self.get(&choice.archive)
            .is_some_and(|members| members.contains(&choice.member))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Archives holding exactly one model, as ready-made choices.
    pub fn single_member_choices(&self) -> Vec<ArchiveChoice> {
        self.entries
            .iter()
            .filter(|(_, members)| members.len() == 1)
            .map(|(archive, members)| ArchiveChoice::new(archive.clone(), members[0].clone()))
            .collect()
    }

    /// Every (archive, member) pair, sorted case-insensitively.
    pub fn choices(&self) -> Vec<ArchiveChoice> {
        let mut choices: Vec<ArchiveChoice> = self
            .entries
            .iter()
            .flat_map(|(archive, members)| {
                members
                    .iter()
                    .map(move |member| ArchiveChoice::new(archive.clone(), member.clone()))
            })
            .collect();
        choices.sort_by_cached_key(ArchiveChoice::sort_key);
        choices
    }
}

/// Where the disambiguation flow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImportPhase {
    #[default]
    Idle,
    /// A dialog listing archive members is open.
    AwaitingChoice,
    /// Every archive of the batch has been resolved.
    Resolved,
}

/// Working state of one import batch.
///
/// Created by [`ImportService::dispatch_batch`] and handed back to the caller, who
/// keeps it while the disambiguation dialog is open. Dropping it abandons whatever
/// was still pending.
#[derive(Debug, Clone, Default)]
pub struct ImportSession {
    index: ArchiveIndex,
    pending: Option<ArchiveChoice>,
    phase: ImportPhase,
}

impl ImportSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> ImportPhase {
        self.phase
    }

    pub fn index(&self) -> &ArchiveIndex {
        &self.index
    }

    pub fn pending(&self) -> Option<&ArchiveChoice> {
        self.pending.as_ref()
    }

    pub fn choices(&self) -> Vec<ArchiveChoice> {
        self.index.choices()
    }

    /// Select the member to import.
    pub fn select(&mut self, choice: ArchiveChoice) -> Result<(), ImportError> {
        if self.phase != ImportPhase::AwaitingChoice {
            return Err(ImportError::NotAwaitingChoice);
        }
        if !self.index.contains(&choice) {
            return Err(ImportError::UnknownChoice {
                archive: choice.archive,
                member: choice.member.name,
            });
        }
        self.pending = Some(choice);
        Ok(())
    }

    /// Close the dialog without importing.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.phase = ImportPhase::Idle;
    }

    /// Enter `AwaitingChoice` if archives are left, defaulting to the first choice.
    fn await_choice(&mut self) -> Option<Vec<ArchiveChoice>> {
        if self.index.is_empty() {
            self.pending = None;
            self.phase = if self.phase == ImportPhase::Idle {
                ImportPhase::Idle
            } else {
                ImportPhase::Resolved
            };
            return None;
        }

        let choices = self.index.choices();
        self.pending = choices.first().cloned();
        self.phase = ImportPhase::AwaitingChoice;
        Some(choices)
    }
}

/// An armature that appeared during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedArmature {
    pub id: ObjectId,
    pub name: String,
    pub normalized: bool,
}

/// Everything a batch did.
#[derive(Debug)]
pub struct BatchOutcome {
    pub session: ImportSession,
    pub files: Vec<(Utf8PathBuf, FileOutcome)>,
    /// Single-model archives that were extracted and imported automatically.
    pub archive_imports: Vec<(ArchiveChoice, Result<ImportOutcome, ImportError>)>,
    pub added_armatures: Vec<AddedArmature>,
}

impl BatchOutcome {
    pub fn awaiting_choice(&self) -> bool {
        self.session.phase() == ImportPhase::AwaitingChoice
    }
}

/// What importing one chosen archive member did.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceResolution {
    pub choice: ArchiveChoice,
    pub outcome: ImportOutcome,
    pub added_armatures: Vec<AddedArmature>,
}

/// Routes files to the host's importer plugins.
///
/// Every format goes through the same dispatch contract:
/// - capability absent → install guidance, no error
/// - parameters rejected → one retry in interactive mode
/// - domain error → classified [`Diagnosis`], the batch continues
pub struct ImportService {
    settings: ImportSettings,
    classifier: ErrorClassifier,
    state: Arc<StateManager>,
}

impl ImportService {
    pub fn new(settings: ImportSettings, state: Arc<StateManager>) -> Self {
        Self {
            settings,
            classifier: ErrorClassifier::new(),
            state,
        }
    }

    pub fn state(&self) -> &Arc<StateManager> {
        &self.state
    }

    /// Fixed importer parameters for a model file. `None` for archives.
    pub fn build_params(
        &self,
        request: &ImportRequest,
        format: FormatKind,
    ) -> Option<ImportParams> {
        let params = match format {
            FormatKind::Mmd => ImportParams::Mmd {
                directory: request.directory.clone(),
                files: vec![request.file_name.clone()],
                scale: self.settings.mmd_scale,
                types: MMD_IMPORT_TYPES,
                log_level: "WARNING",
            },
            FormatKind::XnaLara => ImportParams::XnaLara {
                filepath: request.path(),
                colorize_mesh: self.settings.legacy_host.then_some(false),
            },
            FormatKind::SourceEngine => ImportParams::SourceEngine {
                directory: request.directory.clone(),
                files: vec![request.file_name.clone()],
            },
            FormatKind::Fbx => ImportParams::Fbx {
                filepath: request.path(),
                automatic_bone_orientation: false,
                use_prepost_rot: false,
                use_anim: false,
            },
            FormatKind::Vrm => ImportParams::Vrm {
                filepath: request.path(),
            },
            FormatKind::Dae => ImportParams::Dae {
                filepath: request.path(),
                fix_orientation: true,
                auto_connect: true,
            },
            FormatKind::Archive => return None,
        };
        Some(params)
    }

    /// Import one model file through its format's importer.
    pub fn import_one<I: ImporterHost + ?Sized>(
        &self,
        importer: &mut I,
        request: &ImportRequest,
    ) -> ImportOutcome {
        let path = request.path();
        let Some(format) = request.format() else {
            tracing::debug!("Not a model file: {}", path);
            return ImportOutcome::Skipped;
        };
        let Some(params) = self.build_params(request, format) else {
            tracing::debug!("Archives are not imported directly: {}", path);
            return ImportOutcome::Skipped;
        };

        tracing::info!("Importing {} with the {} importer", path, format);

        match importer.import(&ImportInvocation::Configured(params)) {
            Ok(()) => ImportOutcome::Imported {
                format,
                interactive: false,
            },
            Err(CapabilityError::ParameterRejected(reason)) => {
                tracing::warn!(
                    "{} importer rejected the import parameters ({}), retrying interactively",
                    format,
                    reason
                );
                match importer.import(&ImportInvocation::Interactive(format)) {
                    Ok(()) => ImportOutcome::Imported {
                        format,
                        interactive: true,
                    },
                    Err(error) => self.handle_failure(format, &path, error),
                }
            }
            Err(error) => self.handle_failure(format, &path, error),
        }
    }

    /// Open a format's importer dialog without a file (manual per-format import).
    pub fn import_manual<H: ImporterHost + SceneHost + ?Sized>(
        &self,
        host: &mut H,
        format: FormatKind,
    ) -> ImportOutcome {
        if format.is_archive() {
            return ImportOutcome::Skipped;
        }
        host.prepare_for_import();

        tracing::info!("Opening the {} importer", format);
        match host.import(&ImportInvocation::Interactive(format)) {
            Ok(()) => ImportOutcome::Imported {
                format,
                interactive: true,
            },
            Err(error) => self.handle_failure(format, Utf8Path::new(""), error),
        }
    }

    fn handle_failure(
        &self,
        format: FormatKind,
        path: &Utf8Path,
        error: CapabilityError,
    ) -> ImportOutcome {
        let diagnosis = match error {
            CapabilityError::Absent => {
                tracing::warn!("{} importer is not installed or enabled", format);
                if let Some(plugin) = format.plugin(self.settings.legacy_host) {
                    self.state
                        .notify(StateChange::InstallGuidance { format, plugin });
                }
                return ImportOutcome::MissingCapability { format };
            }
            CapabilityError::ParameterRejected(reason) => Diagnosis::Rejected(reason),
            CapabilityError::Domain(error) => self.classifier.classify(format, &error),
        };

        tracing::error!("Failed to import {}: {}", path, diagnosis);
        self.state.notify(StateChange::ImportFailed {
            file: path.to_path_buf(),
            diagnosis: diagnosis.clone(),
        });
        ImportOutcome::Failed { format, diagnosis }
    }

    /// Import a batch of files.
    ///
    /// Model files are imported as they come. Archives are scanned first; those with a
    /// single model are imported once every request has been handled, the others are
    /// left in the returned session for the user to choose from.
    pub fn dispatch_batch<H: ImporterHost + SceneHost + ?Sized>(
        &self,
        host: &mut H,
        requests: &[ImportRequest],
    ) -> BatchOutcome {
        let mut session = ImportSession::new();
        self.state.start_import(requests.len());
        host.prepare_for_import();

        let before = armature_snapshot(&*host);
        let mut files = Vec::with_capacity(requests.len());

        for request in requests {
            let path = request.path();
            self.state.update_progress(path.clone());

            let outcome = match request.format() {
                None => {
                    tracing::debug!("Ignoring unsupported file {}", path);
                    FileOutcome::Ignored
                }
                Some(FormatKind::Archive) => self.scan_into(&mut session, &path),
                Some(_) => FileOutcome::Model(self.import_one(host, request)),
            };

            self.state
                .add_file_result(path.clone(), outcome.status(), outcome.describe());
            files.push((path, outcome));
        }

        let mut archive_imports = Vec::new();
        for choice in session.index.single_member_choices() {
            session.index.remove(&choice.archive);
            let result = self.extract_and_import(host, &choice);
            archive_imports.push((choice, result));
        }

        if let Some(choices) = session.await_choice() {
            tracing::info!("{} archive model(s) need a choice", choices.len());
            self.state.notify(StateChange::ChoiceRequested { choices });
        }

        let added_armatures = self.normalize_added(host, &before);
        self.state
            .finish_import(session.phase() == ImportPhase::AwaitingChoice);

        BatchOutcome {
            session,
            files,
            archive_imports,
            added_armatures,
        }
    }

    /// Extract the session's pending choice and import it.
    ///
    /// The chosen archive leaves the index whether or not the import works. If other
    /// archives are still waiting, the session stays in `AwaitingChoice`. Armatures
    /// added by the import are normalized and returned with the outcome.
    pub fn resolve_archive_choice<H: ImporterHost + SceneHost + ?Sized>(
        &self,
        host: &mut H,
        session: &mut ImportSession,
    ) -> Result<ChoiceResolution, ImportError> {
        if session.phase() != ImportPhase::AwaitingChoice {
            return Err(ImportError::NotAwaitingChoice);
        }
        let choice = session.pending.take().ok_or(ImportError::NoPendingChoice)?;

        let before = armature_snapshot(&*host);
        session.index.remove(&choice.archive);
        let result = self.extract_and_import(host, &choice);
        let added_armatures = self.normalize_added(host, &before);

        match session.await_choice() {
            Some(choices) => self.state.notify(StateChange::ChoiceRequested { choices }),
            None => self.state.set_awaiting_choice(false),
        }

        Ok(ChoiceResolution {
            outcome: result?,
            choice,
            added_armatures,
        })
    }

    fn scan_into(&self, session: &mut ImportSession, path: &Utf8Path) -> FileOutcome {
        match archive::scan_archive(path) {
            Ok(members) => {
                let count = session.index.insert(path.to_path_buf(), members);
                if count == 0 {
                    tracing::warn!("{} contains no importable models", path);
                    self.state.notify(StateChange::ArchiveEmpty {
                        archive: path.to_path_buf(),
                    });
                    FileOutcome::ArchiveEmpty
                } else {
                    FileOutcome::ArchiveScanned { members: count }
                }
            }
            Err(e) => {
                tracing::error!("Could not read archive {}: {}", path, e);
                self.state.notify(StateChange::ArchiveUnreadable {
                    archive: path.to_path_buf(),
                    message: e.to_string(),
                });
                FileOutcome::ArchiveUnreadable(e.to_string())
            }
        }
    }

    fn extract_and_import<H: ImporterHost + ?Sized>(
        &self,
        host: &mut H,
        choice: &ArchiveChoice,
    ) -> Result<ImportOutcome, ImportError> {
        let root = archive::extraction_root(&choice.archive);

        let extracted = archive::sanitize_member_path(&choice.member.corrected_name())
            .and_then(|relative| {
                archive::extract_all(&choice.archive, &root).map(|_| root.join(relative))
            });

        let model_path = match extracted {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Abandoning {}: {}", choice.archive, e);
                self.state.notify(StateChange::ExtractionFailed {
                    archive: choice.archive.clone(),
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        Ok(self.import_one(host, &ImportRequest::from_path(&model_path)))
    }

    /// Activate and normalize every armature that is not in `before`.
    fn normalize_added<S: SceneHost + ?Sized>(
        &self,
        scene: &mut S,
        before: &HashSet<ObjectId>,
    ) -> Vec<AddedArmature> {
        let mut added = Vec::new();

        for id in scene.armature_ids() {
            if before.contains(&id) {
                continue;
            }
            let Some(armature) = scene.armature(id) else {
                continue;
            };

            tracing::info!("Added: {}", armature.name);
            scene.set_active_armature(&armature.name);
            let normalized = bones::normalize(scene, id);

            self.state.notify(StateChange::ArmatureAdded {
                name: armature.name.clone(),
                normalized,
            });
            added.push(AddedArmature {
                id,
                name: armature.name,
                normalized,
            });
        }

        added
    }
}

fn armature_snapshot<S: SceneHost + ?Sized>(scene: &S) -> HashSet<ObjectId> {
    scene.armature_ids().into_iter().collect()
}
