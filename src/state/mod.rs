// State management module
//
// The StateManager mirrors import progress for a host UI and publishes everything the
// UI has to show (install guidance, diagnoses, archive choices, export warnings) as
// events on a broadcast channel.

use crate::models::{AppState, FileStatus, FormatKind, PluginInfo};
use crate::services::diagnosis::Diagnosis;
use crate::services::export::ExportWarning;
use crate::services::import::ArchiveChoice;
use camino::Utf8PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

/// Events emitted by the services.
///
/// State deltas are detected automatically by [`StateManager::update`]; user-facing
/// notices are sent explicitly through [`StateManager::notify`].
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// An import batch has started
    ImportStarted { total_files: usize },

    /// An import batch has finished (possibly waiting on an archive choice)
    ImportFinished {
        imported: usize,
        failed: usize,
        ignored: usize,
    },

    /// Progress has been updated during a batch
    ProgressUpdated {
        current: usize,
        total: usize,
        current_file: Option<Utf8PathBuf>,
    },

    /// A single file has been processed
    FileProcessed {
        file: Utf8PathBuf,
        status: FileStatus,
        message: String,
    },

    /// The importer plugin for a format is missing; show install guidance
    InstallGuidance {
        format: FormatKind,
        plugin: PluginInfo,
    },

    /// An importer rejected a file
    ImportFailed {
        file: Utf8PathBuf,
        diagnosis: Diagnosis,
    },

    /// An archive contains no importable models
    ArchiveEmpty { archive: Utf8PathBuf },

    /// An archive could not be opened or read
    ArchiveUnreadable { archive: Utf8PathBuf, message: String },

    /// Extracting an archive failed; its import was abandoned
    ExtractionFailed { archive: Utf8PathBuf, message: String },

    /// Archives hold more than one model; the user has to pick one
    ChoiceRequested { choices: Vec<ArchiveChoice> },

    /// An armature was added by the batch and became the active armature
    ArmatureAdded { name: String, normalized: bool },

    /// The export pre-flight check blocked the export
    ExportBlocked { warnings: Vec<ExportWarning> },

    /// The exporter is not enabled in the host
    ExporterDisabled,

    /// State has been reset
    StateReset,
}

/// Thread-safe state mirror with event emission.
///
/// The services are single-threaded, but a host UI may observe from another thread,
/// so the state lives behind `Arc<RwLock<_>>` and events go out on a
/// `tokio::sync::broadcast` channel. Nobody listening is not an error.
pub struct StateManager {
    state: Arc<RwLock<AppState>>,

    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,
}

impl StateManager {
    /// Create a new StateManager with a broadcast buffer of 100 events.
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(AppState::default())),
            state_tx,
        }
    }

    /// Clone of the current state.
    pub fn snapshot(&self) -> AppState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Execute a function with read access to the state.
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&AppState) -> R,
    {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Mutate the state, then emit an event for every detected change.
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut AppState),
    {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let old_state = state.clone();

        update_fn(&mut state);

        let changes = Self::detect_changes(&old_state, &state);
        for change in &changes {
            let _ = self.state_tx.send(change.clone());
        }

        changes
    }

    /// Publish a user-facing notice that is not tied to a state field.
    pub fn notify(&self, change: StateChange) {
        tracing::debug!("Notify: {:?}", change);
        let _ = self.state_tx.send(change);
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    fn detect_changes(old: &AppState, new: &AppState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.is_importing != new.is_importing {
            if new.is_importing {
                changes.push(StateChange::ImportStarted {
                    total_files: new.total_files,
                });
            } else {
                changes.push(StateChange::ImportFinished {
                    imported: new.imported_files.len(),
                    failed: new.failed_files.len(),
                    ignored: new.ignored_files.len(),
                });
            }
        }

        if old.progress != new.progress
            || old.total_files != new.total_files
            || old.current_file != new.current_file
        {
            changes.push(StateChange::ProgressUpdated {
                current: new.progress,
                total: new.total_files,
                current_file: new.current_file.clone(),
            });
        }

        changes
    }

    // Convenience methods for common state updates

    /// Start a batch of `total_files` requests.
    pub fn start_import(&self, total_files: usize) -> Vec<StateChange> {
        self.update(|state| {
            state.reset_import_state();
            state.is_importing = true;
            state.total_files = total_files;
        })
    }

    /// Finish the running batch.
    pub fn finish_import(&self, awaiting_choice: bool) -> Vec<StateChange> {
        self.update(|state| {
            state.is_importing = false;
            state.current_file = None;
            state.awaiting_choice = awaiting_choice;
        })
    }

    pub fn update_progress(&self, file: Utf8PathBuf) -> Vec<StateChange> {
        self.update(|state| {
            state.current_file = Some(file);
        })
    }

    /// Record the result of processing one file.
    pub fn add_file_result(
        &self,
        file: Utf8PathBuf,
        status: FileStatus,
        message: String,
    ) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.add_result(file.clone(), status);
        });

        let event = StateChange::FileProcessed {
            file,
            status,
            message,
        };
        let _ = self.state_tx.send(event.clone());
        changes.push(event);

        changes
    }

    pub fn set_awaiting_choice(&self, awaiting: bool) {
        self.update(|state| state.awaiting_choice = awaiting);
    }

    pub fn set_export_blocked(&self, blocked: bool) {
        self.update(|state| state.last_export_blocked = blocked);
    }

    /// Reset all batch-related state.
    pub fn reset_import_state(&self) -> Vec<StateChange> {
        let mut changes = self.update(|state| state.reset_import_state());

        let _ = self.state_tx.send(StateChange::StateReset);
        changes.push(StateChange::StateReset);

        changes
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}
