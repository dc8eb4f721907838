use camino::Utf8PathBuf;

/// Progress and results of the most recent import batch.
///
/// This is a UI-facing mirror; the services keep their working state in
/// [`ImportSession`](crate::services::import::ImportSession) and pass it explicitly.
/// Always go through [`crate::state::StateManager`] to read or mutate it.
#[derive(Clone, Debug, Default)]
pub struct AppState {
    // Runtime state
    pub is_importing: bool,
    pub current_file: Option<Utf8PathBuf>,

    // Progress state
    pub progress: usize,
    pub total_files: usize,

    // Results, in processing order
    pub imported_files: Vec<Utf8PathBuf>,
    pub failed_files: Vec<Utf8PathBuf>,
    pub ignored_files: Vec<Utf8PathBuf>,
    // Archives whose models are imported after the scan
    pub queued_files: Vec<Utf8PathBuf>,

    // Set while a disambiguation dialog is open
    pub awaiting_choice: bool,

    // Last export attempt
    pub last_export_blocked: bool,
}

/// Outcome category recorded per processed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Imported,
    Failed,
    Ignored,
    Queued,
}

impl AppState {
    /// Returns (imported, failed, ignored, total).
    pub fn import_stats(&self) -> (usize, usize, usize, usize) {
        (
            self.imported_files.len(),
            self.failed_files.len(),
            self.ignored_files.len(),
            self.total_files,
        )
    }

    /// Reset everything that belongs to a single batch.
    pub fn reset_import_state(&mut self) {
        self.is_importing = false;
        self.current_file = None;
        self.progress = 0;
        self.total_files = 0;
        self.imported_files.clear();
        self.failed_files.clear();
        self.ignored_files.clear();
        self.queued_files.clear();
        self.awaiting_choice = false;
    }

    /// Record the result for one file and advance progress.
    pub fn add_result(&mut self, file: Utf8PathBuf, status: FileStatus) {
        match status {
            FileStatus::Imported => self.imported_files.push(file),
            FileStatus::Failed => self.failed_files.push(file),
            FileStatus::Ignored => self.ignored_files.push(file),
            FileStatus::Queued => self.queued_files.push(file),
        }
        self.progress += 1;
    }

    /// One-line summary, e.g. "2 imported, 1 failed".
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if !self.imported_files.is_empty() {
            parts.push(format!("{} imported", self.imported_files.len()));
        }
        if !self.failed_files.is_empty() {
            parts.push(format!("{} failed", self.failed_files.len()));
        }
        if !self.ignored_files.is_empty() {
            parts.push(format!("{} ignored", self.ignored_files.len()));
        }
        if !self.queued_files.is_empty() {
            parts.push(format!("{} archive(s) scanned", self.queued_files.len()));
        }

        if parts.is_empty() {
            "Nothing imported".to_string()
        } else {
            parts.join(", ")
        }
    }
}
