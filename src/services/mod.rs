//! Services module - import dispatch and export pre-flight checks.
//!
//! The services hold no UI code. Everything they need from the host application comes
//! in through the traits in [`crate::host`], and everything a UI has to show goes out
//! as [`StateChange`](crate::state::StateChange) events.
//!
//! # Components
//!
//! - [`ImportService`]: routes files to the format's importer plugin. Handles:
//!   - Building fixed importer parameters per [`FormatKind`](crate::models::FormatKind)
//!   - One interactive retry when a plugin rejects the parameters
//!   - Install guidance when a plugin is missing
//!   - Zip archives: scanning, auto-import of single-model archives, and the
//!     [`ImportSession`] through which the user picks among several models
//!   - Bone normalization of armatures added by the batch
//!
//! - [`ExportService`]: validates the scene ([`validate`]) and calls the exporter with
//!   the parameters the downstream platform expects.
//!
//! - [`ErrorClassifier`]: turns importer domain errors into a [`Diagnosis`].
//!
//! # Usage Example
//!
//! ```ignore
//! use meshport::services::{ImportRequest, ImportService};
//!
//! let service = ImportService::new(settings.import, state.clone());
//! let requests = ImportRequest::from_files(&dir, ["avatar.pmx", "outfits.zip"]);
//!
//! let mut batch = service.dispatch_batch(&mut host, &requests);
//! if batch.awaiting_choice() {
//!     let choice = batch.session.choices()[1].clone();
//!     batch.session.select(choice)?;
//!     service.resolve_archive_choice(&mut host, &mut batch.session)?;
//! }
//! ```

pub mod archive;
pub mod bones;
pub mod diagnosis;
pub mod export;
pub mod import;

pub use archive::{ArchiveError, ArchiveMember};
pub use diagnosis::{Diagnosis, ErrorClassifier};
pub use export::{
    ExportMetrics, ExportMode, ExportOutcome, ExportReport, ExportService, ExportWarning, validate,
};
pub use import::{
    AddedArmature, ArchiveChoice, ArchiveIndex, BatchOutcome, ChoiceResolution, FileOutcome,
    ImportError, ImportOutcome, ImportPhase, ImportRequest, ImportService, ImportSession,
};
