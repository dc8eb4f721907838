//! Turning importer domain errors into something a user can act on.

use crate::host::{DomainCode, DomainError};
use crate::models::FormatKind;
use regex::Regex;
use std::fmt;

/// User-facing explanation of why a file could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnosis {
    /// The file's format version is older than the importer supports.
    UnsupportedVersion {
        format: FormatKind,
        found: Option<u32>,
        minimum: u32,
    },

    /// The importer refused our parameters and the interactive retry as well.
    Rejected(String),

    /// No known cause; the importer's own message.
    Raw(String),
}

impl Diagnosis {
    /// Lines shown in the error dialog.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Diagnosis::UnsupportedVersion {
                format: FormatKind::Fbx,
                ..
            } => vec![
                "The FBX file version is unsupported!".to_string(),
                "Please use a tool such as the \"Autodesk FBX Converter\" to make it compatible."
                    .to_string(),
            ],
            Diagnosis::UnsupportedVersion {
                format,
                found,
                minimum,
            } => {
                let found = found.map(|v| format!(" {}", v)).unwrap_or_default();
                vec![format!(
                    "The {} file version{} is unsupported, it must be {} or later.",
                    format, found, minimum
                )]
            }
            Diagnosis::Rejected(message) => vec![
                "The importer did not accept the import settings.".to_string(),
                message.clone(),
            ],
            Diagnosis::Raw(message) => vec![message.clone()],
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines().join(" "))
    }
}

/// Classifies importer domain errors.
///
/// A structured [`DomainCode`] always wins. Plugins that only report a message are
/// matched against known message shapes:
///
/// - `fbx_version_pattern`: the FBX importer's "too old" error
///   - Pattern: `(?:version\s+(\d+)\s+)?unsupported,\s*must be\s+(\d+)\s+or later`
///   - Example match: "Version 6100 unsupported, must be 7100 or later"
pub struct ErrorClassifier {
    fbx_version_pattern: Regex,
}

impl ErrorClassifier {
    pub fn new() -> Self {
        Self {
            fbx_version_pattern: Regex::new(
                r"(?i)(?:version\s+(\d+)\s+)?unsupported,\s*must be\s+(\d+)\s+or later",
            )
            .expect("Invalid FBX version regex"),
        }
    }

    pub fn classify(&self, format: FormatKind, error: &DomainError) -> Diagnosis {
        if let Some(DomainCode::UnsupportedVersion { found, minimum }) = error.code {
            return Diagnosis::UnsupportedVersion {
                format,
                found,
                minimum,
            };
        }

        if format == FormatKind::Fbx {
            if let Some(caps) = self.fbx_version_pattern.captures(&error.message) {
                let found = caps.get(1).and_then(|m| m.as_str().parse().ok());
                let minimum = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(7100);
                return Diagnosis::UnsupportedVersion {
                    format,
                    found,
                    minimum,
                };
            }
        }

        tracing::debug!("Unclassified {} importer error: {}", format, error.message);
        Diagnosis::Raw(error.message.clone())
    }
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self::new()
    }
}
