//! Zip archives holding one or more models.
//!
//! Many model archives were packed on Japanese Windows machines. Their member names
//! are stored as CP932 (Shift_JIS) bytes without the UTF-8 flag, so a reader falls
//! back to CP437 and produces mojibake. [`transcode_member_name`] reinterprets the
//! stored bytes as CP932 and keeps the decoded name when that is not possible.

use crate::models::FormatKind;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use encoding_rs::SHIFT_JIS;
use std::fs::{self, File};
use std::io::{self, BufReader};
use thiserror::Error;
use zip::ZipArchive;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Unsafe member path in archive: {0}")]
    UnsafePath(String),
}

/// An importable entry inside an archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArchiveMember {
    /// Name as decoded by the zip reader (UTF-8 flag or CP437).
    pub name: String,
    /// Name exactly as stored in the archive.
    pub raw_name: Vec<u8>,
}

impl ArchiveMember {
    pub fn new(name: impl Into<String>, raw_name: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            raw_name: raw_name.into(),
        }
    }

    /// Member path with the legacy code page corrected.
    pub fn corrected_name(&self) -> String {
        transcode_member_name(&self.raw_name, &self.name)
    }

    /// Last path component of the corrected name.
    pub fn file_name(&self) -> String {
        let corrected = self.corrected_name();
        corrected
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string()
    }

    pub fn format(&self) -> Option<FormatKind> {
        FormatKind::classify(&self.file_name())
    }
}

/// Reinterpret a stored member name as CP932.
///
/// - plain ASCII names are returned unchanged
/// - names stored as valid UTF-8 are returned as UTF-8
/// - otherwise the bytes are decoded as Shift_JIS; if they are not valid Shift_JIS
///   the reader's own decoding is kept
pub fn transcode_member_name(raw: &[u8], decoded: &str) -> String {
    if raw.is_ascii() {
        return decoded.to_string();
    }
    if let Ok(utf8) = std::str::from_utf8(raw) {
        return utf8.to_string();
    }
    match SHIFT_JIS.decode_without_bom_handling_and_without_replacement(raw) {
        Some(name) => name.into_owned(),
        None => {
            tracing::debug!("Member name is not valid CP932, keeping {}", decoded);
            decoded.to_string()
        }
    }
}

/// Directory an archive is extracted into: the archive path without its extension.
pub fn extraction_root(archive: &Utf8Path) -> Utf8PathBuf {
    archive.with_extension("")
}

/// `C:` style drive prefix, which is not parsed as a prefix outside Windows.
fn has_drive_prefix(part: &str) -> bool {
    let bytes = part.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Turn an archive member name into a relative path that stays inside the
/// extraction root.
///
/// Absolute paths, drive prefixes and `..` are rejected. Other characters, `:`
/// included, are kept as stored.
pub fn sanitize_member_path(name: &str) -> Result<Utf8PathBuf, ArchiveError> {
    let normalized = name.replace('\\', "/");
    let mut relative = Utf8PathBuf::new();

    for component in Utf8Path::new(&normalized).components() {
        match component {
            Utf8Component::Normal(part) => {
                if relative.as_str().is_empty() && has_drive_prefix(part) {
                    return Err(ArchiveError::UnsafePath(name.to_string()));
                }
                relative.push(part);
            }
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return Err(ArchiveError::UnsafePath(name.to_string()));
            }
        }
    }

    if relative.as_str().is_empty() {
        return Err(ArchiveError::UnsafePath(name.to_string()));
    }
    Ok(relative)
}

fn open_archive(path: &Utf8Path) -> Result<ZipArchive<BufReader<File>>, ArchiveError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

/// List the members of an archive that can be imported, in archive order.
///
/// Directories, unknown extensions and nested archives are skipped.
pub fn scan_archive(path: &Utf8Path) -> Result<Vec<ArchiveMember>, ArchiveError> {
    let mut archive = open_archive(path)?;
    let mut members = Vec::new();

    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() {
            continue;
        }

        let member = ArchiveMember::new(entry.name(), entry.name_raw());
        match member.format() {
            Some(format) if !format.is_archive() => members.push(member),
            _ => {}
        }
    }

    tracing::debug!("Scanned {}: {} importable member(s)", path, members.len());
    Ok(members)
}

/// Extract every member of `archive` below `root`, using corrected member names.
///
/// Returns the number of files written. Any failure aborts the extraction; files
/// written up to that point are left in place.
pub fn extract_all(archive: &Utf8Path, root: &Utf8Path) -> Result<usize, ArchiveError> {
    let mut zip = open_archive(archive)?;
    let mut written = 0;

    fs::create_dir_all(root)?;

    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let name = transcode_member_name(entry.name_raw(), entry.name());
        let relative = sanitize_member_path(&name)?;
        let out_path = root.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&out_path)?;
        io::copy(&mut entry, &mut outfile)?;
        written += 1;
    }

    tracing::info!("Extracted {} file(s) from {} to {}", written, archive, root);
    Ok(written)
}
