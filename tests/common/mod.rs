//! In-memory host used by the integration tests.
//!
//! Importing a file "creates" an armature named after the file stem. An existing
//! armature with that name is deleted first, the way real importers replace a model
//! that is imported twice.

#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use meshport::host::{
    CapabilityError, DomainError, ExportInvocation, ExporterHost, ImportInvocation, ImporterHost,
    SceneHost,
};
use meshport::models::{Armature, Bone, FormatKind, Mesh, ObjectId};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Cursor, Write};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExporterBehavior {
    Works,
    Absent,
    RejectsParams,
    Fails,
}

pub struct FakeHost {
    pub armatures: Vec<Armature>,
    pub meshes: Vec<Mesh>,
    pub document_dir: Option<Utf8PathBuf>,

    /// Formats whose importer plugin is installed.
    pub installed: HashSet<FormatKind>,
    /// Formats whose importer rejects configured parameters.
    pub rejects_params: HashSet<FormatKind>,
    /// File names that fail with a domain error.
    pub domain_errors: HashMap<String, DomainError>,
    /// File names whose armature gets a diagonal bone.
    pub diagonal: HashSet<String>,

    pub exporter: ExporterBehavior,

    pub imports: Vec<ImportInvocation>,
    pub exports: Vec<ExportInvocation>,
    pub active_armature: Option<String>,
    pub normalized: Vec<ObjectId>,
    pub prepared: usize,

    next_id: u64,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            armatures: Vec::new(),
            meshes: Vec::new(),
            document_dir: None,
            installed: FormatKind::MODELS.into_iter().collect(),
            rejects_params: HashSet::new(),
            domain_errors: HashMap::new(),
            diagonal: HashSet::new(),
            exporter: ExporterBehavior::Works,
            imports: Vec::new(),
            exports: Vec::new(),
            active_armature: None,
            normalized: Vec::new(),
            prepared: 0,
            next_id: 1,
        }
    }

    pub fn with_armature(mut self, name: &str) -> Self {
        let armature = self.make_armature(name, false);
        self.armatures.push(armature);
        self
    }

    /// Paths of files imported with configured parameters.
    pub fn imported_paths(&self) -> Vec<Utf8PathBuf> {
        self.imports
            .iter()
            .filter_map(|invocation| match invocation {
                ImportInvocation::Configured(params) => Some(params.file_path()),
                ImportInvocation::Interactive(_) => None,
            })
            .collect()
    }

    pub fn armature_named(&self, name: &str) -> Option<&Armature> {
        self.armatures.iter().find(|a| a.name == name)
    }

    fn make_armature(&mut self, name: &str, diagonal: bool) -> Armature {
        let id = ObjectId(self.next_id);
        self.next_id += 1;

        let mut bones = vec![
            Bone::new("Hips", [0.0, 0.0, 1.0], [0.0, 0.0, 1.2]),
            Bone::new("Spine", [0.0, 0.0, 1.2], [0.0, 0.0, 1.4]),
        ];
        if diagonal {
            bones.push(Bone::new("Arm.L", [0.1, 0.0, 1.4], [0.4, 0.1, 1.3]));
        }

        Armature {
            id,
            name: name.to_string(),
            bones,
        }
    }
}

impl ImporterHost for FakeHost {
    fn import(&mut self, invocation: &ImportInvocation) -> Result<(), CapabilityError> {
        let format = invocation.format();
        if !self.installed.contains(&format) {
            return Err(CapabilityError::Absent);
        }
        self.imports.push(invocation.clone());

        let ImportInvocation::Configured(params) = invocation else {
            return Ok(());
        };
        if self.rejects_params.contains(&format) {
            return Err(CapabilityError::ParameterRejected(
                "unexpected keyword argument".to_string(),
            ));
        }

        let path = params.file_path();
        let file_name = path.file_name().unwrap_or_default().to_string();
        if let Some(error) = self.domain_errors.get(&file_name) {
            return Err(CapabilityError::Domain(error.clone()));
        }

        let stem = path.file_stem().unwrap_or_default().to_string();
        self.armatures.retain(|a| a.name != stem);
        let armature = self.make_armature(&stem, self.diagonal.contains(&file_name));
        self.armatures.push(armature);
        Ok(())
    }
}

impl ExporterHost for FakeHost {
    fn export(&mut self, invocation: &ExportInvocation) -> Result<(), CapabilityError> {
        match self.exporter {
            ExporterBehavior::Absent => return Err(CapabilityError::Absent),
            ExporterBehavior::Fails => {
                return Err(CapabilityError::domain("Disk full"));
            }
            ExporterBehavior::RejectsParams | ExporterBehavior::Works => {}
        }

        self.exports.push(invocation.clone());
        if self.exporter == ExporterBehavior::RejectsParams
            && matches!(invocation, ExportInvocation::Configured(_))
        {
            return Err(CapabilityError::ParameterRejected(
                "unexpected keyword argument 'mesh_smooth_type'".to_string(),
            ));
        }
        Ok(())
    }
}

impl SceneHost for FakeHost {
    fn armature_ids(&self) -> Vec<ObjectId> {
        self.armatures.iter().map(|a| a.id).collect()
    }

    fn armature(&self, id: ObjectId) -> Option<Armature> {
        self.armatures.iter().find(|a| a.id == id).cloned()
    }

    fn meshes(&self) -> Vec<Mesh> {
        self.meshes.clone()
    }

    fn set_active_armature(&mut self, name: &str) {
        self.active_armature = Some(name.to_string());
    }

    fn normalize_bone_orientation(&mut self, id: ObjectId) {
        self.normalized.push(id);
    }

    fn prepare_for_import(&mut self) {
        self.prepared += 1;
    }

    fn document_dir(&self) -> Option<Utf8PathBuf> {
        self.document_dir.clone()
    }
}

pub fn temp_dir() -> (TempDir, Utf8PathBuf) {
    let temp = TempDir::new().unwrap();
    let path = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    (temp, path)
}

/// Write a stored (uncompressed) zip archive.
pub fn write_zip(dir: &Utf8Path, name: &str, entries: &[(&str, &[u8])]) -> Utf8PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (entry, data) in entries {
        writer.start_file(*entry, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Write a zip whose member names are stored as the given bytes without the UTF-8
/// flag, the way legacy Windows archivers store CP932 names.
///
/// Entries are written under ASCII placeholders of the same length, which are then
/// swapped for the raw bytes in both the local headers and the central directory.
pub fn write_zip_raw_names(
    dir: &Utf8Path,
    name: &str,
    entries: &[(&[u8], &[u8])],
) -> Utf8PathBuf {
    let placeholders: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, (raw, _))| {
            let mut placeholder = format!("{}~", i);
            assert!(raw.len() >= placeholder.len(), "raw name too short");
            while placeholder.len() < raw.len() {
                placeholder.push('_');
            }
            placeholder
        })
        .collect();

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (placeholder, (_, data)) in placeholders.iter().zip(entries) {
        writer.start_file(placeholder.as_str(), options).unwrap();
        writer.write_all(data).unwrap();
    }
    let mut bytes = writer.finish().unwrap().into_inner();

    for (placeholder, (raw, _)) in placeholders.iter().zip(entries) {
        replace_bytes(&mut bytes, placeholder.as_bytes(), raw);
    }

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

fn replace_bytes(bytes: &mut [u8], from: &[u8], to: &[u8]) {
    let mut i = 0;
    while i + from.len() <= bytes.len() {
        if &bytes[i..i + from.len()] == from {
            bytes[i..i + from.len()].copy_from_slice(to);
            i += from.len();
        } else {
            i += 1;
        }
    }
}
