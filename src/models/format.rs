use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every file format the dispatcher knows how to route.
///
/// The mapping from extension to format is fixed and case-insensitive. Anything
/// outside [`FormatKind::EXTENSIONS`] is not an error, it is simply ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    Mmd,
    XnaLara,
    SourceEngine,
    Fbx,
    Vrm,
    Dae,
    Archive,
}

impl FormatKind {
    /// Extension table, in the order the host's file browser filter lists them.
    pub const EXTENSIONS: &'static [(&'static str, FormatKind)] = &[
        ("pmx", FormatKind::Mmd),
        ("pmd", FormatKind::Mmd),
        ("xps", FormatKind::XnaLara),
        ("mesh", FormatKind::XnaLara),
        ("ascii", FormatKind::XnaLara),
        ("smd", FormatKind::SourceEngine),
        ("qc", FormatKind::SourceEngine),
        ("qci", FormatKind::SourceEngine),
        ("vta", FormatKind::SourceEngine),
        ("dmx", FormatKind::SourceEngine),
        ("fbx", FormatKind::Fbx),
        ("vrm", FormatKind::Vrm),
        ("dae", FormatKind::Dae),
        ("zip", FormatKind::Archive),
    ];

    /// Model formats only, i.e. everything an archive member may be.
    pub const MODELS: [FormatKind; 6] = [
        FormatKind::Mmd,
        FormatKind::XnaLara,
        FormatKind::SourceEngine,
        FormatKind::Fbx,
        FormatKind::Vrm,
        FormatKind::Dae,
    ];

    /// Look up a format from a bare extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::EXTENSIONS
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, kind)| *kind)
    }

    /// Classify a file name (or path) by its last extension.
    ///
    /// Returns `None` for unrecognized or missing extensions.
    pub fn classify(file_name: &str) -> Option<Self> {
        let extension = Utf8Path::new(file_name).extension()?;
        Self::from_extension(extension)
    }

    /// Whether this format is a container that has to be opened first.
    pub fn is_archive(self) -> bool {
        self == FormatKind::Archive
    }

    /// Extensions belonging to this format.
    pub fn extensions(self) -> impl Iterator<Item = &'static str> {
        Self::EXTENSIONS
            .iter()
            .filter(move |(_, kind)| *kind == self)
            .map(|(ext, _)| *ext)
    }

    /// Glob filter for a host file browser, e.g. `*.pmx;*.pmd;...`.
    pub fn file_filter() -> String {
        Self::EXTENSIONS
            .iter()
            .map(|(ext, _)| format!("*.{}", ext))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Human readable name used in logs and dialogs.
    pub fn display_name(self) -> &'static str {
        match self {
            FormatKind::Mmd => "MMD",
            FormatKind::XnaLara => "XNALara",
            FormatKind::SourceEngine => "Source",
            FormatKind::Fbx => "FBX",
            FormatKind::Vrm => "VRM",
            FormatKind::Dae => "DAE",
            FormatKind::Archive => "ZIP",
        }
    }

    /// The host plugin that provides the importer for this format.
    ///
    /// `legacy_host` selects download links for the older host-version branch.
    pub fn plugin(self, legacy_host: bool) -> Option<PluginInfo> {
        let info = match self {
            FormatKind::Mmd => PluginInfo {
                name: "mmd_tools",
                download_url: None,
                hint: "mmd_tools is bundled, enable it in your User Preferences.",
            },
            FormatKind::XnaLara => PluginInfo {
                name: "XPS Tools",
                download_url: Some("https://github.com/johnzero7/XNALaraMesh"),
                hint: "If it is not installed please download and install it manually.",
            },
            FormatKind::SourceEngine => PluginInfo {
                name: "Blender Source Tools",
                download_url: Some("https://github.com/Artfunkel/BlenderSourceTools"),
                hint: "If it is not installed please download and install it manually.",
            },
            FormatKind::Fbx => PluginInfo {
                name: "FBX format",
                download_url: None,
                hint: "The FBX importer ships with the host, enable it in your User Preferences.",
            },
            FormatKind::Vrm => PluginInfo {
                name: "VRM Importer",
                download_url: Some(if legacy_host {
                    "https://github.com/iCyP/VRM_IMPORTER_for_Blender2_79"
                } else {
                    "https://github.com/iCyP/VRM_IMPORTER_for_Blender2_8"
                }),
                hint: "Currently you have to select 'Testing' in the addons settings.",
            },
            FormatKind::Dae => PluginInfo {
                name: "Collada",
                download_url: None,
                hint: "The Collada importer ships with the host, enable it in your User Preferences.",
            },
            FormatKind::Archive => return None,
        };
        Some(info)
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Install guidance for a missing importer plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: &'static str,
    pub download_url: Option<&'static str>,
    pub hint: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_extensions() {
        assert_eq!(FormatKind::classify("model.pmx"), Some(FormatKind::Mmd));
        assert_eq!(FormatKind::classify("model.PMD"), Some(FormatKind::Mmd));
        assert_eq!(FormatKind::classify("generic_item.mesh.ascii"), Some(FormatKind::XnaLara));
        assert_eq!(FormatKind::classify("body.qci"), Some(FormatKind::SourceEngine));
        assert_eq!(FormatKind::classify("Avatar.Fbx"), Some(FormatKind::Fbx));
        assert_eq!(FormatKind::classify("pack.ZIP"), Some(FormatKind::Archive));
    }

    #[test]
    fn test_classify_ignores_unknown() {
        assert_eq!(FormatKind::classify("readme.txt"), None);
        assert_eq!(FormatKind::classify("no_extension"), None);
        assert_eq!(FormatKind::classify(".pmx"), None);
        assert_eq!(FormatKind::classify(""), None);
    }

    #[test]
    fn test_models_exclude_archive() {
        assert!(!FormatKind::MODELS.contains(&FormatKind::Archive));
        assert!(FormatKind::MODELS.iter().all(|kind| kind.plugin(false).is_some()));
        assert!(FormatKind::Archive.plugin(false).is_none());
    }

    #[test]
    fn test_file_filter() {
        let filter = FormatKind::file_filter();
        assert!(filter.starts_with("*.pmx;*.pmd;"));
        assert!(filter.ends_with("*.zip"));
        assert_eq!(filter.split(';').count(), FormatKind::EXTENSIONS.len());
    }

    #[test]
    fn test_vrm_link_depends_on_host_version() {
        let legacy = FormatKind::Vrm.plugin(true).unwrap();
        let current = FormatKind::Vrm.plugin(false).unwrap();
        assert_ne!(legacy.download_url, current.download_url);
    }
}
