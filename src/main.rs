//! meshport command-line tool
//!
//! Looks at model files and scene dumps without a host application:
//! - `meshport inspect <paths…>` classifies files and lists the models inside zip
//!   archives, with corrected member names.
//! - `meshport check <scene.yaml>` runs the export pre-flight check on a scene dump
//!   and exits with status 2 when the export would be blocked.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use meshport::services::{self, ArchiveError, ExportReport, bones};
use meshport::{APP_NAME, ConfigManager, FormatKind, SceneSnapshot, VERSION};
use std::fs;
use std::process::ExitCode;

/// Model import dispatcher and export pre-flight checks
#[derive(Parser)]
#[command(name = "meshport")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory holding meshport.yaml
    #[arg(long, global = true, default_value = ".")]
    config_dir: Utf8PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify files and list importable models inside archives
    Inspect(InspectArgs),

    /// Run the export pre-flight check on a scene dump
    Check(CheckArgs),
}

#[derive(Args)]
struct InspectArgs {
    /// Files to inspect
    #[arg(required = true)]
    paths: Vec<Utf8PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    /// Scene dump (YAML)
    scene: Utf8PathBuf,

    /// Check as if texture embedding were enabled
    #[arg(long)]
    embed_textures: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::new(&cli.config_dir)?;
    let mut settings = config_manager.load_settings()?;
    settings.logging.debug |= cli.verbose;

    let _guard = meshport::logging::setup_logging(&settings.logging)?;
    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.command {
        Commands::Inspect(args) => {
            for path in &args.paths {
                inspect(path, settings.import.legacy_host);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check(args) => {
            let contents = fs::read_to_string(&args.scene)
                .with_context(|| format!("Failed to read scene: {}", args.scene))?;
            let scene: SceneSnapshot = serde_yaml_ng::from_str(&contents)
                .with_context(|| format!("Failed to parse scene: {}", args.scene))?;

            let embed_textures = args.embed_textures || settings.export.embed_textures;
            let report = services::validate(
                &scene.meshes,
                scene.document_dir.as_deref(),
                embed_textures,
                &settings.export.limits,
            );
            print_report(&report);
            print_armatures(&scene);

            if report.is_blocked() {
                Ok(ExitCode::from(2))
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn inspect(path: &Utf8Path, legacy_host: bool) {
    match FormatKind::classify(path.as_str()) {
        None => println!("{}: ignored (unsupported file type)", path),
        Some(FormatKind::Archive) => inspect_archive(path),
        Some(format) => {
            println!("{}: {}", path, format);
            if let Some(plugin) = format.plugin(legacy_host) {
                println!("  importer: {}", plugin.name);
            }
        }
    }
}

fn inspect_archive(path: &Utf8Path) {
    match services::archive::scan_archive(path) {
        Ok(members) if members.is_empty() => {
            println!("{}: archive without importable models", path);
        }
        Ok(members) => {
            println!("{}: archive, {} importable model(s)", path, members.len());
            for member in &members {
                let format = member
                    .format()
                    .map(|f| f.to_string())
                    .unwrap_or_default();
                println!("  {} ({})", member.corrected_name(), format);
            }
            println!(
                "  extracts to {}",
                services::archive::extraction_root(path)
            );
        }
        Err(ArchiveError::Io(e)) => println!("{}: cannot open ({})", path, e),
        Err(e) => println!("{}: unreadable archive ({})", path, e),
    }
}

fn print_armatures(scene: &SceneSnapshot) {
    if scene.armatures.is_empty() {
        return;
    }

    println!();
    println!("armatures:");
    for armature in &scene.armatures {
        let orientation = if bones::is_axis_aligned(armature) {
            "axis-aligned, bones can be normalized on import"
        } else {
            "diagonal bones, left as imported"
        };
        println!("  {} ({} bones): {}", armature.name, armature.bones.len(), orientation);
    }
}

fn print_report(report: &ExportReport) {
    let metrics = &report.metrics;
    println!(
        "meshes: {}, tris: {}, materials: {}, textures found: {}",
        metrics.mesh_count,
        metrics.tris_count,
        metrics.material_count(),
        if metrics.textures_found { "yes" } else { "no" }
    );

    if !report.is_blocked() {
        println!("Ready to export.");
        return;
    }

    for warning in &report.warnings {
        println!();
        println!("{}", warning.title());
        for line in warning.lines() {
            println!("  {}", line);
        }
    }
}
