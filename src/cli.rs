//! Command-line interface for archgraph.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use walkdir::WalkDir;

use crate::config::{self, Config, CONFIG_FILE_NAMES};
use crate::graph::{self, UnitGraph};
use crate::import::{manifest, ClasspathIndex, ImportSession};
use crate::lang;
use crate::report::{self, ModelSummary};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default config template written by `archgraph init`.
const CONFIG_TEMPLATE: &str = include_str!("templates/default.yaml");

/// Import decoded class-file facts into a unit graph and check dependency rules.
///
/// Archgraph reads fact manifests produced by a class-file decoder, resolves
/// every referenced unit (pulling in classpath units or stubbing unknown
/// ones), assembles the result into a graph and evaluates the forbidden
/// dependency constraints of the config.
#[derive(Parser)]
#[command(name = "archgraph")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import fact manifests and print a summary of the model
    Import(ImportArgs),
    /// Import fact manifests and check the configured constraints
    Check(ImportArgs),
    /// Create a new archgraph config from the template
    Init(InitArgs),
}

/// Arguments shared by the import and check commands.
#[derive(Parser)]
pub struct ImportArgs {
    /// Manifest file or directory of manifests to import
    pub path: PathBuf,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Additional classpath manifest file or directory (repeatable)
    #[arg(long = "classpath", value_name = "PATH")]
    pub classpath: Vec<PathBuf>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "archgraph.yaml")]
    pub output: PathBuf,
}

/// Install the stderr log subscriber.
pub fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to install log subscriber: {}", e);
    }
}

/// Config in effect for a run, with a label for reports.
struct LoadedConfig {
    config: Config,
    label: String,
    /// Directory relative classpath entries are resolved against.
    base_dir: Option<PathBuf>,
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => Config::discover(Path::new(".")),
    };
    let Some(path) = path else {
        info!("no config file found, using defaults");
        return Ok(LoadedConfig {
            config: Config::default(),
            label: "(defaults)".to_string(),
            base_dir: None,
        });
    };

    let config = Config::parse_file(&path)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config::validate(&config).context("invalid config")?;
    Ok(LoadedConfig {
        label: path.to_string_lossy().to_string(),
        base_dir: path.parent().map(Path::to_path_buf),
        config,
    })
}

/// Collect manifest files below `root`, sorted by path.
pub fn collect_manifests(root: &Path, config: Option<&Config>) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| {
            // Skip hidden directories
            let hidden = e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.');
            !(e.file_type().is_dir() && hidden)
        })
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !manifest::is_manifest_path(path) {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if CONFIG_FILE_NAMES.contains(&name) {
            continue;
        }
        if config.map(|c| c.is_path_excluded(path)).unwrap_or(false) {
            continue;
        }
        files.push(path.to_path_buf());
    }
    files.sort();
    Ok(files)
}

fn classpath_manifests(args: &ImportArgs, loaded: &LoadedConfig) -> anyhow::Result<Vec<PathBuf>> {
    let configured = loaded.config.import.classpath.iter().map(|entry| {
        match &loaded.base_dir {
            Some(base) if entry.is_relative() => base.join(entry),
            _ => entry.clone(),
        }
    });

    let mut files = Vec::new();
    for entry in configured.chain(args.classpath.iter().cloned()) {
        if !entry.exists() {
            anyhow::bail!("classpath entry does not exist: {}", entry.display());
        }
        files.extend(collect_manifests(&entry, None)?);
    }
    Ok(files)
}

/// Everything produced by one import.
struct ImportedModel {
    graph: UnitGraph,
    summary: ModelSummary,
}

fn import_model(args: &ImportArgs, loaded: &LoadedConfig) -> anyhow::Result<ImportedModel> {
    if !args.path.exists() {
        anyhow::bail!("cannot access path {}", args.path.display());
    }

    let manifests = collect_manifests(&args.path, Some(&loaded.config))?;
    if manifests.is_empty() {
        eprintln!("Warning: no fact manifests found under {}", args.path.display());
    }

    let classpath = ClasspathIndex::from_manifests(&classpath_manifests(args, loaded)?)
        .context("failed to load classpath")?;

    let mut session = ImportSession::with_classpath(loaded.config.resolution, classpath);
    session.record_manifests(&manifests)?;
    session.resolve()?;
    let (record, resolution) = session.finish();

    let graph = graph::assemble(&record);
    let summary = ModelSummary::new(&graph, &resolution, manifests.len());
    Ok(ImportedModel { graph, summary })
}

fn validate_format(format: &str) -> bool {
    if format != "pretty" && format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", format);
        return false;
    }
    true
}

/// Run the import command.
pub fn run_import(args: &ImportArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let loaded = load_config(args.config.as_deref())?;
    let model = import_model(args, &loaded)?;

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &loaded.label, &model.summary, &[])?,
        _ => report::write_pretty(&path_str, &loaded.label, &model.summary, None),
    }
    Ok(EXIT_SUCCESS)
}

/// Run the check command.
pub fn run_check(args: &ImportArgs) -> anyhow::Result<i32> {
    if !validate_format(&args.format) {
        return Ok(EXIT_ERROR);
    }
    let loaded = load_config(args.config.as_deref())?;
    let constraints = loaded.config.forbidden_dependencies()?;
    if constraints.is_empty() {
        eprintln!("Warning: no constraints configured, nothing to check");
    }
    let model = import_model(args, &loaded)?;
    let results = lang::evaluate(&model.graph, &constraints);

    let path_str = args.path.to_string_lossy().to_string();
    match args.format.as_str() {
        "json" => report::write_json(&path_str, &loaded.label, &model.summary, &results)?,
        _ => report::write_pretty(&path_str, &loaded.label, &model.summary, Some(results.as_slice())),
    }

    if results.iter().any(|r| r.is_violated()) {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, CONFIG_TEMPLATE) {
        eprintln!("Error: failed to write config: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to describe your constraints", args.output.display());
    println!("  2. Run: archgraph check <manifests> --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}
