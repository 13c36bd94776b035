//! Manifest merger CLI
//!
//! Entry point for the `manifest-merger` command-line tool.

use clap::{CommandFactory, Parser};
use manifest_merger::cli::{CliOverrides, UsageError};
use manifest_merger::config::DEFAULT_CONFIG_FILE;
use manifest_merger::{
    init_tracing, EffectiveConfig, Invoker, MergedDocumentKind, MergingReport, TracingLogger,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "manifest-merger")]
#[command(about = "Merge Android manifests with provenance", version)]
struct Cli {
    /// Main manifest
    #[arg(long)]
    main: Option<PathBuf>,

    /// Library manifests, joined with the platform path separator
    #[arg(long)]
    libs: Option<String>,

    /// Overlay manifests, joined with the platform path separator
    #[arg(long)]
    overlays: Option<String>,

    /// System property NAME=VALUE (repeatable)
    #[arg(long = "property", value_name = "NAME=VALUE")]
    properties: Vec<String>,

    /// Placeholder NAME=VALUE (repeatable)
    #[arg(long = "placeholder", value_name = "NAME=VALUE")]
    placeholders: Vec<String>,

    /// Merged manifest output (default: stdout)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Minimum log level: VERBOSE, INFO, WARNING or ERROR
    #[arg(long)]
    log: Option<String>,

    /// Print usage and exit
    #[arg(long)]
    usage: bool,

    /// application or library
    #[arg(long)]
    merge_type: Option<String>,

    /// Config file (default: manifest-merger.toml when present)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Write the blame report
    #[arg(long)]
    blame_out: Option<PathBuf>,

    /// Write the recorded actions as JSON
    #[arg(long)]
    actions_out: Option<PathBuf>,

    /// Write the variant with encoded placeholders
    #[arg(long)]
    aapt_safe_out: Option<PathBuf>,

    /// Write the incremental deployment variant
    #[arg(long)]
    instant_run_out: Option<PathBuf>,

    /// Write the report summary as JSON
    #[arg(long)]
    report_out: Option<PathBuf>,

    /// Encode unresolved placeholders instead of failing
    #[arg(long)]
    encode_placeholders: bool,

    /// Log the accumulated manifest after each source
    #[arg(long)]
    keep_stages: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            main: self.main.clone(),
            libraries: self.libs.clone(),
            overlays: self.overlays.clone(),
            properties: self.properties.clone(),
            placeholders: self.placeholders.clone(),
            merge_type: self.merge_type.clone(),
            log: self.log.clone(),
            encode_placeholders: self.encode_placeholders,
            keep_stages: self.keep_stages,
            instant_run: self.instant_run_out.is_some(),
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    if cli.usage {
        let _ = Cli::command().print_help();
        process::exit(0);
    }

    let layer = match cli.overrides().to_value() {
        Ok(layer) => layer,
        Err(e) => usage_failure(&e),
    };

    let config_path = cli.config.clone().or_else(|| {
        let default = PathBuf::from(DEFAULT_CONFIG_FILE);
        default.exists().then_some(default)
    });
    let config = match EffectiveConfig::build(config_path.as_deref(), Some(layer)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(1);
        }
    };

    init_tracing(config.log_level());

    if cli.print_config {
        match config.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let Some(main_path) = config.main() else {
        usage_failure(&UsageError::MissingMain);
    };

    let invoker = Invoker::new(main_path)
        .with_libraries(config.libraries())
        .with_overlays(config.overlays())
        .with_placeholders(config.placeholders())
        .with_properties(config.properties())
        .with_merge_type(config.merge_type())
        .with_features(config.features());

    let mut report = match invoker.merge(&TracingLogger) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    if cli.blame_out.is_some() {
        report = match report.with_blame() {
            Ok(report) => report,
            Err(e) => {
                eprintln!("Error: failed to compute blame: {}", e);
                process::exit(1);
            }
        };
    }

    if let Err(e) = write_outputs(&cli, &report) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    for stage in report.intermediate_stages() {
        tracing::debug!(stage = %stage.label, "{}", stage.text);
    }

    eprintln!("{}", report.report_string());
    if !report.status().is_success() {
        process::exit(1);
    }
}

fn usage_failure(error: &UsageError) -> ! {
    eprintln!("Error: {}", error);
    eprintln!("Run with --usage for the list of options");
    process::exit(1);
}

fn write_outputs(cli: &Cli, report: &MergingReport) -> Result<(), String> {
    if let Some(merged) = report.merged_document(MergedDocumentKind::Merged) {
        match &cli.out {
            Some(path) => write_file(path, merged)?,
            None => print!("{}", merged),
        }
    }

    write_variant(cli.aapt_safe_out.as_deref(), report, MergedDocumentKind::AaptSafe)?;
    write_variant(cli.instant_run_out.as_deref(), report, MergedDocumentKind::InstantRun)?;

    write_variant(cli.blame_out.as_deref(), report, MergedDocumentKind::Blame)?;

    if let Some(path) = &cli.actions_out {
        report
            .actions()
            .write_to_file(path)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
    }

    if let Some(path) = &cli.report_out {
        report
            .summary()
            .write_to_file(path)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
    }

    Ok(())
}

fn write_variant(
    path: Option<&Path>,
    report: &MergingReport,
    kind: MergedDocumentKind,
) -> Result<(), String> {
    match (path, report.merged_document(kind)) {
        (Some(path), Some(text)) => write_file(path, text),
        _ => Ok(()),
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), String> {
    fs::write(path, contents).map_err(|e| format!("failed to write {}: {}", path.display(), e))
}
