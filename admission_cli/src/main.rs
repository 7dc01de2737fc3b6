//! `upload-gate`: checks local files against the upload admission rules
//! before they are handed to an uploader.

mod scan;

use admission_core::{validate_batch, AdmissionConfig, AdmissionValidator, BatchReport, FileDescriptor};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "upload-gate", about = "Upload admission checks for local files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate files; directories are checked as one folder upload each
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Report this MIME type for every file instead of guessing it
        #[arg(long)]
        mime: Option<String>,
        /// Print a JSON report per path
        #[arg(long)]
        json: bool,
        /// Rules file (TOML); defaults to ./admission.toml when present
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective rules as TOML
    Rules {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a name/size/MIME triple without touching the filesystem
    Explain {
        name: String,
        #[arg(long, default_value = "1")]
        size: u64,
        #[arg(long)]
        mime: Option<String>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { paths, mime, json, config } => {
            let validator = AdmissionValidator::new(load_config(config.as_deref())?.into_rules());
            let mut all_accepted = true;

            for path in &paths {
                let (is_dir, files, report) = check_path(path, mime.as_deref(), &validator).await?;
                all_accepted &= report.all_accepted();

                if json {
                    print_json(path, &report)?;
                } else {
                    print_text(path, is_dir, &files, &report);
                }
            }

            Ok(exit_code(all_accepted))
        }
        Commands::Rules { config } => {
            let config = load_config(config.as_deref())?;
            let rendered = AdmissionConfig::from(&config.rules())
                .to_toml()
                .context("Failed to render rules")?;
            print!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Explain { name, size, mime, config } => {
            let validator = AdmissionValidator::new(load_config(config.as_deref())?.into_rules());
            let descriptor = FileDescriptor {
                name,
                size,
                reported_mime_type: mime,
            };

            let result = validator.validate_file(&descriptor);
            match result.reason() {
                None => println!("ACCEPT {}", descriptor.name),
                Some(reason) => println!("REJECT {}: {} [{}]", descriptor.name, reason, reason.kind()),
            }
            Ok(exit_code(result.is_accepted()))
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<AdmissionConfig> {
    match path {
        Some(path) => AdmissionConfig::load_from(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => AdmissionConfig::load().context("Failed to load configuration"),
    }
}

/// A directory is one folder upload: its files share one budget. A plain file
/// is a batch of one.
async fn check_path(
    path: &Path,
    mime: Option<&str>,
    validator: &AdmissionValidator,
) -> Result<(bool, Vec<PathBuf>, BatchReport)> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Cannot access {}", path.display()))?;

    let files = if metadata.is_dir() {
        let files = scan::collect_files(path).await?;
        info!(directory = %path.display(), files = files.len(), "Scanned directory");
        files
    } else {
        vec![path.to_path_buf()]
    };

    let descriptors = scan::describe_all(&files, mime).await?;
    let report = validate_batch(&descriptors, validator, validator.rules().max_folder_size_bytes);
    debug!(
        path = %path.display(),
        accepted = report.accepted,
        rejected = report.rejected,
        "Checked path"
    );

    Ok((metadata.is_dir(), files, report))
}

fn print_text(path: &Path, is_dir: bool, files: &[PathBuf], report: &BatchReport) {
    for (file, entry) in files.iter().zip(&report.entries) {
        match entry.result.reason() {
            None => println!("ACCEPT {}", file.display()),
            Some(reason) => println!("REJECT {}: {}", file.display(), reason),
        }
    }

    if files.len() > 1 || is_dir {
        println!(
            "{}: {} accepted, {} rejected, {:.2}MB of {}MB used",
            path.display(),
            report.accepted,
            report.rejected,
            report.accepted_bytes as f64 / (1024.0 * 1024.0),
            report.max_folder_bytes / (1024 * 1024),
        );
    }
}

fn print_json(path: &Path, report: &BatchReport) -> Result<()> {
    let value = serde_json::json!({
        "path": path.display().to_string(),
        "report": report,
    });
    let out = serde_json::to_string_pretty(&value).context("Serialize report")?;
    println!("{}", out);
    Ok(())
}

fn exit_code(all_accepted: bool) -> ExitCode {
    if all_accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let default_level = if cfg!(debug_assertions) { "debug" } else { "info" };

        format!(
            "{}={},admission_core=warn",
            env!("CARGO_CRATE_NAME").replace('-', "_"),
            default_level
        )
        .into()
    });

    let fmt_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.compact())
            .init();
    }
}
