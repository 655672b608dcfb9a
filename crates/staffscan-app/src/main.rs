// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Staffscan — sheet music photo to validated MusicXML
//
// Entry point. Initialises logging, parses the command line, runs one
// request and prints its JSON result on stdout.

mod services;

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;
use staffscan_core::error::{Result, ScanError};
use staffscan_core::human_errors::{HumanError, humanize_error, humanize_failure};
use staffscan_core::ProcessingResult;
use staffscan_document::PageNormalizer;
use staffscan_pipeline::{MusicXmlValidator, ScoreValidator};

use services::data_dir;
use services::scan_service::{EngineOverrides, ScanService};

#[derive(Parser)]
#[command(name = "staffscan", version)]
#[command(about = "Turn a photo or scan of sheet music into a validated MusicXML score")]
struct Cli {
    /// Data directory (default: $XDG_DATA_HOME/staffscan)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Settings file (default: <data-dir>/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Recognition engine executable
    #[arg(long, global = true, env = "STAFFSCAN_ENGINE")]
    engine: Option<String>,

    /// Kill the recognition engine after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    engine_timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recognize an uploaded image as-is
    Upload { image: PathBuf },

    /// Straighten a photographed page, then recognize it
    Photo {
        #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
        image: Option<PathBuf>,

        /// Read the image bytes from standard input
        #[arg(long)]
        stdin: bool,
    },

    /// Only straighten a photographed page and write it as a 300 DPI PNG
    Normalize {
        image: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Only check a score file and print the report
    Validate { score: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            print_json(&json!({ "error": err.to_string() }));
            report(&humanize_error(&err), &err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Returns whether the command succeeded.
fn run(cli: Cli) -> Result<bool> {
    let globals = Globals::from_cli(&cli);
    match cli.command {
        Command::Normalize { image, output } => {
            let page = PageNormalizer::open(&image)?.normalize();
            page.save(&output)?;
            let (width, height) = page.image().dimensions();
            print_json(&json!({
                "path": output.display().to_string(),
                "width": width,
                "height": height,
                "rectified": page.was_rectified(),
            }));
            Ok(true)
        }
        Command::Validate { score } => {
            let report = MusicXmlValidator::new().validate(&score)?;
            let verdict = report.verdict();
            print_json(&json!({ "valid": verdict, "checks": report.checks() }));
            if !verdict {
                let err = ScanError::Validation {
                    path: score,
                    reason: report.summary(),
                };
                report_error(&err);
            }
            Ok(verdict)
        }
        Command::Upload { image } => {
            let service = globals.init_service()?;
            Ok(finish(service.upload(&image)))
        }
        Command::Photo { image, stdin } => {
            let service = globals.init_service()?;
            let result = match image {
                Some(image) if !stdin => service.photo(&image),
                _ => {
                    let mut bytes = Vec::new();
                    std::io::stdin().read_to_end(&mut bytes)?;
                    service.photo_bytes(&bytes)
                }
            };
            Ok(finish(result))
        }
    }
}

/// Options shared by the commands that run the full pipeline.
struct Globals {
    data_dir: PathBuf,
    config_path: PathBuf,
    overrides: EngineOverrides,
}

impl Globals {
    fn from_cli(cli: &Cli) -> Self {
        let data_dir = data_dir::data_dir(cli.data_dir.as_deref());
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir::config_path(&data_dir));
        Self {
            data_dir,
            config_path,
            overrides: EngineOverrides {
                program: cli.engine.clone(),
                timeout_secs: cli.engine_timeout,
            },
        }
    }

    fn init_service(&self) -> Result<ScanService> {
        let service = ScanService::init(&self.data_dir, &self.config_path, &self.overrides)?;
        tracing::info!(
            data_dir = %service.data_dir().display(),
            engine = %service.config().engine.program,
            "staffscan ready"
        );
        Ok(service)
    }
}

/// Print the two-shape result and explain failures on stderr.
fn finish(result: ProcessingResult) -> bool {
    print_json(&result);
    if let ProcessingResult::Failure { kind, error } = &result {
        report(&humanize_failure(*kind, error), error);
    }
    result.is_success()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => tracing::error!(error = %err, "could not serialize output"),
    }
}

fn report_error(err: &ScanError) {
    report(&humanize_error(err), &err.to_string());
}

fn report(human: &HumanError, detail: &str) {
    eprintln!("{}", human.message);
    eprintln!("  {}", human.suggestion);
    eprintln!("  ({detail})");
}
