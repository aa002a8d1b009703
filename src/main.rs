//! Evaluation CLI for AODVv2 mesh routing experiments.
//!
//! Runs the trace pipeline, the log pipeline, or both, and writes a combined
//! JSON and text report. One pipeline failing never suppresses the other's
//! results.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Parser};
use color_eyre::eyre::{eyre, Context, Result};
use env_logger::Env;
use log::{error, info};

use mesheval::capture::{self, EvaluationSession};
use mesheval::config::EvalConfig;
use mesheval::logscan;
use mesheval::report::{self, EvaluationReport, RunMetadata, TraceReport};

/// Trace and log evaluation for AODVv2 mesh routing experiments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("input").required(true).multiple(true)))]
struct Args {
    /// Capture to evaluate: a pcap (dissected via tshark) or a pre-converted
    /// JSON dump
    #[arg(short, long, group = "input")]
    pcap: Option<PathBuf>,

    /// Combined node log file to evaluate
    #[arg(short, long, group = "input")]
    log: Option<PathBuf>,

    /// Path to an evaluation configuration YAML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory for the JSON and text reports
    #[arg(short, long, default_value = "eval_output")]
    output: PathBuf,

    /// Fail on detectable field-ordering violations instead of warning
    #[arg(long)]
    strict: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    let mut config = match &args.config {
        Some(path) => EvalConfig::load(path)?,
        None => EvalConfig::default(),
    };
    if args.strict {
        config.strict_decode = true;
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output.display()))?;

    let mut failures: Vec<color_eyre::eyre::Report> = Vec::new();

    let trace = match &args.pcap {
        Some(pcap) => {
            info!("Evaluating capture {}", pcap.display());
            match evaluate_capture(pcap, &config) {
                Ok(trace) => Some(trace),
                Err(e) => {
                    error!("Capture evaluation failed: {e:#}");
                    failures.push(e);
                    None
                }
            }
        }
        None => None,
    };

    let log = match &args.log {
        Some(log_path) => {
            info!("Evaluating node log {}", log_path.display());
            match logscan::classify_log_file(log_path, &config) {
                Ok(outcomes) => Some(outcomes),
                Err(e) => {
                    error!("Log evaluation failed: {e:#}");
                    failures.push(e);
                    None
                }
            }
        }
        None => None,
    };

    let report = EvaluationReport {
        metadata: RunMetadata::new(&config, args.pcap.as_deref(), args.log.as_deref()),
        trace,
        log,
    };

    report::generate_json_report(&report, &args.output.join("evaluation.json"))?;
    report::generate_text_report(&report, &args.output.join("evaluation.txt"))?;
    report::print_summary(&report);

    if !failures.is_empty() {
        return Err(eyre!(
            "{} of the requested pipelines failed, see log output",
            failures.len()
        ));
    }
    Ok(())
}

fn evaluate_capture(pcap: &Path, config: &EvalConfig) -> Result<TraceReport> {
    let trees = capture::ingest_capture(pcap, config)?;

    let mut session = EvaluationSession::new(config.strict_decode);
    session.ingest(&trees)?;

    let summary = capture::evaluate_trace(&session, config);
    Ok(TraceReport {
        summary,
        participants: session.participants().iter().cloned().collect(),
        packets_captured: session.packets().len(),
    })
}
