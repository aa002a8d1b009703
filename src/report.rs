//! Report generation for trace and log evaluation results.
//!
//! Produces a machine-readable JSON report, a human-readable text report,
//! and a stdout summary. The grouped discovery/transmission breakdown in the
//! text report is the same split the experiment dashboards chart.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::types::{Address, TraceSummary};
use crate::config::EvalConfig;
use crate::logscan::types::OutcomeReport;

/// Metadata stamped on every report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: String,
    pub pcap_file: Option<String>,
    pub log_file: Option<String>,
    pub packets_per_discovery_round: usize,
    pub discovery_attempts_max: u32,
}

impl RunMetadata {
    pub fn new(config: &EvalConfig, pcap: Option<&Path>, log: Option<&Path>) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            pcap_file: pcap.map(|path| path.display().to_string()),
            log_file: log.map(|path| path.display().to_string()),
            packets_per_discovery_round: config.packets_per_discovery_round,
            discovery_attempts_max: config.discovery_attempts_max,
        }
    }
}

/// Result of the trace pipeline, with enough context to read the numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceReport {
    pub summary: TraceSummary,
    pub participants: Vec<Address>,
    pub packets_captured: usize,
}

/// Everything one evaluation run produced. Either pipeline may be absent:
/// not requested, or failed independently of the other.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub metadata: RunMetadata,
    pub trace: Option<TraceReport>,
    pub log: Option<OutcomeReport>,
}

/// Generate JSON report
pub fn generate_json_report(report: &EvaluationReport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// Generate human-readable text report
pub fn generate_text_report(report: &EvaluationReport, output_path: &Path) -> Result<()> {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(72));
    lines.push("               MESH ROUTING EXPERIMENT EVALUATION".to_string());
    lines.push("=".repeat(72));
    lines.push(String::new());

    lines.push(format!("Generated: {}", report.metadata.generated_at));
    if let Some(ref pcap) = report.metadata.pcap_file {
        lines.push(format!("Capture: {pcap}"));
    }
    if let Some(ref log) = report.metadata.log_file {
        lines.push(format!("Node log: {log}"));
    }
    lines.push(format!(
        "Packets per discovery round: {} (topology assumption)",
        report.metadata.packets_per_discovery_round
    ));
    lines.push(format!(
        "Discovery retry budget: {}",
        report.metadata.discovery_attempts_max
    ));
    lines.push(String::new());

    if let Some(ref trace) = report.trace {
        lines.push("=".repeat(72));
        lines.push("                       TRACE EVALUATION".to_string());
        lines.push("=".repeat(72));
        lines.push(String::new());

        lines.push(format!("Packets captured: {}", trace.packets_captured));
        lines.push(format!(
            "Participants: {}",
            if trace.participants.is_empty() {
                "none".to_string()
            } else {
                trace.participants.join(", ")
            }
        ));
        lines.push(format!(
            "Route discoveries started: {}",
            trace.summary.discoveries_started
        ));
        lines.push(format!(
            "Route replies received:    {} (destination-match estimate)",
            trace.summary.rreps_received
        ));
        lines.push(String::new());
    }

    if let Some(ref log) = report.log {
        lines.push("=".repeat(72));
        lines.push("                        LOG EVALUATION".to_string());
        lines.push("=".repeat(72));
        lines.push(String::new());

        let late_success = log
            .discoveries
            .success
            .saturating_sub(log.discoveries_within_timeout);
        let failed_elsewhere = log.discoveries.fail.saturating_sub(log.reply_loss);

        lines.push("Route Discoveries:".to_string());
        lines.push(format!(
            "  successful within timeout: {}",
            log.discoveries_within_timeout
        ));
        lines.push(format!("  successful (late):         {late_success}"));
        lines.push(format!("  failed at RREP delivery:   {}", log.reply_loss));
        lines.push(format!("  failed:                    {failed_elsewhere}"));
        lines.push(String::new());

        lines.push("Transmissions:".to_string());
        lines.push(format!("  successful: {}", log.transmissions.success));
        lines.push(format!("  failed:     {}", log.transmissions.fail));
        lines.push(String::new());

        lines.push(format!(
            "Raw counters: {} discovery bursts, {} transmissions attempted, {} replies sent by targets",
            log.requests_issued, log.transmissions_attempted, log.replies_sent_by_target
        ));
        lines.push(String::new());

        if !log.ledger.is_empty() {
            lines.push("Discovery ledger:".to_string());
            for row in &log.ledger {
                let outcome = if row.retries == 0 {
                    "completed".to_string()
                } else {
                    format!("{} request(s), no completion", row.retries)
                };
                lines.push(format!(
                    "  {} -> {} seqnum {}: {}",
                    row.origin, row.target, row.seqnum, outcome
                ));
            }
            lines.push(String::new());
        }

        if !log.inconsistencies.is_empty() {
            lines.push("Inconsistencies:".to_string());
            for inconsistency in &log.inconsistencies {
                lines.push(format!("  {inconsistency}"));
            }
            lines.push(String::new());
        }
    }

    lines.push("=".repeat(72));

    let content = lines.join("\n");
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write text report to {}", output_path.display()))?;

    log::info!("Text report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &EvaluationReport) {
    println!("\n=== MESH ROUTING EVALUATION SUMMARY ===\n");

    if let Some(ref trace) = report.trace {
        println!("Trace evaluation ({} packets):", trace.packets_captured);
        println!(
            "  discoveries started: {}",
            trace.summary.discoveries_started
        );
        println!(
            "  replies received:    {} (destination-match estimate)",
            trace.summary.rreps_received
        );
    }

    if let Some(ref log) = report.log {
        println!("\nLog evaluation:");
        println!(
            "  discoveries: {} ok / {} failed ({} within timeout)",
            log.discoveries.success, log.discoveries.fail, log.discoveries_within_timeout
        );
        println!(
            "  transmissions: {} ok / {} failed",
            log.transmissions.success, log.transmissions.fail
        );
        if !log.inconsistencies.is_empty() {
            println!("  {} ledger inconsistencies, see report", log.inconsistencies.len());
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logscan::types::{LedgerRow, Tally};
    use tempfile::TempDir;

    fn sample_report() -> EvaluationReport {
        EvaluationReport {
            metadata: RunMetadata::new(
                &EvalConfig::default(),
                Some(Path::new("trace.pcap")),
                Some(Path::new("nodes.log")),
            ),
            trace: Some(TraceReport {
                summary: TraceSummary {
                    discoveries_started: 2,
                    rreps_received: 1,
                },
                participants: vec!["fe80::1".to_string(), "fe80::2".to_string()],
                packets_captured: 7,
            }),
            log: Some(OutcomeReport {
                discoveries: Tally { success: 2, fail: 1 },
                transmissions: Tally { success: 3, fail: 0 },
                discoveries_within_timeout: 1,
                requests_issued: 3,
                transmissions_attempted: 3,
                replies_sent_by_target: 3,
                reply_loss: 1,
                ledger: vec![LedgerRow {
                    origin: "fe80::1".to_string(),
                    target: "fe80::2".to_string(),
                    seqnum: 1,
                    retries: 0,
                }],
                inconsistencies: Vec::new(),
            }),
        }
    }

    #[test]
    fn test_reports_are_written() {
        let dir = TempDir::new().unwrap();
        let report = sample_report();

        let json_path = dir.path().join("evaluation.json");
        let text_path = dir.path().join("evaluation.txt");
        generate_json_report(&report, &json_path).unwrap();
        generate_text_report(&report, &text_path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(json["trace"]["summary"]["discoveries_started"], 2);
        assert_eq!(json["log"]["discoveries"]["success"], 2);

        let text = fs::read_to_string(&text_path).unwrap();
        assert!(text.contains("TRACE EVALUATION"));
        assert!(text.contains("Route discoveries started: 2"));
        assert!(text.contains("successful within timeout: 1"));
        assert!(text.contains("fe80::1 -> fe80::2 seqnum 1: completed"));
    }

    #[test]
    fn test_missing_pipelines_are_omitted() {
        let dir = TempDir::new().unwrap();
        let report = EvaluationReport {
            metadata: RunMetadata::new(&EvalConfig::default(), None, Some(Path::new("nodes.log"))),
            trace: None,
            log: None,
        };

        let text_path = dir.path().join("evaluation.txt");
        generate_text_report(&report, &text_path).unwrap();
        let text = fs::read_to_string(&text_path).unwrap();
        assert!(!text.contains("TRACE EVALUATION"));
        assert!(!text.contains("LOG EVALUATION"));
    }
}
