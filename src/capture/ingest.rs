//! Capture ingestion: dissecting pcaps with tshark and loading field-tree
//! dumps.
//!
//! The dissector output is cached as a JSON dump in the working directory,
//! one object per packet. Anything that already produced such a dump can
//! feed the evaluator directly; tshark is only one way to get there.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use log::info;
use serde_json::Value;

use crate::config::EvalConfig;

use super::field_tree::FieldTree;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("failed to run dissector '{command}': {source}")]
    Dissector {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("dissector '{command}' exited with {status}")]
    DissectorFailed { command: String, status: ExitStatus },
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed dump {}: {source}", .path.display())]
    MalformedDump {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Resolve a capture argument into field trees: raw captures go through the
/// dissector, pre-converted `.json` dumps load directly.
pub fn ingest_capture(input: &Path, config: &EvalConfig) -> Result<Vec<FieldTree>, IngestError> {
    let dump = if input.extension().is_some_and(|ext| ext == "json") {
        input.to_path_buf()
    } else {
        convert_pcap(input, config)?
    };
    load_field_trees(&dump)
}

/// Dissect `pcap` into a JSON dump inside the working directory. A stale dump
/// for the same capture is regenerated.
pub fn convert_pcap(pcap: &Path, config: &EvalConfig) -> Result<PathBuf, IngestError> {
    if !pcap.is_file() {
        return Err(IngestError::MissingInput(pcap.to_path_buf()));
    }

    fs::create_dir_all(&config.working_dir).map_err(|source| IngestError::Io {
        path: config.working_dir.clone(),
        source,
    })?;

    let stem = pcap
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "capture".to_string());
    let dump = config.working_dir.join(format!("{stem}.json"));
    if dump.exists() {
        fs::remove_file(&dump).map_err(|source| IngestError::Io {
            path: dump.clone(),
            source,
        })?;
    }

    info!("dissecting {} with {}", pcap.display(), config.tshark_bin);
    let output = Command::new(&config.tshark_bin)
        .arg("-r")
        .arg(pcap)
        .args(["-V", "-Y", "ipv6", "-T", "json"])
        .output()
        .map_err(|source| IngestError::Dissector {
            command: config.tshark_bin.clone(),
            source,
        })?;
    if !output.status.success() {
        return Err(IngestError::DissectorFailed {
            command: config.tshark_bin.clone(),
            status: output.status,
        });
    }

    fs::write(&dump, &output.stdout).map_err(|source| IngestError::Io {
        path: dump.clone(),
        source,
    })?;
    Ok(dump)
}

/// Load a JSON dump into field trees, one per packet.
pub fn load_field_trees(path: &Path) -> Result<Vec<FieldTree>, IngestError> {
    if !path.is_file() {
        return Err(IngestError::MissingInput(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let packets: Vec<Value> =
        serde_json::from_str(&content).map_err(|source| IngestError::MalformedDump {
            path: path.to_path_buf(),
            source,
        })?;

    info!("loaded {} packet entries from {}", packets.len(), path.display());
    Ok(packets.into_iter().map(FieldTree::new).collect())
}
