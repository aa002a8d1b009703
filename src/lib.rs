//! # Mesheval - Trace and log evaluation for AODVv2 mesh routing experiments
//!
//! This library reconstructs what happened during a mesh-routing experiment
//! from two kinds of evidence: a packet capture of the routing traffic and
//! the free-text diagnostic log the nodes printed while running.
//!
//! ## Pipelines
//!
//! - **Trace evaluation** (`capture`): an external dissector turns the pcap
//!   into generic per-packet field trees; the decoder rebuilds typed
//!   RREQ/RREP/RERR control messages from them and the evaluator counts, per
//!   originating node, how many route discoveries were started and how many
//!   replies made it back.
//! - **Log evaluation** (`logscan`): a single-pass state machine over the
//!   ordered log lines classifies every route discovery and data
//!   transmission as succeeded, failed, or succeeded past the retry budget,
//!   and keeps a per-(origin, target) discovery ledger.
//!
//! Both pipelines are independent; the `report` module merges whatever ran
//! into one JSON/text report.
//!
//! ## Example
//!
//! ```rust,no_run
//! use mesheval::{capture, config::EvalConfig, logscan};
//!
//! let config = EvalConfig::default();
//!
//! let trees = capture::ingest_capture("dumps/experiment.json".as_ref(), &config)?;
//! let mut session = capture::EvaluationSession::new(config.strict_decode);
//! session.ingest(&trees)?;
//! let summary = capture::evaluate_trace(&session, &config);
//!
//! let outcomes = logscan::classify_log_file("experiment.log".as_ref(), &config)?;
//! println!("{} discoveries started, {} succeeded",
//!     summary.discoveries_started, outcomes.discoveries.success);
//! # Ok::<(), color_eyre::eyre::Report>(())
//! ```
//!
//! ## Error Handling
//!
//! Structural decode errors abort the trace pipeline (partial counts would be
//! misleading); log anomalies are recorded in the report and never abort the
//! scan. Application-level plumbing uses `color_eyre` results, library-level
//! failures are typed enums.

pub mod capture;
pub mod config;
pub mod logscan;
pub mod report;
