//! Log evaluation pipeline: single-pass outcome classification of the
//! experiment's combined node log.

pub mod classifier;
pub mod types;

pub use classifier::{classify_lines, classify_log_file};
pub use types::{
    DiscoveryKey, DiscoveryLedger, LedgerInconsistency, LedgerRow, OutcomeReport, Tally,
};
