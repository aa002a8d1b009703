//! Counters, ledger, and anomaly records produced by the log scan.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::capture::types::Address;

pub type SeqNum = u32;

/// One (origin, target) discovery relationship.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DiscoveryKey {
    pub origin: Address,
    pub target: Address,
}

/// Per-relationship retry bookkeeping: sequence number to retry count, where
/// zero means the discovery for that sequence number completed successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryLedger {
    entries: BTreeMap<DiscoveryKey, BTreeMap<SeqNum, u32>>,
}

impl DiscoveryLedger {
    /// Record one request attempt: increment the retry count or start it
    /// at 1.
    pub fn record_attempt(&mut self, key: DiscoveryKey, seqnum: SeqNum) {
        *self
            .entries
            .entry(key)
            .or_default()
            .entry(seqnum)
            .or_insert(0) += 1;
    }

    /// Mark the attempt as completed. Returns false when no matching request
    /// was ever recorded, leaving the ledger untouched.
    pub fn record_success(&mut self, key: &DiscoveryKey, seqnum: SeqNum) -> bool {
        match self
            .entries
            .get_mut(key)
            .and_then(|attempts| attempts.get_mut(&seqnum))
        {
            Some(retries) => {
                *retries = 0;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, key: &DiscoveryKey, seqnum: SeqNum) -> Option<u32> {
        self.entries
            .get(key)
            .and_then(|attempts| attempts.get(&seqnum))
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into sorted rows for reporting.
    pub fn rows(&self) -> Vec<LedgerRow> {
        self.entries
            .iter()
            .flat_map(|(key, attempts)| {
                attempts.iter().map(move |(seqnum, retries)| LedgerRow {
                    origin: key.origin.clone(),
                    target: key.target.clone(),
                    seqnum: *seqnum,
                    retries: *retries,
                })
            })
            .collect()
    }
}

/// Flattened ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub origin: Address,
    pub target: Address,
    pub seqnum: SeqNum,
    pub retries: u32,
}

/// Success/failure pair; `fail` is derived as total minus success when the
/// scan finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub success: usize,
    pub fail: usize,
}

/// A reply-received log event with no matching prior request, evidence of a
/// data or log-format problem worth surfacing to the analyst.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerInconsistency {
    /// 1-based line number in the scanned log.
    pub line: usize,
    pub origin: Address,
    pub target: Address,
    pub seqnum: SeqNum,
}

impl fmt::Display for LedgerInconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: reply for {} -> {} (seqnum {}) has no recorded request",
            self.line, self.origin, self.target, self.seqnum
        )
    }
}

/// Everything one log scan produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub discoveries: Tally,
    pub transmissions: Tally,
    /// Discoveries that succeeded without exhausting the retry budget.
    pub discoveries_within_timeout: usize,
    /// Discovery bursts observed (a burst is the requests a node issued
    /// within one reporting context).
    pub requests_issued: usize,
    pub transmissions_attempted: usize,
    /// Replies the targets attempted to send.
    pub replies_sent_by_target: usize,
    /// Replies the targets sent that no originator registered as received.
    pub reply_loss: usize,
    pub ledger: Vec<LedgerRow>,
    pub inconsistencies: Vec<LedgerInconsistency>,
}
