//! Trace evaluation pipeline for captured AODVv2 traffic.
//!
//! Field trees come in from the external dissector, the decoder rebuilds
//! typed control messages from them, and the evaluator aggregates discovery
//! attempts and received replies per originating node.

pub mod decoder;
pub mod evaluator;
pub mod field_tree;
pub mod ingest;
pub mod session;
pub mod types;

pub use decoder::{decode_message, decode_packet, DecodeError};
pub use evaluator::evaluate_trace;
pub use field_tree::FieldTree;
pub use ingest::{ingest_capture, IngestError};
pub use session::EvaluationSession;
pub use types::*;
