//! Caller-owned state for one trace evaluation pass.

use std::collections::BTreeSet;

use rayon::prelude::*;

use super::decoder::{self, DecodeError};
use super::field_tree::FieldTree;
use super::types::{Address, CapturedPacket, PacketPayload};

/// Holds the decoded packets and the participant addresses observed while
/// decoding. The session is owned by the caller and dropped with it; there is
/// no process-wide state behind it.
#[derive(Debug, Default)]
pub struct EvaluationSession {
    packets: Vec<CapturedPacket>,
    participants: BTreeSet<Address>,
    strict: bool,
}

impl EvaluationSession {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Default::default()
        }
    }

    /// Decode a batch of field trees into the session.
    ///
    /// Packets are independent of each other, so decoding fans out across
    /// worker threads; the origin addresses of route requests and replies are
    /// merged into the participant set afterwards. The first structural
    /// decode error aborts the whole batch rather than producing counts from
    /// a partially decoded trace.
    pub fn ingest(&mut self, trees: &[FieldTree]) -> Result<(), DecodeError> {
        let decoded = trees
            .par_iter()
            .map(|tree| decoder::decode_packet(tree, self.strict))
            .collect::<Result<Vec<_>, _>>()?;

        for packet in decoded.into_iter().flatten() {
            if let PacketPayload::Control(message) = &packet.payload {
                if let Some(origin) = message.origin() {
                    self.participants.insert(origin.address.clone());
                }
            }
            self.packets.push(packet);
        }

        log::debug!(
            "session holds {} packets from {} participants",
            self.packets.len(),
            self.participants.len()
        );
        Ok(())
    }

    pub fn packets(&self) -> &[CapturedPacket] {
        &self.packets
    }

    /// Addresses that originated at least one route request or reply.
    pub fn participants(&self) -> &BTreeSet<Address> {
        &self.participants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn discovery_tree(msg_type: &str, origin: &str, target: &str, dst: &str) -> FieldTree {
        FieldTree::new(json!({
            "ipv6.src": origin,
            "ipv6.dst": dst,
            "packetbb": {
                "packetbb.msg.type": msg_type,
                "packetbb.msg.addr.value6": [origin, target]
            }
        }))
    }

    #[test]
    fn test_ingest_collects_origin_participants() {
        let trees = vec![
            discovery_tree("10", "fe80::a", "fe80::b", "ff02::1"),
            discovery_tree("11", "fe80::a", "fe80::b", "fe80::a"),
            FieldTree::new(json!({ "icmpv6.type": "135" })),
        ];

        let mut session = EvaluationSession::new(false);
        session.ingest(&trees).unwrap();

        assert_eq!(session.packets().len(), 2);
        assert_eq!(
            session.participants().iter().cloned().collect::<Vec<_>>(),
            vec!["fe80::a".to_string()]
        );
    }

    #[test]
    fn test_ingest_aborts_on_malformed_message() {
        let trees = vec![FieldTree::new(json!({
            "ipv6.src": "fe80::a",
            "ipv6.dst": "ff02::1",
            "packetbb": {
                "packetbb.msg.type": "10",
                "packetbb.msg.addr.value6": ["fe80::a"]
            }
        }))];

        let mut session = EvaluationSession::new(false);
        assert!(session.ingest(&trees).is_err());
        assert!(session.packets().is_empty());
    }
}
