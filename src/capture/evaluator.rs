//! Trace evaluation: discovery attempts and replies received per originator.

use crate::config::EvalConfig;

use super::session::EvaluationSession;
use super::types::{PacketPayload, TraceSummary};

/// Count started route discoveries and received route replies over all known
/// participants.
///
/// One discovery round is assumed to leave `packets_per_discovery_round`
/// request/reply packets originated by the same node in the capture; that is
/// a property of the experimental topology, not of the protocol. A reply
/// counts as received when its packet destination names the originator,
/// which estimates delivery rather than proving it.
pub fn evaluate_trace(session: &EvaluationSession, config: &EvalConfig) -> TraceSummary {
    let mut summary = TraceSummary::default();

    for participant in session.participants() {
        let discoveries: Vec<_> = session
            .packets()
            .iter()
            .filter(|packet| match &packet.payload {
                PacketPayload::Control(message) => message
                    .origin()
                    .is_some_and(|origin| &origin.address == participant),
                PacketPayload::Opaque => false,
            })
            .collect();

        summary.discoveries_started += discoveries.len() / config.packets_per_discovery_round;
        summary.rreps_received += discoveries
            .iter()
            .filter(|packet| {
                matches!(&packet.payload, PacketPayload::Control(message) if message.is_reply())
                    && &packet.destination == participant
            })
            .count();
    }

    summary
}
