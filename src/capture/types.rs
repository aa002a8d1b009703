//! Data model for captured routing-protocol traffic.

use serde::{Deserialize, Serialize};

/// Node address in textual form, as emitted by the dissector and by the node
/// logs.
pub type Address = String;

/// RFC5444 message type of a route request.
pub const MSGTYPE_RREQ: u32 = 10;
/// RFC5444 message type of a route reply.
pub const MSGTYPE_RREP: u32 = 11;
/// RFC5444 message type of a route error.
pub const MSGTYPE_RERR: u32 = 12;

/// Address-TLV type: origin node sequence number.
pub const MSGTLV_ORIGSEQNUM: u32 = 0;
/// Address-TLV type: target node sequence number.
pub const MSGTLV_TARGSEQNUM: u32 = 1;
/// Address-TLV type: sequence number of an unreachable node.
pub const MSGTLV_UNREACHABLE_NODE_SEQNUM: u32 = 2;
/// Address-TLV type: route metric.
pub const MSGTLV_METRIC: u32 = 3;

/// One endpoint of a route discovery. Unset fields were not present in the
/// message, which is different from being zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    pub address: Address,
    pub seqnum: Option<u32>,
    pub metric: Option<u32>,
}

/// Origin/target pair shared by route requests and route replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDiscovery {
    pub origin: RouteNode,
    pub target: RouteNode,
}

/// A node reported unreachable by a route error, with the sequence number
/// paired to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableNode {
    pub address: Address,
    pub seqnum: Option<u32>,
}

/// Typed AODVv2 control message reconstructed from one packet's field tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMessage {
    RouteRequest(RouteDiscovery),
    RouteReply(RouteDiscovery),
    RouteError { unreachable: Vec<UnreachableNode> },
}

impl ControlMessage {
    /// Origin node of a request or reply; route errors have none.
    pub fn origin(&self) -> Option<&RouteNode> {
        match self {
            ControlMessage::RouteRequest(discovery) | ControlMessage::RouteReply(discovery) => {
                Some(&discovery.origin)
            }
            ControlMessage::RouteError { .. } => None,
        }
    }

    pub fn is_reply(&self) -> bool {
        matches!(self, ControlMessage::RouteReply(_))
    }
}

/// What a captured packet carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacketPayload {
    Control(ControlMessage),
    /// Non-routing payload; its content is irrelevant to the evaluation.
    Opaque,
}

/// One entry of the capture, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPacket {
    pub source: Address,
    pub destination: Address,
    pub payload: PacketPayload,
}

/// Aggregate result of the trace evaluation.
///
/// `rreps_received` counts replies whose packet destination names the
/// originator. That is an estimate of delivery, not a proof: in a multi-hop
/// network the capture cannot show whether the packet survived its final hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceSummary {
    pub discoveries_started: usize,
    pub rreps_received: usize,
}
