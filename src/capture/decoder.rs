//! Control-message decoder: typed AODVv2 messages from generic field trees.
//!
//! The dissector exposes addresses and TLVs as ordered sequences without
//! telling us which role each entry plays. The decoder applies the encoding
//! conventions of the firmware under test: for requests and replies the
//! first address is the origin and the second the target, and for route
//! errors TLV i carries the sequence number of address i. Neither convention
//! is guaranteed by the wire format; strict mode turns detectable violations
//! into errors instead of best-effort results.

use log::warn;

use super::field_tree::{
    FieldTree, FIELD_ADDR, FIELD_DATA, FIELD_IPV6_DST, FIELD_IPV6_SRC, FIELD_MSG_TYPE,
    FIELD_PACKETBB, FIELD_TLV, FIELD_TLV_INDEX, FIELD_TLV_TYPE, FIELD_TLV_VALUE,
};
use super::types::{
    CapturedPacket, ControlMessage, PacketPayload, RouteDiscovery, RouteNode, UnreachableNode,
    MSGTLV_METRIC, MSGTLV_ORIGSEQNUM, MSGTLV_TARGSEQNUM, MSGTYPE_RERR, MSGTYPE_RREP, MSGTYPE_RREQ,
};

/// Structural problems in a routing message. These abort the trace pipeline:
/// skipping a malformed message silently would corrupt the aggregate counts.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("route message (type {msg_type}) carries {found} addresses, expected at least 2")]
    MissingAddresses { msg_type: u32, found: usize },
    #[error("TLV index {index} selects neither origin (0) nor target (1)")]
    BadTlvIndex { index: u32 },
    #[error("TLV type {tlv_type} attached twice to the same node")]
    DuplicateTlv { tlv_type: u32 },
    #[error("route error carries {addresses} addresses but {tlvs} TLVs")]
    UnbalancedRouteError { addresses: usize, tlvs: usize },
}

/// Decode one packet's field tree into a captured-packet record.
///
/// Returns `None` for entries without an IPv6 layer and for IPv6 packets
/// that carry neither routing fields nor a data payload (dissector noise
/// such as ICMPv6).
pub fn decode_packet(
    tree: &FieldTree,
    strict: bool,
) -> Result<Option<CapturedPacket>, DecodeError> {
    let (Some(source), Some(destination)) =
        (tree.scalar(FIELD_IPV6_SRC), tree.scalar(FIELD_IPV6_DST))
    else {
        return Ok(None);
    };

    let payload = match tree.subtree(FIELD_PACKETBB) {
        Some(routing) => match decode_message(&routing, strict)? {
            Some(message) => PacketPayload::Control(message),
            None => PacketPayload::Opaque,
        },
        None => {
            if tree.scalar(FIELD_DATA).is_none() {
                return Ok(None);
            }
            PacketPayload::Opaque
        }
    };

    Ok(Some(CapturedPacket {
        source,
        destination,
        payload,
    }))
}

/// Decode the routing fields of one packet.
///
/// A missing `message-type` field means the packet carries no routing
/// message; an unrecognized type is treated the same way rather than as an
/// error.
pub fn decode_message(
    tree: &FieldTree,
    strict: bool,
) -> Result<Option<ControlMessage>, DecodeError> {
    let Some(msg_type) = tree.scalar(FIELD_MSG_TYPE).as_deref().and_then(parse_u32) else {
        return Ok(None);
    };

    match msg_type {
        MSGTYPE_RREQ | MSGTYPE_RREP => {
            let discovery = decode_discovery(tree, msg_type, strict)?;
            Ok(Some(if msg_type == MSGTYPE_RREQ {
                ControlMessage::RouteRequest(discovery)
            } else {
                ControlMessage::RouteReply(discovery)
            }))
        }
        MSGTYPE_RERR => Ok(Some(decode_route_error(tree, strict)?)),
        other => {
            log::debug!("ignoring control message of unrecognized type {other}");
            Ok(None)
        }
    }
}

fn decode_discovery(
    tree: &FieldTree,
    msg_type: u32,
    strict: bool,
) -> Result<RouteDiscovery, DecodeError> {
    let addresses = tree.scalars(FIELD_ADDR);
    if addresses.len() < 2 {
        return Err(DecodeError::MissingAddresses {
            msg_type,
            found: addresses.len(),
        });
    }

    // Position 0 is the origin and position 1 the target by convention; the
    // wire format does not guarantee this ordering.
    let mut origin = RouteNode {
        address: addresses[0].clone(),
        ..Default::default()
    };
    let mut target = RouteNode {
        address: addresses[1].clone(),
        ..Default::default()
    };

    for tlv in tree.sequence(FIELD_TLV) {
        let Some(value) = tlv.scalar(FIELD_TLV_VALUE).as_deref().and_then(parse_u32) else {
            continue;
        };
        let Some(tlv_type) = tlv.scalar(FIELD_TLV_TYPE).as_deref().and_then(parse_u32) else {
            continue;
        };
        let node = match tlv.scalar(FIELD_TLV_INDEX).as_deref().and_then(parse_u32) {
            Some(0) => &mut origin,
            Some(1) => &mut target,
            Some(index) => {
                if strict {
                    return Err(DecodeError::BadTlvIndex { index });
                }
                warn!("skipping TLV with out-of-range index {index}");
                continue;
            }
            None => continue,
        };

        let slot = match tlv_type {
            MSGTLV_ORIGSEQNUM | MSGTLV_TARGSEQNUM => &mut node.seqnum,
            MSGTLV_METRIC => &mut node.metric,
            _ => continue,
        };
        if slot.replace(value).is_some() {
            if strict {
                return Err(DecodeError::DuplicateTlv { tlv_type });
            }
            warn!("TLV type {tlv_type} attached twice to {}, keeping the later value", node.address);
        }
    }

    Ok(RouteDiscovery { origin, target })
}

fn decode_route_error(tree: &FieldTree, strict: bool) -> Result<ControlMessage, DecodeError> {
    let addresses = tree.scalars(FIELD_ADDR);
    let tlvs = tree.sequence(FIELD_TLV);

    if tlvs.len() != addresses.len() {
        if strict {
            return Err(DecodeError::UnbalancedRouteError {
                addresses: addresses.len(),
                tlvs: tlvs.len(),
            });
        }
        warn!(
            "route error pairs {} addresses with {} TLVs by position",
            addresses.len(),
            tlvs.len()
        );
    }

    let mut unreachable: Vec<UnreachableNode> = addresses
        .into_iter()
        .map(|address| UnreachableNode {
            address,
            seqnum: None,
        })
        .collect();

    // TLV i belongs to address i; nothing in the encoding enforces it.
    for (node, tlv) in unreachable.iter_mut().zip(&tlvs) {
        node.seqnum = tlv.scalar(FIELD_TLV_VALUE).as_deref().and_then(parse_u32);
    }

    Ok(ControlMessage::RouteError { unreachable })
}

/// Dissectors render values as decimal or raw hex depending on version.
fn parse_u32(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    raw.parse()
        .ok()
        .or_else(|| u32::from_str_radix(raw.trim_start_matches("0x"), 16).ok())
}
