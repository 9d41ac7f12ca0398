// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Incoming RTPS message parsing: decode the [`Header`] then walk the
//! submessage stream, dispatching by submessage id and threading a
//! [`ReceiveContext`] that accumulates INFO_SRC/INFO_TS/INFO_DST/INFO_REPLY
//! state for the submessages that follow each one (RTPS Sec.8.3.4).

use crate::error::{Error, Result};
use crate::message::header::Header;
use crate::message::submessages::{
    self, AcknackSubmessage, DataFragSubmessage, DataSubmessage, GapSubmessage,
    HeartbeatFragSubmessage, HeartbeatSubmessage, InfoDstSubmessage, InfoReplySubmessage,
    InfoSrcSubmessage, InfoTsSubmessage, NackFragSubmessage, SubmessageHeader, Timestamp,
};
use crate::types::{GuidPrefix, Locator};

/// One decoded submessage, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Submessage {
    Data(DataSubmessage),
    DataFrag(DataFragSubmessage),
    Gap(GapSubmessage),
    Heartbeat(HeartbeatSubmessage),
    HeartbeatFrag(HeartbeatFragSubmessage),
    Acknack(AcknackSubmessage),
    NackFrag(NackFragSubmessage),
    InfoTs(InfoTsSubmessage),
    InfoSrc(InfoSrcSubmessage),
    InfoDst(InfoDstSubmessage),
    InfoReply(InfoReplySubmessage),
    /// An id this engine does not interpret; the submessage is preserved so
    /// the caller can log or forward it, per RTPS's "ignore unknown
    /// submessages" rule (Sec.8.3.4).
    Unknown(u8),
}

/// Receive-side context threaded across a message's submessage stream.
/// INFO_SRC/INFO_TS/INFO_DST/INFO_REPLY submessages update it in place for
/// every submessage that follows them within the same message.
#[derive(Debug, Clone)]
pub struct ReceiveContext {
    pub source_guid_prefix: GuidPrefix,
    pub source_version: (u8, u8),
    pub source_vendor_id: [u8; 2],
    pub dest_guid_prefix: Option<GuidPrefix>,
    pub timestamp: Option<Timestamp>,
    pub reply_locators: Vec<Locator>,
}

/// The result of parsing one RTPS message: the header plus each submessage
/// alongside the receive context in effect when it was decoded.
#[derive(Debug, Clone)]
pub struct ParsedMessage {
    pub header: Header,
    pub entries: Vec<(ReceiveContext, Submessage)>,
}

pub fn parse(buf: &[u8]) -> Result<ParsedMessage> {
    let (header, mut rest) = Header::decode(buf)?;
    let mut ctx = ReceiveContext {
        source_guid_prefix: header.guid_prefix,
        source_version: header.version,
        source_vendor_id: header.vendor_id,
        dest_guid_prefix: None,
        timestamp: None,
        reply_locators: Vec::new(),
    };
    let mut entries = Vec::new();

    while !rest.is_empty() {
        let sub_header = SubmessageHeader::decode(rest)?;
        let mut body_len = sub_header.octets_to_next_header as usize;
        let available = rest.len() - 4;
        if body_len == 0 {
            // RTPS Sec.8.3.3.2.3: a length of 0 means "rest of message",
            // valid only for the last submessage.
            body_len = available;
        }
        if body_len > available {
            return Err(Error::MalformedSubmessage("submessage length exceeds message bounds"));
        }
        let body = &rest[4..4 + body_len];

        let submsg = match sub_header.id {
            submessages::ID_DATA => Submessage::Data(submessages::decode_data(&sub_header, body)?),
            submessages::ID_DATA_FRAG => {
                Submessage::DataFrag(submessages::decode_data_frag(&sub_header, body)?)
            }
            submessages::ID_GAP => Submessage::Gap(submessages::decode_gap(&sub_header, body)?),
            submessages::ID_HEARTBEAT => {
                Submessage::Heartbeat(submessages::decode_heartbeat(&sub_header, body)?)
            }
            submessages::ID_HEARTBEAT_FRAG => {
                Submessage::HeartbeatFrag(submessages::decode_heartbeat_frag(&sub_header, body)?)
            }
            submessages::ID_ACKNACK => {
                Submessage::Acknack(submessages::decode_acknack(&sub_header, body)?)
            }
            submessages::ID_NACK_FRAG => {
                Submessage::NackFrag(submessages::decode_nack_frag(&sub_header, body)?)
            }
            submessages::ID_INFO_TS => {
                let info = submessages::decode_info_ts(&sub_header, body)?;
                ctx.timestamp = info.timestamp;
                Submessage::InfoTs(info)
            }
            submessages::ID_INFO_SRC => {
                let info = submessages::decode_info_src(&sub_header, body)?;
                ctx.source_guid_prefix = info.guid_prefix;
                ctx.source_version = info.protocol_version;
                ctx.source_vendor_id = info.vendor_id;
                Submessage::InfoSrc(info)
            }
            submessages::ID_INFO_DST => {
                let info = submessages::decode_info_dst(&sub_header, body)?;
                ctx.dest_guid_prefix = Some(info.guid_prefix);
                Submessage::InfoDst(info)
            }
            submessages::ID_INFO_REPLY => {
                let info = submessages::decode_info_reply(&sub_header, body)?;
                ctx.reply_locators = info.unicast_locators.clone();
                Submessage::InfoReply(info)
            }
            other => Submessage::Unknown(other),
        };
        entries.push((ctx.clone(), submsg));
        rest = &rest[4 + body_len..];
    }

    Ok(ParsedMessage { header, entries })
}
