// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outgoing RTPS message assembly: a [`Header`] followed by a sequence of
//! submessages, each appended as its own element. The builder does not
//! itself decide fragmentation policy — callers hand it pre-fragmented
//! [`DataFragSubmessage`]s when the writer has already split a payload that
//! exceeds `max_msg_size`.

use crate::message::header::Header;
use crate::message::submessages::{
    AcknackSubmessage, DataFragSubmessage, DataSubmessage, GapSubmessage, HeartbeatFragSubmessage,
    HeartbeatSubmessage, InfoDstSubmessage, InfoSrcSubmessage, InfoTsSubmessage, NackFragSubmessage,
    Timestamp,
};
use crate::types::GuidPrefix;

/// CDR encapsulation kind for a PL_CDR_LE parameter list (RTPS Sec.10).
const CDR_LE: u16 = 0x0003;
const PID_TOPIC_NAME: u16 = 0x0005;
const PID_SENTINEL: u16 = 0x0001;

/// Build an inline-QoS parameter list carrying only `PID_TOPIC_NAME`,
/// terminated by `PID_SENTINEL`, 4-byte aligned per the CDR encapsulation
/// rules. Used for intra-engine topic routing ahead of SEDP resolution.
#[must_use]
pub fn build_inline_qos_with_topic(topic: &str) -> Vec<u8> {
    let topic_bytes = topic.as_bytes();
    let string_len = topic_bytes.len() + 1;
    let param_len = 4 + string_len;
    let Ok(param_len_u16) = u16::try_from(param_len) else { return Vec::new() };
    let string_len_u32 = string_len as u32;

    let unaligned = 4 + string_len;
    let aligned = (unaligned + 3) & !3;
    let padding = aligned - unaligned;

    let mut qos = Vec::with_capacity(8 + aligned + 4);
    qos.extend_from_slice(&CDR_LE.to_be_bytes());
    qos.extend_from_slice(&[0x00, 0x00]); // options
    qos.extend_from_slice(&PID_TOPIC_NAME.to_le_bytes());
    qos.extend_from_slice(&param_len_u16.to_le_bytes());
    qos.extend_from_slice(&string_len_u32.to_le_bytes());
    qos.extend_from_slice(topic_bytes);
    qos.push(0);
    qos.extend(std::iter::repeat_n(0u8, padding));
    qos.extend_from_slice(&PID_SENTINEL.to_le_bytes());
    qos.extend_from_slice(&0u16.to_le_bytes());
    qos
}

/// Accumulates a header and a run of submessages into one outgoing message.
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    #[must_use]
    pub fn new(guid_prefix: GuidPrefix) -> Self {
        let mut buf = Vec::with_capacity(256);
        Header::new(guid_prefix).encode(&mut buf);
        Self { buf }
    }

    fn push(&mut self, submsg: crate::error::Result<Vec<u8>>) -> crate::error::Result<&mut Self> {
        self.buf.extend_from_slice(&submsg?);
        Ok(self)
    }

    pub fn info_ts(&mut self, timestamp: Timestamp) -> crate::error::Result<&mut Self> {
        self.push(InfoTsSubmessage { timestamp: Some(timestamp) }.encode())
    }

    pub fn info_ts_invalid(&mut self) -> crate::error::Result<&mut Self> {
        self.push(InfoTsSubmessage { timestamp: None }.encode())
    }

    pub fn info_src(&mut self, msg: InfoSrcSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn info_dst(&mut self, guid_prefix: GuidPrefix) -> crate::error::Result<&mut Self> {
        self.push(InfoDstSubmessage { guid_prefix }.encode())
    }

    pub fn data(&mut self, msg: &DataSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn data_frag(&mut self, msg: &DataFragSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn heartbeat(&mut self, msg: &HeartbeatSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn heartbeat_frag(
        &mut self,
        msg: &HeartbeatFragSubmessage,
    ) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn acknack(&mut self, msg: &AcknackSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn nack_frag(&mut self, msg: &NackFragSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    pub fn gap(&mut self, msg: &GapSubmessage) -> crate::error::Result<&mut Self> {
        self.push(msg.encode())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
