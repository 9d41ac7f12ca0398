// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! RTPS submessage codecs (RTPS v2.3 Sec.8.3.7), vendor-neutral and
//! independent of any transport.
//!
//! Each submessage type has an `encode` method producing the full
//! 4-byte-header-plus-body wire form, and a free `decode_<kind>` function
//! taking the body slice (header already stripped by [`super::parser`]).

use crate::error::{Error, Result};
use crate::message::cdr::{Reader, Writer};
use crate::types::{EntityId, SeqRange, SequenceNumber, SequenceNumberSet};

pub const ID_ACKNACK: u8 = 0x06;
pub const ID_HEARTBEAT: u8 = 0x07;
pub const ID_GAP: u8 = 0x08;
pub const ID_INFO_TS: u8 = 0x09;
pub const ID_INFO_SRC: u8 = 0x0c;
pub const ID_INFO_DST: u8 = 0x0e;
pub const ID_INFO_REPLY: u8 = 0x0f;
pub const ID_NACK_FRAG: u8 = 0x12;
pub const ID_HEARTBEAT_FRAG: u8 = 0x13;
pub const ID_DATA: u8 = 0x15;
pub const ID_DATA_FRAG: u8 = 0x16;

const FLAG_ENDIANNESS: u8 = 0x01;

fn finish(id: u8, flags: u8, body: Vec<u8>) -> Result<Vec<u8>> {
    let len: u16 = body.len().try_into().map_err(|_| Error::BufferTooSmall)?;
    let mut out = Vec::with_capacity(4 + body.len());
    out.push(id);
    out.push(flags);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decoded submessage header: `(id, flags, octets_to_next_header)`.
#[derive(Debug, Clone, Copy)]
pub struct SubmessageHeader {
    pub id: u8,
    pub flags: u8,
    pub octets_to_next_header: u16,
}

impl SubmessageHeader {
    #[must_use]
    pub fn is_little_endian(&self) -> bool {
        self.flags & FLAG_ENDIANNESS != 0
    }

    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 4 {
            return Err(Error::MalformedSubmessage("submessage header truncated"));
        }
        let le = buf[1] & FLAG_ENDIANNESS != 0;
        let len = if le {
            u16::from_le_bytes([buf[2], buf[3]])
        } else {
            u16::from_be_bytes([buf[2], buf[3]])
        };
        Ok(Self { id: buf[0], flags: buf[1], octets_to_next_header: len })
    }
}

// ---------------------------------------------------------------------
// DATA / DATA_FRAG
// ---------------------------------------------------------------------

const FLAG_INLINE_QOS: u8 = 0x02;
const FLAG_DATA_PRESENT: u8 = 0x04;

/// CDR parameter list scan: returns the byte length of the blob starting at
/// `buf`, including the leading encapsulation header and the trailing
/// PID_SENTINEL entry. Grounded on the CDR-encapsulated PID list produced by
/// the discovery inline-QoS builder (topic-name parameter + sentinel).
fn scan_parameter_list(buf: &[u8]) -> Result<usize> {
    if buf.len() < 4 {
        return Err(Error::MalformedSubmessage("inline QoS header truncated"));
    }
    let mut offset = 4; // CDR encapsulation header (kind + options)
    loop {
        if offset + 4 > buf.len() {
            return Err(Error::MalformedSubmessage("inline QoS parameter list unterminated"));
        }
        let pid = u16::from_le_bytes([buf[offset], buf[offset + 1]]);
        let len = u16::from_le_bytes([buf[offset + 2], buf[offset + 3]]) as usize;
        offset += 4;
        if pid == 0x0001 {
            return Ok(offset);
        }
        if offset + len > buf.len() {
            return Err(Error::MalformedSubmessage("inline QoS parameter value truncated"));
        }
        offset += len;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub seq: SequenceNumber,
    pub inline_qos: Option<Vec<u8>>,
    pub serialized_payload: Option<Vec<u8>>,
}

impl DataSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut flags = FLAG_ENDIANNESS;
        if self.inline_qos.is_some() {
            flags |= FLAG_INLINE_QOS;
        }
        if self.serialized_payload.is_some() {
            flags |= FLAG_DATA_PRESENT;
        }

        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.u16(0); // extraFlags
        w.u16(16); // octetsToInlineQos: fixed header below is 16 bytes
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.seq);
        if let Some(qos) = &self.inline_qos {
            w.bytes(qos);
        }
        if let Some(payload) = &self.serialized_payload {
            w.bytes(payload);
        }
        finish(ID_DATA, flags, body)
    }
}

pub fn decode_data(header: &SubmessageHeader, body: &[u8]) -> Result<DataSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let _extra_flags = r.u16()?;
    let octets_to_inline_qos = r.u16()? as usize;
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let seq = r.seq()?;

    // octets_to_inline_qos counts from just after that field; our fixed
    // prefix (entityIds + seq) is 16 bytes, matching the standard value.
    if octets_to_inline_qos > 16 {
        r.bytes(octets_to_inline_qos - 16)?;
    }

    let rest = r.rest();
    let (inline_qos, payload_start) = if header.flags & FLAG_INLINE_QOS != 0 {
        let n = scan_parameter_list(rest)?;
        (Some(rest[..n].to_vec()), n)
    } else {
        (None, 0)
    };
    let serialized_payload = if header.flags & FLAG_DATA_PRESENT != 0 {
        Some(rest[payload_start..].to_vec())
    } else {
        None
    };

    Ok(DataSubmessage { reader_id, writer_id, seq, inline_qos, serialized_payload })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFragSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub seq: SequenceNumber,
    pub fragment_starting_num: u32,
    pub fragments_in_submessage: u16,
    pub fragment_size: u16,
    pub data_size: u32,
    pub fragment: Vec<u8>,
}

impl DataFragSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.u16(0); // extraFlags
        w.u16(16);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.seq);
        w.u32(self.fragment_starting_num);
        w.u16(self.fragments_in_submessage);
        w.u16(self.fragment_size);
        w.u32(self.data_size);
        w.bytes(&self.fragment);
        finish(ID_DATA_FRAG, FLAG_ENDIANNESS | FLAG_DATA_PRESENT, body)
    }
}

pub fn decode_data_frag(header: &SubmessageHeader, body: &[u8]) -> Result<DataFragSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let _extra_flags = r.u16()?;
    let _octets_to_inline_qos = r.u16()?;
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let seq = r.seq()?;
    let fragment_starting_num = r.u32()?;
    let fragments_in_submessage = r.u16()?;
    let fragment_size = r.u16()?;
    let data_size = r.u32()?;
    let fragment = r.rest().to_vec();
    Ok(DataFragSubmessage {
        reader_id,
        writer_id,
        seq,
        fragment_starting_num,
        fragments_in_submessage,
        fragment_size,
        data_size,
        fragment,
    })
}

// ---------------------------------------------------------------------
// HEARTBEAT / HEARTBEAT_FRAG
// ---------------------------------------------------------------------

const FLAG_FINAL: u8 = 0x02;
const FLAG_LIVELINESS: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub first_sn: SequenceNumber,
    pub last_sn: SequenceNumber,
    pub count: u32,
    pub is_final: bool,
    pub liveliness: bool,
}

impl HeartbeatSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut flags = FLAG_ENDIANNESS;
        if self.is_final {
            flags |= FLAG_FINAL;
        }
        if self.liveliness {
            flags |= FLAG_LIVELINESS;
        }
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.first_sn);
        w.seq(self.last_sn);
        w.u32(self.count);
        finish(ID_HEARTBEAT, flags, body)
    }
}

pub fn decode_heartbeat(header: &SubmessageHeader, body: &[u8]) -> Result<HeartbeatSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let first_sn = r.seq()?;
    let last_sn = r.seq()?;
    let count = r.u32()?;
    Ok(HeartbeatSubmessage {
        reader_id,
        writer_id,
        first_sn,
        last_sn,
        count,
        is_final: header.flags & FLAG_FINAL != 0,
        liveliness: header.flags & FLAG_LIVELINESS != 0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatFragSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    pub last_fragment_num: u32,
    pub count: u32,
}

impl HeartbeatFragSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.writer_sn);
        w.u32(self.last_fragment_num);
        w.u32(self.count);
        finish(ID_HEARTBEAT_FRAG, FLAG_ENDIANNESS, body)
    }
}

pub fn decode_heartbeat_frag(
    header: &SubmessageHeader,
    body: &[u8],
) -> Result<HeartbeatFragSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let writer_sn = r.seq()?;
    let last_fragment_num = r.u32()?;
    let count = r.u32()?;
    Ok(HeartbeatFragSubmessage { reader_id, writer_id, writer_sn, last_fragment_num, count })
}

// ---------------------------------------------------------------------
// ACKNACK / NACK_FRAG
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknackSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub reader_sn_state: SequenceNumberSet,
    pub count: u32,
    pub is_final: bool,
}

impl AcknackSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let flags = if self.is_final { FLAG_ENDIANNESS | FLAG_FINAL } else { FLAG_ENDIANNESS };
        let (num_bits, bitmap) = self.reader_sn_state.to_bitmap();
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.reader_sn_state.base);
        w.u32(num_bits);
        for word in &bitmap {
            w.u32(*word);
        }
        w.u32(self.count);
        finish(ID_ACKNACK, flags, body)
    }
}

pub fn decode_acknack(header: &SubmessageHeader, body: &[u8]) -> Result<AcknackSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let base = r.seq()?;
    let num_bits = r.u32()?;
    let word_count = num_bits.div_ceil(32) as usize;
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(r.u32()?);
    }
    let count = r.u32()?;
    Ok(AcknackSubmessage {
        reader_id,
        writer_id,
        reader_sn_state: SequenceNumberSet::from_bitmap(base, num_bits, &words),
        count,
        is_final: header.flags & FLAG_FINAL != 0,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NackFragSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub writer_sn: SequenceNumber,
    pub fragment_number_state: Vec<u32>,
    pub count: u32,
}

impl NackFragSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.writer_sn);
        w.u32(self.fragment_number_state.len() as u32);
        for f in &self.fragment_number_state {
            w.u32(*f);
        }
        w.u32(self.count);
        finish(ID_NACK_FRAG, FLAG_ENDIANNESS, body)
    }
}

pub fn decode_nack_frag(header: &SubmessageHeader, body: &[u8]) -> Result<NackFragSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let writer_sn = r.seq()?;
    let n = r.u32()? as usize;
    let mut fragment_number_state = Vec::with_capacity(n);
    for _ in 0..n {
        fragment_number_state.push(r.u32()?);
    }
    let count = r.u32()?;
    Ok(NackFragSubmessage { reader_id, writer_id, writer_sn, fragment_number_state, count })
}

// ---------------------------------------------------------------------
// GAP
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapSubmessage {
    pub reader_id: EntityId,
    pub writer_id: EntityId,
    pub gap_start: SequenceNumber,
    pub gap_list: SequenceNumberSet,
}

impl GapSubmessage {
    /// Build a GAP covering the contiguous `range` with no additional
    /// irrelevant sequences beyond it.
    #[must_use]
    pub fn for_range(reader_id: EntityId, writer_id: EntityId, range: SeqRange) -> Self {
        Self {
            reader_id,
            writer_id,
            gap_start: range.start,
            gap_list: SequenceNumberSet::new(range.end),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let (num_bits, bitmap) = self.gap_list.to_bitmap();
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.reader_id.0);
        w.bytes(&self.writer_id.0);
        w.seq(self.gap_start);
        w.seq(self.gap_list.base);
        w.u32(num_bits);
        for word in &bitmap {
            w.u32(*word);
        }
        finish(ID_GAP, FLAG_ENDIANNESS, body)
    }
}

pub fn decode_gap(header: &SubmessageHeader, body: &[u8]) -> Result<GapSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let reader_id = EntityId(r.array4()?);
    let writer_id = EntityId(r.array4()?);
    let gap_start = r.seq()?;
    let list_base = r.seq()?;
    let num_bits = r.u32()?;
    let word_count = num_bits.div_ceil(32) as usize;
    let mut words = Vec::with_capacity(word_count);
    for _ in 0..word_count {
        words.push(r.u32()?);
    }
    Ok(GapSubmessage {
        reader_id,
        writer_id,
        gap_start,
        gap_list: SequenceNumberSet::from_bitmap(list_base, num_bits, &words),
    })
}

// ---------------------------------------------------------------------
// INFO_TS / INFO_SRC / INFO_DST / INFO_REPLY
// ---------------------------------------------------------------------

/// RTPS `Time_t`: seconds since epoch plus a 1/2^32-second fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub seconds: u32,
    pub fraction: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoTsSubmessage {
    pub timestamp: Option<Timestamp>,
}

const FLAG_INVALIDATE: u8 = 0x02;

impl InfoTsSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let flags = match self.timestamp {
            Some(ts) => {
                let mut w = Writer::new(&mut body);
                w.u32(ts.seconds);
                w.u32(ts.fraction);
                FLAG_ENDIANNESS
            }
            None => FLAG_ENDIANNESS | FLAG_INVALIDATE,
        };
        finish(ID_INFO_TS, flags, body)
    }
}

pub fn decode_info_ts(header: &SubmessageHeader, body: &[u8]) -> Result<InfoTsSubmessage> {
    if header.flags & FLAG_INVALIDATE != 0 {
        return Ok(InfoTsSubmessage { timestamp: None });
    }
    let mut r = Reader::new(body, header.is_little_endian());
    let seconds = r.u32()?;
    let fraction = r.u32()?;
    Ok(InfoTsSubmessage { timestamp: Some(Timestamp { seconds, fraction }) })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoSrcSubmessage {
    pub protocol_version: (u8, u8),
    pub vendor_id: [u8; 2],
    pub guid_prefix: [u8; 12],
}

impl InfoSrcSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.u32(0); // unused
        w.u8(self.protocol_version.0);
        w.u8(self.protocol_version.1);
        w.bytes(&self.vendor_id);
        w.bytes(&self.guid_prefix);
        finish(ID_INFO_SRC, FLAG_ENDIANNESS, body)
    }
}

pub fn decode_info_src(header: &SubmessageHeader, body: &[u8]) -> Result<InfoSrcSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    let _unused = r.u32()?;
    let major = r.u8()?;
    let minor = r.u8()?;
    let vendor_id = r.array2()?;
    let guid_prefix = r.array12()?;
    Ok(InfoSrcSubmessage { protocol_version: (major, minor), vendor_id, guid_prefix })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfoDstSubmessage {
    pub guid_prefix: [u8; 12],
}

impl InfoDstSubmessage {
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        let mut w = Writer::new(&mut body);
        w.bytes(&self.guid_prefix);
        finish(ID_INFO_DST, FLAG_ENDIANNESS, body)
    }
}

pub fn decode_info_dst(header: &SubmessageHeader, body: &[u8]) -> Result<InfoDstSubmessage> {
    let mut r = Reader::new(body, header.is_little_endian());
    Ok(InfoDstSubmessage { guid_prefix: r.array12()? })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoReplySubmessage {
    pub unicast_locators: Vec<crate::types::Locator>,
    pub multicast_locators: Vec<crate::types::Locator>,
}

pub fn decode_info_reply(header: &SubmessageHeader, body: &[u8]) -> Result<InfoReplySubmessage> {
    use crate::types::{Locator, LocatorKind};
    let mut r = Reader::new(body, header.is_little_endian());
    let n_unicast = r.u32()?;
    let mut unicast_locators = Vec::with_capacity(n_unicast as usize);
    for _ in 0..n_unicast {
        let kind = LocatorKind::from_wire(r.i32()?);
        let port = r.u32()?;
        let address: [u8; 16] = r.bytes(16)?.try_into().unwrap();
        unicast_locators.push(Locator::new(kind, port, address));
    }
    let multicast_locators = if header.flags & FLAG_FINAL != 0 {
        Vec::new()
    } else {
        let n_multicast = r.u32()?;
        let mut v = Vec::with_capacity(n_multicast as usize);
        for _ in 0..n_multicast {
            let kind = LocatorKind::from_wire(r.i32()?);
            let port = r.u32()?;
            let address: [u8; 16] = r.bytes(16)?.try_into().unwrap();
            v.push(Locator::new(kind, port, address));
        }
        v
    };
    Ok(InfoReplySubmessage { unicast_locators, multicast_locators })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Guid;

    fn hdr(body: &[u8], flags: u8) -> SubmessageHeader {
        SubmessageHeader { id: 0, flags, octets_to_next_header: body.len() as u16 }
    }

    #[test]
    fn data_round_trips_without_inline_qos() {
        let msg = DataSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: Guid::unknown().entity_id,
            seq: 7,
            inline_qos: None,
            serialized_payload: Some(b"payload".to_vec()),
        };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        let decoded = decode_data(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn data_round_trips_with_inline_qos() {
        let qos = super::builder::build_inline_qos_with_topic("Square");
        let msg = DataSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            seq: 1,
            inline_qos: Some(qos),
            serialized_payload: Some(b"xyz".to_vec()),
        };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        let decoded = decode_data(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn heartbeat_round_trips() {
        let msg = HeartbeatSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            first_sn: 1,
            last_sn: 10,
            count: 3,
            is_final: false,
            liveliness: false,
        };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        assert_eq!(header.id, ID_HEARTBEAT);
        let decoded = decode_heartbeat(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn acknack_round_trips_with_bitmap() {
        let mut set = SequenceNumberSet::new(1);
        set.add(2);
        set.add(4);
        let msg = AcknackSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            reader_sn_state: set,
            count: 9,
            is_final: true,
        };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        let decoded = decode_acknack(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
        assert!(decoded.is_final);
    }

    #[test]
    fn gap_round_trips() {
        let msg = GapSubmessage::for_range(EntityId::UNKNOWN, EntityId::UNKNOWN, SeqRange::new(2, 5));
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        let decoded = decode_gap(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn info_ts_round_trips_with_and_without_timestamp() {
        let msg = InfoTsSubmessage { timestamp: Some(Timestamp { seconds: 1, fraction: 2 }) };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        assert_eq!(decode_info_ts(&header, &wire[4..]).unwrap(), msg);

        let invalid = InfoTsSubmessage { timestamp: None };
        let wire = invalid.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        assert_eq!(decode_info_ts(&header, &wire[4..]).unwrap(), invalid);
    }

    #[test]
    fn info_dst_round_trips() {
        let msg = InfoDstSubmessage { guid_prefix: [5; 12] };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        assert_eq!(decode_info_dst(&header, &wire[4..]).unwrap(), msg);
    }

    #[test]
    fn data_frag_round_trips() {
        let msg = DataFragSubmessage {
            reader_id: EntityId::UNKNOWN,
            writer_id: EntityId::UNKNOWN,
            seq: 3,
            fragment_starting_num: 1,
            fragments_in_submessage: 1,
            fragment_size: 1024,
            data_size: 5000,
            fragment: vec![0xAB; 1024],
        };
        let wire = msg.encode().unwrap();
        let header = SubmessageHeader::decode(&wire).unwrap();
        let decoded = decode_data_frag(&header, &wire[4..]).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn malformed_body_is_rejected_not_panicking() {
        let header = hdr(&[], FLAG_ENDIANNESS);
        assert!(decode_heartbeat(&header, &[0u8; 2]).is_err());
    }
}
