// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MLE TLVs: `type(1) + length(1) + value` records carried in the MLE
//! message body (spec §4.6).
//!
//! Grounded on `sixlowpan/nhc.rs`'s "one match arm per wire tag, decode
//! into a small enum" shape, applied to MLE's type-length-value framing
//! instead of 6LoWPAN's NHC dispatch byte.

use crate::mac::stream::{
    decode_u16, decode_u32, decode_u8, encode_bytes, encode_u16, encode_u32, encode_u8, SResult,
};
use crate::{enc_consume, stream_done};

use super::router::LeaderData;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum TlvType {
    SourceAddress = 0,
    Mode = 1,
    Timeout = 2,
    Challenge = 3,
    Response = 4,
    LinkFrameCounter = 5,
    MleFrameCounter = 7,
    Route64 = 9,
    Address16 = 10,
    LeaderData = 11,
    NetworkData = 12,
    TlvRequest = 13,
    ScanMask = 14,
    Connectivity = 15,
    LinkMargin = 16,
    Status = 17,
    Version = 18,
    AddressRegistration = 19,
}

impl TlvType {
    fn from_u8(v: u8) -> Option<Self> {
        use TlvType::*;
        Some(match v {
            0 => SourceAddress,
            1 => Mode,
            2 => Timeout,
            3 => Challenge,
            4 => Response,
            5 => LinkFrameCounter,
            7 => MleFrameCounter,
            9 => Route64,
            10 => Address16,
            11 => LeaderData,
            12 => NetworkData,
            13 => TlvRequest,
            14 => ScanMask,
            15 => Connectivity,
            16 => LinkMargin,
            17 => Status,
            18 => Version,
            19 => AddressRegistration,
            _ => return None,
        })
    }
}

/// Router-id mask plus one route-cost byte per set bit: `RouterIdSequence
/// (1) + RouterIdMask (8, bit 0 = router-id 0, MSB-first within each
/// byte) + one cost byte per set bit, in ascending router-id order`
/// (spec §4.6's Route64 TLV). `entries[i]` is always router-id `i`,
/// `None` where the mask bit was clear — the shape `router.rs`'s
/// relaxation pass consumes directly.
#[derive(Clone, Copy)]
pub struct Route64 {
    pub id_sequence: u8,
    pub entries: [Option<u8>; 63],
}

impl Route64 {
    fn mask(&self) -> [u8; 8] {
        let mut mask = [0u8; 8];
        for (id, entry) in self.entries.iter().enumerate() {
            if entry.is_some() {
                mask[id / 8] |= 0x80 >> (id % 8);
            }
        }
        mask
    }

    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        let present = self.entries.iter().filter(|e| e.is_some()).count();
        let value_len = 1 + 8 + present;
        let off = enc_consume!(buf; encode_u8, TlvType::Route64 as u8);
        let off = enc_consume!(buf, off; encode_u8, value_len as u8);
        let off = enc_consume!(buf, off; encode_u8, self.id_sequence);
        let off = enc_consume!(buf, off; encode_bytes, &self.mask());
        let mut off = off;
        for cost in self.entries.iter().flatten() {
            off = enc_consume!(buf, off; encode_u8, *cost);
        }
        stream_done!(off, off)
    }

    pub fn decode(buf: &[u8]) -> SResult<Route64> {
        let (off, ty_raw) = match decode_u8(buf, 0) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        if ty_raw != TlvType::Route64 as u8 {
            return SResult::Error(crate::error::ThreadError::Parse);
        }
        let (off, len) = match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        if len < 9 || off + len as usize > buf.len() {
            return SResult::Error(crate::error::ThreadError::Parse);
        }
        let (off, id_sequence) = match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let mut mask = [0u8; 8];
        mask.copy_from_slice(&buf[off..off + 8]);
        let mut off = off + 8;
        let mut entries = [None; 63];
        for id in 0..63usize {
            if mask[id / 8] & (0x80 >> (id % 8)) != 0 {
                let cost = match decode_u8(buf, off) {
                    SResult::Done(o, v) => {
                        off = o;
                        v
                    }
                    SResult::Error(e) => return SResult::Error(e),
                };
                entries[id] = Some(cost);
            }
        }
        stream_done!(off, Route64 { id_sequence, entries })
    }

    /// `(dest_router_id, cost)` pairs packed for `router::recompute_routes`.
    pub fn as_pairs(&self) -> ([(u8, u8); 32], usize) {
        let mut pairs = [(0u8, 0u8); 32];
        let mut n = 0;
        for (id, cost) in self.entries.iter().enumerate() {
            if let Some(cost) = cost {
                if n < pairs.len() {
                    pairs[n] = (id as u8, *cost);
                    n += 1;
                }
            }
        }
        (pairs, n)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tlv {
    SourceAddress(u16),
    Mode(u8),
    Timeout(u32),
    Challenge([u8; 8], u8),
    Response([u8; 8], u8),
    LinkFrameCounter(u32),
    MleFrameCounter(u32),
    Address16(u16),
    LeaderData(LeaderData),
    TlvRequest([u8; 8], u8),
    ScanMask(u8),
    Connectivity {
        parent_priority: i8,
        link_quality_3: u8,
        link_quality_2: u8,
        link_quality_1: u8,
        leader_cost: u8,
        id_sequence: u8,
        active_routers: u8,
    },
    LinkMargin(u8),
    Status(u8),
    Version(u16),
}

/// Max bytes any challenge/response/TlvRequest value may hold in this
/// fixed-size model (spec's 8-byte challenge nonce is the largest fixed
/// field; TlvRequest's list is capped the same for a uniform buffer).
const MAX_RAW_LEN: usize = 8;

fn encode_raw(buf: &mut [u8], offset: usize, ty: u8, data: &[u8; MAX_RAW_LEN], len: u8) -> SResult<()> {
    let off = enc_consume!(buf, offset; encode_u8, ty);
    let off = enc_consume!(buf, off; encode_u8, len);
    let n = (len as usize).min(MAX_RAW_LEN);
    if off + n > buf.len() {
        return SResult::Error(crate::error::ThreadError::NoBufs);
    }
    buf[off..off + n].copy_from_slice(&data[..n]);
    stream_done!(off + n)
}

impl Tlv {
    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        let off = match self {
            Tlv::SourceAddress(rloc16) => {
                let off = enc_consume!(buf; encode_u8, TlvType::SourceAddress as u8);
                let off = enc_consume!(buf, off; encode_u8, 2);
                enc_consume!(buf, off; encode_u16, *rloc16)
            }
            Tlv::Mode(mode) => {
                let off = enc_consume!(buf; encode_u8, TlvType::Mode as u8);
                let off = enc_consume!(buf, off; encode_u8, 1);
                enc_consume!(buf, off; encode_u8, *mode)
            }
            Tlv::Timeout(secs) => {
                let off = enc_consume!(buf; encode_u8, TlvType::Timeout as u8);
                let off = enc_consume!(buf, off; encode_u8, 4);
                enc_consume!(buf, off; encode_u32, *secs)
            }
            Tlv::Challenge(data, len) => match encode_raw(buf, 0, TlvType::Challenge as u8, data, *len) {
                SResult::Done(off, _) => off,
                SResult::Error(e) => return SResult::Error(e),
            },
            Tlv::Response(data, len) => match encode_raw(buf, 0, TlvType::Response as u8, data, *len) {
                SResult::Done(off, _) => off,
                SResult::Error(e) => return SResult::Error(e),
            },
            Tlv::LinkFrameCounter(v) => {
                let off = enc_consume!(buf; encode_u8, TlvType::LinkFrameCounter as u8);
                let off = enc_consume!(buf, off; encode_u8, 4);
                enc_consume!(buf, off; encode_u32, *v)
            }
            Tlv::MleFrameCounter(v) => {
                let off = enc_consume!(buf; encode_u8, TlvType::MleFrameCounter as u8);
                let off = enc_consume!(buf, off; encode_u8, 4);
                enc_consume!(buf, off; encode_u32, *v)
            }
            Tlv::Address16(rloc16) => {
                let off = enc_consume!(buf; encode_u8, TlvType::Address16 as u8);
                let off = enc_consume!(buf, off; encode_u8, 2);
                enc_consume!(buf, off; encode_u16, *rloc16)
            }
            Tlv::LeaderData(ld) => {
                let off = enc_consume!(buf; encode_u8, TlvType::LeaderData as u8);
                let off = enc_consume!(buf, off; encode_u8, 8);
                let off = enc_consume!(buf, off; encode_u32, ld.partition_id);
                let off = enc_consume!(buf, off; encode_u8, ld.weighting);
                let off = enc_consume!(buf, off; encode_u8, ld.data_version);
                let off = enc_consume!(buf, off; encode_u8, ld.stable_version);
                enc_consume!(buf, off; encode_u8, ld.leader_router_id)
            }
            Tlv::TlvRequest(data, len) => match encode_raw(buf, 0, TlvType::TlvRequest as u8, data, *len) {
                SResult::Done(off, _) => off,
                SResult::Error(e) => return SResult::Error(e),
            },
            Tlv::ScanMask(mask) => {
                let off = enc_consume!(buf; encode_u8, TlvType::ScanMask as u8);
                let off = enc_consume!(buf, off; encode_u8, 1);
                enc_consume!(buf, off; encode_u8, *mask)
            }
            Tlv::Connectivity {
                parent_priority,
                link_quality_3,
                link_quality_2,
                link_quality_1,
                leader_cost,
                id_sequence,
                active_routers,
            } => {
                let off = enc_consume!(buf; encode_u8, TlvType::Connectivity as u8);
                let off = enc_consume!(buf, off; encode_u8, 7);
                let off = enc_consume!(buf, off; encode_u8, *parent_priority as u8);
                let off = enc_consume!(buf, off; encode_u8, *link_quality_3);
                let off = enc_consume!(buf, off; encode_u8, *link_quality_2);
                let off = enc_consume!(buf, off; encode_u8, *link_quality_1);
                let off = enc_consume!(buf, off; encode_u8, *leader_cost);
                let off = enc_consume!(buf, off; encode_u8, *id_sequence);
                enc_consume!(buf, off; encode_u8, *active_routers)
            }
            Tlv::LinkMargin(m) => {
                let off = enc_consume!(buf; encode_u8, TlvType::LinkMargin as u8);
                let off = enc_consume!(buf, off; encode_u8, 1);
                enc_consume!(buf, off; encode_u8, *m)
            }
            Tlv::Status(s) => {
                let off = enc_consume!(buf; encode_u8, TlvType::Status as u8);
                let off = enc_consume!(buf, off; encode_u8, 1);
                enc_consume!(buf, off; encode_u8, *s)
            }
            Tlv::Version(v) => {
                let off = enc_consume!(buf; encode_u8, TlvType::Version as u8);
                let off = enc_consume!(buf, off; encode_u8, 2);
                enc_consume!(buf, off; encode_u16, *v)
            }
        };
        stream_done!(off, off)
    }

    pub fn decode(buf: &[u8]) -> SResult<Tlv> {
        let (off, ty_raw) = match decode_u8(buf, 0) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let Some(ty) = TlvType::from_u8(ty_raw) else {
            return SResult::Error(crate::error::ThreadError::Parse);
        };
        let (off, len) = match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        if off + len as usize > buf.len() {
            return SResult::Error(crate::error::ThreadError::Parse);
        }
        let val_start = off;
        macro_rules! try_read {
            ($e:expr) => {
                match $e {
                    Ok(v) => v,
                    Err(e) => return SResult::Error(e),
                }
            };
        }
        let tlv = match ty {
            TlvType::SourceAddress => Tlv::SourceAddress(try_read!(read_u16(buf, val_start))),
            TlvType::Mode => Tlv::Mode(try_read!(read_u8(buf, val_start))),
            TlvType::Timeout => Tlv::Timeout(try_read!(read_u32(buf, val_start))),
            TlvType::Challenge => {
                let (data, n) = try_read!(read_raw(buf, val_start, len));
                Tlv::Challenge(data, n)
            }
            TlvType::Response => {
                let (data, n) = try_read!(read_raw(buf, val_start, len));
                Tlv::Response(data, n)
            }
            TlvType::LinkFrameCounter => Tlv::LinkFrameCounter(try_read!(read_u32(buf, val_start))),
            TlvType::MleFrameCounter => Tlv::MleFrameCounter(try_read!(read_u32(buf, val_start))),
            TlvType::Address16 => Tlv::Address16(try_read!(read_u16(buf, val_start))),
            TlvType::LeaderData => {
                if len < 8 {
                    return SResult::Error(crate::error::ThreadError::Parse);
                }
                let partition_id = try_read!(read_u32(buf, val_start));
                let weighting = try_read!(read_u8(buf, val_start + 4));
                let data_version = try_read!(read_u8(buf, val_start + 5));
                let stable_version = try_read!(read_u8(buf, val_start + 6));
                let leader_router_id = try_read!(read_u8(buf, val_start + 7));
                Tlv::LeaderData(LeaderData {
                    partition_id,
                    weighting,
                    data_version,
                    stable_version,
                    leader_router_id,
                })
            }
            TlvType::NetworkData => return SResult::Error(crate::error::ThreadError::Parse),
            TlvType::TlvRequest => {
                let (data, n) = try_read!(read_raw(buf, val_start, len));
                Tlv::TlvRequest(data, n)
            }
            TlvType::ScanMask => Tlv::ScanMask(try_read!(read_u8(buf, val_start))),
            TlvType::Connectivity => {
                if len < 7 {
                    return SResult::Error(crate::error::ThreadError::Parse);
                }
                Tlv::Connectivity {
                    parent_priority: try_read!(read_u8(buf, val_start)) as i8,
                    link_quality_3: try_read!(read_u8(buf, val_start + 1)),
                    link_quality_2: try_read!(read_u8(buf, val_start + 2)),
                    link_quality_1: try_read!(read_u8(buf, val_start + 3)),
                    leader_cost: try_read!(read_u8(buf, val_start + 4)),
                    id_sequence: try_read!(read_u8(buf, val_start + 5)),
                    active_routers: try_read!(read_u8(buf, val_start + 6)),
                }
            }
            TlvType::Route64 => return SResult::Error(crate::error::ThreadError::Parse),
            TlvType::LinkMargin => Tlv::LinkMargin(try_read!(read_u8(buf, val_start))),
            TlvType::Status => Tlv::Status(try_read!(read_u8(buf, val_start))),
            TlvType::Version => Tlv::Version(try_read!(read_u16(buf, val_start))),
            TlvType::AddressRegistration => return SResult::Error(crate::error::ThreadError::Parse),
        };
        stream_done!(off + len as usize, tlv)
    }
}

// Small helpers that convert the `SResult`-returning primitives into a
// plain `Result` local to this module, since TLV decoding chains many of
// them against a value slice that starts mid-buffer.
fn read_u8(buf: &[u8], offset: usize) -> Result<u8, crate::error::ThreadError> {
    match decode_u8(buf, offset) {
        SResult::Done(_, v) => Ok(v),
        SResult::Error(e) => Err(e),
    }
}
fn read_u16(buf: &[u8], offset: usize) -> Result<u16, crate::error::ThreadError> {
    match decode_u16(buf, offset) {
        SResult::Done(_, v) => Ok(v),
        SResult::Error(e) => Err(e),
    }
}
fn read_u32(buf: &[u8], offset: usize) -> Result<u32, crate::error::ThreadError> {
    match decode_u32(buf, offset) {
        SResult::Done(_, v) => Ok(v),
        SResult::Error(e) => Err(e),
    }
}
fn read_raw(buf: &[u8], offset: usize, len: u8) -> Result<([u8; MAX_RAW_LEN], u8), crate::error::ThreadError> {
    let n = (len as usize).min(MAX_RAW_LEN);
    if offset + n > buf.len() {
        return Err(crate::error::ThreadError::Parse);
    }
    let mut data = [0u8; MAX_RAW_LEN];
    data[..n].copy_from_slice(&buf[offset..offset + n]);
    Ok((data, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leader_data_tlv_round_trips() {
        let tlv = Tlv::LeaderData(LeaderData {
            partition_id: 0x1234_5678,
            weighting: 64,
            data_version: 3,
            stable_version: 2,
            leader_router_id: 5,
        });
        let mut buf = [0u8; 16];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        match Tlv::decode(&buf[..len]) {
            SResult::Done(_, decoded) => assert_eq!(decoded, tlv),
            SResult::Error(_) => panic!("decode failed"),
        }
    }

    #[test]
    fn source_address_tlv_round_trips() {
        let tlv = Tlv::SourceAddress(0xfc00);
        let mut buf = [0u8; 8];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        assert_eq!(len, 4);
        match Tlv::decode(&buf[..len]) {
            SResult::Done(_, decoded) => assert_eq!(decoded, tlv),
            SResult::Error(_) => panic!("decode failed"),
        }
    }

    #[test]
    fn challenge_tlv_round_trips() {
        let tlv = Tlv::Challenge([1, 2, 3, 4, 5, 6, 7, 8], 8);
        let mut buf = [0u8; 16];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        match Tlv::decode(&buf[..len]) {
            SResult::Done(_, decoded) => assert_eq!(decoded, tlv),
            SResult::Error(_) => panic!("decode failed"),
        }
    }

    #[test]
    fn route64_round_trips_and_exposes_pairs() {
        let mut entries = [None; 63];
        entries[0] = Some(1);
        entries[5] = Some(3);
        let route = Route64 {
            id_sequence: 9,
            entries,
        };
        let mut buf = [0u8; 16];
        let len = match route.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        let decoded = match Route64::decode(&buf[..len]) {
            SResult::Done(_, r) => r,
            SResult::Error(_) => panic!("decode failed"),
        };
        assert_eq!(decoded.id_sequence, 9);
        let (pairs, n) = decoded.as_pairs();
        assert_eq!(n, 2);
        assert!(pairs[..n].contains(&(0, 1)));
        assert!(pairs[..n].contains(&(5, 3)));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let tlv = Tlv::Timeout(60);
        let mut buf = [0u8; 6];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        assert!(!Tlv::decode(&buf[..len - 1]).is_ok());
    }
}
