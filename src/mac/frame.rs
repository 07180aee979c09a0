// SPDX-License-Identifier: Apache-2.0 OR MIT

//! IEEE 802.15.4 frame types: FCF, addressing, auxiliary security header.
//!
//! Grounded on spec §3's "MAC Frame" data model and the `Header`/
//! `MacAddress`/`PanID`/`Security`/`KeyId` shapes referenced (but not
//! defined in the retrievable source) by `ieee802154/framer.rs`'s
//! `use crate::net::ieee802154::{FrameType, FrameVersion, Header, KeyId,
//! MacAddress, PanID, Security, SecurityLevel};` — reconstructed here from
//! those call sites plus spec §3/§4.2's field list.

use crate::mac::stream::{
    decode_u16, decode_u32, decode_u8, encode_bytes, encode_u16, encode_u32, encode_u8, SResult,
};

pub const MAX_PSDU_LEN: usize = 127;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    Command,
}

impl FrameType {
    fn bits(self) -> u8 {
        match self {
            FrameType::Beacon => 0b000,
            FrameType::Data => 0b001,
            FrameType::Ack => 0b010,
            FrameType::Command => 0b011,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b000 => Some(FrameType::Beacon),
            0b001 => Some(FrameType::Data),
            0b010 => Some(FrameType::Ack),
            0b011 => Some(FrameType::Command),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FrameVersion {
    V2003,
    V2006,
    V2015,
}

impl FrameVersion {
    fn bits(self) -> u8 {
        match self {
            FrameVersion::V2003 => 0b00,
            FrameVersion::V2006 => 0b01,
            FrameVersion::V2015 => 0b10,
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits {
            0b00 => FrameVersion::V2003,
            0b01 => FrameVersion::V2006,
            _ => FrameVersion::V2015,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AddressMode {
    None,
    Short,
    Extended,
}

impl AddressMode {
    fn bits(self) -> u8 {
        match self {
            AddressMode::None => 0b00,
            AddressMode::Short => 0b10,
            AddressMode::Extended => 0b11,
        }
    }

    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0b00 => Some(AddressMode::None),
            0b10 => Some(AddressMode::Short),
            0b11 => Some(AddressMode::Extended),
            _ => None,
        }
    }
}

pub type PanId = u16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacAddress {
    Short(u16),
    Long([u8; 8]),
}

impl MacAddress {
    pub fn mode(&self) -> AddressMode {
        match self {
            MacAddress::Short(_) => AddressMode::Short,
            MacAddress::Long(_) => AddressMode::Extended,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SecurityLevel {
    None,
    Mic32,
    Mic64,
    Mic128,
    EncMic32,
    EncMic64,
    EncMic128,
}

impl SecurityLevel {
    pub fn bits(self) -> u8 {
        match self {
            SecurityLevel::None => 0,
            SecurityLevel::Mic32 => 1,
            SecurityLevel::Mic64 => 2,
            SecurityLevel::Mic128 => 3,
            SecurityLevel::EncMic32 => 5,
            SecurityLevel::EncMic64 => 6,
            SecurityLevel::EncMic128 => 7,
        }
    }

    pub fn from_bits(bits: u8) -> Self {
        match bits {
            1 => SecurityLevel::Mic32,
            2 => SecurityLevel::Mic64,
            3 => SecurityLevel::Mic128,
            5 => SecurityLevel::EncMic32,
            6 => SecurityLevel::EncMic64,
            7 => SecurityLevel::EncMic128,
            _ => SecurityLevel::None,
        }
    }

    /// MIC length in bytes this level appends, per 802.15.4 Table 95.
    pub fn mic_len(self) -> usize {
        match self {
            SecurityLevel::None => 0,
            SecurityLevel::Mic32 | SecurityLevel::EncMic32 => 4,
            SecurityLevel::Mic64 | SecurityLevel::EncMic64 => 8,
            SecurityLevel::Mic128 | SecurityLevel::EncMic128 => 16,
        }
    }

    pub fn encrypts(self) -> bool {
        matches!(
            self,
            SecurityLevel::EncMic32 | SecurityLevel::EncMic64 | SecurityLevel::EncMic128
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyId {
    /// Key-id-mode 0: implicit, from the source address + frame counter.
    Implicit,
    /// Key-id-mode 1: 1-byte key index into KeyManager's small key table.
    Index(u8),
    /// Key-id-mode 2: 4-byte key source + 1-byte index.
    Source4(u32, u8),
    /// Key-id-mode 3: 8-byte key source + 1-byte index.
    Source8([u8; 8], u8),
}

impl KeyId {
    fn mode_bits(&self) -> u8 {
        match self {
            KeyId::Implicit => 0,
            KeyId::Index(_) => 1,
            KeyId::Source4(..) => 2,
            KeyId::Source8(..) => 3,
        }
    }
}

/// Auxiliary security header: level, key-id-mode, frame counter, key id.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Security {
    pub level: SecurityLevel,
    pub frame_counter: u32,
    pub key_id: KeyId,
}

/// Parsed 802.15.4 MAC header fields (spec §3's "MAC Frame"), independent
/// of the payload that follows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    pub frame_type: FrameType,
    pub frame_version: FrameVersion,
    pub security: Option<Security>,
    pub ack_requested: bool,
    pub pan_id_compression: bool,
    /// Set when the sender has more data queued for this frame's
    /// destination — a sleepy child polls again immediately rather than
    /// going back to sleep (spec §4.4 Data-Request handling).
    pub frame_pending: bool,
    pub sequence: Option<u8>,
    pub dst_pan: Option<PanId>,
    pub dst_addr: Option<MacAddress>,
    pub src_pan: Option<PanId>,
    pub src_addr: Option<MacAddress>,
}

impl Header {
    pub fn data(
        sequence: u8,
        dst_pan: PanId,
        dst_addr: MacAddress,
        src_pan: PanId,
        src_addr: MacAddress,
        security: Option<Security>,
    ) -> Self {
        Header {
            frame_type: FrameType::Data,
            frame_version: FrameVersion::V2006,
            security,
            ack_requested: matches!(dst_addr, MacAddress::Short(_) | MacAddress::Long(_)),
            pan_id_compression: dst_pan == src_pan,
            frame_pending: false,
            sequence: Some(sequence),
            dst_pan: Some(dst_pan),
            dst_addr: Some(dst_addr),
            src_pan: if dst_pan == src_pan { None } else { Some(src_pan) },
            src_addr: Some(src_addr),
        }
    }

    /// Builder: set the frame-pending bit, e.g. when a `MeshForwarder`
    /// ack to a sleepy child still has more indirect traffic queued for
    /// it.
    pub fn with_frame_pending(mut self, pending: bool) -> Self {
        self.frame_pending = pending;
        self
    }

    /// Encodes the FCF, sequence number, addressing fields, and auxiliary
    /// security header (if any) into `buf` starting at `offset`.
    pub fn encode(&self, buf: &mut [u8], offset: usize) -> SResult<usize> {
        let dst_mode = self.dst_addr.map(|a| a.mode()).unwrap_or(AddressMode::None);
        let src_mode = self.src_addr.map(|a| a.mode()).unwrap_or(AddressMode::None);

        let fcf_lo = (self.frame_type.bits())
            | ((self.security.is_some() as u8) << 3)
            | ((self.frame_pending as u8) << 4)
            | ((self.ack_requested as u8) << 5)
            | ((self.pan_id_compression as u8) << 6);
        let fcf_hi = (dst_mode.bits() << 2)
            | (self.frame_version.bits() << 4)
            | (src_mode.bits() << 6);

        let off = match encode_u8(buf, offset, fcf_lo) {
            SResult::Done(o, _) => o,
            SResult::Error(e) => return SResult::Error(e),
        };
        let off = match encode_u8(buf, off, fcf_hi) {
            SResult::Done(o, _) => o,
            SResult::Error(e) => return SResult::Error(e),
        };
        let off = match self.sequence {
            Some(seq) => match encode_u8(buf, off, seq) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        let off = match self.dst_pan {
            Some(pan) => match encode_u16(buf, off, pan) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        let off = match self.dst_addr {
            Some(addr) => match encode_addr(buf, off, addr) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        let off = match self.src_pan {
            Some(pan) => match encode_u16(buf, off, pan) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        let off = match self.src_addr {
            Some(addr) => match encode_addr(buf, off, addr) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        let off = match self.security {
            Some(sec) => match encode_security(buf, off, &sec) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            },
            None => off,
        };
        SResult::Done(off, off)
    }

    /// Parses a header from `buf`, returning it along with the offset of
    /// the payload that follows.
    pub fn decode(buf: &[u8]) -> SResult<Header> {
        let (off, fcf_lo) = match decode_u8(buf, 0) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let (off, fcf_hi) = match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let frame_type = match FrameType::from_bits(fcf_lo & 0b111) {
            Some(t) => t,
            None => return SResult::Error(crate::error::ThreadError::Parse),
        };
        let security_enabled = (fcf_lo >> 3) & 1 != 0;
        let frame_pending = (fcf_lo >> 4) & 1 != 0;
        let ack_requested = (fcf_lo >> 5) & 1 != 0;
        let pan_id_compression = (fcf_lo >> 6) & 1 != 0;
        let dst_mode = match AddressMode::from_bits((fcf_hi >> 2) & 0b11) {
            Some(m) => m,
            None => return SResult::Error(crate::error::ThreadError::Parse),
        };
        let frame_version = FrameVersion::from_bits((fcf_hi >> 4) & 0b11);
        let src_mode = match AddressMode::from_bits((fcf_hi >> 6) & 0b11) {
            Some(m) => m,
            None => return SResult::Error(crate::error::ThreadError::Parse),
        };

        let has_sequence = frame_version != FrameVersion::V2015;
        let (off, sequence) = if has_sequence {
            match decode_u8(buf, off) {
                SResult::Done(o, v) => (o, Some(v)),
                SResult::Error(e) => return SResult::Error(e),
            }
        } else {
            (off, None)
        };

        let (off, dst_pan) = if dst_mode != AddressMode::None {
            match decode_u16(buf, off) {
                SResult::Done(o, v) => (o, Some(v)),
                SResult::Error(e) => return SResult::Error(e),
            }
        } else {
            (off, None)
        };
        let (off, dst_addr) = match decode_addr(buf, off, dst_mode) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let (off, src_pan) = if src_mode != AddressMode::None && !pan_id_compression {
            match decode_u16(buf, off) {
                SResult::Done(o, v) => (o, Some(v)),
                SResult::Error(e) => return SResult::Error(e),
            }
        } else {
            (off, dst_pan.filter(|_| pan_id_compression))
        };
        let (off, src_addr) = match decode_addr(buf, off, src_mode) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let (off, security) = if security_enabled {
            match decode_security(buf, off) {
                SResult::Done(o, v) => (o, Some(v)),
                SResult::Error(e) => return SResult::Error(e),
            }
        } else {
            (off, None)
        };

        SResult::Done(
            off,
            Header {
                frame_type,
                frame_version,
                security,
                ack_requested,
                pan_id_compression,
                frame_pending,
                sequence,
                dst_pan,
                dst_addr,
                src_pan,
                src_addr,
            },
        )
    }
}

fn encode_addr(buf: &mut [u8], offset: usize, addr: MacAddress) -> SResult<usize> {
    match addr {
        MacAddress::Short(s) => encode_u16(buf, offset, s).map_val(|_| offset + 2),
        MacAddress::Long(ext) => encode_bytes(buf, offset, &ext).map_val(|_| offset + 8),
    }
}

fn decode_addr(buf: &[u8], offset: usize, mode: AddressMode) -> SResult<Option<MacAddress>> {
    match mode {
        AddressMode::None => SResult::Done(offset, None),
        AddressMode::Short => match decode_u16(buf, offset) {
            SResult::Done(o, v) => SResult::Done(o, Some(MacAddress::Short(v))),
            SResult::Error(e) => SResult::Error(e),
        },
        AddressMode::Extended => {
            if offset + 8 > buf.len() {
                return SResult::Error(crate::error::ThreadError::Parse);
            }
            let mut ext = [0u8; 8];
            ext.copy_from_slice(&buf[offset..offset + 8]);
            SResult::Done(offset + 8, Some(MacAddress::Long(ext)))
        }
    }
}

fn encode_security(buf: &mut [u8], offset: usize, sec: &Security) -> SResult<usize> {
    let control = sec.level.bits() | (sec.key_id.mode_bits() << 3);
    let off = match encode_u8(buf, offset, control) {
        SResult::Done(o, _) => o,
        SResult::Error(e) => return SResult::Error(e),
    };
    let off = match encode_u32(buf, off, sec.frame_counter) {
        SResult::Done(o, _) => o,
        SResult::Error(e) => return SResult::Error(e),
    };
    let off = match sec.key_id {
        KeyId::Implicit => off,
        KeyId::Index(idx) => match encode_u8(buf, off, idx) {
            SResult::Done(o, _) => o,
            SResult::Error(e) => return SResult::Error(e),
        },
        KeyId::Source4(src, idx) => {
            let o = match encode_u32(buf, off, src) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            };
            match encode_u8(buf, o, idx) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            }
        }
        KeyId::Source8(src, idx) => {
            let o = match encode_bytes(buf, off, &src) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            };
            match encode_u8(buf, o, idx) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            }
        }
    };
    SResult::Done(off, off)
}

fn decode_security(buf: &[u8], offset: usize) -> SResult<Security> {
    let (off, control) = match decode_u8(buf, offset) {
        SResult::Done(o, v) => (o, v),
        SResult::Error(e) => return SResult::Error(e),
    };
    let level = SecurityLevel::from_bits(control & 0b111);
    let key_mode = (control >> 3) & 0b11;
    let (off, frame_counter) = match decode_u32(buf, off) {
        SResult::Done(o, v) => (o, v),
        SResult::Error(e) => return SResult::Error(e),
    };
    let (off, key_id) = match key_mode {
        0 => (off, KeyId::Implicit),
        1 => match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, KeyId::Index(v)),
            SResult::Error(e) => return SResult::Error(e),
        },
        2 => {
            let (o, src) = match decode_u32(buf, off) {
                SResult::Done(o, v) => (o, v),
                SResult::Error(e) => return SResult::Error(e),
            };
            match decode_u8(buf, o) {
                SResult::Done(o, idx) => (o, KeyId::Source4(src, idx)),
                SResult::Error(e) => return SResult::Error(e),
            }
        }
        _ => {
            if off + 8 > buf.len() {
                return SResult::Error(crate::error::ThreadError::Parse);
            }
            let mut src = [0u8; 8];
            src.copy_from_slice(&buf[off..off + 8]);
            match decode_u8(buf, off + 8) {
                SResult::Done(o, idx) => (o, KeyId::Source8(src, idx)),
                SResult::Error(e) => return SResult::Error(e),
            }
        }
    };
    SResult::Done(
        off,
        Security {
            level,
            frame_counter,
            key_id,
        },
    )
}

impl<T> SResult<T> {
    fn map_val<U>(self, f: impl FnOnce(T) -> U) -> SResult<U> {
        match self {
            SResult::Done(off, v) => SResult::Done(off, f(v)),
            SResult::Error(e) => SResult::Error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_header_round_trips() {
        let hdr = Header::data(
            42,
            0xface,
            MacAddress::Short(0x0401),
            0xface,
            MacAddress::Short(0x0400),
            None,
        );
        let mut buf = [0u8; MAX_PSDU_LEN];
        let payload_off = match hdr.encode(&mut buf, 0) {
            SResult::Done(_, off) => off,
            SResult::Error(_) => panic!("encode failed"),
        };
        let decoded = match Header::decode(&buf[..payload_off]) {
            SResult::Done(_, h) => h,
            SResult::Error(_) => panic!("decode failed"),
        };
        assert_eq!(decoded.sequence, Some(42));
        assert_eq!(decoded.dst_addr, Some(MacAddress::Short(0x0401)));
        assert_eq!(decoded.src_addr, Some(MacAddress::Short(0x0400)));
        assert!(decoded.pan_id_compression);
        assert_eq!(decoded.src_pan, None);
    }

    #[test]
    fn security_header_round_trips() {
        let sec = Security {
            level: SecurityLevel::EncMic32,
            frame_counter: 7,
            key_id: KeyId::Implicit,
        };
        let hdr = Header::data(
            1,
            0xface,
            MacAddress::Long([0; 8]),
            0xface,
            MacAddress::Long([1; 8]),
            Some(sec),
        );
        let mut buf = [0u8; MAX_PSDU_LEN];
        let payload_off = match hdr.encode(&mut buf, 0) {
            SResult::Done(_, off) => off,
            SResult::Error(_) => panic!("encode"),
        };
        let decoded = match Header::decode(&buf[..payload_off]) {
            SResult::Done(_, h) => h,
            SResult::Error(_) => panic!("decode"),
        };
        assert_eq!(decoded.security, Some(sec));
    }
}
