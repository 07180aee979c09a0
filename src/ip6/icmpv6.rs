// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ICMPv6: Echo Request/Reply and Destination Unreachable (spec §4.5).
//!
//! Grounded on `net/icmpv6/mod.rs`'s re-export shape
//! (`ICMP6Header`/`ICMP6Type`/`ICMP6HeaderOptions`, the defining
//! `icmpv6.rs` file itself not retrievable as source — see DESIGN.md's
//! workspace note) and spec §4.5's checksum/type list directly.

use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;
use crate::ip6::checksum::checksum_slice;
use crate::mac::stream::SResult;

pub const ICMP6_HEADER_LEN: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Icmp6Type {
    EchoRequest,
    EchoReply,
    DestUnreachable(DestUnreachableCode),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DestUnreachableCode {
    NoRoute,
    AdminProhibited,
    AddressUnreachable,
    PortUnreachable,
}

impl Icmp6Type {
    fn type_byte(self) -> u8 {
        match self {
            Icmp6Type::DestUnreachable(_) => 1,
            Icmp6Type::EchoRequest => 128,
            Icmp6Type::EchoReply => 129,
        }
    }

    fn code_byte(self) -> u8 {
        match self {
            Icmp6Type::DestUnreachable(DestUnreachableCode::NoRoute) => 0,
            Icmp6Type::DestUnreachable(DestUnreachableCode::AdminProhibited) => 1,
            Icmp6Type::DestUnreachable(DestUnreachableCode::AddressUnreachable) => 3,
            Icmp6Type::DestUnreachable(DestUnreachableCode::PortUnreachable) => 4,
            Icmp6Type::EchoRequest | Icmp6Type::EchoReply => 0,
        }
    }

    fn from_bytes(type_byte: u8, code_byte: u8) -> Result<Self, ThreadError> {
        match (type_byte, code_byte) {
            (1, 0) => Ok(Icmp6Type::DestUnreachable(DestUnreachableCode::NoRoute)),
            (1, 1) => Ok(Icmp6Type::DestUnreachable(
                DestUnreachableCode::AdminProhibited,
            )),
            (1, 3) => Ok(Icmp6Type::DestUnreachable(
                DestUnreachableCode::AddressUnreachable,
            )),
            (1, 4) => Ok(Icmp6Type::DestUnreachable(
                DestUnreachableCode::PortUnreachable,
            )),
            (128, 0) => Ok(Icmp6Type::EchoRequest),
            (129, 0) => Ok(Icmp6Type::EchoReply),
            _ => Err(ThreadError::Parse),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Icmp6Header {
    pub icmp_type: Icmp6Type,
    pub checksum: u16,
    /// Echo identifier/sequence, or the 4 reserved/unused bytes for
    /// Destination Unreachable.
    pub rest: u32,
}

impl Icmp6Header {
    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        if buf.len() < ICMP6_HEADER_LEN {
            return SResult::Error(ThreadError::NoBufs);
        }
        buf[0] = self.icmp_type.type_byte();
        buf[1] = self.icmp_type.code_byte();
        buf[2..4].copy_from_slice(&self.checksum.to_be_bytes());
        SResult::Done(ICMP6_HEADER_LEN, ICMP6_HEADER_LEN)
    }

    pub fn decode(buf: &[u8]) -> SResult<Icmp6Header> {
        if buf.len() < ICMP6_HEADER_LEN {
            return SResult::Error(ThreadError::Parse);
        }
        let icmp_type = match Icmp6Type::from_bytes(buf[0], buf[1]) {
            Ok(t) => t,
            Err(e) => return SResult::Error(e),
        };
        let checksum = u16::from_be_bytes([buf[2], buf[3]]);
        SResult::Done(
            ICMP6_HEADER_LEN,
            Icmp6Header {
                icmp_type,
                checksum,
                rest: 0,
            },
        )
    }
}

/// Builds a complete Echo Reply datagram body (header + identical
/// payload to the request) with checksum filled in, for the common
/// "ping back" path.
pub fn echo_reply(src: &IpAddr, dst: &IpAddr, echo_payload: &[u8], out: &mut [u8]) -> Result<usize, ThreadError> {
    if out.len() < ICMP6_HEADER_LEN + echo_payload.len() {
        return Err(ThreadError::NoBufs);
    }
    out[0] = Icmp6Type::EchoReply.type_byte();
    out[1] = 0;
    out[2] = 0;
    out[3] = 0;
    out[ICMP6_HEADER_LEN..ICMP6_HEADER_LEN + echo_payload.len()].copy_from_slice(echo_payload);
    let total = ICMP6_HEADER_LEN + echo_payload.len();
    let cksum = checksum_slice(src, dst, crate::ip6::ext_headers::NEXT_HEADER_ICMPV6, &out[..total]);
    out[2..4].copy_from_slice(&cksum.to_be_bytes());
    Ok(total)
}

/// Builds a Destination Unreachable (No Route) message wrapping as much
/// of the offending datagram as fits.
pub fn dest_unreachable_no_route(
    src: &IpAddr,
    dst: &IpAddr,
    offending: &[u8],
    out: &mut [u8],
) -> Result<usize, ThreadError> {
    let copy_len = core::cmp::min(offending.len(), out.len().saturating_sub(ICMP6_HEADER_LEN));
    if out.len() < ICMP6_HEADER_LEN + copy_len {
        return Err(ThreadError::NoBufs);
    }
    out[0] = 1;
    out[1] = 0;
    out[2] = 0;
    out[3] = 0;
    out[ICMP6_HEADER_LEN..ICMP6_HEADER_LEN + copy_len].copy_from_slice(&offending[..copy_len]);
    let total = ICMP6_HEADER_LEN + copy_len;
    let cksum = checksum_slice(src, dst, crate::ip6::ext_headers::NEXT_HEADER_ICMPV6, &out[..total]);
    out[2..4].copy_from_slice(&cksum.to_be_bytes());
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips() {
        let hdr = Icmp6Header {
            icmp_type: Icmp6Type::EchoRequest,
            checksum: 0xabcd,
            rest: 0,
        };
        let mut buf = [0u8; ICMP6_HEADER_LEN];
        hdr.encode(&mut buf);
        let decoded = match Icmp6Header::decode(&buf) {
            SResult::Done(_, h) => h,
            SResult::Error(_) => panic!(),
        };
        assert_eq!(decoded.icmp_type, Icmp6Type::EchoRequest);
        assert_eq!(decoded.checksum, 0xabcd);
    }

    #[test]
    fn echo_reply_checksum_is_nonzero() {
        let src = IpAddr::link_local_from_extended(&[1; 8]);
        let dst = IpAddr::link_local_from_extended(&[2; 8]);
        let mut out = [0u8; 32];
        let n = echo_reply(&src, &dst, b"ping", &mut out).unwrap();
        let cksum = u16::from_be_bytes([out[2], out[3]]);
        assert_ne!(cksum, 0);
        assert_eq!(n, ICMP6_HEADER_LEN + 4);
    }
}
