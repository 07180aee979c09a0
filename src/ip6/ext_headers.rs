// SPDX-License-Identifier: Apache-2.0 OR MIT

//! IPv6 extension header walk (spec §4.5's "extension headers loop"):
//! HopByHop, Fragment (single-only — REDESIGN FLAGS (b)), DstOpts, IPv6
//! (encapsulation), Routing, then None.
//!
//! Grounded on spec §4.5 directly; no extension-header parser survives
//! in the retrievable teacher source (Tock's net/ipv6 files were not
//! present beyond their mod.rs re-exports — see DESIGN.md's workspace
//! note), so this walk is built from RFC 8200 §4's next-header values.

use crate::error::ThreadError;

pub const NEXT_HEADER_HOP_BY_HOP: u8 = 0;
pub const NEXT_HEADER_TCP: u8 = 6;
pub const NEXT_HEADER_UDP: u8 = 17;
pub const NEXT_HEADER_IPV6: u8 = 41;
pub const NEXT_HEADER_ROUTING: u8 = 43;
pub const NEXT_HEADER_FRAGMENT: u8 = 44;
pub const NEXT_HEADER_ICMPV6: u8 = 58;
pub const NEXT_HEADER_NONE: u8 = 59;
pub const NEXT_HEADER_DST_OPTS: u8 = 60;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dispatch {
    /// Upper-layer payload starts at this offset, with this protocol.
    Upper { offset: usize, next_header: u8 },
    /// The packet carries an IPv6-level fragment that this stack's
    /// REDESIGN FLAGS (b) policy rejects (only offset-0, more-flag-clear
    /// "fragments" — i.e. effectively unfragmented traffic — are
    /// accepted; anything else must be dropped because 6LoWPAN handles
    /// fragmentation below IPv6, not above it).
    RejectedFragment,
}

/// Fragment header layout (RFC 8200 §4.5): next-header(1), reserved(1),
/// fragment-offset+flags(2), identification(4).
fn parse_fragment_header(buf: &[u8]) -> Result<(u8, bool, usize), ThreadError> {
    if buf.len() < 8 {
        return Err(ThreadError::Parse);
    }
    let next_header = buf[0];
    let offset_and_flags = u16::from_be_bytes([buf[2], buf[3]]);
    let offset = (offset_and_flags >> 3) as usize;
    let more_fragments = offset_and_flags & 0x1 != 0;
    Ok((next_header, offset == 0 && !more_fragments, 8))
}

/// Walks the extension-header chain starting at `next_header`/`offset`
/// in `buf`, returning the dispatch decision. Per REDESIGN FLAGS (b),
/// this crate never emits an IPv6 Fragment header itself — this function
/// only needs to handle one on receive, and must reject it unless it
/// is a degenerate single-fragment (offset 0, more-flag clear).
pub fn walk(buf: &[u8], mut next_header: u8, mut offset: usize) -> Result<Dispatch, ThreadError> {
    loop {
        match next_header {
            NEXT_HEADER_HOP_BY_HOP | NEXT_HEADER_DST_OPTS | NEXT_HEADER_ROUTING => {
                if buf.len() < offset + 2 {
                    return Err(ThreadError::Parse);
                }
                let nh = buf[offset];
                let hdr_ext_len = buf[offset + 1] as usize;
                let total_len = (hdr_ext_len + 1) * 8;
                if buf.len() < offset + total_len {
                    return Err(ThreadError::Parse);
                }
                next_header = nh;
                offset += total_len;
            }
            NEXT_HEADER_FRAGMENT => {
                if buf.len() < offset + 8 {
                    return Err(ThreadError::Parse);
                }
                let (nh, acceptable, hdr_len) = parse_fragment_header(&buf[offset..])?;
                if !acceptable {
                    return Ok(Dispatch::RejectedFragment);
                }
                next_header = nh;
                offset += hdr_len;
            }
            NEXT_HEADER_IPV6 => {
                // Encapsulated IPv6-in-IPv6: the inner header is the new
                // upper-layer payload from the dispatcher's point of view;
                // the MeshForwarder re-enters IPv6 receive on it.
                return Ok(Dispatch::Upper {
                    offset,
                    next_header,
                });
            }
            NEXT_HEADER_NONE => {
                return Ok(Dispatch::Upper {
                    offset,
                    next_header,
                });
            }
            other => {
                return Ok(Dispatch::Upper {
                    offset,
                    next_header: other,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_udp_dispatches_immediately() {
        let buf = [0u8; 8];
        let result = walk(&buf, NEXT_HEADER_UDP, 40).unwrap();
        assert_eq!(
            result,
            Dispatch::Upper {
                offset: 40,
                next_header: NEXT_HEADER_UDP
            }
        );
    }

    #[test]
    fn single_fragment_is_accepted_and_unwrapped() {
        let mut buf = [0u8; 48];
        buf[40] = NEXT_HEADER_UDP;
        // offset=0, more=0 -> acceptable
        buf[42..44].copy_from_slice(&0u16.to_be_bytes());
        let result = walk(&buf, NEXT_HEADER_FRAGMENT, 40).unwrap();
        assert_eq!(
            result,
            Dispatch::Upper {
                offset: 48,
                next_header: NEXT_HEADER_UDP
            }
        );
    }

    #[test]
    fn real_fragment_is_rejected() {
        let mut buf = [0u8; 48];
        buf[40] = NEXT_HEADER_UDP;
        // more-fragments flag set
        buf[42..44].copy_from_slice(&1u16.to_be_bytes());
        let result = walk(&buf, NEXT_HEADER_FRAGMENT, 40).unwrap();
        assert_eq!(result, Dispatch::RejectedFragment);
    }
}
