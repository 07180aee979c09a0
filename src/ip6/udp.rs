// SPDX-License-Identifier: Apache-2.0 OR MIT

//! UDP header codec and the bound-socket table (spec §4.5).
//!
//! Grounded on `net/udp/mod.rs`'s `UDPHeader`/`udp_port_table`
//! re-exports (the defining files were not retrievable — see DESIGN.md's
//! workspace note) and spec §4.5's socket-matching rules directly.

use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;
use crate::mac::stream::SResult;

pub const UDP_HEADER_LEN: usize = 8;
pub const EPHEMERAL_PORT_LOW: u16 = 49152;
pub const EPHEMERAL_PORT_HIGH: u16 = 65535;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UdpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: u16,
}

impl UdpHeader {
    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        if buf.len() < UDP_HEADER_LEN {
            return SResult::Error(ThreadError::NoBufs);
        }
        buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[4..6].copy_from_slice(&self.length.to_be_bytes());
        buf[6..8].copy_from_slice(&self.checksum.to_be_bytes());
        SResult::Done(UDP_HEADER_LEN, UDP_HEADER_LEN)
    }

    pub fn decode(buf: &[u8]) -> SResult<UdpHeader> {
        if buf.len() < UDP_HEADER_LEN {
            return SResult::Error(ThreadError::Parse);
        }
        // Spec §4.5: "UDP zero-checksum is rejected."
        let checksum = u16::from_be_bytes([buf[6], buf[7]]);
        if checksum == 0 {
            return SResult::Error(ThreadError::Parse);
        }
        SResult::Done(
            UDP_HEADER_LEN,
            UdpHeader {
                src_port: u16::from_be_bytes([buf[0], buf[1]]),
                dst_port: u16::from_be_bytes([buf[2], buf[3]]),
                length: u16::from_be_bytes([buf[4], buf[5]]),
                checksum,
            },
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UdpSocket {
    pub addr: IpAddr,
    pub port: u16,
    pub scope_id: u8,
}

impl UdpSocket {
    /// Spec §4.5: "reception matches on port, scope (if nonzero), and
    /// address (if nonzero); multicast delivery matches the port
    /// regardless of unicast addr."
    pub fn matches(&self, dst_port: u16, dst_addr: &IpAddr, scope_id: u8) -> bool {
        if self.port != dst_port {
            return false;
        }
        if self.scope_id != 0 && self.scope_id != scope_id {
            return false;
        }
        if dst_addr.is_multicast() {
            return true;
        }
        self.addr.is_unspecified() || self.addr == *dst_addr
    }
}

/// Fixed-size bound-socket table; one entry reserved per concurrent
/// listener (MLE, the address resolver's CoAP endpoint, ND registration,
/// and any application sockets).
pub struct SocketTable<const N: usize> {
    sockets: [Option<UdpSocket>; N],
}

impl<const N: usize> SocketTable<N> {
    pub fn new() -> Self {
        SocketTable {
            sockets: [None; N],
        }
    }

    pub fn bind(&mut self, socket: UdpSocket) -> Result<(), ThreadError> {
        for slot in self.sockets.iter_mut() {
            if slot.is_none() {
                *slot = Some(socket);
                return Ok(());
            }
        }
        Err(ThreadError::NoBufs)
    }

    pub fn unbind(&mut self, port: u16) {
        for slot in self.sockets.iter_mut() {
            if slot.map(|s| s.port) == Some(port) {
                *slot = None;
            }
        }
    }

    pub fn find(&self, dst_port: u16, dst_addr: &IpAddr, scope_id: u8) -> Option<UdpSocket> {
        self.sockets
            .iter()
            .flatten()
            .find(|s| s.matches(dst_port, dst_addr, scope_id))
            .copied()
    }
}

impl<const N: usize> Default for SocketTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Selects an ephemeral source port from `[49152, 65535]` (spec §4.5),
/// walking forward from a rolling cursor seeded by the caller so repeat
/// calls don't all collide on the same first candidate.
pub fn select_ephemeral_port(cursor: &mut u16, in_use: impl Fn(u16) -> bool) -> Option<u16> {
    let span = EPHEMERAL_PORT_HIGH - EPHEMERAL_PORT_LOW + 1;
    for _ in 0..span {
        let candidate = EPHEMERAL_PORT_LOW + (*cursor % span);
        *cursor = cursor.wrapping_add(1);
        if !in_use(candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_checksum_is_rejected() {
        let mut buf = [0u8; UDP_HEADER_LEN];
        buf[0..2].copy_from_slice(&1u16.to_be_bytes());
        assert!(!UdpHeader::decode(&buf).is_ok());
    }

    #[test]
    fn socket_table_matches_unicast_and_multicast() {
        let mut table: SocketTable<4> = SocketTable::new();
        let addr = IpAddr::link_local_from_extended(&[1; 8]);
        table
            .bind(UdpSocket {
                addr,
                port: 19788,
                scope_id: 0,
            })
            .unwrap();

        assert!(table.find(19788, &addr, 0).is_some());
        assert!(table.find(19789, &addr, 0).is_none());

        let mcast = crate::ip6::addr::REALM_LOCAL_ALL_NODES;
        assert!(table.find(19788, &mcast, 0).is_some());
    }

    #[test]
    fn ephemeral_port_stays_in_range() {
        let mut cursor = 0;
        let port = select_ephemeral_port(&mut cursor, |_| false).unwrap();
        assert!((EPHEMERAL_PORT_LOW..=EPHEMERAL_PORT_HIGH).contains(&port));
    }
}
