// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `MeshForwarder`: the data-path glue between the MAC and the IPv6/MLE
//! layers (spec §4.4).
//!
//! `SendMessage`: `resolve_route` turns a destination EID into a
//! `MeshRoute` — an on-mesh Network Data lookup first, an
//! `AddressResolver` cache/query second — before the caller decides
//! direct vs. indirect (sleepy-child) transmission and enqueues.
//! Everything from there — building a 6LoWPAN-compressed, optionally
//! mesh-headed, optionally fragmented MAC frame, and dispatching a
//! received one back up to reassembly/decompression or onward as a
//! forwarded mesh frame — lives here. A datagram whose route isn't yet
//! known is parked on the resolving queue by EID and drained once
//! `AddressResolver::handle_address_notification` reports one.
//!
//! Grounded on `ieee802154/framer.rs`'s send/receive split (one type
//! owning both directions of the data path, talking to the `Mac` trait
//! as its only lower-layer collaborator) and spec §4.4's operation list.

pub mod reassembly;
pub mod send_queue;

use crate::address_resolver::{AddressResolver, ResolveOutcome};
use crate::buf::queue::{LinkSet, MessageArena, MessageIndex, MessageQueue};
use crate::coap::CoapMessage;
use crate::config::Config;
use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;
use crate::ip6::header::{Ip6Header, IP6_HEADER_LEN};
use crate::mac::frame::MacAddress;
use crate::mac::stream::SResult;
use crate::mle::neighbor::ChildTable;
use crate::mle::MAX_ROUTE_COST;
use crate::network_data::LeaderNetworkData;
use crate::sixlowpan::context::ContextTable;
use crate::sixlowpan::frag::{self, FragmentHeader, FragmentOutcome};
use crate::sixlowpan::iphc;
use crate::sixlowpan::mesh::{self, MeshHeader};

pub use reassembly::ReassemblyList;
pub use send_queue::SendQueue;

/// Conservative budget for one outgoing frame's 6LoWPAN payload — leaves
/// room, out of the 127-byte PSDU, for the worst-case MAC header
/// (extended addressing both ways, auxiliary security header, 2-byte
/// FCS) the `Framer` may still need to add on top of what this module
/// hands it.
pub const MAX_FRAME_PAYLOAD: usize = 102;

/// Where to route a message toward — produced by `resolve_route` before
/// calling `build_frame`.
#[derive(Clone, Copy, Debug)]
pub struct MeshRoute {
    pub src_rloc16: u16,
    pub dst_rloc16: u16,
    pub hops_left: u8,
}

/// Outcome of resolving a destination EID to a route (spec §4.4
/// `SendMessage` / §4.8 `Resolve`).
#[derive(Clone, Debug)]
pub enum RouteResolution {
    /// The route is known now; pass to `build_frame`.
    Route(MeshRoute),
    /// No cached mapping; send this CoAP address query and park the
    /// datagram on the resolving queue.
    Query(CoapMessage),
    /// A query is already outstanding for this EID; just park it.
    Pending,
}

/// Spec §4.4 `SendMessage`'s routing step: an on-mesh prefix (Network
/// Data `RouteLookup`) wins over an end-device EID lookup
/// (`AddressResolver.Resolve`), since a border-router route never needs a
/// query round-trip.
pub fn resolve_route<C: Config>(
    resolver: &mut AddressResolver<C>,
    leader_data: &LeaderNetworkData<C>,
    own_rloc16: u16,
    dst: &IpAddr,
) -> RouteResolution {
    if let Some(dst_rloc16) = leader_data.route_lookup(own_rloc16, dst) {
        return RouteResolution::Route(MeshRoute {
            src_rloc16: own_rloc16,
            dst_rloc16,
            hops_left: MAX_ROUTE_COST,
        });
    }
    match resolver.resolve(*dst) {
        (ResolveOutcome::Found(dst_rloc16), _) => RouteResolution::Route(MeshRoute {
            src_rloc16: own_rloc16,
            dst_rloc16,
            hops_left: MAX_ROUTE_COST,
        }),
        (ResolveOutcome::Query, Some(msg)) => RouteResolution::Query(msg),
        (ResolveOutcome::Query, None) => RouteResolution::Pending,
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameBuildOutcome {
    pub len: usize,
    /// `Some(offset)` when more fragments of this datagram remain;
    /// `offset` is what the next `build_frame` call passes back in.
    pub next_offset: Option<usize>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReceivedAction {
    /// A fully reassembled, decompressed IPv6 datagram ready for the
    /// network layer; `out[..n]` holds the `n` bytes given.
    Deliver(usize),
    /// A mesh frame addressed elsewhere: `out[..len]` is the re-encoded
    /// frame (hops-left already decremented) to retransmit toward the
    /// next hop.
    Forward(usize),
    /// A fragment arrived but the datagram isn't complete yet.
    Pending,
}

pub struct MeshForwarder<C: Config> {
    pub send_queue: SendQueue,
    reassembly: ReassemblyList<C>,
    /// Datagrams parked by destination EID awaiting `AddressResolver`
    /// (spec §4.8 "resolvingQueue"); threaded through the message's
    /// otherwise-unused global link set, distinct from `send_queue`'s
    /// local link set so a message can move from one to the other.
    resolving: MessageQueue,
}

impl<C: Config> MeshForwarder<C> {
    pub fn new() -> Self {
        MeshForwarder {
            send_queue: SendQueue::new(),
            reassembly: ReassemblyList::new(),
            resolving: MessageQueue::new(LinkSet::Global),
        }
    }

    /// Spec §4.4's 1-Hz reassembly-timeout sweep.
    pub fn tick(&mut self) {
        self.reassembly.tick();
    }

    /// Parks `idx` on the resolving queue against `eid` until a route is
    /// known (spec §4.8: a cache miss means "caller should park the
    /// datagram").
    pub fn park_for_resolution<const N: usize>(&mut self, arena: &mut MessageArena<N>, idx: MessageIndex, eid: IpAddr) {
        arena.get_mut(idx).info.dst_eid = Some(eid);
        self.resolving.push_back(arena, idx);
    }

    /// Drains every message parked against `eid`, up to 4 at a time — the
    /// caller should `resolve_route` each and move it onto `send_queue`
    /// (spec §4.8 `HandleAddressNotification`: "drain resolving queue").
    pub fn drain_resolved<const N: usize>(&mut self, arena: &mut MessageArena<N>, eid: &IpAddr) -> [Option<MessageIndex>; 4] {
        let mut out = [None; 4];
        for slot in out.iter_mut() {
            let found = self
                .resolving
                .iter(arena)
                .find(|&idx| arena.get(idx).info.dst_eid == Some(*eid));
            match found {
                Some(idx) => {
                    self.resolving.remove(arena, idx);
                    *slot = Some(idx);
                }
                None => break,
            }
        }
        out
    }

    /// Spec §4.4 Data-Request handling: maps the polling child's MAC
    /// address to its `ChildTable` index and returns the first message
    /// queued indirectly for it, if any.
    pub fn on_data_request<const N: usize, C2: Config>(
        &self,
        arena: &MessageArena<N>,
        children: &ChildTable<C2>,
        requester: MacAddress,
    ) -> Option<MessageIndex> {
        let (child_index, _) = children.find_by_mac_addr(requester)?;
        self.send_queue.next_indirect_for_child(arena, child_index)
    }

    /// Whether a sleepy child still has indirect traffic queued — the
    /// frame-pending bit a parent sets on its ack/advertisement to that
    /// child so it polls again immediately (spec §4.4).
    pub fn has_indirect_pending<const N: usize>(&self, arena: &MessageArena<N>, child_index: u8) -> bool {
        self.send_queue.next_indirect_for_child(arena, child_index).is_some()
    }

    /// Builds one outgoing MAC-layer frame for `datagram` (a full,
    /// uncompressed IPv6 packet: 40-byte header followed by its
    /// payload). Compresses the whole datagram with LOWPAN_IPHC, prepends
    /// a mesh header when `route` says this hop isn't the final
    /// destination, and fragments per RFC 4944 when the compressed form
    /// doesn't fit in one frame.
    ///
    /// Call with `fragment_offset = 0` first; if the result carries
    /// `next_offset`, call again with that value (and the same
    /// `datagram_tag`) to get the next fragment.
    #[allow(clippy::too_many_arguments)]
    pub fn build_frame(
        &self,
        datagram: &[u8],
        route: Option<MeshRoute>,
        src_mac: MacAddress,
        dst_mac: MacAddress,
        datagram_tag: u16,
        fragment_offset: usize,
        ctx_table: &ContextTable<C>,
        out: &mut [u8],
    ) -> Result<FrameBuildOutcome, ThreadError> {
        if datagram.len() < IP6_HEADER_LEN {
            return Err(ThreadError::Parse);
        }
        let header = match Ip6Header::decode(&datagram[..IP6_HEADER_LEN]) {
            SResult::Done(_, h) => h,
            SResult::Error(e) => return Err(e),
        };
        let upper = &datagram[IP6_HEADER_LEN..];

        let mut compressed = [0u8; reassembly::MAX_REASSEMBLED_SIZE];
        let (hdr_len, consumed) =
            iphc::compress(&header, upper, src_mac, dst_mac, ctx_table, &mut compressed)?;
        let tail = &upper[consumed..];
        let total_len = hdr_len + tail.len();

        let mesh_len = route.map(|_| MeshHeader::ENCODED_LEN).unwrap_or(0);
        let remaining_total = total_len - fragment_offset;
        let payload_budget = MAX_FRAME_PAYLOAD.saturating_sub(mesh_len);

        let needs_fragmentation = fragment_offset > 0 || remaining_total > payload_budget;
        let frag_header_len = if needs_fragmentation {
            if fragment_offset == 0 {
                frag::FIRST_HEADER_LEN
            } else {
                frag::SUBSEQUENT_HEADER_LEN
            }
        } else {
            0
        };

        let chunk_budget = payload_budget.saturating_sub(frag_header_len);
        let this_chunk = if needs_fragmentation && remaining_total > chunk_budget {
            let rounded = chunk_budget - (chunk_budget % 8);
            if rounded == 0 {
                return Err(ThreadError::NoBufs);
            }
            rounded
        } else {
            remaining_total
        };

        let total_written = mesh_len + frag_header_len + this_chunk;
        if out.len() < total_written {
            return Err(ThreadError::NoBufs);
        }

        let mut cursor = 0usize;
        if let Some(r) = route {
            MeshHeader::new(r.hops_left, r.src_rloc16, r.dst_rloc16).encode(&mut out[cursor..])?;
            cursor += mesh_len;
        }
        if needs_fragmentation {
            if total_len >= 0x0800 {
                return Err(ThreadError::InvalidArgs);
            }
            let fh = FragmentHeader {
                datagram_size: total_len as u16,
                datagram_tag,
                offset: if fragment_offset == 0 {
                    None
                } else {
                    Some((fragment_offset / 8) as u8)
                },
            };
            fh.encode(&mut out[cursor..])?;
            cursor += frag_header_len;
        }
        copy_compressed_range(&compressed[..hdr_len], tail, fragment_offset, this_chunk, &mut out[cursor..cursor + this_chunk]);

        let next_offset = if fragment_offset + this_chunk < total_len {
            Some(fragment_offset + this_chunk)
        } else {
            None
        };
        Ok(FrameBuildOutcome {
            len: total_written,
            next_offset,
        })
    }

    /// Dispatches one inbound MAC-frame payload: forwards mesh frames not
    /// addressed to us, reassembles fragments, and decompresses a
    /// completed (possibly single-frame) 6LoWPAN datagram back into a
    /// literal IPv6 packet in `out`.
    pub fn handle_received_frame(
        &mut self,
        payload: &[u8],
        src_mac: MacAddress,
        dst_mac: MacAddress,
        own_rloc16: u16,
        ctx_table: &ContextTable<C>,
        out: &mut [u8],
    ) -> Result<ReceivedAction, ThreadError> {
        if payload.is_empty() {
            return Err(ThreadError::Parse);
        }

        let (mesh_hdr, rest) = if (payload[0] & mesh::DISPATCH_MASK) == mesh::DISPATCH {
            let (hdr, used) = MeshHeader::decode(payload)?;
            (Some(hdr), &payload[used..])
        } else {
            (None, payload)
        };

        if let Some(hdr) = mesh_hdr {
            if hdr.dst_short != own_rloc16 {
                let forwarded = hdr.forwarded().ok_or(ThreadError::Drop)?;
                let mesh_len = MeshHeader::ENCODED_LEN;
                if out.len() < mesh_len + rest.len() {
                    return Err(ThreadError::NoBufs);
                }
                forwarded.encode(&mut out[..mesh_len])?;
                out[mesh_len..mesh_len + rest.len()].copy_from_slice(rest);
                return Ok(ReceivedAction::Forward(mesh_len + rest.len()));
            }
        }

        if rest.is_empty() {
            return Err(ThreadError::Parse);
        }

        let src_short = match mesh_hdr {
            Some(h) => h.src_short,
            None => match src_mac {
                MacAddress::Short(s) => s,
                MacAddress::Long(_) => 0,
            },
        };

        let is_first_frag = (rest[0] & frag::FIRST_DISPATCH_MASK) == frag::FIRST_DISPATCH;
        let is_subsequent_frag = (rest[0] & frag::SUBSEQUENT_DISPATCH_MASK) == frag::SUBSEQUENT_DISPATCH;

        if is_first_frag || is_subsequent_frag {
            let (fh, used) = FragmentHeader::decode(rest)?;
            let body = &rest[used..];
            let (slot, outcome) = self.reassembly.on_fragment(src_short, &fh, body)?;
            match outcome {
                FragmentOutcome::Pending => Ok(ReceivedAction::Pending),
                FragmentOutcome::Complete(_) => {
                    let buf = self.reassembly.buffer(slot).ok_or(ThreadError::Drop)?;
                    let n = decompress_into(buf, src_mac, dst_mac, ctx_table, out)?;
                    self.reassembly.free(slot);
                    Ok(ReceivedAction::Deliver(n))
                }
            }
        } else {
            let n = decompress_into(rest, src_mac, dst_mac, ctx_table, out)?;
            Ok(ReceivedAction::Deliver(n))
        }
    }
}

impl<C: Config> Default for MeshForwarder<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies `len` bytes starting at `offset` out of the logical
/// concatenation `compressed_header ++ tail` (the IPHC-compressed
/// datagram, split at the point NHC compression stopped consuming the
/// upper-layer header) into `out`.
fn copy_compressed_range(compressed_header: &[u8], tail: &[u8], offset: usize, len: usize, out: &mut [u8]) {
    let mut written = 0;
    if offset < compressed_header.len() {
        let from = offset;
        let n = (compressed_header.len() - from).min(len);
        out[..n].copy_from_slice(&compressed_header[from..from + n]);
        written += n;
    }
    if written < len {
        let tail_offset = (offset + written).saturating_sub(compressed_header.len());
        let n = len - written;
        out[written..written + n].copy_from_slice(&tail[tail_offset..tail_offset + n]);
    }
}

/// Decompresses a 6LoWPAN IPHC datagram in `buf` (dispatch byte first)
/// into a literal IPv6 packet written to `out`; returns the number of
/// bytes written.
fn decompress_into<C: Config>(
    buf: &[u8],
    src_mac: MacAddress,
    dst_mac: MacAddress,
    ctx_table: &ContextTable<C>,
    out: &mut [u8],
) -> Result<usize, ThreadError> {
    let decompressed = iphc::decompress(buf, src_mac, dst_mac, ctx_table)?;
    let tail = &buf[decompressed.consumed..];
    let payload_len = match decompressed.udp_header {
        Some(_) => 8 + tail.len(),
        None => tail.len(),
    };
    if payload_len > u16::MAX as usize || out.len() < IP6_HEADER_LEN + payload_len {
        return Err(ThreadError::NoBufs);
    }
    let mut header = decompressed.header;
    header.set_payload_len(payload_len as u16);
    match header.encode(&mut out[..IP6_HEADER_LEN]) {
        SResult::Done(..) => {}
        SResult::Error(e) => return Err(e),
    }
    if let Some(udp) = decompressed.udp_header {
        out[IP6_HEADER_LEN..IP6_HEADER_LEN + 8].copy_from_slice(&udp);
        out[IP6_HEADER_LEN + 8..IP6_HEADER_LEN + 8 + tail.len()].copy_from_slice(tail);
    } else {
        out[IP6_HEADER_LEN..IP6_HEADER_LEN + tail.len()].copy_from_slice(tail);
    }
    Ok(IP6_HEADER_LEN + payload_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::ip6::addr::IpAddr;
    use crate::ip6::ext_headers::NEXT_HEADER_UDP;

    fn ctx_table() -> ContextTable<DefaultConfig> {
        ContextTable::new(IpAddr::new(), 64)
    }

    fn sample_datagram() -> [u8; IP6_HEADER_LEN + 8 + 4] {
        let mut header = Ip6Header::new();
        header.src = IpAddr::link_local_from_extended(&[1, 2, 3, 4, 5, 6, 7, 8]);
        header.dst = IpAddr::link_local_from_extended(&[8, 7, 6, 5, 4, 3, 2, 1]);
        header.set_next_header(NEXT_HEADER_UDP);
        header.set_hop_limit(64);
        header.set_payload_len(12);
        let mut buf = [0u8; IP6_HEADER_LEN + 8 + 4];
        header.encode(&mut buf[..IP6_HEADER_LEN]);
        buf[IP6_HEADER_LEN..IP6_HEADER_LEN + 8].copy_from_slice(&[0xf0, 0xb1, 0xf0, 0xb2, 0, 12, 0xab, 0xcd]);
        buf[IP6_HEADER_LEN + 8..].copy_from_slice(&[1, 2, 3, 4]);
        buf
    }

    #[test]
    fn single_frame_round_trips_without_mesh_header() {
        let fw: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let table = ctx_table();
        let datagram = sample_datagram();
        let src_mac = MacAddress::Long([1, 2, 3, 4, 5, 6, 7, 8]);
        let dst_mac = MacAddress::Long([8, 7, 6, 5, 4, 3, 2, 1]);

        let mut frame = [0u8; MAX_FRAME_PAYLOAD];
        let outcome = fw
            .build_frame(&datagram, None, src_mac, dst_mac, 0, 0, &table, &mut frame)
            .unwrap();
        assert!(outcome.next_offset.is_none());

        let mut fw2: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let mut out = [0u8; 128];
        let action = fw2
            .handle_received_frame(&frame[..outcome.len], src_mac, dst_mac, 0, &table, &mut out)
            .unwrap();
        match action {
            ReceivedAction::Deliver(n) => assert_eq!(&out[..n], &datagram[..]),
            other => panic!("expected Deliver, got {:?}", other),
        }
    }

    #[test]
    fn mesh_header_is_added_when_routing_through_another_hop() {
        let fw: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let table = ctx_table();
        let datagram = sample_datagram();
        let src_mac = MacAddress::Long([1, 2, 3, 4, 5, 6, 7, 8]);
        let dst_mac = MacAddress::Long([8, 7, 6, 5, 4, 3, 2, 1]);
        let route = MeshRoute {
            src_rloc16: 0x1000,
            dst_rloc16: 0x2000,
            hops_left: 3,
        };

        let mut frame = [0u8; MAX_FRAME_PAYLOAD];
        let outcome = fw
            .build_frame(&datagram, Some(route), src_mac, dst_mac, 0, 0, &table, &mut frame)
            .unwrap();
        assert_eq!(frame[0] & mesh::DISPATCH_MASK, mesh::DISPATCH);

        let mut fw2: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let mut out = [0u8; 128];
        let action = fw2
            .handle_received_frame(&frame[..outcome.len], src_mac, dst_mac, 0x9999, &table, &mut out)
            .unwrap();
        match action {
            ReceivedAction::Forward(n) => {
                let (hdr, _) = MeshHeader::decode(&out[..n]).unwrap();
                assert_eq!(hdr.hops_left, 2);
                assert_eq!(hdr.dst_short, 0x2000);
            }
            other => panic!("expected Forward, got {:?}", other),
        }
    }

    #[test]
    fn oversized_datagram_fragments_and_reassembles() {
        let fw: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let table = ctx_table();
        let src_mac = MacAddress::Short(0x1111);
        let dst_mac = MacAddress::Short(0x2222);

        let mut header = Ip6Header::new();
        header.src = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        header.dst = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15]);
        header.set_hop_limit(64);
        header.set_next_header(58);
        let payload = [0xaau8; 200];
        header.set_payload_len(payload.len() as u16);
        let mut datagram = [0u8; IP6_HEADER_LEN + 200];
        header.encode(&mut datagram[..IP6_HEADER_LEN]);
        datagram[IP6_HEADER_LEN..].copy_from_slice(&payload);

        let mut fw2: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let mut offset = 0usize;
        let mut out = [0u8; 1300];
        loop {
            let mut frame = [0u8; MAX_FRAME_PAYLOAD];
            let outcome = fw
                .build_frame(&datagram, None, src_mac, dst_mac, 42, offset, &table, &mut frame)
                .unwrap();
            let action = fw2
                .handle_received_frame(&frame[..outcome.len], src_mac, dst_mac, 0, &table, &mut out)
                .unwrap();
            match (outcome.next_offset, action) {
                (Some(next), ReceivedAction::Pending) => offset = next,
                (None, ReceivedAction::Deliver(n)) => {
                    assert_eq!(&out[..n], &datagram[..]);
                    break;
                }
                other => panic!("unexpected combination: {:?}", other),
            }
        }
    }

    #[test]
    fn resolve_route_prefers_network_data_route_over_address_query() {
        use crate::network_data::{HasRoute, Preference, PrefixTlv, SubTlv};

        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        let mut leader_data: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        let mut prefix = IpAddr::new();
        prefix.set_prefix(&[0xfd, 0, 1, 2, 3, 4, 5, 6], 64);
        let mut tlv = PrefixTlv::new(prefix, 64, 0, true);
        tlv.add_sub_tlv(SubTlv::HasRoute(HasRoute {
            rloc16: 0x1234,
            preference: Preference::Medium,
        }));
        leader_data.apply_contribution(tlv);

        let mut dst = IpAddr::new();
        dst.set_prefix(&[0xfd, 0, 1, 2, 3, 4, 5, 6], 64);
        match resolve_route(&mut resolver, &leader_data, 0xffff, &dst) {
            RouteResolution::Route(route) => assert_eq!(route.dst_rloc16, 0x1234),
            other => panic!("expected Route, got {:?}", other),
        }
    }

    #[test]
    fn resolve_route_falls_back_to_address_query_on_cache_miss() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        let leader_data: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        let dst = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 9, 9, 9, 9, 9, 9, 9, 9]);

        match resolve_route(&mut resolver, &leader_data, 0xffff, &dst) {
            RouteResolution::Query(_) => {}
            other => panic!("expected Query, got {:?}", other),
        }
    }

    #[test]
    fn park_for_resolution_and_drain_resolved_round_trip() {
        use crate::buf::buffer::BufferPool;
        use crate::buf::message::{Message, MessageType};

        let mut pool: BufferPool<8, 32> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut fw: MeshForwarder<DefaultConfig> = MeshForwarder::new();

        let eid = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 9, 9, 9, 9, 9, 9, 9, 9]);
        let other_eid = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 1, 1, 1, 1, 1, 1, 1, 1]);
        let msg = Message::new(&mut pool, MessageType::Ip6, 0).unwrap();
        let idx = arena.insert(msg).unwrap();
        fw.park_for_resolution(&mut arena, idx, eid);

        assert_eq!(fw.drain_resolved(&mut arena, &other_eid), [None, None, None, None]);
        let drained = fw.drain_resolved(&mut arena, &eid);
        assert_eq!(drained[0], Some(idx));
        assert_eq!(drained[1], None);
        assert_eq!(fw.drain_resolved(&mut arena, &eid), [None, None, None, None]);
    }

    #[test]
    fn on_data_request_finds_indirect_message_by_mac_address() {
        use crate::buf::buffer::BufferPool;
        use crate::buf::message::{Message, MessageType};
        use crate::mle::neighbor::ChildTable;

        let mut pool: BufferPool<8, 32> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut fw: MeshForwarder<DefaultConfig> = MeshForwarder::new();
        let mut children: ChildTable<DefaultConfig> = ChildTable::new();

        let ext_addr = [1, 2, 3, 4, 5, 6, 7, 8];
        let short_addr = 0xc001;
        let child_index = children.add(ext_addr, short_addr).unwrap();

        let mut msg = Message::new(&mut pool, MessageType::Ip6, 0).unwrap();
        msg.info.child_mask = 1u8 << child_index;
        let idx = arena.insert(msg).unwrap();
        fw.send_queue.enqueue(&mut arena, idx);

        assert!(fw.has_indirect_pending(&arena, child_index));
        assert_eq!(
            fw.on_data_request(&arena, &children, MacAddress::Short(short_addr)),
            Some(idx)
        );
        assert_eq!(
            fw.on_data_request(&arena, &children, MacAddress::Long(ext_addr)),
            Some(idx)
        );
        assert_eq!(
            fw.on_data_request(&arena, &children, MacAddress::Short(0xdead)),
            None
        );

        fw.send_queue.clear_child_bit(&mut arena, idx, child_index);
        assert!(!fw.has_indirect_pending(&arena, child_index));
    }
}
