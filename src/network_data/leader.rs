// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The Leader's aggregate Network Data store, context-id allocation, and
//! `RouteLookup` (spec §4.7 "Leader store").
//!
//! Grounded on `sixlowpan/context.rs`'s `ContextTable` fixed-slot-plus-id
//! allocation shape, extended here with the reclaim-delay pattern
//! `mle/neighbor.rs`'s `RouterTable` already uses for router-ids.

use crate::config::Config;
use crate::ip6::addr::IpAddr;

use super::tlv::{PrefixTlv, SubTlv};

/// Seconds a released context-id is held in reserve before reuse (spec
/// §4.7: "reused after `kContextIdReuseDelay = 48 h`"). Expressed in
/// seconds like every other reclaim delay in this crate
/// (`mle::neighbor::ROUTER_ID_REUSE_DELAY_S`).
pub const CONTEXT_ID_REUSE_DELAY_S: u32 = 48 * 3600;

const MAX_CONTEXT_IDS: usize = 15;
const MAX_LEADER_PREFIXES: usize = 32;

struct ContextIdSlot {
    allocated: bool,
    reclaim_delay: u32,
}

/// Aggregate of every node's contributions, versioned by
/// `(dataVersion, stableVersion)`; bumped on every contribution change
/// (spec §4.7).
pub struct LeaderNetworkData<C: Config> {
    prefixes: [Option<PrefixTlv>; MAX_LEADER_PREFIXES],
    context_ids: [ContextIdSlot; MAX_CONTEXT_IDS],
    data_version: u8,
    stable_version: u8,
    _marker: core::marker::PhantomData<C>,
}

impl<C: Config> LeaderNetworkData<C> {
    pub fn new() -> Self {
        LeaderNetworkData {
            prefixes: [None; MAX_LEADER_PREFIXES],
            context_ids: core::array::from_fn(|_| ContextIdSlot {
                allocated: false,
                reclaim_delay: 0,
            }),
            data_version: 0,
            stable_version: 0,
            _marker: core::marker::PhantomData,
        }
    }

    pub fn data_version(&self) -> u8 {
        self.data_version
    }

    pub fn stable_version(&self) -> u8 {
        self.stable_version
    }

    /// Installs or replaces a contribution by `(prefix, prefix_len)`,
    /// bumping `data_version` (and `stable_version` too when any sub-TLV
    /// is stable) — the "broadcast MLE Data-Response" step is the
    /// caller's job once this returns true.
    pub fn apply_contribution(&mut self, tlv: PrefixTlv) -> bool {
        let existing = self.prefixes.iter_mut().find(|slot| {
            matches!(slot.as_ref(), Some(p) if p.prefix == tlv.prefix && p.prefix_len == tlv.prefix_len)
        });
        match existing {
            Some(slot) => *slot = Some(tlv),
            None => {
                let Some(slot) = self.prefixes.iter_mut().find(|s| s.is_none()) else {
                    return false;
                };
                *slot = Some(tlv);
            }
        }
        self.data_version = self.data_version.wrapping_add(1);
        if tlv.stable {
            self.stable_version = self.stable_version.wrapping_add(1);
        }
        true
    }

    pub fn remove_contribution(&mut self, prefix: &IpAddr, prefix_len: u8) {
        for slot in self.prefixes.iter_mut() {
            if matches!(slot, Some(p) if p.prefix == *prefix && p.prefix_len == prefix_len) {
                *slot = None;
                self.data_version = self.data_version.wrapping_add(1);
            }
        }
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &PrefixTlv> {
        self.prefixes.iter().flatten()
    }

    /// Allocates the lowest free 4-bit context-id in `1..=15` (id 0 is
    /// reserved for the mesh-local prefix, per
    /// `sixlowpan::context::ContextTable`), skipping ids still in their
    /// reclaim delay.
    pub fn allocate_context_id(&mut self) -> Option<u8> {
        for (i, slot) in self.context_ids.iter_mut().enumerate() {
            if !slot.allocated && slot.reclaim_delay == 0 {
                slot.allocated = true;
                return Some((i + 1) as u8);
            }
        }
        None
    }

    pub fn release_context_id(&mut self, id: u8) {
        if id == 0 || id as usize > MAX_CONTEXT_IDS {
            return;
        }
        let slot = &mut self.context_ids[id as usize - 1];
        slot.allocated = false;
        slot.reclaim_delay = CONTEXT_ID_REUSE_DELAY_S;
    }

    /// 1-Hz tick: counts down reclaim delays on released context-ids.
    pub fn tick(&mut self) {
        for slot in self.context_ids.iter_mut() {
            if slot.reclaim_delay > 0 {
                slot.reclaim_delay -= 1;
            }
        }
    }

    /// Longest-prefix match against on-mesh prefixes; among equal
    /// matches prefer higher preference, then lower rloc distance to
    /// `src` (spec §4.7 RouteLookup). Only Border-Router/Has-Route
    /// sub-TLVs are candidates; a prefix with neither contributes no
    /// route.
    pub fn route_lookup(&self, src_rloc16: u16, dst: &IpAddr) -> Option<u16> {
        let mut best: Option<(u8, i8, u16)> = None; // (prefix_len, preference, rloc16)
        for prefix in self.prefixes() {
            if !prefix_matches(&prefix.prefix, prefix.prefix_len, dst) {
                continue;
            }
            for sub in prefix.sub_tlvs() {
                let (rloc16, preference) = match sub {
                    SubTlv::HasRoute(hr) => (hr.rloc16, hr.preference.to_i8()),
                    SubTlv::BorderRouter(br) => (br.rloc16, br.preference.to_i8()),
                    SubTlv::Context(_) => continue,
                };
                let distance = rloc_distance(src_rloc16, rloc16);
                let candidate = (prefix.prefix_len, preference, rloc16);
                let better = match best {
                    None => true,
                    Some((len, pref, cur_rloc16)) => {
                        (prefix.prefix_len, preference) > (len, pref)
                            || ((prefix.prefix_len, preference) == (len, pref)
                                && distance < rloc_distance(src_rloc16, cur_rloc16))
                    }
                };
                if better {
                    best = Some(candidate);
                }
            }
        }
        best.map(|(_, _, rloc16)| rloc16)
    }
}

impl<C: Config> Default for LeaderNetworkData<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn prefix_matches(prefix: &IpAddr, prefix_len: u8, addr: &IpAddr) -> bool {
    let full_bytes = (prefix_len / 8) as usize;
    let rem_bits = prefix_len % 8;
    if full_bytes > 16 {
        return false;
    }
    if prefix.0[..full_bytes] != addr.0[..full_bytes] {
        return false;
    }
    if rem_bits == 0 {
        return true;
    }
    let mask = 0xffu8 << (8 - rem_bits);
    (prefix.0[full_bytes] & mask) == (addr.0[full_bytes] & mask)
}

/// RLOC16 router-id distance used only to break preference ties (spec
/// §4.7: "lower rloc distance to source"); router-id is the high 6 bits.
fn rloc_distance(a: u16, b: u16) -> u8 {
    let ra = (a >> 10) as i16;
    let rb = (b >> 10) as i16;
    (ra - rb).unsigned_abs() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::network_data::tlv::{HasRoute, Preference};

    fn prefix_with_route(bytes: &[u8], len: u8, rloc16: u16, preference: Preference) -> PrefixTlv {
        let mut addr = IpAddr::new();
        addr.set_prefix(bytes, len);
        let mut tlv = PrefixTlv::new(addr, len, 0, true);
        tlv.add_sub_tlv(SubTlv::HasRoute(HasRoute { rloc16, preference }));
        tlv
    }

    #[test]
    fn apply_contribution_bumps_versions() {
        let mut leader: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        assert_eq!(leader.data_version(), 0);
        leader.apply_contribution(prefix_with_route(&[0xfd, 0], 16, 0x0400, Preference::Medium));
        assert_eq!(leader.data_version(), 1);
        assert_eq!(leader.stable_version(), 1);
    }

    #[test]
    fn longest_prefix_wins_route_lookup() {
        let mut leader: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        leader.apply_contribution(prefix_with_route(&[0xfd, 0], 8, 0x0400, Preference::Medium));
        leader.apply_contribution(prefix_with_route(&[0xfd, 0], 16, 0x0800, Preference::Medium));

        let mut dst = IpAddr::new();
        dst.set_prefix(&[0xfd, 0], 16);
        assert_eq!(leader.route_lookup(0x0000, &dst), Some(0x0800));
    }

    #[test]
    fn higher_preference_breaks_equal_length_tie() {
        let mut leader: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        leader.apply_contribution(prefix_with_route(&[0xfd, 0], 16, 0x0400, Preference::Low));
        leader.apply_contribution(prefix_with_route(&[0xfd, 0], 16, 0x0800, Preference::High));

        let mut dst = IpAddr::new();
        dst.set_prefix(&[0xfd, 0], 16);
        assert_eq!(leader.route_lookup(0x0000, &dst), Some(0x0800));
    }

    #[test]
    fn context_id_allocation_skips_reclaim_delay() {
        let mut leader: LeaderNetworkData<DefaultConfig> = LeaderNetworkData::new();
        let id = leader.allocate_context_id().unwrap();
        assert!((1..=15).contains(&id));
        leader.release_context_id(id);
        assert_ne!(leader.allocate_context_id().unwrap(), id);
    }
}
