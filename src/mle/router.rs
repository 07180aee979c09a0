// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Leader data, partition comparison, and the router next-hop relaxation
//! (spec §4.6's router/leader paragraph, invariant I5).
//!
//! Grounded on spec §3's `LeaderData` field list and the GLOSSARY's
//! `Partition = (weight, partitionId, leaderRouterId)` definition directly;
//! no Tock analogue exists (Tock's 802.15.4 stack has no routing concept
//! at all — see `mac/csma.rs`'s entry for the same "spec is the only
//! source" situation).

use super::neighbor::{RouterTable, MAX_ROUTER_ID};
use crate::config::Config;

/// Spec §3: partition identity plus the leader's data-freshness counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LeaderData {
    pub partition_id: u32,
    pub weighting: u8,
    pub data_version: u8,
    pub stable_version: u8,
    pub leader_router_id: u8,
}

/// Spec §4.6: "leader election by highest `(weighting, partitionId)`";
/// also used to score a candidate partition encountered via a Parent
/// Response or Advertisement against this node's current one (S4's
/// partition-merge scenario).
pub fn partition_is_better(candidate: &LeaderData, current: &LeaderData) -> bool {
    (candidate.weighting, candidate.partition_id) > (current.weighting, current.partition_id)
}

/// 802.15.4 link-quality-indicator bucket (0..3) mapped to a Thread route
/// cost, per spec §4.6 ("link cost = max(linkQualityIn, linkQualityOut)
/// mapped 1/2/4/16"): best link quality is cheapest.
pub fn link_quality_to_cost(lq: u8) -> u8 {
    match lq {
        3 => 1,
        2 => 2,
        1 => 4,
        _ => 16,
    }
}

/// Spec §4.6/§8 I5: routes more expensive than this are unreachable, and
/// no relaxation step may be accepted past it — this is what bounds the
/// hop count and guarantees the table can't cycle into ever-cheaper-looking
/// loops.
pub const MAX_ROUTE_COST: u8 = 16;

fn direct_link_cost(route_table: &RouterTable<impl Config>, router_id: u8) -> Option<u8> {
    let r = route_table.get(router_id)?;
    if !r.is_direct_neighbor() {
        return None;
    }
    Some(link_quality_to_cost(
        r.link_quality_in.max(r.link_quality_out),
    ))
}

/// Recomputes every router's `route_cost`/`next_hop` from scratch: start
/// each direct neighbor at its direct link cost, then relax through every
/// other direct neighbor's advertised cost to that destination. Bounded to
/// `MAX_ROUTER_ID` passes, which both terminates the relaxation and
/// enforces I5 (a route can never end up cheaper than reachable within
/// `MAX_ROUTE_COST`, since costs only ever decrease and are rejected past
/// that ceiling).
pub fn recompute_routes<C: Config>(
    routers: &mut RouterTable<C>,
    advertised: &[(u8, [(u8, u8); 32], usize)],
) {
    for r in routers.iter_mut() {
        if r.is_direct_neighbor() {
            r.route_cost = link_quality_to_cost(r.link_quality_in.max(r.link_quality_out));
            r.next_hop = r.router_id;
        } else {
            r.route_cost = u8::MAX;
            r.next_hop = 0xff;
        }
    }

    for _pass in 0..=MAX_ROUTER_ID {
        let mut changed = false;
        for &(via_router_id, ref entries, len) in advertised {
            let Some(via_cost) = direct_link_cost(routers, via_router_id) else {
                continue;
            };
            for &(dest_id, dest_cost_via) in &entries[..len] {
                if dest_id == via_router_id {
                    continue;
                }
                let total = via_cost.saturating_add(dest_cost_via);
                if total > MAX_ROUTE_COST {
                    continue;
                }
                let Some(dest) = routers.learn_or_get_mut(dest_id) else {
                    continue;
                };
                if dest.is_direct_neighbor() {
                    continue;
                }
                if total < dest.route_cost {
                    dest.route_cost = total;
                    dest.next_hop = via_router_id;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::mle::neighbor::NeighborState;

    #[test]
    fn higher_weighting_wins_partition_comparison() {
        let p1 = LeaderData {
            partition_id: 0x1111_1111,
            weighting: 65,
            data_version: 1,
            stable_version: 1,
            leader_router_id: 1,
        };
        let p2 = LeaderData {
            partition_id: 0xffff_ffff,
            weighting: 64,
            data_version: 1,
            stable_version: 1,
            leader_router_id: 2,
        };
        assert!(partition_is_better(&p1, &p2));
        assert!(!partition_is_better(&p2, &p1));
    }

    #[test]
    fn two_hop_route_is_discovered_through_a_relay() {
        let mut routers: RouterTable<DefaultConfig> = RouterTable::new();
        let near = routers.allocate().unwrap();
        routers.get_mut(near).unwrap().neighbor_state = NeighborState::Valid;
        routers.get_mut(near).unwrap().link_quality_in = 3;
        routers.get_mut(near).unwrap().link_quality_out = 3;

        let far = routers.learn_or_get_mut(near + 1).unwrap().router_id;
        assert_eq!(far, near + 1);

        // `near` advertises it can reach `far` at cost 2.
        let mut entries = [(0u8, 0u8); 32];
        entries[0] = (far, 2);
        recompute_routes(&mut routers, &[(near, entries, 1)]);

        let r = routers.get(far).unwrap();
        assert_eq!(r.next_hop, near);
        assert_eq!(r.route_cost, 1 + 2);
    }

    #[test]
    fn route_beyond_max_cost_is_rejected() {
        let mut routers: RouterTable<DefaultConfig> = RouterTable::new();
        let near = routers.allocate().unwrap();
        routers.get_mut(near).unwrap().neighbor_state = NeighborState::Valid;
        routers.get_mut(near).unwrap().link_quality_in = 0;
        routers.get_mut(near).unwrap().link_quality_out = 0;

        let far = routers.learn_or_get_mut(near + 1).unwrap().router_id;
        let mut entries = [(0u8, 0u8); 32];
        entries[0] = (far, 10);
        recompute_routes(&mut routers, &[(near, entries, 1)]);

        assert_eq!(routers.get(far).unwrap().route_cost, u8::MAX);
    }
}
