// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The attach procedure and its command-id vocabulary (spec §4.6 "Attach
//! procedure (becoming a Child)").
//!
//! Grounded on `mac/csma.rs`'s small enum-plus-timeout state machine
//! shape (no Tock MLE analogue exists to imitate more directly) and
//! spec §4.6's five numbered attach steps.

use super::router::{partition_is_better, LeaderData};

/// MLE command byte (spec §4.6's command list).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum MleCommand {
    LinkRequest = 0,
    LinkAccept = 1,
    LinkAcceptAndRequest = 2,
    LinkReject = 3,
    Advertisement = 4,
    DataRequest = 7,
    DataResponse = 8,
    ParentRequest = 9,
    ParentResponse = 10,
    ChildIdRequest = 11,
    ChildIdResponse = 12,
    ChildUpdateRequest = 13,
    ChildUpdateResponse = 14,
}

impl MleCommand {
    pub fn from_u8(v: u8) -> Option<Self> {
        use MleCommand::*;
        Some(match v {
            0 => LinkRequest,
            1 => LinkAccept,
            2 => LinkAcceptAndRequest,
            3 => LinkReject,
            4 => Advertisement,
            7 => DataRequest,
            8 => DataResponse,
            9 => ParentRequest,
            10 => ParentResponse,
            11 => ChildIdRequest,
            12 => ChildIdResponse,
            13 => ChildUpdateRequest,
            14 => ChildUpdateResponse,
            _ => return None,
        })
    }
}

/// Which partitions a node attaching will consider (spec §4.6 step 1).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttachFilter {
    AnyPartition,
    SamePartition(u32),
    BetterPartition(LeaderData),
}

impl AttachFilter {
    fn accepts(&self, candidate: &LeaderData) -> bool {
        match self {
            AttachFilter::AnyPartition => true,
            AttachFilter::SamePartition(id) => candidate.partition_id == *id,
            AttachFilter::BetterPartition(current) => partition_is_better(candidate, current),
        }
    }
}

/// Seconds routers-only Parent-Requests are collected before REEDs are
/// included too (spec §4.6 step 2).
pub const PARENT_REQUEST_ROUTER_TIMEOUT_S: u32 = 1;
/// Seconds the request window stays open once REEDs are included.
pub const PARENT_REQUEST_CHILD_TIMEOUT_S: u32 = 2;
/// Attach rounds to try before giving up and remaining Detached (spec
/// §4.6 step 5: "failure after N rounds").
pub const MAX_ATTACH_ROUNDS: u8 = 3;

/// One Parent-Response candidate, scored by `(partitionBetter?,
/// linkQualityIn, connectivity)` per spec §4.6 step 3. `partition_better`
/// and `connectivity` come from `AttachFilter`/`Connectivity` TLV
/// evaluation upstream; this type just orders the results.
#[derive(Clone, Copy, Debug)]
pub struct ParentCandidate {
    pub rloc16: u16,
    pub ext_addr: [u8; 8],
    pub leader_data: LeaderData,
    pub link_quality_in: u8,
    pub connectivity: u8,
    pub partition_better: bool,
}

impl ParentCandidate {
    fn score(&self) -> (bool, u8, u8) {
        (self.partition_better, self.link_quality_in, self.connectivity)
    }
}

/// Attach progress (spec §4.6 steps 2-5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttachState {
    Idle,
    /// Parent-Request broadcast, collecting responses; `round` counts
    /// retry attempts so `MAX_ATTACH_ROUNDS` can be enforced.
    Requesting { round: u8, elapsed_s: u32 },
    ChildIdRequested,
    Attached,
    Failed,
}

/// Drives one node's attach attempt: accumulates Parent-Response
/// candidates against `filter`, and on timeout picks the best one to
/// send a Child-Id-Request to.
pub struct AttachProcedure {
    pub filter: AttachFilter,
    pub state: AttachState,
    candidates: [Option<ParentCandidate>; 8],
    candidate_count: usize,
}

impl AttachProcedure {
    pub fn new(filter: AttachFilter) -> Self {
        AttachProcedure {
            filter,
            state: AttachState::Idle,
            candidates: [None; 8],
            candidate_count: 0,
        }
    }

    pub fn start(&mut self) {
        self.candidates = [None; 8];
        self.candidate_count = 0;
        self.state = AttachState::Requesting {
            round: 0,
            elapsed_s: 0,
        };
    }

    /// Records a Parent-Response if it matches `filter` and there's room;
    /// returns whether it was accepted.
    pub fn offer_candidate(&mut self, candidate: ParentCandidate) -> bool {
        if !matches!(self.state, AttachState::Requesting { .. }) {
            return false;
        }
        if !self.filter.accepts(&candidate.leader_data) {
            return false;
        }
        if self.candidate_count >= self.candidates.len() {
            return false;
        }
        self.candidates[self.candidate_count] = Some(candidate);
        self.candidate_count += 1;
        true
    }

    /// True once REEDs should be solicited too (spec §4.6 step 2).
    pub fn should_include_reeds(&self) -> bool {
        matches!(self.state, AttachState::Requesting { elapsed_s, .. } if elapsed_s >= PARENT_REQUEST_ROUTER_TIMEOUT_S)
    }

    /// 1-Hz tick; returns the best candidate once the collection window
    /// has closed, advancing to `ChildIdRequested`. `None` while still
    /// collecting, or after `MAX_ATTACH_ROUNDS` have failed (state becomes
    /// `Failed`, spec §4.6 step 5).
    pub fn tick(&mut self) -> Option<ParentCandidate> {
        let AttachState::Requesting { round, elapsed_s } = self.state else {
            return None;
        };
        let elapsed_s = elapsed_s + 1;
        if elapsed_s < PARENT_REQUEST_ROUTER_TIMEOUT_S + PARENT_REQUEST_CHILD_TIMEOUT_S {
            self.state = AttachState::Requesting { round, elapsed_s };
            return None;
        }
        let best = self.candidates.iter().flatten().max_by_key(|c| c.score()).copied();
        match best {
            Some(c) => {
                self.state = AttachState::ChildIdRequested;
                Some(c)
            }
            None if round + 1 >= MAX_ATTACH_ROUNDS => {
                self.state = AttachState::Failed;
                None
            }
            None => {
                self.candidates = [None; 8];
                self.candidate_count = 0;
                self.state = AttachState::Requesting {
                    round: round + 1,
                    elapsed_s: 0,
                };
                None
            }
        }
    }

    pub fn confirm_attached(&mut self) {
        self.state = AttachState::Attached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(weighting: u8, partition_id: u32) -> LeaderData {
        LeaderData {
            partition_id,
            weighting,
            data_version: 0,
            stable_version: 0,
            leader_router_id: 0,
        }
    }

    #[test]
    fn any_partition_filter_accepts_everything() {
        let mut proc = AttachProcedure::new(AttachFilter::AnyPartition);
        proc.start();
        assert!(proc.offer_candidate(ParentCandidate {
            rloc16: 0x0400,
            ext_addr: [1; 8],
            leader_data: leader(64, 1),
            link_quality_in: 3,
            connectivity: 5,
            partition_better: false,
        }));
    }

    #[test]
    fn better_partition_filter_rejects_equal_or_worse() {
        let current = leader(64, 0xffff_ffff);
        let mut proc = AttachProcedure::new(AttachFilter::BetterPartition(current));
        proc.start();
        assert!(!proc.offer_candidate(ParentCandidate {
            rloc16: 0x0400,
            ext_addr: [1; 8],
            leader_data: leader(64, 1),
            link_quality_in: 3,
            connectivity: 5,
            partition_better: false,
        }));
        assert!(proc.offer_candidate(ParentCandidate {
            rloc16: 0x0800,
            ext_addr: [2; 8],
            leader_data: leader(65, 1),
            link_quality_in: 3,
            connectivity: 5,
            partition_better: true,
        }));
    }

    #[test]
    fn best_scoring_candidate_wins_after_window_closes() {
        let mut proc = AttachProcedure::new(AttachFilter::AnyPartition);
        proc.start();
        proc.offer_candidate(ParentCandidate {
            rloc16: 0x0400,
            ext_addr: [1; 8],
            leader_data: leader(64, 1),
            link_quality_in: 1,
            connectivity: 9,
            partition_better: false,
        });
        proc.offer_candidate(ParentCandidate {
            rloc16: 0x0800,
            ext_addr: [2; 8],
            leader_data: leader(64, 1),
            link_quality_in: 3,
            connectivity: 1,
            partition_better: false,
        });
        let mut winner = None;
        for _ in 0..(PARENT_REQUEST_ROUTER_TIMEOUT_S + PARENT_REQUEST_CHILD_TIMEOUT_S) {
            if let Some(c) = proc.tick() {
                winner = Some(c);
            }
        }
        assert_eq!(winner.unwrap().rloc16, 0x0800);
        assert_eq!(proc.state, AttachState::ChildIdRequested);
    }

    #[test]
    fn gives_up_after_max_rounds_with_no_candidates() {
        let mut proc = AttachProcedure::new(AttachFilter::AnyPartition);
        proc.start();
        for _round in 0..MAX_ATTACH_ROUNDS {
            for _ in 0..(PARENT_REQUEST_ROUTER_TIMEOUT_S + PARENT_REQUEST_CHILD_TIMEOUT_S) {
                proc.tick();
            }
        }
        assert_eq!(proc.state, AttachState::Failed);
    }
}
