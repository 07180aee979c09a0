// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mesh Link Establishment: attach/router/leader state machine (spec
//! §4.6), built from the sub-modules below plus the crate's
//! `key_manager::KeyManager`.

pub mod advertise;
pub mod attach;
pub mod header;
pub mod neighbor;
pub mod router;
pub mod tlv;

pub use advertise::AdvertiseTimer;
pub use attach::{AttachFilter, AttachProcedure, AttachState, MleCommand, ParentCandidate};
pub use header::{MleHeader, SECURITY_SUITE_CCM, SECURITY_SUITE_NONE};
pub use neighbor::{Child, ChildTable, Neighbor, NeighborState, NeighborTable, Router, RouterTable};
pub use router::{link_quality_to_cost, partition_is_better, LeaderData, MAX_ROUTE_COST};
pub use tlv::{Route64, Tlv, TlvType};

/// This node's place in the Thread attach hierarchy (spec §4.6).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeviceRole {
    Disabled,
    Detached,
    Child,
    Router,
    Leader,
}
