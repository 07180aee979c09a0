// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Network Data: the local store a node contributes from, and the
//! Leader's aggregate store other nodes replicate (spec §4.7).

pub mod leader;
pub mod local;
pub mod tlv;

pub use leader::{LeaderNetworkData, CONTEXT_ID_REUSE_DELAY_S};
pub use local::LocalNetworkData;
pub use tlv::{BorderRouter, ContextSubTlv, HasRoute, Preference, PrefixTlv, SubTlv};
