// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The forwarder's reassembly list: a thin, `Config`-sized wrapper over
//! `sixlowpan::frag::ReassemblyTable` (spec §4.4's `reassemblyList`,
//! invariant I6).

use crate::config::Config;
use crate::error::ThreadError;
use crate::sixlowpan::frag::{FragmentHeader, FragmentOutcome, ReassemblyTable};

/// Largest datagram this node will reassemble: the IPv6 minimum MTU, which
/// every 6LoWPAN fragment source must respect regardless of `Config`.
pub const MAX_REASSEMBLED_SIZE: usize = 1280;

pub struct ReassemblyList<C: Config> {
    table: ReassemblyTable<MAX_REASSEMBLED_SIZE, { C::MAX_REASSEMBLIES }>,
}

impl<C: Config> ReassemblyList<C> {
    pub fn new() -> Self {
        ReassemblyList {
            table: ReassemblyTable::new(),
        }
    }

    pub fn on_fragment(
        &mut self,
        src_short: u16,
        header: &FragmentHeader,
        payload: &[u8],
    ) -> Result<(usize, FragmentOutcome), ThreadError> {
        self.table.on_fragment(src_short, header, payload)
    }

    pub fn buffer(&self, slot: usize) -> Option<&[u8]> {
        self.table.buffer(slot)
    }

    pub fn free(&mut self, slot: usize) {
        self.table.free(slot)
    }

    /// Spec §4.4's 1-Hz reassembly sweep.
    pub fn tick(&mut self) {
        self.table.tick()
    }
}

impl<C: Config> Default for ReassemblyList<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;

    #[test]
    fn reassembles_with_default_config_bound() {
        let mut list: ReassemblyList<DefaultConfig> = ReassemblyList::new();
        let first = FragmentHeader {
            datagram_size: 16,
            datagram_tag: 1,
            offset: None,
        };
        let (slot, _) = list.on_fragment(0x1234, &first, &[9; 8]).unwrap();
        let second = FragmentHeader {
            datagram_size: 16,
            datagram_tag: 1,
            offset: Some(1),
        };
        let (slot2, outcome) = list.on_fragment(0x1234, &second, &[9; 8]).unwrap();
        assert_eq!(slot, slot2);
        assert!(matches!(outcome, FragmentOutcome::Complete(16)));
        assert!(list.buffer(slot).is_some());
        list.free(slot);
        assert!(list.buffer(slot).is_none());
    }
}
