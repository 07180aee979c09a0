// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The local Network Data store: this node's own contributions, and
//! `Register` wrapping them for the Leader (spec §4.7 "Local store").
//!
//! Grounded on `forwarder/send_queue.rs`'s fixed-array-of-`Option`
//! bookkeeping shape, reused here for a node's own prefix contributions
//! instead of its outgoing messages.

use crate::coap::{CoapCode, CoapMessage, CoapType};
use crate::config::Config;
use crate::error::ThreadError;
use crate::mac::stream::SResult;

use super::tlv::PrefixTlv;

const MAX_LOCAL_PREFIXES: usize = 4;

/// This node's own Prefix-TLV contributions, pending or already
/// registered with the Leader.
pub struct LocalNetworkData<C: Config> {
    prefixes: [Option<PrefixTlv>; MAX_LOCAL_PREFIXES],
    _marker: core::marker::PhantomData<C>,
}

impl<C: Config> LocalNetworkData<C> {
    pub fn new() -> Self {
        LocalNetworkData {
            prefixes: [None; MAX_LOCAL_PREFIXES],
            _marker: core::marker::PhantomData,
        }
    }

    pub fn add_prefix(&mut self, prefix: PrefixTlv) -> Result<(), ThreadError> {
        for slot in self.prefixes.iter_mut() {
            if slot.is_none() {
                *slot = Some(prefix);
                return Ok(());
            }
        }
        Err(ThreadError::NoBufs)
    }

    pub fn remove_prefix(&mut self, prefix: &crate::ip6::addr::IpAddr, prefix_len: u8) {
        for slot in self.prefixes.iter_mut() {
            if matches!(slot, Some(p) if p.prefix == *prefix && p.prefix_len == prefix_len) {
                *slot = None;
            }
        }
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &PrefixTlv> {
        self.prefixes.iter().flatten()
    }

    /// Serializes every contribution into a single TLV blob and wraps it
    /// as a confirmable CoAP POST to `/a/sd` with a fresh two-byte token
    /// (spec §4.7: "`Register(leaderAddr)` wraps the byte blob... with a
    /// fresh two-byte token").
    pub fn register(&self, message_id: u16, token: [u8; 2]) -> Result<CoapMessage, ThreadError> {
        let mut body = [0u8; 128];
        let mut off = 0;
        for prefix in self.prefixes() {
            off = match prefix.encode(&mut body[off..]) {
                SResult::Done(advanced, _) => off + advanced,
                SResult::Error(e) => return Err(e),
            };
        }
        let mut msg = CoapMessage::request(CoapType::Confirmable, CoapCode::Post, message_id, "a/sd", &body[..off])?;
        msg.set_token(&token)?;
        Ok(msg)
    }
}

impl<C: Config> Default for LocalNetworkData<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;
    use crate::ip6::addr::IpAddr;

    #[test]
    fn register_produces_a_confirmable_post_to_server_data() {
        let mut data: LocalNetworkData<DefaultConfig> = LocalNetworkData::new();
        let mut prefix_addr = IpAddr::new();
        prefix_addr.set_prefix(&[0xfd, 0x00], 16);
        data.add_prefix(PrefixTlv::new(prefix_addr, 16, 0, true)).unwrap();

        let msg = data.register(1, [0xaa, 0xbb]).unwrap();
        assert!(msg.uri_is("a/sd"));
        assert_eq!(msg.msg_type, CoapType::Confirmable);
        assert_eq!(msg.code, CoapCode::Post);
        assert!(!msg.payload().is_empty());
    }

    #[test]
    fn full_table_rejects_additional_prefixes() {
        let mut data: LocalNetworkData<DefaultConfig> = LocalNetworkData::new();
        for i in 0..MAX_LOCAL_PREFIXES {
            let mut addr = IpAddr::new();
            addr.set_prefix(&[0xfd, i as u8], 16);
            data.add_prefix(PrefixTlv::new(addr, 16, 0, true)).unwrap();
        }
        let mut addr = IpAddr::new();
        addr.set_prefix(&[0xfd, 0xff], 16);
        assert!(data.add_prefix(PrefixTlv::new(addr, 16, 0, true)).is_err());
    }
}
