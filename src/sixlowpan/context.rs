// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The 6LoWPAN context table: prefixes shared with the IPHC compressor so
//! stateful address compression (SAM/DAM modes with SAC/DAC set) can
//! elide a prefix the mesh already knows, not just the link-local one.
//!
//! Grounded on `other_examples/*lowpan.rs`'s `Context`/`ContextStore`
//! trait (`get_context_from_addr`/`get_context_from_id`/
//! `get_context_from_prefix`, a `DummyStore` stub with a TODO noting
//! "context 0 (the mesh-local prefix) as one of the possible options");
//! this crate fills in that TODO with a concrete fixed-size table rather
//! than leaving it a stub, since Context 0 (the mesh-local prefix) is
//! load-bearing for every on-mesh compressed address.

use crate::config::Config;
use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Context {
    pub prefix: IpAddr,
    pub prefix_len: u8,
    pub id: u8,
    pub compress: bool,
}

/// Fixed-capacity context table, indexed 0..15 by `Config::MAX_CONTEXTS`.
/// Context 0 is always present and always the mesh-local prefix (spec
/// §4.3/§4.7): NetworkData installs/removes the rest as Prefix TLVs with
/// a Context sub-TLV arrive and age out.
pub struct ContextTable<C: Config> {
    contexts: [Option<Context>; 16],
    _config: core::marker::PhantomData<C>,
}

impl<C: Config> ContextTable<C> {
    pub fn new(mesh_local_prefix: IpAddr, mesh_local_prefix_len: u8) -> Self {
        let mut contexts: [Option<Context>; 16] = [None; 16];
        contexts[0] = Some(Context {
            prefix: mesh_local_prefix,
            prefix_len: mesh_local_prefix_len,
            id: 0,
            compress: true,
        });
        ContextTable {
            contexts,
            _config: core::marker::PhantomData,
        }
    }

    pub fn set(&mut self, ctx: Context) -> Result<(), ThreadError> {
        if ctx.id as usize >= C::MAX_CONTEXTS || ctx.id as usize >= self.contexts.len() {
            return Err(ThreadError::InvalidArgs);
        }
        self.contexts[ctx.id as usize] = Some(ctx);
        Ok(())
    }

    pub fn remove(&mut self, id: u8) {
        if id != 0 && (id as usize) < self.contexts.len() {
            self.contexts[id as usize] = None;
        }
    }

    pub fn get_by_id(&self, id: u8) -> Option<Context> {
        self.contexts.get(id as usize).copied().flatten()
    }

    pub fn get_by_addr(&self, addr: &IpAddr) -> Option<Context> {
        self.contexts
            .iter()
            .flatten()
            .filter(|ctx| prefix_matches(&ctx.prefix, ctx.prefix_len, addr))
            .max_by_key(|ctx| ctx.prefix_len)
            .copied()
    }

    pub fn get_by_prefix(&self, prefix: &[u8], prefix_len: u8) -> Option<Context> {
        self.contexts
            .iter()
            .flatten()
            .find(|ctx| ctx.prefix_len == prefix_len && prefix_bytes_match(&ctx.prefix, prefix, prefix_len))
            .copied()
    }
}

fn prefix_matches(prefix: &IpAddr, prefix_len: u8, addr: &IpAddr) -> bool {
    prefix_bytes_match(prefix, &addr.0, prefix_len)
}

fn prefix_bytes_match(prefix: &IpAddr, candidate: &[u8], prefix_len: u8) -> bool {
    let full_bytes = (prefix_len / 8) as usize;
    let rem_bits = prefix_len % 8;
    if full_bytes > 16 || candidate.len() < full_bytes {
        return false;
    }
    if prefix.0[..full_bytes] != candidate[..full_bytes] {
        return false;
    }
    if rem_bits == 0 {
        return true;
    }
    if candidate.len() <= full_bytes {
        return false;
    }
    let mask = 0xffu8 << (8 - rem_bits);
    (prefix.0[full_bytes] & mask) == (candidate[full_bytes] & mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;

    #[test]
    fn context_zero_is_mesh_local_prefix() {
        let mut mesh_local = IpAddr::new();
        mesh_local.set_prefix(&[0xfd, 0x00, 0xab, 0xcd, 0, 0, 0, 0], 64);
        let table: ContextTable<DefaultConfig> = ContextTable::new(mesh_local, 64);
        assert_eq!(table.get_by_id(0).unwrap().prefix, mesh_local);
    }

    #[test]
    fn longest_prefix_match_wins() {
        let mesh_local = IpAddr::new();
        let mut table: ContextTable<DefaultConfig> = ContextTable::new(mesh_local, 64);
        let mut narrow = IpAddr::new();
        narrow.set_prefix(&[0xfd, 0x01], 16);
        table
            .set(Context {
                prefix: narrow,
                prefix_len: 16,
                id: 1,
                compress: true,
            })
            .unwrap();

        let mut addr = IpAddr::new();
        addr.set_prefix(&[0xfd, 0x01], 16);
        let found = table.get_by_addr(&addr).unwrap();
        assert_eq!(found.id, 1);
    }

    #[test]
    fn rejects_out_of_range_context_id() {
        let mesh_local = IpAddr::new();
        let mut table: ContextTable<DefaultConfig> = ContextTable::new(mesh_local, 64);
        let err = table.set(Context {
            prefix: mesh_local,
            prefix_len: 64,
            id: 200,
            compress: true,
        });
        assert!(err.is_err());
    }
}
