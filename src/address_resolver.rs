// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `AddressResolver`: the EID → RLOC16 cache and CoAP address-query
//! protocol (spec §4.8), sized by `Config::ADDRESS_CACHE_SIZE` — the
//! last dead configuration surface this crate's `Config` trait declared
//! but nothing consumed.
//!
//! Grounded on `sixlowpan/context.rs`'s fixed-slot table shape and spec
//! §4.8's `Resolve`/`HandleAddressNotification`/`HandleAddressError`
//! operation list; `release` is SPEC_FULL's supplemented `/a/ar` feature.

use crate::coap::{CoapCode, CoapMessage, CoapType};
use crate::config::Config;
use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;

/// Spec §4.8: "allocate least-recently-used entry, set Discover,
/// timeout=kAddressQueryTimeout=3s".
pub const ADDRESS_QUERY_TIMEOUT_S: u32 = 3;
pub const ADDRESS_QUERY_INITIAL_RETRY_DELAY_S: u32 = 15;
pub const ADDRESS_QUERY_MAX_RETRY_DELAY_S: u32 = 480;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheState {
    Invalid,
    Discover,
    Retry,
    Valid,
}

#[derive(Clone, Copy, Debug)]
struct CacheEntry {
    eid: IpAddr,
    rloc16: u16,
    state: CacheState,
    timeout_s: u32,
    /// Current retry delay once in `Retry`, doubled on each further
    /// timeout up to `ADDRESS_QUERY_MAX_RETRY_DELAY_S` (spec §4.8).
    retry_delay_s: u32,
    last_transaction_time: u32,
    /// Tick counter used only to pick a least-recently-used victim on a
    /// miss with a full table.
    last_used: u32,
}

impl CacheEntry {
    fn invalid() -> Self {
        CacheEntry {
            eid: IpAddr::new(),
            rloc16: 0,
            state: CacheState::Invalid,
            timeout_s: 0,
            retry_delay_s: 0,
            last_transaction_time: 0,
            last_used: 0,
        }
    }
}

/// What the caller should do with a datagram addressed to `eid` (spec
/// §4.8 `Resolve`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResolveOutcome {
    Found(u16),
    /// Cache miss or still resolving; caller should park the datagram
    /// on the forwarder's resolving queue.
    Query,
}

pub struct AddressResolver<C: Config> {
    entries: [CacheEntry; 16],
    clock: u32,
    _marker: core::marker::PhantomData<C>,
}

impl<C: Config> AddressResolver<C> {
    pub fn new() -> Self {
        AddressResolver {
            entries: [CacheEntry::invalid(); 16],
            clock: 0,
            _marker: core::marker::PhantomData,
        }
    }

    fn capacity(&self) -> usize {
        C::ADDRESS_CACHE_SIZE.min(self.entries.len())
    }

    fn find_mut(&mut self, eid: &IpAddr) -> Option<&mut CacheEntry> {
        let cap = self.capacity();
        self.entries[..cap]
            .iter_mut()
            .find(|e| e.state != CacheState::Invalid && e.eid == *eid)
    }

    /// Spec §4.8 `Resolve(eid)`. On a miss, picks a victim (an invalid
    /// slot if any remain, else the least-recently-used occupied one),
    /// starts a Discover query, and returns `Query` — the caller is
    /// expected to also send the returned CoAP request and park the
    /// datagram.
    pub fn resolve(&mut self, eid: IpAddr) -> (ResolveOutcome, Option<CoapMessage>) {
        self.clock += 1;
        if let Some(entry) = self.find_mut(&eid) {
            entry.last_used = self.clock;
            return match entry.state {
                CacheState::Valid => (ResolveOutcome::Found(entry.rloc16), None),
                _ => (ResolveOutcome::Query, None),
            };
        }

        let cap = self.capacity();
        let victim = (0..cap)
            .find(|&i| self.entries[i].state == CacheState::Invalid)
            .or_else(|| {
                (0..cap).min_by_key(|&i| self.entries[i].last_used)
            });
        let Some(victim) = victim else {
            return (ResolveOutcome::Query, None);
        };
        self.entries[victim] = CacheEntry {
            eid,
            rloc16: 0,
            state: CacheState::Discover,
            timeout_s: ADDRESS_QUERY_TIMEOUT_S,
            retry_delay_s: 0,
            last_transaction_time: 0,
            last_used: self.clock,
        };
        let query = build_address_query(&eid);
        (ResolveOutcome::Query, query.ok())
    }

    /// 1-Hz tick: advances `Discover`/`Retry` timeouts, transitioning a
    /// timed-out `Discover` entry to `Retry` (spec §4.8 "Retry/backoff").
    /// Returns the EIDs whose retry just elapsed so the caller can
    /// re-send the query.
    pub fn tick(&mut self) -> [Option<IpAddr>; 16] {
        let mut due = [None; 16];
        let cap = self.capacity();
        for (i, entry) in self.entries[..cap].iter_mut().enumerate() {
            match entry.state {
                CacheState::Discover | CacheState::Retry => {
                    if entry.timeout_s > 0 {
                        entry.timeout_s -= 1;
                    }
                    if entry.timeout_s == 0 {
                        let next_delay = if entry.state == CacheState::Discover {
                            ADDRESS_QUERY_INITIAL_RETRY_DELAY_S
                        } else {
                            (entry.retry_delay_s * 2).min(ADDRESS_QUERY_MAX_RETRY_DELAY_S)
                        };
                        entry.state = CacheState::Retry;
                        entry.retry_delay_s = next_delay;
                        entry.timeout_s = next_delay;
                        due[i] = Some(entry.eid);
                    }
                }
                _ => {}
            }
        }
        due
    }

    /// Spec §4.8 `HandleAddressNotification` (CoAP `/a/an`): updates the
    /// cache entry to `Valid` and returns the Changed ack the caller
    /// should send.
    pub fn handle_address_notification(&mut self, eid: IpAddr, rloc16: u16, last_transaction_time: u32, message_id: u16) -> Option<CoapMessage> {
        let cap = self.capacity();
        let slot = self.entries[..cap].iter_mut().find(|e| e.eid == eid && e.state != CacheState::Invalid).or_else(|| {
            self.entries[..cap].iter_mut().find(|e| e.state == CacheState::Invalid)
        })?;
        slot.eid = eid;
        slot.rloc16 = rloc16;
        slot.state = CacheState::Valid;
        slot.last_transaction_time = last_transaction_time;
        CoapMessage::request(CoapType::Acknowledgement, CoapCode::Changed, message_id, "", &[]).ok()
    }

    /// Spec §4.8 `HandleAddressError` (CoAP `/a/ae`): the losing node
    /// (this one, if `our_rloc16` doesn't match the claimant) must
    /// invalidate its cache entry for `eid`.
    pub fn handle_address_error(&mut self, eid: &IpAddr) {
        if let Some(entry) = self.find_mut(eid) {
            *entry = CacheEntry::invalid();
        }
    }

    /// SPEC_FULL supplemented feature: releases the cache entry for
    /// `eid`, called when a Border Router prefix withdraws and the
    /// address it resolved to is no longer meaningful (`/a/ar`).
    pub fn release(&mut self, eid: &IpAddr) {
        if let Some(entry) = self.find_mut(eid) {
            *entry = CacheEntry::invalid();
        }
    }
}

impl<C: Config> Default for AddressResolver<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn build_address_query(eid: &IpAddr) -> Result<CoapMessage, ThreadError> {
    CoapMessage::request(CoapType::NonConfirmable, CoapCode::Post, 0, "a/aq", &eid.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;

    fn eid(tag: u8) -> IpAddr {
        let mut a = IpAddr::new();
        a.0[15] = tag;
        a
    }

    #[test]
    fn miss_starts_discover_and_returns_query() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        let (outcome, query) = resolver.resolve(eid(1));
        assert_eq!(outcome, ResolveOutcome::Query);
        assert!(query.unwrap().uri_is("a/aq"));
    }

    #[test]
    fn notification_installs_valid_entry_found_on_resolve() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        resolver.resolve(eid(1));
        resolver.handle_address_notification(eid(1), 0x0400, 0, 1);
        let (outcome, _) = resolver.resolve(eid(1));
        assert_eq!(outcome, ResolveOutcome::Found(0x0400));
    }

    #[test]
    fn address_error_invalidates_entry() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        resolver.resolve(eid(1));
        resolver.handle_address_notification(eid(1), 0x0400, 0, 1);
        resolver.handle_address_error(&eid(1));
        let (outcome, query) = resolver.resolve(eid(1));
        assert_eq!(outcome, ResolveOutcome::Query);
        assert!(query.is_some());
    }

    #[test]
    fn release_clears_a_valid_entry() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        resolver.resolve(eid(1));
        resolver.handle_address_notification(eid(1), 0x0400, 0, 1);
        resolver.release(&eid(1));
        let (outcome, _) = resolver.resolve(eid(1));
        assert_eq!(outcome, ResolveOutcome::Query);
    }

    #[test]
    fn discover_timeout_transitions_to_retry() {
        let mut resolver: AddressResolver<DefaultConfig> = AddressResolver::new();
        resolver.resolve(eid(1));
        let mut fired = false;
        for _ in 0..=ADDRESS_QUERY_TIMEOUT_S {
            if resolver.tick().iter().flatten().any(|e| *e == eid(1)) {
                fired = true;
            }
        }
        assert!(fired);
    }
}
