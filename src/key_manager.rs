// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `KeyManager`: the Thread network master key, key sequence, and the two
//! frame counters MAC and MLE security draw from (spec §3's KeyManager
//! state, §4.6 "Key sequence rollover", invariant I4).
//!
//! Grounded on spec §3's field list directly (no Tock analogue — Tock's
//! 802.15.4 capsules take a single static link key from userspace and have
//! no key-sequence concept at all) and `crypto.rs`'s `Sha256` contract,
//! which this module is the first real consumer of.

use crate::crypto::{Sha256, SHA256_DIGEST_LEN};

/// A derived 32-byte key: first 16 bytes for MLE message security, next 16
/// for MAC frame security (spec §3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DerivedKey(pub [u8; 32]);

impl DerivedKey {
    pub fn mle_key(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.0[0..16]);
        out
    }

    pub fn mac_key(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out.copy_from_slice(&self.0[16..32]);
        out
    }
}

/// Master key, current/previous derived keys, key sequence, and the two
/// strictly-monotonic frame counters (spec §5: "mutated only by the MAC
/// send path and the MLE send path, one strictly-monotonic counter each").
pub struct KeyManager {
    master_key: [u8; 16],
    key_sequence: u32,
    current_key: DerivedKey,
    /// Valid for exactly one sequence step behind `key_sequence`, per spec
    /// §3 ("optional previous key valid for one sequence step").
    previous_key: Option<DerivedKey>,
    mac_frame_counter: u32,
    mle_frame_counter: u32,
}

impl KeyManager {
    pub fn new(sha256: &dyn Sha256, master_key: [u8; 16]) -> Self {
        let current_key = derive(sha256, &master_key, 0);
        KeyManager {
            master_key,
            key_sequence: 0,
            current_key,
            previous_key: None,
            mac_frame_counter: 0,
            mle_frame_counter: 0,
        }
    }

    pub fn key_sequence(&self) -> u32 {
        self.key_sequence
    }

    pub fn current_key(&self) -> DerivedKey {
        self.current_key
    }

    pub fn previous_key(&self) -> Option<DerivedKey> {
        self.previous_key
    }

    pub fn mac_frame_counter(&self) -> u32 {
        self.mac_frame_counter
    }

    pub fn mle_frame_counter(&self) -> u32 {
        self.mle_frame_counter
    }

    /// Strictly-monotonic per-send increment (I4): returns the counter
    /// value to stamp on the outgoing frame, then advances it.
    pub fn next_mac_frame_counter(&mut self) -> u32 {
        let v = self.mac_frame_counter;
        self.mac_frame_counter = self.mac_frame_counter.wrapping_add(1);
        v
    }

    pub fn next_mle_frame_counter(&mut self) -> u32 {
        let v = self.mle_frame_counter;
        self.mle_frame_counter = self.mle_frame_counter.wrapping_add(1);
        v
    }

    /// True if `seq` is usable to validate an inbound frame: either the
    /// current sequence, or the retained previous one.
    pub fn accepts_key_sequence(&self, seq: u32) -> bool {
        seq == self.key_sequence || (seq + 1 == self.key_sequence && self.previous_key.is_some())
    }

    pub fn key_for_sequence(&self, seq: u32) -> Option<DerivedKey> {
        if seq == self.key_sequence {
            Some(self.current_key)
        } else if seq + 1 == self.key_sequence {
            self.previous_key
        } else {
            None
        }
    }

    /// Rolls the key sequence forward to `new_seq` (spec §4.6 "Key sequence
    /// rollover"). When `new_seq` is exactly one past the current sequence
    /// the outgoing current key is retained as the previous key so frames
    /// already in flight under it still verify; a larger jump drops the
    /// previous key entirely, since it would no longer be "one step back".
    /// Resets both frame counters to 0 and returns whether a rollover
    /// actually happened (S6).
    pub fn set_current_key_sequence(&mut self, sha256: &dyn Sha256, new_seq: u32) -> bool {
        if new_seq == self.key_sequence {
            return false;
        }
        self.previous_key = if new_seq == self.key_sequence.wrapping_add(1) {
            Some(self.current_key)
        } else {
            None
        };
        self.key_sequence = new_seq;
        self.current_key = derive(sha256, &self.master_key, new_seq);
        self.mac_frame_counter = 0;
        self.mle_frame_counter = 0;
        true
    }
}

/// `current_key = SHA256(master_key || key_sequence_be)`; the spec names
/// the two 16-byte halves but not a derivation algorithm, so this uses the
/// crate's only available primitive (`Sha256`) the way the MLE/MAC keys
/// need it: one digest call giving exactly the 32 bytes both halves need.
fn derive(sha256: &dyn Sha256, master_key: &[u8; 16], key_sequence: u32) -> DerivedKey {
    let mut input = [0u8; 20];
    input[..16].copy_from_slice(master_key);
    input[16..20].copy_from_slice(&key_sequence.to_be_bytes());
    let mut digest = [0u8; SHA256_DIGEST_LEN];
    sha256.digest(&input, &mut digest);
    DerivedKey(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSha256;
    impl Sha256 for StubSha256 {
        fn digest(&self, input: &[u8], out: &mut [u8; SHA256_DIGEST_LEN]) {
            // Deterministic stand-in: repeats the input bytes, XORed with
            // their position, enough to make distinct inputs produce
            // distinct digests without a real SHA-256 implementation.
            for (i, b) in out.iter_mut().enumerate() {
                *b = input.get(i % input.len().max(1)).copied().unwrap_or(0) ^ (i as u8);
            }
        }
    }

    #[test]
    fn rollover_to_next_sequence_retains_previous_key() {
        let sha = StubSha256;
        let mut km = KeyManager::new(&sha, [0x0f; 16]);
        assert_eq!(km.key_sequence(), 0);
        let old_current = km.current_key();
        km.next_mac_frame_counter();
        km.next_mle_frame_counter();

        let rolled = km.set_current_key_sequence(&sha, 1);
        assert!(rolled);
        assert_eq!(km.key_sequence(), 1);
        assert_eq!(km.previous_key(), Some(old_current));
        assert_eq!(km.mac_frame_counter(), 0);
        assert_eq!(km.mle_frame_counter(), 0);
        assert_ne!(km.current_key().0, old_current.0);
    }

    #[test]
    fn large_jump_drops_previous_key() {
        let sha = StubSha256;
        let mut km = KeyManager::new(&sha, [1; 16]);
        km.set_current_key_sequence(&sha, 7);
        assert!(km.previous_key().is_none());
        assert!(!km.accepts_key_sequence(6));
        assert!(km.accepts_key_sequence(7));
    }

    #[test]
    fn accepts_current_and_one_step_back() {
        let sha = StubSha256;
        let mut km = KeyManager::new(&sha, [2; 16]);
        km.set_current_key_sequence(&sha, 1);
        assert!(km.accepts_key_sequence(1));
        assert!(km.accepts_key_sequence(0));
        assert!(!km.accepts_key_sequence(99));
    }
}
