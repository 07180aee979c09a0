// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The MLE message header: security suite, security control, frame
//! counter, key identifier, and command type (spec §6 "MLE over UDP port
//! 19788", law L3).
//!
//! Grounded on `mac/frame.rs`'s `Header::encode`/`decode` shape (an
//! `SResult`-returning pair of free functions operating on a plain byte
//! slice) applied to the MLE wire format instead of the 802.15.4 one.

use crate::mac::stream::{decode_u32, decode_u8, encode_u32, encode_u8, SResult};
use crate::{enc_consume, stream_done};

/// Security suite byte: `0xff` means "no security" (used only for Parent
/// Request/Response during discovery before a key is shared); any other
/// value is AES-CCM, per spec §6.
pub const SECURITY_SUITE_NONE: u8 = 0xff;
pub const SECURITY_SUITE_CCM: u8 = 0x00;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MleHeader {
    pub security_suite: u8,
    pub key_id: u32,
    pub frame_counter: u32,
    pub command: u8,
}

impl MleHeader {
    /// `security_suite(1) + [frame_counter(4) + key_id(4)] + command(1)`.
    /// The key-identifier mode used here is the 4-byte "key sequence"
    /// form (spec §3's KeyManager.keySequence); the 1-byte and 5-byte MAC
    /// key-id modes defined for 802.15.4 frames don't apply at this layer.
    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        let off = enc_consume!(buf; encode_u8, self.security_suite);
        let off = if self.security_suite == SECURITY_SUITE_NONE {
            off
        } else {
            let off = enc_consume!(buf, off; encode_u32, self.frame_counter);
            enc_consume!(buf, off; encode_u32, self.key_id)
        };
        let off = enc_consume!(buf, off; encode_u8, self.command);
        stream_done!(off, off)
    }

    pub fn decode(buf: &[u8]) -> SResult<MleHeader> {
        let (off, security_suite) = match decode_u8(buf, 0) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        let (off, frame_counter, key_id) = if security_suite == SECURITY_SUITE_NONE {
            (off, 0, 0)
        } else {
            let (off, frame_counter) = match decode_u32(buf, off) {
                SResult::Done(o, v) => (o, v),
                SResult::Error(e) => return SResult::Error(e),
            };
            let (off, key_id) = match decode_u32(buf, off) {
                SResult::Done(o, v) => (o, v),
                SResult::Error(e) => return SResult::Error(e),
            };
            (off, frame_counter, key_id)
        };
        let (off, command) = match decode_u8(buf, off) {
            SResult::Done(o, v) => (o, v),
            SResult::Error(e) => return SResult::Error(e),
        };
        stream_done!(
            off,
            MleHeader {
                security_suite,
                key_id,
                frame_counter,
                command,
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secured_header_round_trips() {
        let hdr = MleHeader {
            security_suite: SECURITY_SUITE_CCM,
            key_id: 7,
            frame_counter: 42,
            command: 0x01,
        };
        let mut buf = [0u8; 16];
        let len = match hdr.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        match MleHeader::decode(&buf[..len]) {
            SResult::Done(_, decoded) => assert_eq!(decoded, hdr),
            SResult::Error(_) => panic!("decode failed"),
        }
    }

    #[test]
    fn unsecured_header_omits_counter_and_key_id() {
        let hdr = MleHeader {
            security_suite: SECURITY_SUITE_NONE,
            key_id: 0,
            frame_counter: 0,
            command: 0x09,
        };
        let mut buf = [0u8; 16];
        let len = match hdr.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        assert_eq!(len, 2);
        match MleHeader::decode(&buf[..len]) {
            SResult::Done(_, decoded) => assert_eq!(decoded, hdr),
            SResult::Error(_) => panic!("decode failed"),
        }
    }
}
