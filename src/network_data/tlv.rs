// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Network Data TLVs: a Prefix TLV container carrying Has-Route,
//! Border-Router, and Context sub-TLVs (spec §4.7, §6 "Network Data TLVs
//! (on-wire, big-endian): 1-byte type|stableBit, 1-byte length").
//!
//! Grounded on `sixlowpan/context.rs`'s `Context` type (reused directly
//! for the Context sub-TLV's id/compress fields) and the same
//! type-length-value shape `mle/tlv.rs` already established for MLE's
//! own TLVs.

use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;
use crate::mac::stream::{encode_u16, encode_u8, SResult};
use crate::{enc_consume, stream_done};

/// Preference value Has-Route/Border-Router sub-TLVs carry (spec §4.7
/// RouteLookup: "prefer higher preference (+1, 0, -1)").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Preference {
    High,
    Medium,
    Low,
}

impl Preference {
    pub(crate) fn to_i8(self) -> i8 {
        match self {
            Preference::High => 1,
            Preference::Medium => 0,
            Preference::Low => -1,
        }
    }

    fn from_i8(v: i8) -> Self {
        if v > 0 {
            Preference::High
        } else if v < 0 {
            Preference::Low
        } else {
            Preference::Medium
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HasRoute {
    pub rloc16: u16,
    pub preference: Preference,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BorderRouter {
    pub rloc16: u16,
    pub preference: Preference,
    pub preferred: bool,
    pub valid: bool,
    pub dhcp: bool,
    pub configure: bool,
    pub default_route: bool,
}

impl BorderRouter {
    fn flags(&self) -> u8 {
        (self.preferred as u8)
            | (self.valid as u8) << 1
            | (self.dhcp as u8) << 2
            | (self.configure as u8) << 3
            | (self.default_route as u8) << 4
    }

    fn from_flags(flags: u8) -> (bool, bool, bool, bool, bool) {
        (
            flags & 0x01 != 0,
            flags & 0x02 != 0,
            flags & 0x04 != 0,
            flags & 0x08 != 0,
            flags & 0x10 != 0,
        )
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ContextSubTlv {
    pub context_id: u8,
    pub compress: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubTlv {
    HasRoute(HasRoute),
    BorderRouter(BorderRouter),
    Context(ContextSubTlv),
}

const SUBTLV_HAS_ROUTE: u8 = 0;
const SUBTLV_BORDER_ROUTER: u8 = 1;
const SUBTLV_CONTEXT: u8 = 2;

impl SubTlv {
    fn encode(&self, buf: &mut [u8], offset: usize) -> SResult<usize> {
        let off = match self {
            SubTlv::HasRoute(hr) => {
                let off = enc_consume!(buf, offset; encode_u8, SUBTLV_HAS_ROUTE);
                let off = enc_consume!(buf, off; encode_u8, 3);
                let off = enc_consume!(buf, off; encode_u16, hr.rloc16);
                enc_consume!(buf, off; encode_u8, hr.preference.to_i8() as u8)
            }
            SubTlv::BorderRouter(br) => {
                let off = enc_consume!(buf, offset; encode_u8, SUBTLV_BORDER_ROUTER);
                let off = enc_consume!(buf, off; encode_u8, 4);
                let off = enc_consume!(buf, off; encode_u16, br.rloc16);
                let off = enc_consume!(buf, off; encode_u8, br.preference.to_i8() as u8);
                enc_consume!(buf, off; encode_u8, br.flags())
            }
            SubTlv::Context(ctx) => {
                let off = enc_consume!(buf, offset; encode_u8, SUBTLV_CONTEXT);
                let off = enc_consume!(buf, off; encode_u8, 2);
                let off = enc_consume!(buf, off; encode_u8, ctx.context_id);
                enc_consume!(buf, off; encode_u8, ctx.compress as u8)
            }
        };
        stream_done!(off, off)
    }

    fn decode(buf: &[u8], offset: usize) -> Result<(usize, SubTlv), ThreadError> {
        let ty = *buf.get(offset).ok_or(ThreadError::Parse)?;
        let len = *buf.get(offset + 1).ok_or(ThreadError::Parse)? as usize;
        let val = offset + 2;
        if val + len > buf.len() {
            return Err(ThreadError::Parse);
        }
        let tlv = match ty {
            SUBTLV_HAS_ROUTE if len >= 3 => SubTlv::HasRoute(HasRoute {
                rloc16: u16::from_be_bytes([buf[val], buf[val + 1]]),
                preference: Preference::from_i8(buf[val + 2] as i8),
            }),
            SUBTLV_BORDER_ROUTER if len >= 4 => {
                let (preferred, valid, dhcp, configure, default_route) = BorderRouter::from_flags(buf[val + 3]);
                SubTlv::BorderRouter(BorderRouter {
                    rloc16: u16::from_be_bytes([buf[val], buf[val + 1]]),
                    preference: Preference::from_i8(buf[val + 2] as i8),
                    preferred,
                    valid,
                    dhcp,
                    configure,
                    default_route,
                })
            }
            SUBTLV_CONTEXT if len >= 2 => SubTlv::Context(ContextSubTlv {
                context_id: buf[val],
                compress: buf[val + 1] != 0,
            }),
            _ => return Err(ThreadError::Parse),
        };
        Ok((val + len, tlv))
    }
}

const MAX_SUB_TLVS: usize = 4;

/// A Prefix TLV: prefix bytes plus up to `MAX_SUB_TLVS` sub-TLVs, and the
/// stable bit packed into the outer type byte on the wire (spec §6).
#[derive(Clone, Copy, Debug)]
pub struct PrefixTlv {
    pub prefix: IpAddr,
    pub prefix_len: u8,
    pub domain_id: u8,
    pub stable: bool,
    pub sub_tlvs: [Option<SubTlv>; MAX_SUB_TLVS],
}

const TYPE_PREFIX: u8 = 1;
const STABLE_BIT: u8 = 0x80;

impl PrefixTlv {
    pub fn new(prefix: IpAddr, prefix_len: u8, domain_id: u8, stable: bool) -> Self {
        PrefixTlv {
            prefix,
            prefix_len,
            domain_id,
            stable,
            sub_tlvs: [None; MAX_SUB_TLVS],
        }
    }

    pub fn add_sub_tlv(&mut self, tlv: SubTlv) -> bool {
        for slot in self.sub_tlvs.iter_mut() {
            if slot.is_none() {
                *slot = Some(tlv);
                return true;
            }
        }
        false
    }

    pub fn sub_tlvs(&self) -> impl Iterator<Item = &SubTlv> {
        self.sub_tlvs.iter().flatten()
    }

    pub fn encode(&self, buf: &mut [u8]) -> SResult<usize> {
        let prefix_bytes = ((self.prefix_len as usize) + 7) / 8;
        let mut body = [0u8; 18 + MAX_SUB_TLVS * 6];
        let mut off = 0;
        body[off] = self.domain_id;
        off += 1;
        body[off] = self.prefix_len;
        off += 1;
        body[off..off + prefix_bytes].copy_from_slice(&self.prefix.0[..prefix_bytes]);
        off += prefix_bytes;
        for tlv in self.sub_tlvs() {
            off = match tlv.encode(&mut body, off) {
                SResult::Done(o, _) => o,
                SResult::Error(e) => return SResult::Error(e),
            };
        }

        let type_byte = TYPE_PREFIX | if self.stable { STABLE_BIT } else { 0 };
        let out_off = enc_consume!(buf; encode_u8, type_byte);
        let out_off = enc_consume!(buf, out_off; encode_u8, off as u8);
        if out_off + off > buf.len() {
            return SResult::Error(ThreadError::NoBufs);
        }
        buf[out_off..out_off + off].copy_from_slice(&body[..off]);
        stream_done!(out_off + off, out_off + off)
    }

    pub fn decode(buf: &[u8]) -> Result<PrefixTlv, ThreadError> {
        let type_byte = *buf.first().ok_or(ThreadError::Parse)?;
        if type_byte & !STABLE_BIT != TYPE_PREFIX {
            return Err(ThreadError::Parse);
        }
        let stable = type_byte & STABLE_BIT != 0;
        let len = *buf.get(1).ok_or(ThreadError::Parse)? as usize;
        if 2 + len > buf.len() || len < 2 {
            return Err(ThreadError::Parse);
        }
        let body = &buf[2..2 + len];
        let domain_id = body[0];
        let prefix_len = body[1];
        let prefix_bytes = ((prefix_len as usize) + 7) / 8;
        if 2 + prefix_bytes > body.len() {
            return Err(ThreadError::Parse);
        }
        let mut prefix = IpAddr::new();
        prefix.0[..prefix_bytes].copy_from_slice(&body[2..2 + prefix_bytes]);

        let mut tlv = PrefixTlv::new(prefix, prefix_len, domain_id, stable);
        let mut off = 2 + prefix_bytes;
        while off < body.len() {
            let (new_off, sub) = SubTlv::decode(body, off)?;
            tlv.add_sub_tlv(sub);
            off = new_off;
        }
        Ok(tlv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_with_sub_tlvs_round_trips() {
        let mut prefix = IpAddr::new();
        prefix.set_prefix(&[0xfd, 0x00, 0x12, 0x34], 64);
        let mut tlv = PrefixTlv::new(prefix, 64, 0, true);
        tlv.add_sub_tlv(SubTlv::HasRoute(HasRoute {
            rloc16: 0x0400,
            preference: Preference::High,
        }));
        tlv.add_sub_tlv(SubTlv::BorderRouter(BorderRouter {
            rloc16: 0x0400,
            preference: Preference::Medium,
            preferred: true,
            valid: true,
            dhcp: false,
            configure: false,
            default_route: true,
        }));

        let mut buf = [0u8; 64];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        let decoded = PrefixTlv::decode(&buf[..len]).unwrap();
        assert_eq!(decoded.prefix, prefix);
        assert!(decoded.stable);
        assert_eq!(decoded.sub_tlvs().count(), 2);
        assert!(decoded
            .sub_tlvs()
            .any(|t| matches!(t, SubTlv::HasRoute(hr) if hr.rloc16 == 0x0400)));
        assert!(decoded
            .sub_tlvs()
            .any(|t| matches!(t, SubTlv::BorderRouter(br) if br.default_route)));
    }

    #[test]
    fn unstable_prefix_clears_stable_bit_on_wire() {
        let prefix = IpAddr::new();
        let tlv = PrefixTlv::new(prefix, 0, 0, false);
        let mut buf = [0u8; 16];
        let len = match tlv.encode(&mut buf) {
            SResult::Done(_, len) => len,
            SResult::Error(_) => panic!("encode failed"),
        };
        assert_eq!(buf[0] & STABLE_BIT, 0);
        let decoded = PrefixTlv::decode(&buf[..len]).unwrap();
        assert!(!decoded.stable);
    }
}
