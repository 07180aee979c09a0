// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host tether transport: HDLC-like framing over the serial link (spec §6).

pub mod hdlc;

pub use hdlc::{decode, encode, DecodedFrame, ProtocolTag, ESCAPE, FLAG};
