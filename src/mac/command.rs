// SPDX-License-Identifier: Apache-2.0 OR MIT

//! MAC command frames. Only Data-Request (802.15.4 command id `0x04`) is
//! modeled — the poll a sleepy child sends its parent to collect whatever
//! is queued for it indirectly (spec §4.4 Data-Request handling).
//!
//! Grounded on `mac/frame.rs`'s header encode/decode shape, applied to the
//! one-byte command-id payload that follows a `FrameType::Command` header.

use crate::error::ThreadError;
use crate::mac::stream::{decode_u8, encode_u8, SResult};

const COMMAND_ID_DATA_REQUEST: u8 = 0x04;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Command {
    DataRequest,
}

impl Command {
    pub fn encode(&self, buf: &mut [u8], offset: usize) -> SResult<usize> {
        let id = match self {
            Command::DataRequest => COMMAND_ID_DATA_REQUEST,
        };
        match encode_u8(buf, offset, id) {
            SResult::Done(off, _) => SResult::Done(off, off),
            SResult::Error(e) => SResult::Error(e),
        }
    }

    pub fn decode(buf: &[u8], offset: usize) -> Result<Command, ThreadError> {
        let id = match decode_u8(buf, offset) {
            SResult::Done(_, v) => v,
            SResult::Error(e) => return Err(e),
        };
        match id {
            COMMAND_ID_DATA_REQUEST => Ok(Command::DataRequest),
            _ => Err(ThreadError::Parse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_request_round_trips() {
        let mut buf = [0u8; 1];
        match Command::DataRequest.encode(&mut buf, 0) {
            SResult::Done(..) => {}
            SResult::Error(_) => panic!("encode failed"),
        }
        assert_eq!(Command::decode(&buf, 0).unwrap(), Command::DataRequest);
    }

    #[test]
    fn unknown_command_id_is_rejected() {
        let buf = [0xffu8];
        assert!(Command::decode(&buf, 0).is_err());
    }
}
