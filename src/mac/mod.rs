// SPDX-License-Identifier: Apache-2.0 OR MIT

//! IEEE 802.15.4 link layer: frame format, CSMA/CA, the `Mac` device
//! trait, the security-aware framer, and active scan (spec §4.2).

pub mod command;
pub mod csma;
pub mod device;
pub mod frame;
pub mod framer;
pub mod scan;
pub mod stream;

pub use command::Command;
pub use device::{BeaconInfo, Mac, MacState, RxClient, ScanHandler, TxClient};
pub use frame::{
    AddressMode, FrameType, FrameVersion, Header, KeyId, MacAddress, PanId, Security,
    SecurityLevel, MAX_PSDU_LEN,
};
pub use framer::Framer;
