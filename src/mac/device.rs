// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The `Mac` device contract upper layers (6LoWPAN/MeshForwarder) send
//! frames through: register a receiver, request a send, kick off a scan.
//!
//! Grounded on `ieee802154/device.rs`'s `MacDevice` trait shape
//! (`set_transmit_client`, `set_receive_client`, `prepare_data_frame`,
//! `transmit`) and `ieee802154/mac.rs`'s `Mac` trait (`set_receive_client`,
//! `config_set_pan`, `is_on`) — collapsed into one trait since this
//! crate's `Framer` (see `framer.rs`) plays both roles the teacher splits
//! across `Mac52154Component`'s virtual MAC + the capsule MAC.

use crate::error::ThreadError;
use crate::mac::frame::{Header, MacAddress, PanId};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MacState {
    Disabled,
    Idle,
    ActiveScan,
    TransmitBeacon,
    TransmitData,
}

pub trait RxClient {
    /// `header` is already parsed and, if security was enabled, already
    /// verified/decrypted; `payload` is what follows the MAC header.
    fn receive(&self, header: Header, payload: &[u8]);
}

pub trait TxClient {
    fn sent_frame(&self, header: Header, result: Result<(), ThreadError>);
}

/// A single beacon observed during an active scan (spec §4.2 "Active-scan
/// beacon content").
pub struct BeaconInfo {
    pub network_name: [u8; 16],
    pub extended_pan_id: [u8; 8],
    pub sender_ext_addr: [u8; 8],
    pub pan_id: PanId,
    pub channel: u8,
    pub rssi: i8,
}

pub trait ScanHandler {
    /// Called once per beacon received; called once more with `None` when
    /// the scan completes.
    fn beacon(&self, info: Option<BeaconInfo>);
}

pub trait Mac {
    fn state(&self) -> MacState;

    fn set_pan_id(&mut self, pan_id: PanId) -> Result<(), ThreadError>;
    fn set_short_address(&mut self, addr: u16) -> Result<(), ThreadError>;
    fn set_extended_address(&mut self, addr: [u8; 8]) -> Result<(), ThreadError>;

    /// Enqueues `payload` for transmission with the given header; the
    /// frame builder fills in the sequence number, applies security if
    /// the header requests it, and drives CSMA/CA. Completion is reported
    /// to the registered `TxClient`.
    fn send(&mut self, header: Header, payload: &[u8]) -> Result<(), ThreadError>;

    /// Addresses accepted on receive even when not addressed to us
    /// (e.g. broadcast short address 0xffff is always accepted
    /// regardless of this list).
    fn set_address_filter(&mut self, addrs: &[MacAddress]);
}
