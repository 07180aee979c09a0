// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The radio driver contract (spec §6): the only hardware dependency in
//! this crate. One implementation per platform lives outside this crate;
//! here there is only the trait and the state/result types the MAC layer
//! is written against.
//!
//! Grounded on `ieee802154/device.rs`'s `MacDevice`/radio-callback split
//! and `kernel::hil::radio::{Radio, TxClient, RxClient, ConfigClient}`
//! usage throughout `ieee802154/framer.rs` (the `kernel::hil::radio`
//! trait itself was not retrievable as source, only call sites) —
//! reconstructed to the narrower surface spec §6 actually names.

use crate::error::ThreadError;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RadioState {
    Disabled,
    Sleep,
    Idle,
    Listen,
    Receive,
    Transmit,
}

/// Outcome of an asynchronous receive, delivered via `RxClient::receive_done`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReceiveError {
    Abort,
    InvalidState,
}

/// Outcome of an asynchronous transmit, delivered via `TxClient::transmit_done`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransmitError {
    NoAck,
    CcaFailed,
    Abort,
    InvalidState,
}

impl From<TransmitError> for ThreadError {
    fn from(e: TransmitError) -> Self {
        match e {
            TransmitError::NoAck => ThreadError::NoAck,
            TransmitError::CcaFailed => ThreadError::CcaFailed,
            TransmitError::Abort => ThreadError::Abort,
            TransmitError::InvalidState => ThreadError::InvalidState,
        }
    }
}

/// A received PSDU plus the PHY metadata spec §6 says the packet carries.
pub struct ReceivedFrame<'a> {
    pub psdu: &'a [u8],
    pub channel: u8,
    pub rssi: i8,
}

pub trait RxClient {
    fn receive_done(&self, frame: Result<ReceivedFrame<'_>, ReceiveError>);
}

pub trait TxClient {
    /// `frame_pending` mirrors the FCF frame-pending bit the acking party
    /// set, used by the MAC to decide whether to immediately poll again.
    fn transmit_done(&self, result: Result<(), TransmitError>, frame_pending: bool);
}

pub trait ConfigClient {
    fn config_done(&self, result: Result<(), ThreadError>);
}

/// The narrow hardware contract: init/enable/disable/sleep/idle, async
/// receive/transmit, and PAN/address configuration. 2.4 GHz 802.15.4-2006,
/// channels 11-26, PSDU <= 127 B (spec §6).
pub trait Radio {
    fn init(&self) -> Result<(), ThreadError>;
    fn enable(&self) -> Result<(), ThreadError>;
    fn disable(&self) -> Result<(), ThreadError>;
    fn sleep(&self) -> Result<(), ThreadError>;
    fn idle(&self) -> Result<(), ThreadError>;

    fn state(&self) -> RadioState;

    /// Requests a receive; completion arrives later via the registered
    /// `RxClient`.
    fn receive(&self) -> Result<(), ThreadError>;

    /// Requests a transmit of `psdu` (header+payload, no FCS — the radio
    /// appends its own); completion arrives later via the registered
    /// `TxClient`.
    fn transmit(&self, psdu: &[u8]) -> Result<(), ThreadError>;

    fn set_pan_id(&self, pan_id: u16) -> Result<(), ThreadError>;
    fn set_short_address(&self, addr: u16) -> Result<(), ThreadError>;
    fn set_extended_address(&self, addr: [u8; 8]) -> Result<(), ThreadError>;
    fn set_channel(&self, channel: u8) -> Result<(), ThreadError>;

    fn noise_floor(&self) -> i8;
}
