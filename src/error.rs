// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The error taxonomy shared by every layer of the stack.
//!
//! A single enum, propagated with `?`, in place of a per-layer error type.
//! `Parse`/`Drop` mean a local, silent failure; `NoRoute`/`AddressQuery`
//! mean the datagram cannot proceed and the caller must surface it (an
//! ICMPv6 error, or parking in the resolving queue).

use core::fmt;

/// Crate-wide error type.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ThreadError {
    /// Malformed input; local drop, no reply.
    Parse,
    /// Caller precondition violated.
    InvalidArgs,
    /// Called in the wrong lifecycle state.
    InvalidState,
    /// Buffer pool exhausted.
    NoBufs,
    /// No route, or no neighbor, for the destination.
    NoRoute,
    /// Link-layer transmission gave up after retries.
    NoAck,
    /// The medium never went idle.
    CcaFailed,
    /// An asynchronous operation was aborted.
    Abort,
    /// A mutually-exclusive resource is already in use.
    Busy,
    /// Inbound packet deliberately dropped (duplicate, MPL replay, bad version).
    Drop,
    /// EID mapping is unknown; caller must park the datagram.
    AddressQuery,
    /// MIC check failed, or the key sequence is out of window.
    Security,
}

impl fmt::Display for ThreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreadError::Parse => "parse error",
            ThreadError::InvalidArgs => "invalid arguments",
            ThreadError::InvalidState => "invalid state",
            ThreadError::NoBufs => "buffer pool exhausted",
            ThreadError::NoRoute => "no route to destination",
            ThreadError::NoAck => "no acknowledgement",
            ThreadError::CcaFailed => "clear channel assessment failed",
            ThreadError::Abort => "operation aborted",
            ThreadError::Busy => "resource busy",
            ThreadError::Drop => "packet dropped",
            ThreadError::AddressQuery => "address resolution pending",
            ThreadError::Security => "security check failed",
        };
        f.write_str(s)
    }
}

/// Crate-wide result alias.
pub type Result<T> = core::result::Result<T, ThreadError>;
