// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The packet buffer pool and message queues (spec §4.1): the only
//! allocator in the stack, and the intrusive queues built on top of it.

pub mod buffer;
pub mod message;
pub mod queue;

pub use buffer::{Buffer, BufferIndex, BufferPool};
pub use message::{Message, MessageInfo, MessageType};
pub use queue::{LinkSet, MessageArena, MessageIndex, MessageQueue};
