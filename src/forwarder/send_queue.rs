// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The mesh forwarder's send queue: direct transmissions plus, via each
//! message's `child_mask` bits, the implicit per-child indirect queues
//! (spec §4.4: "per-child indirect queues (implicit via per-message
//! `childMask` bits)").

use crate::buf::queue::{LinkSet, MessageArena, MessageIndex, MessageQueue};
use crate::buf::message::MessageInfo;

pub struct SendQueue {
    queue: MessageQueue,
}

impl SendQueue {
    pub fn new() -> Self {
        SendQueue {
            queue: MessageQueue::new(LinkSet::Local),
        }
    }

    pub fn enqueue<const N: usize>(&mut self, arena: &mut MessageArena<N>, idx: MessageIndex) {
        self.queue.push_back(arena, idx);
    }

    pub fn remove<const N: usize>(&mut self, arena: &mut MessageArena<N>, idx: MessageIndex) {
        self.queue.remove(arena, idx);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// `GetDirectTransmission`: the first queued message still marked
    /// `direct_tx`.
    pub fn next_direct<const N: usize>(&self, arena: &MessageArena<N>) -> Option<MessageIndex> {
        self.queue.iter(arena).find(|&idx| arena.get(idx).info.direct_tx)
    }

    /// `GetIndirectTransmission`: the first queued message with `child`'s
    /// bit set in `child_mask` (a data-poll arrived from that child).
    pub fn next_indirect_for_child<const N: usize>(
        &self,
        arena: &MessageArena<N>,
        child: u8,
    ) -> Option<MessageIndex> {
        if child >= 8 {
            return None;
        }
        let bit = 1u8 << child;
        self.queue
            .iter(arena)
            .find(|&idx| arena.get(idx).info.child_mask & bit != 0)
    }

    pub fn clear_child_bit<const N: usize>(&self, arena: &mut MessageArena<N>, idx: MessageIndex, child: u8) {
        if child >= 8 {
            return;
        }
        arena.get_mut(idx).info.child_mask &= !(1u8 << child);
    }

    pub fn info<const N: usize>(&self, arena: &MessageArena<N>, idx: MessageIndex) -> MessageInfo {
        arena.get(idx).info
    }

    /// True once a message has no direct transmission pending and no
    /// child still has it queued indirectly — it's safe to free.
    pub fn is_fully_delivered<const N: usize>(&self, arena: &MessageArena<N>, idx: MessageIndex) -> bool {
        let info = arena.get(idx).info;
        !info.direct_tx && info.child_mask == 0
    }
}

impl Default for SendQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::buffer::BufferPool;
    use crate::buf::message::{Message, MessageType};

    #[test]
    fn direct_transmission_is_found_before_indirect_only_messages() {
        let mut pool: BufferPool<8, 32> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut sq = SendQueue::new();

        let mut indirect_only = Message::new(&mut pool, MessageType::Ip6, 0).unwrap();
        indirect_only.info.child_mask = 0b1;
        let idx1 = arena.insert(indirect_only).unwrap();
        sq.enqueue(&mut arena, idx1);

        let mut direct = Message::new(&mut pool, MessageType::Ip6, 0).unwrap();
        direct.info.direct_tx = true;
        let idx2 = arena.insert(direct).unwrap();
        sq.enqueue(&mut arena, idx2);

        assert_eq!(sq.next_direct(&arena), Some(idx2));
        assert_eq!(sq.next_indirect_for_child(&arena, 0), Some(idx1));
    }

    #[test]
    fn clearing_child_bit_marks_message_deliverable() {
        let mut pool: BufferPool<8, 32> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let sq = SendQueue::new();

        let mut msg = Message::new(&mut pool, MessageType::Ip6, 0).unwrap();
        msg.info.child_mask = 0b1;
        let idx = arena.insert(msg).unwrap();

        assert!(!sq.is_fully_delivered(&arena, idx));
        sq.clear_child_bit(&mut arena, idx, 0);
        assert!(sq.is_fully_delivered(&arena, idx));
    }
}
