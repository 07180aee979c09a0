// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `MessageArena` and `MessageQueue`: an intrusive doubly-linked list where
//! a message can sit on up to two queues at once.
//!
//! Spec §3: "MessageQueue: intrusive doubly-linked list. A message may be
//! on at most two queues simultaneously (one global, one interface-local)
//! via two independent link sets." `Slot` below carries exactly two `Link`
//! records; a `MessageQueue` is configured with which of the two it
//! threads through, so the "global" and "interface-local" queues a message
//! belongs to never contend over the same prev/next fields (spec I2).

use super::message::Message;
use crate::error::{Result, ThreadError};

/// Index into a `MessageArena`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MessageIndex(pub u16);

/// Which of a message's two link sets a `MessageQueue` threads through.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkSet {
    Global = 0,
    Local = 1,
}

#[derive(Clone, Copy, Default)]
struct Link {
    prev: Option<MessageIndex>,
    next: Option<MessageIndex>,
}

struct Slot {
    message: Message,
    links: [Link; 2],
    /// Tracks which link sets currently place this message on a queue, so
    /// `Free` can assert "message is on no queue" (spec §4.1).
    on_queue: [bool; 2],
}

/// Fixed-capacity arena owning every live `Message`. Messages are created
/// here and referenced elsewhere purely by `MessageIndex`.
pub struct MessageArena<const N: usize> {
    slots: [Option<Slot>; N],
    free: [u16; N],
    free_top: usize,
}

impl<const N: usize> MessageArena<N> {
    pub fn new() -> Self {
        let mut free = [0u16; N];
        for i in 0..N {
            free[i] = (N - 1 - i) as u16;
        }
        MessageArena {
            slots: core::array::from_fn(|_| None),
            free,
            free_top: N,
        }
    }

    pub fn insert(&mut self, message: Message) -> Result<MessageIndex> {
        if self.free_top == 0 {
            return Err(ThreadError::NoBufs);
        }
        self.free_top -= 1;
        let idx = self.free[self.free_top];
        self.slots[idx as usize] = Some(Slot {
            message,
            links: [Link::default(); 2],
            on_queue: [false; 2],
        });
        Ok(MessageIndex(idx))
    }

    /// Removes and returns the message. Asserts it is on no queue, per
    /// `Free`'s contract.
    pub fn take(&mut self, idx: MessageIndex) -> Result<Message> {
        let slot = self.slots[idx.0 as usize]
            .take()
            .ok_or(ThreadError::InvalidArgs)?;
        if slot.on_queue[0] || slot.on_queue[1] {
            // Put it back: freeing a queued message is a programming error,
            // not a recoverable one (spec §7: "fatal... assertion failure").
            self.slots[idx.0 as usize] = Some(slot);
            return Err(ThreadError::InvalidState);
        }
        self.free_top += 1;
        self.free[self.free_top - 1] = idx.0;
        Ok(slot.message)
    }

    pub fn get(&self, idx: MessageIndex) -> &Message {
        &self.slots[idx.0 as usize].as_ref().expect("live index").message
    }

    pub fn get_mut(&mut self, idx: MessageIndex) -> &mut Message {
        &mut self.slots[idx.0 as usize].as_mut().expect("live index").message
    }

    fn link(&self, idx: MessageIndex, set: LinkSet) -> Link {
        self.slots[idx.0 as usize].as_ref().expect("live index").links[set as usize]
    }

    fn set_link(&mut self, idx: MessageIndex, set: LinkSet, link: Link) {
        self.slots[idx.0 as usize].as_mut().expect("live index").links[set as usize] = link;
    }

    fn set_on_queue(&mut self, idx: MessageIndex, set: LinkSet, on: bool) {
        self.slots[idx.0 as usize].as_mut().expect("live index").on_queue[set as usize] = on;
    }

    fn is_on_queue(&self, idx: MessageIndex, set: LinkSet) -> bool {
        self.slots[idx.0 as usize].as_ref().expect("live index").on_queue[set as usize]
    }
}

impl<const N: usize> Default for MessageArena<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// One intrusive queue, threaded through a chosen link set of every message
/// it holds.
pub struct MessageQueue {
    set: LinkSet,
    head: Option<MessageIndex>,
    tail: Option<MessageIndex>,
    len: usize,
}

impl MessageQueue {
    pub const fn new(set: LinkSet) -> Self {
        MessageQueue {
            set,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push_back<const N: usize>(&mut self, arena: &mut MessageArena<N>, idx: MessageIndex) {
        debug_assert!(!arena.is_on_queue(idx, self.set), "double-insertion onto MessageQueue");
        let link = Link {
            prev: self.tail,
            next: None,
        };
        arena.set_link(idx, self.set, link);
        match self.tail {
            Some(t) => {
                let mut tlink = arena.link(t, self.set);
                tlink.next = Some(idx);
                arena.set_link(t, self.set, tlink);
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        arena.set_on_queue(idx, self.set, true);
        self.len += 1;
    }

    pub fn pop_front<const N: usize>(&mut self, arena: &mut MessageArena<N>) -> Option<MessageIndex> {
        let idx = self.head?;
        self.remove(arena, idx);
        Some(idx)
    }

    /// Removes `idx` from this queue (not necessarily the head). No-op if
    /// `idx` is not currently a member.
    pub fn remove<const N: usize>(&mut self, arena: &mut MessageArena<N>, idx: MessageIndex) {
        if !arena.is_on_queue(idx, self.set) {
            return;
        }
        let link = arena.link(idx, self.set);
        match link.prev {
            Some(p) => {
                let mut plink = arena.link(p, self.set);
                plink.next = link.next;
                arena.set_link(p, self.set, plink);
            }
            None => self.head = link.next,
        }
        match link.next {
            Some(n) => {
                let mut nlink = arena.link(n, self.set);
                nlink.prev = link.prev;
                arena.set_link(n, self.set, nlink);
            }
            None => self.tail = link.prev,
        }
        arena.set_on_queue(idx, self.set, false);
        self.len -= 1;
    }

    /// Walk from head, for invariant checks (I2) and tests.
    pub fn iter<'a, const N: usize>(&self, arena: &'a MessageArena<N>) -> QueueIter<'a, N> {
        QueueIter {
            arena,
            set: self.set,
            cur: self.head,
        }
    }
}

pub struct QueueIter<'a, const N: usize> {
    arena: &'a MessageArena<N>,
    set: LinkSet,
    cur: Option<MessageIndex>,
}

impl<'a, const N: usize> Iterator for QueueIter<'a, N> {
    type Item = MessageIndex;

    fn next(&mut self) -> Option<MessageIndex> {
        let idx = self.cur?;
        self.cur = self.arena.link(idx, self.set).next;
        Some(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buf::buffer::BufferPool;
    use crate::buf::message::MessageType;

    #[test]
    fn push_pop_fifo_order() {
        let mut pool: BufferPool<8, 8> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut q = MessageQueue::new(LinkSet::Global);

        let m1 = Message::new(&mut pool, MessageType::Misc, 0).unwrap();
        let m2 = Message::new(&mut pool, MessageType::Misc, 0).unwrap();
        let i1 = arena.insert(m1).unwrap();
        let i2 = arena.insert(m2).unwrap();

        q.push_back(&mut arena, i1);
        q.push_back(&mut arena, i2);
        assert_eq!(q.len(), 2);
        assert_eq!(q.pop_front(&mut arena), Some(i1));
        assert_eq!(q.pop_front(&mut arena), Some(i2));
        assert_eq!(q.pop_front(&mut arena), None);
    }

    #[test]
    fn message_lives_on_two_queues_at_once() {
        let mut pool: BufferPool<8, 8> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut global = MessageQueue::new(LinkSet::Global);
        let mut local = MessageQueue::new(LinkSet::Local);

        let m = Message::new(&mut pool, MessageType::Misc, 0).unwrap();
        let idx = arena.insert(m).unwrap();
        global.push_back(&mut arena, idx);
        local.push_back(&mut arena, idx);

        assert_eq!(global.iter(&arena).count(), 1);
        assert_eq!(local.iter(&arena).count(), 1);

        local.remove(&mut arena, idx);
        assert_eq!(global.iter(&arena).count(), 1);
        assert_eq!(local.iter(&arena).count(), 0);

        global.remove(&mut arena, idx);
        let freed = arena.take(idx).unwrap();
        freed.free(&mut pool);
    }

    #[test]
    fn free_while_queued_is_rejected() {
        let mut pool: BufferPool<8, 8> = BufferPool::new();
        let mut arena: MessageArena<8> = MessageArena::new();
        let mut q = MessageQueue::new(LinkSet::Global);
        let m = Message::new(&mut pool, MessageType::Misc, 0).unwrap();
        let idx = arena.insert(m).unwrap();
        q.push_back(&mut arena, idx);
        assert_eq!(arena.take(idx), Err(ThreadError::InvalidState));
    }
}
