use std::collections::VecDeque;

use crate::Seconds;

/// A time-stamped event. `time` is absolute on the owning producer's clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event<K> {
    pub time: Seconds,
    pub kind: K,
}

/// Bounded FIFO of events, kept in time order by its producer.
///
/// Capacity is reserved up front and never grows: a push into a full queue is
/// refused so that scheduling from the audio thread never allocates.
#[derive(Debug, Clone)]
pub struct EventQueue<K> {
    events: VecDeque<Event<K>>,
    capacity: usize,
}

impl<K: Copy> EventQueue<K> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns `false` when the queue is full and the event was dropped.
    pub fn push(&mut self, event: Event<K>) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }

        self.events.push_back(event);
        true
    }

    pub fn front(&self) -> Option<&Event<K>> {
        self.events.front()
    }

    pub fn back(&self) -> Option<&Event<K>> {
        self.events.back()
    }

    pub fn pop(&mut self) -> Option<Event<K>> {
        self.events.pop_front()
    }

    /// Drop every event at or after `time`.
    pub fn drop_from(&mut self, time: Seconds) {
        while matches!(self.events.back(), Some(event) if event.time >= time) {
            self.events.pop_back();
        }
    }

    /// Drop every event strictly after `time`.
    pub fn drop_after(&mut self, time: Seconds) {
        while matches!(self.events.back(), Some(event) if event.time > time) {
            self.events.pop_back();
        }
    }

    /// Drop events from the back for as long as `predicate` holds.
    pub fn drop_back_while(&mut self, mut predicate: impl FnMut(&Event<K>) -> bool) {
        while self.events.back().is_some_and(&mut predicate) {
            self.events.pop_back();
        }
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Shift every pending event by `delta` seconds.
    pub(crate) fn rebase(&mut self, delta: Seconds) {
        for event in self.events.iter_mut() {
            event.time -= delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(time: Seconds, kind: u8) -> Event<u8> {
        Event { time, kind }
    }

    #[test]
    fn refuses_push_beyond_capacity() {
        let mut queue = EventQueue::with_capacity(2);

        assert!(queue.push(event(0.0, 1)));
        assert!(queue.push(event(0.1, 2)));
        assert!(!queue.push(event(0.2, 3)));

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().map(|e| e.kind), Some(1));
        assert_eq!(queue.pop().map(|e| e.kind), Some(2));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn drop_from_removes_the_tail_only() {
        let mut queue = EventQueue::with_capacity(8);
        for (i, t) in [0.0, 0.1, 0.2, 0.3].iter().enumerate() {
            queue.push(event(*t, i as u8));
        }

        queue.drop_from(0.2);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.back().map(|e| e.kind), Some(1));
    }

    #[test]
    fn drop_back_while_stops_at_the_first_kept_event() {
        let mut queue = EventQueue::with_capacity(8);
        for (t, kind) in [(0.0, 0), (0.1, 1), (0.1, 2), (0.2, 3)] {
            queue.push(event(t, kind));
        }

        queue.drop_back_while(|e| e.time > 0.1 || e.kind == 2);

        assert_eq!(queue.len(), 2);
        assert_eq!(queue.back().map(|e| e.kind), Some(1));
    }
}
