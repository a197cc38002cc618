//! Bounded, append-only buffer for streamed log events.
//!
//! Owns the retained log tail: appends at the tail, evicts from the head once
//! capacity is reached, and hands out immutable point-in-time snapshots so a
//! consumer never observes appends mid-render. Identity assignment lives here:
//! each appended event gets the next sequence number, and the counter survives
//! `clear()` so ids are never reused.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Local;

use crate::models::{LogEvent, LogLine};

/// Default retained tail size.
pub const DEFAULT_LOG_CAPACITY: usize = 2000;

/// An immutable point-in-time view of the buffer, oldest first.
pub type BufferSnapshot = Arc<[Arc<LogEvent>]>;

pub struct EventBuffer {
    events: VecDeque<Arc<LogEvent>>,
    capacity: usize,
    next_id: u64,
    // Memoized so repeated snapshots between appends share one allocation.
    cached: Option<BufferSnapshot>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "buffer capacity must be non-zero");
        EventBuffer {
            events: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
            cached: None,
        }
    }

    /// Append a decoded line, assigning identity and capture time. Evicts from
    /// the head when over capacity. O(1) amortized.
    pub fn append(&mut self, line: LogLine) -> Arc<LogEvent> {
        let id = self.next_id;
        self.next_id += 1;
        let event = Arc::new(LogEvent {
            id,
            time: Local::now(),
            level: line.level,
            payload: line.payload,
            even: id % 2 == 0,
        });
        self.events.push_back(Arc::clone(&event));
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
        self.cached = None;
        event
    }

    /// Point-in-time view, oldest first. Subsequent appends do not affect a
    /// snapshot already handed out.
    pub fn snapshot(&mut self) -> BufferSnapshot {
        if let Some(cached) = &self.cached {
            return Arc::clone(cached);
        }
        let snap: BufferSnapshot = self.events.iter().cloned().collect();
        self.cached = Some(Arc::clone(&snap));
        snap
    }

    /// Drop all retained events. The id counter is deliberately not reset.
    pub fn clear(&mut self) {
        self.events.clear();
        self.cached = None;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        EventBuffer::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LogLevel;

    fn line(n: usize) -> LogLine {
        LogLine {
            level: LogLevel::Info,
            payload: format!("event {}", n),
        }
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let mut buf = EventBuffer::new(10);
        for n in 0..100 {
            buf.append(line(n));
            assert!(buf.len() <= 10);
        }
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn retains_most_recent_window_in_arrival_order() {
        let mut buf = EventBuffer::new(2000);
        for n in 1..=3000 {
            buf.append(line(n));
        }
        let snap = buf.snapshot();
        assert_eq!(snap.len(), 2000);
        assert_eq!(snap.first().unwrap().id, 1001);
        assert_eq!(snap.last().unwrap().id, 3000);
        for pair in snap.windows(2) {
            assert_eq!(pair[0].id + 1, pair[1].id);
        }
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let mut buf = EventBuffer::new(100);
        for n in 0..5 {
            buf.append(line(n));
        }
        let before = buf.snapshot();
        buf.append(line(99));
        assert_eq!(before.len(), 5);
        assert_eq!(buf.snapshot().len(), 6);
    }

    #[test]
    fn repeated_snapshots_between_appends_are_shared() {
        let mut buf = EventBuffer::new(100);
        buf.append(line(0));
        let a = buf.snapshot();
        let b = buf.snapshot();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn ids_survive_clear_and_are_never_reused() {
        let mut buf = EventBuffer::new(100);
        for n in 0..3 {
            buf.append(line(n));
        }
        buf.clear();
        assert!(buf.is_empty());
        let next = buf.append(line(3));
        assert_eq!(next.id, 4);
    }

    #[test]
    fn parity_flag_tracks_id() {
        let mut buf = EventBuffer::new(100);
        let first = buf.append(line(1));
        let second = buf.append(line(2));
        assert!(!first.even);
        assert!(second.even);
    }
}
