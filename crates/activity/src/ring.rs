//! Bounded in-memory event buffer with per-session sequence assignment.

use schemas::ActivityEvent;
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_MAX_EVENTS_IN_MEMORY: usize = 1000;

/// Assigns the next monotonic sequence number for a session, starting at 0.
#[derive(Debug, Default)]
pub struct SequenceCounters {
    next: HashMap<String, u64>,
}

impl SequenceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_for(&mut self, session_id: &str) -> u64 {
        let counter = self.next.entry(session_id.to_string()).or_insert(0);
        let seq = *counter;
        *counter += 1;
        seq
    }
}

/// Ring buffer of the most recent `capacity` events, oldest dropped first.
pub struct RingBuffer {
    capacity: usize,
    events: VecDeque<ActivityEvent>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            events: VecDeque::with_capacity(capacity.min(4096)),
        }
    }

    pub fn push(&mut self, event: ActivityEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use schemas::{ActivityCategory, ActivityType, Severity};
    use uuid::Uuid;

    fn event(session: &str, sequence: u64) -> ActivityEvent {
        ActivityEvent {
            sequence,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: ActivityType::new(ActivityType::AGENT_COMPLETE),
            category: ActivityCategory::Agent,
            severity: Severity::Info,
            session_id: session.to_string(),
            workflow_id: None,
            agent_id: None,
            title: "t".to_string(),
            message: "m".to_string(),
            details: None,
            progress: None,
            duration_ms: None,
            parent_id: None,
            correlation_id: None,
        }
    }

    #[test]
    fn sequence_counters_increment_per_session() {
        let mut counters = SequenceCounters::new();
        assert_eq!(counters.next_for("s1"), 0);
        assert_eq!(counters.next_for("s1"), 1);
        assert_eq!(counters.next_for("s2"), 0);
        assert_eq!(counters.next_for("s1"), 2);
    }

    #[test]
    fn ring_buffer_drops_oldest_when_full() {
        let mut buf = RingBuffer::new(2);
        buf.push(event("s1", 0));
        buf.push(event("s1", 1));
        buf.push(event("s1", 2));
        assert_eq!(buf.len(), 2);
        let sequences: Vec<u64> = buf.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn ring_buffer_capacity_zero_is_clamped_to_one() {
        let mut buf = RingBuffer::new(0);
        buf.push(event("s1", 0));
        buf.push(event("s1", 1));
        assert_eq!(buf.len(), 1);
    }
}
