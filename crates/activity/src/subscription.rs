//! Filterable subscriptions with best-effort, backpressure-bounded delivery.

use schemas::{ActivityCategory, ActivityEvent, ActivityType, Severity};
use std::collections::VecDeque;

pub const DEFAULT_WATERMARK: usize = 256;

/// A conjunction of optional sets. An empty/`None` set matches everything
/// for that dimension.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub types: Option<Vec<ActivityType>>,
    pub categories: Option<Vec<ActivityCategory>>,
    pub severities: Option<Vec<Severity>>,
    pub agent_ids: Option<Vec<String>>,
    pub workflow_id: Option<String>,
}

impl EventFilter {
    pub fn matches(&self, event: &ActivityEvent) -> bool {
        if let Some(types) = &self.types {
            if !types.contains(&event.event_type) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&event.category) {
                return false;
            }
        }
        if let Some(severities) = &self.severities {
            if !severities.contains(&event.severity) {
                return false;
            }
        }
        if let Some(agent_ids) = &self.agent_ids {
            match &event.agent_id {
                Some(id) if agent_ids.contains(id) => {}
                _ => return false,
            }
        }
        if let Some(workflow_id) = &self.workflow_id {
            if event.workflow_id.as_ref() != Some(workflow_id) {
                return false;
            }
        }
        true
    }
}

/// One subscriber's mailbox. Delivery is push-based via `drain`; once the
/// backlog exceeds the watermark the subscriber is marked dropped and stops
/// receiving further events, with a counter tracking how many were missed.
pub struct Subscription {
    pub id: u64,
    pub filter: EventFilter,
    watermark: usize,
    queue: VecDeque<ActivityEvent>,
    dropped: bool,
    dropped_count: u64,
}

impl Subscription {
    pub fn new(id: u64, filter: EventFilter, watermark: usize) -> Self {
        Self {
            id,
            filter,
            watermark: watermark.max(1),
            queue: VecDeque::new(),
            dropped: false,
            dropped_count: 0,
        }
    }

    /// Offers an event to this subscription if it matches the filter.
    /// Returns true if the event was enqueued.
    pub fn offer(&mut self, event: &ActivityEvent) -> bool {
        if self.dropped || !self.filter.matches(event) {
            if self.dropped && self.filter.matches(event) {
                self.dropped_count += 1;
            }
            return false;
        }
        if self.queue.len() >= self.watermark {
            self.dropped = true;
            self.dropped_count += 1;
            return false;
        }
        self.queue.push_back(event.clone());
        true
    }

    pub fn drain(&mut self) -> Vec<ActivityEvent> {
        self.queue.drain(..).collect()
    }

    pub fn is_dropped(&self) -> bool {
        self.dropped
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SubscriptionStats {
    pub id: u64,
    pub queued: usize,
    pub dropped: bool,
    pub dropped_count: u64,
}
