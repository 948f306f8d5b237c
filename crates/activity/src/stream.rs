//! The activity stream: ordered fan-out with bounded memory, optional
//! persistence, and filterable subscriptions.

use crate::persistence::{ActivityPersistence, NullPersistence};
use crate::ring::{RingBuffer, SequenceCounters, DEFAULT_MAX_EVENTS_IN_MEMORY};
use crate::subscription::{EventFilter, Subscription, SubscriptionStats, DEFAULT_WATERMARK};
use chrono::{DateTime, Utc};
use schemas::{ActivityCategory, ActivityEvent, ActivityType, Progress, Severity};
use std::sync::Arc;
use uuid::Uuid;

/// The fields a producer supplies; `sequence`, `id`, and `timestamp` are
/// assigned by the stream on emit.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_type: ActivityType,
    pub category: ActivityCategory,
    pub severity: Severity,
    pub session_id: String,
    pub workflow_id: Option<String>,
    pub agent_id: Option<String>,
    pub title: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub progress: Option<Progress>,
    pub duration_ms: Option<u64>,
    pub parent_id: Option<Uuid>,
    pub correlation_id: Option<Uuid>,
}

impl NewEvent {
    pub fn new(
        session_id: impl Into<String>,
        event_type: impl Into<ActivityType>,
        category: ActivityCategory,
        severity: Severity,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            category,
            severity,
            session_id: session_id.into(),
            workflow_id: None,
            agent_id: None,
            title: title.into(),
            message: message.into(),
            details: None,
            progress: None,
            duration_ms: None,
            parent_id: None,
            correlation_id: None,
        }
    }

    pub fn with_workflow_id(mut self, workflow_id: impl Into<String>) -> Self {
        self.workflow_id = Some(workflow_id.into());
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

pub struct ActivityStreamConfig {
    pub max_events_in_memory: usize,
    pub watermark: usize,
}

impl Default for ActivityStreamConfig {
    fn default() -> Self {
        Self {
            max_events_in_memory: DEFAULT_MAX_EVENTS_IN_MEMORY,
            watermark: DEFAULT_WATERMARK,
        }
    }
}

struct Inner {
    sequences: SequenceCounters,
    buffer: RingBuffer,
    subscriptions: Vec<Subscription>,
    next_subscription_id: u64,
}

pub struct ActivityStream {
    config: ActivityStreamConfig,
    persistence: Arc<dyn ActivityPersistence>,
    inner: parking_lot::Mutex<Inner>,
}

impl ActivityStream {
    pub fn new(config: ActivityStreamConfig) -> Self {
        Self::with_persistence(config, Arc::new(NullPersistence))
    }

    pub fn with_persistence(
        config: ActivityStreamConfig,
        persistence: Arc<dyn ActivityPersistence>,
    ) -> Self {
        Self {
            inner: parking_lot::Mutex::new(Inner {
                sequences: SequenceCounters::new(),
                buffer: RingBuffer::new(config.max_events_in_memory),
                subscriptions: Vec::new(),
                next_subscription_id: 0,
            }),
            config,
            persistence,
        }
    }

    /// Assigns sequence/id/timestamp, stores in the ring buffer, persists,
    /// and fans out to matching subscriptions. Persistence failures are
    /// logged, not propagated — a full disk must not stall producers.
    pub fn emit(&self, draft: NewEvent) -> ActivityEvent {
        let mut inner = self.inner.lock();
        let sequence = inner.sequences.next_for(&draft.session_id);
        let event = ActivityEvent {
            sequence,
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: draft.event_type,
            category: draft.category,
            severity: draft.severity,
            session_id: draft.session_id,
            workflow_id: draft.workflow_id,
            agent_id: draft.agent_id,
            title: draft.title,
            message: utils::redact_str(&draft.message),
            details: draft.details.map(|d| utils::redact_value(&d)),
            progress: draft.progress,
            duration_ms: draft.duration_ms,
            parent_id: draft.parent_id,
            correlation_id: draft.correlation_id,
        };

        inner.buffer.push(event.clone());
        for sub in inner.subscriptions.iter_mut() {
            sub.offer(&event);
        }
        drop(inner);

        if let Err(e) = self.persistence.append(&event) {
            tracing::warn!(error = %e, "failed to persist activity event");
        }

        event
    }

    pub fn subscribe(&self, filter: EventFilter) -> u64 {
        let mut inner = self.inner.lock();
        let id = inner.next_subscription_id;
        inner.next_subscription_id += 1;
        inner
            .subscriptions
            .push(Subscription::new(id, filter, self.config.watermark));
        id
    }

    pub fn unsubscribe(&self, id: u64) {
        let mut inner = self.inner.lock();
        inner.subscriptions.retain(|s| s.id != id);
    }

    /// Drains and returns events queued for a subscription since the last
    /// call. Returns `None` if the subscription is unknown or was dropped
    /// for exceeding its backpressure watermark.
    pub fn poll(&self, id: u64) -> Option<Vec<ActivityEvent>> {
        let mut inner = self.inner.lock();
        let sub = inner.subscriptions.iter_mut().find(|s| s.id == id)?;
        if sub.is_dropped() {
            return None;
        }
        Some(sub.drain())
    }

    pub fn stats(&self) -> Vec<SubscriptionStats> {
        let inner = self.inner.lock();
        inner
            .subscriptions
            .iter()
            .map(|s| SubscriptionStats {
                id: s.id,
                queued: 0,
                dropped: s.is_dropped(),
                dropped_count: s.dropped_count(),
            })
            .collect()
    }

    /// In-memory events for a session, ascending by sequence.
    pub fn query_by_session(&self, session_id: &str) -> Vec<ActivityEvent> {
        let inner = self.inner.lock();
        let mut events: Vec<_> = inner
            .buffer
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        events
    }

    pub fn query_by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<ActivityEvent> {
        let inner = self.inner.lock();
        let mut events: Vec<_> = inner
            .buffer
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        events
    }

    pub fn query(&self, filter: &EventFilter) -> Vec<ActivityEvent> {
        let inner = self.inner.lock();
        let mut events: Vec<_> = inner
            .buffer
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.sequence);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(session: &str) -> NewEvent {
        NewEvent::new(
            session,
            ActivityType::WORKFLOW_START,
            ActivityCategory::Workflow,
            Severity::Info,
            "title",
            "message",
        )
    }

    #[test]
    fn emit_assigns_increasing_sequence_per_session() {
        let stream = ActivityStream::new(ActivityStreamConfig::default());
        let a = stream.emit(draft("s1"));
        let b = stream.emit(draft("s1"));
        assert_eq!(a.sequence, 0);
        assert_eq!(b.sequence, 1);
    }

    #[test]
    fn query_by_session_is_ascending_and_scoped() {
        let stream = ActivityStream::new(ActivityStreamConfig::default());
        stream.emit(draft("s1"));
        stream.emit(draft("s2"));
        stream.emit(draft("s1"));
        let events = stream.query_by_session("s1");
        assert_eq!(events.len(), 2);
        assert!(events[0].sequence < events[1].sequence);
    }

    #[test]
    fn subscription_receives_matching_events_only() {
        let stream = ActivityStream::new(ActivityStreamConfig::default());
        let id = stream.subscribe(EventFilter {
            categories: Some(vec![ActivityCategory::Agent]),
            ..Default::default()
        });
        stream.emit(draft("s1"));
        let mut agent_event = draft("s1");
        agent_event.category = ActivityCategory::Agent;
        stream.emit(agent_event);
        let received = stream.poll(id).unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].category, ActivityCategory::Agent);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let stream = ActivityStream::new(ActivityStreamConfig::default());
        let id = stream.subscribe(EventFilter::default());
        stream.unsubscribe(id);
        stream.emit(draft("s1"));
        assert!(stream.poll(id).is_none());
    }

    #[test]
    fn emit_redacts_secrets_in_message() {
        let stream = ActivityStream::new(ActivityStreamConfig::default());
        let mut event = draft("s1");
        event.message = "token=sk-ant-abc123xyz0123456789".to_string();
        let emitted = stream.emit(event);
        assert!(!emitted.message.contains("sk-ant-abc123xyz0123456789"));
    }

    #[test]
    fn ring_buffer_eviction_is_visible_in_queries() {
        let config = ActivityStreamConfig {
            max_events_in_memory: 2,
            ..ActivityStreamConfig::default()
        };
        let stream = ActivityStream::new(config);
        stream.emit(draft("s1"));
        stream.emit(draft("s1"));
        stream.emit(draft("s1"));
        let events = stream.query_by_session("s1");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].sequence, 1);
    }
}
