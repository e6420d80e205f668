//! Fire-and-forget side channel for lifecycle events.
//!
//! Delivery failures never fail the business operation that raised the event:
//! [`dispatch`] logs them and moves on.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    OrderCreated,
    OrderStateChanged,
    SampleScheduled,
    SampleTaken,
    ResultRegistered,
    ResultValidated,
    ResultDelivered,
}

/// A lifecycle event and the ids needed to route it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabEvent {
    pub kind: EventKind,
    pub order_id: String,
    /// Sample or result id, when the event concerns one
    pub subject_id: Option<String>,
    pub message: String,
}

impl LabEvent {
    pub fn new(kind: EventKind, order_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            order_id: order_id.into(),
            subject_id: None,
            message: message.into(),
        }
    }

    pub fn with_subject(mut self, subject_id: impl Into<String>) -> Self {
        self.subject_id = Some(subject_id.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync {
    fn notify(&self, event: &LabEvent) -> Result<(), NotifyError>;
}

/// Deliver an event, swallowing and logging any failure.
pub fn dispatch(notifier: &dyn Notifier, event: LabEvent) {
    if let Err(e) = notifier.notify(&event) {
        tracing::warn!(
            kind = ?event.kind,
            order_id = %event.order_id,
            error = %e,
            "notification dropped"
        );
    }
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &LabEvent) -> Result<(), NotifyError> {
        tracing::info!(
            kind = ?event.kind,
            order_id = %event.order_id,
            subject_id = event.subject_id.as_deref().unwrap_or(""),
            "{}",
            event.message
        );
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<LabEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LabEvent> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().into_iter().map(|e| e.kind).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: &LabEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .map_err(|e| NotifyError::Delivery(e.to_string()))?
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Broken;

    impl Notifier for Broken {
        fn notify(&self, _event: &LabEvent) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp down".into()))
        }
    }

    #[test]
    fn test_dispatch_swallows_failures() {
        dispatch(&Broken, LabEvent::new(EventKind::OrderCreated, "o1", "created"));
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        dispatch(
            &notifier,
            LabEvent::new(EventKind::ResultValidated, "o1", "ok").with_subject("r1"),
        );
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].subject_id.as_deref(), Some("r1"));
        assert_eq!(notifier.kinds(), vec![EventKind::ResultValidated]);
    }
}
