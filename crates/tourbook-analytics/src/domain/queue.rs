//! Ordered in-memory buffer of pending analytics events.

use std::collections::VecDeque;

use tourbook_core::error::AnalyticsError;
use tourbook_core::event::{AnalyticsEvent, EventDefaults, EventDraft};

/// FIFO buffer of events awaiting delivery.
///
/// The queue has no capacity bound; batch size is limited only when events
/// are taken for delivery.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<AnalyticsEvent>,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalizes `draft` and appends it to the tail. Returns the new length.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::Validation` if the draft has no usable event
    /// name; the queue is left unchanged.
    pub fn enqueue(
        &mut self,
        draft: EventDraft,
        defaults: &EventDefaults<'_>,
    ) -> Result<usize, AnalyticsError> {
        let event = draft.normalize(defaults)?;
        self.events.push_back(event);
        Ok(self.events.len())
    }

    /// Removes and returns up to `max_size` events from the head.
    pub fn take_batch(&mut self, max_size: usize) -> Vec<AnalyticsEvent> {
        let count = max_size.min(self.events.len());
        self.events.drain(..count).collect()
    }

    /// Puts an undelivered batch back at the head, ahead of anything
    /// enqueued since it was taken. The batch keeps its internal order.
    pub fn requeue_front(&mut self, batch: Vec<AnalyticsEvent>) {
        for event in batch.into_iter().rev() {
            self.events.push_front(event);
        }
    }

    /// Number of pending events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Copy of the pending events in delivery order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<AnalyticsEvent> {
        self.events.iter().cloned().collect()
    }
}
