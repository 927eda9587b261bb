//! Event bus for broadcasting run events to subscribers.

use lumen_core::RunId;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::event::AgentEvent;
use crate::sink::EventSink;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers.
///
/// Events are delivered asynchronously and in publish order. A receiver that
/// falls more than `capacity` events behind skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<AgentEvent>>,
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    pub fn publish(&self, event: AgentEvent) -> usize {
        let event = Arc::new(event);
        trace!(event_type = %event.event_type(), "Publishing event");

        // No receivers is fine
        self.sender.send(event).unwrap_or(0)
    }

    /// Subscribe to all events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to the events of a single run.
    ///
    /// The receiver yields `None` after delivering that run's `end` event.
    #[must_use]
    pub fn subscribe_run(&self, run_id: RunId) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(run_id))
    }

    /// Get the current number of active receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn emit(&self, event: AgentEvent) {
        self.publish(event);
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<AgentEvent>>,
    /// When set, only events of this run are yielded.
    run_id: Option<RunId>,
    finished: bool,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<Arc<AgentEvent>>, run_id: Option<RunId>) -> Self {
        Self {
            receiver,
            run_id,
            finished: false,
        }
    }

    fn matches(&self, event: &AgentEvent) -> bool {
        match &self.run_id {
            None => true,
            Some(run_id) => event.run_id() == Some(run_id),
        }
    }

    fn accept(&mut self, event: &AgentEvent) -> bool {
        if !self.matches(event) {
            return false;
        }
        if self.run_id.is_some() && event.is_end() {
            self.finished = true;
        }
        true
    }

    /// Receive the next event.
    ///
    /// Returns `None` if the channel is closed or, for a run subscription,
    /// once the run has ended.
    pub async fn recv(&mut self) -> Option<Arc<AgentEvent>> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.accept(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<AgentEvent>> {
        if self.finished {
            return None;
        }
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accept(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{RunStatus, SessionKey};

    fn start(run_id: &RunId) -> AgentEvent {
        AgentEvent::Start {
            run_id: run_id.clone(),
            session_key: SessionKey::new("test"),
            prompt_preview: "hello".into(),
        }
    }

    fn end(run_id: &RunId) -> AgentEvent {
        AgentEvent::End {
            run_id: run_id.clone(),
            status: RunStatus::Success,
            tools_used: vec![],
            error: None,
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        let count = bus.publish(start(&RunId::new()));
        assert_eq!(count, 1);

        let msg = receiver.recv().await.unwrap();
        assert_eq!(msg.event_type(), "start");
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(start(&RunId::new())), 0);
    }

    #[tokio::test]
    async fn test_emit_through_sink() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let sink: &dyn EventSink = &bus;
        sink.emit(start(&RunId::new()));
        assert!(receiver.try_recv().is_some());
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_run_subscription_filters_and_finishes() {
        let bus = EventBus::new();
        let mine = RunId::new();
        let other = RunId::new();
        let mut receiver = bus.subscribe_run(mine.clone());

        bus.publish(start(&other));
        bus.publish(start(&mine));
        bus.publish(end(&mine));
        bus.publish(start(&mine));

        assert_eq!(receiver.recv().await.unwrap().event_type(), "start");
        assert_eq!(receiver.recv().await.unwrap().event_type(), "end");
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_lagged_receiver_skips_ahead() {
        let bus = EventBus::with_capacity(2);
        let mut receiver = bus.subscribe();
        let run_id = RunId::new();
        for _ in 0..5 {
            bus.publish(start(&run_id));
        }
        bus.publish(end(&run_id));

        let mut last = None;
        while let Some(event) = receiver.try_recv() {
            last = Some(event);
        }
        assert!(last.unwrap().is_end());
    }
}
