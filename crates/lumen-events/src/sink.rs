//! The broadcast sink contract consumed by the runner.

use crate::event::AgentEvent;

/// Destination for run lifecycle events.
///
/// Emission is fire-and-forget: a sink never blocks the run and never fails
/// it. Implementations must deliver events in call order.
pub trait EventSink: Send + Sync {
    /// Emit one event.
    fn emit(&self, event: AgentEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: AgentEvent) {}
}
