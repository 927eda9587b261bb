//! Run requests, results, and the table of in-flight runs.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use lumen_core::{MediaRef, RunId, RunStatus, SessionKey};
use lumen_llm::Usage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// ---------------------------------------------------------------------------
// RunRequest
// ---------------------------------------------------------------------------

/// Input to [`AgentRunner::run`](crate::AgentRunner::run).
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The user message.
    pub message: String,
    /// Session to run against; created if unknown.
    pub session_key: SessionKey,
    /// Pre-assigned run ID. A fresh one is generated when absent.
    pub run_id: Option<RunId>,
    /// Provider name. The configured default is used when absent.
    pub provider: Option<String>,
    /// Persona name.
    pub persona: Option<String>,
    /// Media attached to the user message.
    pub media: Vec<MediaRef>,
}

impl RunRequest {
    /// A request for `message` in `session_key`.
    #[must_use]
    pub fn new(message: impl Into<String>, session_key: impl Into<SessionKey>) -> Self {
        Self {
            message: message.into(),
            session_key: session_key.into(),
            run_id: None,
            provider: None,
            persona: None,
            media: Vec::new(),
        }
    }

    /// Use a caller-chosen run ID, so the run can be cancelled before its
    /// `start` event is seen.
    #[must_use]
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Select a provider by name.
    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Select a persona by name.
    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    /// Attach media to the user message.
    #[must_use]
    pub fn with_media(mut self, media: Vec<MediaRef>) -> Self {
        self.media = media;
        self
    }
}

// ---------------------------------------------------------------------------
// RunResult
// ---------------------------------------------------------------------------

/// Outcome of a run that got past its preconditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Run ID.
    pub run_id: RunId,
    /// Terminal status.
    pub status: RunStatus,
    /// Final answer text. Empty for cancelled and failed runs.
    pub answer: String,
    /// Tools invoked, in call order.
    pub tools_used: Vec<String>,
    /// Wall-clock duration.
    pub elapsed: Duration,
    /// Model round-trips performed.
    pub iterations: usize,
    /// Whether the iteration cap cut the run short.
    pub truncated: bool,
    /// Summed token usage.
    pub usage: Usage,
    /// Error message for failed runs.
    pub error: Option<String>,
}

impl RunResult {
    /// Whether the run produced an answer.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Success
    }
}

// ---------------------------------------------------------------------------
// RunState / RunHandle
// ---------------------------------------------------------------------------

/// Position of a run in its state machine.
///
/// `Started → Streaming → (ToolsDetected → ExecutingTools → Streaming)* →
/// Finished | Errored | Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Registered, session not yet consulted.
    Started,
    /// Consuming a model response.
    Streaming,
    /// The response asked for tools.
    ToolsDetected,
    /// Running tools, possibly waiting on a confirmation.
    ExecutingTools,
    /// Produced an answer.
    Finished,
    /// Aborted on a fault.
    Errored,
    /// Stopped at a checkpoint after cancellation.
    Cancelled,
}

impl RunState {
    /// Whether the run is over.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Cancelled)
    }
}

/// Snapshot of an in-flight run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    /// Run ID.
    pub run_id: RunId,
    /// Session the run belongs to.
    pub session_key: SessionKey,
    /// When the run was registered.
    pub started_at: DateTime<Utc>,
    /// Current state.
    pub state: RunState,
    /// Tools invoked so far.
    pub tools_used: Vec<String>,
    /// Text streamed so far.
    pub streamed_text: String,
    cancel: CancellationToken,
}

impl RunHandle {
    fn new(run_id: RunId, session_key: SessionKey) -> Self {
        Self {
            run_id,
            session_key,
            started_at: Utc::now(),
            state: RunState::Started,
            tools_used: Vec::new(),
            streamed_text: String::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// RunTable
// ---------------------------------------------------------------------------

/// In-flight runs keyed by run ID.
///
/// Entries exist only while [`AgentRunner::run`](crate::AgentRunner::run) is
/// executing; the [`RunGuard`] returned by [`register`](Self::register)
/// removes the entry when the run returns.
#[derive(Debug, Default)]
pub struct RunTable {
    runs: DashMap<RunId, RunHandle>,
}

impl RunTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run and return its guard.
    ///
    /// Returns `None` if a run with the same ID is already in flight; the
    /// existing entry is left untouched.
    pub(crate) fn register(&self, run_id: RunId, session_key: SessionKey) -> Option<RunGuard<'_>> {
        let Entry::Vacant(slot) = self.runs.entry(run_id.clone()) else {
            return None;
        };
        let handle = RunHandle::new(run_id.clone(), session_key);
        let cancel = handle.cancel.clone();
        slot.insert(handle);
        Some(RunGuard {
            table: self,
            run_id,
            cancel,
        })
    }

    /// Request cancellation. Returns `false` for unknown runs.
    pub fn cancel(&self, run_id: &RunId) -> bool {
        match self.runs.get(run_id) {
            Some(handle) => {
                debug!(run_id = %run_id, "Cancellation requested");
                handle.cancel.cancel();
                true
            },
            None => false,
        }
    }

    /// Snapshot of one run.
    #[must_use]
    pub fn get(&self, run_id: &RunId) -> Option<RunHandle> {
        self.runs.get(run_id).map(|h| h.clone())
    }

    /// Snapshots of all in-flight runs, oldest first.
    #[must_use]
    pub fn active(&self) -> Vec<RunHandle> {
        let mut runs: Vec<_> = self.runs.iter().map(|h| h.value().clone()).collect();
        runs.sort_by_key(|h| h.started_at);
        runs
    }

    /// Number of in-flight runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether no run is in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn update(&self, run_id: &RunId, f: impl FnOnce(&mut RunHandle)) {
        if let Some(mut handle) = self.runs.get_mut(run_id) {
            f(&mut handle);
        }
    }
}

/// Owner of one run-table entry; removes it on drop.
pub(crate) struct RunGuard<'a> {
    table: &'a RunTable,
    run_id: RunId,
    cancel: CancellationToken,
}

impl RunGuard<'_> {
    pub(crate) fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn set_state(&self, state: RunState) {
        debug!(run_id = %self.run_id, ?state, "Run state");
        self.table.update(&self.run_id, |h| h.state = state);
    }

    pub(crate) fn record_tool(&self, name: &str) {
        self.table
            .update(&self.run_id, |h| h.tools_used.push(name.to_string()));
    }

    pub(crate) fn record_text(&self, delta: &str) {
        self.table
            .update(&self.run_id, |h| h.streamed_text.push_str(delta));
    }

    /// Snapshot of the entry this guard owns.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Option<RunHandle> {
        self.table.get(&self.run_id)
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.table.runs.remove(&self.run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let run_id = RunId::new();
        let request = RunRequest::new("hi", "chat")
            .with_run_id(run_id.clone())
            .with_provider("mock")
            .with_persona("pirate");
        assert_eq!(request.run_id, Some(run_id));
        assert_eq!(request.session_key.as_str(), "chat");
        assert_eq!(request.provider.as_deref(), Some("mock"));
        assert_eq!(request.persona.as_deref(), Some("pirate"));
    }

    #[test]
    fn test_guard_tracks_and_removes() {
        let table = RunTable::new();
        let run_id = RunId::new();
        {
            let guard = table.register(run_id.clone(), SessionKey::new("s")).unwrap();
            guard.set_state(RunState::Streaming);
            guard.record_text("Hel");
            guard.record_text("lo");
            guard.record_tool("get_time");

            let snapshot = guard.snapshot().unwrap();
            assert_eq!(snapshot.state, RunState::Streaming);
            assert_eq!(snapshot.streamed_text, "Hello");
            assert_eq!(snapshot.tools_used, vec!["get_time"]);
            assert_eq!(table.active().len(), 1);
        }
        assert!(table.is_empty());
        assert!(table.get(&run_id).is_none());
    }

    #[test]
    fn test_cancel() {
        let table = RunTable::new();
        let run_id = RunId::new();
        let guard = table.register(run_id.clone(), SessionKey::new("s")).unwrap();
        assert!(!guard.is_cancelled());
        assert!(table.cancel(&run_id));
        assert!(guard.is_cancelled());
        assert!(table.get(&run_id).unwrap().is_cancelled());
        assert!(!table.cancel(&RunId::new()));
    }

    #[test]
    fn test_duplicate_run_id_is_rejected() {
        let table = RunTable::new();
        let run_id = RunId::new();
        let first = table.register(run_id.clone(), SessionKey::new("a")).unwrap();
        first.set_state(RunState::Streaming);

        assert!(table.register(run_id.clone(), SessionKey::new("b")).is_none());
        let entry = table.get(&run_id).unwrap();
        assert_eq!(entry.session_key.as_str(), "a");
        assert_eq!(entry.state, RunState::Streaming);
        assert!(table.cancel(&run_id));
        assert!(first.is_cancelled());

        drop(first);
        assert!(table.register(run_id, SessionKey::new("b")).is_some());
    }

    #[test]
    fn test_terminal_states() {
        assert!(RunState::Cancelled.is_terminal());
        assert!(RunState::Finished.is_terminal());
        assert!(!RunState::ExecutingTools.is_terminal());
    }
}
