//! Mock implementations of the runner's collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use lumen_core::{ConfirmationId, RunId};
use lumen_events::{AgentEvent, EventSink};
use lumen_tools::{Skill, SkillContext, SkillError, SkillOutput, SkillResult};

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Event sink that captures every event for later inspection.
///
/// Uses `std::sync::Mutex` so emission stays synchronous.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AgentEvent>>,
    notify: Notify,
}

impl RecordingSink {
    /// Create an empty sink, ready to share.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All captured events, in emission order.
    #[must_use]
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Wire names of the captured events, in emission order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }

    /// Captured events of one type.
    #[must_use]
    pub fn events_of_type(&self, event_type: &str) -> Vec<AgentEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Number of captured events of one type.
    #[must_use]
    pub fn count(&self, event_type: &str) -> usize {
        self.events_of_type(event_type).len()
    }

    /// Captured events belonging to one run.
    #[must_use]
    pub fn events_for_run(&self, run_id: &RunId) -> Vec<AgentEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.run_id() == Some(run_id))
            .collect()
    }

    /// Concatenated token deltas.
    #[must_use]
    pub fn streamed_text(&self) -> String {
        self.events()
            .iter()
            .filter_map(|e| match e {
                AgentEvent::Token { delta, .. } => Some(delta.as_str().to_owned()),
                _ => None,
            })
            .collect()
    }

    /// IDs of every `confirm_required` event, in order.
    #[must_use]
    pub fn confirmation_ids(&self) -> Vec<ConfirmationId> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AgentEvent::ConfirmRequired { confirm_id, .. } => Some(confirm_id),
                _ => None,
            })
            .collect()
    }

    /// Wait until an event of `event_type` has been emitted and return the
    /// first one.
    pub async fn wait_for(&self, event_type: &str) -> AgentEvent {
        loop {
            let notified = self.notify.notified();
            if let Some(event) = self.events_of_type(event_type).into_iter().next() {
                return event;
            }
            notified.await;
        }
    }

    /// Discard all captured events.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.events.lock() {
            guard.clear();
        }
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: AgentEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
        self.notify.notify_waiters();
    }
}

// ---------------------------------------------------------------------------
// ScriptedSkill
// ---------------------------------------------------------------------------

/// What a [`ScriptedSkill`] does when invoked.
#[derive(Debug, Clone)]
pub enum ScriptedBehavior {
    /// Return this output.
    Output(SkillOutput),
    /// Return an execution failure with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

/// Skill with canned behavior that records its invocations.
#[derive(Debug)]
pub struct ScriptedSkill {
    name: String,
    description: String,
    schema: Value,
    behavior: ScriptedBehavior,
    calls: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl ScriptedSkill {
    /// A skill that returns `text`.
    #[must_use]
    pub fn returning(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_behavior(name, ScriptedBehavior::Output(SkillOutput::text(text)))
    }

    /// A skill that fails with `message`.
    #[must_use]
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_behavior(name, ScriptedBehavior::Fail(message.into()))
    }

    /// A skill that panics with `message`.
    #[must_use]
    pub fn panicking(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_behavior(name, ScriptedBehavior::Panic(message.into()))
    }

    /// A skill with explicit behavior.
    #[must_use]
    pub fn with_behavior(name: impl Into<String>, behavior: ScriptedBehavior) -> Self {
        let name = name.into();
        Self {
            description: format!("Scripted skill {name}"),
            name,
            schema: serde_json::json!({"type": "object", "properties": {}}),
            behavior,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    /// Set the advertised input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Arguments of every invocation, in order.
    #[must_use]
    pub fn received_args(&self) -> Vec<Value> {
        self.received.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Skill for ScriptedSkill {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Value, _ctx: &SkillContext) -> SkillResult<SkillOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.received.lock() {
            guard.push(args);
        }
        match &self.behavior {
            ScriptedBehavior::Output(output) => Ok(output.clone()),
            ScriptedBehavior::Fail(message) => Err(SkillError::ExecutionFailed(message.clone())),
            ScriptedBehavior::Panic(message) => panic!("{message}"),
        }
    }
}
