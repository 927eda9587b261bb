//! Mock LLM provider for testing.
//!
//! Provides [`MockLlmProvider`], a deterministic, queue-based implementation
//! of [`LlmProvider`] that replays pre-configured turns. This enables tests
//! of the agent loop and tool-call flows without hitting a real API.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use uuid::Uuid;

use lumen_llm::{
    LlmError, LlmProvider, LlmResult, LlmToolDefinition, Message, StreamBox, StreamEvent,
    ToolCall,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single scripted turn that the mock provider will replay.
#[derive(Debug, Clone)]
pub enum MockLlmTurn {
    /// A text response delivered as one delta.
    Text {
        /// The text content the assistant produces.
        text: String,
        /// Optional `(input_tokens, output_tokens)` usage override.
        usage: Option<(usize, usize)>,
    },
    /// A text response delivered as several deltas.
    Chunks(Vec<String>),
    /// Native tool calls, streamed as start/delta/end triples.
    ToolCalls {
        /// The tool calls to emit.
        calls: Vec<MockToolCall>,
        /// Optional `(input_tokens, output_tokens)` usage override.
        usage: Option<(usize, usize)>,
    },
    /// Raw stream events, replayed verbatim.
    Events(Vec<StreamEvent>),
    /// A stream that yields an error event.
    Error(
        /// The error message.
        String,
    ),
}

impl MockLlmTurn {
    /// Create a text turn with default usage.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            usage: None,
        }
    }

    /// Create a text turn with explicit usage.
    #[must_use]
    pub fn text_with_usage(text: impl Into<String>, input: usize, output: usize) -> Self {
        Self::Text {
            text: text.into(),
            usage: Some((input, output)),
        }
    }

    /// Create a chunked text turn.
    #[must_use]
    pub fn chunks<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Chunks(chunks.into_iter().map(Into::into).collect())
    }

    /// Create a tool-calls turn with default usage.
    #[must_use]
    pub fn tool_calls(calls: Vec<MockToolCall>) -> Self {
        Self::ToolCalls { calls, usage: None }
    }

    /// Create a single tool-call turn.
    #[must_use]
    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self::tool_calls(vec![MockToolCall::new(name, args)])
    }

    /// Create an error turn.
    #[must_use]
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }
}

/// A single tool call specification for [`MockLlmTurn::ToolCalls`].
#[derive(Debug, Clone)]
pub struct MockToolCall {
    /// Unique call ID.
    pub id: String,
    /// Tool name (e.g. `"read_file"`).
    pub name: String,
    /// JSON arguments for the call.
    pub arguments: Value,
}

impl MockToolCall {
    /// Create a new mock tool call with an auto-generated ID.
    #[must_use]
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: format!("mock-call-{}", Uuid::new_v4()),
            name: name.into(),
            arguments: args,
        }
    }

    /// Create a new mock tool call with an explicit ID.
    #[must_use]
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: args,
        }
    }

    /// Convert to the provider-facing call type.
    #[must_use]
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall::new(self.id.clone(), self.name.clone()).with_arguments(self.arguments.clone())
    }
}

/// One captured call to [`LlmProvider::stream`].
#[derive(Debug, Clone)]
pub struct MockRequest {
    /// Conversation sent.
    pub messages: Vec<Message>,
    /// Names of the tool definitions offered.
    pub tools: Vec<String>,
    /// System prompt sent.
    pub system: String,
    /// Output token bound.
    pub max_tokens: usize,
}

// ---------------------------------------------------------------------------
// MockLlmProvider
// ---------------------------------------------------------------------------

/// A deterministic, queue-based [`LlmProvider`] for tests.
///
/// Turns are popped from the front of the queue on each call to
/// [`stream`](LlmProvider::stream). When the queue is exhausted the repeating
/// turn is replayed if one is set; otherwise the call fails.
pub struct MockLlmProvider {
    name: String,
    turns: Mutex<VecDeque<MockLlmTurn>>,
    repeat: Option<MockLlmTurn>,
    delay: Option<Duration>,
    requests: Mutex<Vec<MockRequest>>,
}

impl MockLlmProvider {
    /// Create a new mock provider preloaded with the given turns.
    #[must_use]
    pub fn new(turns: Vec<MockLlmTurn>) -> Self {
        Self {
            name: "mock".to_string(),
            turns: Mutex::new(VecDeque::from(turns)),
            repeat: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that replays the same turn forever.
    #[must_use]
    pub fn repeating(turn: MockLlmTurn) -> Self {
        Self::new(Vec::new()).with_repeat(turn)
    }

    /// Replay `turn` once the queue is empty.
    #[must_use]
    pub fn with_repeat(mut self, turn: MockLlmTurn) -> Self {
        self.repeat = Some(turn);
        self
    }

    /// Register under a different provider name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sleep before answering each call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls to `stream` so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("lock poisoned").len()
    }

    /// Snapshot of every captured request, oldest first.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().expect("lock poisoned").clone()
    }

    /// The most recent request, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn last_request(&self) -> Option<MockRequest> {
        self.requests.lock().expect("lock poisoned").last().cloned()
    }

    /// Record a call and pop the next turn.
    fn next_turn(&self, request: MockRequest) -> Result<MockLlmTurn, LlmError> {
        self.requests.lock().expect("lock poisoned").push(request);

        let mut turns = self.turns.lock().expect("lock poisoned");
        turns
            .pop_front()
            .or_else(|| self.repeat.clone())
            .ok_or_else(|| {
                LlmError::StreamingError("MockLlmProvider: no more turns queued".to_string())
            })
    }

    /// Default usage when none is specified.
    fn default_usage() -> (usize, usize) {
        (100, 50)
    }

    fn usage_event(usage: Option<(usize, usize)>) -> StreamEvent {
        let (input_tokens, output_tokens) = usage.unwrap_or_else(Self::default_usage);
        StreamEvent::Usage {
            input_tokens,
            output_tokens,
        }
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        max_tokens: usize,
    ) -> LlmResult<StreamBox> {
        let turn = self.next_turn(MockRequest {
            messages: messages.to_vec(),
            tools: tools.iter().map(|t| t.name.clone()).collect(),
            system: system.to_string(),
            max_tokens,
        })?;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let events: Vec<StreamEvent> = match turn {
            MockLlmTurn::Text { text, usage } => vec![
                StreamEvent::TextDelta(text),
                Self::usage_event(usage),
                StreamEvent::Done,
            ],
            MockLlmTurn::Chunks(chunks) => chunks
                .into_iter()
                .map(StreamEvent::TextDelta)
                .chain([Self::usage_event(None), StreamEvent::Done])
                .collect(),
            MockLlmTurn::ToolCalls { calls, usage } => {
                let mut evts = Vec::new();
                for call in &calls {
                    let args_json =
                        serde_json::to_string(&call.arguments).unwrap_or_else(|_| "{}".to_string());
                    evts.push(StreamEvent::ToolCallStart {
                        id: call.id.clone(),
                        name: call.name.clone(),
                    });
                    evts.push(StreamEvent::ToolCallDelta {
                        id: call.id.clone(),
                        args_delta: args_json,
                    });
                    evts.push(StreamEvent::ToolCallEnd {
                        id: call.id.clone(),
                    });
                }
                evts.push(Self::usage_event(usage));
                evts.push(StreamEvent::Done);
                evts
            },
            MockLlmTurn::Events(events) => events,
            MockLlmTurn::Error(msg) => vec![StreamEvent::Error(msg)],
        };

        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(provider: &MockLlmProvider) -> LlmResult<Vec<StreamEvent>> {
        let stream = provider
            .stream(&[Message::user("hi")], &[], "system", 256)
            .await?;
        Ok(stream.map(|e| e.unwrap()).collect().await)
    }

    #[tokio::test]
    async fn test_turns_replay_in_order() {
        let provider = MockLlmProvider::new(vec![
            MockLlmTurn::text("first"),
            MockLlmTurn::chunks(["a", "b"]),
        ]);

        let first = collect(&provider).await.unwrap();
        assert!(matches!(&first[0], StreamEvent::TextDelta(t) if t == "first"));

        let second = collect(&provider).await.unwrap();
        let deltas: Vec<_> = second
            .iter()
            .filter_map(|e| match e {
                StreamEvent::TextDelta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["a", "b"]);

        assert!(collect(&provider).await.is_err());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_repeating_turn() {
        let provider = MockLlmProvider::repeating(MockLlmTurn::tool_call("get_time", Value::Null));
        for _ in 0..3 {
            let events = collect(&provider).await.unwrap();
            assert!(matches!(&events[0], StreamEvent::ToolCallStart { name, .. } if name == "get_time"));
        }
    }

    #[tokio::test]
    async fn test_requests_are_recorded() {
        let provider = MockLlmProvider::new(vec![MockLlmTurn::text("ok")]);
        let tools = [LlmToolDefinition::new("speak")];
        let _ = provider
            .stream(&[Message::user("hello")], &tools, "be nice", 512)
            .await
            .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.tools, vec!["speak"]);
        assert_eq!(request.system, "be nice");
        assert_eq!(request.max_tokens, 512);
    }
}
