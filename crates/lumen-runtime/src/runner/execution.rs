//! The agent loop: `run`, streaming, and hybrid tool-call detection.

use futures::StreamExt;
use lumen_core::{RunId, RunStatus, preview};
use lumen_events::AgentEvent;
use lumen_llm::{
    LlmError, LlmProvider, LlmToolDefinition, Message, StreamEvent, ToolCall, ToolCallResult, Usage,
};
use lumen_telemetry::RequestContext;
use lumen_tools::{Spotlighter, tool_instructions};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, warn};

use crate::error::{RuntimeError, RuntimeResult};
use crate::run::{RunGuard, RunRequest, RunResult, RunState};
use crate::session::{Session, SessionMessage};

use super::AgentRunner;
use super::config::Persona;

/// Header of the synthetic turn carrying inline tool-call results.
const TOOL_RESULTS_HEADER: &str = "[Tool results]";

/// How the loop ended.
enum LoopOutcome {
    /// The model answered, or the iteration cap was hit.
    Answer {
        /// Visible answer text.
        text: String,
        /// Whether the cap cut the run short.
        truncated: bool,
    },
    /// Cancelled at a checkpoint.
    Cancelled,
    /// Aborted on a fault.
    Failed(String),
}

/// Accumulators shared across iterations of one run.
#[derive(Default)]
pub(super) struct RunProgress {
    iterations: usize,
    tools_used: Vec<String>,
    streamed: String,
    usage: Usage,
}

impl RunProgress {
    pub(super) fn record_tool(&mut self, name: &str) {
        self.tools_used.push(name.to_string());
    }
}

/// One consumed model response.
#[derive(Default)]
struct Turn {
    text: String,
    tool_calls: Vec<ToolCall>,
    pending_args: HashMap<String, String>,
}

impl Turn {
    fn start_call(&mut self, id: String, name: String) {
        self.pending_args.insert(id.clone(), String::new());
        self.tool_calls.push(ToolCall::new(id, name));
    }

    fn push_args(&mut self, id: &str, delta: &str) {
        self.pending_args
            .entry(id.to_string())
            .or_default()
            .push_str(delta);
    }

    fn finish_call(&mut self, id: &str) {
        let Some(raw) = self.pending_args.remove(id) else {
            return;
        };
        let Some(call) = self.tool_calls.iter_mut().find(|c| c.id == id) else {
            return;
        };
        call.arguments = if raw.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(tool = %call.name, error = %e, "Unparsable tool arguments, using none");
                Value::Object(serde_json::Map::new())
            })
        };
    }

    /// Close calls whose end marker never arrived.
    fn finish(mut self) -> Self {
        let open: Vec<String> = self.pending_args.keys().cloned().collect();
        for id in open {
            self.finish_call(&id);
        }
        self
    }
}

impl AgentRunner {
    /// Run the agent for one user message.
    ///
    /// Emits `start`, then any `token`, `tool_start`, `tool_end` and
    /// `confirm_required` events, and always `end` last. Faults after `start`
    /// are reported through the result's status rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error, without emitting any event, if:
    /// - The message is empty
    /// - The provider or persona is unknown
    /// - The session cannot be loaded, or the user message cannot be saved
    pub async fn run(&self, request: RunRequest) -> RuntimeResult<RunResult> {
        if request.message.trim().is_empty() {
            return Err(RuntimeError::EmptyMessage);
        }

        let provider_name = request
            .provider
            .as_deref()
            .or(self.config.default_provider.as_deref());
        let provider = self.providers.resolve(provider_name)?;

        let persona = match request.persona.as_deref() {
            Some(name) => Some(
                self.config
                    .personas
                    .get(name)
                    .ok_or_else(|| RuntimeError::UnknownPersona(name.to_string()))?,
            ),
            None => None,
        };

        let run_id = request.run_id.clone().unwrap_or_default();
        let context = RequestContext::new("runner")
            .with_request_id(run_id.0)
            .with_operation("run")
            .with_session_key(request.session_key.as_str());

        self.run_inner(request, run_id, provider, persona)
            .instrument(context.span())
            .await
    }

    async fn run_inner(
        &self,
        request: RunRequest,
        run_id: RunId,
        provider: Arc<dyn LlmProvider>,
        persona: Option<&Persona>,
    ) -> RuntimeResult<RunResult> {
        let started = Instant::now();
        let Some(guard) = self
            .runs
            .register(run_id.clone(), request.session_key.clone())
        else {
            warn!(run_id = %run_id, "Run ID already in flight");
            return Err(RuntimeError::RunInProgress(run_id));
        };

        let mut session = self.sessions.load(&request.session_key).await?;
        session.add_message(SessionMessage::user(&request.message).with_media(request.media));
        self.sessions.save(&session).await?;

        self.sink.emit(AgentEvent::Start {
            run_id: run_id.clone(),
            session_key: request.session_key.clone(),
            prompt_preview: preview(&request.message, self.config.prompt_preview_chars),
        });
        info!(
            run_id = %run_id,
            provider = provider.name(),
            model = provider.model(),
            "Run started"
        );

        let mut progress = RunProgress::default();
        let outcome = self
            .run_loop(&guard, &session, provider.as_ref(), persona, &mut progress)
            .await;

        let (status, answer, truncated, error) = match outcome {
            LoopOutcome::Answer { .. } if guard.is_cancelled() => {
                (RunStatus::Cancelled, String::new(), false, None)
            },
            LoopOutcome::Answer { text, truncated } => {
                match self
                    .persist_answer(&mut session, &text, &progress.streamed)
                    .await
                {
                    Ok(()) => (RunStatus::Success, text, truncated, None),
                    Err(e) => {
                        error!(run_id = %run_id, error = %e, "Failed to persist answer");
                        (RunStatus::Error, String::new(), false, Some(e.to_string()))
                    },
                }
            },
            LoopOutcome::Cancelled => (RunStatus::Cancelled, String::new(), false, None),
            LoopOutcome::Failed(message) => (RunStatus::Error, String::new(), false, Some(message)),
        };

        guard.set_state(match status {
            RunStatus::Success => RunState::Finished,
            RunStatus::Error => RunState::Errored,
            RunStatus::Cancelled => RunState::Cancelled,
        });

        self.sink.emit(AgentEvent::End {
            run_id: run_id.clone(),
            status,
            tools_used: progress.tools_used.clone(),
            error: error.clone(),
        });

        let elapsed = started.elapsed();
        info!(
            run_id = %run_id,
            %status,
            iterations = progress.iterations,
            tools = progress.tools_used.len(),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Run ended"
        );

        Ok(RunResult {
            run_id,
            status,
            answer,
            tools_used: progress.tools_used,
            elapsed,
            iterations: progress.iterations,
            truncated,
            usage: progress.usage,
            error,
        })
    }

    /// The inner loop: stream, detect tool calls, execute, repeat.
    async fn run_loop(
        &self,
        guard: &RunGuard<'_>,
        session: &Session,
        provider: &dyn LlmProvider,
        persona: Option<&Persona>,
        progress: &mut RunProgress,
    ) -> LoopOutcome {
        let mode = self.config.detection_mode;
        let system = self.system_prompt(persona);
        let tools: Vec<LlmToolDefinition> = if mode.offers_native_tools() {
            self.skills.definitions()
        } else {
            Vec::new()
        };
        let cap = self.config.iteration_cap(persona);
        let mut messages = session.to_messages();
        let mut last_text = String::new();

        for iteration in 0..cap {
            if guard.is_cancelled() {
                info!(run_id = %guard.run_id(), iteration, "Run cancelled");
                return LoopOutcome::Cancelled;
            }
            progress.iterations = iteration.saturating_add(1);
            guard.set_state(RunState::Streaming);

            let turn = match self
                .stream_turn(guard, provider, &messages, &tools, &system, progress)
                .await
            {
                Ok(Some(turn)) => turn,
                Ok(None) => return LoopOutcome::Cancelled,
                Err(e) => {
                    error!(run_id = %guard.run_id(), error = %e, "Stream failed");
                    return LoopOutcome::Failed(e.to_string());
                },
            };

            // Native tool calls
            if !turn.tool_calls.is_empty() {
                guard.set_state(RunState::ToolsDetected);
                debug!(count = turn.tool_calls.len(), "Native tool calls detected");
                messages.push(Message::assistant_with_tools(turn.tool_calls.clone()));

                guard.set_state(RunState::ExecutingTools);
                for call in &turn.tool_calls {
                    let outcome = self
                        .run_tool(guard, session, &call.name, call.arguments.clone(), progress)
                        .await;
                    let content = self.tool_result_content(&call.name, &outcome);
                    messages.push(Message::tool_result(if outcome.success {
                        ToolCallResult::success(call.id.clone(), content)
                    } else {
                        ToolCallResult::error(call.id.clone(), content)
                    }));
                }
                last_text = turn.text.trim().to_string();
                continue;
            }

            // Inline tool calls
            if mode.parses_text() {
                let calls = self.parser.find_tool_calls(&turn.text);
                if !calls.is_empty() {
                    guard.set_state(RunState::ToolsDetected);
                    debug!(count = calls.len(), "Text tool calls detected");
                    let cleaned = self.parser.remove_tool_calls(&turn.text);

                    guard.set_state(RunState::ExecutingTools);
                    let mut results = String::from(TOOL_RESULTS_HEADER);
                    for call in &calls {
                        let outcome = self
                            .run_tool(guard, session, &call.name, call.arguments_value(), progress)
                            .await;
                        let content = self.tool_result_content(&call.name, &outcome);
                        let status = if outcome.success { "ok" } else { "failed" };
                        let _ = write!(results, "\n\n[{}] ({status})\n{content}", call.name);
                    }

                    if !cleaned.is_empty() {
                        messages.push(Message::assistant(&cleaned));
                    }
                    messages.push(Message::user(results));
                    last_text = cleaned;
                    continue;
                }
                if self.parser.has_partial_tool_call(&turn.text) {
                    warn!(
                        run_id = %guard.run_id(),
                        "Response ended inside an unfinished tool call, treating it as text"
                    );
                }
            }

            // Final answer
            let answer = match self.parser.extract_disguised_answer(&turn.text) {
                Some(unwrapped) => {
                    debug!("Unwrapped an answer disguised as a tool call");
                    unwrapped
                },
                None => turn.text.trim().to_string(),
            };
            return LoopOutcome::Answer {
                text: answer,
                truncated: false,
            };
        }

        warn!(
            run_id = %guard.run_id(),
            max_iterations = cap,
            "Iteration cap reached without a final answer"
        );
        LoopOutcome::Answer {
            text: last_text,
            truncated: true,
        }
    }

    /// Consume one streamed response.
    ///
    /// Returns `Ok(None)` if the run was cancelled mid-stream.
    async fn stream_turn(
        &self,
        guard: &RunGuard<'_>,
        provider: &dyn LlmProvider,
        messages: &[Message],
        tools: &[LlmToolDefinition],
        system: &str,
        progress: &mut RunProgress,
    ) -> RuntimeResult<Option<Turn>> {
        let mut stream = provider
            .stream(messages, tools, system, self.config.max_output_tokens)
            .await?;
        let mut turn = Turn::default();

        while let Some(event) = stream.next().await {
            if guard.is_cancelled() {
                return Ok(None);
            }
            match event? {
                StreamEvent::TextDelta(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    turn.text.push_str(&delta);
                    progress.streamed.push_str(&delta);
                    guard.record_text(&delta);
                    self.sink.emit(AgentEvent::Token {
                        run_id: guard.run_id().clone(),
                        delta,
                    });
                },
                StreamEvent::ToolCallStart { id, name } => turn.start_call(id, name),
                StreamEvent::ToolCallDelta { id, args_delta } => turn.push_args(&id, &args_delta),
                StreamEvent::ToolCallEnd { id } => turn.finish_call(&id),
                StreamEvent::ToolCalls(calls) => turn.tool_calls.extend(calls),
                StreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => {
                    debug!(input = input_tokens, output = output_tokens, "Token usage");
                    progress.usage.add(input_tokens, output_tokens);
                },
                StreamEvent::ReasoningDelta(_) => {},
                StreamEvent::Done => break,
                StreamEvent::Error(e) => {
                    return Err(RuntimeError::Llm(LlmError::StreamingError(e)));
                },
            }
        }

        Ok(Some(turn.finish()))
    }

    /// System prompt for a run: persona or base prompt, the inline tool
    /// protocol when text detection is on, and the spotlighting rules.
    pub(super) fn system_prompt(&self, persona: Option<&Persona>) -> String {
        let mut prompt = persona.map_or_else(
            || self.config.system_prompt.clone(),
            |p| p.system_prompt.clone(),
        );
        if self.config.detection_mode.parses_text() && !self.skills.is_empty() {
            prompt.push_str(&tool_instructions(&self.skills));
        }
        if self.config.spotlight_enabled {
            prompt.push_str("\n\n");
            prompt.push_str(Spotlighter::defensive_instructions());
        }
        prompt
    }

    /// Append the answer to the session and save it.
    async fn persist_answer(
        &self,
        session: &mut Session,
        answer: &str,
        streamed: &str,
    ) -> RuntimeResult<()> {
        if answer.is_empty() {
            return Ok(());
        }
        let thought = (!streamed.is_empty()).then(|| streamed.to_string());
        session.add_message(SessionMessage::assistant(answer).with_thought_process(thought));
        self.sessions.save(session).await
    }
}
