//! Tool-call extraction from free-form model text.
//!
//! Models without native tool calling (or that ignore it) write calls inline.
//! The parser recognizes five syntaxes and tries them in a fixed order,
//! stopping at the first that yields at least one call:
//!
//! 1. `<tool_call>{"tool": ..., "args": ...}</tool_call>`
//! 2. A code fence labeled `tool_call`
//! 3. A code fence labeled `json` holding a `tool`/`args` object
//! 4. Bare `{"tool": ..., "args": ...}` objects, keys in either order
//! 5. Bare `{"name": ..., "arguments": ...}` objects
//!
//! Candidates that fail to parse get one pass through a JSON repair step when
//! enabled. Malformed input never produces an error, only fewer calls.

mod disguise;
mod repair;
mod shape;
mod syntax;

use std::sync::LazyLock;

use lumen_llm::ToolCall;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use shape::{ResolvedCall, resolve, resolve_as};
use syntax::{Candidate, PRIORITY, Syntax};

static BLANK_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n(?:[ \t]*\n)+").expect("invalid regex"));

/// A tool call found in text.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedToolCall {
    /// Generated call ID.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Argument mapping.
    pub arguments: Map<String, Value>,
    /// The matched text span.
    pub raw: String,
    /// Byte offset where the span starts.
    pub start: usize,
    /// Byte offset just past the span.
    pub end: usize,
}

impl ParsedToolCall {
    /// Arguments as a JSON object value.
    #[must_use]
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }

    /// Convert to the provider-facing call type.
    #[must_use]
    pub fn to_tool_call(&self) -> ToolCall {
        ToolCall::new(self.id.clone(), self.name.clone()).with_arguments(self.arguments_value())
    }
}

/// Extracts tool calls from model text.
#[derive(Debug, Clone, Copy)]
pub struct ToolCallParser {
    json_repair: bool,
}

impl ToolCallParser {
    /// Create a parser with JSON repair enabled.
    #[must_use]
    pub fn new() -> Self {
        Self { json_repair: true }
    }

    /// Enable or disable the JSON repair step.
    #[must_use]
    pub fn with_json_repair(mut self, enabled: bool) -> Self {
        self.json_repair = enabled;
        self
    }

    /// Whether JSON repair is enabled.
    #[must_use]
    pub fn json_repair(&self) -> bool {
        self.json_repair
    }

    /// All calls of the highest-priority syntax present, left to right.
    #[must_use]
    pub fn find_tool_calls(&self, text: &str) -> Vec<ParsedToolCall> {
        for syntax in PRIORITY {
            let calls: Vec<ParsedToolCall> = syntax
                .candidates(text)
                .into_iter()
                .filter_map(|candidate| self.accept(syntax, text, candidate))
                .collect();
            if !calls.is_empty() {
                debug!(syntax = ?syntax, count = calls.len(), "Found tool calls in text");
                return calls;
            }
        }
        Vec::new()
    }

    /// Whether the text holds at least one complete call.
    #[must_use]
    pub fn has_tool_call(&self, text: &str) -> bool {
        !self.find_tool_calls(text).is_empty()
    }

    /// Whether the text ends inside a call that has started but not closed.
    #[must_use]
    pub fn has_partial_tool_call(&self, text: &str) -> bool {
        syntax::is_partial(text)
    }

    /// Strip every call, collapse the blank lines left behind, and trim.
    ///
    /// Unlike [`find_tool_calls`](Self::find_tool_calls) this covers every
    /// syntax at once, so a reply mixing syntaxes leaves no call behind.
    #[must_use]
    pub fn remove_tool_calls(&self, text: &str) -> String {
        let calls = self.all_call_spans(text);
        if calls.is_empty() {
            return text.trim().to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut cursor = 0usize;
        for call in &calls {
            out.push_str(text.get(cursor..call.start).unwrap_or_default());
            cursor = call.end;
        }
        out.push_str(text.get(cursor..).unwrap_or_default());

        BLANK_RUN_RE.replace_all(&out, "\n\n").trim().to_string()
    }

    /// The answer inside a reply that is entirely a disguised tool call.
    ///
    /// Applies the same JSON repair setting as call detection.
    #[must_use]
    pub fn extract_disguised_answer(&self, text: &str) -> Option<String> {
        disguise::extract_disguised_answer(text, self.json_repair)
    }

    /// Replace every call with a short announcement.
    #[must_use]
    pub fn convert_tool_calls_for_display(&self, text: &str) -> String {
        let mut out = text.to_string();
        // Back to front, so earlier offsets stay valid.
        for call in self.all_call_spans(text).iter().rev() {
            if out.is_char_boundary(call.start) && out.is_char_boundary(call.end) {
                out.replace_range(call.start..call.end, &announcement(&call.name));
            }
        }
        out
    }

    /// Calls of every syntax, without overlaps, ordered by position.
    ///
    /// Where spans overlap, the higher-priority syntax wins.
    fn all_call_spans(&self, text: &str) -> Vec<ParsedToolCall> {
        let mut spans: Vec<ParsedToolCall> = Vec::new();
        for syntax in PRIORITY {
            for call in syntax
                .candidates(text)
                .into_iter()
                .filter_map(|candidate| self.accept(syntax, text, candidate))
            {
                if !spans.iter().any(|s| call.start < s.end && s.start < call.end) {
                    spans.push(call);
                }
            }
        }
        spans.sort_by_key(|call| call.start);
        spans
    }

    fn accept(&self, syntax: Syntax, text: &str, candidate: Candidate<'_>) -> Option<ParsedToolCall> {
        let value = self.parse_json(candidate.body)?;
        let resolved = match syntax.required_shape() {
            Some(shape) => resolve_as(&value, shape),
            None => resolve(&value),
        }?;
        if !syntax.accepts(&resolved) {
            trace!(syntax = ?syntax, "Candidate has the wrong shape for its syntax");
            return None;
        }
        let ResolvedCall {
            name, arguments, ..
        } = resolved;
        Some(ParsedToolCall {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name,
            arguments,
            raw: text.get(candidate.start..candidate.end)?.to_string(),
            start: candidate.start,
            end: candidate.end,
        })
    }

    fn parse_json(&self, body: &str) -> Option<Value> {
        let body = body.trim();
        if let Ok(value) = serde_json::from_str(body) {
            return Some(value);
        }
        if !self.json_repair {
            return None;
        }
        let repaired = repair::repair(body)?;
        match serde_json::from_str(&repaired) {
            Ok(value) => {
                debug!("Repaired malformed tool-call JSON");
                Some(value)
            },
            Err(_) => None,
        }
    }
}

impl Default for ToolCallParser {
    fn default() -> Self {
        Self::new()
    }
}

fn announcement(name: &str) -> String {
    format!("[Using tool: {name}]")
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod parser_tests;
