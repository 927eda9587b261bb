//! The textual tool-call syntaxes, in detection priority.

use std::sync::LazyLock;

use regex::Regex;

use super::shape::{CallShape, ResolvedCall};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<tool[_-]?call>(.*?)</tool[_-]?call>").expect("invalid regex")
});

static TAG_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<tool[_-]?call>").expect("invalid regex"));

static TAG_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</tool[_-]?call>").expect("invalid regex"));

static TOOL_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```tool[_-]?call[ \t]*\r?\n(.*?)```").expect("invalid regex")
});

static JSON_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json[ \t]*\r?\n(.*?)```").expect("invalid regex"));

static BARE_TOOL_ARGS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*["'\u{201C}\u{2018}]?(?:tool|args)["'\u{201D}\u{2019}]?\s*:"#)
        .expect("invalid regex")
});

static BARE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\s*["'\u{201C}\u{2018}]?name["'\u{201D}\u{2019}]?\s*:"#).expect("invalid regex")
});

/// A trailing `{` followed by a quote or a partial call key.
static BARE_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\{\s*(?:["']|["']?(?:t(?:o(?:o(?:l)?)?)?|a(?:r(?:g(?:s)?)?)?|n(?:a(?:m(?:e)?)?)?)["']?\s*:?)\s*$"#,
    )
    .expect("invalid regex")
});

const TAG_SPELLINGS: &[&str] = &["<tool_call>", "<tool-call>", "<toolcall>"];
const FENCE_LABELS: &[&str] = &["tool_call", "tool-call", "toolcall", "json"];

/// One recognized syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Syntax {
    /// `<tool_call>{...}</tool_call>`.
    Tagged,
    /// A code fence labeled `tool_call`.
    ToolCallFence,
    /// A code fence labeled `json` holding a `tool`/`args` object.
    JsonFence,
    /// A bare `{"tool": ..., "args": ...}` object, keys in either order.
    BareToolArgs,
    /// A bare `{"name": ..., "arguments": ...}` object.
    BareNameArguments,
}

/// Detection order. The first syntax with an accepted call wins.
pub(crate) const PRIORITY: [Syntax; 5] = [
    Syntax::Tagged,
    Syntax::ToolCallFence,
    Syntax::JsonFence,
    Syntax::BareToolArgs,
    Syntax::BareNameArguments,
];

/// A span of text that may hold a call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<'a> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    /// The JSON text inside the span.
    pub(crate) body: &'a str,
}

impl Syntax {
    /// Candidate spans, left to right and non-overlapping.
    pub(crate) fn candidates(self, text: &str) -> Vec<Candidate<'_>> {
        match self {
            Self::Tagged => captured(&TAG_RE, text)
                .into_iter()
                .map(|c| Candidate {
                    body: object_slice(strip_code_fence(c.body)),
                    ..c
                })
                .collect(),
            Self::ToolCallFence => captured(&TOOL_FENCE_RE, text),
            Self::JsonFence => captured(&JSON_FENCE_RE, text),
            Self::BareToolArgs => bare_objects(&BARE_TOOL_ARGS_RE, text),
            Self::BareNameArguments => bare_objects(&BARE_NAME_RE, text),
        }
    }

    /// Whether a resolved call is acceptable for this syntax.
    pub(crate) fn accepts(self, call: &ResolvedCall) -> bool {
        match self {
            Self::Tagged | Self::ToolCallFence => true,
            Self::JsonFence | Self::BareToolArgs => call.shape == CallShape::ToolArgs,
            // `{"name": ...}` alone is too common in prose to count.
            Self::BareNameArguments => {
                call.shape == CallShape::NameArguments && call.explicit_arguments
            },
        }
    }

    /// The shape to resolve candidates of this syntax as, if restricted.
    pub(crate) fn required_shape(self) -> Option<CallShape> {
        match self {
            Self::Tagged | Self::ToolCallFence => None,
            Self::JsonFence | Self::BareToolArgs => Some(CallShape::ToolArgs),
            Self::BareNameArguments => Some(CallShape::NameArguments),
        }
    }
}

fn captured<'a>(re: &Regex, text: &'a str) -> Vec<Candidate<'a>> {
    re.captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let body = caps.get(1)?;
            Some(Candidate {
                start: whole.start(),
                end: whole.end(),
                body: body.as_str(),
            })
        })
        .collect()
}

fn bare_objects<'a>(re: &Regex, text: &'a str) -> Vec<Candidate<'a>> {
    let mut out = Vec::new();
    let mut last_end = 0usize;
    for m in re.find_iter(text) {
        let start = m.start();
        if start < last_end {
            continue;
        }
        let Some(rest) = text.get(start..) else {
            continue;
        };
        let Some(len) = find_json_end(rest) else {
            continue;
        };
        let end = start.saturating_add(len);
        if let Some(body) = text.get(start..end) {
            out.push(Candidate { start, end, body });
            last_end = end;
        }
    }
    out
}

/// Byte length of the balanced object at the start of `input`, if closed.
pub(crate) fn find_json_end(input: &str) -> Option<usize> {
    let trimmed = input.trim_start();
    let offset = input.len().saturating_sub(trimmed.len());
    if !trimmed.starts_with('{') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in trimmed.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth = depth.saturating_add(1),
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(offset.saturating_add(i).saturating_add(ch.len_utf8()));
                }
            },
            _ => {},
        }
    }
    None
}

/// Remove a surrounding code fence, if any.
fn strip_code_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let after_label = rest.find('\n').and_then(|i| rest.get(i..)).unwrap_or(rest);
    after_label.strip_suffix("```").unwrap_or(after_label).trim()
}

/// The first balanced object inside `body`, or all of `body`.
fn object_slice(body: &str) -> &str {
    body.find('{')
        .and_then(|start| {
            let rest = body.get(start..)?;
            let len = find_json_end(rest)?;
            rest.get(..len)
        })
        .unwrap_or(body)
}

/// Whether `text` ends inside a call that has started but not closed.
pub(crate) fn is_partial(text: &str) -> bool {
    unclosed_tag(text)
        || unclosed_fence(text)
        || unclosed_bare(text)
        || BARE_PREFIX_RE.is_match(text)
        || ends_with_tag_prefix(text)
}

fn unclosed_tag(text: &str) -> bool {
    let Some(open) = TAG_OPEN_RE.find_iter(text).last() else {
        return false;
    };
    text.get(open.end()..)
        .is_some_and(|rest| !TAG_CLOSE_RE.is_match(rest))
}

fn unclosed_fence(text: &str) -> bool {
    let fences: Vec<usize> = text.match_indices("```").map(|(i, _)| i).collect();
    if fences.len() % 2 == 0 {
        return false;
    }
    let Some(&last) = fences.last() else {
        return false;
    };
    let rest = text.get(last.saturating_add(3)..).unwrap_or_default();
    // A bare opening fence at the very end may still grow a label.
    if rest.trim().is_empty() {
        return true;
    }
    let label = rest.lines().next().unwrap_or_default().trim().to_ascii_lowercase();
    !label.is_empty()
        && FENCE_LABELS
            .iter()
            .any(|l| l.starts_with(label.as_str()) || label.starts_with(l))
}

fn unclosed_bare(text: &str) -> bool {
    BARE_TOOL_ARGS_RE
        .find_iter(text)
        .chain(BARE_NAME_RE.find_iter(text))
        .any(|m| {
            text.get(m.start()..)
                .is_some_and(|rest| find_json_end(rest).is_none())
        })
}

fn ends_with_tag_prefix(text: &str) -> bool {
    TAG_SPELLINGS.iter().any(|tag| {
        (2..tag.len()).any(|k| tag.get(..k).is_some_and(|prefix| text.ends_with(prefix)))
    })
}
