use super::*;
use serde_json::json;

fn parser() -> ToolCallParser {
    ToolCallParser::new()
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

// ---------------------------------------------------------------------------
// No calls
// ---------------------------------------------------------------------------

#[test]
fn test_plain_text_has_no_calls() {
    let texts = [
        "",
        "   ",
        "The answer is 4.",
        "  padded answer\n\n\n\nwith blank lines  ",
        "Use a dict like {name: value} in Python.",
        r#"Config looks like {"name": "Bob"} here."#,
        "```rust\nfn main() {}\n```",
        "```json\n{\"key\": 1}\n```",
    ];
    for t in texts {
        assert!(parser().find_tool_calls(t).is_empty(), "found a call in {t:?}");
        assert_eq!(parser().remove_tool_calls(t), t.trim());
    }
}

// ---------------------------------------------------------------------------
// Syntaxes
// ---------------------------------------------------------------------------

#[test]
fn test_tagged_block() {
    let text = "Let me check.\n<tool_call>\n{\"tool\": \"get_time\", \"args\": {\"tz\": \"UTC\"}}\n</tool_call>";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_time");
    assert_eq!(calls[0].arguments, args(json!({"tz": "UTC"})));
    assert_eq!(&text[calls[0].start..calls[0].end], calls[0].raw);
    assert!(calls[0].raw.starts_with("<tool_call>"));
}

#[test]
fn test_tagged_block_variants() {
    for text in [
        r#"<toolcall>{"name": "speak", "arguments": {"text": "hi"}}</toolcall>"#,
        r#"<tool-call>{"tool": "speak", "args": {"text": "hi"}}</tool-call>"#,
        "<tool_call>\n```json\n{\"tool\": \"speak\", \"args\": {\"text\": \"hi\"}}\n```\n</tool_call>",
    ] {
        let calls = parser().find_tool_calls(text);
        assert_eq!(calls.len(), 1, "{text}");
        assert_eq!(calls[0].name, "speak");
        assert_eq!(calls[0].arguments["text"], "hi");
    }
}

#[test]
fn test_tool_call_fence() {
    let text = "Running:\n```tool_call\n{\"tool\": \"exec\", \"args\": {\"command\": \"ls\"}}\n```\nDone.";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "exec");
    assert_eq!(parser().remove_tool_calls(text), "Running:\n\nDone.");
}

#[test]
fn test_json_fence_requires_tool_args_shape() {
    let text = "```json\n{\"tool\": \"web_search\", \"args\": {\"q\": \"rust\"}}\n```";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].start, 0);
    assert_eq!(calls[0].end, text.len());

    let other = "```json\n{\"name\": \"x\", \"arguments\": {}}\n```";
    let calls = parser().find_tool_calls(other);
    // Falls through to the bare name/arguments syntax, which spans only the object.
    assert_eq!(calls.len(), 1);
    assert!(calls[0].raw.starts_with('{'));
}

#[test]
fn test_bare_tool_args_either_order() {
    let a = parser().find_tool_calls(r#"ok {"tool": "a", "args": {"x": 1}} then"#);
    let b = parser().find_tool_calls(r#"ok {"args": {"x": 1}, "tool": "a"} then"#);
    assert_eq!(a.len(), 1);
    assert_eq!(b.len(), 1);
    assert_eq!(a[0].name, b[0].name);
    assert_eq!(a[0].arguments, b[0].arguments);
}

#[test]
fn test_bare_name_arguments() {
    let text = r#"{"name": "get_weather", "arguments": {"city": "Oslo"}}"#;
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "get_weather");
    assert_eq!(calls[0].arguments["city"], "Oslo");
}

#[test]
fn test_missing_args_default_to_empty() {
    let calls = parser().find_tool_calls(r#"<tool_call>{"tool": "get_time"}</tool_call>"#);
    assert_eq!(calls.len(), 1);
    assert!(calls[0].arguments.is_empty());
}

#[test]
fn test_braces_inside_strings() {
    let text = r#"{"tool": "exec", "args": {"command": "echo '}' && echo \"{\""}}"#;
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].end, text.len());
    assert_eq!(calls[0].arguments["command"], "echo '}' && echo \"{\"");
}

// ---------------------------------------------------------------------------
// Priority and ordering
// ---------------------------------------------------------------------------

#[test]
fn test_first_syntax_with_match_wins() {
    let text = concat!(
        r#"{"tool": "bare", "args": {}}"#,
        "\n<tool_call>{\"tool\": \"tagged\", \"args\": {}}</tool_call>"
    );
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "tagged");
}

#[test]
fn test_invalid_higher_syntax_falls_through() {
    let text = "<tool_call>not json at all</tool_call> {\"tool\": \"a\", \"args\": {}}";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "a");
}

#[test]
fn test_multiple_calls_left_to_right() {
    let text = "<tool_call>{\"tool\": \"one\"}</tool_call> and <tool_call>{\"tool\": \"two\"}</tool_call>";
    let calls = parser().find_tool_calls(text);
    let names: Vec<&str> = calls.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["one", "two"]);
    assert!(calls[0].end <= calls[1].start);
    assert_ne!(calls[0].id, calls[1].id);
}

#[test]
fn test_nested_object_not_matched_twice() {
    let text = r#"{"tool": "outer", "args": {"inner": {"tool": "x", "args": {}}}}"#;
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "outer");
}

// ---------------------------------------------------------------------------
// Repair
// ---------------------------------------------------------------------------

#[test]
fn test_repair_rescues_sloppy_json() {
    let text = "<tool_call>{tool: 'read_file', args: {path: '/tmp/x',},}</tool_call>";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "read_file");
    assert_eq!(calls[0].arguments["path"], "/tmp/x");
}

#[test]
fn test_repair_can_be_disabled() {
    let text = "<tool_call>{tool: 'read_file', args: {path: '/tmp/x'}}</tool_call>";
    let strict = ToolCallParser::new().with_json_repair(false);
    assert!(!strict.json_repair());
    assert!(strict.find_tool_calls(text).is_empty());
}

#[test]
fn test_unrecognized_candidates_dropped() {
    assert!(parser()
        .find_tool_calls(r#"<tool_call>{"tool": "", "args": {}}</tool_call>"#)
        .is_empty());
    assert!(parser()
        .find_tool_calls(r#"<tool_call>{"command": "ls"}</tool_call>"#)
        .is_empty());
    assert!(parser()
        .find_tool_calls(r#"{"tool": "a", "args": [1]}"#)
        .is_empty());
}

// ---------------------------------------------------------------------------
// Removal and display
// ---------------------------------------------------------------------------

#[test]
fn test_remove_excises_bare_call_and_collapses_blank_lines() {
    let text = "Before.\n\n\n{\"tool\": \"T\", \"args\": {\"k\": [1, 2]}}\n\n\n\nAfter.";
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "T");
    assert_eq!(calls[0].arguments, args(json!({"k": [1, 2]})));

    let removed = parser().remove_tool_calls(text);
    assert_eq!(removed, "Before.\n\nAfter.");
    assert!(!removed.contains("\n\n\n"));
}

#[test]
fn test_remove_is_idempotent() {
    let texts = [
        "  a <tool_call>{\"tool\": \"x\"}</tool_call> b  ",
        "x\n\n\n\n{\"tool\": \"y\", \"args\": {}}\n\n\n\nz",
        "no calls\n\n\n\nhere",
        r#"{"tool": "only", "args": {}}"#,
        "Doing it. <tool_call>{\"tool\":\"a\",\"args\":{}}</tool_call> then {\"tool\":\"b\",\"args\":{}} done",
    ];
    for t in texts {
        let once = parser().remove_tool_calls(t);
        assert_eq!(parser().remove_tool_calls(&once), once, "{t:?}");
    }
}

#[test]
fn test_remove_strips_every_syntax() {
    let text = "Doing it. <tool_call>{\"tool\":\"a\",\"args\":{}}</tool_call> then {\"tool\":\"b\",\"args\":{}} done";
    // Detection still stops at the first syntax found.
    let calls = parser().find_tool_calls(text);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "a");

    assert_eq!(parser().remove_tool_calls(text), "Doing it.  then  done");
    assert_eq!(
        parser().convert_tool_calls_for_display(text),
        "Doing it. [Using tool: a] then [Using tool: b] done"
    );
}

#[test]
fn test_remove_only_call_leaves_empty() {
    assert_eq!(
        parser().remove_tool_calls("<tool_call>{\"tool\": \"x\"}</tool_call>"),
        ""
    );
}

#[test]
fn test_convert_for_display_replaces_in_place() {
    let text = "A <tool_call>{\"tool\": \"one\"}</tool_call> B <tool_call>{\"tool\": \"two\"}</tool_call> C";
    assert_eq!(
        parser().convert_tool_calls_for_display(text),
        "A [Using tool: one] B [Using tool: two] C"
    );
}

#[test]
fn test_to_tool_call() {
    let calls = parser().find_tool_calls(r#"{"tool": "exec", "args": {"command": "ls"}}"#);
    let call = calls[0].to_tool_call();
    assert_eq!(call.id, calls[0].id);
    assert_eq!(call.name, "exec");
    assert_eq!(call.arguments, json!({"command": "ls"}));
}

// ---------------------------------------------------------------------------
// Partial calls
// ---------------------------------------------------------------------------

#[test]
fn test_partial_calls_detected() {
    for text in [
        "Let me look.\n<tool_call>\n{\"tool\": \"read",
        "Let me look.\n<tool_",
        "```tool_call\n{\"tool\":",
        "```json\n{",
        "Sure ```",
        r#"Running {"tool": "exec", "args": {"command": "l"#,
        "Running {\"to",
    ] {
        assert!(parser().has_partial_tool_call(text), "{text:?}");
        assert!(!parser().has_tool_call(text), "{text:?}");
    }
}

#[test]
fn test_complete_or_plain_text_not_partial() {
    for text in [
        "The answer is 4.",
        "<tool_call>{\"tool\": \"x\"}</tool_call>",
        "```rust\nfn main() {\n",
        "```json\n{\"tool\": \"x\"}\n```",
        r#"{"tool": "x", "args": {}}"#,
    ] {
        assert!(!parser().has_partial_tool_call(text), "{text:?}");
    }
}
