//! Recovery of answers disguised as tool calls.
//!
//! Some models ignore the calling convention and print a tool-call-shaped
//! JSON document as their whole reply. When its arguments carry a plausible
//! answer string, that string is the real answer.

use serde_json::Value;

use super::repair::repair;
use super::shape::resolve;

/// Argument keys that usually hold the answer text, in lookup order.
const ANSWER_KEYS: &[&str] = &["text", "content", "message", "response", "answer", "reply"];

/// Tools whose only job is to say something.
const SPEAK_LIKE_TOOLS: &[&str] = &["speak", "say", "tts", "respond", "reply"];

/// Extract the answer from a reply that is entirely a disguised tool call.
///
/// Returns `None` unless the trimmed text is a single JSON object in a tool
/// call shape with a non-empty answer string in its arguments. Malformed JSON
/// goes through the repair step only when `json_repair` is set.
pub(super) fn extract_disguised_answer(text: &str, json_repair: bool) -> Option<String> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
        return None;
    }

    let value = serde_json::from_str::<Value>(trimmed).ok().or_else(|| {
        if json_repair {
            serde_json::from_str(&repair(trimmed)?).ok()
        } else {
            None
        }
    })?;
    let call = resolve(&value)?;

    let by_key = ANSWER_KEYS.iter().find_map(|key| non_empty_str(call.arguments.get(*key)));
    if by_key.is_some() {
        return by_key;
    }

    if SPEAK_LIKE_TOOLS.contains(&call.name.as_str()) {
        return call.arguments.values().find_map(|v| non_empty_str(Some(v)));
    }
    None
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_key_unwrapped() {
        assert_eq!(
            extract_disguised_answer(r#"{"tool": "final_answer", "args": {"response": "4"}}"#, true),
            Some("4".to_string())
        );
        assert_eq!(
            extract_disguised_answer(r#" {"name": "reply_user", "arguments": {"message": "Hi!"}} "#, true),
            Some("Hi!".to_string())
        );
    }

    #[test]
    fn test_key_precedence() {
        assert_eq!(
            extract_disguised_answer(
                r#"{"tool": "x", "args": {"reply": "second", "text": "first"}}"#,
                true
            ),
            Some("first".to_string())
        );
    }

    #[test]
    fn test_speak_like_any_string_arg() {
        assert_eq!(
            extract_disguised_answer(r#"{"tool": "speak", "args": {"utterance": "Hello there"}}"#, true),
            Some("Hello there".to_string())
        );
        assert_eq!(
            extract_disguised_answer(r#"{"tool": "get_time", "args": {"utterance": "Hello"}}"#, true),
            None
        );
    }

    #[test]
    fn test_repaired_json() {
        let malformed = "{'tool': 'say', 'args': {'text': 'ok',}}";
        assert_eq!(
            extract_disguised_answer(malformed, true),
            Some("ok".to_string())
        );
        assert_eq!(extract_disguised_answer(malformed, false), None);
    }

    #[test]
    fn test_not_disguised() {
        assert_eq!(extract_disguised_answer("The answer is 4.", true), None);
        assert_eq!(
            extract_disguised_answer(r#"Sure: {"tool": "x", "args": {"text": "a"}}"#, true),
            None
        );
        assert_eq!(extract_disguised_answer(r#"{"result": "4"}"#, true), None);
        assert_eq!(
            extract_disguised_answer(r#"{"tool": "x", "args": {"text": "   "}}"#, true),
            None
        );
    }
}
