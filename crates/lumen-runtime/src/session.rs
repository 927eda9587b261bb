//! Conversation sessions.
//!
//! A session is the durable conversation history for one session key. Only
//! user-visible turns are stored; tool-call and tool-result turns live for the
//! duration of a run and are not persisted.

use chrono::{DateTime, Utc};
use lumen_core::{MediaRef, SessionKey};
use lumen_llm::{ContentPart, Message};
use serde::{Deserialize, Serialize};

/// Author of a stored message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRole {
    /// The human.
    User,
    /// The model.
    Assistant,
    /// Injected instructions.
    System,
}

/// One stored conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    /// Who wrote it.
    pub role: SessionRole,
    /// Visible text.
    pub content: String,
    /// When it was added.
    pub timestamp: DateTime<Utc>,
    /// Attached media.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaRef>,
    /// Raw streamed text before tool-call syntax was stripped, kept only when
    /// it differs from `content`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_process: Option<String>,
}

impl SessionMessage {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(SessionRole::User, content)
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(SessionRole::Assistant, content)
    }

    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(SessionRole::System, content)
    }

    fn new(role: SessionRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            media: Vec::new(),
            thought_process: None,
        }
    }

    /// Attach media.
    #[must_use]
    pub fn with_media(mut self, media: Vec<MediaRef>) -> Self {
        self.media = media;
        self
    }

    /// Attach the raw streamed text, if it differs from the visible content.
    #[must_use]
    pub fn with_thought_process(mut self, raw: Option<String>) -> Self {
        self.thought_process = raw.filter(|r| r.trim() != self.content.trim());
        self
    }

    /// Convert to a provider message.
    #[must_use]
    pub fn to_message(&self) -> Message {
        match self.role {
            SessionRole::User if !self.media.is_empty() => {
                let mut parts = vec![ContentPart::Text {
                    text: self.content.clone(),
                }];
                parts.extend(self.media.iter().map(|m| ContentPart::Media {
                    mime_type: m.mime_type.clone(),
                    uri: m.uri.clone(),
                }));
                Message::user_with_parts(parts)
            },
            SessionRole::User => Message::user(&self.content),
            SessionRole::Assistant => Message::assistant(&self.content),
            SessionRole::System => Message::system(&self.content),
        }
    }
}

/// Durable conversation history for one session key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session key.
    pub key: SessionKey,
    /// Messages in conversation order.
    pub messages: Vec<SessionMessage>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session.
    #[must_use]
    pub fn new(key: SessionKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message and bump `updated_at`.
    pub fn add_message(&mut self, message: SessionMessage) {
        self.updated_at = message.timestamp.max(self.updated_at);
        self.messages.push(message);
    }

    /// The history as provider messages.
    #[must_use]
    pub fn to_messages(&self) -> Vec<Message> {
        self.messages.iter().map(SessionMessage::to_message).collect()
    }

    /// Number of stored messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been said yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message, if any.
    #[must_use]
    pub fn last_message(&self) -> Option<&SessionMessage> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_llm::{MessageContent, MessageRole};

    #[test]
    fn test_add_message_bumps_updated_at() {
        let mut session = Session::new(SessionKey::new("chat"));
        let created = session.created_at;
        session.add_message(SessionMessage::user("hi"));
        assert_eq!(session.len(), 1);
        assert!(session.updated_at >= created);
    }

    #[test]
    fn test_thought_process_dropped_when_identical() {
        let msg = SessionMessage::assistant("4").with_thought_process(Some(" 4 ".into()));
        assert!(msg.thought_process.is_none());

        let msg = SessionMessage::assistant("4")
            .with_thought_process(Some("<tool_call>{}</tool_call> 4".into()));
        assert!(msg.thought_process.is_some());
    }

    #[test]
    fn test_user_media_becomes_multipart() {
        let msg = SessionMessage::user("look")
            .with_media(vec![MediaRef::new("image/png", "/tmp/cat.png")])
            .to_message();
        assert_eq!(msg.role, MessageRole::User);
        match msg.content {
            MessageContent::MultiPart(parts) => assert_eq!(parts.len(), 2),
            other => panic!("expected multipart, got {other:?}"),
        }
    }

    #[test]
    fn test_serde_omits_empty_optionals() {
        let json = serde_json::to_value(SessionMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("media").is_none());
        assert!(json.get("thought_process").is_none());
    }
}
