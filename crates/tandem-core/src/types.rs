use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Platform-assigned thread identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role in a chat-completion conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message sent to an LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Stop reason from the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ContentFilter,
}

/// A streaming delta from the LLM.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A chunk of text content.
    TextDelta(String),

    /// The response is complete.
    Stop(StopReason),

    /// Usage information.
    Usage {
        input_tokens: u64,
        output_tokens: u64,
    },
}

/// Kind of a conversation turn stored on the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Human,
    Ai,
    System,
    Tool,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Human => "human",
            MessageKind::Ai => "ai",
            MessageKind::System => "system",
            MessageKind::Tool => "tool",
        }
    }
}

/// A turn whose shape is known: a `type` tag and plain-text `content`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypedMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub content: String,
}

impl TypedMessage {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Ai,
            content: content.into(),
        }
    }
}

/// One conversation turn as it travels to and from the platform.
///
/// Turns that match the `{type, content}` schema deserialize as `Typed`;
/// anything else (list content, unknown types, bare strings) is kept verbatim
/// as `Untyped`. Both variants answer the same accessors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Message {
    Typed(TypedMessage),
    Untyped(Value),
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Message::Typed(TypedMessage::human(content))
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::Typed(TypedMessage::ai(content))
    }

    /// The `type` tag, if the turn carries one.
    pub fn kind(&self) -> Option<&str> {
        match self {
            Message::Typed(m) => Some(m.kind.as_str()),
            Message::Untyped(v) => v.get("type").and_then(Value::as_str),
        }
    }

    pub fn is_ai(&self) -> bool {
        self.kind() == Some("ai")
    }

    /// The turn's `content` rendered as text, if it has a content field.
    pub fn content_text(&self) -> Option<String> {
        match self {
            Message::Typed(m) => Some(m.content.clone()),
            Message::Untyped(v) => v.get("content").map(value_to_text),
        }
    }

    /// Content if present, otherwise the whole turn stringified.
    pub fn text(&self) -> String {
        match self {
            Message::Typed(m) => m.content.clone(),
            Message::Untyped(v) => v
                .get("content")
                .map(value_to_text)
                .unwrap_or_else(|| value_to_text(v)),
        }
    }
}

impl From<Value> for Message {
    fn from(value: Value) -> Self {
        serde_json::from_value::<TypedMessage>(value.clone())
            .map(Message::Typed)
            .unwrap_or(Message::Untyped(value))
    }
}

/// Render a JSON value as display text. Strings come out without quotes.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Outcome of one math-agent invocation on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Extracted answer text.
    pub answer: String,
    pub thread_id: ThreadId,
    /// Whether the thread was created for this call.
    pub is_new_thread: bool,
    #[serde(default)]
    pub run_id: Option<String>,
    /// Set when completion was observed only on a best-effort basis.
    #[serde(default)]
    pub warning: Option<String>,
    /// The raw completion payload the answer was extracted from.
    #[serde(default)]
    pub payload: Value,
}

/// One (generate question, answer question) cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundRecord {
    /// 1-based round index.
    pub round: usize,
    pub generated_question: Option<String>,
    pub answer: Option<String>,
    pub error: Option<String>,
}

impl RoundRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub step1_thread_id: Option<ThreadId>,
    pub step1_run_id: Option<String>,
    pub total_question_rounds: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Aggregate of one workflow invocation.
///
/// `question_rounds` is always a prefix of the requested rounds: it ends at
/// the first failed round, inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub original_query: String,
    pub step1_math_result: Option<String>,
    pub question_rounds: Vec<RoundRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub workflow_metadata: WorkflowMetadata,
}

impl WorkflowResult {
    /// Number of rounds that produced an answer.
    pub fn completed_rounds(&self) -> usize {
        self.question_rounds.iter().filter(|r| r.succeeded()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_from_value_typed() {
        let msg = Message::from(json!({"type": "ai", "content": "42", "id": "run-1"}));
        assert!(matches!(msg, Message::Typed(_)));
        assert!(msg.is_ai());
        assert_eq!(msg.text(), "42");
    }

    #[test]
    fn test_message_from_value_untyped_list_content() {
        let msg = Message::from(json!({"type": "ai", "content": [{"text": "hi"}]}));
        assert!(matches!(msg, Message::Untyped(_)));
        assert!(msg.is_ai());
        assert_eq!(msg.text(), r#"[{"text":"hi"}]"#);
    }

    #[test]
    fn test_message_without_content_stringifies() {
        let msg = Message::from(json!({"role": "assistant"}));
        assert_eq!(msg.kind(), None);
        assert_eq!(msg.content_text(), None);
        assert_eq!(msg.text(), r#"{"role":"assistant"}"#);
    }

    #[test]
    fn test_bare_string_message() {
        let msg = Message::from(json!("plain"));
        assert_eq!(msg.text(), "plain");
    }

    #[test]
    fn test_typed_message_serializes_with_type_tag() {
        let value = serde_json::to_value(Message::human("What is 2 + 3?")).unwrap();
        assert_eq!(value, json!({"type": "human", "content": "What is 2 + 3?"}));
    }

    #[test]
    fn test_thread_id_is_transparent() {
        let id: ThreadId = serde_json::from_value(json!("t-1")).unwrap();
        assert_eq!(id, ThreadId::from_str("t-1"));
        assert_eq!(id.to_string(), "t-1");
    }
}
