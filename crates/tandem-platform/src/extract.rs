//! Picking the answer text out of a conversation of unknown shape.

use serde_json::Value;

use tandem_core::types::Message;

/// Returned when there are no turns at all.
pub const NO_RESULT: &str = "No result generated";

/// Text of the most recent `ai` turn.
///
/// Falls back to the last turn of any kind, then to [`NO_RESULT`].
pub fn extract_last_assistant_text(messages: &[Message]) -> String {
    if let Some(ai) = messages.iter().rev().find(|m| m.is_ai()) {
        return ai.content_text().unwrap_or_default();
    }

    match messages.last() {
        Some(last) => last.text(),
        None => NO_RESULT.to_string(),
    }
}

/// Convert a JSON `messages` value into turns.
///
/// A non-array value is treated as a single turn; `null` as no turns.
pub fn messages_from_value(value: &Value) -> Vec<Message> {
    match value {
        Value::Array(items) => items.iter().cloned().map(Message::from).collect(),
        Value::Null => Vec::new(),
        other => vec![Message::from(other.clone())],
    }
}

/// Shorthand for extracting straight from a JSON `messages` value.
pub fn extract_from_value(value: &Value) -> String {
    extract_last_assistant_text(&messages_from_value(value))
}
