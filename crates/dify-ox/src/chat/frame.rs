use std::str::FromStr;

use serde::Deserialize;
use serde_json::{Map, Value};
use strum::EnumString;

use crate::chat::SendMessageResponse;

/// Value of a frame's `event` field
#[derive(Debug, Clone, PartialEq, Eq, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ChatEvent {
    /// Carries the next answer fragment
    Message,
    /// Terminal frame with usage and retrieval metadata
    MessageEnd,
    /// Anything else (`ping`, `agent_thought`, `workflow_started`, ...)
    #[strum(default)]
    Other(String),
}

/// One decoded event of a streaming chat response.
///
/// The whole JSON object is kept so pass-through fields survive into the
/// final [`SendMessageResponse`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatFrame {
    fields: Map<String, Value>,
}

impl From<Map<String, Value>> for ChatFrame {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl ChatFrame {
    #[must_use]
    pub fn event(&self) -> ChatEvent {
        let name = self.fields.get("event").and_then(Value::as_str).unwrap_or_default();
        ChatEvent::from_str(name).unwrap_or_else(|_| ChatEvent::Other(name.to_string()))
    }

    /// Answer fragment, empty when the frame has none
    #[must_use]
    pub fn answer(&self) -> &str {
        self.fields.get("answer").and_then(Value::as_str).unwrap_or_default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn into_fields(self) -> Map<String, Value> {
        self.fields
    }
}

/// Running aggregate of a streamed answer.
///
/// Fragments are concatenated in arrival order; every other field is merged
/// shallowly with later frames winning. `answer` is always the concatenation.
#[derive(Debug, Clone, Default)]
pub struct ResponseAccumulator {
    answer: String,
    fields: Map<String, Value>,
}

impl ResponseAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `message` frame and return its fragment
    pub fn push_message(&mut self, frame: ChatFrame) -> String {
        let fragment = frame.answer().to_string();
        self.answer.push_str(&fragment);
        self.merge(frame);
        fragment
    }

    /// Merge a frame's fields without touching the answer
    pub fn merge(&mut self, frame: ChatFrame) {
        self.fields.extend(frame.into_fields());
    }

    /// Answer accumulated so far
    #[must_use]
    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// Final response. Typed fields of an unexpected shape decode as empty;
    /// the accumulated answer is always delivered.
    #[must_use]
    pub fn finish(self) -> SendMessageResponse {
        let Self { answer, mut fields } = self;
        fields.insert("answer".to_string(), Value::String(answer));
        let merged = Value::Object(fields);

        match SendMessageResponse::deserialize(&merged) {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Keeping stream metadata undecoded: {e}");
                let Value::Object(mut extra) = merged else {
                    return SendMessageResponse::default();
                };
                let answer = match extra.remove("answer") {
                    Some(Value::String(answer)) => answer,
                    _ => String::new(),
                };
                SendMessageResponse {
                    answer,
                    extra,
                    ..SendMessageResponse::default()
                }
            }
        }
    }
}
