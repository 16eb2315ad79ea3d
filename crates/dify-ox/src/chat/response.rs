use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Decode a field, falling back to its default when the backend sends a
/// value of another shape (`null`, a number where a string is expected, ...)
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Seconds
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prompt_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub completion_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub prompt_price: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub completion_price: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub total_price: Option<String>,
}

impl UsageInfo {
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
            .unwrap_or_else(|| self.prompt_tokens.unwrap_or(0) + self.completion_tokens.unwrap_or(0))
    }
}

/// A knowledge-base segment the answer was grounded on
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrieverResource {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub data_source_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataInfo {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageInfo>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Vec::is_empty")]
    pub retriever_resources: Vec<RetrieverResource>,
}

/// Final answer of a chat call, blocking or accumulated from a stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub answer: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataInfo>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Unix seconds
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
    /// Fields the backend sends that have no dedicated slot
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SendMessageResponse {
    #[must_use]
    pub fn usage(&self) -> Option<&UsageInfo> {
        self.metadata.as_ref().and_then(|m| m.usage.as_ref())
    }

    #[must_use]
    pub fn retriever_resources(&self) -> &[RetrieverResource] {
        self.metadata
            .as_ref()
            .map(|m| m.retriever_resources.as_slice())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// One exchange in a conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    pub query: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Value>,
    pub conversation_id: String,
    #[serde(default)]
    pub message_files: Vec<Value>,
    #[serde(default)]
    pub retriever_resources: Vec<RetrieverResource>,
    #[serde(default)]
    pub agent_thoughts: Vec<Value>,
    /// Unix seconds
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Success,
    Error,
}

/// Flattened message suitable for rendering a chat transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl ChatMessage {
    /// Split the exchange into the user's turn followed by the assistant's.
    #[must_use]
    pub fn to_display_messages(&self) -> [DisplayMessage; 2] {
        let create_time = DateTime::from_timestamp(self.created_at, 0);
        let turn = |role, content: &str| DisplayMessage {
            id: Some(self.id.clone()),
            conversation_id: Some(self.conversation_id.clone()),
            role,
            content: content.to_string(),
            create_time,
            tokens: None,
            status: Some(MessageStatus::Success),
        };
        [turn(Role::User, &self.query), turn(Role::Assistant, &self.answer)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePage {
    #[serde(default)]
    pub data: Vec<ChatMessage>,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationPage {
    #[serde(default)]
    pub data: Vec<Conversation>,
    #[serde(default)]
    pub limit: u32,
}

/// Follow-up questions proposed after an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedQuestions {
    pub result: String,
    /// JSON-encoded array of strings
    pub data: String,
}

impl SuggestedQuestions {
    pub fn questions(&self) -> Result<Vec<String>, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_keeps_unknown_fields() {
        let response: SendMessageResponse = serde_json::from_value(json!({
            "event": "message_end",
            "answer": "Hi",
            "conversation_id": "c-1",
            "metadata": {"usage": {"prompt_tokens": 3, "completion_tokens": 2}},
            "workflow_run_id": "w-9"
        }))
        .unwrap();

        assert_eq!(response.answer, "Hi");
        assert_eq!(response.usage().map(UsageInfo::total_tokens), Some(5));
        assert!(response.retriever_resources().is_empty());
        assert_eq!(response.extra["workflow_run_id"], "w-9");
    }

    #[test]
    fn test_created_at_conversion() {
        let response = SendMessageResponse {
            created_at: Some(1_705_395_332),
            ..SendMessageResponse::default()
        };
        assert_eq!(
            response.created_at().map(|t| t.to_rfc3339()),
            Some("2024-01-16T08:55:32+00:00".to_string())
        );
    }

    #[test]
    fn test_display_messages_order() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": "m-1",
            "query": "What is Rust?",
            "answer": "A language.",
            "conversation_id": "c-1",
            "created_at": 1_705_395_332
        }))
        .unwrap();

        let [user, assistant] = message.to_display_messages();
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "What is Rust?");
        assert_eq!(assistant.role, Role::Assistant);
        assert_eq!(assistant.content, "A language.");
        assert_eq!(assistant.status, Some(MessageStatus::Success));
    }

    #[test]
    fn test_suggested_questions_decoding() {
        let suggested = SuggestedQuestions {
            result: "success".to_string(),
            data: r#"["Why?","How?"]"#.to_string(),
        };
        assert_eq!(suggested.questions().unwrap(), vec!["Why?", "How?"]);
    }
}
