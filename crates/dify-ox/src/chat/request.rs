use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DifyRequestError;

/// How the backend should deliver the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Streaming,
    Blocking,
}

/// A file attached to a chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
pub struct FileInfo {
    #[builder(into)]
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// `remote_url` or `local_file`
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_method: Option<String>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(builder_type(vis = "pub"), state_mod(vis = "pub"))]
pub struct SendMessageRequest {
    /// Values for the variables the Dify app defines
    #[builder(field)]
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// The user's question
    #[builder(into)]
    pub query: String,
    /// End-user identifier
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
    /// Continue an existing conversation
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_generate_name: Option<bool>,
}

impl<S: send_message_request_builder::State> SendMessageRequestBuilder<S> {
    pub fn inputs(mut self, inputs: Map<String, Value>) -> Self {
        self.inputs = inputs;
        self
    }

    pub fn input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(key.into(), value.into());
        self
    }
}

impl SendMessageRequest {
    /// Plain question with no inputs, attachments or conversation.
    pub fn new(query: impl Into<String>) -> Self {
        Self::builder().query(query).build()
    }

    /// Reject requests the backend would refuse anyway
    pub fn validate(&self) -> Result<(), DifyRequestError> {
        if self.query.trim().is_empty() {
            return Err(DifyRequestError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy of this request with the delivery mode forced
    #[must_use]
    pub fn with_response_mode(&self, mode: ResponseMode) -> Self {
        Self {
            response_mode: Some(mode),
            ..self.clone()
        }
    }
}
