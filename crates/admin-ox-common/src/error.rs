use thiserror::Error;

/// Common errors that can occur in admin backend HTTP requests
#[derive(Error, Debug)]
pub enum CommonRequestError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server answered with a non-success status code
    #[error("HTTP error! status: {status}: {message}")]
    Status { status: u16, message: String },

    /// Server answered 2xx but the envelope carried a non-zero code
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// The response carried no readable body
    #[error("No response body")]
    NoBody,

    /// Reading the response body failed mid-stream
    #[error("Stream read failed: {0}")]
    Stream(String),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Response decoded but did not have the expected shape
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Invalid MIME type for file upload
    #[error("Invalid MIME type: {0}")]
    InvalidMimeType(String),
}

/// Parse error response from HTTP status and body
pub fn parse_error_response(status: reqwest::StatusCode, body: &bytes::Bytes) -> CommonRequestError {
    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|json| extract_error_message(&json))
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned());

    CommonRequestError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Extract error message from the JSON error shapes the backend produces
fn extract_error_message(json: &serde_json::Value) -> Option<String> {
    // Admin backend envelope: {"code": 500, "msg": "..."}
    if let Some(msg) = json.get("msg").and_then(serde_json::Value::as_str) {
        return Some(msg.to_string());
    }

    // Upstream Dify format: {"code": "...", "message": "...", "status": 400}
    if let Some(message) = json.get("message").and_then(serde_json::Value::as_str) {
        return Some(message.to_string());
    }

    // Nested {"error": {"message": "..."}}
    json.get("error")
        .and_then(|error| error.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}
