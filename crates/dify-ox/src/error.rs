use std::time::Duration;

use admin_ox_common::CommonRequestError;
use thiserror::Error;

/// Errors that can occur when talking to the Dify endpoints of the admin backend
#[derive(Debug, Error)]
pub enum DifyRequestError {
    /// Transport failure before a response arrived
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    /// Non-2xx HTTP status
    #[error("HTTP error! status: {status}: {message}")]
    Http { status: u16, message: String },

    /// 2xx response whose envelope reports a failure
    #[error("API error {code}: {msg}")]
    Api { code: i64, msg: String },

    /// The streaming response had no readable body
    #[error("No response body reader")]
    NoBody,

    /// Reading or decoding the stream failed mid-way
    #[error("Stream error: {0}")]
    Stream(String),

    /// The streaming operation did not settle in time
    #[error("Stream timeout after {}s", .0.as_secs())]
    Timeout(Duration),

    /// Request rejected before being sent
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unexpected response from the API
    #[error("Unexpected response from API: {0}")]
    UnexpectedResponse(String),
}

impl DifyRequestError {
    /// HTTP status of the failed call, if the server answered at all
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::ReqwestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<CommonRequestError> for DifyRequestError {
    fn from(err: CommonRequestError) -> Self {
        match err {
            CommonRequestError::Http(e) => Self::ReqwestError(e),
            CommonRequestError::Json(e) => Self::SerdeError(e),
            CommonRequestError::Status { status, message } => Self::Http { status, message },
            CommonRequestError::Api { code, msg } => Self::Api { code, msg },
            CommonRequestError::NoBody => Self::NoBody,
            CommonRequestError::Stream(msg) => Self::Stream(msg),
            CommonRequestError::Utf8Error(e) => Self::Stream(e.to_string()),
            CommonRequestError::UnexpectedResponse(msg) => Self::UnexpectedResponse(msg),
            CommonRequestError::InvalidMimeType(mime) => {
                Self::InvalidRequest(format!("invalid MIME type: {mime}"))
            }
        }
    }
}
