#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Shared HTTP client abstractions for admin backend clients
//!
//! The admin backend wraps every JSON payload in a `{code, data, msg}` envelope
//! and streams chat output as `data:` prefixed lines. This crate owns both
//! conventions so provider clients only describe endpoints and payloads.

pub mod envelope;
pub mod error;
pub mod request_builder;
pub mod streaming;

pub use envelope::{CommonResult, PageParam, PageResult};
pub use error::CommonRequestError;
pub use request_builder::{Endpoint, HttpMethod, MultipartForm, RequestBuilder, RequestConfig};
pub use streaming::{FrameLine, FrameParser};

/// Re-export common types for convenience
pub use futures_util::stream::BoxStream;
pub use serde::{Deserialize, Serialize};
