#![cfg_attr(not(test), deny(unsafe_code))]
#![warn(
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items
)]

//! Client for the Dify integration of the admin backend: streaming and
//! blocking chat, knowledge-base datasets and their documents.

pub mod chat;
pub mod dataset;
pub mod document;
pub mod error;
mod internal;

// Re-export main types
pub use chat::{
    ChatEvent, ChatFrame, ResponseAccumulator, SendMessageRequest, SendMessageResponse,
    StreamCallbacks, consume_frames,
};
pub use dataset::{Dataset, DatasetQuery};
pub use document::{Document, DocumentQuery};
pub use error::DifyRequestError;

// Re-export types from admin-ox-common for convenience
pub use admin_ox_common::{PageParam, PageResult};

use bon::Builder;
use core::fmt;
use std::time::Duration;
#[cfg(feature = "leaky-bucket")]
use leaky_bucket::RateLimiter;
#[cfg(feature = "leaky-bucket")]
use std::sync::Arc;

use crate::internal::DifyRequestHelper;

const BASE_URL: &str = "http://localhost:48080/admin-api";

/// Budget for a whole streaming chat call, request included.
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Session credentials presented to the admin backend.
#[derive(Clone, Default, PartialEq, Eq, Builder)]
pub struct Credentials {
    /// Sent as `Authorization: Bearer <token>`
    #[builder(into)]
    pub access_token: Option<String>,
    /// Sent as `tenant-id`
    #[builder(into)]
    pub tenant_id: Option<String>,
    /// Sent as `visit-tenant-id`
    #[builder(into)]
    pub visit_tenant_id: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("tenant_id", &self.tenant_id)
            .field("visit_tenant_id", &self.visit_tenant_id)
            .finish()
    }
}

#[derive(Clone, Builder)]
pub struct Dify {
    #[builder(default = BASE_URL.to_string(), into)]
    pub(crate) base_url: String,
    #[builder(default)]
    pub(crate) credentials: Credentials,
    #[builder(default)]
    pub(crate) client: reqwest::Client,
    #[cfg(feature = "leaky-bucket")]
    pub(crate) leaky_bucket: Option<Arc<RateLimiter>>,
}

impl Default for Dify {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl Dify {
    /// Create a client for `base_url` with the given session credentials.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::builder()
            .base_url(base_url)
            .credentials(credentials)
            .build()
    }

    /// Read `DIFY_API_URL`, `DIFY_ACCESS_TOKEN`, `DIFY_TENANT_ID` and
    /// `DIFY_VISIT_TENANT_ID`. Only the URL is required.
    pub fn load_from_env() -> Result<Self, std::env::VarError> {
        let base_url = std::env::var("DIFY_API_URL")?;
        let credentials = Credentials::builder()
            .maybe_access_token(std::env::var("DIFY_ACCESS_TOKEN").ok())
            .maybe_tenant_id(std::env::var("DIFY_TENANT_ID").ok())
            .maybe_visit_tenant_id(std::env::var("DIFY_VISIT_TENANT_ID").ok())
            .build();
        Ok(Self::new(base_url, credentials))
    }

    /// Same client, different session.
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            credentials,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Create request helper for internal use
    fn request_helper(&self) -> DifyRequestHelper {
        DifyRequestHelper::new(self.client.clone(), &self.base_url, &self.credentials)
    }

    /// Wait for the rate limiter, if one is configured
    async fn throttle(&self) {
        #[cfg(feature = "leaky-bucket")]
        if let Some(ref limiter) = self.leaky_bucket {
            limiter.acquire_one().await;
        }
    }
}

impl fmt::Debug for Dify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dify")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}
