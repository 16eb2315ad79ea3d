use admin_ox_common::{
    BoxStream, CommonRequestError,
    request_builder::{Endpoint, RequestBuilder, RequestConfig},
    streaming::Frame,
};
use serde::{Deserialize, Serialize};

use crate::{Credentials, DifyRequestError};

/// Identifies this client in the backend's access logs
const USER_AGENT: &str = concat!("dify-ox/", env!("CARGO_PKG_VERSION"));

/// Dify client helper methods using the common `RequestBuilder`
#[derive(Debug, Clone)]
pub struct DifyRequestHelper {
    request_builder: RequestBuilder,
}

impl DifyRequestHelper {
    pub fn new(client: reqwest::Client, base_url: &str, credentials: &Credentials) -> Self {
        let mut config = RequestConfig::new(base_url).with_user_agent(USER_AGENT);

        if let Some(ref token) = credentials.access_token {
            config = config.with_bearer_token(token);
        }
        if let Some(ref tenant_id) = credentials.tenant_id {
            config = config.with_header("tenant-id", tenant_id);
        }
        if let Some(ref visit_tenant_id) = credentials.visit_tenant_id {
            config = config.with_header("visit-tenant-id", visit_tenant_id);
        }

        Self {
            request_builder: RequestBuilder::new(client, config),
        }
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, DifyRequestError> {
        Ok(self.request_builder.request(endpoint).await?)
    }

    pub async fn get_optional<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Option<T>, DifyRequestError> {
        Ok(self.request_builder.request_optional(endpoint).await?)
    }

    pub async fn send<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, DifyRequestError> {
        Ok(self.request_builder.request_json(endpoint, body).await?)
    }

    pub async fn send_unit<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<(), DifyRequestError> {
        Ok(self.request_builder.request_unit(endpoint, body).await?)
    }

    pub async fn download(&self, endpoint: &Endpoint) -> Result<bytes::Bytes, DifyRequestError> {
        Ok(self.request_builder.request_bytes(endpoint).await?)
    }

    pub async fn upload<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
        form: reqwest::multipart::Form,
    ) -> Result<T, DifyRequestError> {
        Ok(self.request_builder.request_multipart(endpoint, form).await?)
    }

    pub fn stream<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> BoxStream<'static, Result<Frame, CommonRequestError>> {
        self.request_builder.stream_frames(endpoint, body)
    }
}
