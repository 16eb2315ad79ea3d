use crate::{
    envelope::CommonResult,
    error::{self, CommonRequestError},
    streaming::{Frame, FrameParser},
};
use async_stream::try_stream;
use futures_util::stream::BoxStream;
use reqwest::{
    Method, RequestBuilder as ReqwestRequestBuilder, Response, StatusCode,
    header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE, USER_AGENT},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};

/// HTTP method for API endpoints
#[derive(Debug, Clone)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Represents an API endpoint with its configuration
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: String,
    pub method: HttpMethod,
    pub query_params: Option<Vec<(String, String)>>,
    pub timeout: Option<Duration>,
}

impl Endpoint {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            query_params: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_query_params(mut self, params: Vec<(String, String)>) -> Self {
        self.query_params = Some(params);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Configuration for request building
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>`
    pub bearer_token: Option<String>,
    pub default_headers: HashMap<String, String>,
    pub user_agent: Option<String>,
}

impl RequestConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bearer_token: None,
            default_headers: HashMap::new(),
            user_agent: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Generic request builder that handles the backend's common HTTP patterns
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    client: reqwest::Client,
    config: RequestConfig,
}

impl RequestBuilder {
    pub fn new(client: reqwest::Client, config: RequestConfig) -> Self {
        Self { client, config }
    }

    #[must_use]
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Build a reqwest `RequestBuilder` for the given endpoint
    pub fn build_request(&self, endpoint: &Endpoint) -> ReqwestRequestBuilder {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            endpoint.path.trim_start_matches('/')
        );
        let method: Method = endpoint.method.clone().into();

        let mut req = self.client.request(method, &url);

        if let Some(ref params) = endpoint.query_params {
            req = req.query(&params);
        }

        if let Some(ref token) = self.config.bearer_token {
            req = req.bearer_auth(token);
        }

        for (key, value) in &self.config.default_headers {
            req = req.header(key, value);
        }

        if let Some(ref user_agent) = self.config.user_agent {
            req = req.header(USER_AGENT, user_agent);
        }

        if let Some(timeout) = endpoint.timeout {
            req = req.timeout(timeout);
        }

        req
    }

    /// Execute a request with JSON body and return the unwrapped envelope payload
    pub async fn request_json<T: for<'de> Deserialize<'de>, B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<T, CommonRequestError> {
        let res = self.send_json(endpoint, body).await?;
        Self::read_envelope::<T>(res).await?.into_data()
    }

    /// Execute a request without body and return the unwrapped envelope payload
    pub async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<T, CommonRequestError> {
        self.request_json::<T, ()>(endpoint, None).await
    }

    /// Execute a request without body whose envelope payload may be `null`
    pub async fn request_optional<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Option<T>, CommonRequestError> {
        let res = self.send_json::<()>(endpoint, None).await?;
        let envelope = Self::read_envelope::<T>(res).await?;
        if envelope.is_success() {
            Ok(envelope.data)
        } else {
            envelope.into_unit().map(|()| None)
        }
    }

    /// Execute a request whose envelope payload carries no information
    pub async fn request_unit<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<(), CommonRequestError> {
        let res = self.send_json(endpoint, body).await?;
        Self::read_envelope::<serde_json::Value>(res).await?.into_unit()
    }

    /// Execute a request and return raw bytes (for spreadsheet exports)
    pub async fn request_bytes(
        &self,
        endpoint: &Endpoint,
    ) -> Result<bytes::Bytes, CommonRequestError> {
        let res = self.build_request(endpoint).send().await?;
        let status = res.status();
        let is_json = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        let bytes = res.bytes().await?;

        if !status.is_success() {
            return Err(error::parse_error_response(status, &bytes));
        }

        // A failed export is reported as a JSON envelope instead of a file
        if is_json {
            if let Ok(envelope) = serde_json::from_slice::<CommonResult<serde_json::Value>>(&bytes) {
                envelope.into_unit()?;
            }
        }

        Ok(bytes)
    }

    /// Execute a multipart form request (for file uploads)
    pub async fn request_multipart<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &Endpoint,
        form: reqwest::multipart::Form,
    ) -> Result<T, CommonRequestError> {
        let res = self.build_request(endpoint).multipart(form).send().await?;
        Self::read_envelope::<T>(res).await?.into_data()
    }

    /// Execute a streaming request and yield its `data:` frames.
    ///
    /// The request is only sent once the returned stream is first polled.
    pub fn stream_frames<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> BoxStream<'static, Result<Frame, CommonRequestError>> {
        let req = self
            .build_request(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        let payload = serde_json::to_value(body);
        let path = endpoint.path.clone();

        Box::pin(try_stream! {
            let req = req.json(&payload?);
            log::debug!("Opening frame stream on {path}");

            let response = req.send().await?;
            let status = response.status();

            if !status.is_success() {
                let bytes = response.bytes().await?;
                Err::<(), _>(error::parse_error_response(status, &bytes))?;
            } else if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
                Err::<(), _>(CommonRequestError::NoBody)?;
            } else {
                let mut parser = FrameParser::new(response);

                while let Some(frame) = parser.next_frame().await? {
                    yield frame;
                }
            }
        })
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> Result<Response, CommonRequestError> {
        let mut req = self.build_request(endpoint);

        if let Some(body) = body {
            req = req.json(body);
        }

        log::debug!("{:?} {}", endpoint.method, endpoint.path);
        Ok(req.send().await?)
    }

    /// Decode the `{code, data, msg}` envelope, mapping HTTP failures first
    async fn read_envelope<T: for<'de> Deserialize<'de>>(
        res: Response,
    ) -> Result<CommonResult<T>, CommonRequestError> {
        let status = res.status();
        let bytes = res.bytes().await?;

        if !status.is_success() {
            return Err(error::parse_error_response(status, &bytes));
        }

        serde_json::from_slice::<CommonResult<T>>(&bytes).map_err(|e| {
            let body_str = String::from_utf8_lossy(&bytes);
            CommonRequestError::UnexpectedResponse(format!(
                "HTTP {} but failed to decode JSON: {}; body: {}",
                status.as_u16(),
                e,
                body_str
            ))
        })
    }
}

/// Helper struct for building multipart forms
pub struct MultipartForm {
    form: reqwest::multipart::Form,
}

impl MultipartForm {
    /// Create a new multipart form
    #[must_use]
    pub fn new() -> Self {
        Self {
            form: reqwest::multipart::Form::new(),
        }
    }

    /// Add a text field
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form = self.form.text(name.into(), value.into());
        self
    }

    /// Add a file from bytes with an explicit mime type
    pub fn file_from_bytes_with_mime(
        mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<Self, CommonRequestError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.into())
            .mime_str(mime_type)
            .map_err(|_| CommonRequestError::InvalidMimeType(mime_type.to_string()))?;
        self.form = self.form.part(name.into(), part);
        Ok(self)
    }

    /// Build the final form
    #[must_use]
    pub fn build(self) -> reqwest::multipart::Form {
        self.form
    }
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}
