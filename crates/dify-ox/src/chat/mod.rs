//! Chat with a Dify app through the admin backend.
//!
//! [`Dify::send_stream_message`] is the main entry point: it posts the
//! question with `response_mode = "streaming"`, reports every answer fragment
//! through [`StreamCallbacks`] and resolves with the accumulated
//! [`SendMessageResponse`], an error, or [`DifyRequestError::Timeout`] after
//! [`STREAM_TIMEOUT`](crate::STREAM_TIMEOUT).

mod frame;
mod request;
mod response;
mod stream;

pub use frame::{ChatEvent, ChatFrame, ResponseAccumulator};
pub use request::{FileInfo, ResponseMode, SendMessageRequest, SendMessageRequestBuilder};
pub use response::{
    ChatMessage, ChatMessagePage, Conversation, ConversationPage, DisplayMessage, MessageStatus,
    MetadataInfo, RetrieverResource, Role, SendMessageResponse, SuggestedQuestions, UsageInfo,
};
pub use stream::{CompleteCallback, ErrorCallback, MessageCallback, StreamCallbacks, consume_frames};

use std::time::Duration;

use admin_ox_common::{
    BoxStream,
    request_builder::{Endpoint, HttpMethod},
};
use async_stream::try_stream;
use futures_util::StreamExt;

use crate::{Dify, DifyRequestError, STREAM_TIMEOUT};

const SEND_MESSAGE_PATH: &str = "dify/chat/send-message";
const SEND_MESSAGE_STREAM_PATH: &str = "dify/chat/send-message-stream";

/// Request timeout for blocking answers
const SEND_MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

impl Dify {
    /// Ask a question and wait for the complete answer.
    ///
    /// Defaults to `blocking` mode unless the request sets a mode itself.
    pub async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, DifyRequestError> {
        request.validate()?;
        self.throttle().await;

        let body = match request.response_mode {
            Some(_) => request.clone(),
            None => request.with_response_mode(ResponseMode::Blocking),
        };
        let endpoint =
            Endpoint::new(SEND_MESSAGE_PATH, HttpMethod::Post).with_timeout(SEND_MESSAGE_TIMEOUT);

        self.request_helper().send(&endpoint, Some(&body)).await
    }

    /// Raw frames of a streaming answer, in wire order.
    ///
    /// Malformed lines are logged and skipped. Nothing is sent until the
    /// stream is first polled.
    pub fn stream_message(
        &self,
        request: &SendMessageRequest,
    ) -> BoxStream<'static, Result<ChatFrame, DifyRequestError>> {
        let client = self.clone();
        let validation = request.validate();
        let body = request.with_response_mode(ResponseMode::Streaming);

        Box::pin(try_stream! {
            validation?;
            client.throttle().await;

            let endpoint = Endpoint::new(SEND_MESSAGE_STREAM_PATH, HttpMethod::Post);
            let mut frames = client.request_helper().stream(&endpoint, &body);

            while let Some(frame) = frames.next().await {
                yield ChatFrame::from(frame?);
            }
        })
    }

    /// Stream an answer, reporting progress through `callbacks`.
    ///
    /// Settles exactly once: with the accumulated response on `message_end` or
    /// end of body, with the first error, or with
    /// [`DifyRequestError::Timeout`] once [`STREAM_TIMEOUT`] has elapsed.
    pub async fn send_stream_message(
        &self,
        request: &SendMessageRequest,
        callbacks: StreamCallbacks,
    ) -> Result<SendMessageResponse, DifyRequestError> {
        consume_frames(self.stream_message(request), callbacks, STREAM_TIMEOUT).await
    }

    pub async fn conversations(&self) -> Result<ConversationPage, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/chat/conversations", HttpMethod::Get);
        self.request_helper().get(&endpoint).await
    }

    pub async fn messages(&self, conversation_id: &str) -> Result<ChatMessagePage, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/chat/messages", HttpMethod::Get)
            .with_query_params(vec![("conversationId".to_string(), conversation_id.to_string())]);
        self.request_helper().get(&endpoint).await
    }

    pub async fn suggested_questions(
        &self,
        message_id: &str,
    ) -> Result<SuggestedQuestions, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/chat/messages/{message_id}/suggested"),
            HttpMethod::Get,
        );
        self.request_helper().get(&endpoint).await
    }
}
