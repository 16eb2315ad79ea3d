use crate::error::CommonRequestError;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream::BoxStream};
use serde_json::{Map, Value};

/// A decoded JSON object frame
pub type Frame = Map<String, Value>;

/// Outcome of classifying one line of a streamed body
#[derive(Debug, Clone, PartialEq)]
pub enum FrameLine {
    /// A `data:` line carrying a JSON object
    Frame(Frame),
    /// A `data:` line whose payload is not a JSON object
    Malformed(String),
    /// Blank lines, comments, other SSE fields and `[DONE]` markers
    Skip,
}

/// Strip the `data:` field name, tolerating a duplicated `data:data:` prefix.
///
/// Some backend versions re-wrap already framed upstream events, producing
/// `data:data: {...}`. Both forms carry the same payload.
fn strip_data_prefix(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?.trim_start();
    Some(rest.strip_prefix("data:").map_or(rest, str::trim_start))
}

/// Classify a single line of a streamed body
#[must_use]
pub fn parse_frame_line(line: &str) -> FrameLine {
    let line = line.trim_end_matches(['\n', '\r']);

    let Some(data) = strip_data_prefix(line) else {
        return FrameLine::Skip;
    };

    if data.is_empty() || data == "[DONE]" {
        return FrameLine::Skip;
    }

    match serde_json::from_str::<Value>(data) {
        Ok(Value::Object(frame)) => FrameLine::Frame(frame),
        Ok(other) => FrameLine::Malformed(format!("expected JSON object, got {other}")),
        Err(e) => FrameLine::Malformed(format!("JSON parse error: {e}")),
    }
}

/// Keep frames, log and drop everything malformed
fn accept_line(line: &str) -> Option<Frame> {
    match parse_frame_line(line) {
        FrameLine::Frame(frame) => Some(frame),
        FrameLine::Malformed(reason) => {
            log::warn!("Skipping malformed stream frame: {reason}");
            None
        }
        FrameLine::Skip => None,
    }
}

/// Incremental parser for newline-delimited `data:` frames.
///
/// Chunks are buffered as bytes and only complete lines are decoded, so frames
/// and multi-byte characters split across chunks are reassembled.
pub struct FrameParser {
    byte_stream: BoxStream<'static, Result<Bytes, CommonRequestError>>,
    buffer: Vec<u8>,
}

impl FrameParser {
    pub fn new(response: reqwest::Response) -> Self {
        Self::from_byte_stream(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|e| CommonRequestError::Stream(e.to_string()))),
        )
    }

    pub fn from_byte_stream<S>(byte_stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, CommonRequestError>> + Send + 'static,
    {
        Self {
            byte_stream: Box::pin(byte_stream),
            buffer: Vec::new(),
        }
    }

    /// Get the next frame from the stream, or `None` once the body is exhausted
    pub async fn next_frame(&mut self) -> Result<Option<Frame>, CommonRequestError> {
        loop {
            while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
                let line_bytes = self.buffer.drain(..=pos).collect::<Vec<u8>>();
                let line = String::from_utf8(line_bytes)?;

                if let Some(frame) = accept_line(&line) {
                    return Ok(Some(frame));
                }
            }

            match self.byte_stream.next().await {
                Some(chunk) => self.buffer.extend_from_slice(&chunk?),
                None => {
                    // Body ended without a trailing newline
                    if self.buffer.is_empty() {
                        return Ok(None);
                    }
                    let line = String::from_utf8(std::mem::take(&mut self.buffer))?;
                    return Ok(accept_line(&line));
                }
            }
        }
    }
}
