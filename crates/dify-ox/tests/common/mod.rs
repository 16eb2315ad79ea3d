#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dify_ox::{ChatFrame, DifyRequestError, SendMessageResponse, StreamCallbacks};
use serde_json::Value;

/// Captures every callback invocation of a streaming call
#[derive(Clone, Default)]
pub struct Recorder {
    pub messages: Arc<Mutex<Vec<(String, String)>>>,
    pub completed: Arc<Mutex<Vec<SendMessageResponse>>>,
    pub errors: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn callbacks(&self) -> StreamCallbacks {
        let messages = Arc::clone(&self.messages);
        let completed = Arc::clone(&self.completed);
        let errors = Arc::clone(&self.errors);

        StreamCallbacks::new()
            .on_message(move |fragment, full| {
                messages
                    .lock()
                    .unwrap()
                    .push((fragment.to_string(), full.to_string()));
            })
            .on_complete(move |response| completed.lock().unwrap().push(response.clone()))
            .on_error(move |error| errors.lock().unwrap().push(error.to_string()))
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn complete_count(&self) -> usize {
        self.completed.lock().unwrap().len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }
}

pub fn frame(value: Value) -> Result<ChatFrame, DifyRequestError> {
    match value {
        Value::Object(map) => Ok(ChatFrame::from(map)),
        other => panic!("frame must be a JSON object, got {other}"),
    }
}

/// Join frames into a `text/event-stream` body
pub fn sse_body(lines: &[&str]) -> String {
    lines.iter().map(|line| format!("{line}\n\n")).collect()
}
