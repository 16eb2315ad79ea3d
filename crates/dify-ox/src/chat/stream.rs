use core::fmt;
use std::{
    pin::pin,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use futures_util::{Stream, StreamExt};
use tokio::{sync::oneshot, task::AbortHandle};

use crate::{
    DifyRequestError,
    chat::{ChatEvent, ChatFrame, ResponseAccumulator, SendMessageResponse},
};

/// Receives `(fragment, answer_so_far)` for every `message` frame
pub type MessageCallback = Box<dyn FnMut(&str, &str) + Send>;
pub type CompleteCallback = Box<dyn FnOnce(&SendMessageResponse) + Send>;
pub type ErrorCallback = Box<dyn FnOnce(&DifyRequestError) + Send>;

type Outcome = Result<SendMessageResponse, DifyRequestError>;

/// Observers for a streaming chat call.
///
/// `on_complete` and `on_error` are mutually exclusive and fire at most once;
/// `on_message` fires once per `message` frame, always before `on_complete`.
#[derive(Default)]
pub struct StreamCallbacks {
    on_message: Option<MessageCallback>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl StreamCallbacks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &str) + Send + 'static,
    {
        self.on_message = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&SendMessageResponse) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&DifyRequestError) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_message", &self.on_message.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Everything the first settler consumes
struct Pending {
    sender: oneshot::Sender<Outcome>,
    on_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

/// Single-assignment outcome cell shared by the reader and the timer.
///
/// The first `complete`/`fail` takes the pending state; later calls find the
/// slot empty and do nothing.
struct Settlement {
    slot: Mutex<Option<Pending>>,
}

impl Settlement {
    fn new(
        on_complete: Option<CompleteCallback>,
        on_error: Option<ErrorCallback>,
    ) -> (Self, oneshot::Receiver<Outcome>) {
        let (sender, receiver) = oneshot::channel();
        let pending = Pending {
            sender,
            on_complete,
            on_error,
        };
        (
            Self {
                slot: Mutex::new(Some(pending)),
            },
            receiver,
        )
    }

    fn take(&self) -> Option<Pending> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    fn is_settled(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }

    /// Run `f` only if nothing has settled yet, holding the slot so no
    /// settler can interleave with it
    fn while_pending(&self, f: impl FnOnce()) -> bool {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            return false;
        }
        f();
        true
    }

    fn complete(&self, response: SendMessageResponse) -> bool {
        let Some(pending) = self.take() else {
            return false;
        };
        if let Some(on_complete) = pending.on_complete {
            on_complete(&response);
        }
        // Receiver is gone when the caller stopped waiting
        let _ = pending.sender.send(Ok(response));
        true
    }

    fn fail(&self, error: DifyRequestError) -> bool {
        let Some(pending) = self.take() else {
            return false;
        };
        log::error!("Streaming chat failed: {error}");
        if let Some(on_error) = pending.on_error {
            on_error(&error);
        }
        let _ = pending.sender.send(Err(error));
        true
    }
}

/// Stops the timer always, and the reader unless it is merely draining a
/// stream whose outcome is already decided.
struct TaskGuard {
    reader: AbortHandle,
    timer: AbortHandle,
    settlement: Arc<Settlement>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.timer.abort();
        if !self.settlement.is_settled() {
            self.reader.abort();
        }
    }
}

/// Drive a frame stream to a single outcome within `timeout`.
///
/// The reader and the timer run as separate tasks racing on one settlement
/// cell. Once the timer wins, frames the reader still receives are dropped
/// without invoking any callback. Dropping the returned future aborts both.
pub async fn consume_frames<S>(frames: S, callbacks: StreamCallbacks, timeout: Duration) -> Outcome
where
    S: Stream<Item = Result<ChatFrame, DifyRequestError>> + Send + 'static,
{
    let StreamCallbacks {
        on_message,
        on_complete,
        on_error,
    } = callbacks;
    let (settlement, outcome) = Settlement::new(on_complete, on_error);
    let settlement = Arc::new(settlement);

    let reader = tokio::spawn(read_frames(frames, on_message, Arc::clone(&settlement)));
    let timer = tokio::spawn({
        let settlement = Arc::clone(&settlement);
        async move {
            tokio::time::sleep(timeout).await;
            settlement.fail(DifyRequestError::Timeout(timeout));
        }
    });
    let _guard = TaskGuard {
        reader: reader.abort_handle(),
        timer: timer.abort_handle(),
        settlement,
    };

    outcome.await.unwrap_or_else(|_| {
        Err(DifyRequestError::Stream(
            "stream consumer stopped without an outcome".to_string(),
        ))
    })
}

async fn read_frames<S>(frames: S, mut on_message: Option<MessageCallback>, settlement: Arc<Settlement>)
where
    S: Stream<Item = Result<ChatFrame, DifyRequestError>>,
{
    let mut frames = pin!(frames);
    let mut accumulator = ResponseAccumulator::new();

    while let Some(item) = frames.next().await {
        if settlement.is_settled() {
            log::debug!("Dropping frame received after the stream settled");
            return;
        }

        let frame = match item {
            Ok(frame) => frame,
            Err(e) => {
                settlement.fail(e);
                return;
            }
        };

        match frame.event() {
            ChatEvent::Message => {
                let fragment = accumulator.push_message(frame);
                if let Some(on_message) = on_message.as_mut() {
                    let answer = accumulator.answer();
                    if !settlement.while_pending(|| on_message(&fragment, answer)) {
                        log::debug!("Dropping fragment received after the stream settled");
                        return;
                    }
                }
            }
            ChatEvent::MessageEnd => {
                accumulator.merge(frame);
                finish(accumulator, &settlement);
                return;
            }
            ChatEvent::Other(event) => log::debug!("Ignoring stream event {event:?}"),
        }
    }

    // Body ended without `message_end`
    finish(accumulator, &settlement);
}

fn finish(accumulator: ResponseAccumulator, settlement: &Settlement) {
    if !settlement.complete(accumulator.finish()) {
        log::debug!("Stream finished after the call had already settled");
    }
}
