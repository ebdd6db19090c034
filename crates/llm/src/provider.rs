use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use snafu::Snafu;
use tokio::sync::{mpsc, oneshot};
use varsh_store::{ChatId, ChatMode, MessageId};

/// Routes reply events to the assistant message they fill in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StreamTarget {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl StreamTarget {
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEventPayload {
    Delta(String),
    Done,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub target: StreamTarget,
    pub payload: StreamEventPayload,
}

impl StreamEvent {
    pub fn delta(target: StreamTarget, text: impl Into<String>) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Delta(text.into()),
        }
    }

    pub fn done(target: StreamTarget) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Done,
        }
    }

    pub fn error(target: StreamTarget, message: impl Into<String>) -> Self {
        Self {
            target,
            payload: StreamEventPayload::Error(message.into()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.payload, StreamEventPayload::Delta(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRequest {
    pub target: StreamTarget,
    pub mode: ChatMode,
    pub prompt: String,
}

impl ResponseRequest {
    pub fn new(target: StreamTarget, mode: ChatMode, prompt: impl Into<String>) -> Self {
        Self {
            target,
            mode,
            prompt: prompt.into(),
        }
    }
}

pub type ResponderWorker = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type ResponderResult<T> = Result<T, ResponderError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ResponderError {
    #[snafu(display("responder '{responder_id}' is not supported"))]
    UnsupportedResponder {
        stage: &'static str,
        responder_id: String,
    },
    #[snafu(display("response request for chat '{}' has an empty prompt", target.chat_id))]
    EmptyPrompt {
        stage: &'static str,
        target: StreamTarget,
    },
}

pub struct ResponseEventStream {
    target: StreamTarget,
    events: mpsc::UnboundedReceiver<StreamEvent>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// A started reply: the caller spawns `worker` and drains `stream`.
pub struct ResponseHandle {
    pub stream: ResponseEventStream,
    pub worker: ResponderWorker,
}

impl ResponseEventStream {
    pub(crate) fn new(
        target: StreamTarget,
        events: mpsc::UnboundedReceiver<StreamEvent>,
        cancel_tx: oneshot::Sender<()>,
    ) -> Self {
        Self {
            target,
            events,
            cancel_tx: Some(cancel_tx),
        }
    }

    pub fn target(&self) -> &StreamTarget {
        &self.target
    }

    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.events.recv().await
    }

    /// `Pending` while the worker is still running with nothing queued;
    /// `Ready(None)` once it is gone and the queue is drained.
    pub fn try_recv(&mut self) -> Poll<Option<StreamEvent>> {
        match self.events.try_recv() {
            Ok(event) => Poll::Ready(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Poll::Pending,
            Err(mpsc::error::TryRecvError::Disconnected) => Poll::Ready(None),
        }
    }

    /// Signals the worker to stop. Returns false when already cancelled or
    /// when the worker has finished.
    pub fn cancel(&mut self) -> bool {
        self.cancel_tx
            .take()
            .map(|tx| tx.send(()).is_ok())
            .unwrap_or(false)
    }
}

impl Drop for ResponseEventStream {
    fn drop(&mut self) {
        if let Some(cancel_tx) = self.cancel_tx.take() {
            let _ = cancel_tx.send(());
        }
    }
}

pub trait Responder: Send + Sync {
    fn id(&self) -> &str;
    fn respond(&self, request: ResponseRequest) -> ResponderResult<ResponseHandle>;
}

/// Channel pair for a new reply: the worker keeps the sender and watches the
/// cancel receiver, the caller drains the stream.
pub fn make_event_stream(
    target: StreamTarget,
) -> (
    mpsc::UnboundedSender<StreamEvent>,
    ResponseEventStream,
    oneshot::Receiver<()>,
) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    (
        event_tx,
        ResponseEventStream::new(target, event_rx, cancel_tx),
        cancel_rx,
    )
}
