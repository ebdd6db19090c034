use varsh_llm::{StreamEvent, StreamEventPayload, StreamTarget};

use super::stream::StreamTransition;

/// Outcome of a reply, reported once per finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ReplyFinished(StreamTarget),
    ReplyFailed {
        target: StreamTarget,
        message: String,
    },
    ReplyCancelled(StreamTarget),
}

/// Maps terminal payloads to stream transitions.
///
/// Deltas return `None`: they change message content, not the lifecycle.
pub fn transition_for(event: &StreamEvent) -> Option<StreamTransition> {
    match &event.payload {
        StreamEventPayload::Delta(_) => None,
        StreamEventPayload::Done => Some(StreamTransition::Complete(event.target.clone())),
        StreamEventPayload::Error(message) => Some(StreamTransition::Fail {
            target: event.target.clone(),
            message: message.clone(),
        }),
    }
}
