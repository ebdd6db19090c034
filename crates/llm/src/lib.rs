use std::sync::Arc;

mod provider;
mod simulated;

pub use provider::{
    Responder, ResponderError, ResponderResult, ResponderWorker, ResponseEventStream,
    ResponseHandle, ResponseRequest, StreamEvent, StreamEventPayload, StreamTarget,
    make_event_stream,
};
pub use simulated::{
    DEFAULT_FIRST_TOKEN_DELAY, DEFAULT_STREAM_DURATION, SIMULATED_RESPONDER_ID, SimulatedConfig,
    SimulatedResponder, simulated_reply,
};

pub fn create_responder(
    responder_id: &str,
    config: SimulatedConfig,
) -> ResponderResult<Arc<dyn Responder>> {
    match responder_id.trim() {
        "" | SIMULATED_RESPONDER_ID => Ok(Arc::new(SimulatedResponder::new(config))),
        other => Err(ResponderError::UnsupportedResponder {
            stage: "create-responder",
            responder_id: other.to_string(),
        }),
    }
}
