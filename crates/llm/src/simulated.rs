use std::time::Duration;

use snafu::ensure;
use tokio::sync::{mpsc, oneshot};

use super::provider::{
    EmptyPromptSnafu, ResponderResult, Responder, ResponseHandle, ResponseRequest, StreamEvent,
    StreamTarget, make_event_stream,
};

pub const SIMULATED_RESPONDER_ID: &str = "simulated";
pub const DEFAULT_FIRST_TOKEN_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_STREAM_DURATION: Duration = Duration::from_millis(2_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedConfig {
    /// Silence before the first chunk arrives.
    pub first_token_delay: Duration,
    /// Time over which the chunks are spread before `Done`.
    pub stream_duration: Duration,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            first_token_delay: DEFAULT_FIRST_TOKEN_DELAY,
            stream_duration: DEFAULT_STREAM_DURATION,
        }
    }
}

/// Canned reply used until a real backend is wired in.
pub fn simulated_reply(prompt: &str) -> String {
    format!(
        "I understand you're asking about: \"{}\". This is a simulated response. In a real implementation, this would connect to your AI service.",
        prompt.trim()
    )
}

/// Word chunks whose concatenation is exactly `reply`.
fn chunk_reply(reply: &str) -> Vec<String> {
    reply.split_inclusive(' ').map(str::to_string).collect()
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedResponder {
    config: SimulatedConfig,
}

impl SimulatedResponder {
    pub fn new(config: SimulatedConfig) -> Self {
        Self { config }
    }
}

impl Responder for SimulatedResponder {
    fn id(&self) -> &str {
        SIMULATED_RESPONDER_ID
    }

    fn respond(&self, request: ResponseRequest) -> ResponderResult<ResponseHandle> {
        ensure!(
            !request.prompt.trim().is_empty(),
            EmptyPromptSnafu {
                stage: "simulated-respond",
                target: request.target.clone(),
            }
        );

        let (event_tx, stream, cancel_rx) = make_event_stream(request.target.clone());
        let chunks = chunk_reply(&simulated_reply(&request.prompt));
        tracing::debug!(
            chat_id = %request.target.chat_id,
            mode = %request.mode,
            chunks = chunks.len(),
            "starting simulated reply"
        );

        let worker = Box::pin(run_simulated_worker(
            self.config,
            request.target,
            chunks,
            event_tx,
            cancel_rx,
        ));
        Ok(ResponseHandle { stream, worker })
    }
}

async fn run_simulated_worker(
    config: SimulatedConfig,
    target: StreamTarget,
    chunks: Vec<String>,
    event_tx: mpsc::UnboundedSender<StreamEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    tokio::select! {
        biased;
        _ = &mut cancel_rx => {
            tracing::debug!(chat_id = %target.chat_id, "simulated reply cancelled before first chunk");
            return;
        }
        _ = tokio::time::sleep(config.first_token_delay) => {}
    }

    let chunk_count = u32::try_from(chunks.len().max(1)).unwrap_or(u32::MAX);
    let pause = config.stream_duration / chunk_count;

    for chunk in chunks {
        if event_tx.send(StreamEvent::delta(target.clone(), chunk)).is_err() {
            return;
        }

        tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                tracing::debug!(chat_id = %target.chat_id, "simulated reply cancelled mid-stream");
                return;
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }

    let _ = event_tx.send(StreamEvent::done(target));
}
