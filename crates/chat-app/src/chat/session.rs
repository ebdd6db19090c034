use std::collections::HashMap;
use std::sync::Arc;
use std::task::Poll;

use snafu::{OptionExt, ResultExt, Snafu, ensure};
use tokio::task::JoinHandle;
use varsh_llm::{
    Responder, ResponderError, ResponseEventStream, ResponseHandle, ResponseRequest, StreamEvent,
    StreamEventPayload, StreamTarget,
};
use varsh_store::{
    ChatId, ChatMode, ChatStore, MemoryStore, Message, MessagePatch, MessageStore, StoreError,
};

use super::events::{SessionEvent, transition_for};
use super::stream::{StreamState, StreamTransition, StreamTransitionRejection};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("store operation failed on `{stage}`: {source}"))]
    Store {
        stage: &'static str,
        source: StoreError,
    },
    #[snafu(display("responder failed on `{stage}`: {source}"))]
    Responder {
        stage: &'static str,
        source: ResponderError,
    },
    #[snafu(display("cannot send an empty message"))]
    EmptyPrompt { stage: &'static str },
    #[snafu(display("no chat is selected"))]
    NoCurrentChat { stage: &'static str },
    #[snafu(display("reply for chat '{chat_id}' rejected: {rejection:?}"))]
    StreamRejected {
        stage: &'static str,
        chat_id: ChatId,
        rejection: StreamTransitionRejection,
    },
}

struct ActiveStream {
    stream: ResponseEventStream,
    worker: JoinHandle<()>,
}

impl ActiveStream {
    fn cancel(mut self) {
        self.stream.cancel();
        self.worker.abort();
    }
}

/// Wires composer submissions to the store and the responder.
///
/// The session owns the store; reply workers run as tokio tasks and only talk
/// back through their event streams, so every store mutation happens here.
pub struct ChatSession {
    store: MemoryStore,
    responder: Arc<dyn Responder>,
    streams: HashMap<ChatId, ActiveStream>,
    stream_states: HashMap<ChatId, StreamState>,
}

impl ChatSession {
    pub fn new(store: MemoryStore, responder: Arc<dyn Responder>) -> Self {
        Self {
            store,
            responder,
            streams: HashMap::new(),
            stream_states: HashMap::new(),
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    pub fn responder_id(&self) -> &str {
        self.responder.id()
    }

    pub fn stream_state(&self, chat_id: &ChatId) -> StreamState {
        self.stream_states.get(chat_id).cloned().unwrap_or_default()
    }

    pub fn is_streaming(&self, chat_id: &ChatId) -> bool {
        self.stream_state(chat_id).is_streaming()
    }

    pub fn has_active_streams(&self) -> bool {
        !self.streams.is_empty()
    }

    pub fn new_chat(&mut self, mode: ChatMode) -> SessionResult<ChatId> {
        self.store.start_chat(mode).context(StoreSnafu {
            stage: "session-new-chat",
        })
    }

    /// Sends `content` as a user message to the current chat and starts the
    /// assistant reply.
    pub fn submit(&mut self, content: &str) -> SessionResult<StreamTarget> {
        let prompt = content.trim();
        ensure!(
            !prompt.is_empty(),
            EmptyPromptSnafu {
                stage: "session-submit",
            }
        );

        let chat = self.store.current_chat().context(NoCurrentChatSnafu {
            stage: "session-submit",
        })?;
        let chat_id = chat.id.clone();
        let mode = chat.mode;

        let placeholder = Message::assistant_streaming();
        let target = StreamTarget::new(chat_id.clone(), placeholder.id.clone());
        let next_state = self
            .stream_state(&chat_id)
            .apply(StreamTransition::Start(target.clone()))
            .map_err(|rejection| SessionError::StreamRejected {
                stage: "session-submit-start",
                chat_id: chat_id.clone(),
                rejection,
            })?;

        let ResponseHandle { stream, worker } = self
            .responder
            .respond(ResponseRequest::new(target.clone(), mode, prompt))
            .context(ResponderSnafu {
                stage: "session-submit-respond",
            })?;

        self.store
            .add_message(&chat_id, Message::user(prompt))
            .context(StoreSnafu {
                stage: "session-submit-user-message",
            })?;
        self.store
            .add_message(&chat_id, placeholder)
            .context(StoreSnafu {
                stage: "session-submit-assistant-placeholder",
            })?;

        let worker = tokio::spawn(worker);
        self.streams
            .insert(chat_id.clone(), ActiveStream { stream, worker });
        self.stream_states.insert(chat_id.clone(), next_state);

        tracing::info!(chat_id = %chat_id, message_id = %target.message_id, "reply started");
        Ok(target)
    }

    /// Cancels the reply streaming into `chat_id`. A reply whose terminal
    /// event is already queued is settled with that outcome instead.
    pub fn stop(&mut self, chat_id: &ChatId) -> SessionResult<SessionEvent> {
        if let Some(outcome) = self.drain_queued(chat_id) {
            return Ok(outcome);
        }

        let active = self
            .streams
            .remove(chat_id)
            .context(StreamRejectedSnafu {
                stage: "session-stop",
                chat_id: chat_id.clone(),
                rejection: StreamTransitionRejection::NoActiveStream,
            })?;
        let target = active.stream.target().clone();
        active.cancel();

        let next_state = self
            .stream_state(chat_id)
            .apply(StreamTransition::Cancel(target.clone()))
            .unwrap_or(StreamState::Cancelled(target.clone()));
        self.stream_states.insert(chat_id.clone(), next_state);
        self.finish_message(&target, None);

        tracing::info!(chat_id = %chat_id, "reply cancelled");
        Ok(SessionEvent::ReplyCancelled(target))
    }

    /// Deletes a chat, cancelling its reply first.
    pub fn delete_chat(&mut self, chat_id: &ChatId) -> SessionResult<()> {
        if let Some(active) = self.streams.remove(chat_id) {
            active.cancel();
        }
        self.stream_states.remove(chat_id);
        self.store.delete_chat(chat_id).context(StoreSnafu {
            stage: "session-delete-chat",
        })?;
        Ok(())
    }

    /// Applies every event already queued, without waiting.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let chat_ids: Vec<ChatId> = self.streams.keys().cloned().collect();
        chat_ids
            .iter()
            .filter_map(|chat_id| self.drain_queued(chat_id))
            .collect()
    }

    /// Waits for the next event of any active reply and applies it. Returns
    /// `None` immediately when nothing is streaming.
    pub async fn next_event(&mut self) -> Option<Option<SessionEvent>> {
        if self.streams.is_empty() {
            return None;
        }

        let (chat_id, event) = {
            let receivers = self.streams.iter_mut().map(|(chat_id, active)| {
                Box::pin(async move { (chat_id.clone(), active.stream.recv().await) })
            });
            let ((chat_id, event), _, _) = futures::future::select_all(receivers).await;
            (chat_id, event)
        };

        Some(self.apply_event(chat_id, event))
    }

    /// Drives replies until none is active.
    pub async fn wait_idle(&mut self) -> Vec<SessionEvent> {
        let mut finished = Vec::new();
        while let Some(event) = self.next_event().await {
            finished.extend(event);
        }
        finished
    }

    /// Applies the events queued for one chat and returns its outcome when
    /// the reply ended, including a worker that exited without `Done`.
    fn drain_queued(&mut self, chat_id: &ChatId) -> Option<SessionEvent> {
        let mut queued = Vec::new();
        if let Some(active) = self.streams.get_mut(chat_id) {
            loop {
                match active.stream.try_recv() {
                    Poll::Ready(Some(event)) => {
                        let terminal = event.is_terminal();
                        queued.push(Some(event));
                        if terminal {
                            break;
                        }
                    }
                    Poll::Ready(None) => {
                        queued.push(None);
                        break;
                    }
                    Poll::Pending => break,
                }
            }
        }

        queued
            .into_iter()
            .filter_map(|event| self.apply_event(chat_id.clone(), event))
            .last()
    }

    fn apply_event(&mut self, chat_id: ChatId, event: Option<StreamEvent>) -> Option<SessionEvent> {
        let Some(event) = event else {
            // Worker went away without a terminal event.
            let target = self.streams.get(&chat_id)?.stream.target().clone();
            let outcome = self.apply_event(
                chat_id.clone(),
                Some(StreamEvent::error(target, "reply stream closed unexpectedly")),
            );
            self.streams.remove(&chat_id);
            return outcome;
        };

        if !self
            .stream_state(&chat_id)
            .accepts_stream_event(&event.target)
        {
            tracing::warn!(chat_id = %chat_id, "dropping event for stale reply");
            return None;
        }

        let transition = transition_for(&event);
        let StreamEvent { target, payload } = event;
        match payload {
            StreamEventPayload::Delta(delta) => {
                if let Err(error) =
                    self.store
                        .append_message_content(&target.chat_id, &target.message_id, &delta)
                {
                    tracing::warn!(chat_id = %chat_id, %error, "reply target vanished, cancelling");
                    if let Some(active) = self.streams.remove(&chat_id) {
                        active.cancel();
                    }
                    self.stream_states.remove(&chat_id);
                }
                None
            }
            StreamEventPayload::Done => {
                self.settle_stream(&chat_id, transition);
                self.finish_message(&target, None);
                tracing::info!(chat_id = %chat_id, "reply finished");
                Some(SessionEvent::ReplyFinished(target))
            }
            StreamEventPayload::Error(message) => {
                self.settle_stream(&chat_id, transition);
                self.finish_message(&target, Some(&message));
                tracing::warn!(chat_id = %chat_id, %message, "reply failed");
                Some(SessionEvent::ReplyFailed { target, message })
            }
        }
    }

    fn settle_stream(&mut self, chat_id: &ChatId, transition: Option<StreamTransition>) {
        self.streams.remove(chat_id);
        if let Some(transition) = transition {
            let next_state = self
                .stream_state(chat_id)
                .apply(transition)
                .unwrap_or_default();
            self.stream_states.insert(chat_id.clone(), next_state);
        }
    }

    fn finish_message(&mut self, target: &StreamTarget, error: Option<&str>) {
        if let Some(error) = error {
            let suffix = format!("\n\n[error: {error}]");
            if let Err(error) =
                self.store
                    .append_message_content(&target.chat_id, &target.message_id, &suffix)
            {
                tracing::warn!(chat_id = %target.chat_id, %error, "could not record reply error");
            }
        }

        if let Err(error) = self.store.update_message(
            &target.chat_id,
            &target.message_id,
            MessagePatch::finish_streaming(),
        ) {
            tracing::warn!(chat_id = %target.chat_id, %error, "could not clear streaming flag");
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        for (_, active) in self.streams.drain() {
            active.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use varsh_llm::{
        ResponderResult, SimulatedConfig, SimulatedResponder, make_event_stream, simulated_reply,
    };
    use varsh_store::Role;

    use super::*;

    /// Sends a fixed list of payloads, then drops its sender.
    struct ScriptedResponder {
        payloads: Vec<StreamEventPayload>,
    }

    impl Responder for ScriptedResponder {
        fn id(&self) -> &str {
            "scripted"
        }

        fn respond(&self, request: ResponseRequest) -> ResponderResult<ResponseHandle> {
            let (event_tx, stream, _cancel_rx) = make_event_stream(request.target.clone());
            let target = request.target;
            let payloads = self.payloads.clone();
            let worker = Box::pin(async move {
                for payload in payloads {
                    let event = StreamEvent {
                        target: target.clone(),
                        payload,
                    };
                    if event_tx.send(event).is_err() {
                        return;
                    }
                }
            });
            Ok(ResponseHandle { stream, worker })
        }
    }

    fn scripted_session(payloads: Vec<StreamEventPayload>) -> ChatSession {
        ChatSession::new(MemoryStore::new(), Arc::new(ScriptedResponder { payloads }))
    }

    fn reply(session: &ChatSession, target: &StreamTarget) -> Message {
        session
            .store()
            .chat(&target.chat_id)
            .and_then(|chat| chat.message(&target.message_id))
            .cloned()
            .expect("reply message")
    }

    fn session() -> ChatSession {
        ChatSession::new(
            MemoryStore::new(),
            Arc::new(SimulatedResponder::new(SimulatedConfig {
                first_token_delay: Duration::from_millis(100),
                stream_duration: Duration::from_millis(200),
            })),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn submit_appends_user_message_and_streams_reply() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Coding)?;

        let target = session.submit("  binary search  ")?;
        assert!(session.is_streaming(&chat_id));

        let chat = session.store().current_chat().expect("current chat");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, Role::User);
        assert_eq!(chat.messages[0].content, "binary search");
        assert_eq!(chat.messages[1].id, target.message_id);
        assert!(chat.messages[1].is_streaming());

        let finished = session.wait_idle().await;
        assert_eq!(finished, vec![SessionEvent::ReplyFinished(target.clone())]);

        let reply = session
            .store()
            .chat(&chat_id)
            .and_then(|chat| chat.message(&target.message_id))
            .expect("reply");
        assert_eq!(reply.content, simulated_reply("binary search"));
        assert!(!reply.is_streaming());
        assert_eq!(session.stream_state(&chat_id), StreamState::Done(target));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn submit_rejects_empty_input_and_missing_chat() {
        let mut session = session();
        assert!(matches!(
            session.submit("hello"),
            Err(SessionError::NoCurrentChat { .. })
        ));

        session.new_chat(ChatMode::Quiz).expect("new chat");
        assert!(matches!(
            session.submit("   "),
            Err(SessionError::EmptyPrompt { .. })
        ));
        assert_eq!(
            session.store().current_chat().map(|chat| chat.messages.len()),
            Some(0)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn second_submit_while_streaming_is_rejected() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Aptitude)?;
        session.submit("first")?;

        let error = session.submit("second").expect_err("already streaming");
        assert!(matches!(
            error,
            SessionError::StreamRejected {
                rejection: StreamTransitionRejection::AlreadyStreaming { .. },
                ..
            }
        ));
        assert_eq!(
            session.store().chat(&chat_id).map(|chat| chat.messages.len()),
            Some(2)
        );
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stop_clears_streaming_flag_and_marks_cancelled() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Document)?;
        let target = session.submit("summarize")?;

        let event = session.stop(&chat_id)?;
        assert_eq!(event, SessionEvent::ReplyCancelled(target.clone()));
        assert_eq!(session.stream_state(&chat_id), StreamState::Cancelled(target.clone()));
        assert!(!session.has_active_streams());

        let reply = session
            .store()
            .chat(&chat_id)
            .and_then(|chat| chat.message(&target.message_id))
            .expect("reply placeholder");
        assert!(!reply.is_streaming());
        assert!(matches!(
            session.stop(&chat_id),
            Err(SessionError::StreamRejected {
                rejection: StreamTransitionRejection::NoActiveStream,
                ..
            })
        ));

        // A new prompt may start once the previous reply is cancelled.
        session.submit("again")?;
        assert!(session.is_streaming(&chat_id));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_streaming_chat_cancels_its_reply() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Custom)?;
        session.submit("hello")?;

        session.delete_chat(&chat_id)?;

        assert!(!session.has_active_streams());
        assert!(session.store().current_chat().is_none());
        assert!(session.wait_idle().await.is_empty());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pump_applies_only_queued_events() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Coding)?;
        let target = session.submit("quick")?;

        assert!(session.pump().is_empty());
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(session.pump().is_empty());

        let partial = session
            .store()
            .chat(&chat_id)
            .and_then(|chat| chat.message(&target.message_id))
            .map(|message| message.content.clone())
            .unwrap_or_default();
        assert!(!partial.is_empty());
        assert!(simulated_reply("quick").starts_with(&partial));

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(session.pump(), vec![SessionEvent::ReplyFinished(target)]);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stop_after_reply_finished_keeps_the_reply() -> SessionResult<()> {
        let mut session = ChatSession::new(
            MemoryStore::new(),
            Arc::new(SimulatedResponder::new(SimulatedConfig {
                first_token_delay: Duration::from_millis(10),
                stream_duration: Duration::from_millis(10),
            })),
        );
        let chat_id = session.new_chat(ChatMode::Coding)?;
        let target = session.submit("hello")?;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let event = session.stop(&chat_id)?;

        assert_eq!(event, SessionEvent::ReplyFinished(target.clone()));
        assert_eq!(session.stream_state(&chat_id), StreamState::Done(target.clone()));
        assert!(!session.has_active_streams());
        let message = reply(&session, &target);
        assert_eq!(message.content, simulated_reply("hello"));
        assert!(!message.is_streaming());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn error_event_is_recorded_on_the_reply() -> SessionResult<()> {
        let mut session = scripted_session(vec![
            StreamEventPayload::Delta("partial".to_string()),
            StreamEventPayload::Error("boom".to_string()),
        ]);
        let chat_id = session.new_chat(ChatMode::Quiz)?;
        let target = session.submit("question")?;

        let events = session.wait_idle().await;
        assert_eq!(
            events,
            vec![SessionEvent::ReplyFailed {
                target: target.clone(),
                message: "boom".to_string(),
            }]
        );
        let message = reply(&session, &target);
        assert_eq!(message.content, "partial\n\n[error: boom]");
        assert!(!message.is_streaming());
        assert!(matches!(
            session.stream_state(&chat_id),
            StreamState::Error { message, .. } if message == "boom"
        ));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn stream_closed_without_done_is_a_failed_reply() -> SessionResult<()> {
        let mut session =
            scripted_session(vec![StreamEventPayload::Delta("partial".to_string())]);
        session.new_chat(ChatMode::Document)?;
        let target = session.submit("summarize")?;

        let events = session.wait_idle().await;
        assert_eq!(
            events,
            vec![SessionEvent::ReplyFailed {
                target: target.clone(),
                message: "reply stream closed unexpectedly".to_string(),
            }]
        );
        let message = reply(&session, &target);
        assert_eq!(
            message.content,
            "partial\n\n[error: reply stream closed unexpectedly]"
        );
        assert!(!message.is_streaming());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn pump_settles_a_worker_that_exited_silently() -> SessionResult<()> {
        let mut session = scripted_session(Vec::new());
        let chat_id = session.new_chat(ChatMode::Aptitude)?;
        let target = session.submit("ratios")?;

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            session.pump(),
            vec![SessionEvent::ReplyFailed {
                target,
                message: "reply stream closed unexpectedly".to_string(),
            }]
        );
        assert!(!session.has_active_streams());
        assert!(!session.is_streaming(&chat_id));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn events_for_a_chat_removed_from_the_store_are_dropped() -> SessionResult<()> {
        let mut session = session();
        let chat_id = session.new_chat(ChatMode::Coding)?;
        session.submit("hello")?;

        session
            .store_mut()
            .delete_chat(&chat_id)
            .context(StoreSnafu { stage: "test" })?;

        assert!(session.wait_idle().await.is_empty());
        assert!(!session.has_active_streams());
        assert_eq!(session.stream_state(&chat_id), StreamState::Idle);
        assert!(session.store().chat(&chat_id).is_none());
        Ok(())
    }
}
