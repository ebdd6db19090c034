use snafu::{OptionExt, ResultExt};
use varsh_store::{ChatId, ChatPatch, ChatStore, Role};

use super::command::{Command, HELP};
use super::events::SessionEvent;
use super::session::{ChatSession, NoCurrentChatSnafu, SessionResult, StoreSnafu};

/// Line-oriented front end over a [`ChatSession`].
pub struct Shell {
    session: ChatSession,
    recent_chat_limit: usize,
}

impl Shell {
    pub fn new(session: ChatSession, recent_chat_limit: usize) -> Self {
        Self {
            session,
            recent_chat_limit: recent_chat_limit.max(1),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }

    /// Runs one command and returns the lines to print.
    pub fn handle(&mut self, command: Command) -> SessionResult<Vec<String>> {
        match command {
            Command::Submit(text) => self.submit(&text),
            Command::New(mode) => {
                let mode = mode.unwrap_or_else(|| self.session.store().mode());
                self.session.new_chat(mode)?;
                Ok(vec![format!("started {}", self.current_title())])
            }
            Command::Mode(mode) => {
                self.session.store_mut().set_mode(mode);
                Ok(vec![format!("mode: {} ({})", mode.label(), mode.description())])
            }
            Command::Chats => Ok(self.list_chats()),
            Command::Open(position) => self.open(position),
            Command::Rename(title) => {
                let chat_id = self.current_chat_id("shell-rename")?;
                self.session
                    .store_mut()
                    .update_chat(&chat_id, ChatPatch::title(title))
                    .context(StoreSnafu {
                        stage: "shell-rename",
                    })?;
                Ok(vec![format!("renamed to {}", self.current_title())])
            }
            Command::Delete => {
                let chat_id = self.current_chat_id("shell-delete")?;
                let title = self.current_title();
                self.session.delete_chat(&chat_id)?;
                Ok(vec![format!("deleted {title}")])
            }
            Command::Stop => {
                let chat_id = self.current_chat_id("shell-stop")?;
                let event = self.session.stop(&chat_id)?;
                Ok(self.render_event(&event))
            }
            Command::Prompts => Ok(self.prompts()),
            Command::Help => Ok(HELP.lines().map(str::to_string).collect()),
            Command::Quit => Ok(Vec::new()),
        }
    }

    pub fn render_event(&self, event: &SessionEvent) -> Vec<String> {
        match event {
            SessionEvent::ReplyFinished(target) => {
                let content = self
                    .session
                    .store()
                    .chat(&target.chat_id)
                    .and_then(|chat| chat.message(&target.message_id))
                    .map(|message| message.content.clone())
                    .unwrap_or_default();
                vec![format!("assistant: {content}")]
            }
            SessionEvent::ReplyFailed { message, .. } => {
                vec![format!("assistant failed: {message}")]
            }
            SessionEvent::ReplyCancelled(_) => vec!["reply cancelled".to_string()],
        }
    }

    fn submit(&mut self, text: &str) -> SessionResult<Vec<String>> {
        let mut lines = Vec::new();
        if self.session.store().current_chat().is_none() {
            let mode = self.session.store().mode();
            self.session.new_chat(mode)?;
            lines.push(format!("started {}", self.current_title()));
        }

        self.session.submit(text)?;
        lines.push(format!("you: {}", text.trim()));
        Ok(lines)
    }

    fn open(&mut self, position: usize) -> SessionResult<Vec<String>> {
        let chat_id = position
            .checked_sub(1)
            .and_then(|index| {
                self.session
                    .store()
                    .recent_chats(self.recent_chat_limit)
                    .get(index)
                    .map(|chat| chat.id.clone())
            });
        let Some(chat_id) = chat_id else {
            return Ok(vec![format!("no chat #{position}, see /chats")]);
        };

        self.session
            .store_mut()
            .set_current_chat(Some(chat_id))
            .context(StoreSnafu { stage: "shell-open" })?;

        let mut lines = vec![format!("opened {}", self.current_title())];
        if let Some(chat) = self.session.store().current_chat() {
            lines.extend(chat.messages.iter().map(|message| {
                let speaker = match message.role {
                    Role::User => "you",
                    Role::Assistant => "assistant",
                };
                format!("{speaker}: {}", message.content)
            }));
        }
        Ok(lines)
    }

    fn list_chats(&self) -> Vec<String> {
        let store = self.session.store();
        let recent = store.recent_chats(self.recent_chat_limit);
        if recent.is_empty() {
            return vec!["No recent chats. Start a new conversation!".to_string()];
        }

        let current = store.current_chat_id();
        recent
            .into_iter()
            .enumerate()
            .map(|(index, chat)| {
                let marker = if Some(&chat.id) == current { '*' } else { ' ' };
                format!(
                    "{marker} {}. {} [{}] {} messages",
                    index + 1,
                    chat.title,
                    chat.mode.label(),
                    chat.messages.len()
                )
            })
            .collect()
    }

    fn prompts(&self) -> Vec<String> {
        let mode = self.session.store().mode();
        let mut lines = vec![
            format!("{} mode: {}", mode.label(), mode.placeholder()),
            "quick prompts:".to_string(),
        ];
        lines.extend(mode.quick_prompts().iter().map(|prompt| format!("  {prompt}")));
        lines.push("suggestions:".to_string());
        lines.extend(mode.suggestions().iter().map(|prompt| format!("  {prompt}")));
        lines.push("tools:".to_string());
        lines.extend(
            mode.tools()
                .iter()
                .map(|tool| format!("  {}: {}", tool.name, tool.description)),
        );
        lines
    }

    fn current_chat_id(&self, stage: &'static str) -> SessionResult<ChatId> {
        self.session
            .store()
            .current_chat_id()
            .cloned()
            .context(NoCurrentChatSnafu { stage })
    }

    fn current_title(&self) -> String {
        self.session
            .store()
            .current_chat()
            .map(|chat| format!("'{}'", chat.title))
            .unwrap_or_else(|| "no chat".to_string())
    }
}
