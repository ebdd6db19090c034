use std::collections::HashMap;

use snafu::{OptionExt, ensure};

use super::error::{AttachmentLockedSnafu, DuplicateIdentifierSnafu, NotFoundSnafu, StoreResult};
use super::ids::{ChatId, FileUploadId, MessageId, WorkspaceId};
use super::mode::ChatMode;
use super::types::{
    Chat, ChatPatch, FileUpload, FileUploadPatch, Message, MessagePatch, Workspace,
    now_unix_millis,
};
use super::{ChatStore, MessageStore, WorkspaceStore};

/// Volatile, single-owner chat store.
///
/// Chats live in one map keyed by id; `chat_order` keeps the newest-first
/// display order. The current chat and current workspace are ids resolved on
/// every read, so there is never a second copy to keep in sync.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    chats: HashMap<ChatId, Chat>,
    chat_order: Vec<ChatId>,
    workspaces: Vec<Workspace>,
    current_chat_id: Option<ChatId>,
    current_workspace_id: Option<WorkspaceId>,
    mode: ChatMode,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Store with the default workspace selected and aptitude mode active.
    pub fn new() -> Self {
        Self::with_workspace(Workspace::default_workspace(), ChatMode::default())
    }

    pub fn with_workspace(workspace: Workspace, mode: ChatMode) -> Self {
        Self {
            chats: HashMap::new(),
            chat_order: Vec::new(),
            current_workspace_id: Some(workspace.id.clone()),
            workspaces: vec![workspace],
            current_chat_id: None,
            mode,
        }
    }


    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ChatMode) {
        tracing::debug!(mode = %mode, "set chat mode");
        self.mode = mode;
    }

    pub fn current_chat_id(&self) -> Option<&ChatId> {
        self.current_chat_id.as_ref()
    }

    pub fn current_workspace_id(&self) -> Option<&WorkspaceId> {
        self.current_workspace_id.as_ref()
    }

    pub fn chat_count(&self) -> usize {
        self.chat_order.len()
    }

    pub fn recent_chats(&self, limit: usize) -> Vec<&Chat> {
        self.chat_order
            .iter()
            .take(limit)
            .filter_map(|chat_id| self.chats.get(chat_id))
            .collect()
    }

    /// Creates an empty chat for `mode`, selects it and makes `mode` active.
    pub fn start_chat(&mut self, mode: ChatMode) -> StoreResult<ChatId> {
        let chat = Chat::for_mode(mode);
        let chat_id = chat.id.clone();
        self.add_chat(chat)?;
        self.set_current_chat(Some(chat_id.clone()))?;
        self.set_mode(mode);
        Ok(chat_id)
    }

    fn chat_mut(&mut self, chat_id: &ChatId, stage: &'static str) -> StoreResult<&mut Chat> {
        self.chats.get_mut(chat_id).context(NotFoundSnafu {
            stage,
            entity: "chat",
            id: chat_id.to_string(),
        })
    }

    fn workspace_mut(
        &mut self,
        workspace_id: &WorkspaceId,
        stage: &'static str,
    ) -> StoreResult<&mut Workspace> {
        self.workspaces
            .iter_mut()
            .find(|workspace| &workspace.id == workspace_id)
            .context(NotFoundSnafu {
                stage,
                entity: "workspace",
                id: workspace_id.to_string(),
            })
    }
}

fn message_mut<'a>(
    chat: &'a mut Chat,
    message_id: &MessageId,
    stage: &'static str,
) -> StoreResult<&'a mut Message> {
    chat.messages
        .iter_mut()
        .find(|message| &message.id == message_id)
        .context(NotFoundSnafu {
            stage,
            entity: "message",
            id: message_id.to_string(),
        })
}

fn apply_message_patch(message: &mut Message, patch: MessagePatch) -> StoreResult<()> {
    // Attachments are write-once; validate both before touching anything.
    if patch.sources.is_some() {
        ensure!(
            message.sources.as_ref().is_none_or(Vec::is_empty),
            AttachmentLockedSnafu {
                stage: "update-message-sources",
                message_id: message.id.to_string(),
                field: "sources",
            }
        );
    }
    if patch.code_blocks.is_some() {
        ensure!(
            message.code_blocks.as_ref().is_none_or(Vec::is_empty),
            AttachmentLockedSnafu {
                stage: "update-message-code-blocks",
                message_id: message.id.to_string(),
                field: "code blocks",
            }
        );
    }

    if let Some(content) = patch.content {
        message.content = content;
    }
    if let Some(is_streaming) = patch.is_streaming {
        message.is_streaming = Some(is_streaming);
    }
    if let Some(sources) = patch.sources {
        message.sources = Some(sources);
    }
    if let Some(code_blocks) = patch.code_blocks {
        message.code_blocks = Some(code_blocks);
    }
    Ok(())
}

fn clamp_progress(progress: f32) -> f32 {
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

impl ChatStore for MemoryStore {
    fn add_chat(&mut self, chat: Chat) -> StoreResult<()> {
        ensure!(
            !self.chats.contains_key(&chat.id),
            DuplicateIdentifierSnafu {
                stage: "add-chat",
                entity: "chat",
                id: chat.id.to_string(),
            }
        );

        let chat_id = chat.id.clone();
        if let Some(workspace_id) = self.current_workspace_id.clone() {
            let workspace = self.workspace_mut(&workspace_id, "add-chat-file-in-workspace")?;
            workspace.chat_ids.insert(0, chat_id.clone());
        }
        self.chat_order.insert(0, chat_id.clone());
        self.chats.insert(chat_id.clone(), chat);

        tracing::debug!(chat_id = %chat_id, "added chat");
        Ok(())
    }

    fn update_chat(&mut self, chat_id: &ChatId, patch: ChatPatch) -> StoreResult<()> {
        let chat = self.chat_mut(chat_id, "update-chat")?;
        if let Some(title) = patch.title {
            chat.title = title;
        }
        if let Some(mode) = patch.mode {
            chat.mode = mode;
        }

        tracing::debug!(chat_id = %chat_id, "updated chat");
        Ok(())
    }

    fn delete_chat(&mut self, chat_id: &ChatId) -> StoreResult<Chat> {
        let chat = self.chats.remove(chat_id).context(NotFoundSnafu {
            stage: "delete-chat",
            entity: "chat",
            id: chat_id.to_string(),
        })?;

        self.chat_order.retain(|id| id != chat_id);
        for workspace in &mut self.workspaces {
            workspace.chat_ids.retain(|id| id != chat_id);
        }
        if self.current_chat_id.as_ref() == Some(chat_id) {
            self.current_chat_id = None;
        }

        tracing::debug!(chat_id = %chat_id, "deleted chat");
        Ok(chat)
    }

    fn chat(&self, chat_id: &ChatId) -> Option<&Chat> {
        self.chats.get(chat_id)
    }

    fn chats(&self) -> Vec<&Chat> {
        self.recent_chats(self.chat_order.len())
    }

    fn set_current_chat(&mut self, chat_id: Option<ChatId>) -> StoreResult<()> {
        if let Some(chat_id) = &chat_id {
            ensure!(
                self.chats.contains_key(chat_id),
                NotFoundSnafu {
                    stage: "set-current-chat",
                    entity: "chat",
                    id: chat_id.to_string(),
                }
            );
        }
        self.current_chat_id = chat_id;
        Ok(())
    }

    fn current_chat(&self) -> Option<&Chat> {
        self.current_chat_id
            .as_ref()
            .and_then(|chat_id| self.chats.get(chat_id))
    }
}

impl MessageStore for MemoryStore {
    fn add_message(&mut self, chat_id: &ChatId, message: Message) -> StoreResult<()> {
        let chat = self.chat_mut(chat_id, "add-message")?;
        ensure!(
            chat.message(&message.id).is_none(),
            DuplicateIdentifierSnafu {
                stage: "add-message",
                entity: "message",
                id: message.id.to_string(),
            }
        );

        let message_id = message.id.clone();
        chat.messages.push(message);
        chat.updated_at_unix_millis = now_unix_millis();

        tracing::debug!(chat_id = %chat_id, message_id = %message_id, "appended message");
        Ok(())
    }

    fn update_message(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> StoreResult<()> {
        let chat = self.chat_mut(chat_id, "update-message")?;
        let message = message_mut(chat, message_id, "update-message")?;
        apply_message_patch(message, patch)
    }

    fn append_message_content(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        delta: &str,
    ) -> StoreResult<()> {
        let chat = self.chat_mut(chat_id, "append-message-content")?;
        let message = message_mut(chat, message_id, "append-message-content")?;
        message.content.push_str(delta);
        Ok(())
    }
}

impl WorkspaceStore for MemoryStore {
    fn add_workspace(&mut self, workspace: Workspace) -> StoreResult<()> {
        ensure!(
            self.workspace(&workspace.id).is_none(),
            DuplicateIdentifierSnafu {
                stage: "add-workspace",
                entity: "workspace",
                id: workspace.id.to_string(),
            }
        );

        tracing::debug!(workspace_id = %workspace.id, "added workspace");
        self.workspaces.push(workspace);
        Ok(())
    }

    fn workspace(&self, workspace_id: &WorkspaceId) -> Option<&Workspace> {
        self.workspaces
            .iter()
            .find(|workspace| &workspace.id == workspace_id)
    }

    fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    fn set_current_workspace(&mut self, workspace_id: Option<WorkspaceId>) -> StoreResult<()> {
        if let Some(workspace_id) = &workspace_id {
            ensure!(
                self.workspace(workspace_id).is_some(),
                NotFoundSnafu {
                    stage: "set-current-workspace",
                    entity: "workspace",
                    id: workspace_id.to_string(),
                }
            );
        }
        self.current_workspace_id = workspace_id;
        Ok(())
    }

    fn current_workspace(&self) -> Option<&Workspace> {
        self.current_workspace_id
            .as_ref()
            .and_then(|workspace_id| self.workspace(workspace_id))
    }

    fn workspace_chats(&self, workspace_id: &WorkspaceId) -> StoreResult<Vec<&Chat>> {
        let workspace = self.workspace(workspace_id).context(NotFoundSnafu {
            stage: "workspace-chats",
            entity: "workspace",
            id: workspace_id.to_string(),
        })?;

        Ok(workspace
            .chat_ids
            .iter()
            .filter_map(|chat_id| self.chats.get(chat_id))
            .collect())
    }

    fn add_file_upload(
        &mut self,
        workspace_id: &WorkspaceId,
        mut file: FileUpload,
    ) -> StoreResult<()> {
        let workspace = self.workspace_mut(workspace_id, "add-file-upload")?;
        ensure!(
            workspace.file(&file.id).is_none(),
            DuplicateIdentifierSnafu {
                stage: "add-file-upload",
                entity: "file upload",
                id: file.id.to_string(),
            }
        );

        file.progress = clamp_progress(file.progress);
        tracing::debug!(workspace_id = %workspace_id, file_id = %file.id, "added file upload");
        workspace.files.push(file);
        Ok(())
    }

    fn update_file_upload(
        &mut self,
        workspace_id: &WorkspaceId,
        file_id: &FileUploadId,
        patch: FileUploadPatch,
    ) -> StoreResult<()> {
        let workspace = self.workspace_mut(workspace_id, "update-file-upload")?;
        let file = workspace
            .files
            .iter_mut()
            .find(|file| &file.id == file_id)
            .context(NotFoundSnafu {
                stage: "update-file-upload",
                entity: "file upload",
                id: file_id.to_string(),
            })?;

        if let Some(status) = patch.status {
            file.status = status;
        }
        if let Some(progress) = patch.progress {
            file.progress = clamp_progress(progress);
        }
        if let Some(error) = patch.error {
            file.error = Some(error);
        }
        Ok(())
    }

    fn remove_file_upload(
        &mut self,
        workspace_id: &WorkspaceId,
        file_id: &FileUploadId,
    ) -> StoreResult<FileUpload> {
        let workspace = self.workspace_mut(workspace_id, "remove-file-upload")?;
        let index = workspace
            .files
            .iter()
            .position(|file| &file.id == file_id)
            .context(NotFoundSnafu {
                stage: "remove-file-upload",
                entity: "file upload",
                id: file_id.to_string(),
            })?;
        Ok(workspace.files.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::types::{CodeBlock, Role, Source, SourceKind, UploadStatus};
    use crate::{CodeBlockId, SourceId};

    fn chat(id: &str, mode: ChatMode) -> Chat {
        Chat::new(ChatId::new(id), format!("chat {id}"), mode)
    }

    fn user_message(id: &str, content: &str) -> Message {
        Message::new(MessageId::new(id), Role::User, content)
    }

    fn ids(chats: Vec<&Chat>) -> Vec<&str> {
        chats.into_iter().map(|chat| chat.id.as_str()).collect()
    }

    #[test]
    fn starts_with_default_workspace_selected_and_no_chats() {
        let store = MemoryStore::new();

        assert!(store.chats().is_empty());
        assert!(store.current_chat().is_none());
        assert_eq!(store.mode(), ChatMode::Aptitude);
        let workspace = store.current_workspace().expect("default workspace");
        assert_eq!(workspace.name, "Default Workspace");
        assert_eq!(workspace.description.as_deref(), Some("Your main workspace"));
    }

    #[test]
    fn add_chat_prepends_into_list_and_current_workspace() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.add_chat(chat("c2", ChatMode::Quiz))?;

        assert_eq!(ids(store.chats()), ["c2", "c1"]);
        let workspace_id = WorkspaceId::new(crate::DEFAULT_WORKSPACE_ID);
        assert_eq!(ids(store.workspace_chats(&workspace_id)?), ["c2", "c1"]);
        Ok(())
    }

    #[test]
    fn add_chat_without_selected_workspace_files_nowhere() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        store.set_current_workspace(None)?;
        store.add_chat(chat("c1", ChatMode::Coding))?;

        assert_eq!(ids(store.chats()), ["c1"]);
        assert!(store.workspaces()[0].chat_ids.is_empty());
        Ok(())
    }

    #[test]
    fn add_chat_rejects_duplicate_identifier() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        store.add_chat(chat("c1", ChatMode::Coding))?;

        let error = store
            .add_chat(chat("c1", ChatMode::Quiz))
            .expect_err("duplicate chat id must be rejected");
        assert!(error.is_duplicate());
        assert_eq!(store.chat_count(), 1);
        assert_eq!(store.workspaces()[0].chat_ids.len(), 1);
        Ok(())
    }

    #[test]
    fn message_scenario_on_selected_chat() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.set_current_chat(Some(chat_id.clone()))?;
        store.add_message(&chat_id, user_message("m1", "hi"))?;

        let current = store.current_chat().expect("current chat");
        assert_eq!(current.messages.len(), 1);
        assert_eq!(current.messages[0].id.as_str(), "m1");
        assert_eq!(current.messages[0].content, "hi");
        Ok(())
    }

    #[test]
    fn add_message_preserves_call_order_and_refreshes_timestamp() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        let mut seeded = chat("c1", ChatMode::Custom);
        seeded.updated_at_unix_millis = 0;
        store.add_chat(seeded)?;

        for index in 0..25 {
            store.add_message(&chat_id, user_message(&format!("m{index}"), "x"))?;
        }

        let chat = store.chat(&chat_id).expect("chat");
        let order = chat
            .messages
            .iter()
            .map(|message| message.id.as_str().to_string())
            .collect::<Vec<_>>();
        let expected = (0..25).map(|index| format!("m{index}")).collect::<Vec<_>>();
        assert_eq!(order, expected);
        assert!(chat.updated_at_unix_millis > 0);
        Ok(())
    }

    #[test]
    fn add_message_to_unknown_chat_is_not_found_and_leaves_list_unchanged() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        store.add_chat(chat("c1", ChatMode::Coding))?;
        let before = store.chats().into_iter().cloned().collect::<Vec<_>>();

        let error = store
            .add_message(&ChatId::new("missing"), user_message("m1", "hi"))
            .expect_err("unknown chat");
        assert!(matches!(error, StoreError::NotFound { entity: "chat", .. }));

        let after = store.chats().into_iter().cloned().collect::<Vec<_>>();
        assert_eq!(before, after);
        Ok(())
    }

    #[test]
    fn add_message_rejects_duplicate_message_id() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.add_message(&chat_id, user_message("m1", "first"))?;

        let error = store
            .add_message(&chat_id, user_message("m1", "second"))
            .expect_err("duplicate message id");
        assert!(error.is_duplicate());
        assert_eq!(store.chat(&chat_id).map(|chat| chat.messages.len()), Some(1));
        Ok(())
    }

    #[test]
    fn update_chat_is_visible_through_current_chat() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.set_current_chat(Some(chat_id.clone()))?;

        store.update_chat(&chat_id, ChatPatch::title("X"))?;

        assert_eq!(store.current_chat().map(|chat| chat.title.as_str()), Some("X"));
        assert_eq!(store.chat(&chat_id), store.current_chat());
        Ok(())
    }

    #[test]
    fn update_unknown_chat_is_not_found() {
        let mut store = MemoryStore::new();
        let error = store
            .update_chat(&ChatId::new("nope"), ChatPatch::title("X"))
            .expect_err("unknown chat");
        assert!(error.is_not_found());
    }

    #[test]
    fn deleting_current_chat_clears_selection() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.set_current_chat(Some(chat_id.clone()))?;

        store.delete_chat(&chat_id)?;

        assert!(store.current_chat().is_none());
        assert!(store.current_chat_id().is_none());
        assert!(store.workspaces()[0].chat_ids.is_empty());
        Ok(())
    }

    #[test]
    fn deleting_other_chat_keeps_selection() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let current_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.add_chat(chat("c2", ChatMode::Coding))?;
        store.set_current_chat(Some(current_id.clone()))?;

        store.delete_chat(&ChatId::new("c2"))?;

        assert_eq!(ids(store.chats()), ["c1"]);
        assert_eq!(store.current_chat_id(), Some(&current_id));
        assert_eq!(store.current_chat().map(|chat| chat.title.as_str()), Some("chat c1"));
        Ok(())
    }

    #[test]
    fn delete_unknown_chat_is_not_found() {
        let mut store = MemoryStore::new();
        assert!(
            store
                .delete_chat(&ChatId::new("ghost"))
                .is_err_and(|error| error.is_not_found())
        );
    }

    #[test]
    fn selecting_unknown_ids_is_rejected() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.set_current_chat(Some(ChatId::new("c1")))?;

        assert!(store.set_current_chat(Some(ChatId::new("ghost"))).is_err());
        assert_eq!(store.current_chat_id().map(ChatId::as_str), Some("c1"));
        assert!(
            store
                .set_current_workspace(Some(WorkspaceId::new("ghost")))
                .is_err()
        );

        store.set_current_chat(None)?;
        assert!(store.current_chat().is_none());
        Ok(())
    }

    #[test]
    fn update_message_merges_fields_and_locks_attachments() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        let message_id = MessageId::new("m1");
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.add_message(&chat_id, Message::new(message_id.clone(), Role::Assistant, "a"))?;

        let source = Source {
            id: SourceId::new("s1"),
            title: "Binary Search Algorithm".to_string(),
            url: None,
            kind: SourceKind::Document,
            snippet: Some("O(log n)".to_string()),
        };
        store.update_message(
            &chat_id,
            &message_id,
            MessagePatch {
                content: Some("answer".to_string()),
                sources: Some(vec![source.clone()]),
                ..MessagePatch::default()
            },
        )?;

        let locked = store
            .update_message(
                &chat_id,
                &message_id,
                MessagePatch {
                    content: Some("overwritten".to_string()),
                    sources: Some(Vec::new()),
                    ..MessagePatch::default()
                },
            )
            .expect_err("sources are write-once");
        assert!(matches!(
            locked,
            StoreError::AttachmentLocked {
                field: "sources",
                ..
            }
        ));

        let code_block = CodeBlock {
            id: CodeBlockId::new("b1"),
            language: "rust".to_string(),
            code: "fn main() {}".to_string(),
            runnable: Some(true),
            output: None,
            error: None,
        };
        store.update_message(
            &chat_id,
            &message_id,
            MessagePatch {
                code_blocks: Some(vec![code_block]),
                ..MessagePatch::default()
            },
        )?;

        let message = store
            .chat(&chat_id)
            .and_then(|chat| chat.message(&message_id))
            .expect("message");
        assert_eq!(message.content, "answer");
        assert_eq!(message.sources.as_deref(), Some(&[source][..]));
        assert_eq!(message.code_blocks.as_ref().map(Vec::len), Some(1));
        Ok(())
    }

    #[test]
    fn update_message_with_unknown_ids_is_not_found() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        store.add_chat(chat("c1", ChatMode::Coding))?;

        let missing_message = store
            .update_message(&chat_id, &MessageId::new("m9"), MessagePatch::finish_streaming())
            .expect_err("unknown message");
        assert!(matches!(
            missing_message,
            StoreError::NotFound {
                entity: "message",
                ..
            }
        ));

        let missing_chat = store
            .update_message(
                &ChatId::new("c9"),
                &MessageId::new("m9"),
                MessagePatch::finish_streaming(),
            )
            .expect_err("unknown chat");
        assert!(matches!(
            missing_chat,
            StoreError::NotFound { entity: "chat", .. }
        ));
        Ok(())
    }

    #[test]
    fn append_message_content_extends_in_place() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = ChatId::new("c1");
        let placeholder = Message::assistant_streaming();
        let message_id = placeholder.id.clone();
        store.add_chat(chat("c1", ChatMode::Coding))?;
        store.add_message(&chat_id, placeholder)?;

        store.append_message_content(&chat_id, &message_id, "Hello")?;
        store.append_message_content(&chat_id, &message_id, ", world")?;

        let message = store
            .chat(&chat_id)
            .and_then(|chat| chat.message(&message_id))
            .expect("message");
        assert_eq!(message.content, "Hello, world");
        assert!(message.is_streaming());
        Ok(())
    }

    #[test]
    fn start_chat_selects_new_chat_and_switches_mode() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let chat_id = store.start_chat(ChatMode::Quiz)?;

        let current = store.current_chat().expect("current chat");
        assert_eq!(current.id, chat_id);
        assert_eq!(current.title, "New Quiz Chat");
        assert_eq!(current.mode, ChatMode::Quiz);
        assert_eq!(store.mode(), ChatMode::Quiz);
        Ok(())
    }

    #[test]
    fn recent_chats_caps_newest_first() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        for index in 0..12 {
            store.add_chat(chat(&format!("c{index}"), ChatMode::Coding))?;
        }

        let recent = ids(store.recent_chats(10));
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first(), Some(&"c11"));
        assert_eq!(recent.last(), Some(&"c2"));
        Ok(())
    }

    #[test]
    fn workspaces_track_uploads() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let workspace_id = WorkspaceId::new("study");
        store.add_workspace(Workspace::new(workspace_id.clone(), "Study", None))?;
        assert!(
            store
                .add_workspace(Workspace::new(workspace_id.clone(), "Again", None))
                .is_err_and(|error| error.is_duplicate())
        );

        store.set_current_workspace(Some(workspace_id.clone()))?;
        store.add_chat(chat("c1", ChatMode::Document))?;
        assert_eq!(ids(store.workspace_chats(&workspace_id)?), ["c1"]);

        let upload = FileUpload::new("notes.pdf", 2_048, "application/pdf");
        let file_id = upload.id.clone();
        store.add_file_upload(&workspace_id, upload)?;
        store.update_file_upload(
            &workspace_id,
            &file_id,
            FileUploadPatch {
                status: Some(UploadStatus::Processing),
                progress: Some(1.7),
                error: None,
            },
        )?;

        let file = store
            .workspace(&workspace_id)
            .and_then(|workspace| workspace.file(&file_id))
            .expect("upload");
        assert_eq!(file.status, UploadStatus::Processing);
        assert_eq!(file.progress, 1.0);

        let removed = store.remove_file_upload(&workspace_id, &file_id)?;
        assert_eq!(removed.name, "notes.pdf");
        assert!(
            store
                .remove_file_upload(&workspace_id, &file_id)
                .is_err_and(|error| error.is_not_found())
        );
        Ok(())
    }

    #[test]
    fn upload_progress_and_identifiers_are_checked() -> StoreResult<()> {
        let mut store = MemoryStore::new();
        let workspace_id = WorkspaceId::new(crate::DEFAULT_WORKSPACE_ID);

        let mut upload = FileUpload::new("slides.pptx", 512, "application/octet-stream");
        upload.progress = f32::NAN;
        let file_id = upload.id.clone();
        store.add_file_upload(&workspace_id, upload.clone())?;
        assert!(
            store
                .add_file_upload(&workspace_id, upload)
                .is_err_and(|error| error.is_duplicate())
        );

        let progress = |store: &MemoryStore| {
            store
                .workspace(&workspace_id)
                .and_then(|workspace| workspace.file(&file_id))
                .map(|file| file.progress)
        };
        assert_eq!(progress(&store), Some(0.0));

        store.update_file_upload(
            &workspace_id,
            &file_id,
            FileUploadPatch {
                progress: Some(0.4),
                ..FileUploadPatch::default()
            },
        )?;
        assert_eq!(progress(&store), Some(0.4));

        store.update_file_upload(
            &workspace_id,
            &file_id,
            FileUploadPatch {
                status: Some(UploadStatus::Error),
                progress: Some(f32::NAN),
                error: Some("virus scan failed".to_string()),
            },
        )?;
        assert_eq!(progress(&store), Some(0.0));

        let missing = FileUploadId::new("missing");
        assert!(
            store
                .update_file_upload(&workspace_id, &missing, FileUploadPatch::default())
                .is_err_and(|error| error.is_not_found())
        );
        assert!(
            store
                .add_file_upload(
                    &WorkspaceId::new("nowhere"),
                    FileUpload::new("a.txt", 1, "text/plain")
                )
                .is_err_and(|error| error.is_not_found())
        );
        Ok(())
    }
}
