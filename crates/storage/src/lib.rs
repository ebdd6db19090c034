pub mod error;
pub mod ids;
pub mod memory;
pub mod mode;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use ids::{ChatId, CodeBlockId, FileUploadId, MessageId, SourceId, WorkspaceId};
pub use memory::MemoryStore;
pub use mode::{ChatMode, ModeTool};
pub use types::{
    Chat, ChatPatch, CodeBlock, DEFAULT_WORKSPACE_DESCRIPTION, DEFAULT_WORKSPACE_ID,
    DEFAULT_WORKSPACE_NAME, FileUpload, FileUploadPatch, Message, MessagePatch, Role, Source,
    SourceKind, UploadStatus, Workspace, now_unix_millis,
};

pub trait ChatStore {
    /// Prepends `chat` and files it under the current workspace, if any.
    fn add_chat(&mut self, chat: Chat) -> StoreResult<()>;
    fn update_chat(&mut self, chat_id: &ChatId, patch: ChatPatch) -> StoreResult<()>;
    /// Removes the chat, clearing the selection when it was current.
    fn delete_chat(&mut self, chat_id: &ChatId) -> StoreResult<Chat>;
    fn chat(&self, chat_id: &ChatId) -> Option<&Chat>;
    /// Newest first.
    fn chats(&self) -> Vec<&Chat>;
    fn set_current_chat(&mut self, chat_id: Option<ChatId>) -> StoreResult<()>;
    fn current_chat(&self) -> Option<&Chat>;
}

pub trait MessageStore {
    fn add_message(&mut self, chat_id: &ChatId, message: Message) -> StoreResult<()>;
    fn update_message(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        patch: MessagePatch,
    ) -> StoreResult<()>;
    fn append_message_content(
        &mut self,
        chat_id: &ChatId,
        message_id: &MessageId,
        delta: &str,
    ) -> StoreResult<()>;
}

pub trait WorkspaceStore {
    fn add_workspace(&mut self, workspace: Workspace) -> StoreResult<()>;
    fn workspace(&self, workspace_id: &WorkspaceId) -> Option<&Workspace>;
    fn workspaces(&self) -> &[Workspace];
    fn set_current_workspace(&mut self, workspace_id: Option<WorkspaceId>) -> StoreResult<()>;
    fn current_workspace(&self) -> Option<&Workspace>;
    /// Resolves a workspace's chat references, newest first.
    fn workspace_chats(&self, workspace_id: &WorkspaceId) -> StoreResult<Vec<&Chat>>;
    fn add_file_upload(&mut self, workspace_id: &WorkspaceId, file: FileUpload)
    -> StoreResult<()>;
    fn update_file_upload(
        &mut self,
        workspace_id: &WorkspaceId,
        file_id: &FileUploadId,
        patch: FileUploadPatch,
    ) -> StoreResult<()>;
    fn remove_file_upload(
        &mut self,
        workspace_id: &WorkspaceId,
        file_id: &FileUploadId,
    ) -> StoreResult<FileUpload>;
}

pub trait Storage: ChatStore + MessageStore + WorkspaceStore {}

impl<T> Storage for T where T: ChatStore + MessageStore + WorkspaceStore {}
