use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::ids::{ChatId, CodeBlockId, FileUploadId, MessageId, SourceId, WorkspaceId};
use super::mode::ChatMode;

pub const DEFAULT_WORKSPACE_ID: &str = "default";
pub const DEFAULT_WORKSPACE_NAME: &str = "Default Workspace";
pub const DEFAULT_WORKSPACE_DESCRIPTION: &str = "Your main workspace";

pub fn now_unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|elapsed| u64::try_from(elapsed.as_millis()).ok())
        .unwrap_or(0)
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Document,
    Web,
    Code,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub title: String,
    pub url: Option<String>,
    pub kind: SourceKind,
    pub snippet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub id: CodeBlockId,
    pub language: String,
    pub code: String,
    pub runnable: Option<bool>,
    pub output: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp_unix_millis: u64,
    pub sources: Option<Vec<Source>>,
    pub code_blocks: Option<Vec<CodeBlock>>,
    pub is_streaming: Option<bool>,
}

impl Message {
    pub fn new(id: MessageId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            timestamp_unix_millis: now_unix_millis(),
            sources: None,
            code_blocks: None,
            is_streaming: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageId::new_v7(), Role::User, content)
    }

    /// Empty assistant placeholder that a streamed reply fills in.
    pub fn assistant_streaming() -> Self {
        let mut message = Self::new(MessageId::new_v7(), Role::Assistant, String::new());
        message.is_streaming = Some(true);
        message
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub title: String,
    pub mode: ChatMode,
    pub created_at_unix_millis: u64,
    pub updated_at_unix_millis: u64,
    pub messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: ChatId, title: impl Into<String>, mode: ChatMode) -> Self {
        let now = now_unix_millis();
        Self {
            id,
            title: title.into(),
            mode,
            created_at_unix_millis: now,
            updated_at_unix_millis: now,
            messages: Vec::new(),
        }
    }

    /// Fresh, empty chat titled after its mode.
    pub fn for_mode(mode: ChatMode) -> Self {
        Self::new(ChatId::new_v7(), mode.new_chat_title(), mode)
    }

    pub fn message(&self, message_id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|message| &message.id == message_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUpload {
    pub id: FileUploadId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: UploadStatus,
    /// Fraction in `[0.0, 1.0]`.
    pub progress: f32,
    pub error: Option<String>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, size_bytes: u64, mime_type: impl Into<String>) -> Self {
        Self {
            id: FileUploadId::new_v7(),
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            status: UploadStatus::Uploading,
            progress: 0.0,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    /// Newest first, mirroring the store's chat order.
    pub chat_ids: Vec<ChatId>,
    pub files: Vec<FileUpload>,
    pub created_at_unix_millis: u64,
}

impl Workspace {
    pub fn new(id: WorkspaceId, name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description,
            chat_ids: Vec::new(),
            files: Vec::new(),
            created_at_unix_millis: now_unix_millis(),
        }
    }

    pub fn default_workspace() -> Self {
        Self::new(
            WorkspaceId::new(DEFAULT_WORKSPACE_ID),
            DEFAULT_WORKSPACE_NAME,
            Some(DEFAULT_WORKSPACE_DESCRIPTION.to_string()),
        )
    }

    pub fn file(&self, file_id: &FileUploadId) -> Option<&FileUpload> {
        self.files.iter().find(|file| &file.id == file_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatPatch {
    pub title: Option<String>,
    pub mode: Option<ChatMode>,
}

impl ChatPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagePatch {
    pub content: Option<String>,
    pub is_streaming: Option<bool>,
    pub sources: Option<Vec<Source>>,
    pub code_blocks: Option<Vec<CodeBlock>>,
}

impl MessagePatch {
    pub fn finish_streaming() -> Self {
        Self {
            is_streaming: Some(false),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileUploadPatch {
    pub status: Option<UploadStatus>,
    pub progress: Option<f32>,
    pub error: Option<String>,
}
