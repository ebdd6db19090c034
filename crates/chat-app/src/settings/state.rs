use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use varsh_llm::{
    DEFAULT_FIRST_TOKEN_DELAY, DEFAULT_STREAM_DURATION, SIMULATED_RESPONDER_ID, SimulatedConfig,
};
use varsh_store::{
    ChatMode, DEFAULT_WORKSPACE_DESCRIPTION, DEFAULT_WORKSPACE_ID, DEFAULT_WORKSPACE_NAME,
    MemoryStore, Workspace, WorkspaceId,
};

pub const SETTINGS_DIRECTORY_NAME: &str = "varsh";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const SETTINGS_ENV_PREFIX: &str = "VARSH_";
pub const DEFAULT_RECENT_CHAT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub default_mode: ChatMode,
    #[serde(default = "default_workspace_name")]
    pub workspace_name: String,
    #[serde(default = "default_workspace_description")]
    pub workspace_description: String,
    #[serde(default = "default_responder_id")]
    pub responder_id: String,
    #[serde(default = "default_first_token_delay_ms")]
    pub first_token_delay_ms: u64,
    #[serde(default = "default_stream_duration_ms")]
    pub stream_duration_ms: u64,
    #[serde(default = "default_recent_chat_limit")]
    pub recent_chat_limit: usize,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_mode: ChatMode::default(),
            workspace_name: default_workspace_name(),
            workspace_description: default_workspace_description(),
            responder_id: default_responder_id(),
            first_token_delay_ms: default_first_token_delay_ms(),
            stream_duration_ms: default_stream_duration_ms(),
            recent_chat_limit: default_recent_chat_limit(),
        }
    }
}

impl AppSettings {
    pub fn normalized(mut self) -> Self {
        self.workspace_name = if self.workspace_name.trim().is_empty() {
            default_workspace_name()
        } else {
            self.workspace_name.trim().to_string()
        };
        self.workspace_description = self.workspace_description.trim().to_string();
        self.responder_id = if self.responder_id.trim().is_empty() {
            default_responder_id()
        } else {
            self.responder_id.trim().to_string()
        };
        self.recent_chat_limit = self.recent_chat_limit.max(1);
        self
    }

    pub fn simulated_config(&self) -> SimulatedConfig {
        SimulatedConfig {
            first_token_delay: Duration::from_millis(self.first_token_delay_ms),
            stream_duration: Duration::from_millis(self.stream_duration_ms),
        }
    }

    /// Fresh store with the configured workspace selected.
    pub fn build_store(&self) -> MemoryStore {
        let description = Some(self.workspace_description.clone()).filter(|text| !text.is_empty());
        let workspace = Workspace::new(
            WorkspaceId::new(DEFAULT_WORKSPACE_ID),
            self.workspace_name.clone(),
            description,
        );
        MemoryStore::with_workspace(workspace, self.default_mode)
    }
}

pub struct SettingsStore {
    settings: Arc<ArcSwap<AppSettings>>,
    config_path: PathBuf,
}

impl SettingsStore {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".varsh"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    pub fn new(config_path: PathBuf) -> Self {
        Self::with_env_prefix(config_path, SETTINGS_ENV_PREFIX)
    }

    /// Loads from `config_path`, letting `<env_prefix><FIELD>` variables
    /// override file values.
    pub fn with_env_prefix(config_path: PathBuf, env_prefix: &str) -> Self {
        let settings = Self::load_from_disk(&config_path, env_prefix);
        Self {
            settings: Arc::new(ArcSwap::from_pointee(settings)),
            config_path,
        }
    }

    pub fn load() -> Self {
        Self::new(Self::default_config_path())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> Arc<AppSettings> {
        self.settings.load_full()
    }

    pub fn update(&self, settings: AppSettings) -> Result<(), SettingsError> {
        let normalized_settings = settings.normalized();
        self.persist(&normalized_settings)?;
        self.settings.store(Arc::new(normalized_settings));
        Ok(())
    }

    fn load_from_disk(path: &Path, env_prefix: &str) -> AppSettings {
        let mut figment = Figment::from(Serialized::defaults(AppSettings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        let figment = figment.merge(Env::prefixed(env_prefix));

        match figment.extract::<AppSettings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                AppSettings::default()
            }
        }
    }

    fn persist(&self, settings: &AppSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(settings).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = self.config_path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, &self.config_path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: self.config_path.clone(),
        })?;

        tracing::info!("saved settings to {:?}", self.config_path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn default_workspace_name() -> String {
    DEFAULT_WORKSPACE_NAME.to_string()
}

fn default_workspace_description() -> String {
    DEFAULT_WORKSPACE_DESCRIPTION.to_string()
}

fn default_responder_id() -> String {
    SIMULATED_RESPONDER_ID.to_string()
}

fn default_first_token_delay_ms() -> u64 {
    u64::try_from(DEFAULT_FIRST_TOKEN_DELAY.as_millis()).unwrap_or(u64::MAX)
}

fn default_stream_duration_ms() -> u64 {
    u64::try_from(DEFAULT_STREAM_DURATION.as_millis()).unwrap_or(u64::MAX)
}

fn default_recent_chat_limit() -> usize {
    DEFAULT_RECENT_CHAT_LIMIT
}
