use std::num::ParseIntError;

use snafu::{OptionExt, ResultExt, Snafu};
use varsh_store::{ChatMode, StoreError};

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    New(Option<ChatMode>),
    Mode(ChatMode),
    Chats,
    /// 1-based position in the recent chat list.
    Open(usize),
    Rename(String),
    Delete,
    Stop,
    Prompts,
    Help,
    Quit,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CommandError {
    #[snafu(display("unknown command '/{name}', try /help"))]
    UnknownCommand { stage: &'static str, name: String },
    #[snafu(display("/{command} needs an argument"))]
    MissingArgument {
        stage: &'static str,
        command: &'static str,
    },
    #[snafu(display("'{raw}' is not a chat number"))]
    InvalidIndex {
        stage: &'static str,
        raw: String,
        source: ParseIntError,
    },
    #[snafu(display("{source}"))]
    InvalidMode {
        stage: &'static str,
        source: StoreError,
    },
}

pub const HELP: &str = "\
commands:
  <text>          send a message to the current chat
  /new [mode]     start a chat (aptitude, coding, document, quiz, custom)
  /mode <mode>    switch the active mode
  /chats          list recent chats
  /open <n>       select a chat from /chats
  /rename <title> rename the current chat
  /delete         delete the current chat
  /stop           cancel the reply in progress
  /prompts        show prompts for the active mode
  /help           show this help
  /quit, /exit    exit";

impl Command {
    /// Returns `None` for blank lines.
    pub fn parse(line: &str) -> Option<Result<Self, CommandError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let Some(rest) = line.strip_prefix('/') else {
            return Some(Ok(Self::Submit(line.to_string())));
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, Some(argument.trim()).filter(|arg| !arg.is_empty())),
            None => (rest, None),
        };
        Some(Self::parse_command(name, argument))
    }

    fn parse_command(name: &str, argument: Option<&str>) -> Result<Self, CommandError> {
        match name {
            "new" => argument.map(parse_mode).transpose().map(Self::New),
            "mode" => {
                let raw = argument.context(MissingArgumentSnafu {
                    stage: "parse-mode-command",
                    command: "mode",
                })?;
                parse_mode(raw).map(Self::Mode)
            }
            "chats" => Ok(Self::Chats),
            "open" => {
                let raw = argument.context(MissingArgumentSnafu {
                    stage: "parse-open-command",
                    command: "open",
                })?;
                let index = raw.parse::<usize>().context(InvalidIndexSnafu {
                    stage: "parse-open-command",
                    raw: raw.to_string(),
                })?;
                Ok(Self::Open(index))
            }
            "rename" => argument
                .map(|title| Self::Rename(title.to_string()))
                .context(MissingArgumentSnafu {
                    stage: "parse-rename-command",
                    command: "rename",
                }),
            "delete" => Ok(Self::Delete),
            "stop" => Ok(Self::Stop),
            "prompts" => Ok(Self::Prompts),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            other => UnknownCommandSnafu {
                stage: "parse-command",
                name: other.to_string(),
            }
            .fail(),
        }
    }
}

fn parse_mode(raw: &str) -> Result<ChatMode, CommandError> {
    raw.parse::<ChatMode>().context(InvalidModeSnafu {
        stage: "parse-command-mode",
    })
}
