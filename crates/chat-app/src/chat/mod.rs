pub mod command;
pub mod events;
pub mod session;
pub mod shell;
pub mod stream;

pub use command::{Command, CommandError};
pub use events::SessionEvent;
pub use session::{ChatSession, SessionError, SessionResult};
pub use shell::Shell;
pub use stream::{StreamState, StreamTransition, StreamTransitionRejection};
