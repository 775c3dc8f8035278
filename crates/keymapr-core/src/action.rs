// Keymapr Action Type
// The payload dispatched when a trigger fires

use std::fmt;

use crate::Key;

/// What to do when a trigger fires.
///
/// The detection engine treats actions as opaque values: it deduplicates them
/// by equality at compile time and re-emits them when a trigger completes,
/// but never interprets their content. Execution is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Spawn a shell command.
    Command { command: String },
    /// Emit a key press/release pair on the virtual output device.
    SendKey { key: Key },
    /// Type a piece of text.
    Text { text: String },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Command { command } => write!(f, "command({})", command),
            Action::SendKey { key } => write!(f, "key({})", key),
            Action::Text { text } => write!(f, "text({:?})", text),
        }
    }
}
