use serde::{Deserialize, Serialize};
use std::fmt;

/// Transcript turn identifier. Assigned monotonically per store, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Agent,
}

/// Lifecycle of a single turn's content.
///
/// `Finalized` is absorbing: once a turn reaches it, its content is immutable
/// and late-arriving fragments are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Empty,
    Streaming,
    Finalized,
}

/// One exchange unit in the transcript, user or agent authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: TurnId,
    pub role: TurnRole,
    pub content: String,
    /// Display-formatted creation time, e.g. "09:01".
    pub timestamp: String,
    pub state: TurnState,
}

impl ChatTurn {
    pub fn is_finalized(&self) -> bool {
        self.state == TurnState::Finalized
    }
}
