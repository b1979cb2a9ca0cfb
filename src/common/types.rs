use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ChatError;

/// Recipient value meaning "everyone in the room".
pub const BROADCAST: &str = "Todos";

pub const JOIN_TEXT: &str = "enters the room...";
pub const LEAVE_TEXT: &str = "leaves the room...";

/// A registered identity and its last liveness signal (ms since epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    #[serde(rename = "lastStatus")]
    pub last_heartbeat: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Public broadcast, visible to everyone.
    Message,
    /// Direct message between two participants.
    PrivateMessage,
    /// System generated join/leave notice.
    Status,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::PrivateMessage => "private_message",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(Self::Message),
            "private_message" => Ok(Self::PrivateMessage),
            "status" => Ok(Self::Status),
            other => Err(ChatError::InvalidArgument(format!(
                "unknown message type `{other}`"
            ))),
        }
    }
}

/// A stored chat message. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub time: String,
}

/// Unvalidated message as handed to the store. `kind` stays a raw string so the
/// store can reject unknown types even when called without the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub from: String,
    pub to: String,
    pub text: String,
    pub kind: String,
    pub time: Option<String>,
}

impl MessageDraft {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        text: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            text: text.into(),
            kind: kind.into(),
            time: None,
        }
    }

    /// Room-wide notice about `name` joining or leaving.
    pub fn status(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, BROADCAST, text, MessageKind::Status.as_str())
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }
}
