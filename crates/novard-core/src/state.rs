//! UI-agnostic chat transcript types
//!
//! The transcript is scoped to one client run. It is never written to disk.

use serde::{Deserialize, Serialize};

/// One line of the career chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub text: String,
    pub sender: ChatSender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatSender {
    User,
    Bot,
    /// Progress notes such as "Analyzing your profile...".
    System,
}

impl ChatEntry {
    pub fn new(sender: ChatSender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }

    /// Text as shown to the user; user lines carry a `You: ` prefix.
    pub fn display(&self) -> String {
        match self.sender {
            ChatSender::User => format!("You: {}", self.text),
            ChatSender::Bot | ChatSender::System => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<ChatEntry>,
}

impl Transcript {
    pub fn push(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }
}
