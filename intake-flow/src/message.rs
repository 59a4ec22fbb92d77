use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    User,
    #[serde(rename = "AI")]
    Ai,
}

/// A single log entry. Serializes as `{"speaker": "User"|"AI", "text": ...}`,
/// which is also the wire shape sent to the recommendation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub speaker: Speaker,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Ai,
            text: text.into(),
        }
    }
}

/// Append-only conversation log.
///
/// Entries are never edited or removed; the only way back is [`MessageLog::reset`],
/// which drops everything and starts over from a single greeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog {
    entries: Vec<Message>,
}

impl MessageLog {
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            entries: vec![Message::ai(greeting)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.entries.push(message);
    }

    pub fn reset(&mut self, greeting: impl Into<String>) {
        self.entries.clear();
        self.entries.push(Message::ai(greeting));
    }

    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last()
    }

    /// Entries appended since the log had `len` entries.
    pub fn since(&self, len: usize) -> &[Message] {
        self.entries.get(len..).unwrap_or_default()
    }
}
