use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a conversation. `thinking` only ever appears on assistant
/// messages; both fields are mutable only while the message is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            thinking: None,
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            thinking: None,
        }
    }

    #[must_use]
    pub const fn placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            thinking: None,
        }
    }

    /// True when neither response text nor thinking text has accumulated.
    #[must_use]
    pub fn is_empty_turn(&self) -> bool {
        self.content.is_empty() && self.thinking.as_deref().is_none_or(str::is_empty)
    }
}

/// Mutation notification delivered to subscribers, carrying owned payloads so
/// observers never need to reach back into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptChange {
    Appended { index: usize, message: Message },
    ContentDelta { index: usize, text: String },
    ThinkingDelta { index: usize, text: String },
    Finalized { index: usize },
    Removed { index: usize },
    Replaced { messages: Vec<Message> },
}

/// Ordered conversation transcript. Append-only, except that the single
/// in-flight assistant message may grow until finalized or removed.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    in_flight: Option<usize>,
    listeners: Vec<mpsc::UnboundedSender<TranscriptChange>>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub const fn in_flight(&self) -> Option<usize> {
        self.in_flight
    }

    /// Registers an observer. Closed receivers are pruned on the next notify.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<TranscriptChange> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.push(tx);
        rx
    }

    fn notify(&mut self, change: &TranscriptChange) {
        self.listeners.retain(|tx| tx.send(change.clone()).is_ok());
    }

    /// Appends an immutable message.
    pub fn push(&mut self, message: Message) {
        let index = self.messages.len();
        self.messages.push(message.clone());
        self.notify(&TranscriptChange::Appended { index, message });
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Message::user(text));
    }

    /// Appends an empty assistant placeholder and marks it in flight. Any
    /// previously in-flight message is finalized first so that at most one
    /// mutable entry exists at a time.
    pub fn begin_assistant(&mut self) -> usize {
        if self.in_flight.is_some() {
            self.finalize_in_flight();
        }
        let index = self.messages.len();
        self.messages.push(Message::placeholder());
        self.in_flight = Some(index);
        self.notify(&TranscriptChange::Appended {
            index,
            message: Message::placeholder(),
        });
        index
    }

    /// Appends response text to the in-flight message. No-op when nothing is
    /// in flight.
    pub fn append_content(&mut self, text: &str) {
        let Some(index) = self.in_flight else { return };
        if let Some(message) = self.messages.get_mut(index) {
            message.content.push_str(text);
            self.notify(&TranscriptChange::ContentDelta {
                index,
                text: text.to_string(),
            });
        }
    }

    /// Appends thinking text to the in-flight message, lazily initializing
    /// the thinking buffer.
    pub fn append_thinking(&mut self, text: &str) {
        let Some(index) = self.in_flight else { return };
        if let Some(message) = self.messages.get_mut(index) {
            message
                .thinking
                .get_or_insert_with(String::new)
                .push_str(text);
            self.notify(&TranscriptChange::ThinkingDelta {
                index,
                text: text.to_string(),
            });
        }
    }

    /// Seals the in-flight message; it is immutable from here on.
    pub fn finalize_in_flight(&mut self) {
        if let Some(index) = self.in_flight.take() {
            self.notify(&TranscriptChange::Finalized { index });
        }
    }

    /// Ends the in-flight message after an interrupted stream: a wholly empty
    /// turn is removed, a partial one is kept and sealed. Returns true when
    /// the message was removed.
    pub fn abort_in_flight(&mut self) -> bool {
        let Some(index) = self.in_flight.take() else {
            return false;
        };
        let empty = self
            .messages
            .get(index)
            .is_some_and(Message::is_empty_turn);
        if empty {
            self.messages.remove(index);
            self.notify(&TranscriptChange::Removed { index });
            true
        } else {
            self.notify(&TranscriptChange::Finalized { index });
            false
        }
    }

    /// Replaces the whole transcript, e.g. on new chat or conversation load.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.in_flight = None;
        self.messages = messages.clone();
        self.notify(&TranscriptChange::Replaced { messages });
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }
}
