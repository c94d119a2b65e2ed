//! Chat state owned by the input-to-render loop.
//!
//! Sends are split in two: [`ChatSession::begin_send`] does the synchronous
//! bookkeeping and hands back a [`Dispatch`], and results come back later as
//! [`SessionEvent`]s through [`ChatSession::apply`]. Every dispatch is tagged
//! with the session epoch; [`ChatSession::reset`] bumps it so events from a
//! reply started before the reset are dropped.

use shared::{ChatMessage, ChatRequest, Reply};

use crate::error::InputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Mode {
    /// One buffered request, reply shown when complete.
    Normal,
    /// Reply rendered as it streams in.
    #[default]
    Streaming,
}

impl Mode {
    pub fn toggle(self) -> Self {
        match self {
            Mode::Normal => Mode::Streaming,
            Mode::Streaming => Mode::Normal,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Streaming => "streaming",
        }
    }
}

/// Work produced by a successful [`ChatSession::begin_send`].
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub epoch: u64,
    pub request: ChatRequest,
    /// Index of the empty assistant message a streamed reply fills in;
    /// `None` for a buffered request.
    pub placeholder: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Full replacement text for the placeholder.
    Progress {
        epoch: u64,
        slot: usize,
        content: String,
        thinking: Option<String>,
    },
    Reply {
        epoch: u64,
        slot: Option<usize>,
        reply: Reply,
    },
    Failed {
        epoch: u64,
        slot: Option<usize>,
        error: String,
    },
}

impl SessionEvent {
    pub fn epoch(&self) -> u64 {
        match self {
            SessionEvent::Progress { epoch, .. }
            | SessionEvent::Reply { epoch, .. }
            | SessionEvent::Failed { epoch, .. } => *epoch,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionEvent::Progress { .. })
    }
}

#[derive(Debug, Default)]
pub struct ChatSession {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub loading: bool,
    pub mode: Mode,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub last_error: Option<String>,
    epoch: u64,
}

impl ChatSession {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Validate the pending input and record the user turn. Leaves the
    /// session untouched on error.
    pub fn begin_send(&mut self) -> Result<Dispatch, InputError> {
        let text = self.input.trim();
        if text.is_empty() {
            return Err(InputError::Empty);
        }
        if self.loading {
            return Err(InputError::Busy);
        }

        self.messages.push(ChatMessage::user(text));
        self.input.clear();
        self.loading = true;
        self.last_error = None;

        let request = ChatRequest {
            messages: self.messages.iter().map(ChatMessage::for_upstream).collect(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let placeholder = match self.mode {
            Mode::Normal => None,
            Mode::Streaming => {
                self.messages.push(ChatMessage::assistant(""));
                Some(self.messages.len() - 1)
            }
        };

        Ok(Dispatch {
            epoch: self.epoch,
            request,
            placeholder,
        })
    }

    pub fn apply(&mut self, event: SessionEvent) {
        if event.epoch() != self.epoch {
            tracing::debug!(
                event_epoch = event.epoch(),
                epoch = self.epoch,
                "dropping event from before reset"
            );
            return;
        }

        match event {
            SessionEvent::Progress {
                slot,
                content,
                thinking,
                ..
            } => {
                if let Some(message) = self.messages.get_mut(slot) {
                    message.content = content;
                    message.thinking = thinking;
                }
            }
            SessionEvent::Reply { slot, reply, .. } => {
                let message = reply.into_message();
                match slot.and_then(|i| self.messages.get_mut(i)) {
                    Some(existing) => *existing = message,
                    None => self.messages.push(message),
                }
                self.loading = false;
            }
            SessionEvent::Failed { slot, error, .. } => {
                // Drop a placeholder that never received any text.
                if let Some(i) = slot {
                    let untouched = self
                        .messages
                        .get(i)
                        .is_some_and(|m| m.content.is_empty() && m.thinking.is_none());
                    if untouched && i + 1 == self.messages.len() {
                        self.messages.pop();
                    }
                }
                self.loading = false;
                self.last_error = Some(error);
            }
        }
    }

    /// Clear the conversation. Any reply still in flight is orphaned.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.loading = false;
        self.last_error = None;
        self.epoch += 1;
    }
}
