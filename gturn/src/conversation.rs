//! Caller-owned conversation transcript and per-turn configuration.

use gclient::{Message, SamplingOptions};

/// Ordered transcript plus the model/sampling configuration for its turns.
///
/// The transcript is append-only: turn handlers push messages as a side
/// effect of handling a turn, and only [`ConversationState::reset`] clears
/// it. One state must not be shared across concurrently running turns.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    model: String,
    options: SamplingOptions,
    messages: Vec<Message>,
}

impl ConversationState {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            options: SamplingOptions::default(),
            messages: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: SamplingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.messages.push(Message::system(prompt));
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &SamplingOptions {
        &self.options
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Clears the transcript; model and sampling options survive.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
