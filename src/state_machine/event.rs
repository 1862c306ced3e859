//! Events that can occur in a conversation

use crate::flow::{Choice, StepId};

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    // Collaborator events
    Start,
    PostBotMessage {
        step_id: StepId,
    },
    SelectChoice {
        choice: Choice,
    },
    SubmitAmount {
        raw: String,
    },
    Restart,
    Dispose,

    // Timer events
    TypingElapsed {
        step_id: StepId,
        /// Stamped by the runtime; stale generations never reach `transition`
        generation: u64,
    },
}

impl Event {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::PostBotMessage { .. } => "post_bot_message",
            Event::SelectChoice { .. } => "select_choice",
            Event::SubmitAmount { .. } => "submit_amount",
            Event::Restart => "restart",
            Event::Dispose => "dispose",
            Event::TypingElapsed { .. } => "typing_elapsed",
        }
    }

    /// Events that carry a user answer
    pub fn is_user_input(&self) -> bool {
        matches!(self, Event::SelectChoice { .. } | Event::SubmitAmount { .. })
    }
}
