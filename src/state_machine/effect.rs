//! Effects produced by state transitions

use crate::flow::{Step, StepId};
use crate::session::{Answer, MessageWidget, Sender};
use std::time::Duration;

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append a message to the transcript
    AppendMessage {
        sender: Sender,
        text: String,
        widget: Option<MessageWidget>,
    },

    /// Record a collected lead answer
    RecordAnswer { answer: Answer },

    /// Start the simulated typing delay for a bot message
    ScheduleTyping { step_id: StepId, delay: Duration },

    /// Drop any pending typing completion
    CancelTyping,

    /// Replace the session with a fresh one
    ResetSession,

    /// Tell subscribers the conversation ended
    NotifyFinished,
}

impl Effect {
    pub fn user_message(text: impl Into<String>) -> Self {
        Effect::AppendMessage {
            sender: Sender::User,
            text: text.into(),
            widget: None,
        }
    }

    pub fn bot_message(step: &Step) -> Self {
        Effect::AppendMessage {
            sender: Sender::Bot,
            text: step.prompt.clone(),
            widget: MessageWidget::for_step(step),
        }
    }

    pub fn schedule_typing(step_id: StepId, delay: Duration) -> Self {
        Effect::ScheduleTyping { step_id, delay }
    }

    pub fn record_answer(answer: Answer) -> Self {
        Effect::RecordAnswer { answer }
    }

    pub fn is_message_from(&self, expected: Sender) -> bool {
        matches!(self, Effect::AppendMessage { sender, .. } if *sender == expected)
    }
}
