//! Observable session state: transcript, active step, thinking flag

use crate::flow::{Choice, Step, StepId, StepKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Bot,
    User,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Bot => write!(f, "bot"),
            Sender::User => write!(f, "user"),
        }
    }
}

/// Interactive control attached to a bot message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageWidget {
    pub step_id: StepId,
    pub kind: StepKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

impl MessageWidget {
    /// Widget for a step, or `None` for terminal steps which take no input
    pub fn for_step(step: &Step) -> Option<Self> {
        let kind = step.kind();
        if kind.is_terminal() {
            return None;
        }
        Some(Self {
            step_id: step.id.clone(),
            kind,
            choices: step.choices().to_vec(),
        })
    }
}

/// Immutable transcript record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Creation order within the session, starting at 1
    pub id: u64,
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget: Option<MessageWidget>,
    pub created_at: DateTime<Utc>,
}

/// A collected lead answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnswerValue {
    Choice { value: String, label: String },
    Amount { amount: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub step_id: StepId,
    #[serde(flatten)]
    pub value: AnswerValue,
}

impl Answer {
    pub fn choice(step_id: StepId, choice: &Choice) -> Self {
        Self {
            step_id,
            value: AnswerValue::Choice {
                value: choice.value.clone(),
                label: choice.label.clone(),
            },
        }
    }

    pub fn amount(step_id: StepId, amount: u64) -> Self {
        Self {
            step_id,
            value: AnswerValue::Amount { amount },
        }
    }
}

/// Snapshot of one conversation as seen by the rendering collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Uuid,
    pub transcript: Vec<Message>,
    /// Step awaiting a response; unchanged while a bot message is in flight
    pub active_step_id: Option<StepId>,
    pub is_thinking: bool,
    pub is_finished: bool,
    pub answers: Vec<Answer>,
}

impl Session {
    pub fn new(entry: StepId) -> Self {
        Self {
            id: Uuid::new_v4(),
            transcript: Vec::new(),
            active_step_id: Some(entry),
            is_thinking: false,
            is_finished: false,
            answers: Vec::new(),
        }
    }

    /// Append a message, assigning the next id
    pub fn push_message(
        &mut self,
        sender: Sender,
        text: String,
        widget: Option<MessageWidget>,
    ) -> &Message {
        let id = self.transcript.last().map_or(1, |m| m.id + 1);
        self.transcript.push(Message {
            id,
            sender,
            text,
            widget,
            created_at: Utc::now(),
        });
        &self.transcript[self.transcript.len() - 1]
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.transcript.last()
    }

    /// The most recent bot message carrying a widget for the active step
    pub fn active_widget(&self) -> Option<&MessageWidget> {
        let active = self.active_step_id.as_ref()?;
        self.transcript
            .iter()
            .rev()
            .filter_map(|m| m.widget.as_ref())
            .find(|w| &w.step_id == active)
    }

    pub fn count_from(&self, sender: Sender) -> usize {
        self.transcript.iter().filter(|m| m.sender == sender).count()
    }

    pub fn answer_for(&self, step_id: &str) -> Option<&AnswerValue> {
        self.answers
            .iter()
            .find(|a| a.step_id.as_str() == step_id)
            .map(|a| &a.value)
    }
}
