//! Conversation state types

use crate::flow::{Step, StepGraph, StepId};
use std::sync::Arc;
use std::time::Duration;

use super::transition::TransitionError;

/// Default simulated typing delay
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(800);

/// Conversation phase
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FlowState {
    /// Created, nothing posted yet
    #[default]
    Idle,

    /// Bot message for `step_id` is in flight
    Typing {
        step_id: StepId,
        /// Step still considered active until the message lands
        active: StepId,
    },

    /// Bot message shown, waiting for the user's answer
    AwaitingInput { step_id: StepId },

    /// Conversation ended at `last_step` (terminal step or closing choice)
    Finished { last_step: StepId },

    /// Widget torn down; absorbs every event
    Disposed,
}

impl FlowState {
    pub fn is_thinking(&self) -> bool {
        matches!(self, FlowState::Typing { .. })
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, FlowState::Finished { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, FlowState::Disposed)
    }

    /// Step awaiting a response, as reported to the collaborator
    ///
    /// Before `start` this is the entry step; while typing it is the step
    /// that was active when the transition was decided.
    pub fn active_step<'a>(&'a self, entry: &'a StepId) -> Option<&'a StepId> {
        match self {
            FlowState::Idle => Some(entry),
            FlowState::Typing { active, .. } => Some(active),
            FlowState::AwaitingInput { step_id } => Some(step_id),
            FlowState::Finished { .. } | FlowState::Disposed => None,
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::Idle => "idle",
            FlowState::Typing { .. } => "typing",
            FlowState::AwaitingInput { .. } => "awaiting_input",
            FlowState::Finished { .. } => "finished",
            FlowState::Disposed => "disposed",
        }
    }
}

/// Immutable configuration of a conversation
#[derive(Debug, Clone)]
pub struct FlowContext {
    pub graph: Arc<StepGraph>,
    pub typing_delay: Duration,
    pub currency_symbol: String,
}

impl FlowContext {
    pub fn new(graph: Arc<StepGraph>) -> Self {
        Self {
            graph,
            typing_delay: DEFAULT_TYPING_DELAY,
            currency_symbol: "$".to_string(),
        }
    }

    pub fn with_typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn with_currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn entry(&self) -> &StepId {
        self.graph.entry()
    }

    /// Resolve a step id, failing with an invalid-reference error
    pub fn step(&self, id: &StepId) -> Result<&Step, TransitionError> {
        self.graph
            .get(id.as_str())
            .ok_or_else(|| TransitionError::UnknownStep(id.clone()))
    }
}
