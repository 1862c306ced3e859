//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. Timers, ids and timestamps live in the runtime.

use super::{Effect, Event, FlowContext, FlowState};
use crate::error::ErrorKind;
use crate::flow::{format_amount, parse_amount, AmountError, Choice, StepId, StepKind, StepWidget};
use crate::session::Answer;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: FlowState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: FlowState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
///
/// A rejected event leaves the state untouched.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Assistant is typing, wait for the next message")]
    Busy,
    #[error("Conversation has not started")]
    NotStarted,
    #[error("Conversation has already started")]
    AlreadyStarted,
    #[error("Conversation has ended")]
    Finished,
    #[error("Conversation was closed")]
    Disposed,
    #[error("Step {step} is {kind} and does not accept {input}")]
    WrongInput {
        step: StepId,
        kind: StepKind,
        input: &'static str,
    },
    #[error("Choice {value:?} is not offered by step {step}")]
    UnknownChoice { step: StepId, value: String },
    #[error("Typing completion for step {0} is stale")]
    StaleTyping(StepId),
    #[error("Unknown step: {0}")]
    UnknownStep(StepId),
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransitionError::UnknownStep(_) => ErrorKind::InvalidReference,
            TransitionError::InvalidAmount(_) => ErrorKind::Validation,
            _ => ErrorKind::InvalidState,
        }
    }
}

/// Pure transition function
pub fn transition(
    state: &FlowState,
    context: &FlowContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Disposal absorbs everything
        // ============================================================
        (FlowState::Disposed, _) => Err(TransitionError::Disposed),

        (_, Event::Dispose) => {
            Ok(TransitionResult::new(FlowState::Disposed).with_effect(Effect::CancelTyping))
        }

        // Restart discards the session wherever it is, pending typing included
        (_, Event::Restart) => {
            let entry = context.entry().clone();
            let (typing, schedule) = begin_typing(context, entry.clone(), entry)?;
            Ok(TransitionResult::new(typing)
                .with_effect(Effect::CancelTyping)
                .with_effect(Effect::ResetSession)
                .with_effect(schedule))
        }

        // ============================================================
        // Posting bot messages
        // ============================================================

        // Idle + Start -> Typing(entry)
        (FlowState::Idle, Event::Start) => {
            let entry = context.entry().clone();
            let (typing, schedule) = begin_typing(context, entry.clone(), entry)?;
            Ok(TransitionResult::new(typing).with_effect(schedule))
        }

        (_, Event::Start) => Err(TransitionError::AlreadyStarted),

        (FlowState::Idle, Event::PostBotMessage { step_id }) => {
            let active = context.entry().clone();
            let (typing, schedule) = begin_typing(context, step_id, active)?;
            Ok(TransitionResult::new(typing).with_effect(schedule))
        }

        (FlowState::AwaitingInput { step_id: active }, Event::PostBotMessage { step_id }) => {
            let (typing, schedule) = begin_typing(context, step_id, active.clone())?;
            Ok(TransitionResult::new(typing).with_effect(schedule))
        }

        // Typing + matching TypingElapsed -> AwaitingInput or Finished
        (FlowState::Typing { step_id: pending, .. }, Event::TypingElapsed { step_id, .. })
            if *pending == step_id =>
        {
            reveal_step(context, step_id)
        }

        (_, Event::TypingElapsed { step_id, .. }) => Err(TransitionError::StaleTyping(step_id)),

        // ============================================================
        // User input
        // ============================================================

        // At most one bot message in flight
        (FlowState::Typing { .. }, Event::PostBotMessage { .. })
        | (FlowState::Typing { .. }, Event::SelectChoice { .. })
        | (FlowState::Typing { .. }, Event::SubmitAmount { .. }) => Err(TransitionError::Busy),

        (FlowState::Idle, Event::SelectChoice { .. })
        | (FlowState::Idle, Event::SubmitAmount { .. }) => Err(TransitionError::NotStarted),

        (FlowState::Finished { .. }, Event::PostBotMessage { .. })
        | (FlowState::Finished { .. }, Event::SelectChoice { .. })
        | (FlowState::Finished { .. }, Event::SubmitAmount { .. }) => {
            Err(TransitionError::Finished)
        }

        (FlowState::AwaitingInput { step_id }, Event::SelectChoice { choice }) => {
            select_choice(context, step_id, choice)
        }

        (FlowState::AwaitingInput { step_id }, Event::SubmitAmount { raw }) => {
            submit_amount(context, step_id, &raw)
        }
    }
}

// Helper functions

/// Enter `Typing` for `step_id`, resolving it first
fn begin_typing(
    context: &FlowContext,
    step_id: StepId,
    active: StepId,
) -> Result<(FlowState, Effect), TransitionError> {
    context.step(&step_id)?;
    let schedule = Effect::schedule_typing(step_id.clone(), context.typing_delay);
    Ok((FlowState::Typing { step_id, active }, schedule))
}

fn reveal_step(context: &FlowContext, step_id: StepId) -> Result<TransitionResult, TransitionError> {
    let step = context.step(&step_id)?;
    let message = Effect::bot_message(step);

    if step.kind().is_terminal() {
        Ok(TransitionResult::new(FlowState::Finished { last_step: step_id })
            .with_effect(message)
            .with_effect(Effect::NotifyFinished))
    } else {
        Ok(TransitionResult::new(FlowState::AwaitingInput { step_id }).with_effect(message))
    }
}

fn select_choice(
    context: &FlowContext,
    active: &StepId,
    choice: Choice,
) -> Result<TransitionResult, TransitionError> {
    let step = context.step(active)?;

    if !step.kind().accepts_choice() {
        return Err(TransitionError::WrongInput {
            step: active.clone(),
            kind: step.kind(),
            input: "a choice",
        });
    }

    if !step.choices().contains(&choice) {
        return Err(TransitionError::UnknownChoice {
            step: active.clone(),
            value: choice.value,
        });
    }

    let answered = [
        Effect::user_message(choice.label.clone()),
        Effect::record_answer(Answer::choice(active.clone(), &choice)),
    ];

    match choice.next {
        Some(next) => {
            let (typing, schedule) = begin_typing(context, next, active.clone())?;
            Ok(TransitionResult::new(typing)
                .with_effects(answered)
                .with_effect(schedule))
        }
        // A choice without successor closes the conversation
        None => Ok(TransitionResult::new(FlowState::Finished {
            last_step: active.clone(),
        })
        .with_effects(answered)
        .with_effect(Effect::NotifyFinished)),
    }
}

fn submit_amount(
    context: &FlowContext,
    active: &StepId,
    raw: &str,
) -> Result<TransitionResult, TransitionError> {
    let step = context.step(active)?;

    let StepWidget::CurrencyInput { next } = &step.widget else {
        return Err(TransitionError::WrongInput {
            step: active.clone(),
            kind: step.kind(),
            input: "an amount",
        });
    };

    let amount = parse_amount(raw)?;
    let (typing, schedule) = begin_typing(context, next.clone(), active.clone())?;

    Ok(TransitionResult::new(typing)
        .with_effect(Effect::user_message(format_amount(
            &context.currency_symbol,
            amount,
        )))
        .with_effect(Effect::record_answer(Answer::amount(active.clone(), amount)))
        .with_effect(schedule))
}
