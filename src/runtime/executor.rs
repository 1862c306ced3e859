//! Conversation runtime executor

use super::{Envelope, SessionEvent};

use crate::session::Session;
use crate::state_machine::{transition, Effect, Event, FlowContext, FlowState, TransitionError};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns one conversation and executes the effects of its transitions
pub(crate) struct ConversationRuntime {
    context: FlowContext,
    state: FlowState,
    session: Session,
    event_rx: mpsc::Receiver<Envelope>,
    /// Weak so a pending timer never keeps the conversation alive
    event_tx: mpsc::WeakSender<Envelope>,
    session_tx: watch::Sender<Session>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    /// Token to cancel the pending typing delay
    typing_cancel_token: Option<CancellationToken>,
    /// Stamped on every scheduled completion; anything older is dropped
    typing_generation: u64,
}

impl ConversationRuntime {
    pub fn new(
        context: FlowContext,
        session: Session,
        event_rx: mpsc::Receiver<Envelope>,
        event_tx: mpsc::WeakSender<Envelope>,
        session_tx: watch::Sender<Session>,
        broadcast_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        Self {
            context,
            state: FlowState::Idle,
            session,
            event_rx,
            event_tx,
            session_tx,
            broadcast_tx,
            typing_cancel_token: None,
            typing_generation: 0,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session.id, "Starting conversation runtime");

        // Process events in a loop - no recursion
        while let Some(Envelope { event, reply }) = self.event_rx.recv().await {
            let outcome = self.process_event(event);
            if let Some(reply) = reply {
                let _ = reply.send(outcome);
            }
            if self.state.is_disposed() {
                break;
            }
        }

        // Every handle dropped without an explicit dispose
        if !self.state.is_disposed() {
            tracing::debug!(session_id = %self.session.id, "All handles dropped");
            let _ = self.process_event(Event::Dispose);
        }
        let _ = self.broadcast_tx.send(SessionEvent::Disposed);

        tracing::info!(session_id = %self.session.id, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        if let Event::TypingElapsed {
            step_id,
            generation,
        } = &event
        {
            if *generation != self.typing_generation {
                tracing::debug!(
                    step = %step_id,
                    generation,
                    current = self.typing_generation,
                    "Dropping stale typing completion"
                );
                return Ok(());
            }
        }

        let event_name = event.name();
        let user_input = event.is_user_input();
        let from_timer = matches!(event, Event::TypingElapsed { .. });

        // Pure state transition
        let result = match transition(&self.state, &self.context, event) {
            Ok(r) => r,
            Err(e) if from_timer => {
                tracing::debug!(error = %e, state = self.state.name(), "Ignoring typing completion");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session.id,
                    event = event_name,
                    user_input,
                    state = self.state.name(),
                    kind = %e.kind(),
                    error = %e,
                    "Event rejected"
                );
                let _ = self.broadcast_tx.send(SessionEvent::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        tracing::debug!(
            event = event_name,
            from = self.state.name(),
            to = result.new_state.name(),
            "Transition"
        );
        self.state = result.new_state;

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.sync_session();
        self.session_tx.send_replace(self.session.clone());
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendMessage {
                sender,
                text,
                widget,
            } => {
                let message = self.session.push_message(sender, text, widget).clone();
                tracing::debug!(
                    session_id = %self.session.id,
                    message_id = message.id,
                    sender = %message.sender,
                    "Message appended"
                );
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::MessageAppended { message });
            }

            Effect::RecordAnswer { answer } => {
                tracing::info!(
                    session_id = %self.session.id,
                    step = %answer.step_id,
                    "Answer recorded"
                );
                self.session.answers.push(answer);
            }

            Effect::ScheduleTyping { step_id, delay } => {
                self.cancel_typing();
                self.typing_generation += 1;
                let generation = self.typing_generation;

                let cancel_token = CancellationToken::new();
                self.typing_cancel_token = Some(cancel_token.clone());
                let event_tx = self.event_tx.clone();

                tokio::spawn(async move {
                    tokio::select! {
                        () = cancel_token.cancelled() => {
                            tracing::debug!(step = %step_id, "Typing delay cancelled");
                        }
                        () = tokio::time::sleep(delay) => {
                            let Some(event_tx) = event_tx.upgrade() else {
                                return;
                            };
                            let _ = event_tx
                                .send(Envelope::timer(Event::TypingElapsed { step_id, generation }))
                                .await;
                        }
                    }
                });
            }

            Effect::CancelTyping => {
                self.cancel_typing();
            }

            Effect::ResetSession => {
                // Close out the old session's indicator before it is replaced
                if self.session.is_thinking {
                    let _ = self
                        .broadcast_tx
                        .send(SessionEvent::ThinkingChanged { is_thinking: false });
                }
                let fresh = Session::new(self.context.entry().clone());
                tracing::info!(
                    old_session_id = %self.session.id,
                    session_id = %fresh.id,
                    "Session restarted"
                );
                let _ = self
                    .broadcast_tx
                    .send(SessionEvent::Restarted { session_id: fresh.id });
                self.session = fresh;
            }

            Effect::NotifyFinished => {
                tracing::info!(
                    session_id = %self.session.id,
                    answers = self.session.answers.len(),
                    "Conversation finished"
                );
                let _ = self.broadcast_tx.send(SessionEvent::Finished {
                    answers: self.session.answers.clone(),
                });
            }
        }
    }

    fn cancel_typing(&mut self) {
        if let Some(token) = self.typing_cancel_token.take() {
            token.cancel();
        }
        // Invalidate a completion that already fired and is queued
        self.typing_generation += 1;
    }

    /// Mirror the state onto the observable session
    fn sync_session(&mut self) {
        let is_thinking = self.state.is_thinking();
        if self.session.is_thinking != is_thinking {
            self.session.is_thinking = is_thinking;
            let _ = self
                .broadcast_tx
                .send(SessionEvent::ThinkingChanged { is_thinking });
        }

        // A disposed session keeps its last observable position
        if self.state.is_disposed() {
            return;
        }
        self.session.active_step_id = self.state.active_step(self.context.entry()).cloned();
        self.session.is_finished = self.state.is_finished();
    }
}
