//! Test harness for conversation runtimes
//!
//! Tests run on a paused tokio clock so typing delays elapse instantly.

use super::{spawn_conversation, ConciergeHandle, SessionEvent};
use crate::flow::{lead_questionnaire, Choice, StepGraph};
use crate::session::Session;
use crate::state_machine::FlowContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Test Runtime Builder
// ============================================================================

/// Helper for building test runtimes with minimal boilerplate
pub struct TestRuntime {
    pub handle: ConciergeHandle,
    pub events: broadcast::Receiver<SessionEvent>,
    graph: Arc<StepGraph>,
}

impl TestRuntime {
    /// Builder defaulting to the built-in questionnaire
    pub fn new() -> TestRuntimeBuilder {
        TestRuntimeBuilder::new()
    }
}

pub struct TestRuntimeBuilder {
    graph: Option<StepGraph>,
    typing_delay: Duration,
    currency_symbol: String,
}

impl TestRuntimeBuilder {
    pub fn new() -> Self {
        Self {
            graph: None,
            typing_delay: Duration::from_millis(800),
            currency_symbol: "$".to_string(),
        }
    }

    pub fn graph(mut self, graph: StepGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn typing_delay(mut self, delay: Duration) -> Self {
        self.typing_delay = delay;
        self
    }

    pub fn currency_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.currency_symbol = symbol.into();
        self
    }

    pub fn build(self) -> TestRuntime {
        let graph = Arc::new(
            self.graph
                .unwrap_or_else(|| lead_questionnaire().expect("built-in flow is valid")),
        );
        let context = FlowContext::new(graph.clone())
            .with_typing_delay(self.typing_delay)
            .with_currency_symbol(self.currency_symbol);

        let handle = spawn_conversation(context);
        let events = handle.subscribe();

        TestRuntime {
            handle,
            events,
            graph,
        }
    }
}

impl Default for TestRuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRuntime {
    /// Declared choice of `step` with `value`
    pub fn choice(&self, step: &str, value: &str) -> Choice {
        self.graph
            .get(step)
            .and_then(|s| s.choices().iter().find(|c| c.value == value))
            .cloned()
            .unwrap_or_else(|| panic!("no choice {value} on step {step}"))
    }

    /// Start and wait for the greeting
    pub async fn start(&self) -> Session {
        self.handle.start().await.expect("start accepted");
        self.settle().await
    }

    /// Pick a declared choice and wait for the reply
    pub async fn answer(&self, step: &str, value: &str) -> Session {
        self.handle
            .select_choice(self.choice(step, value))
            .await
            .expect("choice accepted");
        self.settle().await
    }

    /// Submit a budget and wait for the reply
    pub async fn budget(&self, raw: &str) -> Session {
        self.handle
            .submit_currency_amount(raw)
            .await
            .expect("amount accepted");
        self.settle().await
    }

    pub async fn settle(&self) -> Session {
        self.handle.settled().await.expect("runtime alive")
    }

    /// Everything broadcast so far
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::flow::{AmountError, Step, StepKind};
    use crate::runtime::EngineError;
    use crate::session::{AnswerValue, Sender};
    use crate::state_machine::TransitionError;

    fn bot_texts(session: &Session) -> Vec<&str> {
        session
            .transcript
            .iter()
            .filter(|m| m.sender == Sender::Bot)
            .map(|m| m.text.as_str())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lead_scenario() {
        let rt = TestRuntime::new().build();

        let session = rt.start().await;
        assert_eq!(session.transcript.len(), 1);
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "intro");
        assert_eq!(session.active_widget().unwrap().kind, StepKind::ChoiceList);

        let session = rt.answer("intro", "start").await;
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "vehicle_class");

        let session = rt.answer("vehicle_class", "suv").await;
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "budget");

        let session = rt.budget("45000").await;
        let user_reply = &session.transcript[session.transcript.len() - 2];
        assert_eq!(user_reply.sender, Sender::User);
        assert_eq!(user_reply.text, "$45,000");
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "timeframe");

        rt.answer("timeframe", "immediate").await;
        let session = rt.answer("communication", "call").await;

        assert!(session.is_finished);
        assert!(!session.is_thinking);
        assert_eq!(session.active_step_id, None);
        // Five bot/user exchanges plus the closing message
        assert_eq!(session.transcript.len(), 11);
        assert_eq!(session.count_from(Sender::User), 5);
        assert!(bot_texts(&session)[5].starts_with("Perfect!"));
        assert_eq!(session.last_message().unwrap().widget, None);

        assert_eq!(session.answers.len(), 5);
        assert_eq!(
            session.answer_for("budget"),
            Some(&AnswerValue::Amount { amount: 45_000 })
        );
        assert_eq!(
            session.answer_for("communication"),
            Some(&AnswerValue::Choice {
                value: "call".to_string(),
                label: "Call".to_string(),
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_browsing_branch_ends_early() {
        let rt = TestRuntime::new().build();
        rt.start().await;

        let session = rt.answer("intro", "browsing").await;
        assert!(session.is_finished);
        assert_eq!(session.transcript.len(), 3);
        assert_eq!(session.transcript[1].text, "Just browsing");
        assert!(bot_texts(&session)[1].starts_with("No problem!"));

        // Terminal step is immutable
        let err = rt
            .handle
            .select_choice(rt.choice("intro", "start"))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Transition(TransitionError::Finished));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(rt.handle.session().transcript.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_rejected_while_thinking() {
        let rt = TestRuntime::new().build();
        rt.handle.start().await.unwrap();
        assert!(rt.handle.session().is_thinking);

        let err = rt
            .handle
            .select_choice(rt.choice("intro", "start"))
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::Transition(TransitionError::Busy));

        let err = rt.handle.post_bot_message("budget").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let session = rt.settle().await;
        assert_eq!(session.transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_typing_delay_is_honored() {
        let rt = TestRuntime::new()
            .typing_delay(Duration::from_millis(800))
            .build();
        rt.handle.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(799)).await;
        let session = rt.handle.session();
        assert!(session.is_thinking);
        assert!(session.transcript.is_empty());
        // Active step stays put until the message lands
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "intro");

        tokio::time::sleep(Duration::from_millis(2)).await;
        let session = rt.settle().await;
        assert_eq!(session.transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_budget_leaves_transcript() {
        let rt = TestRuntime::new().build();
        rt.start().await;
        rt.answer("intro", "start").await;
        let before = rt.answer("vehicle_class", "ev").await;

        let err = rt.handle.submit_currency_amount("abc").await.unwrap_err();
        assert_eq!(
            err,
            EngineError::Transition(TransitionError::InvalidAmount(AmountError::NoDigits))
        );
        assert_eq!(err.kind(), ErrorKind::Validation);

        let after = rt.handle.session();
        assert_eq!(after.transcript, before.transcript);
        assert!(!after.is_thinking);
        assert_eq!(after.active_step_id.as_ref().unwrap().as_str(), "budget");
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_on_choice_step_is_invalid_state() {
        let rt = TestRuntime::new().build();
        rt.start().await;

        let err = rt.handle.submit_currency_amount("500").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test(start_paused = true)]
    async fn test_currency_symbol_is_configurable() {
        let rt = TestRuntime::new().currency_symbol("€").build();
        rt.start().await;
        rt.answer("intro", "start").await;
        rt.answer("vehicle_class", "sedan").await;

        let session = rt.budget("€45,500.99").await;
        assert_eq!(session.transcript[session.transcript.len() - 2].text, "€45,500");
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_rejected() {
        let rt = TestRuntime::new().build();
        rt.start().await;

        let err = rt.handle.start().await.unwrap_err();
        assert_eq!(err, EngineError::Transition(TransitionError::AlreadyStarted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_unknown_step_is_invalid_reference() {
        let mut rt = TestRuntime::new().build();

        let err = rt.handle.post_bot_message("trade_in").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidReference);
        assert!(rt.drain_events().iter().any(|e| matches!(
            e,
            SessionEvent::Error {
                kind: ErrorKind::InvalidReference,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_bot_message_jumps_to_step() {
        let rt = TestRuntime::new().build();

        rt.handle.post_bot_message("budget").await.unwrap();
        let session = rt.settle().await;
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "budget");
        assert_eq!(
            session.active_widget().unwrap().kind,
            StepKind::CurrencyInput
        );

        let session = rt.budget("30000").await;
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "timeframe");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_cancels_pending_typing() {
        let mut rt = TestRuntime::new().build();
        rt.handle.start().await.unwrap();
        rt.handle.dispose().await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;

        let session = rt.handle.session();
        assert!(session.transcript.is_empty());
        assert!(!session.is_thinking);

        let events = rt.drain_events();
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::MessageAppended { .. })));
        assert!(matches!(events.last(), Some(SessionEvent::Disposed)));

        assert_eq!(rt.handle.start().await.unwrap_err(), EngineError::Disposed);
        assert_eq!(rt.handle.dispose().await.unwrap_err(), EngineError::Disposed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_disposes() {
        let rt = TestRuntime::new().build();
        let TestRuntime {
            handle, mut events, ..
        } = rt;
        handle.start().await.unwrap();
        drop(handle);

        loop {
            match events.recv().await {
                Ok(SessionEvent::Disposed) => break,
                Ok(SessionEvent::MessageAppended { .. }) => panic!("message after drop"),
                Ok(_) => continue,
                Err(e) => panic!("runtime closed without disposing: {e}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_session() {
        let rt = TestRuntime::new().build();
        let first = rt.start().await;
        rt.answer("intro", "start").await;
        rt.answer("vehicle_class", "sports").await;

        rt.handle.restart().await.unwrap();
        let during = rt.handle.session();
        assert_ne!(during.id, first.id);
        assert!(during.transcript.is_empty());
        assert!(during.is_thinking);

        let session = rt.settle().await;
        assert_eq!(session.transcript.len(), 1);
        assert!(session.answers.is_empty());
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "intro");
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_while_typing_drops_stale_message() {
        let rt = TestRuntime::new().build();
        rt.start().await;
        rt.handle
            .select_choice(rt.choice("intro", "start"))
            .await
            .unwrap();
        rt.handle.restart().await.unwrap();

        let session = rt.settle().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        let later = rt.handle.session();

        assert_eq!(session, later);
        assert_eq!(bot_texts(&later).len(), 1);
        assert!(bot_texts(&later)[0].starts_with("Welcome"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_finish() {
        let rt = TestRuntime::new().build();
        rt.start().await;
        rt.answer("intro", "browsing").await;

        rt.handle.restart().await.unwrap();
        let session = rt.settle().await;
        assert!(!session.is_finished);
        let session = rt.answer("intro", "start").await;
        assert_eq!(session.active_step_id.as_ref().unwrap().as_str(), "vehicle_class");
    }

    fn summarize(events: &[SessionEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| match e {
                SessionEvent::MessageAppended { message } => {
                    format!("{}#{}", message.sender, message.id)
                }
                SessionEvent::ThinkingChanged { is_thinking } => format!("thinking={is_thinking}"),
                SessionEvent::Restarted { .. } => "restarted".to_string(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_order() {
        let mut rt = TestRuntime::new().build();
        rt.start().await;
        rt.answer("intro", "start").await;

        assert_eq!(
            summarize(&rt.drain_events()),
            vec![
                "thinking=true",
                "bot#1",
                "thinking=false",
                "user#2",
                "thinking=true",
                "bot#3",
                "thinking=false",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_event_order() {
        let mut rt = TestRuntime::new().build();
        rt.start().await;
        rt.handle
            .select_choice(rt.choice("intro", "start"))
            .await
            .unwrap();
        rt.drain_events();

        // Restart lands while the previous reply is still typing
        rt.handle.restart().await.unwrap();
        let session = rt.settle().await;
        let events = rt.drain_events();

        assert_eq!(
            summarize(&events),
            vec![
                "thinking=false",
                "restarted",
                "thinking=true",
                "bot#1",
                "thinking=false",
            ]
        );
        let restarted_id = events.iter().find_map(|e| match e {
            SessionEvent::Restarted { session_id } => Some(*session_id),
            _ => None,
        });
        assert_eq!(restarted_id, Some(session.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_from_settled_session_event_order() {
        let mut rt = TestRuntime::new().build();
        rt.start().await;
        rt.answer("intro", "browsing").await;
        rt.drain_events();

        rt.handle.restart().await.unwrap();
        rt.settle().await;

        assert_eq!(
            summarize(&rt.drain_events()),
            vec!["restarted", "thinking=true", "bot#1", "thinking=false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_event_carries_answers() {
        let mut rt = TestRuntime::new().build();
        rt.start().await;
        rt.answer("intro", "browsing").await;

        let answers = rt
            .drain_events()
            .into_iter()
            .find_map(|e| match e {
                SessionEvent::Finished { answers } => Some(answers),
                _ => None,
            })
            .expect("finished event");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].step_id.as_str(), "intro");
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_choice_ends_without_bot_reply() {
        let graph = StepGraph::new(
            "ask",
            vec![Step::choice_list(
                "ask",
                "Want a brochure?",
                vec![Choice::closing("No thanks", "no")],
            )],
        )
        .unwrap();
        let rt = TestRuntime::new().graph(graph).build();
        rt.start().await;

        let session = rt.answer("ask", "no").await;
        assert!(session.is_finished);
        assert_eq!(session.active_step_id, None);
        assert_eq!(session.transcript.len(), 2);
        assert_eq!(session.last_message().unwrap().sender, Sender::User);
    }
}
