//! Runtime for executing conversations
//!
//! Each conversation runs on its own task that owns the `Session` and applies
//! events one at a time. Collaborators talk to it through a `ConciergeHandle`.

mod executor;

#[cfg(test)]
pub mod testing;

pub(crate) use executor::ConversationRuntime;

use crate::error::ErrorKind;
use crate::flow::{Choice, StepId};
use crate::session::{Answer, Message, Session};
use crate::state_machine::{Event, FlowContext, TransitionError};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use uuid::Uuid;

/// Events sent to subscribed collaborators
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageAppended {
        message: Message,
    },
    ThinkingChanged {
        is_thinking: bool,
    },
    /// Conversation reached its end; carries the collected lead
    Finished {
        answers: Vec<Answer>,
    },
    /// Transcript discarded; `session_id` identifies the replacement
    Restarted {
        session_id: Uuid,
    },
    Disposed,
    Error {
        kind: ErrorKind,
        message: String,
    },
}

/// Errors returned to collaborators
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Conversation engine has shut down")]
    Disposed,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Transition(e) => e.kind(),
            EngineError::Disposed => ErrorKind::InvalidState,
        }
    }
}

/// An event plus the channel its outcome is reported on
///
/// Timer completions carry no reply channel.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub event: Event,
    pub reply: Option<oneshot::Sender<Result<(), TransitionError>>>,
}

impl Envelope {
    pub fn timer(event: Event) -> Self {
        Self { event, reply: None }
    }
}

/// Handle to interact with a running conversation
///
/// Cheap to clone. The conversation is disposed when `dispose` is called or
/// when the last handle is dropped.
#[derive(Debug, Clone)]
pub struct ConciergeHandle {
    event_tx: mpsc::Sender<Envelope>,
    session_rx: watch::Receiver<Session>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

/// Spawn a conversation runtime on the current tokio runtime
pub fn spawn_conversation(context: FlowContext) -> ConciergeHandle {
    let (event_tx, event_rx) = mpsc::channel(32);
    let (broadcast_tx, _) = broadcast::channel(128);
    let session = Session::new(context.entry().clone());
    let (session_tx, session_rx) = watch::channel(session.clone());

    let runtime = ConversationRuntime::new(
        context,
        session,
        event_rx,
        event_tx.downgrade(),
        session_tx,
        broadcast_tx.clone(),
    );
    tokio::spawn(runtime.run());

    ConciergeHandle {
        event_tx,
        session_rx,
        broadcast_tx,
    }
}

impl ConciergeHandle {
    /// Post the entry step
    pub async fn start(&self) -> Result<(), EngineError> {
        self.send(Event::Start).await
    }

    /// Show the bot message for `step_id` after the typing delay
    pub async fn post_bot_message(&self, step_id: impl Into<StepId>) -> Result<(), EngineError> {
        self.send(Event::PostBotMessage {
            step_id: step_id.into(),
        })
        .await
    }

    /// Answer the active choice step
    pub async fn select_choice(&self, choice: Choice) -> Result<(), EngineError> {
        self.send(Event::SelectChoice { choice }).await
    }

    /// Answer the active currency step with raw user text
    pub async fn submit_currency_amount(&self, raw: impl Into<String>) -> Result<(), EngineError> {
        self.send(Event::SubmitAmount { raw: raw.into() }).await
    }

    /// Discard the session and start over at the entry step
    pub async fn restart(&self) -> Result<(), EngineError> {
        self.send(Event::Restart).await
    }

    /// Tear the conversation down, cancelling any pending typing delay
    pub async fn dispose(&self) -> Result<(), EngineError> {
        self.send(Event::Dispose).await
    }

    /// Latest published session snapshot
    pub fn session(&self) -> Session {
        self.session_rx.borrow().clone()
    }

    /// Wait until no bot message is in flight and return that snapshot
    pub async fn settled(&self) -> Result<Session, EngineError> {
        let mut rx = self.session_rx.clone();
        let session = rx
            .wait_for(|s| !s.is_thinking)
            .await
            .map_err(|_| EngineError::Disposed)?;
        Ok(session.clone())
    }

    /// Receiver of every published snapshot
    pub fn watch(&self) -> watch::Receiver<Session> {
        self.session_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    async fn send(&self, event: Event) -> Result<(), EngineError> {
        let (reply, outcome) = oneshot::channel();
        self.event_tx
            .send(Envelope {
                event,
                reply: Some(reply),
            })
            .await
            .map_err(|_| EngineError::Disposed)?;

        outcome
            .await
            .map_err(|_| EngineError::Disposed)?
            .map_err(EngineError::from)
    }
}
