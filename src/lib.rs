//! Lead Concierge - scripted conversation engine for dealership lead capture
//!
//! A static step graph drives a bot/user transcript: the bot posts a prompt
//! after a short typing delay, the user answers through a choice or a
//! currency field, and the answer selects the next step.

// Library surface mirrors the binary; these pedantic lints only add noise here
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod console;
pub mod error;
pub mod flow;
pub mod runtime;
pub mod session;
pub mod state_machine;

pub use config::{ConciergeConfig, ConfigError};
pub use error::ErrorKind;
pub use flow::{Choice, Step, StepGraph, StepId, StepKind};
pub use runtime::{spawn_conversation, ConciergeHandle, EngineError, SessionEvent};
pub use session::{Answer, AnswerValue, Message, Sender, Session};
