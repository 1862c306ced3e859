//! Line-oriented terminal front end
//!
//! Renders transcript messages as plain text and turns typed replies into
//! engine calls. Glyphs are presentation only and never part of the flow.

use crate::flow::{Choice, StepKind};
use crate::runtime::{ConciergeHandle, EngineError, SessionEvent};
use crate::session::{AnswerValue, Message, MessageWidget, Sender, Session};
use thiserror::Error;

pub const BANNER: &str = "Tekion AI Concierge | Online, instantly replies";
pub const FOOTER: &str = "Powered by Tekion Intelligence AI";
pub const HELP: &str = "Reply with an option number or name. /restart starts over, /quit leaves.";

const GRID_COLUMNS: usize = 3;

/// A parsed line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Choose(Choice),
    Amount(String),
    Restart,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplyError {
    #[error("Type a reply, or /quit to leave")]
    Empty,
    #[error("Unknown command {0}")]
    UnknownCommand(String),
    #[error("The conversation has ended. Type /restart to begin again")]
    Finished,
    #[error("Nothing to answer yet")]
    NoQuestion,
    #[error("{0:?} is not one of the options")]
    NoMatch(String),
}

/// Decorative glyph for well-known choice values
pub fn glyph(value: &str) -> Option<&'static str> {
    match value {
        "sedan" => Some("🚗"),
        "suv" => Some("🛡"),
        "sports" => Some("⚡"),
        "ev" => Some("✨"),
        "used" => Some("👍"),
        "call" => Some("📞"),
        "text" => Some("💬"),
        "email" => Some("✉"),
        "whatsapp" => Some("🟢"),
        _ => None,
    }
}

fn option_label(number: usize, choice: &Choice) -> String {
    match glyph(&choice.value) {
        Some(glyph) => format!("[{number}] {glyph} {}", choice.label),
        None => format!("[{number}] {}", choice.label),
    }
}

fn render_widget(widget: &MessageWidget, currency_symbol: &str) -> Vec<String> {
    match widget.kind {
        StepKind::ChoiceList => widget
            .choices
            .iter()
            .enumerate()
            .map(|(i, c)| format!("    {}", option_label(i + 1, c)))
            .collect(),
        StepKind::ChoiceGrid => {
            let cells: Vec<String> = widget
                .choices
                .iter()
                .enumerate()
                .map(|(i, c)| option_label(i + 1, c))
                .collect();
            cells
                .chunks(GRID_COLUMNS)
                .map(|row| format!("    {}", row.join("   ")))
                .collect()
        }
        StepKind::CurrencyInput => vec![format!("    Enter amount ({currency_symbol})...")],
        StepKind::Terminal => Vec::new(),
    }
}

/// Text block for one transcript message
pub fn render_message(message: &Message, currency_symbol: &str) -> String {
    match message.sender {
        Sender::Bot => {
            let mut lines = vec![format!("concierge > {}", message.text)];
            if let Some(widget) = &message.widget {
                lines.extend(render_widget(widget, currency_symbol));
            }
            lines.join("\n")
        }
        Sender::User => format!("      you > {}", message.text),
    }
}

fn render_answer(value: &AnswerValue, currency_symbol: &str) -> String {
    match value {
        AnswerValue::Choice { label, .. } => label.clone(),
        AnswerValue::Amount { amount } => crate::flow::format_amount(currency_symbol, *amount),
    }
}

/// Text for a broadcast event, if it is shown at all
pub fn render_event(event: &SessionEvent, currency_symbol: &str) -> Option<String> {
    match event {
        SessionEvent::MessageAppended { message } => Some(render_message(message, currency_symbol)),
        SessionEvent::ThinkingChanged { is_thinking: true } => Some("concierge is typing...".to_string()),
        SessionEvent::ThinkingChanged { is_thinking: false } | SessionEvent::Disposed => None,
        SessionEvent::Finished { answers } => {
            let mut lines = vec!["-- lead captured --".to_string()];
            lines.extend(answers.iter().map(|a| {
                format!("    {}: {}", a.step_id, render_answer(&a.value, currency_symbol))
            }));
            lines.push(HELP.to_string());
            Some(lines.join("\n"))
        }
        SessionEvent::Restarted { .. } => Some("-- new conversation --".to_string()),
        SessionEvent::Error { message, .. } => Some(format!("  ! {message}")),
    }
}

/// Interpret a line of input against the session's active widget
pub fn parse_reply(input: &str, session: &Session) -> Result<Command, ReplyError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ReplyError::Empty);
    }

    if let Some(command) = input.strip_prefix('/') {
        return match command.to_ascii_lowercase().as_str() {
            "restart" => Ok(Command::Restart),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(ReplyError::UnknownCommand(input.to_string())),
        };
    }

    if session.is_finished {
        return Err(ReplyError::Finished);
    }
    let widget = session.active_widget().ok_or(ReplyError::NoQuestion)?;

    match widget.kind {
        StepKind::CurrencyInput => Ok(Command::Amount(input.to_string())),
        StepKind::ChoiceList | StepKind::ChoiceGrid => find_choice(input, &widget.choices)
            .cloned()
            .map(Command::Choose)
            .ok_or_else(|| ReplyError::NoMatch(input.to_string())),
        StepKind::Terminal => Err(ReplyError::Finished),
    }
}

/// Match by option number, then label, then value
fn find_choice<'a>(input: &str, choices: &'a [Choice]) -> Option<&'a Choice> {
    if let Ok(number) = input.parse::<usize>() {
        return number.checked_sub(1).and_then(|i| choices.get(i));
    }
    choices
        .iter()
        .find(|c| c.label.eq_ignore_ascii_case(input))
        .or_else(|| choices.iter().find(|c| c.value.eq_ignore_ascii_case(input)))
}

/// Forward a parsed command to the engine
pub async fn dispatch(handle: &ConciergeHandle, command: Command) -> Result<(), EngineError> {
    match command {
        Command::Choose(choice) => handle.select_choice(choice).await,
        Command::Amount(raw) => handle.submit_currency_amount(raw).await,
        Command::Restart => handle.restart().await,
        Command::Quit => handle.dispose().await,
    }
}
