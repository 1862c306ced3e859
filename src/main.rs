//! Lead Concierge - terminal front end
//!
//! Runs the dealership questionnaire on stdin/stdout. Logs go to stderr.

use lead_concierge::console::{self, Command};
use lead_concierge::{spawn_conversation, ConciergeConfig, SessionEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_concierge=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Configuration
    let config = ConciergeConfig::from_env()?;
    let context = config.flow_context()?;
    tracing::info!(
        steps = context.graph.len(),
        entry = %context.entry(),
        typing_delay_ms = u64::try_from(config.typing_delay.as_millis()).unwrap_or(u64::MAX),
        "Flow loaded"
    );

    let handle = spawn_conversation(context);
    let printer = tokio::spawn(print_events(
        handle.subscribe(),
        config.currency_symbol.clone(),
    ));

    println!("{}", console::BANNER);
    println!("{}", console::HELP);
    handle.start().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match console::parse_reply(&line, &handle.session()) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(e) => {
                println!("  ! {e}");
                continue;
            }
        };
        // Rejections are echoed by the printer through SessionEvent::Error
        if let Err(e) = console::dispatch(&handle, command).await {
            tracing::debug!(error = %e, kind = %e.kind(), "Reply rejected");
        }
    }

    handle.dispose().await?;
    printer.await?;
    println!("{}", console::FOOTER);

    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SessionEvent>, currency_symbol: String) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Disposed) | Err(broadcast::error::RecvError::Closed) => break,
            Ok(event) => {
                if let Some(text) = console::render_event(&event, &currency_symbol) {
                    println!("{text}");
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Console fell behind the conversation");
            }
        }
    }
}
