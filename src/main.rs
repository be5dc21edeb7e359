//! Terminal front-end for the conversational client.
//!
//! ```text
//! fixit-client [config.toml]
//! ```
//!
//! Each stdin line is submitted as a message; `/clear` empties the
//! transcript and `/quit` exits. Replies are printed as they stream in.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};

use fixit_client::adapters::{HttpAssistantClient, HttpAssistantConfig};
use fixit_client::application::{ChatSession, ConversationEvent, SubmitError};
use fixit_client::config::AppConfig;
use fixit_client::domain::conversation::Role;
use fixit_client::telemetry;

mod exit_codes {
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_CONFIG: u8 = 2;
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(exit_codes::INVALID_CONFIG);
        }
    };

    if let Err(e) = telemetry::init_tracing(&config.logging) {
        eprintln!("warning: logging disabled: {}", e);
    }

    let client = match HttpAssistantClient::new(HttpAssistantConfig::from(&config.assistant)) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Failed to build assistant client");
            return ExitCode::from(exit_codes::GENERAL_ERROR);
        }
    };

    let session = Arc::new(ChatSession::new(Arc::new(client), &config.session));
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        user = session.user_id().map(|id| id.as_str()).unwrap_or("-"),
        "fixit-client ready"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let renderer = tokio::spawn(render(session.events(), shutdown_rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };

        match line.trim() {
            "/quit" => break,
            "/clear" => {
                session.clear();
                println!("(transcript cleared)");
            }
            _ => {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    match session.submit(line).await {
                        Ok(_) | Err(SubmitError::Validation(_)) => {}
                        Err(SubmitError::ReplyInFlight) => {
                            eprintln!("(a reply is still streaming; wait for it or /clear)");
                        }
                    }
                });
            }
        }
    }

    session.store().cancel_in_flight();
    let _ = shutdown_tx.send(true);
    let _ = renderer.await;

    ExitCode::SUCCESS
}

/// Prints assistant text as it streams, one delta at a time.
async fn render(
    mut events: broadcast::Receiver<ConversationEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut shown = String::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            event = events.recv() => match event {
                Ok(event) => print_event(event, &mut shown),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The next amend carries the full text, so nothing is lost.
                    tracing::debug!(skipped, "Renderer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

fn print_event(event: ConversationEvent, shown: &mut String) {
    let mut out = std::io::stdout().lock();

    let _ = match event {
        ConversationEvent::MessageAppended { message } if message.role() == Role::Assistant => {
            shown.clear();
            shown.push_str(message.content());
            write!(
                out,
                "[{}] assistant> {}",
                message.created_at().clock_label(),
                message.content()
            )
        }
        ConversationEvent::MessageAppended { .. } => Ok(()),
        ConversationEvent::MessageAmended { content, .. } => {
            let written = match content.strip_prefix(shown.as_str()) {
                Some(delta) => write!(out, "{}", delta),
                None => write!(out, "\nassistant> {}", content),
            };
            *shown = content;
            written
        }
        ConversationEvent::StreamingChanged { is_streaming: false } => writeln!(out),
        ConversationEvent::StreamingChanged { .. } => Ok(()),
        ConversationEvent::Cleared => {
            shown.clear();
            writeln!(out)
        }
    };
    let _ = out.flush();
}
