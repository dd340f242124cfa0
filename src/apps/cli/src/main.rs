//! Aura CLI - line-based chat surface for the onboarding assistant
//!
//! Submits user text to the agent gateway and renders the answer token by
//! token as it streams in.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::broadcast::error::RecvError;

use aura_chat_client::types::TurnRole;
use aura_chat_client::{
    ChatSession, ChatStreamClient, StreamConfig, TranscriptEvent, TranscriptStore,
};

#[derive(Parser, Debug)]
#[command(name = "aura-cli", version, about = "Chat with the Aura onboarding assistant")]
struct Args {
    /// Agent gateway base URL
    #[arg(long, default_value = "http://localhost:8080/api/ai")]
    base_url: String,

    /// Seconds without a stream event before the turn is failed
    #[arg(long, default_value_t = 120)]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut config = StreamConfig::new(args.base_url);
    config.idle_timeout = Duration::from_secs(args.idle_timeout);
    let client = ChatStreamClient::new(config);

    match client.health().await {
        Ok(health) => println!(
            "connected: {} ({}, {} mode)",
            health.status, health.llm_provider, health.llm_mode
        ),
        Err(err) => eprintln!("gateway health check failed: {err}"),
    }

    let transcript = Arc::new(TranscriptStore::new());
    let mut session = ChatSession::new(client, transcript.clone());

    spawn_renderer(&transcript);

    println!("Type a message and press enter. Commands: /stop, /reset, /quit");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "/quit" => break,
            "/stop" => session.stop(),
            "/reset" => {
                session.reset();
                println!("transcript cleared");
            }
            message => {
                if let Err(err) = session.send(message) {
                    eprintln!("cannot send: {err}");
                }
            }
        }
    }

    session.stop();
    Ok(())
}

/// Print agent fragments as they stream in; user turns echo from the prompt.
fn spawn_renderer(transcript: &Arc<TranscriptStore>) {
    let mut events = transcript.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(TranscriptEvent::TurnStarted {
                    role: TurnRole::Agent,
                    ..
                }) => {
                    print!("agent> ");
                    let _ = std::io::stdout().flush();
                }
                Ok(TranscriptEvent::Appended { fragment, .. }) => {
                    print!("{fragment}");
                    let _ = std::io::stdout().flush();
                }
                Ok(TranscriptEvent::Finalized { .. }) => println!(),
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });
}
