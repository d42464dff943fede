//! # chatter-client
//!
//! Headless terminal client for the Chatter message service.
//!
//! The sync engine does the real work; this binary wires the HTTP channel,
//! health probe and SQLite cache into it, prints the message list whenever it
//! changes and reads the composer from stdin. Sending is refused while the
//! engine reports offline.

mod config;
mod input;
mod render;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use chatter_net::{HttpChannel, HttpChannelConfig, ProbeConfig, ProbeMonitor};
use chatter_shared::constants::APP_NAME;
use chatter_shared::{ConnectivityState, OutgoingMessage, Sender};
use chatter_store::Database;
use chatter_sync::{MessageSender, SqliteCache, SyncEngine};

use crate::config::ClientConfig;
use crate::input::{Input, HELP};

/// How many messages are printed on each refresh.
const VISIBLE_MESSAGES: usize = 20;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("chatter_client=info,chatter_sync=info,chatter_net=info,chatter_store=info,warn")
    });

    // Logs go to stderr so they never interleave with the rendered list.
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    info!("Starting {} terminal client v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let db = match &config.db_path {
        Some(path) => Database::open_at(path),
        None => Database::new(),
    }
    .context("Failed to open the message cache")?;

    let channel = HttpChannel::new(HttpChannelConfig::with_base_url(&config.server_url))
        .context("Failed to build the HTTP client")?;

    let probe = ProbeMonitor::new(ProbeConfig {
        interval: config.probe_interval,
        ..ProbeConfig::for_base_url(&config.server_url)
    })
    .context("Failed to build the health probe")?;

    let mut engine = SyncEngine::spawn(channel, SqliteCache::new(db), probe);
    let sender = Sender::new(config.user_id.clone(), config.display_name.as_deref());

    println!("{APP_NAME}: signed in as {} ({})", sender.display_name, sender.id);
    println!("Type a message and press Enter. /help for commands.");

    let result = run(&engine, &sender).await;
    engine.teardown().await;
    result
}

async fn run(engine: &SyncEngine, sender: &Sender) -> anyhow::Result<()> {
    let mut messages = engine.watch_messages();
    let mut state = engine.watch_state();
    let mut last_state = *state.borrow_and_update();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let list = messages.borrow_and_update().clone();
                println!("----");
                for line in render::render_list(&list, &sender.id, VISIBLE_MESSAGES) {
                    println!("{line}");
                }
            }

            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let next = *state.borrow_and_update();
                if let Some(notice) = render::state_notice(last_state, next) {
                    println!("!! {notice}");
                }
                last_state = next;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("stdin closed");
                    break;
                };
                match input::parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Input::Quit)) => break,
                    Ok(Some(Input::Help)) => println!("{HELP}"),
                    Ok(Some(input)) => compose(engine, sender, input),
                    Err(e) => println!("!! {e}"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Check the composer and hand the message to a send task, so the loop keeps
/// rendering while the write is in flight.
fn compose(engine: &SyncEngine, sender: &Sender, input: Input) {
    if !engine.composer_enabled() {
        let state = engine.state();
        let reason = if state == ConnectivityState::Offline {
            "offline"
        } else {
            "still connecting"
        };
        println!("!! Not sent: {reason}.");
        return;
    }

    let Some(message) = input.into_outgoing(sender.clone()) else {
        return;
    };
    tokio::spawn(deliver(engine.sender(), message));
}

async fn deliver(handle: MessageSender, message: OutgoingMessage) {
    if let Err(e) = handle.send(message).await {
        println!("!! Not sent: {e}");
    }
}
