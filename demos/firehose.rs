//! Streams a STREST resource and prints every frame.
//!
//! Demonstrates:
//! - Building a client with keepalive and a ping probe
//! - Waiting for the connection through `on_open`
//! - Reading a transaction as a `Stream`
//!
//! Usage:
//!   cargo run --example firehose -- ws://localhost:8000/strest /firehose
//!   cargo run --example firehose -- ws://localhost:8000/strest /firehose --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::StreamExt;
use strest_client::{RequestOptions, Result, StrestClient};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://localhost:8000/strest";
const DEFAULT_URI: &str = "/firehose";

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    init_logging(args.iter().any(|a| a == "--debug"));

    let mut positional = args.iter().filter(|a| !a.starts_with("--"));
    let url = positional.next().map_or(DEFAULT_URL, String::as_str);
    let uri = positional.next().map_or(DEFAULT_URI, String::as_str);

    if let Err(e) = run(url, uri).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(url: &str, uri: &str) -> Result<()> {
    println!("=== STREST firehose: {url}{uri} ===\n");

    let (opened_tx, mut opened_rx) = mpsc::unbounded_channel();
    let client = StrestClient::builder()
        .url(url)
        .ping("/ping")
        .ping_interval(Duration::from_secs(15))
        .on_open(move || {
            let _ = opened_tx.send(());
        })
        .on_close(|reason| println!("[Close] {reason}"))
        .build()?;

    client.connect();

    loop {
        tokio::select! {
            opened = opened_rx.recv() => {
                if opened.is_none() {
                    break;
                }
                println!("[Open] sending {uri}");
                stream(&client, uri).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n[Exit] shutting down");
                break;
            }
        }
    }

    client.shutdown();
    Ok(())
}

/// Prints frames until the transaction completes or the connection drops.
async fn stream(client: &StrestClient, uri: &str) {
    let mut frames = match client.send(RequestOptions::new(uri)) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("[Send] {e}");
            return;
        }
    };

    let mut count = 0usize;
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(response) => {
                count += 1;
                println!("[{count:>5}] {response}");
            }
            Err(e) => eprintln!("[Lost] {e}"),
        }
    }
    println!("[Done] {count} frames");
}

/// Initialize tracing/logging.
fn init_logging(debug: bool) {
    let filter = if debug {
        "strest_client=debug"
    } else {
        "strest_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
