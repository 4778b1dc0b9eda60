//! `connector enqueue`: Queue training messages from a file or stdin.
//!
//! Input is one JSON message or a JSON array of messages. Each message goes
//! through the same intake as the external queue consumer.

use connector_engine::TrainingMessageConsumer;
use connector_gateway::Services;
use std::io::Read;
use std::path::Path;
use tokio::sync::mpsc;

pub async fn run(explicit: Option<&Path>, input: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).map_err(|e| format!("Cannot read {input}: {e}"))?
    };
    let messages = split_messages(&raw)?;

    let config = super::load_config(explicit)?;
    let services = Services::build(&config).await?;

    let (tx, rx) = mpsc::channel(messages.len().max(1));
    let consumer = TrainingMessageConsumer::new(services.training.clone()).spawn(rx);
    for message in messages {
        tx.send(message).await?;
    }
    drop(tx);
    let stats = consumer.await?;

    println!("Queued {} message(s), rejected {}", stats.accepted, stats.rejected);
    if stats.rejected > 0 {
        return Err(format!("{} message(s) rejected; run with --verbose for details", stats.rejected).into());
    }
    Ok(())
}

/// One raw JSON string per message. A top-level array is split into its
/// elements; anything else is passed through whole.
pub fn split_messages(raw: &str) -> Result<Vec<String>, serde_json::Error> {
    let trimmed = raw.trim();
    if !trimmed.starts_with('[') {
        return Ok(vec![trimmed.to_string()]);
    }
    let items: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
    Ok(items.iter().map(|item| item.to_string()).collect())
}
