//! Typewriter rendering of a live event feed.
//!
//! Connects to an event stream, prints each message a few characters at a
//! time, and stops when the server sends an `end` event.
//!
//! Run with:
//! ```bash
//! cargo run --example typewriter_feed -- http://localhost:3007/sse
//! ```

use eventfeed::prelude::*;
use serde::Deserialize;
use std::io::{self, Write};
use std::time::Duration;

/// Payload shapes sent by the demo feed.
#[derive(Debug, Deserialize)]
struct FeedMessage {
    message: Option<String>,
    time: Option<String>,
    index: Option<u32>,
}

impl FeedMessage {
    fn render(&self) -> String {
        match (&self.message, self.index, &self.time) {
            (Some(message), _, _) => message.clone(),
            (None, Some(index), Some(time)) => format!("#{index} at {time}"),
            (None, Some(index), None) => format!("#{index}"),
            (None, None, _) => String::from("(empty)"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    eventfeed::init_tracing();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:3007/sse".to_string());

    let client = EventSourceClient::new(url.as_str(), ClientOptions::default());
    let typer = ChunkScheduler::new(SchedulerConfig::default());

    client.on(EventName::Open, |event| {
        if let ClientEvent::Open(meta) = event {
            println!("connected (HTTP {})", meta.status);
        }
        Ok(())
    });

    client.on(EventName::Error, |event| {
        if let Some(err) = event.error() {
            eprintln!("stream error: {err}");
        }
        Ok(())
    });

    let scheduler = typer.clone();
    client.on(EventName::Message, move |event| {
        let Some(record) = event.record() else {
            return Ok(());
        };
        let line = record
            .parse_data::<FeedMessage>()
            .map(|message| message.render())
            .unwrap_or_else(|_| record.data.clone());

        scheduler.enqueue(
            format!("{line}\n"),
            |delta, _, _| {
                print!("{delta}");
                io::stdout().flush()?;
                Ok(())
            },
            None,
        );
        Ok(())
    });

    let closer = client.clone();
    client.on(EventName::custom("end"), move |_| {
        tracing::info!("Server announced the end of the feed");
        closer.disconnect();
        Ok(())
    });

    let outcome = tokio::select! {
        outcome = client.connect() => outcome,
        _ = tokio::signal::ctrl_c() => {
            client.destroy();
            typer.cancel();
            println!("\ninterrupted");
            return Ok(());
        }
    };

    while typer.current_job().is_some() || typer.pending_jobs() > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    match outcome.error() {
        Some(err) => println!("feed failed: {err}"),
        None => println!(
            "feed finished ({outcome:?}), last event id: {:?}",
            client.last_event_id()
        ),
    }
    Ok(())
}
