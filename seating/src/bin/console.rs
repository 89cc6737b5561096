//! Seating console
//!
//! Drives the seating hub from standard input, with every outgoing message
//! written to the log by the tracing notifier. One request per line:
//!
//! ```text
//! <sender> /attendance
//! <sender> /reserve <seat> ^<owner>     # ^<owner> stands in for "reply to"
//! <sender> /unreserve <seat>
//! <sender> book|<seat>
//! <sender> allow|<seat>|<requester>
//! <sender> leave
//! chart
//! quit
//! ```
//!
//! Channel is fixed to 1. Set `METRICS_ADDR` to expose Prometheus metrics.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin console
//! ```

use anyhow::Context;
use seating::{
    metrics::register_seating_metrics, parse_callback, parse_command, render_chart, ChannelId,
    CommandOutcome, Config, HubError, InMemoryDirectory, ParseError, ParticipantId, SeatingHub,
    TracingNotifier,
};
use seatwarden_runtime::metrics::MetricsServer;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHANNEL: ChannelId = ChannelId::new(1);

enum Line<'a> {
    Chart,
    Quit,
    Request { sender: ParticipantId, input: &'a str, reply_to: Option<ParticipantId> },
}

fn parse_line(line: &str) -> Option<Line<'_>> {
    let line = line.trim();
    match line {
        "" => None,
        "chart" => Some(Line::Chart),
        "quit" | "exit" => Some(Line::Quit),
        _ => {
            let (sender, rest) = line.split_once(' ')?;
            let sender = ParticipantId::new(sender.parse().ok()?);
            let (input, reply_to) = match rest.rsplit_once(" ^") {
                Some((input, owner)) => (input, Some(ParticipantId::new(owner.trim().parse().ok()?))),
                None => (rest, None),
            };
            Some(Line::Request {
                sender,
                input: input.trim(),
                reply_to,
            })
        },
    }
}

async fn handle(hub: &SeatingHub, sender: ParticipantId, input: &str, reply_to: Option<ParticipantId>) -> anyhow::Result<()> {
    let parsed = if input.starts_with('/') {
        parse_command(input, reply_to)
    } else {
        parse_callback(input)
    };
    let inbound = match parsed {
        Ok(inbound) => inbound,
        Err(error @ ParseError::UnknownCallback(_)) => {
            warn!(%error, "Ignored input");
            return Ok(());
        },
        Err(error) => {
            println!("{}", error.user_message());
            return Ok(());
        },
    };

    match hub.handle(CHANNEL, sender, inbound).await {
        Ok(CommandOutcome::Booked(outcome)) => println!("{}", outcome.acknowledgement()),
        Ok(outcome) => info!(?outcome, "Done"),
        Err(HubError::Seating(error)) => println!("{}", error.user_message()),
        Err(error) => return Err(error).context("channel did not answer"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,seating=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        prompt_ttl_secs = config.seating.prompt_ttl_secs,
        ack_ttl_secs = config.seating.ack_ttl_secs,
        metrics_addr = ?config.metrics.addr,
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics.addr {
        let mut server = MetricsServer::new(addr);
        server.start().context("failed to start metrics exporter")?;
        register_seating_metrics();
    }

    let directory = Arc::new(InMemoryDirectory::new());
    let hub = SeatingHub::from_config(&config, Arc::new(TracingNotifier::new(Arc::<InMemoryDirectory>::clone(&directory))));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            None => println!("usage: <sender> <command or callback> [^<reply-to>] | chart | quit"),
            Some(Line::Quit) => break,
            Some(Line::Chart) => println!("{}", render_chart(&hub.chart(CHANNEL).await, directory.as_ref())),
            Some(Line::Request { sender, input, reply_to }) => handle(&hub, sender, input, reply_to).await?,
        }
    }

    info!("Shutting down");
    hub.shutdown().await.context("seating hub did not shut down cleanly")?;
    Ok(())
}
