//! Office Seating Demo
//!
//! Walks one channel through the everyday situations:
//! - booking a free seat
//! - asking a reservation owner for consent, and the owner allowing it
//! - two people waiting on the same reserved seat
//! - trying a marketing seat
//! - resetting the chart for a new day
//!
//! Messages go through the in-memory notifier, and the rendered chart is
//! printed after each step.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! RUST_LOG=seating=trace cargo run --bin demo
//! ```

use anyhow::Context;
use seating::{
    parse_callback, parse_command, render_chart, render_notice, ChannelId, CommandOutcome, Config,
    HubError, InMemoryDirectory, InMemoryNotifier, Inbound, ParticipantDirectory, ParticipantId,
    SeatingAction, SeatingHub,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CHANNEL: ChannelId = ChannelId::new(-100_200_300);

const OLGA: ParticipantId = ParticipantId::new(1);
const PAVEL: ParticipantId = ParticipantId::new(2);
const IRINA: ParticipantId = ParticipantId::new(3);
const DMITRY: ParticipantId = ParticipantId::new(4);

struct Demo {
    hub: SeatingHub,
    notifier: InMemoryNotifier,
    directory: InMemoryDirectory,
}

impl Demo {
    /// Feed one inbound request to the hub and print what the sender would see
    async fn send(&self, sender: ParticipantId, inbound: Inbound) -> anyhow::Result<()> {
        let name = self.directory_name(sender);
        let mut actions = self.hub.subscribe(CHANNEL).await;
        match self.hub.handle(CHANNEL, sender, inbound).await {
            Ok(CommandOutcome::Booked(outcome)) => println!("   → {name}: {}", outcome.acknowledgement()),
            Ok(outcome) => println!("   → {name}: ok ({outcome:?})"),
            Err(HubError::Seating(error)) => println!("   → {name}: {}", error.user_message()),
            Err(error) => return Err(error).context("channel did not answer"),
        }

        // The chart goes out last, after the command's notices. Rejected
        // commands publish nothing, so the wait is short.
        let published = async {
            while let Ok(action) = actions.recv().await {
                if matches!(action, SeatingAction::ChartPublished { .. }) {
                    break;
                }
            }
        };
        let _ = tokio::time::timeout(Duration::from_millis(200), published).await;
        Ok(())
    }

    fn directory_name(&self, participant: ParticipantId) -> String {
        self.directory.display_name(participant)
    }

    async fn press(&self, sender: ParticipantId, payload: &str) -> anyhow::Result<()> {
        println!("   {} presses [{payload}]", self.directory_name(sender));
        match parse_callback(payload) {
            Ok(inbound) => self.send(sender, inbound).await,
            Err(error) => {
                println!("   → {}", error.user_message());
                Ok(())
            },
        }
    }

    async fn command(
        &self,
        sender: ParticipantId,
        text: &str,
        reply_to: Option<ParticipantId>,
    ) -> anyhow::Result<()> {
        println!("   {} writes {text}", self.directory_name(sender));
        match parse_command(text, reply_to) {
            Ok(inbound) => self.send(sender, inbound).await,
            Err(error) => {
                println!("   → {}", error.user_message());
                Ok(())
            },
        }
    }

    fn show_chart(&self) {
        if let Some((_, chart)) = self.notifier.current_chart(CHANNEL) {
            println!("\n{}\n", render_chart(&chart, &self.directory));
        }
    }

    fn show_notices(&self) {
        for (_, notice) in self.notifier.live_notices(CHANNEL) {
            println!("   💬 {}", render_notice(&notice, &self.directory));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,seating=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🪑 ============================================");
    println!("   Office Seating - Live Demo");
    println!("============================================\n");

    let config = Config::from_env();
    let notifier = InMemoryNotifier::new();
    let demo = Demo {
        hub: SeatingHub::from_config(&config, Arc::new(notifier.clone())),
        notifier,
        directory: InMemoryDirectory::new()
            .with(OLGA, "Olga")
            .with(PAVEL, "Pavel")
            .with(IRINA, "Irina")
            .with(DMITRY, "Dmitry"),
    };

    println!("0️⃣  Morning: a fresh chart");
    demo.command(OLGA, "/attendance", None).await?;
    demo.show_chart();

    println!("1️⃣  Booking a free seat");
    demo.press(PAVEL, "book|D1").await?;

    println!("\n2️⃣  A1 is Olga's; Irina asks for it");
    demo.command(DMITRY, "/reserve A1", Some(OLGA)).await?;
    demo.press(IRINA, "book|A1").await?;
    demo.show_notices();

    println!("\n3️⃣  Dmitry asks for A1 too while Olga thinks");
    demo.press(DMITRY, "book|A1").await?;
    demo.show_notices();
    demo.show_chart();

    println!("4️⃣  Olga allows Irina, then Dmitry");
    demo.press(OLGA, &format!("allow|A1|{IRINA}")).await?;
    demo.press(OLGA, &format!("allow|A1|{DMITRY}")).await?;
    demo.show_notices();

    println!("\n5️⃣  Marketing seats stay off limits");
    demo.press(DMITRY, "book|A2").await?;
    demo.press(DMITRY, "book|B2").await?;
    demo.show_chart();

    println!("6️⃣  Pavel heads home; Dmitry tries to leave twice");
    demo.press(PAVEL, "leave").await?;
    demo.press(DMITRY, "leave").await?;
    demo.press(DMITRY, "leave").await?;

    println!("\n7️⃣  Next day: reset");
    demo.command(OLGA, "/attendance", None).await?;
    demo.show_chart();

    demo.hub
        .shutdown()
        .await
        .context("seating hub did not shut down cleanly")?;

    println!("✓ Demo complete");
    Ok(())
}
