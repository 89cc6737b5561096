//! Office seating - per-channel seat booking with reservations and owner consent
//!
//! Each chat channel keeps its own seating chart. Participants book seats by
//! pressing buttons under the chart; a seat reserved for somebody else needs
//! that owner's consent first, and the owner answers a prompt that disappears
//! after a while. Marketing seats are never bookable.
//!
//! # Architecture
//!
//! ```text
//! inbound text/callback ──► parse ──► SeatingHub ──► channel Store (one per channel)
//!                                                        │ reducer, serialized
//!                                                        ▼
//!                             SeatRegistry + PendingConfirmationStore (ConflictArbiter)
//!                                                        │ effects
//!                                                        ▼
//!                                 Notifier: chart, prompts, acknowledgements, timers
//! ```
//!
//! - [`registry`]: who sits where, reservations, marketing seats
//! - [`arbiter`]: booking rules and owner decisions
//! - [`pending`]: requests waiting for an owner
//! - [`expiry`]: cancellable deletion timers for transient notices
//! - [`projector`]: chart snapshot for display
//! - [`reducer`]: the channel state machine
//! - [`hub`]: channel stores behind a typed async API

pub mod arbiter;
pub mod config;
pub mod error;
pub mod expiry;
pub mod hub;
pub mod inbound;
pub mod metrics;
pub mod notifier;
pub mod pending;
pub mod plan;
pub mod projector;
pub mod reducer;
pub mod registry;
pub mod render;
pub mod types;

pub use arbiter::{BookOutcome, ConflictArbiter, Resolution};
pub use config::Config;
pub use error::{HubError, NotifierError, SeatingError};
pub use expiry::NotificationExpiry;
pub use hub::SeatingHub;
pub use inbound::{parse_callback, parse_command, Callback, Inbound, ParseError};
pub use notifier::{InMemoryNotifier, Notice, Notifier, TracingNotifier};
pub use pending::{PendingConfirmation, PendingConfirmationStore};
pub use plan::SeatPlan;
pub use projector::{ChartProjection, SeatView};
pub use reducer::{CommandOutcome, SeatingAction, SeatingEnvironment, SeatingReducer, SeatingState};
pub use registry::SeatRegistry;
pub use render::{chart_keyboard, notice_keyboard, render_chart, render_notice, Button, InMemoryDirectory, ParticipantDirectory};
pub use types::{ChannelId, Decision, NoticeId, ParticipantId, RequestId, SeatId, SeatStatus};
