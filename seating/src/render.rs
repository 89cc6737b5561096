//! Text rendering of charts, notices and their buttons.

use crate::inbound::Callback;
use crate::notifier::Notice;
use crate::projector::ChartProjection;
use crate::types::{ParticipantId, SeatStatus};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::RwLock;

const FREE: &str = "🌕";
const OCCUPIED: &str = "🌑";
const RESERVED: &str = "🌓";
const MARKETING: &str = "🤍";
const PLANT: &str = "🌿";

/// Resolves participant ids to display names
pub trait ParticipantDirectory: Send + Sync {
    /// Name shown for `participant`
    fn display_name(&self, participant: ParticipantId) -> String;
}

/// Directory backed by a map, falling back to `participant <id>`
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    names: RwLock<HashMap<ParticipantId, String>>,
}

impl InMemoryDirectory {
    /// Empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or rename a participant
    pub fn insert(&self, participant: ParticipantId, name: impl Into<String>) {
        self.names
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(participant, name.into());
    }

    /// Builder form of [`InMemoryDirectory::insert`]
    #[must_use]
    pub fn with(self, participant: ParticipantId, name: impl Into<String>) -> Self {
        self.insert(participant, name);
        self
    }
}

impl ParticipantDirectory for InMemoryDirectory {
    fn display_name(&self, participant: ParticipantId) -> String {
        self.names
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&participant)
            .cloned()
            .unwrap_or_else(|| format!("participant {participant}"))
    }
}

const fn marker(status: SeatStatus) -> &'static str {
    match status {
        SeatStatus::Free => FREE,
        SeatStatus::Occupied => OCCUPIED,
        SeatStatus::Reserved => RESERVED,
        SeatStatus::Marketing => MARKETING,
    }
}

/// Draw the chart: seat grid between the window and the aisle, then who is
/// in the office, the head count and a legend.
#[must_use]
pub fn render_chart(chart: &ChartProjection, directory: &dyn ParticipantDirectory) -> String {
    let mut out = String::new();
    out.push_str("┌───────── Window ─────────┐\n");
    for row in &chart.rows {
        let (left, right) = row.split_at(row.len() / 2);
        let cells = |views: &[crate::projector::SeatView]| {
            views
                .iter()
                .map(|view| format!("[{}{}]", view.seat, marker(view.status)))
                .collect::<String>()
        };
        let _ = writeln!(out, "{}    {}", cells(left), cells(right));
    }
    let _ = writeln!(out, "{}    {}", PLANT.repeat(6), PLANT.repeat(6));
    out.push_str("└────────── Aisle ─────────┘\n\n");

    out.push_str("In the office now:\n");
    for (participant, seat) in &chart.assignments {
        let _ = writeln!(out, "{} [{seat}]", directory.display_name(*participant));
    }
    let _ = writeln!(out, "\nTotal in the office: {}\n", chart.occupant_count());

    let _ = writeln!(out, "{FREE} free");
    let _ = writeln!(out, "{OCCUPIED} occupied");
    let _ = writeln!(out, "{RESERVED} reserved (owner must confirm)");
    let _ = write!(out, "{MARKETING} marketing (unavailable)");
    out
}

/// Text of a transient notice
#[must_use]
pub fn render_notice(notice: &Notice, directory: &dyn ParticipantDirectory) -> String {
    match notice {
        Notice::ConfirmationPrompt {
            seat,
            requester,
            owner,
        } => format!(
            "{}, {} wants to take {seat}. Allow?",
            directory.display_name(*owner),
            directory.display_name(*requester)
        ),
        Notice::Granted { seat, requester } => format!(
            "{}, you may take seat {seat}.",
            directory.display_name(*requester)
        ),
        Notice::Denied { requester, .. } => format!(
            "{}, sorry, that seat is not available right now.",
            directory.display_name(*requester)
        ),
        Notice::SeatTaken { seat, requester } => format!(
            "{}, seat {seat} was taken before the owner answered.",
            directory.display_name(*requester)
        ),
    }
}

/// Inline button with its callback payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Payload sent back when pressed
    pub callback: String,
}

impl Button {
    fn new(label: impl Into<String>, callback: &Callback) -> Self {
        Self {
            label: label.into(),
            callback: callback.to_string(),
        }
    }
}

/// Buttons under the chart: one per bookable seat by row, and "I left"
/// while anybody is seated
#[must_use]
pub fn chart_keyboard(chart: &ChartProjection) -> Vec<Vec<Button>> {
    let mut keyboard: Vec<Vec<Button>> = chart
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|view| view.is_bookable())
                .map(|view| Button::new(view.seat.to_string(), &Callback::Book(view.seat)))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if chart.show_leave() {
        keyboard.push(vec![Button::new("I left", &Callback::Leave)]);
    }
    keyboard
}

/// Buttons under a notice (only confirmation prompts have any)
#[must_use]
pub fn notice_keyboard(notice: &Notice) -> Vec<Vec<Button>> {
    match notice {
        Notice::ConfirmationPrompt {
            seat, requester, ..
        } => vec![vec![
            Button::new(
                "Allow",
                &Callback::Allow {
                    seat: *seat,
                    requester: *requester,
                },
            ),
            Button::new(
                "Deny",
                &Callback::Deny {
                    seat: *seat,
                    requester: *requester,
                },
            ),
        ]],
        _ => Vec::new(),
    }
}
