//! Confirmations waiting for a reservation owner's decision.

use crate::types::{NoticeId, ParticipantId, SeatId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An open request to sit on someone else's reserved seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    /// Requested seat
    pub seat: SeatId,
    /// Participant who wants the seat
    pub requester: ParticipantId,
    /// Reservation owner when the request was made (informational; the
    /// current owner is what authorizes a decision)
    pub owner: ParticipantId,
    /// When the request was made
    pub created_at: DateTime<Utc>,
    /// Distinguishes this request from earlier ones for the same seat and requester
    pub ticket: u64,
    /// Prompt shown to the owner, once posted
    pub prompt: Option<NoticeId>,
}

/// Open confirmations keyed by `(seat, requester)`
///
/// At most one confirmation exists per key; distinct requesters may wait on
/// the same seat concurrently.
#[derive(Debug, Clone, Default)]
pub struct PendingConfirmationStore {
    entries: BTreeMap<(SeatId, ParticipantId), PendingConfirmation>,
    next_ticket: u64,
}

impl PendingConfirmationStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a confirmation, returning the one it replaces for the same key
    ///
    /// Assigns a fresh ticket and clears `prompt`.
    pub fn open(
        &mut self,
        seat: SeatId,
        requester: ParticipantId,
        owner: ParticipantId,
        created_at: DateTime<Utc>,
    ) -> (u64, Option<PendingConfirmation>) {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let replaced = self.entries.insert(
            (seat, requester),
            PendingConfirmation {
                seat,
                requester,
                owner,
                created_at,
                ticket,
                prompt: None,
            },
        );
        (ticket, replaced)
    }

    /// Record the prompt posted for the confirmation with `ticket`
    ///
    /// Returns false if that confirmation is gone, was superseded, or already
    /// has a prompt.
    pub fn attach_prompt(
        &mut self,
        seat: SeatId,
        requester: ParticipantId,
        ticket: u64,
        prompt: NoticeId,
    ) -> bool {
        match self.entries.get_mut(&(seat, requester)) {
            Some(entry) if entry.ticket == ticket && entry.prompt.is_none() => {
                entry.prompt = Some(prompt);
                true
            },
            _ => false,
        }
    }

    /// Remove and return the confirmation for `(seat, requester)`
    pub fn remove(&mut self, seat: SeatId, requester: ParticipantId) -> Option<PendingConfirmation> {
        self.entries.remove(&(seat, requester))
    }

    /// Remove the confirmation whose prompt is `prompt`
    pub fn withdraw_by_prompt(&mut self, prompt: NoticeId) -> Option<PendingConfirmation> {
        let key = self
            .entries
            .iter()
            .find(|(_, entry)| entry.prompt == Some(prompt))
            .map(|(key, _)| *key)?;
        self.entries.remove(&key)
    }

    /// Remove every confirmation
    pub fn drain(&mut self) -> Vec<PendingConfirmation> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Confirmation for `(seat, requester)`
    #[must_use]
    pub fn get(&self, seat: SeatId, requester: ParticipantId) -> Option<&PendingConfirmation> {
        self.entries.get(&(seat, requester))
    }

    /// Does `requester` have an open confirmation on `seat`?
    #[must_use]
    pub fn contains(&self, seat: SeatId, requester: ParticipantId) -> bool {
        self.entries.contains_key(&(seat, requester))
    }

    /// Is anybody waiting on `seat`?
    #[must_use]
    pub fn any_for_seat(&self, seat: SeatId) -> bool {
        self.for_seat(seat).next().is_some()
    }

    /// Confirmations waiting on `seat`
    pub fn for_seat(&self, seat: SeatId) -> impl Iterator<Item = &PendingConfirmation> {
        self.entries
            .range((seat, ParticipantId::new(i64::MIN))..=(seat, ParticipantId::new(i64::MAX)))
            .map(|(_, entry)| entry)
    }

    /// All open confirmations
    pub fn iter(&self) -> impl Iterator<Item = &PendingConfirmation> {
        self.entries.values()
    }

    /// Number of open confirmations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is waiting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
