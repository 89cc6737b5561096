//! Error types for the seating domain.

use crate::types::{NoticeId, SeatId};
use seatwarden_runtime::StoreError;
use thiserror::Error;

/// Expected failures of registry and arbiter operations
///
/// These are business outcomes, reported back to the participant who issued
/// the command. Each kind has one fixed user-facing message, see
/// [`SeatingError::user_message`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeatingError {
    /// Seat id is malformed or not part of the plan
    #[error("seat '{0}' does not exist")]
    InvalidSeat(String),

    /// Seat is a marketing seat
    #[error("seat {0} is a marketing seat")]
    SeatUnavailable(SeatId),

    /// Seat is held by someone else
    #[error("seat {0} is already occupied")]
    AlreadyOccupied(SeatId),

    /// Seat has no reservation to remove
    #[error("seat {0} is not reserved")]
    NotReserved(SeatId),

    /// Decider is not the current reservation owner
    #[error("only the owner of seat {0} can decide")]
    NotAuthorized(SeatId),

    /// Participant holds no seat
    #[error("participant is not seated")]
    NotPresent,

    /// No open confirmation for this seat and requester
    #[error("no open request for seat {0}")]
    NoSuchRequest(SeatId),
}

impl SeatingError {
    /// Fixed text shown to the participant
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidSeat(_) => "That seat does not exist.",
            Self::SeatUnavailable(_) => "That seat is reserved for marketing and cannot be booked.",
            Self::AlreadyOccupied(_) => "That seat is already taken.",
            Self::NotReserved(_) => "That seat is not reserved.",
            Self::NotAuthorized(_) => "Only the seat's owner can answer this request.",
            Self::NotPresent => "Looks like you are not in the office yet.",
            Self::NoSuchRequest(_) => "This request is no longer open.",
        }
    }

    /// Short label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSeat(_) => "invalid_seat",
            Self::SeatUnavailable(_) => "seat_unavailable",
            Self::AlreadyOccupied(_) => "already_occupied",
            Self::NotReserved(_) => "not_reserved",
            Self::NotAuthorized(_) => "not_authorized",
            Self::NotPresent => "not_present",
            Self::NoSuchRequest(_) => "no_such_request",
        }
    }
}

/// Transport failures reported by a [`Notifier`](crate::notifier::Notifier)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifierError {
    /// The notice is already gone
    #[error("notice {0} not found")]
    NotFound(NoticeId),

    /// Anything else the transport reports
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors returned by [`SeatingHub`](crate::hub::SeatingHub)
#[derive(Error, Debug)]
pub enum HubError {
    /// The command was rejected by the seating rules
    #[error(transparent)]
    Seating(#[from] SeatingError),

    /// The channel store failed to answer
    #[error("channel store: {0}")]
    Store(#[from] StoreError),

    /// The channel answered with a reply of the wrong kind
    #[error("unexpected reply to {0}")]
    UnexpectedReply(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_distinct_message() {
        let seat = SeatId::parse("A1").unwrap();
        let errors = [
            SeatingError::InvalidSeat("Z9".into()),
            SeatingError::SeatUnavailable(seat),
            SeatingError::AlreadyOccupied(seat),
            SeatingError::NotReserved(seat),
            SeatingError::NotAuthorized(seat),
            SeatingError::NotPresent,
            SeatingError::NoSuchRequest(seat),
        ];

        let mut messages: Vec<_> = errors.iter().map(SeatingError::user_message).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), errors.len());
    }

    #[test]
    fn display_includes_seat() {
        let seat = SeatId::parse("d1").unwrap();
        assert_eq!(
            SeatingError::AlreadyOccupied(seat).to_string(),
            "seat D1 is already occupied"
        );
    }
}
