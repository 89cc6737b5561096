//! Identifiers and value types shared by every seating module.

use crate::error::SeatingError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Chat channel hosting one seating chart
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelId(i64);

impl ChannelId {
    /// Wraps a platform channel id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw platform id
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Member of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(i64);

impl ParticipantId {
    /// Wraps a platform user id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw platform id
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message posted by the notifier (chart, prompt or acknowledgement)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NoticeId(i64);

impl NoticeId {
    /// Wraps a platform message id
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// The raw platform id
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for NoticeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlates a command with its `CommandCompleted` reply
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new random `RequestId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `RequestId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat identifier: one upper-case ASCII letter followed by one digit.
///
/// Parsing is case-insensitive (`"a1"` becomes `A1`). Whether the seat is
/// part of the office plan is checked by the registry, not here.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId([u8; 2]);

impl SeatId {
    /// Parse user input into a seat id
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::InvalidSeat`] unless the trimmed input is a
    /// letter followed by a digit.
    pub fn parse(input: &str) -> Result<Self, SeatingError> {
        let trimmed = input.trim();
        match trimmed.as_bytes() {
            [letter, digit] if letter.is_ascii_alphabetic() && digit.is_ascii_digit() => {
                Ok(Self([letter.to_ascii_uppercase(), *digit]))
            },
            _ => Err(SeatingError::InvalidSeat(trimmed.to_string())),
        }
    }

    /// Build from already-validated parts
    pub(crate) const fn from_parts(letter: u8, digit: u8) -> Self {
        Self([letter, digit])
    }

    /// Row letter
    #[must_use]
    pub const fn letter(self) -> char {
        self.0[0] as char
    }

    /// Row digit
    #[must_use]
    pub const fn digit(self) -> char {
        self.0[1] as char
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.letter(), self.digit())
    }
}

impl fmt::Debug for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SeatId({self})")
    }
}

impl FromStr for SeatId {
    type Err = SeatingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

/// Display status of a seat, derived from registry state
///
/// Precedence when several apply: Marketing > Occupied > Reserved > Free.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatStatus {
    /// Nobody seated, no reservation
    Free,
    /// A participant is seated here
    Occupied,
    /// Unoccupied, but booking by anyone but the owner needs the owner's consent
    Reserved,
    /// Never bookable until the next reset
    Marketing,
}

/// Owner's answer to a confirmation prompt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Let the requester take the seat
    Allow,
    /// Refuse the request
    Deny,
}

impl Decision {
    /// Lower-case label used in metrics and callback payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }
}
