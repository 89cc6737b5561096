//! Parsing of chat commands and button callbacks into typed requests.
//!
//! Commands:
//! - `/attendance` resets the chart
//! - `/reserve <seat>`, sent as a reply to the future owner's message
//! - `/unreserve <seat>`
//!
//! Callback payloads: `book|<seat>`, `allow|<seat>|<requester>`,
//! `deny|<seat>|<requester>` and `leave`.

use crate::types::{Decision, ParticipantId, SeatId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A parsed request, before the sender and channel are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Reset the chart and post a fresh one
    Attendance,
    /// Reserve `seat` for `owner`
    Reserve {
        /// Seat to reserve
        seat: SeatId,
        /// Author of the message the command replied to
        owner: ParticipantId,
    },
    /// Remove the reservation on `seat`
    Unreserve {
        /// Seat to release
        seat: SeatId,
    },
    /// Sender wants `seat`
    Book {
        /// Requested seat
        seat: SeatId,
    },
    /// Sender left the office
    Leave,
    /// Sender answers a confirmation prompt
    Resolve {
        /// Requested seat
        seat: SeatId,
        /// Who asked for it
        requester: ParticipantId,
        /// Allow or deny
        decision: Decision,
    },
}

/// Why a message could not be turned into a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Not one of the known commands
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Known command with the wrong arguments
    #[error("usage: {0}")]
    Usage(&'static str),

    /// `/reserve` was not sent as a reply
    #[error("reply to the owner's message with /reserve <seat>")]
    MissingReplyTarget,

    /// Seat argument is not a letter followed by a digit
    #[error("'{0}' is not a seat")]
    InvalidSeat(String),

    /// Callback payload not produced by this bot
    #[error("unrecognised callback '{0}'")]
    UnknownCallback(String),
}

impl ParseError {
    /// Reply text with a usage hint
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownCommand(command) => {
                format!("Unknown command {command}. Try /attendance, /reserve <seat> or /unreserve <seat>.")
            },
            Self::Usage(usage) => format!("Wrong format. Use {usage}"),
            Self::MissingReplyTarget => {
                "To reserve a seat, reply to that person's message with /reserve <seat>.".to_string()
            },
            Self::InvalidSeat(seat) => format!("Seat {seat} does not exist."),
            Self::UnknownCallback(_) => "This button is no longer valid.".to_string(),
        }
    }
}

/// Parse a slash command
///
/// `reply_to` is the author of the message this one replies to, if any.
/// A `@botname` suffix on the command is ignored.
///
/// # Errors
///
/// Returns [`ParseError`] describing what is wrong with the text.
pub fn parse_command(text: &str, reply_to: Option<ParticipantId>) -> Result<Inbound, ParseError> {
    let mut words = text.split_whitespace();
    let head = words.next().unwrap_or_default();
    let command = head.split('@').next().unwrap_or_default();
    let args: Vec<&str> = words.collect();

    match command {
        "/attendance" => Ok(Inbound::Attendance),
        "/reserve" => {
            let owner = reply_to.ok_or(ParseError::MissingReplyTarget)?;
            let [seat] = args.as_slice() else {
                return Err(ParseError::Usage("/reserve <seat>"));
            };
            Ok(Inbound::Reserve {
                seat: parse_seat(seat)?,
                owner,
            })
        },
        "/unreserve" => {
            let [seat] = args.as_slice() else {
                return Err(ParseError::Usage("/unreserve <seat>"));
            };
            Ok(Inbound::Unreserve {
                seat: parse_seat(seat)?,
            })
        },
        other => Err(ParseError::UnknownCommand(other.to_string())),
    }
}

/// Parse a button callback payload
///
/// # Errors
///
/// Returns [`ParseError::UnknownCallback`] for payloads this crate never produces.
pub fn parse_callback(data: &str) -> Result<Inbound, ParseError> {
    let callback: Callback = data.parse()?;
    Ok(match callback {
        Callback::Book(seat) => Inbound::Book { seat },
        Callback::Leave => Inbound::Leave,
        Callback::Allow { seat, requester } => Inbound::Resolve {
            seat,
            requester,
            decision: Decision::Allow,
        },
        Callback::Deny { seat, requester } => Inbound::Resolve {
            seat,
            requester,
            decision: Decision::Deny,
        },
    })
}

fn parse_seat(input: &str) -> Result<SeatId, ParseError> {
    SeatId::parse(input).map_err(|_| ParseError::InvalidSeat(input.to_uppercase()))
}

/// Button payloads, in their wire form `verb|arg|arg`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    /// `book|<seat>`
    Book(SeatId),
    /// `allow|<seat>|<requester>`
    Allow {
        /// Requested seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
    },
    /// `deny|<seat>|<requester>`
    Deny {
        /// Requested seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
    },
    /// `leave`
    Leave,
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Book(seat) => write!(f, "book|{seat}"),
            Self::Allow { seat, requester } => write!(f, "allow|{seat}|{requester}"),
            Self::Deny { seat, requester } => write!(f, "deny|{seat}|{requester}"),
            Self::Leave => f.write_str("leave"),
        }
    }
}

impl FromStr for Callback {
    type Err = ParseError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let unknown = || ParseError::UnknownCallback(data.to_string());
        let parts: Vec<&str> = data.split('|').collect();

        match parts.as_slice() {
            ["leave"] => Ok(Self::Leave),
            ["book", seat] => Ok(Self::Book(SeatId::parse(seat).map_err(|_| unknown())?)),
            [verb @ ("allow" | "deny"), seat, requester] => {
                let seat = SeatId::parse(seat).map_err(|_| unknown())?;
                let requester = ParticipantId::new(requester.parse().map_err(|_| unknown())?);
                Ok(if *verb == "allow" {
                    Self::Allow { seat, requester }
                } else {
                    Self::Deny { seat, requester }
                })
            },
            _ => Err(unknown()),
        }
    }
}
