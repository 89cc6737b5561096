//! Booking and owner-consent arbitration.
//!
//! Pure functions over a channel's [`SeatRegistry`] and
//! [`PendingConfirmationStore`]. They decide outcomes and mutate state; the
//! reducer turns the results into notifier effects.

use crate::error::SeatingError;
use crate::pending::{PendingConfirmation, PendingConfirmationStore};
use crate::registry::SeatRegistry;
use crate::types::{Decision, ParticipantId, SeatId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Successful booking attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookOutcome {
    /// The participant now holds the seat
    Confirmed {
        /// Booked seat
        seat: SeatId,
        /// Seat the participant moved away from
        vacated: Option<SeatId>,
    },
    /// The seat is reserved by someone else, who has to consent first
    Deferred {
        /// Requested seat
        seat: SeatId,
        /// Reservation owner asked for consent
        owner: ParticipantId,
    },
}

impl BookOutcome {
    /// Reply shown to the participant who pressed the button
    #[must_use]
    pub const fn acknowledgement(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "Seat booked.",
            Self::Deferred { .. } => "This seat is reserved. Its owner has been asked to confirm.",
        }
    }

    /// Label for metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::Deferred { .. } => "deferred",
        }
    }
}

/// Result of a booking attempt, with the confirmation it replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    /// What happened
    pub outcome: BookOutcome,
    /// Ticket of the confirmation opened by a deferral
    pub ticket: Option<u64>,
    /// Earlier confirmation for the same seat and requester, now replaced
    pub superseded: Option<PendingConfirmation>,
}

/// Owner's decision as applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// Requester now holds the seat
    Granted {
        /// Seat
        seat: SeatId,
        /// New occupant
        requester: ParticipantId,
    },
    /// Request refused; nothing changed
    Denied {
        /// Seat
        seat: SeatId,
        /// Refused requester
        requester: ParticipantId,
    },
}

/// A closed confirmation and what came of it
///
/// The confirmation is removed even when the decision could not be applied,
/// so `result` may carry [`SeatingError::AlreadyOccupied`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    /// The confirmation that was closed
    pub confirmation: PendingConfirmation,
    /// Applied decision, or why it could not be applied
    pub result: Result<Resolution, SeatingError>,
}

/// Booking rules for reserved seats
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictArbiter;

impl ConflictArbiter {
    /// Try to seat `participant` on `seat`
    ///
    /// Order of checks: plan membership, marketing, reservation by someone
    /// else (deferral, no registry change), occupancy, then assignment.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::InvalidSeat`] if the seat is not in the plan
    /// - [`SeatingError::SeatUnavailable`] for marketing seats
    /// - [`SeatingError::AlreadyOccupied`] if someone else sits there
    pub fn book(
        registry: &mut SeatRegistry,
        pending: &mut PendingConfirmationStore,
        participant: ParticipantId,
        seat: SeatId,
        now: DateTime<Utc>,
    ) -> Result<Booking, SeatingError> {
        if !registry.plan().contains(seat) {
            return Err(SeatingError::InvalidSeat(seat.to_string()));
        }
        if registry.is_marketing(seat) {
            return Err(SeatingError::SeatUnavailable(seat));
        }

        if let Some(owner) = registry.reservation_owner(seat) {
            if owner != participant {
                let (ticket, superseded) = pending.open(seat, participant, owner, now);
                return Ok(Booking {
                    outcome: BookOutcome::Deferred { seat, owner },
                    ticket: Some(ticket),
                    superseded,
                });
            }
        }

        let vacated = registry.assign(participant, seat)?;
        Ok(Booking {
            outcome: BookOutcome::Confirmed { seat, vacated },
            ticket: None,
            superseded: None,
        })
    }

    /// Apply the owner's `decision` on the request of `requester` for `seat`
    ///
    /// The decider is checked against the reservation owner at this moment,
    /// not the owner captured when the request was made.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::NoSuchRequest`] if no confirmation is open for the pair
    /// - [`SeatingError::NotAuthorized`] if `decider` is not the current owner
    ///
    /// Neither error changes any state.
    pub fn resolve(
        registry: &mut SeatRegistry,
        pending: &mut PendingConfirmationStore,
        seat: SeatId,
        requester: ParticipantId,
        decider: ParticipantId,
        decision: Decision,
    ) -> Result<Settlement, SeatingError> {
        if !pending.contains(seat, requester) {
            return Err(SeatingError::NoSuchRequest(seat));
        }
        if registry.reservation_owner(seat) != Some(decider) {
            return Err(SeatingError::NotAuthorized(seat));
        }

        let confirmation = pending
            .remove(seat, requester)
            .ok_or(SeatingError::NoSuchRequest(seat))?;

        let result = match decision {
            Decision::Deny => Ok(Resolution::Denied { seat, requester }),
            Decision::Allow => match registry.occupant_of(seat) {
                Some(_) => Err(SeatingError::AlreadyOccupied(seat)),
                None => registry
                    .assign(requester, seat)
                    .map(|_| Resolution::Granted { seat, requester }),
            },
        };

        Ok(Settlement {
            confirmation,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SeatStatus;
    use seatwarden_core::environment::Clock;
    use seatwarden_testing::test_clock;

    fn seat(id: &str) -> SeatId {
        SeatId::parse(id).unwrap()
    }

    const OWNER: ParticipantId = ParticipantId::new(100);
    const P1: ParticipantId = ParticipantId::new(1);
    const P2: ParticipantId = ParticipantId::new(2);
    const P3: ParticipantId = ParticipantId::new(3);

    struct Channel {
        registry: SeatRegistry,
        pending: PendingConfirmationStore,
    }

    impl Channel {
        fn new() -> Self {
            Self {
                registry: SeatRegistry::new(),
                pending: PendingConfirmationStore::new(),
            }
        }

        fn book(&mut self, participant: ParticipantId, id: &str) -> Result<BookOutcome, SeatingError> {
            ConflictArbiter::book(
                &mut self.registry,
                &mut self.pending,
                participant,
                seat(id),
                test_clock().now(),
            )
            .map(|booking| booking.outcome)
        }

        fn resolve(
            &mut self,
            id: &str,
            requester: ParticipantId,
            decider: ParticipantId,
            decision: Decision,
        ) -> Result<Settlement, SeatingError> {
            ConflictArbiter::resolve(
                &mut self.registry,
                &mut self.pending,
                seat(id),
                requester,
                decider,
                decision,
            )
        }
    }

    #[test]
    fn free_seat_is_confirmed() {
        let mut channel = Channel::new();
        assert_eq!(
            channel.book(P1, "D1"),
            Ok(BookOutcome::Confirmed {
                seat: seat("D1"),
                vacated: None
            })
        );
        assert_eq!(channel.registry.status_of(seat("D1")), Some(SeatStatus::Occupied));
    }

    #[test]
    fn marketing_seat_is_always_unavailable() {
        let mut channel = Channel::new();
        assert_eq!(
            channel.book(P1, "A2"),
            Err(SeatingError::SeatUnavailable(seat("A2")))
        );
        assert_eq!(
            channel.book(OWNER, "A3"),
            Err(SeatingError::SeatUnavailable(seat("A3")))
        );
        assert!(channel.pending.is_empty());
    }

    #[test]
    fn unknown_seat_is_invalid() {
        let mut channel = Channel::new();
        assert_eq!(channel.book(P1, "Z9"), Err(SeatingError::InvalidSeat("Z9".into())));
    }

    #[test]
    fn reserved_seat_defers_without_mutation() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();

        assert_eq!(
            channel.book(P2, "A1"),
            Ok(BookOutcome::Deferred {
                seat: seat("A1"),
                owner: OWNER
            })
        );
        assert_eq!(channel.registry.occupant_of(seat("A1")), None);
        assert!(channel.pending.contains(seat("A1"), P2));
    }

    #[test]
    fn owner_books_own_reservation_directly() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        assert!(matches!(
            channel.book(OWNER, "A1"),
            Ok(BookOutcome::Confirmed { .. })
        ));
    }

    #[test]
    fn occupied_seat_rejected() {
        let mut channel = Channel::new();
        channel.book(P1, "C2").unwrap();
        assert_eq!(
            channel.book(P2, "C2"),
            Err(SeatingError::AlreadyOccupied(seat("C2")))
        );
    }

    #[test]
    fn rebooking_supersedes_open_confirmation() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        let now = test_clock().now();

        let first = ConflictArbiter::book(&mut channel.registry, &mut channel.pending, P2, seat("A1"), now)
            .unwrap();
        assert!(first.superseded.is_none());

        let second = ConflictArbiter::book(&mut channel.registry, &mut channel.pending, P2, seat("A1"), now)
            .unwrap();
        assert_eq!(second.superseded.map(|c| c.ticket), first.ticket);
        assert_eq!(channel.pending.len(), 1);
    }

    #[test]
    fn allow_assigns_requester() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        channel.book(P2, "A1").unwrap();

        let settlement = channel.resolve("A1", P2, OWNER, Decision::Allow).unwrap();

        assert_eq!(
            settlement.result,
            Ok(Resolution::Granted {
                seat: seat("A1"),
                requester: P2
            })
        );
        assert_eq!(channel.registry.occupant_of(seat("A1")), Some(P2));
        assert!(channel.pending.is_empty());
    }

    #[test]
    fn deny_leaves_registry_untouched() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        channel.book(P2, "A1").unwrap();

        let settlement = channel.resolve("A1", P2, OWNER, Decision::Deny).unwrap();

        assert!(matches!(settlement.result, Ok(Resolution::Denied { .. })));
        assert_eq!(channel.registry.occupant_of(seat("A1")), None);
        assert!(channel.pending.is_empty());
    }

    #[test]
    fn second_allow_degrades_to_already_occupied() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        channel.book(P2, "A1").unwrap();
        channel.book(P3, "A1").unwrap();
        assert_eq!(channel.pending.for_seat(seat("A1")).count(), 2);

        channel.resolve("A1", P2, OWNER, Decision::Allow).unwrap();
        let second = channel.resolve("A1", P3, OWNER, Decision::Allow).unwrap();

        assert_eq!(second.result, Err(SeatingError::AlreadyOccupied(seat("A1"))));
        assert_eq!(second.confirmation.requester, P3);
        assert_eq!(channel.registry.seat_of(P3), None);
        assert!(channel.pending.is_empty());
    }

    #[test]
    fn only_current_owner_decides() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        channel.book(P2, "A1").unwrap();

        assert_eq!(
            channel.resolve("A1", P2, P3, Decision::Allow),
            Err(SeatingError::NotAuthorized(seat("A1")))
        );

        // Ownership changed after the request was made
        channel.registry.reserve(seat("A1"), P1).unwrap();
        assert_eq!(
            channel.resolve("A1", P2, OWNER, Decision::Allow),
            Err(SeatingError::NotAuthorized(seat("A1")))
        );
        assert!(channel.pending.contains(seat("A1"), P2));

        assert!(channel.resolve("A1", P2, P1, Decision::Allow).is_ok());
    }

    #[test]
    fn unknown_request() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        assert_eq!(
            channel.resolve("A1", P2, OWNER, Decision::Allow),
            Err(SeatingError::NoSuchRequest(seat("A1")))
        );
    }

    #[test]
    fn allow_moves_requester_from_previous_seat() {
        let mut channel = Channel::new();
        channel.registry.reserve(seat("A1"), OWNER).unwrap();
        channel.book(P2, "D3").unwrap();
        channel.book(P2, "A1").unwrap();

        channel.resolve("A1", P2, OWNER, Decision::Allow).unwrap();

        assert_eq!(channel.registry.seat_of(P2), Some(seat("A1")));
        assert_eq!(channel.registry.occupant_of(seat("D3")), None);
        channel.registry.check_invariants().unwrap();
    }
}
