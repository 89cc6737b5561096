//! Property-based tests for the seat registry and the booking rules.
//!
//! Random operation sequences are applied to a fresh registry; the
//! bookkeeping has to stay consistent whatever order things happen in.

#![allow(clippy::unwrap_used)]

use chrono::Utc;
use proptest::prelude::*;
use seating::{
    BookOutcome, ChartProjection, ConflictArbiter, Decision, ParticipantId,
    PendingConfirmationStore, Resolution, SeatId, SeatPlan, SeatRegistry, SeatStatus, SeatingError,
};

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Reserve { seat: usize, owner: i64 },
    Unreserve { seat: usize },
    Book { seat: usize, participant: i64 },
    Resolve { seat: usize, requester: i64, decider: i64, allow: bool },
    Leave { participant: i64 },
    Reset,
}

fn plan_seats() -> Vec<SeatId> {
    SeatPlan::office().seats().collect()
}

fn arb_participant() -> impl Strategy<Value = i64> {
    1..6_i64
}

fn arb_seat() -> impl Strategy<Value = usize> {
    0..SeatPlan::office().len()
}

fn arb_bookable_seat() -> impl Strategy<Value = usize> {
    0..SeatRegistry::new().free_seats().len()
}

/// Reservation owner that never shows up as a requester
const OWNER: i64 = 9;

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (arb_seat(), arb_participant()).prop_map(|(seat, owner)| Op::Reserve { seat, owner }),
        1 => arb_seat().prop_map(|seat| Op::Unreserve { seat }),
        6 => (arb_seat(), arb_participant())
            .prop_map(|(seat, participant)| Op::Book { seat, participant }),
        4 => (arb_seat(), arb_participant(), arb_participant(), any::<bool>()).prop_map(
            |(seat, requester, decider, allow)| Op::Resolve { seat, requester, decider, allow }
        ),
        2 => arb_participant().prop_map(|participant| Op::Leave { participant }),
        1 => Just(Op::Reset),
    ]
}

struct World {
    seats: Vec<SeatId>,
    bookable: Vec<SeatId>,
    registry: SeatRegistry,
    pending: PendingConfirmationStore,
}

impl World {
    fn new() -> Self {
        let registry = SeatRegistry::new();
        Self {
            seats: plan_seats(),
            bookable: registry.free_seats(),
            registry,
            pending: PendingConfirmationStore::new(),
        }
    }

    /// Apply `op` and check its result against the state it ran on
    fn apply(&mut self, op: &Op) -> Result<(), TestCaseError> {
        match *op {
            Op::Reserve { seat, owner } => {
                let seat = self.seats[seat];
                let expected = if self.registry.is_marketing(seat) {
                    Err(SeatingError::SeatUnavailable(seat))
                } else if self.registry.occupant_of(seat).is_some() {
                    Err(SeatingError::AlreadyOccupied(seat))
                } else {
                    Ok(self.registry.reservation_owner(seat))
                };
                let result = self.registry.reserve(seat, ParticipantId::new(owner));
                prop_assert_eq!(result, expected, "{:?}", op);
            },
            Op::Unreserve { seat } => {
                let seat = self.seats[seat];
                let expected = self
                    .registry
                    .reservation_owner(seat)
                    .ok_or(SeatingError::NotReserved(seat));
                prop_assert_eq!(self.registry.unreserve(seat), expected, "{:?}", op);
            },
            Op::Book { seat, participant } => {
                let seat = self.seats[seat];
                let participant = ParticipantId::new(participant);
                let expected = match (
                    self.registry.reservation_owner(seat),
                    self.registry.occupant_of(seat),
                ) {
                    _ if self.registry.is_marketing(seat) => Err(SeatingError::SeatUnavailable(seat)),
                    (Some(owner), _) if owner != participant => {
                        Ok(BookOutcome::Deferred { seat, owner })
                    },
                    (_, Some(occupant)) if occupant != participant => {
                        Err(SeatingError::AlreadyOccupied(seat))
                    },
                    (_, Some(_)) => Ok(BookOutcome::Confirmed { seat, vacated: None }),
                    (_, None) => Ok(BookOutcome::Confirmed {
                        seat,
                        vacated: self.registry.seat_of(participant),
                    }),
                };
                let result = ConflictArbiter::book(
                    &mut self.registry,
                    &mut self.pending,
                    participant,
                    seat,
                    Utc::now(),
                )
                .map(|booking| booking.outcome);
                prop_assert_eq!(&result, &expected, "{:?}", op);
                if let Ok(BookOutcome::Deferred { .. }) = result {
                    prop_assert!(self.pending.contains(seat, participant));
                }
            },
            Op::Resolve { seat, requester, decider, allow } => {
                let seat = self.seats[seat];
                let requester = ParticipantId::new(requester);
                let decider = ParticipantId::new(decider);
                let decision = if allow { Decision::Allow } else { Decision::Deny };
                let expected = if !self.pending.contains(seat, requester) {
                    Err(SeatingError::NoSuchRequest(seat))
                } else if self.registry.reservation_owner(seat) != Some(decider) {
                    Err(SeatingError::NotAuthorized(seat))
                } else if !allow {
                    Ok(Ok(Resolution::Denied { seat, requester }))
                } else if self.registry.occupant_of(seat).is_some() {
                    Ok(Err(SeatingError::AlreadyOccupied(seat)))
                } else {
                    Ok(Ok(Resolution::Granted { seat, requester }))
                };
                let result = ConflictArbiter::resolve(
                    &mut self.registry,
                    &mut self.pending,
                    seat,
                    requester,
                    decider,
                    decision,
                )
                .map(|settlement| settlement.result);
                prop_assert_eq!(result, expected, "{:?}", op);
            },
            Op::Leave { participant } => {
                let participant = ParticipantId::new(participant);
                let expected = self
                    .registry
                    .seat_of(participant)
                    .ok_or(SeatingError::NotPresent);
                prop_assert_eq!(self.registry.release(participant), expected, "{:?}", op);
            },
            Op::Reset => {
                self.pending.drain();
                self.registry.reset();
            },
        }
        Ok(())
    }

    /// Clear whatever the history left on `seat`
    fn vacate(&mut self, seat: SeatId) {
        if let Some(occupant) = self.registry.occupant_of(seat) {
            self.registry.release(occupant).unwrap();
        }
        if self.registry.reservation_owner(seat).is_some() {
            self.registry.unreserve(seat).unwrap();
        }
    }
}

// ============================================================================
// Registry properties
// ============================================================================

proptest! {
    #[test]
    fn invariants_hold_after_every_operation(ops in prop::collection::vec(arb_op(), 0..80)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
            prop_assert_eq!(world.registry.check_invariants(), Ok(()), "after {:?}", op);
        }
    }

    #[test]
    fn marketing_seats_never_taken(ops in prop::collection::vec(arb_op(), 0..80)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
        }
        for seat in SeatPlan::office().marketing() {
            prop_assert_eq!(world.registry.status_of(*seat), Some(SeatStatus::Marketing));
            prop_assert_eq!(world.registry.occupant_of(*seat), None);
            prop_assert_eq!(world.registry.reservation_owner(*seat), None);
        }
    }

    #[test]
    fn everyone_holds_at_most_one_seat(ops in prop::collection::vec(arb_op(), 0..80)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
        }
        let snapshot = world.registry.assignments_snapshot();
        let mut participants: Vec<_> = snapshot.iter().map(|(participant, _)| *participant).collect();
        participants.sort();
        participants.dedup();
        prop_assert_eq!(participants.len(), snapshot.len());
        for (participant, seat) in snapshot {
            prop_assert_eq!(world.registry.seat_of(participant), Some(seat));
        }
    }

    #[test]
    fn chart_mirrors_registry(ops in prop::collection::vec(arb_op(), 0..60)) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
        }
        let chart = ChartProjection::project(&world.registry, &world.pending);
        for view in chart.seats() {
            prop_assert_eq!(Some(view.status), world.registry.status_of(view.seat));
            prop_assert_eq!(view.awaiting_consent, world.pending.any_for_seat(view.seat));
        }
        prop_assert_eq!(chart.occupant_count(), world.registry.occupant_count());
    }

    #[test]
    fn unreserve_restores_bookability(
        ops in prop::collection::vec(arb_op(), 0..40),
        seat in arb_bookable_seat(),
        owner in arb_participant(),
    ) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
        }
        let seat = world.bookable[seat];
        world.vacate(seat);
        prop_assert_eq!(world.registry.status_of(seat), Some(SeatStatus::Free));

        world.registry.reserve(seat, ParticipantId::new(owner)).unwrap();
        prop_assert_eq!(world.registry.status_of(seat), Some(SeatStatus::Reserved));
        world.registry.unreserve(seat).unwrap();
        prop_assert_eq!(world.registry.status_of(seat), Some(SeatStatus::Free));
        prop_assert_eq!(world.registry.check_invariants(), Ok(()));
    }

    #[test]
    fn failed_operations_change_nothing(
        ops in prop::collection::vec(arb_op(), 0..40),
        op in arb_op(),
    ) {
        let mut world = World::new();
        for op in &ops {
            world.apply(op)?;
        }
        let before = ChartProjection::project(&world.registry, &world.pending);
        let pending_before = world.pending.len();

        let failed = match op {
            Op::Reserve { seat, owner } => world
                .registry
                .reserve(world.seats[seat], ParticipantId::new(owner))
                .is_err(),
            Op::Leave { participant } => world.registry.release(ParticipantId::new(participant)).is_err(),
            Op::Resolve { seat, requester, decider, allow } => {
                let decision = if allow { Decision::Allow } else { Decision::Deny };
                ConflictArbiter::resolve(
                    &mut world.registry,
                    &mut world.pending,
                    world.seats[seat],
                    ParticipantId::new(requester),
                    ParticipantId::new(decider),
                    decision,
                )
                .is_err()
            },
            _ => false,
        };

        if failed {
            prop_assert_eq!(ChartProjection::project(&world.registry, &world.pending), before);
            prop_assert_eq!(world.pending.len(), pending_before);
        }
    }

    #[test]
    fn only_the_current_owner_settles(
        history in prop::collection::vec(arb_op(), 0..40),
        meanwhile in prop::collection::vec(arb_op(), 0..10),
        seat in arb_bookable_seat(),
        requester in arb_participant(),
        decider in prop_oneof![Just(OWNER), arb_participant()],
        allow in any::<bool>(),
    ) {
        let mut world = World::new();
        for op in &history {
            world.apply(op)?;
        }

        // Whatever came before, a request is now waiting on the owner
        let seat = world.bookable[seat];
        let owner = ParticipantId::new(OWNER);
        let requester = ParticipantId::new(requester);
        world.vacate(seat);
        world.registry.reserve(seat, owner).unwrap();
        let booking =
            ConflictArbiter::book(&mut world.registry, &mut world.pending, requester, seat, Utc::now())
                .unwrap();
        prop_assert_eq!(booking.outcome, BookOutcome::Deferred { seat, owner });

        // The reservation may change hands before anyone answers
        for op in &meanwhile {
            world.apply(op)?;
        }
        if !world.pending.contains(seat, requester) {
            return Ok(());
        }

        let decider = ParticipantId::new(decider);
        let current_owner = world.registry.reservation_owner(seat);
        let decision = if allow { Decision::Allow } else { Decision::Deny };
        let outcome = ConflictArbiter::resolve(
            &mut world.registry,
            &mut world.pending,
            seat,
            requester,
            decider,
            decision,
        );
        if current_owner == Some(decider) {
            prop_assert!(outcome.is_ok());
            prop_assert!(!world.pending.contains(seat, requester));
        } else {
            prop_assert_eq!(outcome.err(), Some(SeatingError::NotAuthorized(seat)));
            prop_assert!(world.pending.contains(seat, requester));
        }
        prop_assert_eq!(world.registry.check_invariants(), Ok(()));
    }
}
