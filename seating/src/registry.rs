//! Authoritative seat state for one channel.
//!
//! All operations are synchronous and atomic with respect to the registry:
//! either they return an error and change nothing, or they commit fully.
//! Callers serialize access per channel (see the channel store).

use crate::error::SeatingError;
use crate::plan::SeatPlan;
use crate::types::{ParticipantId, SeatId, SeatStatus};
use std::collections::{HashMap, HashSet};

/// Occupancy, assignments, reservations and marketing seats of one channel
///
/// Invariants after every committed mutation:
/// 1. `occupancy` and `assignment` are exact inverses.
/// 2. Marketing seats appear in neither `occupancy` nor `reservations`.
#[derive(Debug, Clone)]
pub struct SeatRegistry {
    plan: &'static SeatPlan,
    occupancy: HashMap<SeatId, ParticipantId>,
    assignment: HashMap<ParticipantId, SeatId>,
    reservations: HashMap<SeatId, ParticipantId>,
    marketing: HashSet<SeatId>,
}

impl SeatRegistry {
    /// Registry over the office plan with marketing seats seeded
    #[must_use]
    pub fn new() -> Self {
        let plan = SeatPlan::office();
        Self {
            plan,
            occupancy: HashMap::new(),
            assignment: HashMap::new(),
            reservations: HashMap::new(),
            marketing: plan.marketing().iter().copied().collect(),
        }
    }

    /// The plan this registry is laid out on
    #[must_use]
    pub const fn plan(&self) -> &'static SeatPlan {
        self.plan
    }

    /// Clear occupancy, assignments and reservations; reseed marketing seats
    pub fn reset(&mut self) {
        self.occupancy.clear();
        self.assignment.clear();
        self.reservations.clear();
        self.marketing = self.plan.marketing().iter().copied().collect();
    }

    /// Record `owner` as the reservation owner of `seat`, replacing any prior owner
    ///
    /// Returns the previous owner, if any.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::InvalidSeat`] if the seat is not in the plan
    /// - [`SeatingError::SeatUnavailable`] for marketing seats
    /// - [`SeatingError::AlreadyOccupied`] if somebody sits there
    pub fn reserve(
        &mut self,
        seat: SeatId,
        owner: ParticipantId,
    ) -> Result<Option<ParticipantId>, SeatingError> {
        self.ensure_bookable(seat)?;
        if self.occupancy.contains_key(&seat) {
            return Err(SeatingError::AlreadyOccupied(seat));
        }

        let previous = self.reservations.insert(seat, owner);
        self.debug_check();
        Ok(previous)
    }

    /// Remove the reservation on `seat`, returning its owner
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::NotReserved`] if the seat has no reservation.
    pub fn unreserve(&mut self, seat: SeatId) -> Result<ParticipantId, SeatingError> {
        self.reservations
            .remove(&seat)
            .ok_or(SeatingError::NotReserved(seat))
    }

    /// Seat `participant` on `seat`, vacating their previous seat in the same step
    ///
    /// Returns the vacated seat. Assigning a participant to the seat they
    /// already hold is a no-op.
    ///
    /// # Errors
    ///
    /// - [`SeatingError::InvalidSeat`] if the seat is not in the plan
    /// - [`SeatingError::SeatUnavailable`] for marketing seats
    /// - [`SeatingError::AlreadyOccupied`] if someone else sits there
    pub fn assign(
        &mut self,
        participant: ParticipantId,
        seat: SeatId,
    ) -> Result<Option<SeatId>, SeatingError> {
        self.ensure_bookable(seat)?;
        match self.occupancy.get(&seat) {
            Some(occupant) if *occupant == participant => return Ok(None),
            Some(_) => return Err(SeatingError::AlreadyOccupied(seat)),
            None => {},
        }

        let vacated = self.assignment.insert(participant, seat);
        if let Some(previous) = vacated {
            self.occupancy.remove(&previous);
        }
        self.occupancy.insert(seat, participant);

        self.debug_check();
        Ok(vacated)
    }

    /// Free the seat held by `participant`, returning it
    ///
    /// # Errors
    ///
    /// Returns [`SeatingError::NotPresent`] if the participant holds no seat.
    pub fn release(&mut self, participant: ParticipantId) -> Result<SeatId, SeatingError> {
        let seat = self
            .assignment
            .remove(&participant)
            .ok_or(SeatingError::NotPresent)?;
        self.occupancy.remove(&seat);

        self.debug_check();
        Ok(seat)
    }

    fn ensure_bookable(&self, seat: SeatId) -> Result<(), SeatingError> {
        if !self.plan.contains(seat) {
            return Err(SeatingError::InvalidSeat(seat.to_string()));
        }
        if self.marketing.contains(&seat) {
            return Err(SeatingError::SeatUnavailable(seat));
        }
        Ok(())
    }

    // ========== Queries ==========

    /// Display status of `seat`, `None` if it is not in the plan
    #[must_use]
    pub fn status_of(&self, seat: SeatId) -> Option<SeatStatus> {
        if !self.plan.contains(seat) {
            return None;
        }

        let status = if self.marketing.contains(&seat) {
            SeatStatus::Marketing
        } else if self.occupancy.contains_key(&seat) {
            SeatStatus::Occupied
        } else if self.reservations.contains_key(&seat) {
            SeatStatus::Reserved
        } else {
            SeatStatus::Free
        };
        Some(status)
    }

    /// Seats with status [`SeatStatus::Free`], in plan order
    #[must_use]
    pub fn free_seats(&self) -> Vec<SeatId> {
        self.plan
            .seats()
            .filter(|seat| self.status_of(*seat) == Some(SeatStatus::Free))
            .collect()
    }

    /// `(participant, seat)` pairs in plan order of the seat
    #[must_use]
    pub fn assignments_snapshot(&self) -> Vec<(ParticipantId, SeatId)> {
        self.plan
            .seats()
            .filter_map(|seat| self.occupancy.get(&seat).map(|participant| (*participant, seat)))
            .collect()
    }

    /// Current reservation owner of `seat`
    #[must_use]
    pub fn reservation_owner(&self, seat: SeatId) -> Option<ParticipantId> {
        self.reservations.get(&seat).copied()
    }

    /// Participant seated on `seat`
    #[must_use]
    pub fn occupant_of(&self, seat: SeatId) -> Option<ParticipantId> {
        self.occupancy.get(&seat).copied()
    }

    /// Seat held by `participant`
    #[must_use]
    pub fn seat_of(&self, participant: ParticipantId) -> Option<SeatId> {
        self.assignment.get(&participant).copied()
    }

    /// Whether `seat` is a marketing seat
    #[must_use]
    pub fn is_marketing(&self, seat: SeatId) -> bool {
        self.marketing.contains(&seat)
    }

    /// Number of seated participants
    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.assignment.len()
    }

    /// Number of reserved seats
    #[must_use]
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Verify the registry invariants
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.occupancy.len() != self.assignment.len() {
            return Err(format!(
                "occupancy has {} entries but assignment has {}",
                self.occupancy.len(),
                self.assignment.len()
            ));
        }

        for (seat, participant) in &self.occupancy {
            if self.assignment.get(participant) != Some(seat) {
                return Err(format!(
                    "seat {seat} is occupied by {participant}, who is assigned {:?}",
                    self.assignment.get(participant)
                ));
            }
        }

        for seat in &self.marketing {
            if self.occupancy.contains_key(seat) || self.reservations.contains_key(seat) {
                return Err(format!("marketing seat {seat} is occupied or reserved"));
            }
        }

        Ok(())
    }

    fn debug_check(&self) {
        debug_assert!(
            self.check_invariants().is_ok(),
            "{:?}",
            self.check_invariants()
        );
    }
}

impl Default for SeatRegistry {
    fn default() -> Self {
        Self::new()
    }
}
