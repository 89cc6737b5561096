//! Pure projection of registry state into what a chart shows.

use crate::pending::PendingConfirmationStore;
use crate::registry::SeatRegistry;
use crate::types::{ParticipantId, SeatId, SeatStatus};
use serde::{Deserialize, Serialize};

/// One seat as displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    /// Seat id
    pub seat: SeatId,
    /// Derived status
    pub status: SeatStatus,
    /// A booking request is waiting for the owner's answer
    pub awaiting_consent: bool,
}

impl SeatView {
    /// Whether a booking button should be offered (not marketing, not occupied)
    #[must_use]
    pub const fn is_bookable(&self) -> bool {
        matches!(self.status, SeatStatus::Free | SeatStatus::Reserved)
    }
}

/// Everything a renderer needs to draw a channel's chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartProjection {
    /// Seats grouped by plan row
    pub rows: Vec<Vec<SeatView>>,
    /// Seated participants, in plan order of their seats
    pub assignments: Vec<(ParticipantId, SeatId)>,
}

impl ChartProjection {
    /// Project `registry` and `pending` into a chart
    #[must_use]
    pub fn project(registry: &SeatRegistry, pending: &PendingConfirmationStore) -> Self {
        let rows = registry
            .plan()
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&seat| SeatView {
                        seat,
                        status: registry.status_of(seat).unwrap_or(SeatStatus::Free),
                        awaiting_consent: pending.any_for_seat(seat),
                    })
                    .collect()
            })
            .collect();

        Self {
            rows,
            assignments: registry.assignments_snapshot(),
        }
    }

    /// Seats in plan order
    pub fn seats(&self) -> impl Iterator<Item = &SeatView> {
        self.rows.iter().flatten()
    }

    /// Status of `seat`, if it is on the chart
    #[must_use]
    pub fn status(&self, seat: SeatId) -> Option<SeatStatus> {
        self.seats().find(|view| view.seat == seat).map(|view| view.status)
    }

    /// Number of people in the office
    #[must_use]
    pub fn occupant_count(&self) -> usize {
        self.assignments.len()
    }

    /// Seats offered for booking, in plan order
    #[must_use]
    pub fn bookable_seats(&self) -> Vec<SeatId> {
        self.seats()
            .filter(|view| view.is_bookable())
            .map(|view| view.seat)
            .collect()
    }

    /// Seats with at least one open confirmation
    #[must_use]
    pub fn awaiting_consent(&self) -> Vec<SeatId> {
        self.seats()
            .filter(|view| view.awaiting_consent)
            .map(|view| view.seat)
            .collect()
    }

    /// Offer a "leave" action while anybody is seated
    #[must_use]
    pub fn show_leave(&self) -> bool {
        !self.assignments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwarden_core::environment::Clock;
    use seatwarden_testing::test_clock;

    fn seat(id: &str) -> SeatId {
        SeatId::parse(id).unwrap()
    }

    #[test]
    fn empty_chart() {
        let chart = ChartProjection::project(&SeatRegistry::new(), &PendingConfirmationStore::new());

        assert_eq!(chart.rows.len(), 3);
        assert_eq!(chart.occupant_count(), 0);
        assert!(!chart.show_leave());
        assert_eq!(chart.status(seat("A2")), Some(SeatStatus::Marketing));
        assert_eq!(chart.bookable_seats().len(), 10);
    }

    #[test]
    fn chart_reflects_registry() {
        let mut registry = SeatRegistry::new();
        let mut pending = PendingConfirmationStore::new();
        let owner = ParticipantId::new(1);
        let guest = ParticipantId::new(2);

        registry.reserve(seat("B1"), owner).unwrap();
        registry.assign(guest, seat("C3")).unwrap();
        pending.open(seat("B1"), guest, owner, test_clock().now());

        let chart = ChartProjection::project(&registry, &pending);

        assert_eq!(chart.status(seat("B1")), Some(SeatStatus::Reserved));
        assert_eq!(chart.status(seat("C3")), Some(SeatStatus::Occupied));
        assert_eq!(chart.assignments, vec![(guest, seat("C3"))]);
        assert_eq!(chart.awaiting_consent(), vec![seat("B1")]);
        assert!(chart.bookable_seats().contains(&seat("B1")));
        assert!(!chart.bookable_seats().contains(&seat("C3")));
        assert!(chart.show_leave());
    }
}
