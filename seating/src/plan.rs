//! The fixed office seat plan.

use crate::types::SeatId;
use std::sync::LazyLock;

/// Rows of four seats, window side first: `A1 B1 C1 D1 / A2 B2 C2 D2 / A3 B3 C3 D3`.
///
/// Seats `A2` and `A3` are reserved for marketing and are reseeded as
/// unbookable on every reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatPlan {
    rows: Vec<Vec<SeatId>>,
    marketing: Vec<SeatId>,
}

static OFFICE: LazyLock<SeatPlan> = LazyLock::new(|| {
    let rows = (b'1'..=b'3')
        .map(|digit| {
            (b'A'..=b'D')
                .map(|letter| SeatId::from_parts(letter, digit))
                .collect()
        })
        .collect();

    SeatPlan {
        rows,
        marketing: vec![SeatId::from_parts(b'A', b'2'), SeatId::from_parts(b'A', b'3')],
    }
});

impl SeatPlan {
    /// The office plan shared by every channel
    #[must_use]
    pub fn office() -> &'static Self {
        &OFFICE
    }

    /// Seat rows in display order
    #[must_use]
    pub fn rows(&self) -> &[Vec<SeatId>] {
        &self.rows
    }

    /// Every seat, row by row
    pub fn seats(&self) -> impl Iterator<Item = SeatId> + '_ {
        self.rows.iter().flatten().copied()
    }

    /// Seats seeded as marketing on reset
    #[must_use]
    pub fn marketing(&self) -> &[SeatId] {
        &self.marketing
    }

    /// Whether `seat` exists in this plan
    #[must_use]
    pub fn contains(&self, seat: SeatId) -> bool {
        self.position(seat).is_some()
    }

    /// Index of `seat` in plan order
    #[must_use]
    pub fn position(&self, seat: SeatId) -> Option<usize> {
        self.seats().position(|candidate| candidate == seat)
    }

    /// Number of seats
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// True for a plan without seats
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
