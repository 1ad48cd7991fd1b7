//! Domain model, request/result envelopes and error taxonomy shared by the
//! `shiftsolve-solver` and `shiftsolve-worker` crates.
//!
//! This crate owns no solving logic; it defines the data that flows across
//! the stream → worker → processor → solver boundary and back.

mod envelope;
mod error;

pub use envelope::*;
pub use error::*;

/// A staff identifier as carried in request/result envelopes.
///
/// The source data uses small integers, but the wire format treats ids as
/// opaque strings so non-numeric identifiers are not precluded.
pub type StaffId = String;

/// A zero-based day index within the planning horizon (`0..D-1`).
pub type Day = u32;

/// A shift label, e.g. `"morning"`, `"evening"`, `"night"`.
pub type ShiftLabel = String;

/// A single `(staff, day, shift)` assignment cell.
///
/// Used both as the canonical key for sparse maps (`availability`,
/// `preferences`) and as the shape of a positive assignment in the result
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub staff: StaffId,
    pub day: Day,
    pub shift: ShiftLabel,
}

impl Cell {
    pub fn new(staff: impl Into<StaffId>, day: Day, shift: impl Into<ShiftLabel>) -> Self {
        Cell {
            staff: staff.into(),
            day,
            shift: shift.into(),
        }
    }
}

/// A `(day, shift)` pair: the key for `requirements` and `shift_durations`-derived lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayShift {
    pub day: Day,
    pub shift: ShiftLabel,
}

impl DayShift {
    pub fn new(day: Day, shift: impl Into<ShiftLabel>) -> Self {
        DayShift {
            day,
            shift: shift.into(),
        }
    }
}

/// A shift's wall-clock placement, used to generalize the rest constraint
/// beyond the evening/morning-next-day default (spec's second Open Question).
///
/// `start_hour` is an offset from the start of its day (`0..24`);
/// `duration_hours` may carry the shift past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct ShiftWindow {
    pub start_hour: u32,
    pub duration_hours: u32,
}

impl ShiftWindow {
    /// Absolute start offset (in hours) from day 0, given the shift's own day index.
    pub fn absolute_start(&self, day: Day) -> i64 {
        i64::from(day) * 24 + i64::from(self.start_hour)
    }

    /// Absolute end offset (in hours) from day 0.
    pub fn absolute_end(&self, day: Day) -> i64 {
        self.absolute_start(day) + i64::from(self.duration_hours)
    }

    /// Wall-clock gap in hours between this window ending and `other` starting,
    /// assuming `self` is placed on `self_day` and `other` on `other_day`.
    ///
    /// Returns `None` if the two windows overlap (gap is not meaningful).
    pub fn gap_hours(&self, self_day: Day, other: &ShiftWindow, other_day: Day) -> Option<i64> {
        let self_end = self.absolute_end(self_day);
        let other_start = other.absolute_start(other_day);
        let other_end = other.absolute_end(other_day);
        let self_start = self.absolute_start(self_day);

        if self_end <= other_start {
            Some(other_start - self_end)
        } else if other_end <= self_start {
            Some(self_start - other_end)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_hours_same_day_evening_to_next_morning() {
        let s1 = ShiftWindow {
            start_hour: 8,
            duration_hours: 8,
        };
        let s2 = ShiftWindow {
            start_hour: 20,
            duration_hours: 10,
        };
        assert_eq!(s1.gap_hours(0, &s2, 0), Some(4));
    }

    #[test]
    fn gap_hours_overlap_is_none() {
        let s1 = ShiftWindow {
            start_hour: 8,
            duration_hours: 8,
        };
        let s2 = ShiftWindow {
            start_hour: 10,
            duration_hours: 2,
        };
        assert_eq!(s1.gap_hours(0, &s2, 0), None);
    }
}
