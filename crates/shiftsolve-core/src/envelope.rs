//! Wire-format request and result envelopes.
//!
//! Composite map keys (`requirements`, `availability`, `shift_durations`,
//! `max_weekly_hours`, `preferences`) are comma-joined tuple-like strings,
//! e.g. `"0,morning"` for a `(day, shift)` key or `"1,0,morning"` for a
//! `(staff, day, shift)` key, mirroring the tuple-dict keys of the source
//! this envelope was distilled from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ProcessingError;
use crate::{Cell, Day, DayShift, ShiftLabel, ShiftWindow, StaffId};

fn default_min_rest_hours() -> u32 {
    11
}

fn default_alpha() -> i64 {
    1000
}

fn default_beta() -> i64 {
    5
}

fn default_gamma() -> i64 {
    1
}

/// The inbound JSON request envelope, as read from the `payload` field of a
/// stream entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleRequest {
    pub request_id: String,
    pub doctors: Vec<StaffId>,
    pub days: Vec<Day>,
    pub shifts: Vec<ShiftLabel>,

    /// Keyed by `"<day>,<shift>"`.
    pub requirements: HashMap<String, i64>,
    /// Keyed by `"<staff>,<day>,<shift>"`. Missing entries mean unavailable.
    #[serde(default)]
    pub availability: HashMap<String, i64>,
    /// Keyed by `"<shift>"`.
    pub shift_durations: HashMap<String, i64>,
    /// Keyed by `"<staff>"`.
    pub max_weekly_hours: HashMap<String, i64>,

    #[serde(default = "default_min_rest_hours")]
    pub min_rest_hours: u32,
    /// Keyed by `"<staff>,<day>,<shift>"`.
    #[serde(default)]
    pub preferences: HashMap<String, i64>,

    #[serde(default = "default_alpha")]
    pub alpha: i64,
    #[serde(default = "default_beta")]
    pub beta: i64,
    #[serde(default = "default_gamma")]
    pub gamma: i64,

    /// Optional wall-clock placement of each shift label, enabling a
    /// generalized rest check. Keyed by shift label. When absent, the rest
    /// constraint falls back to the evening/morning-next-day default rule.
    #[serde(default)]
    pub shift_windows: HashMap<ShiftLabel, ShiftWindow>,
}

impl ScheduleRequest {
    /// Parses `requirements` into a typed map, validating key shape and values.
    pub fn parsed_requirements(&self) -> Result<HashMap<DayShift, i64>, ProcessingError> {
        let mut out = HashMap::with_capacity(self.requirements.len());
        for (key, &value) in &self.requirements {
            let (day, shift) = split_two(key)
                .ok_or_else(|| ProcessingError::Validation(format!("malformed requirements key: {key}")))?;
            if value < 0 {
                return Err(ProcessingError::Validation(format!(
                    "negative requirement at {key}: {value}"
                )));
            }
            out.insert(DayShift::new(day, shift), value);
        }
        Ok(out)
    }

    /// Parses `availability` into a typed map. Absent cells mean unavailable
    /// and are left out of the map by the caller's lookup default of 0.
    pub fn parsed_availability(&self) -> Result<HashMap<Cell, i64>, ProcessingError> {
        let mut out = HashMap::with_capacity(self.availability.len());
        for (key, &value) in &self.availability {
            let (staff, day, shift) = split_three(key)
                .ok_or_else(|| ProcessingError::Validation(format!("malformed availability key: {key}")))?;
            out.insert(Cell::new(staff, day, shift), value);
        }
        Ok(out)
    }

    /// Parses `preferences` into a typed map.
    pub fn parsed_preferences(&self) -> Result<HashMap<Cell, i64>, ProcessingError> {
        let mut out = HashMap::with_capacity(self.preferences.len());
        for (key, &value) in &self.preferences {
            let (staff, day, shift) = split_three(key)
                .ok_or_else(|| ProcessingError::Validation(format!("malformed preferences key: {key}")))?;
            if value < 0 {
                return Err(ProcessingError::Validation(format!(
                    "negative preference at {key}: {value}"
                )));
            }
            out.insert(Cell::new(staff, day, shift), value);
        }
        Ok(out)
    }

    /// Parses `shift_durations` into a typed map.
    pub fn parsed_shift_durations(&self) -> Result<HashMap<ShiftLabel, i64>, ProcessingError> {
        let mut out = HashMap::with_capacity(self.shift_durations.len());
        for (key, &value) in &self.shift_durations {
            if value <= 0 {
                return Err(ProcessingError::Validation(format!(
                    "non-positive duration for shift {key}: {value}"
                )));
            }
            out.insert(key.clone(), value);
        }
        Ok(out)
    }

    /// Parses `max_weekly_hours` into a typed map.
    pub fn parsed_max_weekly_hours(&self) -> Result<HashMap<StaffId, i64>, ProcessingError> {
        let mut out = HashMap::with_capacity(self.max_weekly_hours.len());
        for (key, &value) in &self.max_weekly_hours {
            if value <= 0 {
                return Err(ProcessingError::Validation(format!(
                    "non-positive max_weekly_hours for staff {key}: {value}"
                )));
            }
            out.insert(key.clone(), value);
        }
        Ok(out)
    }
}

fn split_two(key: &str) -> Option<(Day, ShiftLabel)> {
    let mut parts = key.splitn(2, ',');
    let day = parts.next()?.trim().parse().ok()?;
    let shift = parts.next()?.trim().to_string();
    Some((day, shift))
}

fn split_three(key: &str) -> Option<(StaffId, Day, ShiftLabel)> {
    let mut parts = key.splitn(3, ',');
    let staff = parts.next()?.trim().to_string();
    let day = parts.next()?.trim().parse().ok()?;
    let shift = parts.next()?.trim().to_string();
    Some((staff, day, shift))
}

/// A single positive assignment in a success result envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentOut {
    pub staff_id: StaffId,
    pub day: Day,
    pub shift: ShiftLabel,
}

/// Metrics attached to a success result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
    pub solve_time: f64,
    pub num_assignments: usize,
}

/// The outbound JSON result envelope, published to the result stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status")]
pub enum ResultEnvelope {
    #[serde(rename = "success")]
    Success {
        request_id: Option<String>,
        assignments: Vec<AssignmentOut>,
        metrics: Metrics,
    },
    #[serde(rename = "error")]
    Error {
        request_id: Option<String>,
        error: String,
    },
}

impl ResultEnvelope {
    pub fn success(
        request_id: Option<String>,
        assignments: Vec<AssignmentOut>,
        solve_time: f64,
    ) -> Self {
        let num_assignments = assignments.len();
        ResultEnvelope::Success {
            request_id,
            assignments,
            metrics: Metrics {
                solve_time,
                num_assignments,
            },
        }
    }

    pub fn error(request_id: Option<String>, error: &ProcessingError) -> Self {
        ResultEnvelope::Error {
            request_id,
            error: error.to_string(),
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            ResultEnvelope::Success { request_id, .. } => request_id.as_deref(),
            ResultEnvelope::Error { request_id, .. } => request_id.as_deref(),
        }
    }
}
