//! Validates inbound request envelopes, drives the Model Builder and Solver
//! Driver, and packages the result envelope.

use std::time::Instant;

use shiftsolve_core::{ProcessingError, ResultEnvelope, ScheduleRequest};
use shiftsolve_solver::{solve, SolveOutcome, SolverConfig};

/// Parses, validates, solves and packages a single request payload.
///
/// Never returns an `Err`: every failure mode is folded into an error
/// [`ResultEnvelope`], per the propagation policy that per-request errors
/// never escape the processing path.
pub fn process_request(payload: &str) -> ResultEnvelope {
    let request = match parse_request(payload) {
        Ok(request) => request,
        Err((request_id, error)) => {
            tracing::warn!(request_id = request_id.as_deref(), %error, "request envelope failed to parse");
            return ResultEnvelope::error(request_id, &error);
        }
    };

    let request_id = request.request_id.clone();

    if let Err(error) = validate_request(&request) {
        tracing::warn!(request_id = %request_id, %error, "request failed validation");
        return ResultEnvelope::error(Some(request_id), &error);
    }

    let model = match shiftsolve_solver::build_model(&request) {
        Ok(model) => model,
        Err(error) => {
            tracing::warn!(request_id = %request_id, %error, "model build rejected request");
            return ResultEnvelope::error(Some(request_id), &error);
        }
    };

    let start = Instant::now();
    let outcome = solve(model, &SolverConfig::default());
    let solve_time = start.elapsed().as_secs_f64();

    match outcome {
        SolveOutcome::Success { assignments, .. } => {
            tracing::info!(
                request_id = %request_id,
                solve_time,
                num_assignments = assignments.len(),
                "request solved"
            );
            ResultEnvelope::success(Some(request_id), assignments, solve_time)
        }
        SolveOutcome::Infeasible => {
            let error = ProcessingError::Infeasible(
                "no assignment satisfies the hard constraints".to_string(),
            );
            tracing::warn!(request_id = %request_id, %error, "solve infeasible");
            ResultEnvelope::error(Some(request_id), &error)
        }
        SolveOutcome::Timeout => {
            let error = ProcessingError::Timeout(
                "solver time budget expired without a feasible solution".to_string(),
            );
            tracing::warn!(request_id = %request_id, %error, "solve timed out");
            ResultEnvelope::error(Some(request_id), &error)
        }
    }
}

/// Parses the payload into a request envelope, or a best-effort
/// `(request_id, error)` pair when parsing fails outright.
fn parse_request(payload: &str) -> Result<ScheduleRequest, (Option<String>, ProcessingError)> {
    match serde_json::from_str::<ScheduleRequest>(payload) {
        Ok(request) => Ok(request),
        Err(err) => {
            let best_effort_id = serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|v| v.get("request_id").and_then(|id| id.as_str().map(str::to_string)));
            Err((best_effort_id, ProcessingError::Fatal(err.to_string())))
        }
    }
}

/// Checks the structural and range invariants §4.3 requires before a model
/// is built: non-empty sets, referenced ids present, positive durations and
/// hour caps, and weights within their documented ranges.
fn validate_request(request: &ScheduleRequest) -> Result<(), ProcessingError> {
    if request.doctors.is_empty() {
        return Err(ProcessingError::Validation("doctors must be non-empty".to_string()));
    }
    if request.days.is_empty() {
        return Err(ProcessingError::Validation("days must be non-empty".to_string()));
    }
    if request.shifts.is_empty() {
        return Err(ProcessingError::Validation("shifts must be non-empty".to_string()));
    }
    if request.requirements.is_empty() {
        return Err(ProcessingError::Validation(
            "requirements must be non-empty".to_string(),
        ));
    }

    let requirements = request.parsed_requirements()?;
    for day in &request.days {
        for shift in &request.shifts {
            let key = shiftsolve_core::DayShift::new(*day, shift.clone());
            if !requirements.contains_key(&key) {
                return Err(ProcessingError::Validation(format!(
                    "missing requirement for day {day}, shift {shift}"
                )));
            }
        }
    }

    let durations = request.parsed_shift_durations()?;
    for shift in &request.shifts {
        if !durations.contains_key(shift) {
            return Err(ProcessingError::Validation(format!(
                "missing shift_durations entry for shift {shift}"
            )));
        }
    }

    let hours_caps = request.parsed_max_weekly_hours()?;
    for staff in &request.doctors {
        if !hours_caps.contains_key(staff) {
            return Err(ProcessingError::Validation(format!(
                "missing max_weekly_hours entry for staff {staff}"
            )));
        }
    }

    if request.alpha < 1000 {
        return Err(ProcessingError::Validation(format!(
            "alpha must be >= 1000, got {}",
            request.alpha
        )));
    }
    if !(1..=10).contains(&request.beta) {
        return Err(ProcessingError::Validation(format!(
            "beta must be in [1,10], got {}",
            request.beta
        )));
    }
    if !(1..=5).contains(&request.gamma) {
        return Err(ProcessingError::Validation(format!(
            "gamma must be in [1,5], got {}",
            request.gamma
        )));
    }

    // parsed_availability / parsed_preferences validate key shape as a side effect.
    request.parsed_availability()?;
    request.parsed_preferences()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_payload() -> String {
        serde_json::json!({
            "request_id": "r1",
            "doctors": ["1"],
            "days": [0],
            "shifts": ["s1"],
            "requirements": {"0,s1": 1},
            "availability": {"1,0,s1": 1},
            "shift_durations": {"s1": 8},
            "max_weekly_hours": {"1": 40}
        })
        .to_string()
    }

    #[test]
    fn process_request_succeeds_for_valid_payload() {
        let result = process_request(&minimal_payload());
        match result {
            ResultEnvelope::Success {
                request_id,
                assignments,
                ..
            } => {
                assert_eq!(request_id.as_deref(), Some("r1"));
                assert_eq!(assignments.len(), 1);
            }
            ResultEnvelope::Error { error, .. } => panic!("expected success, got error: {error}"),
        }
    }

    #[test]
    fn process_request_reports_validation_error_on_missing_doctors() {
        let payload = serde_json::json!({
            "request_id": "r2",
            "doctors": [],
            "days": [0],
            "shifts": ["s1"],
            "requirements": {"0,s1": 1},
            "shift_durations": {"s1": 8},
            "max_weekly_hours": {}
        })
        .to_string();

        let result = process_request(&payload);
        match result {
            ResultEnvelope::Error { request_id, error } => {
                assert_eq!(request_id.as_deref(), Some("r2"));
                assert!(error.starts_with("validation_error"));
            }
            ResultEnvelope::Success { .. } => panic!("expected validation error"),
        }
    }

    #[test]
    fn process_request_preserves_request_id_even_on_parse_failure() {
        let payload = r#"{"request_id": "r3", "doctors": "not-a-list"}"#;
        let result = process_request(payload);
        match result {
            ResultEnvelope::Error { request_id, error } => {
                assert_eq!(request_id.as_deref(), Some("r3"));
                assert!(error.starts_with("fatal"));
            }
            ResultEnvelope::Success { .. } => panic!("expected fatal error for malformed JSON"),
        }
    }
}
