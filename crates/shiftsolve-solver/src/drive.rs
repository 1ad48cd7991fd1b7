//! Invokes the constraint solver against a built [`ScheduleModel`] under a
//! time budget, classifies the termination status, and extracts the
//! resulting assignments in stable lexicographic order.

use std::time::Duration;

use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution};
use pumpkin_solver::termination::TimeBudget;

use shiftsolve_core::AssignmentOut;

use crate::model::ScheduleModel;

/// Tuning knobs for a single solve invocation.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// Wall-clock budget for the whole solve.
    pub time_limit: Duration,
    /// Requested parallel search workers.
    ///
    /// Not currently threaded through to the solver: the observed
    /// `pumpkin_solver::Solver` construction path (`Solver::default()`) does
    /// not expose a worker-count knob. Retained so callers can express the
    /// spec's default of 8 and so a future solver version that adds one has
    /// a place to plug into.
    pub num_search_workers: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            time_limit: Duration::from_secs(60),
            num_search_workers: 8,
        }
    }
}

/// The classified result of a solve attempt.
#[derive(Debug, Clone)]
pub enum SolveOutcome {
    /// `OPTIMAL` or `FEASIBLE`: a usable assignment was found.
    Success {
        assignments: Vec<AssignmentOut>,
        objective_value: i64,
        optimal: bool,
    },
    /// `UNSATISFIABLE`: no assignment satisfies the hard constraints.
    Infeasible,
    /// `UNKNOWN`: the time budget expired with no feasible solution.
    Timeout,
}

fn noop_callback<B>(_: &pumpkin_solver::Solver, _: pumpkin_solver::results::SolutionReference, _: &B) {}

/// Runs the solver to completion (or until `config.time_limit` expires) and
/// extracts the assignment list in `(staff, day, shift)` lexicographic order.
pub fn solve(model: ScheduleModel, config: &SolverConfig) -> SolveOutcome {
    let ScheduleModel {
        mut solver,
        doctors,
        days,
        shifts,
        x,
        objective,
        ..
    } = model;

    let mut brancher = solver.default_brancher();
    let mut termination = TimeBudget::starting_now(config.time_limit);

    let result = solver.optimise(
        &mut brancher,
        &mut termination,
        LinearSatUnsat::new(OptimisationDirection::Minimise, objective, noop_callback),
    );

    let num_days = days.len();
    let num_shifts = shifts.len();

    match result {
        OptimisationResult::Optimal(solution) => {
            let assignments = extract_assignments(&doctors, &days, &shifts, &x, num_days, num_shifts, |v| {
                solution.get_integer_value(v)
            });
            let objective_value = i64::from(solution.get_integer_value(objective));
            SolveOutcome::Success {
                assignments,
                objective_value,
                optimal: true,
            }
        }
        OptimisationResult::Satisfiable(solution) => {
            let assignments = extract_assignments(&doctors, &days, &shifts, &x, num_days, num_shifts, |v| {
                solution.get_integer_value(v)
            });
            let objective_value = i64::from(solution.get_integer_value(objective));
            SolveOutcome::Success {
                assignments,
                objective_value,
                optimal: false,
            }
        }
        OptimisationResult::Unsatisfiable => SolveOutcome::Infeasible,
        OptimisationResult::Unknown => SolveOutcome::Timeout,
    }
}

fn extract_assignments(
    doctors: &[String],
    days: &[u32],
    shifts: &[String],
    x: &[pumpkin_solver::variables::DomainId],
    num_days: usize,
    num_shifts: usize,
    get: impl Fn(pumpkin_solver::variables::DomainId) -> i32,
) -> Vec<AssignmentOut> {
    let mut assignments = Vec::new();
    for (i, staff) in doctors.iter().enumerate() {
        for (j, &day) in days.iter().enumerate() {
            for (k, shift) in shifts.iter().enumerate() {
                let var = x[i * num_days * num_shifts + j * num_shifts + k];
                if get(var) == 1 {
                    assignments.push(AssignmentOut {
                        staff_id: staff.clone(),
                        day,
                        shift: shift.clone(),
                    });
                }
            }
        }
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{build_model, ScheduleModel};
    use std::collections::HashMap;

    fn single_staff_available_request() -> shiftsolve_core::ScheduleRequest {
        let mut requirements = HashMap::new();
        requirements.insert("0,s1".to_string(), 1);
        let mut availability = HashMap::new();
        availability.insert("1,0,s1".to_string(), 1);
        let mut shift_durations = HashMap::new();
        shift_durations.insert("s1".to_string(), 8);
        let mut max_weekly_hours = HashMap::new();
        max_weekly_hours.insert("1".to_string(), 40);

        shiftsolve_core::ScheduleRequest {
            request_id: "r1".to_string(),
            doctors: vec!["1".to_string()],
            days: vec![0],
            shifts: vec!["s1".to_string()],
            requirements,
            availability,
            shift_durations,
            max_weekly_hours,
            min_rest_hours: 11,
            preferences: HashMap::new(),
            alpha: 1000,
            beta: 5,
            gamma: 1,
            shift_windows: HashMap::new(),
        }
    }

    #[test]
    fn single_staff_available_is_assigned() {
        let request = single_staff_available_request();
        let model = build_model(&request).expect("model builds");
        let outcome = solve(model, &SolverConfig::default());
        match outcome {
            SolveOutcome::Success { assignments, .. } => {
                assert_eq!(assignments.len(), 1);
                assert_eq!(assignments[0].staff_id, "1");
                assert_eq!(assignments[0].day, 0);
                assert_eq!(assignments[0].shift, "s1");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn single_staff_unavailable_leaves_slack() {
        let mut request = single_staff_available_request();
        request.availability.insert("1,0,s1".to_string(), 0);
        let model = build_model(&request).expect("model builds");
        let outcome = solve(model, &SolverConfig::default());
        match outcome {
            SolveOutcome::Success { assignments, .. } => {
                assert!(assignments.is_empty());
            }
            other => panic!("expected soft success with slack, got {other:?}"),
        }
    }

    /// Recomputes `alpha * sum(u) + beta * sum(d) - gamma * sum(p * x)` from
    /// a solved model's own component values, via the same getter-closure
    /// abstraction `extract_assignments` uses to stay agnostic over which
    /// `OptimisationResult` variant produced the solution.
    fn recompute_objective(
        request: &shiftsolve_core::ScheduleRequest,
        u: &[pumpkin_solver::variables::DomainId],
        d: &[pumpkin_solver::variables::DomainId],
        x: &[pumpkin_solver::variables::DomainId],
        get: impl Fn(pumpkin_solver::variables::DomainId) -> i32,
    ) -> i64 {
        let u_sum: i64 = u.iter().map(|&v| i64::from(get(v))).sum();
        let d_sum: i64 = d.iter().map(|&v| i64::from(get(v))).sum();

        let preferences = request.parsed_preferences().expect("preferences parse");
        let num_days = request.days.len();
        let num_shifts = request.shifts.len();
        let mut preference_term = 0i64;
        for (staff_pos, staff) in request.doctors.iter().enumerate() {
            for (day_pos, day) in request.days.iter().enumerate() {
                for (shift_pos, shift) in request.shifts.iter().enumerate() {
                    let weight = preferences
                        .get(&shiftsolve_core::Cell::new(staff.clone(), *day, shift.clone()))
                        .copied()
                        .unwrap_or(0);
                    if weight != 0 {
                        let var = x[staff_pos * num_days * num_shifts + day_pos * num_shifts + shift_pos];
                        preference_term += weight * i64::from(get(var));
                    }
                }
            }
        }

        request.alpha * u_sum + request.beta * d_sum - request.gamma * preference_term
    }

    #[test]
    fn objective_value_matches_recomputed_sum_from_components() {
        let mut requirements = HashMap::new();
        requirements.insert("0,s1".to_string(), 1);
        requirements.insert("0,s2".to_string(), 1);
        let mut availability = HashMap::new();
        availability.insert("1,0,s1".to_string(), 1);
        let mut shift_durations = HashMap::new();
        shift_durations.insert("s1".to_string(), 8);
        shift_durations.insert("s2".to_string(), 8);
        let mut max_weekly_hours = HashMap::new();
        max_weekly_hours.insert("1".to_string(), 40);
        max_weekly_hours.insert("2".to_string(), 40);
        let mut preferences = HashMap::new();
        preferences.insert("1,0,s1".to_string(), 4);

        // Staff "1" can only cover s1; staff "2" is unavailable everywhere,
        // so s2's requirement goes unmet (u > 0) while s1 is covered,
        // leaving staff "1" and "2" at uneven hours (d > 0) and staff "1"'s
        // preference for s1 active (p * x > 0) -- every objective term is
        // exercised at once.
        let request = shiftsolve_core::ScheduleRequest {
            request_id: "r-obj".to_string(),
            doctors: vec!["1".to_string(), "2".to_string()],
            days: vec![0],
            shifts: vec!["s1".to_string(), "s2".to_string()],
            requirements,
            availability,
            shift_durations,
            max_weekly_hours,
            min_rest_hours: 11,
            preferences,
            alpha: 1000,
            beta: 5,
            gamma: 1,
            shift_windows: HashMap::new(),
        };

        let model = build_model(&request).expect("model builds");
        let ScheduleModel {
            mut solver,
            u,
            d,
            x,
            objective,
            ..
        } = model;

        let mut brancher = solver.default_brancher();
        let mut termination = TimeBudget::starting_now(SolverConfig::default().time_limit);
        let result = solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, objective, noop_callback),
        );

        let (objective_value, recomputed) = match result {
            OptimisationResult::Optimal(solution) => (
                i64::from(solution.get_integer_value(objective)),
                recompute_objective(&request, &u, &d, &x, |v| solution.get_integer_value(v)),
            ),
            OptimisationResult::Satisfiable(solution) => (
                i64::from(solution.get_integer_value(objective)),
                recompute_objective(&request, &u, &d, &x, |v| solution.get_integer_value(v)),
            ),
            other => panic!("expected a feasible solution, got {other:?}"),
        };

        assert_eq!(objective_value, recomputed);
    }
}
