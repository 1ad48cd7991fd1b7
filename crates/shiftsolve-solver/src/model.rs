//! Translates a validated schedule request into decision variables and
//! hard constraints over a [`pumpkin_solver::Solver`] instance.
//!
//! Variables are stored in dense arrays indexed by canonicalized integer
//! positions (staff/day/shift index), per the source's preference for cache
//! locality and deterministic iteration over sparse dict-keyed tensors.

use std::collections::HashMap;

use pumpkin_solver::constraints as cp;
use pumpkin_solver::variables::{DomainId, TransformableVariable};
use pumpkin_solver::Solver;

use shiftsolve_core::{Day, ProcessingError, ScheduleRequest, ShiftLabel, ShiftWindow, StaffId};

/// A fully built constraint model, ready to hand to [`crate::drive::solve`].
pub struct ScheduleModel {
    pub solver: Solver,

    pub doctors: Vec<StaffId>,
    pub days: Vec<Day>,
    pub shifts: Vec<ShiftLabel>,

    /// `x[i,j,k]`, flattened as `i * num_days * num_shifts + j * num_shifts + k`.
    pub x: Vec<DomainId>,
    /// `u[j,k]`, flattened as `j * num_shifts + k`.
    pub u: Vec<DomainId>,
    /// `h[i]`.
    pub h: Vec<DomainId>,
    /// `d[i]`.
    pub d: Vec<DomainId>,
    /// The scalar objective variable, to be minimized.
    pub objective: DomainId,

    /// Per-shift duration, indexed by shift position (matches `shifts`).
    pub durations: Vec<i64>,
    /// Per-(day,shift) requirement, indexed as `j * num_shifts + k`.
    pub requirements: Vec<i64>,
}

impl ScheduleModel {
    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    pub fn num_shifts(&self) -> usize {
        self.shifts.len()
    }

    pub fn x_index(&self, i: usize, j: usize, k: usize) -> usize {
        i * self.num_days() * self.num_shifts() + j * self.num_shifts() + k
    }

    pub fn u_index(&self, j: usize, k: usize) -> usize {
        j * self.num_shifts() + k
    }
}

fn index_of<T: Eq + std::hash::Hash + Clone>(items: &[T]) -> HashMap<T, usize> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| (item.clone(), idx))
        .collect()
}

/// Builds the constraint model for a single schedule request.
///
/// Assumes `request` has already passed [`crate::drive`]-independent
/// validation (non-empty sets, positive durations/caps, referenced ids
/// present); this function still rejects an empty `doctors` set, per the
/// Model Builder's own edge-case policy.
pub fn build_model(request: &ScheduleRequest) -> Result<ScheduleModel, ProcessingError> {
    if request.doctors.is_empty() {
        return Err(ProcessingError::Validation(
            "doctors must be non-empty".to_string(),
        ));
    }

    let day_idx = index_of(&request.days);
    let shift_idx = index_of(&request.shifts);

    let num_staff = request.doctors.len();
    let num_days = request.days.len();
    let num_shifts = request.shifts.len();

    let requirements_map = request.parsed_requirements()?;
    let availability_map = request.parsed_availability()?;
    let preferences_map = request.parsed_preferences()?;
    let duration_map = request.parsed_shift_durations()?;
    let hours_cap_map = request.parsed_max_weekly_hours()?;

    let mut durations = vec![0i64; num_shifts];
    for (shift, &k_idx) in &shift_idx {
        let duration = *duration_map
            .get(shift)
            .ok_or_else(|| ProcessingError::Validation(format!("missing duration for shift {shift}")))?;
        durations[k_idx] = duration;
    }

    let mut requirements = vec![0i64; num_days * num_shifts];
    for (day, &j_idx) in &day_idx {
        for (shift, &k_idx) in &shift_idx {
            let req = requirements_map
                .get(&shiftsolve_core::DayShift::new(*day, shift.clone()))
                .copied()
                .unwrap_or(0);
            requirements[j_idx * num_shifts + k_idx] = req;
        }
    }

    let h_sum: i64 = durations_for_requirements(&requirements, &durations, num_shifts)
        .iter()
        .sum();
    let h_avg = h_sum / num_staff as i64;

    let mut solver = Solver::default();
    let constraint_tag = solver.new_constraint_tag();

    // x[i,j,k]: fixed to 0 when unavailable, enforcing availability directly
    // through the variable's domain rather than a separate equality constraint.
    let mut x = Vec::with_capacity(num_staff * num_days * num_shifts);
    for staff in &request.doctors {
        for day in &request.days {
            for shift in &request.shifts {
                let available = availability_map
                    .get(&shiftsolve_core::Cell::new(staff.clone(), *day, shift.clone()))
                    .copied()
                    .unwrap_or(0);
                let upper = if available == 0 { 0 } else { 1 };
                x.push(solver.new_bounded_integer(0, upper));
            }
        }
    }

    let mut u = Vec::with_capacity(num_days * num_shifts);
    for j in 0..num_days {
        for k in 0..num_shifts {
            let req = requirements[j * num_shifts + k];
            u.push(solver.new_bounded_integer(0, req.max(0) as i32));
        }
    }

    let mut h = Vec::with_capacity(num_staff);
    for staff in &request.doctors {
        let cap = *hours_cap_map
            .get(staff)
            .ok_or_else(|| ProcessingError::Validation(format!("missing max_weekly_hours for {staff}")))?;
        h.push(solver.new_bounded_integer(0, cap as i32));
    }

    let d: Vec<DomainId> = (0..num_staff)
        .map(|_| solver.new_bounded_integer(0, h_avg.max(0) as i32))
        .collect();

    // Constraint 1: coverage with slack.
    for j in 0..num_days {
        for k in 0..num_shifts {
            let mut vars: Vec<_> = (0..num_staff)
                .map(|i| x[i * num_days * num_shifts + j * num_shifts + k].scaled(1))
                .collect();
            vars.push(u[j * num_shifts + k].scaled(1));
            let req = requirements[j * num_shifts + k];
            let _ = solver
                .add_constraint(cp::greater_than_or_equals(vars, req as i32, constraint_tag))
                .post();
        }
    }

    // Constraint 3: hours, expressed as two inequalities enforcing equality.
    for (i, _staff) in request.doctors.iter().enumerate() {
        let mut ge_vars = vec![h[i].scaled(1)];
        let mut le_vars = vec![h[i].scaled(-1)];
        for j in 0..num_days {
            for k in 0..num_shifts {
                let var = x[i * num_days * num_shifts + j * num_shifts + k];
                let duration = durations[k] as i32;
                ge_vars.push(var.scaled(-duration));
                le_vars.push(var.scaled(duration));
            }
        }
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(ge_vars, 0, constraint_tag))
            .post();
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(le_vars, 0, constraint_tag))
            .post();
    }

    // Constraint 4: rest. Prefer the generalized wall-clock gap check when
    // shift_windows are supplied; otherwise fall back to the source's
    // evening/morning-next-day default.
    if request.shift_windows.is_empty() {
        add_default_rest_constraints(&mut solver, &x, &shift_idx, num_days, num_shifts, num_staff, constraint_tag);
    } else {
        add_generalized_rest_constraints(
            &mut solver,
            &x,
            &request.shift_windows,
            &request.shifts,
            &request.days,
            &day_idx,
            &shift_idx,
            request.min_rest_hours,
            num_days,
            num_shifts,
            num_staff,
            constraint_tag,
        );
    }

    // Constraint 5: deviation linearization.
    for i in 0..num_staff {
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(
                vec![d[i].scaled(1), h[i].scaled(-1)],
                -(h_avg as i32),
                constraint_tag,
            ))
            .post();
        let _ = solver
            .add_constraint(cp::greater_than_or_equals(
                vec![d[i].scaled(1), h[i].scaled(1)],
                h_avg as i32,
                constraint_tag,
            ))
            .post();
    }

    // Objective: alpha * sum(u) + beta * sum(d) - gamma * sum(p * x), realized
    // through an auxiliary variable constrained to equal the expression, then
    // minimized (mirrors the makespan-variable pattern for linear objectives).
    let alpha = request.alpha;
    let beta = request.beta;
    let gamma = request.gamma;

    let u_sum_max: i64 = requirements.iter().sum();
    let d_sum_max: i64 = h_avg * num_staff as i64;
    let p_sum_max: i64 = preferences_map.values().copied().sum();

    let upper_bound = alpha * u_sum_max + beta * d_sum_max;
    let lower_bound = -(gamma * p_sum_max);

    let objective = solver.new_bounded_integer(
        lower_bound.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        upper_bound.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
    );

    let mut obj_terms = Vec::new();
    for var in &u {
        obj_terms.push(var.scaled(alpha as i32));
    }
    for var in &d {
        obj_terms.push(var.scaled(beta as i32));
    }
    for (staff_pos, staff) in request.doctors.iter().enumerate() {
        for (day_pos, day) in request.days.iter().enumerate() {
            for (shift_pos, shift) in request.shifts.iter().enumerate() {
                let weight = preferences_map
                    .get(&shiftsolve_core::Cell::new(staff.clone(), *day, shift.clone()))
                    .copied()
                    .unwrap_or(0);
                if weight != 0 {
                    let var = x[staff_pos * num_days * num_shifts + day_pos * num_shifts + shift_pos];
                    obj_terms.push(var.scaled(-(gamma as i32 * weight as i32)));
                }
            }
        }
    }

    let mut ge_obj = vec![objective.scaled(1)];
    let mut le_obj = vec![objective.scaled(-1)];
    for term in &obj_terms {
        ge_obj.push(term.scaled(-1));
        le_obj.push(term.scaled(1));
    }
    let _ = solver
        .add_constraint(cp::greater_than_or_equals(ge_obj, 0, constraint_tag))
        .post();
    let _ = solver
        .add_constraint(cp::greater_than_or_equals(le_obj, 0, constraint_tag))
        .post();

    Ok(ScheduleModel {
        solver,
        doctors: request.doctors.clone(),
        days: request.days.clone(),
        shifts: request.shifts.clone(),
        x,
        u,
        h,
        d,
        objective,
        durations,
        requirements,
    })
}

fn durations_for_requirements(requirements: &[i64], durations: &[i64], num_shifts: usize) -> Vec<i64> {
    requirements
        .iter()
        .enumerate()
        .map(|(flat_idx, &req)| req * durations[flat_idx % num_shifts])
        .collect()
}

fn add_default_rest_constraints(
    solver: &mut Solver,
    x: &[DomainId],
    shift_idx: &HashMap<ShiftLabel, usize>,
    num_days: usize,
    num_shifts: usize,
    num_staff: usize,
    constraint_tag: pumpkin_solver::ConstraintTag,
) {
    let (Some(&evening), Some(&morning)) = (shift_idx.get("evening"), shift_idx.get("morning")) else {
        return;
    };
    for j in 0..num_days.saturating_sub(1) {
        for i in 0..num_staff {
            let evening_var = x[i * num_days * num_shifts + j * num_shifts + evening];
            let morning_var = x[i * num_days * num_shifts + (j + 1) * num_shifts + morning];
            let _ = solver
                .add_constraint(cp::greater_than_or_equals(
                    vec![evening_var.scaled(-1), morning_var.scaled(-1)],
                    -1,
                    constraint_tag,
                ))
                .post();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn add_generalized_rest_constraints(
    solver: &mut Solver,
    x: &[DomainId],
    shift_windows: &HashMap<ShiftLabel, ShiftWindow>,
    shifts: &[ShiftLabel],
    days: &[Day],
    day_idx: &HashMap<Day, usize>,
    shift_idx: &HashMap<ShiftLabel, usize>,
    min_rest_hours: u32,
    num_days: usize,
    num_shifts: usize,
    num_staff: usize,
    constraint_tag: pumpkin_solver::ConstraintTag,
) {
    let mut instances = Vec::with_capacity(days.len() * shifts.len());
    for &day in days {
        for shift in shifts {
            if let Some(window) = shift_windows.get(shift) {
                instances.push((day, shift.clone(), *window));
            }
        }
    }

    for a in 0..instances.len() {
        for b in (a + 1)..instances.len() {
            let (day_a, shift_a, window_a) = &instances[a];
            let (day_b, shift_b, window_b) = &instances[b];
            if day_a == day_b && shift_a == shift_b {
                continue;
            }

            let gap = window_a
                .gap_hours(*day_a, window_b, *day_b)
                .unwrap_or(0);
            if gap >= i64::from(min_rest_hours) {
                continue;
            }

            let j1 = day_idx[day_a];
            let k1 = shift_idx[shift_a];
            let j2 = day_idx[day_b];
            let k2 = shift_idx[shift_b];

            for i in 0..num_staff {
                let var_a = x[i * num_days * num_shifts + j1 * num_shifts + k1];
                let var_b = x[i * num_days * num_shifts + j2 * num_shifts + k2];
                let _ = solver
                    .add_constraint(cp::greater_than_or_equals(
                        vec![var_a.scaled(-1), var_b.scaled(-1)],
                        -1,
                        constraint_tag,
                    ))
                    .post();
            }
        }
    }
}
