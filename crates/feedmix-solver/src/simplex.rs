use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::problem::{ConstraintOp, LpProblem, ProblemError};
use crate::solution::{Analysis, ConstraintViolation, ReducedCost, ShadowPrice, Solution, SolutionStatus};

/// Magnitudes below this are flushed to zero after every pivot
const ZERO_SNAP: f64 = 1e-12;

/// Two-phase simplex solver for linear programming problems.
///
/// Pivoting follows Bland's rule, so a solve never cycles and identical
/// problems always produce bit-identical results.
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per phase before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
    /// Alternative optimal bases inspected when looking for a sparser optimum
    max_alternate_bases: usize,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
            max_alternate_bases: 64,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Bound the search for a sparser optimum among tied vertices.
    /// Zero disables the search.
    pub fn with_max_alternate_bases(mut self, max: usize) -> Self {
        self.max_alternate_bases = max;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the LP problem, reporting malformed input as `SolutionStatus::Error`
    pub fn solve(&self, problem: &LpProblem) -> Solution {
        match self.try_solve(problem) {
            Ok(solution) => solution,
            Err(e) => {
                debug!(error = %e, "rejected malformed problem");
                Solution::error()
            }
        }
    }

    /// Solve the LP problem using the two-phase simplex method
    pub fn try_solve(&self, problem: &LpProblem) -> Result<Solution, ProblemError> {
        problem.validate()?;

        let solution = match self.solve_exact(problem) {
            Outcome::Optimal(tableau) => self.extract_solution(&tableau, problem),
            Outcome::Infeasible => self.solve_with_relaxation(problem),
            Outcome::Unbounded => Solution::unbounded(),
            Outcome::IterationLimit => Solution::iteration_limit(),
        };

        debug!(
            status = %solution.status,
            objective = solution.objective_value,
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            "solved"
        );
        Ok(solution)
    }

    /// Solve without infeasibility recovery
    fn solve_exact(&self, problem: &LpProblem) -> Outcome {
        let mut tableau = Tableau::new(problem);

        // Phase 1: Find initial basic feasible solution
        if tableau.n_artificial > 0 {
            let original_objective = tableau.data[tableau.obj_row()].clone();
            tableau.load_phase1_objective();

            match self.run(&mut tableau) {
                SimplexResult::Optimal => {}
                SimplexResult::IterationLimit => return Outcome::IterationLimit,
                // Phase 1 objective is bounded by zero
                SimplexResult::Unbounded => return Outcome::Infeasible,
            }
            if !self.artificials_cleared(&tableau) {
                trace!("phase 1 left artificial variables positive");
                return Outcome::Infeasible;
            }

            self.drive_out_artificials(&mut tableau);
            tableau.load_objective(original_objective);
        }

        // Phase 2: Optimize
        match self.run(&mut tableau) {
            SimplexResult::Optimal => Outcome::Optimal(self.sparsest_optimum(tableau)),
            SimplexResult::Unbounded => Outcome::Unbounded,
            SimplexResult::IterationLimit => Outcome::IterationLimit,
        }
    }

    /// When the original problem is infeasible, find the point that violates
    /// the inequality constraints the least, then the cheapest such point,
    /// and report which constraints it breaks.
    ///
    /// Every `<=`/`>=` row gets its own violation variable weighted by
    /// `1 / max(|rhs|, 1)` so that bounds on different scales compare fairly.
    /// Equality rows and variable bounds stay hard.
    fn solve_with_relaxation(&self, problem: &LpProblem) -> Solution {
        let n = problem.num_variables();

        let mut variables = problem.variables.clone();
        for c in &problem.constraints {
            if c.op != ConstraintOp::Eq {
                variables.push(format!("{}_violation", c.name));
            }
        }
        let total = variables.len();

        let mut relaxed = LpProblem::new(variables);
        relaxed.upper_bounds[..n].copy_from_slice(&problem.upper_bounds);

        let mut weights = vec![0.0; total];
        let mut elastic = n;
        for c in &problem.constraints {
            let mut coefficients = c.coefficients.clone();
            coefficients.resize(total, 0.0);
            let direction = match c.op {
                ConstraintOp::Ge => Some(1.0),
                ConstraintOp::Le => Some(-1.0),
                ConstraintOp::Eq => None,
            };
            if let Some(direction) = direction {
                coefficients[elastic] = direction;
                weights[elastic] = 1.0 / c.rhs.abs().max(1.0);
                elastic += 1;
            }
            relaxed.add_constraint(c.name.clone(), coefficients, c.op, c.rhs);
        }

        // Stage 1: least weighted violation
        relaxed.set_objective(weights.clone(), true);
        let Outcome::Optimal(least_violation) = self.solve_exact(&relaxed) else {
            debug!("relaxed problem has no solution either");
            return Solution::infeasible();
        };
        let least_values = least_violation.values();
        let violation_floor = relaxed.objective_value(&least_values);

        // Stage 2: cheapest point that keeps the violation at its floor.
        // Any slack on the floor row lets cheaper variables creep in at
        // noise level, so the exact floor is tried first.
        let mut objective = problem.objective.coefficients.clone();
        objective.resize(total, 0.0);
        relaxed.add_constraint("least_violation", weights, ConstraintOp::Le, violation_floor);
        relaxed.set_objective(objective, problem.objective.minimize);

        let stage2 = match self.solve_exact(&relaxed) {
            Outcome::Optimal(tableau) => Some(tableau),
            _ => {
                trace!("exact violation floor rejected, retrying with slack");
                if let Some(floor_row) = relaxed.constraints.last_mut() {
                    floor_row.rhs = violation_floor + self.tolerance * violation_floor.max(1.0);
                }
                match self.solve_exact(&relaxed) {
                    Outcome::Optimal(tableau) => Some(tableau),
                    _ => None,
                }
            }
        };
        let mut values = stage2.map_or(least_values, |tableau| tableau.values());
        values.truncate(n);
        for value in &mut values {
            *value = self.snap(*value);
        }

        let violations = self.find_violations(problem, &values);
        let objective_value = problem.objective_value(&values);

        if violations.is_empty() {
            // Phase 1 rejected a problem that is feasible within tolerance
            return Solution {
                status: SolutionStatus::Optimal,
                values,
                objective_value,
                analysis: Analysis::default(),
                violations,
            };
        }

        debug!(
            violated = violations.len(),
            weighted_violation = violation_floor,
            "returning minimal-violation point"
        );
        Solution::infeasible_with_relaxed(values, objective_value, violations)
    }

    /// Find which constraints are violated by a given solution
    fn find_violations(&self, problem: &LpProblem, values: &[f64]) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();

        for (index, c) in problem.constraints.iter().enumerate() {
            let lhs = c.activity(values);
            let tol = self.slack_tolerance(c.rhs);

            let violation = match c.op {
                ConstraintOp::Le if lhs > c.rhs + tol => {
                    let amt = lhs - c.rhs;
                    Some((amt, format!("{} exceeds maximum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Ge if lhs < c.rhs - tol => {
                    let amt = c.rhs - lhs;
                    Some((amt, format!("{} is below minimum of {:.2} by {:.2}", c.name, c.rhs, amt)))
                }
                ConstraintOp::Eq if (lhs - c.rhs).abs() > tol => Some((
                    (lhs - c.rhs).abs(),
                    format!("{} requires exactly {:.2} but got {:.2}", c.name, c.rhs, lhs),
                )),
                _ => None,
            };

            if let Some((violation_amount, description)) = violation {
                violations.push(ConstraintViolation {
                    constraint: c.name.clone(),
                    constraint_index: index,
                    required: c.rhs,
                    actual: lhs,
                    violation_amount,
                    description,
                });
            }
        }

        // Worst first, then in problem order
        violations.sort_by(|a, b| {
            b.violation_amount
                .total_cmp(&a.violation_amount)
                .then(a.constraint_index.cmp(&b.constraint_index))
        });

        violations
    }

    fn slack_tolerance(&self, rhs: f64) -> f64 {
        self.tolerance * rhs.abs().max(1.0)
    }

    fn artificials_cleared(&self, tableau: &Tableau) -> bool {
        let rhs_col = tableau.rhs_col();
        tableau
            .basic_vars
            .iter()
            .enumerate()
            .filter(|&(_, &basic)| basic >= tableau.art_start)
            .all(|(i, _)| tableau.data[i][rhs_col].abs() <= self.tolerance)
    }

    /// Pivot artificial variables still basic at zero level out of the basis.
    /// Rows where that is impossible are redundant and never change again.
    fn drive_out_artificials(&self, tableau: &mut Tableau) {
        let rhs_col = tableau.rhs_col();
        for row in 0..tableau.basic_vars.len() {
            if tableau.basic_vars[row] < tableau.art_start {
                continue;
            }
            let replacement = (0..tableau.art_start).find(|&col| {
                !tableau.is_basic(col) && tableau.data[row][col].abs() > self.tolerance
            });
            if let Some(col) = replacement {
                tableau.data[row][rhs_col] = 0.0;
                tableau.pivot(row, col);
            }
        }
    }

    fn run(&self, tableau: &mut Tableau) -> SimplexResult {
        for iteration in 0..self.max_iterations {
            let Some(pivot_col) = self.find_pivot_column(tableau) else {
                trace!(iteration, "simplex converged");
                return SimplexResult::Optimal;
            };
            let Some(pivot_row) = self.find_pivot_row(tableau, pivot_col) else {
                return SimplexResult::Unbounded;
            };
            trace!(iteration, pivot_row, pivot_col, "pivot");
            tableau.pivot(pivot_row, pivot_col);
        }
        SimplexResult::IterationLimit
    }

    /// Bland's rule: the lowest-index column that improves the objective.
    /// Artificial columns never enter.
    fn find_pivot_column(&self, tableau: &Tableau) -> Option<usize> {
        let obj_row = tableau.obj_row();
        (0..tableau.art_start)
            .find(|&j| tableau.data[obj_row][j] > self.tolerance && !tableau.is_basic(j))
    }

    /// Minimum ratio test, ties going to the row whose basic variable has the lowest index
    fn find_pivot_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let rhs_col = tableau.rhs_col();

        let mut best: Option<(usize, f64)> = None;
        for i in 0..tableau.basic_vars.len() {
            let val = tableau.data[i][col];
            if val <= self.tolerance {
                continue;
            }
            let ratio = tableau.data[i][rhs_col].max(0.0) / val;
            best = match best {
                None => Some((i, ratio)),
                Some((row, min_ratio)) => {
                    if ratio < min_ratio - self.tolerance {
                        Some((i, ratio))
                    } else if ratio <= min_ratio + self.tolerance
                        && tableau.basic_vars[i] < tableau.basic_vars[row]
                    {
                        Some((i, ratio))
                    } else {
                        Some((row, min_ratio))
                    }
                }
            };
        }

        best.map(|(row, _)| row)
    }

    /// Walk alternative optimal bases reachable through zero reduced-cost
    /// pivots and keep the one using the fewest structural variables
    /// (lowest variable indices on a tie).
    fn sparsest_optimum(&self, tableau: Tableau) -> Tableau {
        if self.max_alternate_bases == 0 {
            return tableau;
        }

        let obj_row = tableau.obj_row();
        let mut best_key = tableau.support_key(self.tolerance);
        let mut best = tableau.clone();
        let mut visited = BTreeSet::new();
        visited.insert(tableau.basis_key());
        let mut pending = vec![tableau];
        let mut explored = 0;

        while let Some(current) = pending.pop() {
            if explored >= self.max_alternate_bases {
                break;
            }
            explored += 1;

            for col in 0..current.art_start {
                if current.is_basic(col) || current.data[obj_row][col].abs() > self.tolerance {
                    continue;
                }
                let Some(row) = self.find_pivot_row(&current, col) else {
                    continue;
                };
                let mut next = current.clone();
                next.pivot(row, col);
                if !visited.insert(next.basis_key()) {
                    continue;
                }
                let key = next.support_key(self.tolerance);
                if key < best_key {
                    best_key = key;
                    best = next.clone();
                }
                pending.push(next);
            }
        }

        trace!(explored, support = best_key.0, "alternative optima inspected");
        best
    }

    fn extract_solution(&self, tableau: &Tableau, problem: &LpProblem) -> Solution {
        let mut values = tableau.values();
        values.truncate(problem.num_variables());

        let objective_value = problem.objective_value(&values);
        let analysis = self.analyze(tableau, problem, &values);

        Solution {
            status: SolutionStatus::Optimal,
            values,
            objective_value,
            analysis,
            violations: Vec::new(),
        }
    }

    fn analyze(&self, tableau: &Tableau, problem: &LpProblem, values: &[f64]) -> Analysis {
        let obj_row = tableau.obj_row();

        // Each row's dual comes from the reduced profit of its slack or artificial column
        let mut shadow_prices = Vec::new();
        for (i, constraint) in problem.constraints.iter().enumerate() {
            let mut dual = -tableau.data[obj_row][tableau.dual_cols[i]];
            if tableau.flipped[i] {
                dual = -dual;
            }
            let value = self.snap(if problem.objective.minimize { -dual } else { dual });
            let interpretation = if value == 0.0 {
                "Non-binding constraint".to_string()
            } else if value > 0.0 {
                format!("Increasing RHS by 1 unit would increase the objective by {:.4}", value)
            } else {
                format!("Increasing RHS by 1 unit would decrease the objective by {:.4}", -value)
            };
            shadow_prices.push(ShadowPrice {
                constraint: constraint.name.clone(),
                value,
                interpretation,
            });
        }

        let reduced_costs = problem
            .variables
            .iter()
            .enumerate()
            .map(|(j, name)| {
                let is_basic = tableau.is_basic(j);
                let reduced_cost = if is_basic {
                    0.0
                } else {
                    self.snap(-tableau.data[obj_row][j])
                };
                ReducedCost {
                    variable: name.clone(),
                    value: values[j],
                    reduced_cost,
                    is_basic,
                }
            })
            .collect();

        let binding_constraints = problem
            .constraints
            .iter()
            .filter(|c| c.op != ConstraintOp::Eq)
            .filter(|c| (c.activity(values) - c.rhs).abs() <= self.slack_tolerance(c.rhs))
            .map(|c| c.name.clone())
            .collect();

        Analysis {
            shadow_prices,
            reduced_costs,
            binding_constraints,
        }
    }

    fn snap(&self, value: f64) -> f64 {
        if value.abs() <= self.tolerance { 0.0 } else { value }
    }
}

/// Dense simplex tableau.
///
/// Columns are laid out as structural variables, then slack/surplus
/// variables, then artificial variables, then the right-hand side. The last
/// row holds reduced profits (the objective is always maximized internally).
#[derive(Debug, Clone)]
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
    n_vars: usize,
    art_start: usize,
    n_artificial: usize,
    /// Column read for each row's dual value
    dual_cols: Vec<usize>,
    /// Rows negated to keep the RHS non-negative
    flipped: Vec<bool>,
}

struct Row {
    coefficients: Vec<f64>,
    op: ConstraintOp,
    rhs: f64,
    flipped: bool,
}

impl Tableau {
    fn new(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();

        let mut rows: Vec<Row> = problem
            .constraints
            .iter()
            .map(|c| Row::normalized(c.coefficients.clone(), c.op, c.rhs))
            .collect();
        for (j, &upper) in problem.upper_bounds.iter().enumerate() {
            if upper.is_finite() {
                let mut coefficients = vec![0.0; n_vars];
                coefficients[j] = 1.0;
                rows.push(Row::normalized(coefficients, ConstraintOp::Le, upper));
            }
        }

        let n_slack = rows.iter().filter(|r| r.op != ConstraintOp::Eq).count();
        let n_artificial = rows.iter().filter(|r| r.op != ConstraintOp::Le).count();
        let art_start = n_vars + n_slack;
        let width = art_start + n_artificial + 1;

        let mut tableau = Tableau {
            data: vec![vec![0.0; width]; rows.len() + 1],
            basic_vars: vec![0; rows.len()],
            n_vars,
            art_start,
            n_artificial,
            dual_cols: vec![0; rows.len()],
            flipped: rows.iter().map(|r| r.flipped).collect(),
        };

        let mut slack_idx = n_vars;
        let mut artificial_idx = art_start;
        for (i, row) in rows.iter().enumerate() {
            tableau.data[i][..n_vars].copy_from_slice(&row.coefficients);
            tableau.data[i][width - 1] = row.rhs;

            let marker = match row.op {
                ConstraintOp::Le => {
                    tableau.data[i][slack_idx] = 1.0;
                    slack_idx += 1;
                    slack_idx - 1
                }
                ConstraintOp::Ge => {
                    tableau.data[i][slack_idx] = -1.0; // surplus
                    slack_idx += 1;
                    tableau.data[i][artificial_idx] = 1.0;
                    artificial_idx += 1;
                    artificial_idx - 1
                }
                ConstraintOp::Eq => {
                    tableau.data[i][artificial_idx] = 1.0;
                    artificial_idx += 1;
                    artificial_idx - 1
                }
            };
            tableau.basic_vars[i] = marker;
            tableau.dual_cols[i] = marker;
        }

        // Simplex maximizes, so a minimization stores negated costs as profits
        let obj_row = tableau.obj_row();
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            tableau.data[obj_row][j] = if problem.objective.minimize { -coef } else { coef };
        }

        tableau
    }

    fn obj_row(&self) -> usize {
        self.data.len() - 1
    }

    fn rhs_col(&self) -> usize {
        self.data[0].len() - 1
    }

    fn is_basic(&self, col: usize) -> bool {
        self.basic_vars.contains(&col)
    }

    /// Phase 1 maximizes the negated sum of artificial variables
    fn load_phase1_objective(&mut self) {
        let obj_row = self.obj_row();
        let mut objective = vec![0.0; self.data[obj_row].len()];
        for value in &mut objective[self.art_start..self.art_start + self.n_artificial] {
            *value = -1.0;
        }
        self.load_objective(objective);
    }

    /// Install an objective row and price it out against the current basis
    fn load_objective(&mut self, objective: Vec<f64>) {
        let obj_row = self.obj_row();
        let n_cols = objective.len();
        self.data[obj_row] = objective;

        for i in 0..self.basic_vars.len() {
            let basic = self.basic_vars[i];
            let ratio = self.data[obj_row][basic];
            if ratio != 0.0 {
                for j in 0..n_cols {
                    self.data[obj_row][j] -= ratio * self.data[i][j];
                }
            }
        }
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let n_rows = self.data.len();
        let n_cols = self.data[0].len();

        // Update basic variable
        self.basic_vars[row] = col;

        // Scale pivot row
        let pivot_val = self.data[row][col];
        for j in 0..n_cols {
            self.data[row][j] /= pivot_val;
        }
        self.data[row][col] = 1.0;

        // Eliminate column in other rows
        for i in 0..n_rows {
            if i == row {
                continue;
            }
            let factor = self.data[i][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n_cols {
                let updated = self.data[i][j] - factor * self.data[row][j];
                self.data[i][j] = if updated.abs() < ZERO_SNAP { 0.0 } else { updated };
            }
            self.data[i][col] = 0.0;
        }
    }

    /// Values of all non-artificial columns
    fn values(&self) -> Vec<f64> {
        let rhs_col = self.rhs_col();
        let mut values = vec![0.0; self.art_start];
        for (i, &basic) in self.basic_vars.iter().enumerate() {
            if basic < self.art_start {
                values[basic] = self.data[i][rhs_col].max(0.0);
            }
        }
        values
    }

    fn basis_key(&self) -> Vec<usize> {
        let mut key = self.basic_vars.clone();
        key.sort_unstable();
        key
    }

    /// Number of structural variables in use, then their indices
    fn support_key(&self, tolerance: f64) -> (usize, Vec<usize>) {
        let rhs_col = self.rhs_col();
        let mut support: Vec<usize> = self
            .basic_vars
            .iter()
            .enumerate()
            .filter(|&(i, &basic)| basic < self.n_vars && self.data[i][rhs_col] > tolerance)
            .map(|(_, &basic)| basic)
            .collect();
        support.sort_unstable();
        (support.len(), support)
    }
}

impl Row {
    /// Negate rows with a negative RHS, flipping the inequality
    fn normalized(coefficients: Vec<f64>, op: ConstraintOp, rhs: f64) -> Self {
        if rhs >= 0.0 {
            return Row { coefficients, op, rhs, flipped: false };
        }
        let op = match op {
            ConstraintOp::Le => ConstraintOp::Ge,
            ConstraintOp::Ge => ConstraintOp::Le,
            ConstraintOp::Eq => ConstraintOp::Eq,
        };
        Row {
            coefficients: coefficients.into_iter().map(|c| -c).collect(),
            op,
            rhs: -rhs,
            flipped: true,
        }
    }
}

enum Outcome {
    Optimal(Tableau),
    Infeasible,
    Unbounded,
    IterationLimit,
}

enum SimplexResult {
    Optimal,
    Unbounded,
    IterationLimit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::LpProblem;

    fn vars(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 11.0).abs() < 1e-6, "obj = {} (expected 11)", solution.objective_value);
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize: 2x + 3y
        // Subject to:
        //   x + y >= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=9
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {} (expected 3)", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-6, "y = {} (expected 1)", solution.values[1]);
        assert!((solution.objective_value - 9.0).abs() < 1e-6, "obj = {} (expected 9)", solution.objective_value);
    }

    #[test]
    fn test_shadow_prices_and_binding_constraints() {
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![2.0, 3.0], true);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Ge, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);
        let prices = &solution.analysis.shadow_prices;

        // One more unit of demand has to come from y
        assert!((prices[0].value - 3.0).abs() < 1e-6, "sum price = {}", prices[0].value);
        // One more unit of x capacity replaces a unit of y
        assert!((prices[1].value + 1.0).abs() < 1e-6, "x_max price = {}", prices[1].value);
        assert_eq!(prices[2].value, 0.0);

        assert_eq!(solution.analysis.binding_constraints, vec!["sum".to_string(), "x_max".to_string()]);
        assert!(solution.analysis.reduced_costs.iter().all(|rc| rc.is_basic));
    }

    #[test]
    fn test_negative_rhs_is_normalized() {
        // Minimize x subject to -x <= -2, i.e. x >= 2
        let mut problem = LpProblem::new(vars(&["x"]));
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("floor", vec![-1.0], ConstraintOp::Le, -2.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.values[0] - 2.0).abs() < 1e-9);
        // Raising the RHS towards zero relaxes the floor
        assert!((solution.analysis.shadow_prices[0].value + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_upper_bounds() {
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![1.0, 1.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 10.0);
        problem.set_upper_bound(0, 2.0);
        problem.set_upper_bound(1, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 5.0).abs() < 1e-9);
        assert!(solution.analysis.binding_constraints.is_empty());
    }

    #[test]
    fn test_infeasible() {
        // x >= 5
        // x <= 3
        let mut problem = LpProblem::new(vars(&["x"]));
        problem.set_objective(vec![1.0], true);
        problem.add_constraint("lower", vec![1.0], ConstraintOp::Ge, 5.0);
        problem.add_constraint("upper", vec![1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);

        // Missing the floor by 2 costs 2/5, overshooting the cap by 2 costs 2/3
        assert!((solution.values[0] - 3.0).abs() < 1e-6, "x = {}", solution.values[0]);
        assert_eq!(solution.violations.len(), 1);
        let violation = &solution.violations[0];
        assert_eq!(violation.constraint, "lower");
        assert_eq!(violation.constraint_index, 0);
        assert!((violation.violation_amount - 2.0).abs() < 1e-6);
        assert!(violation.description.contains("below minimum"));
    }

    #[test]
    fn test_infeasible_prefers_cheapest_least_violation() {
        // Blend must sum to 1 but needs 50 units of protein from feeds
        // carrying 10 and 20: y=1 gets closest
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![1.0, 5.0], true);
        problem.add_constraint("total", vec![1.0, 1.0], ConstraintOp::Eq, 1.0);
        problem.add_constraint("protein_min", vec![10.0, 20.0], ConstraintOp::Ge, 50.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert!((solution.values[0]).abs() < 1e-6);
        assert!((solution.values[1] - 1.0).abs() < 1e-6);
        assert!((solution.objective_value - 5.0).abs() < 1e-6);
        assert!((solution.violations[0].violation_amount - 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_least_violation_point_is_clean() {
        // Fiber floor of 17 is out of reach; b gets closest, and the cheap
        // a must not leak into the diagnostic point
        let mut problem = LpProblem::new(vars(&["a", "b"]));
        problem.set_objective(vec![1.0, 9.0], true);
        problem.set_upper_bound(0, 1.0);
        problem.set_upper_bound(1, 1.0);
        problem.add_constraint("total", vec![1.0, 1.0], ConstraintOp::Eq, 1.0);
        problem.add_constraint("fiber_min", vec![5.0, 10.0], ConstraintOp::Ge, 17.0);
        problem.add_constraint("fiber_max", vec![5.0, 10.0], ConstraintOp::Le, 22.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Infeasible);
        assert_eq!(solution.values[0], 0.0, "a = {}", solution.values[0]);
        assert!((solution.values[1] - 1.0).abs() < 1e-12, "b = {}", solution.values[1]);
        assert_eq!(solution.violations.len(), 1);
        assert!((solution.violations[0].violation_amount - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_unbounded() {
        let mut problem = LpProblem::new(vars(&["x"]));
        problem.set_objective(vec![1.0], false);
        problem.add_constraint("floor", vec![1.0], ConstraintOp::Ge, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Unbounded);
    }

    #[test]
    fn test_iteration_limit() {
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![3.0, 2.0], false);
        problem.add_constraint("sum", vec![1.0, 1.0], ConstraintOp::Le, 4.0);
        problem.add_constraint("x_max", vec![1.0, 0.0], ConstraintOp::Le, 3.0);
        problem.add_constraint("y_max", vec![0.0, 1.0], ConstraintOp::Le, 3.0);

        let solution = Solver::new().with_max_iterations(1).solve(&problem);

        assert_eq!(solution.status, SolutionStatus::IterationLimit);
    }

    #[test]
    fn test_malformed_problem() {
        let mut problem = LpProblem::new(vars(&["x", "y"]));
        problem.set_objective(vec![1.0], true);

        let solver = Solver::new();
        assert_eq!(solver.solve(&problem).status, SolutionStatus::Error);
        assert!(matches!(
            solver.try_solve(&problem),
            Err(ProblemError::ObjectiveLength { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_degenerate_problem_terminates() {
        // Beale's cycling example; Dantzig's rule loops forever on it
        let mut problem = LpProblem::new(vars(&["x1", "x2", "x3", "x4"]));
        problem.set_objective(vec![10.0, -57.0, -9.0, -24.0], false);
        problem.add_constraint("r1", vec![0.5, -5.5, -2.5, 9.0], ConstraintOp::Le, 0.0);
        problem.add_constraint("r2", vec![0.5, -1.5, -0.5, 1.0], ConstraintOp::Le, 0.0);
        problem.add_constraint("r3", vec![1.0, 0.0, 0.0, 0.0], ConstraintOp::Le, 1.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!((solution.objective_value - 1.0).abs() < 1e-6, "obj = {}", solution.objective_value);
    }

    #[test]
    fn test_prefers_sparsest_of_tied_optima() {
        // Every blend costs the same; z alone meets the band, so does x+y
        let mut problem = LpProblem::new(vars(&["x", "y", "z"]));
        problem.set_objective(vec![1.0, 1.0, 1.0], true);
        problem.add_constraint("total", vec![1.0, 1.0, 1.0], ConstraintOp::Eq, 1.0);
        problem.add_constraint("protein_min", vec![10.0, 20.0, 15.0], ConstraintOp::Ge, 14.0);
        problem.add_constraint("protein_max", vec![10.0, 20.0, 15.0], ConstraintOp::Le, 16.0);

        let solution = Solver::new().solve(&problem);

        assert_eq!(solution.status, SolutionStatus::Optimal);
        assert!(solution.values[0].abs() < 1e-9, "x = {}", solution.values[0]);
        assert!(solution.values[1].abs() < 1e-9, "y = {}", solution.values[1]);
        assert!((solution.values[2] - 1.0).abs() < 1e-9, "z = {}", solution.values[2]);

        let without_search = Solver::new().with_max_alternate_bases(0).solve(&problem);
        assert!((without_search.objective_value - solution.objective_value).abs() < 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let mut problem = LpProblem::new(vars(&["a", "b", "c", "d"]));
        problem.set_objective(vec![4.0, 4.0, 2.0, 7.0], true);
        problem.add_constraint("total", vec![1.0; 4], ConstraintOp::Eq, 1.0);
        problem.add_constraint("n_min", vec![8.0, 12.0, 3.0, 30.0], ConstraintOp::Ge, 10.0);
        problem.add_constraint("n_max", vec![8.0, 12.0, 3.0, 30.0], ConstraintOp::Le, 14.0);

        let solver = Solver::new();
        let first = solver.solve(&problem);
        let second = solver.solve(&problem);

        assert_eq!(first.status, SolutionStatus::Optimal);
        assert_eq!(first.values, second.values);
        assert_eq!(first.objective_value.to_bits(), second.objective_value.to_bits());
    }
}
