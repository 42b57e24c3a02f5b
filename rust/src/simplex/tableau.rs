//! Dense two-phase primal simplex with Bland's anti-cycling rule.
//!
//! Column layout of the tableau:
//! `[structural variables | surplus variables | artificial variables | rhs]`.
//! Every `>=` row gets a surplus column. Rows whose right-hand side is
//! non-positive are negated so the surplus starts basic; all other rows
//! (including every equality) start with an artificial basic variable.

use thiserror::Error;

use crate::config::SchedulingConfig;
use crate::{log_checks, log_debug};

use super::program::{LinearProgram, Relation};

/// Outcomes of a solve that do not yield an optimal solution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimplexError {
    #[error("linear program is infeasible")]
    Infeasible,
    #[error("linear program is unbounded")]
    Unbounded,
    #[error("pivot limit of {0} exceeded")]
    PivotLimit(usize),
}

/// An optimal solution.
#[derive(Clone, Debug, PartialEq)]
pub struct LpSolution {
    /// Value of every structural variable.
    pub values: Vec<f64>,
    /// Objective value at `values`.
    pub objective: f64,
    /// Pivots performed over both phases.
    pub pivots: usize,
}

/// Reusable solver settings. Holds no state between solves.
#[derive(Clone, Debug)]
pub struct SimplexSolver {
    tolerance: f64,
    max_pivots: Option<usize>,
    verbosity: u8,
}

impl SimplexSolver {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            tolerance: config.tolerance,
            max_pivots: config.max_pivots,
            verbosity: config.verbosity,
        }
    }

    /// Minimize the objective of `lp` subject to its rows and `x >= 0`.
    pub fn solve(&self, lp: &LinearProgram) -> Result<LpSolution, SimplexError> {
        let mut tableau = Tableau::build(lp);
        let mut pivots = 0usize;

        // Phase 1: drive the artificial variables to zero
        if tableau.first_artificial < tableau.num_columns {
            let costs: Vec<f64> = (0..tableau.num_columns)
                .map(|col| if col >= tableau.first_artificial { 1.0 } else { 0.0 })
                .collect();
            let mut reduced = tableau.price(&costs);
            let num_columns = tableau.num_columns;
            self.optimize(&mut tableau, &mut reduced, num_columns, &mut pivots)
                .map_err(|err| match err {
                    // Phase 1 is bounded below by zero
                    SimplexError::Unbounded => SimplexError::Infeasible,
                    other => other,
                })?;

            let infeasibility = -reduced[num_columns];
            log_checks!(
                self.verbosity,
                "simplex: phase 1 finished after {} pivots, infeasibility {}",
                pivots,
                infeasibility
            );
            if infeasibility > self.tolerance * (1.0 + tableau.rows.len() as f64) {
                return Err(SimplexError::Infeasible);
            }
            tableau.evict_artificials(self.tolerance);
        }

        // Phase 2: optimize the real objective without artificial columns
        let mut costs = vec![0.0; tableau.num_columns];
        for &(var, coeff) in lp.objective() {
            costs[var] += coeff;
        }
        let mut reduced = tableau.price(&costs);
        let first_artificial = tableau.first_artificial;
        self.optimize(&mut tableau, &mut reduced, first_artificial, &mut pivots)?;

        let mut values = vec![0.0; lp.num_variables()];
        for (row, &basic) in tableau.basis.iter().enumerate() {
            if basic < values.len() {
                values[basic] = tableau.rhs(row);
            }
        }
        let objective = lp.objective_value(&values);
        log_checks!(
            self.verbosity,
            "simplex: optimal objective {} after {} pivots",
            objective,
            pivots
        );

        Ok(LpSolution {
            values,
            objective,
            pivots,
        })
    }

    /// Pivot until no column below `entering_limit` has a negative reduced cost.
    ///
    /// Bland's rule: the entering column is the lowest-index improving column,
    /// the leaving row is the minimum-ratio row with the lowest-index basic
    /// variable among ties.
    fn optimize(
        &self,
        tableau: &mut Tableau,
        reduced: &mut [f64],
        entering_limit: usize,
        pivots: &mut usize,
    ) -> Result<(), SimplexError> {
        loop {
            let Some(col) = (0..entering_limit).find(|&col| reduced[col] < -self.tolerance)
            else {
                return Ok(());
            };

            let mut leaving: Option<(usize, f64)> = None;
            for row in 0..tableau.rows.len() {
                let coeff = tableau.rows[row][col];
                if coeff <= self.tolerance {
                    continue;
                }
                let ratio = tableau.rhs(row) / coeff;
                leaving = match leaving {
                    None => Some((row, ratio)),
                    Some((best, best_ratio)) => {
                        if ratio < best_ratio - self.tolerance
                            || (ratio <= best_ratio + self.tolerance
                                && tableau.basis[row] < tableau.basis[best])
                        {
                            Some((row, ratio))
                        } else {
                            Some((best, best_ratio))
                        }
                    }
                };
            }
            let Some((row, _)) = leaving else {
                return Err(SimplexError::Unbounded);
            };

            if let Some(limit) = self.max_pivots {
                if *pivots >= limit {
                    return Err(SimplexError::PivotLimit(limit));
                }
            }
            log_debug!(
                self.verbosity,
                "simplex: pivot {} enters column {}, row {} (basic {}) leaves",
                *pivots,
                col,
                row,
                tableau.basis[row]
            );
            tableau.pivot(row, col, reduced);
            *pivots += 1;
        }
    }
}

/// Dense tableau in canonical form with respect to `basis`.
struct Tableau {
    /// One entry per row, each `num_columns + 1` wide (rhs last).
    rows: Vec<Vec<f64>>,
    /// Basic column of each row.
    basis: Vec<usize>,
    num_columns: usize,
    first_artificial: usize,
}

impl Tableau {
    fn build(lp: &LinearProgram) -> Self {
        let n = lp.num_variables();
        let num_surplus = lp
            .rows()
            .iter()
            .filter(|r| r.relation == Relation::GreaterEqual)
            .count();

        // Rows needing an artificial: equalities, and >= rows with positive rhs
        let needs_artificial: Vec<bool> = lp
            .rows()
            .iter()
            .map(|r| r.relation == Relation::Equal || r.rhs > 0.0)
            .collect();
        let num_artificial = needs_artificial.iter().filter(|&&a| a).count();

        let first_artificial = n + num_surplus;
        let num_columns = first_artificial + num_artificial;

        let mut rows = Vec::with_capacity(lp.rows().len());
        let mut basis = Vec::with_capacity(lp.rows().len());
        let mut next_surplus = n;
        let mut next_artificial = first_artificial;

        for (row, &artificial) in lp.rows().iter().zip(&needs_artificial) {
            let mut dense = vec![0.0; num_columns + 1];
            for &(var, coeff) in &row.coefficients {
                dense[var] += coeff;
            }
            dense[num_columns] = row.rhs;

            let surplus = (row.relation == Relation::GreaterEqual).then(|| {
                dense[next_surplus] = -1.0;
                next_surplus += 1;
                next_surplus - 1
            });

            // Keep the rhs non-negative so the starting basis is feasible
            if dense[num_columns] < 0.0
                || (dense[num_columns] == 0.0 && !artificial && surplus.is_some())
            {
                for value in dense.iter_mut() {
                    *value = -*value;
                }
            }

            if artificial {
                dense[next_artificial] = 1.0;
                basis.push(next_artificial);
                next_artificial += 1;
            } else {
                // Negated >= row with rhs <= 0: the surplus has coefficient +1
                basis.push(surplus.unwrap_or(0));
            }
            rows.push(dense);
        }

        Self {
            rows,
            basis,
            num_columns,
            first_artificial,
        }
    }

    #[inline]
    fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.num_columns]
    }

    /// Reduced costs `c - c_B·B⁻¹A` for `costs`, with `-objective` in the rhs slot.
    fn price(&self, costs: &[f64]) -> Vec<f64> {
        let mut reduced = costs.to_vec();
        reduced.push(0.0);
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            let cost = costs[basic];
            if cost != 0.0 {
                for (r, value) in reduced.iter_mut().zip(row) {
                    *r -= cost * value;
                }
            }
        }
        reduced
    }

    fn pivot(&mut self, pivot_row: usize, pivot_col: usize, reduced: &mut [f64]) {
        let divisor = self.rows[pivot_row][pivot_col];
        for value in self.rows[pivot_row].iter_mut() {
            *value /= divisor;
        }
        let pivot_values = self.rows[pivot_row].clone();

        for (idx, row) in self.rows.iter_mut().enumerate() {
            if idx == pivot_row {
                continue;
            }
            let factor = row[pivot_col];
            if factor != 0.0 {
                for (value, p) in row.iter_mut().zip(&pivot_values) {
                    *value -= factor * p;
                }
            }
        }

        let factor = reduced[pivot_col];
        if factor != 0.0 {
            for (value, p) in reduced.iter_mut().zip(&pivot_values) {
                *value -= factor * p;
            }
        }

        self.basis[pivot_row] = pivot_col;
    }

    /// Remove artificial variables left in the basis at level zero.
    ///
    /// Each is replaced by any non-artificial column with a nonzero entry in its
    /// row; rows without one are linearly dependent on the others and dropped.
    fn evict_artificials(&mut self, tolerance: f64) {
        let mut redundant: Vec<usize> = Vec::new();
        for row in 0..self.rows.len() {
            if self.basis[row] < self.first_artificial {
                continue;
            }
            let replacement =
                (0..self.first_artificial).find(|&col| self.rows[row][col].abs() > tolerance);
            match replacement {
                Some(col) => {
                    // The row's rhs is zero, so the reduced costs are unaffected
                    let mut scratch = vec![0.0; self.num_columns + 1];
                    self.pivot(row, col, &mut scratch);
                }
                None => redundant.push(row),
            }
        }

        for &row in redundant.iter().rev() {
            self.rows.remove(row);
            self.basis.remove(row);
        }
    }
}
