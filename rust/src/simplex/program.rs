//! Linear program container: rows over non-negative variables and a
//! minimization objective.

use std::fmt;

/// Comparison of a row's left-hand side against its right-hand side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    /// `a·x >= b`
    GreaterEqual,
    /// `a·x == b`
    Equal,
}

/// One linear constraint `Σ coefficient·x_var (relation) rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    /// Sparse coefficients as (variable, coefficient) pairs.
    pub coefficients: Vec<(usize, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// A linear program over variables `x_0 .. x_{n-1} >= 0`.
///
/// The objective is always minimized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearProgram {
    num_variables: usize,
    rows: Vec<Row>,
    objective: Vec<(usize, f64)>,
}

impl LinearProgram {
    pub fn new(num_variables: usize) -> Self {
        Self {
            num_variables,
            rows: Vec::new(),
            objective: Vec::new(),
        }
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn objective(&self) -> &[(usize, f64)] {
        &self.objective
    }

    /// Add a general row.
    ///
    /// # Panics
    /// If a coefficient names a variable outside the program.
    pub fn add_row(&mut self, coefficients: Vec<(usize, f64)>, relation: Relation, rhs: f64) {
        assert!(
            coefficients.iter().all(|&(var, _)| var < self.num_variables),
            "row references a variable outside the program"
        );
        self.rows.push(Row {
            coefficients,
            relation,
            rhs,
        });
    }

    /// Add the difference constraint `x_to - x_from >= bound`.
    pub fn add_difference(&mut self, to: usize, from: usize, bound: f64) {
        self.add_row(
            vec![(to, 1.0), (from, -1.0)],
            Relation::GreaterEqual,
            bound,
        );
    }

    /// Add `x_var >= bound`.
    pub fn add_lower_bound(&mut self, var: usize, bound: f64) {
        self.add_row(vec![(var, 1.0)], Relation::GreaterEqual, bound);
    }

    /// Add `x_var == value`.
    pub fn fix_variable(&mut self, var: usize, value: f64) {
        self.add_row(vec![(var, 1.0)], Relation::Equal, value);
    }

    /// Set the coefficients of the objective to minimize.
    pub fn minimize(&mut self, objective: Vec<(usize, f64)>) {
        assert!(
            objective.iter().all(|&(var, _)| var < self.num_variables),
            "objective references a variable outside the program"
        );
        self.objective = objective;
    }

    /// Evaluate the left-hand side of `row` at `values`.
    pub fn row_activity(row: &Row, values: &[f64]) -> f64 {
        row.coefficients
            .iter()
            .map(|&(var, coeff)| coeff * values[var])
            .sum()
    }

    /// Evaluate the objective at `values`.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(var, coeff)| coeff * values[var])
            .sum()
    }
}

impl fmt::Display for LinearProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_terms(f: &mut fmt::Formatter<'_>, terms: &[(usize, f64)]) -> fmt::Result {
            if terms.is_empty() {
                return write!(f, "0");
            }
            for (idx, &(var, coeff)) in terms.iter().enumerate() {
                let sign = if coeff < 0.0 { "-" } else { "+" };
                if idx == 0 {
                    if coeff < 0.0 {
                        write!(f, "-")?;
                    }
                } else {
                    write!(f, " {} ", sign)?;
                }
                write!(f, "{}*x{}", coeff.abs(), var)?;
            }
            Ok(())
        }

        write!(f, "minimize ")?;
        write_terms(f, &self.objective)?;
        writeln!(f)?;
        for row in &self.rows {
            write!(f, "  ")?;
            write_terms(f, &row.coefficients)?;
            let op = match row.relation {
                Relation::GreaterEqual => ">=",
                Relation::Equal => "=",
            };
            writeln!(f, " {} {}", op, row.rhs)?;
        }
        Ok(())
    }
}
