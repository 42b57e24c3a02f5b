//! Handwritten simplex solver for the scheduling linear programs.
//!
//! The solver knows nothing about operations or dependences. Each problem
//! variant emits a [`LinearProgram`] through a formulation in
//! `crate::scheduler` and reads the solution back.

mod program;
mod tableau;

pub use program::{LinearProgram, Relation, Row};
pub use tableau::{LpSolution, SimplexError, SimplexSolver};
