//! Linear-programming schedulers for the basic, cyclic and shared-operator
//! problem variants.
//!
//! Each variant emits its program through a formulation builder, solves it
//! with [`crate::simplex::SimplexSolver`] and writes start times back into the
//! problem only after the whole result has been checked.

mod basic;
mod cyclic;
mod formulation;
mod resource_schedule;
mod shared;


pub use basic::{schedule_simplex, schedule_simplex_with_config};
pub use cyclic::{schedule_simplex_cyclic, schedule_simplex_cyclic_with_config};
pub use resource_schedule::ResourceSchedule;
pub use shared::{schedule_simplex_shared, schedule_simplex_shared_with_config};
