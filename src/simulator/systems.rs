//! The systems which advance the simulation by one step.

pub mod force_compute;
pub mod position_update;
