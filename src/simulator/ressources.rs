//! Ressources and parameter channels of the simulator.

pub mod event_channels;
pub mod simulator_vars;
