//! The components a simulated node is made of.

pub mod edges;
pub mod forces;
pub mod nodes;
