//! Accumulated forces acting on a node.

use glam::Vec2;
use specs::{Component, VecStorage};

/// Net force applied to a node during the current integration step.
#[derive(Component, Default)]
#[storage(VecStorage)]
pub struct NodeForces(pub Vec2);
