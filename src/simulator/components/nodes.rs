//! Components which make up a simulated node

use glam::Vec2;
use specs::{Component, NullStorage, VecStorage};

/// The position of a node.
#[derive(Component, Default)]
#[storage(VecStorage)]
pub struct Position(pub Vec2);

/// The velocity of a node.
#[derive(Component, Default)]
#[storage(VecStorage)]
pub struct Velocity(pub Vec2);

/// The mass of a node. Derived from the node's category.
#[derive(Component)]
#[storage(VecStorage)]
pub struct Mass(pub f32);

impl Default for Mass {
    fn default() -> Self {
        Self(1.0)
    }
}

/// A fixed node has cooled below the freeze threshold and does not compute
/// movement until the simulation is reheated.
#[derive(Component, Default)]
#[storage(NullStorage)]
pub struct Fixed;

/// A dragged node follows the pointer instead of the integrator.
#[derive(Component, Default)]
#[storage(NullStorage)]
pub struct Dragged;

/// A pinned node is held at its position until the user unpins it.
///
/// Distinct from [`Fixed`]: reheating thaws frozen nodes but never pinned
/// ones, and distinct from [`Dragged`], which only lasts for the gesture.
#[derive(Component, Default)]
#[storage(NullStorage)]
pub struct Pinned;
