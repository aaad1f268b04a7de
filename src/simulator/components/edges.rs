//! Components which make up an edge

use specs::{Component, Entity, VecStorage};

/// Spring connections from one node to every node it links to.
///
/// Rebuilt wholesale on every rebind; endpoints that no longer resolve to a
/// live node are dropped at that point.
#[derive(Component)]
#[storage(VecStorage)]
pub struct Connects {
    pub targets: Vec<Entity>,
}
