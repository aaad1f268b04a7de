//! Maps stable node ids to simulation entities across graph changes.

use std::collections::{HashMap, HashSet};

use glam::Vec2;
use log::debug;
use rand::Rng;
use specs::{Builder, Entity, World, WorldExt};

use crate::graph::link::Link;
use crate::graph::node::NodeKind;
use crate::simulator::{
    components::{
        forces::NodeForces,
        nodes::{Mass, Pinned, Position, Velocity},
    },
    ressources::simulator_vars::WorldSize,
};

/// Maximum offset on each axis when spawning a node next to its anchor.
pub(crate) const SPAWN_JITTER: f32 = 5.0;

/// A node as the graph store declares it to the simulation.
pub struct DeclaredNode {
    pub id: String,
    pub kind: NodeKind,
    /// `Some` forces the pin state, `None` leaves it as the simulation has it.
    pub pinned: Option<bool>,
}

impl DeclaredNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            pinned: None,
        }
    }
}

/// Last known state of a node that left the declared set.
///
/// Kept around so an undone delete revives the node exactly where it was,
/// instead of letting it re-enter at the center and shove the layout around.
struct Parked {
    position: Vec2,
    velocity: Vec2,
    pinned: bool,
}

#[derive(Default)]
pub struct NodeRegistry {
    live: HashMap<String, Entity>,
    parked: HashMap<String, Parked>,
}

impl NodeRegistry {
    /// Brings the entity set in line with the declared node set.
    ///
    /// Undeclared live nodes are parked, parked nodes that reappear are
    /// revived with their old state, and genuinely new nodes spawn next to a
    /// live link neighbor (or the canvas center) with a little jitter so
    /// coincident spawns do not stack.
    pub fn reconcile(&mut self, world: &mut World, declared: &[DeclaredNode], links: &[Link]) {
        let declared_ids: HashSet<&str> = declared.iter().map(|node| node.id.as_str()).collect();

        let gone: Vec<String> = self
            .live
            .keys()
            .filter(|id| !declared_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in gone {
            let entity = self.live.remove(&id).expect("id came from the live map");
            let state = {
                let positions = world.read_storage::<Position>();
                let velocities = world.read_storage::<Velocity>();
                let pins = world.read_storage::<Pinned>();
                Parked {
                    position: positions.get(entity).map(|p| p.0).unwrap_or_default(),
                    velocity: velocities.get(entity).map(|v| v.0).unwrap_or_default(),
                    pinned: pins.contains(entity),
                }
            };
            debug!("[{id}] parked at {0}", state.position);
            self.parked.insert(id, state);
            let _ = world.delete_entity(entity);
        }

        for node in declared.iter().filter(|n| self.live.contains_key(&n.id)) {
            let entity = self.live[&node.id];
            {
                let mut masses = world.write_storage::<Mass>();
                if let Some(mass) = masses.get_mut(entity) {
                    mass.0 = node.kind.mass();
                }
            }
            match node.pinned {
                Some(true) => {
                    let _ = world.write_storage::<Pinned>().insert(entity, Pinned);
                }
                Some(false) => {
                    world.write_storage::<Pinned>().remove(entity);
                }
                None => {}
            }
        }

        let newcomers: Vec<&DeclaredNode> = declared
            .iter()
            .filter(|node| !self.live.contains_key(&node.id))
            .collect();
        let center = {
            let size = world.read_resource::<WorldSize>();
            Vec2::new(size.width as f32 / 2.0, size.height as f32 / 2.0)
        };

        let mut rng = rand::thread_rng();
        let mut planned: Vec<(&DeclaredNode, Vec2, Vec2, bool)> = Vec::new();
        {
            let positions = world.read_storage::<Position>();
            for node in newcomers {
                if let Some(parked) = self.parked.remove(&node.id) {
                    debug!("[{0}] revived at {1}", node.id, parked.position);
                    let pinned = node.pinned.unwrap_or(parked.pinned);
                    planned.push((node, parked.position, parked.velocity, pinned));
                    continue;
                }

                let anchor = links
                    .iter()
                    .filter(|link| link.touches(&node.id))
                    .filter_map(|link| {
                        let other = if link.source == node.id {
                            &link.target
                        } else {
                            &link.source
                        };
                        self.live
                            .get(other)
                            .and_then(|entity| positions.get(*entity))
                            .map(|position| position.0)
                    })
                    .next()
                    .unwrap_or(center);
                let jitter = Vec2::new(
                    rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                    rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                );
                planned.push((node, anchor + jitter, Vec2::ZERO, node.pinned.unwrap_or(false)));
            }
        }

        for (node, position, velocity, pinned) in planned {
            let mut builder = world
                .create_entity()
                .with(Position(position))
                .with(Velocity(velocity))
                .with(Mass(node.kind.mass()))
                .with(NodeForces::default());
            if pinned {
                builder = builder.with(Pinned);
            }
            let entity = builder.build();
            self.live.insert(node.id.clone(), entity);
        }
    }

    pub fn entity(&self, id: &str) -> Option<Entity> {
        self.live.get(id).copied()
    }

    /// Last known position of a parked node.
    pub fn parked_position(&self, id: &str) -> Option<Vec2> {
        self.parked.get(id).map(|state| state.position)
    }

    /// Forgets the parked state of a node that will not come back.
    pub fn evict(&mut self, id: &str) {
        self.parked.remove(id);
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.parked.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Entity)> {
        self.live.iter().map(|(id, entity)| (id.as_str(), *entity))
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
