//! Force-directed layout of the concept graph, built on an ECS.
//!
//! The simulation owns positions only. Which nodes and links exist is decided
//! by the graph store and handed over through [`Simulator::rebind`].

pub mod components;
pub mod registry;
pub mod ressources;
pub mod systems;

use std::collections::HashMap;

use glam::Vec2;
use log::debug;
use specs::{
    Dispatcher, DispatcherBuilder, Entity, Join, Read, ReaderId, System, World, WorldExt, Write,
};
use winit::dpi::PhysicalSize;

use crate::graph::link::Link;
use crate::quadtree::QuadTree;
use crate::simulator::{
    components::{
        edges::Connects,
        nodes::{Dragged, Fixed, Pinned, Position, Velocity},
    },
    registry::{DeclaredNode, NodeRegistry},
    ressources::{
        event_channels::{CollisionRadiusChan, RepelForceChan, SpringNeutralChan},
        simulator_vars::{
            CollisionRadius, Damping, DeltaTime, FreezeThreshold, GravityForce, QuadTreeTheta,
            RepelForce, SpringNeutralLength, SpringStiffness, WorldSize,
        },
    },
    systems::{
        force_compute::{
            ApplyNodeForce, BuildQuadTree, ComputeEdgeForces, ComputeGravityForce, ComputeNodeForce,
        },
        position_update::{ResolveCollisions, UpdateNodePosition},
    },
};

/// Drains the parameter channels into the matching ressources.
#[derive(Default)]
struct EventManager {
    repel_force_reader: Option<ReaderId<f32>>,
    spring_neutral_reader: Option<ReaderId<f32>>,
    collision_radius_reader: Option<ReaderId<f32>>,
}

impl<'a> System<'a> for EventManager {
    type SystemData = (
        Read<'a, RepelForceChan>,
        Read<'a, SpringNeutralChan>,
        Read<'a, CollisionRadiusChan>,
        Write<'a, RepelForce>,
        Write<'a, SpringNeutralLength>,
        Write<'a, CollisionRadius>,
    );

    fn run(
        &mut self,
        (repel_events, spring_neutral_events, collision_events, mut repel_force, mut spring_length, mut collision_radius): Self::SystemData,
    ) {
        if let Some(val) = repel_events
            .0
            .read(self.repel_force_reader.as_mut().expect("setup ran"))
            .last()
        {
            repel_force.0 = *val;
        }
        if let Some(val) = spring_neutral_events
            .0
            .read(self.spring_neutral_reader.as_mut().expect("setup ran"))
            .last()
        {
            spring_length.0 = *val;
        }
        if let Some(val) = collision_events
            .0
            .read(self.collision_radius_reader.as_mut().expect("setup ran"))
            .last()
        {
            collision_radius.0 = *val;
        }
    }

    fn setup(&mut self, world: &mut World) {
        use specs::SystemData;
        Self::SystemData::setup(world);
        self.repel_force_reader = Some(world.fetch_mut::<RepelForceChan>().0.register_reader());
        self.spring_neutral_reader =
            Some(world.fetch_mut::<SpringNeutralChan>().0.register_reader());
        self.collision_radius_reader =
            Some(world.fetch_mut::<CollisionRadiusChan>().0.register_reader());
    }
}

pub struct Simulator<'a, 'b> {
    world: World,
    dispatcher: Dispatcher<'a, 'b>,
    registry: NodeRegistry,
}

impl<'a, 'b> Simulator<'a, 'b> {
    pub fn builder() -> SimulatorBuilder {
        SimulatorBuilder::default()
    }

    /// Advances the simulation by one step.
    pub fn step(&mut self) {
        self.dispatcher.dispatch(&self.world);
        self.world.maintain();
    }

    /// Hands the current node and link set over to the simulation.
    ///
    /// Nodes keep their entity, position and velocity across rebinds; see
    /// [`NodeRegistry::reconcile`] for how departures and arrivals are
    /// handled. Links whose endpoints are both simulated become spring
    /// connections, the rest are dropped.
    pub fn rebind(&mut self, declared: &[DeclaredNode], links: &[Link]) {
        self.registry.reconcile(&mut self.world, declared, links);

        {
            let mut connections = self.world.write_storage::<Connects>();
            connections.clear();

            let mut grouped: HashMap<Entity, Vec<Entity>> = HashMap::new();
            for link in links {
                let (Some(source), Some(target)) = (
                    self.registry.entity(&link.source),
                    self.registry.entity(&link.target),
                ) else {
                    debug!(
                        "dropping link {0} -> {1}: endpoint not simulated",
                        link.source, link.target
                    );
                    continue;
                };
                grouped.entry(source).or_default().push(target);
            }
            for (source, targets) in grouped {
                let _ = connections.insert(source, Connects { targets });
            }
        }

        self.reheat();
        self.world.maintain();
    }

    /// Unfreezes every settled node so the layout can absorb a change.
    ///
    /// Pinned nodes stay where the user put them.
    pub fn reheat(&mut self) {
        let entities = self.world.entities();
        let mut fixed = self.world.write_storage::<Fixed>();
        let pinned = self.world.read_storage::<Pinned>();

        let frozen: Vec<Entity> = (&entities, &fixed, !&pinned)
            .join()
            .map(|(entity, _, _)| entity)
            .collect();
        for entity in frozen {
            fixed.remove(entity);
        }
    }

    /// Pins a node at the given position.
    pub fn pin(&mut self, id: &str, position: Vec2) {
        let Some(entity) = self.registry.entity(id) else {
            return;
        };
        let _ = self.world.write_storage::<Pinned>().insert(entity, Pinned);
        if let Some(pos) = self.world.write_storage::<Position>().get_mut(entity) {
            pos.0 = position;
        }
        if let Some(velocity) = self.world.write_storage::<Velocity>().get_mut(entity) {
            velocity.0 = Vec2::ZERO;
        }
    }

    /// Releases a pinned node back into the simulation.
    pub fn unpin(&mut self, id: &str) {
        let Some(entity) = self.registry.entity(id) else {
            return;
        };
        self.world.write_storage::<Pinned>().remove(entity);
        self.reheat();
    }

    /// Pins an unpinned node in place, or releases a pinned one.
    ///
    /// Returns the new pin state, or `None` for an unknown node.
    pub fn toggle_pin(&mut self, id: &str) -> Option<bool> {
        let entity = self.registry.entity(id)?;
        let pinned = self.world.read_storage::<Pinned>().contains(entity);
        if pinned {
            self.unpin(id);
            Some(false)
        } else {
            let position = self.position_of(id)?;
            self.pin(id, position);
            Some(true)
        }
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.registry
            .entity(id)
            .map(|entity| self.world.read_storage::<Pinned>().contains(entity))
            .unwrap_or(false)
    }

    /// Notify simulator that the user started dragging a node.
    pub fn drag_start(&mut self, id: &str) {
        debug!("[{id}] drag start");
        let Some(entity) = self.registry.entity(id) else {
            return;
        };
        let _ = self.world.write_storage::<Dragged>().insert(entity, Dragged);
        if let Some(velocity) = self.world.write_storage::<Velocity>().get_mut(entity) {
            velocity.0 = Vec2::ZERO;
        }
        // Neighbors should make room while the node moves.
        self.reheat();
    }

    /// Moves a dragged node to the cursor position.
    pub fn dragged(&mut self, id: &str, position: Vec2) {
        let Some(entity) = self.registry.entity(id) else {
            return;
        };
        if let Some(pos) = self.world.write_storage::<Position>().get_mut(entity) {
            pos.0 = position;
        }
        // A held drag lets neighbors cool and freeze; thaw them on every
        // move so they keep reacting for the whole gesture.
        self.reheat();
    }

    /// Notify simulator that the user stopped dragging a node.
    pub fn drag_end(&mut self, id: &str) {
        debug!("[{id}] drag end");
        let Some(entity) = self.registry.entity(id) else {
            return;
        };
        self.world.write_storage::<Dragged>().remove(entity);
    }

    /// Updates the canvas size the centering force targets.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.world.insert(WorldSize {
            width: size.width,
            height: size.height,
        });
    }

    /// Queues a new repel force, picked up before the next step.
    pub fn set_repel_force(&mut self, value: f32) {
        self.world
            .write_resource::<RepelForceChan>()
            .0
            .single_write(value);
    }

    /// Queues a new neutral link length, picked up before the next step.
    pub fn set_link_distance(&mut self, value: f32) {
        self.world
            .write_resource::<SpringNeutralChan>()
            .0
            .single_write(value);
    }

    /// Queues a new collision radius, picked up before the next step.
    pub fn set_collision_radius(&mut self, value: f32) {
        self.world
            .write_resource::<CollisionRadiusChan>()
            .0
            .single_write(value);
    }

    /// Current positions of all simulated nodes.
    pub fn positions(&self) -> Vec<(String, Vec2)> {
        let storage = self.world.read_storage::<Position>();
        self.registry
            .iter()
            .filter_map(|(id, entity)| storage.get(entity).map(|pos| (id.to_string(), pos.0)))
            .collect()
    }

    /// Position of a node, parked state included.
    pub fn position_of(&self, id: &str) -> Option<Vec2> {
        if let Some(entity) = self.registry.entity(id) {
            return self
                .world
                .read_storage::<Position>()
                .get(entity)
                .map(|pos| pos.0);
        }
        self.registry.parked_position(id)
    }

    pub fn velocity_of(&self, id: &str) -> Option<Vec2> {
        let entity = self.registry.entity(id)?;
        self.world
            .read_storage::<Velocity>()
            .get(entity)
            .map(|velocity| velocity.0)
    }

    /// Forgets the parked state of nodes that will not come back.
    pub fn evict(&mut self, ids: impl IntoIterator<Item = impl AsRef<str>>) {
        for id in ids {
            self.registry.evict(id.as_ref());
        }
    }

    pub fn node_count(&self) -> usize {
        self.registry.len()
    }

    /// Removes every node from the simulation.
    pub fn clear(&mut self) {
        self.world.delete_all();
        self.registry.clear();
        self.world.maintain();
    }
}

/// Builder for `Simulator`
pub struct SimulatorBuilder {
    spring_stiffness: f32,
    spring_neutral_length: f32,
    delta_time: f32,
    gravity_force: f32,
    repel_force: f32,
    damping: f32,
    quadtree_theta: f32,
    freeze_thresh: f32,
    collision_radius: f32,
    canvas_size: PhysicalSize<u32>,
}

impl SimulatorBuilder {
    /// Get a instance of `SimulatorBuilder` with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// How strong the spring force should be.
    ///
    /// Default: `100.0`
    pub fn spring_stiffness(mut self, spring_stiffness: f32) -> Self {
        self.spring_stiffness = spring_stiffness;
        self
    }

    /// Length of a link in neutral position.
    ///
    /// If the link is shorter it pushes apart.
    /// If the link is longer it pulls together.
    ///
    /// Default: `80.0`
    pub fn spring_neutral_length(mut self, neutral_length: f32) -> Self {
        self.spring_neutral_length = neutral_length;
        self
    }

    /// How strong the pull to the center should be.
    ///
    /// Default: `1.0`
    pub fn gravity_force(mut self, gravity_force: f32) -> Self {
        self.gravity_force = gravity_force;
        self
    }

    /// How strong nodes should push others away.
    ///
    /// Default: `300.0`
    pub fn repel_force(mut self, repel_force_const: f32) -> Self {
        self.repel_force = repel_force_const;
        self
    }

    /// Amount of damping that should be applied to the node's movement.
    ///
    /// `1.0` -> No Damping
    ///
    /// `0.0` -> No Movement
    ///
    /// Default: `0.9`
    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    /// How accurate the force calculations should be.
    /// Higher numbers result in more approximations but faster calculations.
    ///
    /// Value should be between 0.0 and 1.0.
    ///
    /// `0.0` -> No approximation -> n^2 brute force
    ///
    /// Default: `0.75`
    pub fn simulation_accuracy(mut self, theta: f32) -> Self {
        self.quadtree_theta = theta;
        self
    }

    /// Freeze nodes when their velocity falls below `freeze_thresh`.
    /// Set to `-1` to disable
    ///
    /// Default: `0.05`
    pub fn freeze_threshold(mut self, freeze_thresh: f32) -> Self {
        self.freeze_thresh = freeze_thresh;
        self
    }

    /// Minimum-separation radius of a node circle.
    /// Set to `0` to disable collision resolution.
    ///
    /// Default: `45.0`
    pub fn collision_radius(mut self, collision_radius: f32) -> Self {
        self.collision_radius = collision_radius;
        self
    }

    /// Size of the canvas the centering force targets.
    ///
    /// Default: `1280x720`
    pub fn canvas_size(mut self, canvas_size: PhysicalSize<u32>) -> Self {
        self.canvas_size = canvas_size;
        self
    }

    /// How much time a simulation step should simulate. (euler method)
    ///
    /// Bigger time steps result in faster simulations, but less accurate or
    /// even wrong simulations.
    ///
    /// `delta_time` is in seconds
    ///
    /// Panics when delta time is `0` or below
    ///
    /// Default: `0.005`
    pub fn delta_time(mut self, delta_time: f32) -> Self {
        if delta_time <= 0.0 {
            panic!("delta_time may not be 0 or below!");
        }
        self.delta_time = delta_time;
        self
    }

    /// Constructs a instance of `Simulator`
    pub fn build<'a, 'b>(self) -> Simulator<'a, 'b> {
        let mut world = World::new();
        let mut dispatcher = DispatcherBuilder::new()
            .with(EventManager::default(), "event_manager", &[])
            .with(BuildQuadTree, "build_quadtree", &["event_manager"])
            .with(ComputeNodeForce, "compute_node_force", &["build_quadtree"])
            .with(
                ComputeGravityForce,
                "compute_gravity_force",
                &["compute_node_force"],
            )
            .with(
                ComputeEdgeForces,
                "compute_edge_forces",
                &["compute_gravity_force"],
            )
            .with(ApplyNodeForce, "apply_node_force", &["compute_edge_forces"])
            .with(
                UpdateNodePosition,
                "update_node_position",
                &["apply_node_force"],
            )
            .with(
                ResolveCollisions,
                "resolve_collisions",
                &["update_node_position"],
            )
            .build();

        dispatcher.setup(&mut world);
        self.add_ressources(&mut world);

        Simulator {
            world,
            dispatcher,
            registry: NodeRegistry::default(),
        }
    }

    fn add_ressources(self, world: &mut World) {
        world.insert(RepelForce(self.repel_force));
        world.insert(SpringStiffness(self.spring_stiffness));
        world.insert(SpringNeutralLength(self.spring_neutral_length));
        world.insert(GravityForce(self.gravity_force));
        world.insert(DeltaTime(self.delta_time));
        world.insert(Damping(self.damping));
        world.insert(QuadTreeTheta(self.quadtree_theta));
        world.insert(FreezeThreshold(self.freeze_thresh));
        world.insert(CollisionRadius(self.collision_radius));
        world.insert(WorldSize {
            width: self.canvas_size.width,
            height: self.canvas_size.height,
        });
        world.insert(QuadTree::default());
    }
}

impl Default for SimulatorBuilder {
    /// Get a instance of `SimulatorBuilder` with default values
    fn default() -> Self {
        Self {
            repel_force: 300.0,
            spring_stiffness: 100.0,
            spring_neutral_length: 80.0,
            gravity_force: 1.0,
            delta_time: 0.005,
            damping: 0.9,
            quadtree_theta: 0.75,
            freeze_thresh: 0.05,
            collision_radius: 45.0,
            canvas_size: PhysicalSize::new(1280, 720),
        }
    }
}
