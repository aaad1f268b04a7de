use crate::quadtree::{BoundingBox2D, QuadTree};
use crate::simulator::{
    components::{
        edges::Connects,
        forces::NodeForces,
        nodes::{Dragged, Fixed, Mass, Pinned, Position, Velocity},
    },
    ressources::simulator_vars::{
        DeltaTime, GravityForce, QuadTreeTheta, RepelForce, SpringNeutralLength, SpringStiffness,
        WorldSize,
    },
};
use glam::Vec2;
use rayon::prelude::*;
use specs::{Entities, Join, ParJoin, Read, ReadExpect, ReadStorage, System, Write, WriteStorage};

/// Offset from a position to the center of the canvas.
pub(crate) fn center_offset(position: Vec2, size: &WorldSize) -> Vec2 {
    Vec2::new(
        size.width as f32 / 2.0 - position.x,
        size.height as f32 / 2.0 - position.y,
    )
}

/// Rebuilds the quadtree from the current node positions and masses.
pub struct BuildQuadTree;

impl<'a> System<'a> for BuildQuadTree {
    type SystemData = (
        Write<'a, QuadTree>,
        ReadStorage<'a, Position>,
        ReadStorage<'a, Mass>,
    );

    fn run(&mut self, (mut quadtree, positions, masses): Self::SystemData) {
        let mut min = Vec2::INFINITY;
        let mut max = Vec2::NEG_INFINITY;
        let mut count = 0;

        for (position, _) in (&positions, &masses).join() {
            min = min.min(position.0);
            max = max.max(position.0);
            count += 1;
        }
        if count == 0 {
            *quadtree = QuadTree::default();
            return;
        }

        let dir = max - min;
        let boundary = BoundingBox2D::new((dir / 2.0) + min, dir.x, dir.y);
        let mut new_tree = QuadTree::with_capacity(boundary, count);

        for (position, mass) in (&positions, &masses).join() {
            new_tree.insert(position.0, mass.0);
        }
        *quadtree = new_tree;
    }
}

pub struct ComputeNodeForce;

impl ComputeNodeForce {
    /// Computes the repel force between two nodes.
    fn repel_force(pos1: Vec2, pos2: Vec2, mass1: f32, mass2: f32, repel_force: f32) -> Vec2 {
        let dir_vec = pos2 - pos1;
        let length_sqr = dir_vec.length_squared();
        if length_sqr == 0.0 {
            return Vec2::ZERO;
        }

        let f = -repel_force * (mass1 * mass2).abs() / length_sqr;
        let dir_vec_normalized = dir_vec.normalize_or(Vec2::ZERO);
        let force = dir_vec_normalized * f;

        force.clamp(
            Vec2::new(-100000.0, -100000.0),
            Vec2::new(100000.0, 100000.0),
        )
    }
}

impl<'a> System<'a> for ComputeNodeForce {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Position>,
        ReadStorage<'a, Mass>,
        ReadStorage<'a, Fixed>,
        ReadStorage<'a, Dragged>,
        ReadStorage<'a, Pinned>,
        WriteStorage<'a, NodeForces>,
        ReadExpect<'a, QuadTree>,
        Read<'a, QuadTreeTheta>,
        Read<'a, RepelForce>,
    );

    fn run(
        &mut self,
        (
            entities,
            positions,
            masses,
            fixed,
            dragged,
            pinned,
            mut node_forces,
            quadtree,
            theta,
            repel_force,
        ): Self::SystemData,
    ) {
        // Fresh accumulators, also for held nodes, so a node released later
        // does not inherit a stale force.
        (&mut node_forces)
            .par_join()
            .for_each(|force| force.0 = Vec2::ZERO);

        (
            &*entities,
            &positions,
            &masses,
            &mut node_forces,
            !&fixed,
            !&dragged,
            !&pinned,
        )
            .par_join()
            .for_each(|(_entity, pos, mass, node_forces, _, _, _)| {
                for node_approximation in quadtree.stack(&pos.0, theta.0) {
                    node_forces.0 += Self::repel_force(
                        pos.0,
                        node_approximation.position(),
                        mass.0,
                        node_approximation.mass(),
                        repel_force.0,
                    );
                }
            });
    }
}

/// Pulls every free node towards the center of the canvas, on both axes
/// independently, so the graph cannot drift off-screen.
pub struct ComputeGravityForce;

impl<'a> System<'a> for ComputeGravityForce {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Position>,
        ReadStorage<'a, Mass>,
        ReadStorage<'a, Fixed>,
        ReadStorage<'a, Dragged>,
        ReadStorage<'a, Pinned>,
        WriteStorage<'a, NodeForces>,
        Read<'a, GravityForce>,
        Read<'a, WorldSize>,
    );

    fn run(
        &mut self,
        (entities, positions, masses, fixed, dragged, pinned, mut forces, gravity_force, world_size): Self::SystemData,
    ) {
        (
            &*entities,
            &positions,
            &masses,
            &mut forces,
            !&fixed,
            !&dragged,
            !&pinned,
        )
            .par_join()
            .for_each(|(_entity, pos, mass, force, _, _, _)| {
                force.0 += center_offset(pos.0, &world_size) * mass.0 * gravity_force.0;
            });
    }
}

/// Spring force along every link towards the configured rest length.
///
/// Forces are accumulated for both endpoints; whether an endpoint actually
/// moves is decided later by [`ApplyNodeForce`].
pub struct ComputeEdgeForces;

impl<'a> System<'a> for ComputeEdgeForces {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Connects>,
        WriteStorage<'a, NodeForces>,
        ReadStorage<'a, Position>,
        Read<'a, SpringStiffness>,
        Read<'a, SpringNeutralLength>,
    );

    fn run(
        &mut self,
        (entities, connections, mut forces, positions, spring_stiffness, spring_neutral_length): Self::SystemData,
    ) {
        for (entity, position, connects) in (&*entities, &positions, &connections).join() {
            for target in &connects.targets {
                let Some(target_position) = positions.get(*target) else {
                    continue;
                };
                let direction_vec = target_position.0 - position.0;

                let force_magnitude =
                    spring_stiffness.0 * (direction_vec.length() - spring_neutral_length.0);

                let spring_force = direction_vec.normalize_or(Vec2::ZERO) * force_magnitude;

                if let Some(force) = forces.get_mut(entity) {
                    force.0 += spring_force;
                }
                if let Some(force) = forces.get_mut(*target) {
                    force.0 -= spring_force;
                }
            }
        }
    }
}

pub struct ApplyNodeForce;

impl<'a> System<'a> for ApplyNodeForce {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Fixed>,
        ReadStorage<'a, Dragged>,
        ReadStorage<'a, Pinned>,
        ReadStorage<'a, NodeForces>,
        WriteStorage<'a, Velocity>,
        ReadStorage<'a, Mass>,
        Read<'a, DeltaTime>,
    );

    fn run(
        &mut self,
        (entities, fixed, dragged, pinned, forces, mut velocities, masses, delta_time): Self::SystemData,
    ) {
        (
            &*entities,
            &forces,
            &mut velocities,
            &masses,
            !&fixed,
            !&dragged,
            !&pinned,
        )
            .par_join()
            .for_each(|(_entity, force, velocity, mass, _, _, _)| {
                velocity.0 += force.0 / mass.0 * delta_time.0;
            });
    }
}
