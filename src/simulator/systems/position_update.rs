use crate::simulator::components::nodes::{Dragged, Fixed, Pinned, Position, Velocity};
use crate::simulator::ressources::simulator_vars::{
    CollisionRadius, Damping, DeltaTime, FreezeThreshold,
};
use glam::Vec2;
use rayon::prelude::*;
use specs::{Entities, Join, LazyUpdate, ParJoin, Read, ReadStorage, System, WriteStorage};

/// Integrates velocity into position and freezes nodes that came to rest.
///
/// A frozen node gets a [`Fixed`] marker and keeps it until the next reheat,
/// so a settled layout stops burning cycles.
pub struct UpdateNodePosition;

impl<'a> System<'a> for UpdateNodePosition {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Fixed>,
        ReadStorage<'a, Dragged>,
        ReadStorage<'a, Pinned>,
        WriteStorage<'a, Position>,
        WriteStorage<'a, Velocity>,
        Read<'a, DeltaTime>,
        Read<'a, Damping>,
        Read<'a, FreezeThreshold>,
        Read<'a, LazyUpdate>,
    );

    fn run(
        &mut self,
        (entities, fixed, dragged, pinned, mut positions, mut velocities, delta_time, damping, freeze_threshold, lazy): Self::SystemData,
    ) {
        (
            &*entities,
            &mut positions,
            &mut velocities,
            !&fixed,
            !&dragged,
            !&pinned,
        )
            .par_join()
            .for_each(|(entity, position, velocity, _, _, _)| {
                velocity.0 *= damping.0;
                position.0 += velocity.0 * delta_time.0;

                if velocity.0.length() < freeze_threshold.0 {
                    velocity.0 = Vec2::ZERO;
                    lazy.insert(entity, Fixed);
                }
            });
    }
}

/// Pushes overlapping node circles apart after integration.
///
/// Works on positions directly instead of forces, which keeps large clusters
/// from oscillating. Dragged and pinned nodes never move; the overlap is
/// resolved entirely by the other endpoint.
pub struct ResolveCollisions;

impl<'a> System<'a> for ResolveCollisions {
    type SystemData = (
        Entities<'a>,
        ReadStorage<'a, Dragged>,
        ReadStorage<'a, Pinned>,
        WriteStorage<'a, Position>,
        Read<'a, CollisionRadius>,
    );

    fn run(&mut self, (entities, dragged, pinned, mut positions, radius): Self::SystemData) {
        if radius.0 <= 0.0 {
            return;
        }
        let min_separation = radius.0 * 2.0;

        let snapshot: Vec<(specs::Entity, Vec2, bool)> = (&*entities, &positions)
            .join()
            .map(|(entity, position)| {
                let movable = !dragged.contains(entity) && !pinned.contains(entity);
                (entity, position.0, movable)
            })
            .collect();

        for i in 0..snapshot.len() {
            for j in (i + 1)..snapshot.len() {
                let (entity_a, pos_a, movable_a) = snapshot[i];
                let (entity_b, pos_b, movable_b) = snapshot[j];
                if !movable_a && !movable_b {
                    continue;
                }

                let dir_vec = pos_b - pos_a;
                let distance = dir_vec.length();
                if distance >= min_separation {
                    continue;
                }

                // Coincident centers have no direction to separate along.
                let direction = if distance == 0.0 {
                    Vec2::X
                } else {
                    dir_vec / distance
                };
                let overlap = min_separation - distance;

                match (movable_a, movable_b) {
                    (true, true) => {
                        let half = direction * (overlap / 2.0);
                        if let Some(position) = positions.get_mut(entity_a) {
                            position.0 -= half;
                        }
                        if let Some(position) = positions.get_mut(entity_b) {
                            position.0 += half;
                        }
                    }
                    (true, false) => {
                        if let Some(position) = positions.get_mut(entity_a) {
                            position.0 -= direction * overlap;
                        }
                    }
                    (false, true) => {
                        if let Some(position) = positions.get_mut(entity_b) {
                            position.0 += direction * overlap;
                        }
                    }
                    (false, false) => unreachable!(),
                }
            }
        }
    }
}
