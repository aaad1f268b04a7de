//! Ressources used by the graph simulator.

/// How strong nodes should push others away.
#[derive(Default)]
pub struct RepelForce(pub f32);

/// How strong the edge spring force should be.
#[derive(Default)]
pub struct SpringStiffness(pub f32);

/// Length of an edge in neutral position.
///
/// If the edge is shorter it pushes apart.
/// If the edge is longer it pulls together.
#[derive(Default)]
pub struct SpringNeutralLength(pub f32);

/// How strong the pull towards the canvas center should be.
#[derive(Default)]
pub struct GravityForce(pub f32);

/// How much time a simulation step should simulate, measured in seconds.
#[derive(Default)]
pub struct DeltaTime(pub f32);

/// Amount of damping that should be applied to the node's movement.
#[derive(Default)]
pub struct Damping(pub f32);

/// How accurate the repulsion calculations should be.
#[derive(Default)]
pub struct QuadTreeTheta(pub f32);

/// Freeze nodes when their velocity falls below this number.
#[derive(Default)]
pub struct FreezeThreshold(pub f32);

/// Minimum-separation radius of a node circle.
///
/// Two free nodes are pushed apart until their centers are at least two
/// radii apart. `0` disables collision resolution.
#[derive(Default)]
pub struct CollisionRadius(pub f32);

/// Canvas size. The centering force targets its midpoint.
pub struct WorldSize {
    pub width: u32,
    pub height: u32,
}

impl Default for WorldSize {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}
