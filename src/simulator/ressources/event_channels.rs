//! Event channels for updating force parameters from the outside.
//!
//! Writes are drained into the matching ressource between integration
//! steps, so a parameter change never lands mid-step.

use specs::shrev::EventChannel;

#[derive(Default)]
pub struct RepelForceChan(pub EventChannel<f32>);

#[derive(Default)]
pub struct SpringNeutralChan(pub EventChannel<f32>);

#[derive(Default)]
pub struct CollisionRadiusChan(pub EventChannel<f32>);
