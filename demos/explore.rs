//! Runs a canned exploration session headless and prints the layout.
//!
//! `RUST_LOG=debug cargo run --example explore` shows the engine's view of
//! every rebind.

use synapse_graph::collaborator::{CandidateLink, CandidateNode, DecomposedGraph};
use synapse_graph::session::Session;
use synapse_graph::simulator::SimulatorBuilder;

fn candidate(id: &str, label: &str, description: &str) -> CandidateNode {
    CandidateNode {
        id: id.into(),
        label: label.into(),
        description: description.into(),
    }
}

fn link(source: &str, target: &str, relationship: &str) -> CandidateLink {
    CandidateLink {
        source: source.into(),
        target: target.into(),
        relationship: Some(relationship.into()),
    }
}

fn decomposition() -> DecomposedGraph {
    DecomposedGraph {
        nodes: vec![
            candidate("gravity", "Gravity", "Attraction between masses"),
            candidate("spacetime", "Spacetime", "The stage curvature happens on"),
            candidate("orbits", "Orbits", "Falling and missing the ground"),
            candidate("tides", "Tides", "Differential pull across a body"),
        ],
        links: vec![
            link("gravity", "spacetime", "curves"),
            link("gravity", "orbits", "shapes"),
            link("gravity", "tides", "causes"),
        ],
    }
}

fn expansion() -> DecomposedGraph {
    DecomposedGraph {
        nodes: vec![
            candidate("geodesics", "Geodesics", "Straight lines in curved space"),
            candidate("time-dilation", "Time Dilation", "Clocks run slow in a well"),
        ],
        links: vec![
            link("spacetime", "geodesics", "defines"),
            link("spacetime", "time-dilation", "causes"),
        ],
    }
}

fn settle(session: &mut Session, frames: usize) {
    for _ in 0..frames {
        session.frame();
    }
}

fn print_layout(session: &Session) {
    let mut positions = session.simulator().positions();
    positions.sort_by(|a, b| a.0.cmp(&b.0));
    for (id, position) in positions {
        println!("  {id:>16}: ({:8.2}, {:8.2})", position.x, position.y);
    }
}

fn main() {
    env_logger::init();

    let simulator = SimulatorBuilder::new()
        .spring_neutral_length(80.0)
        .collision_radius(45.0)
        .build();
    let mut session = Session::new(simulator);

    session.begin_topic();
    session
        .complete_topic("Gravity", decomposition())
        .expect("fresh session accepts a topic");
    settle(&mut session, 600);
    println!("after decomposition:");
    print_layout(&session);

    session
        .begin_expand("spacetime")
        .expect("spacetime is not expanded yet");
    session
        .complete_expand("spacetime", expansion())
        .expect("expansion was in flight");
    settle(&mut session, 600);
    println!("after expanding 'spacetime':");
    print_layout(&session);

    println!(
        "context for an explanation request: {:?}",
        session.explanation_context()
    );
}
