//! Incremental force-directed engine for exploring knowledge graphs.
//!
//! The graph grows while the user explores it: a topic is decomposed into
//! concepts, concepts expand into more concepts, and every change lands in
//! a live physics simulation instead of restarting the layout.
//!
//! # Example
//! ```no_run
//!use synapse_graph::collaborator::DecomposedGraph;
//!use synapse_graph::session::Session;
//!use synapse_graph::simulator::SimulatorBuilder;
//!
//!let simulator = SimulatorBuilder::new()
//!    .spring_neutral_length(80.0)
//!    .collision_radius(45.0)
//!    .build();
//!
//!let mut session = Session::new(simulator);
//!session.begin_topic();
//!session
//!    .complete_topic("Entropy", DecomposedGraph::default())
//!    .unwrap();
//!
//!loop {
//!    session.frame();
//!    for (id, position) in session.simulator().positions() {
//!        println!("{id}: {position}");
//!    }
//!}
//! ```

pub mod collaborator;
pub mod filter;
pub mod graph;
pub mod interaction;
pub mod quadtree;
pub mod session;
pub mod simulator;

pub use graph::link::Link;
pub use graph::node::{ConceptNode, Explanation, NodeKind};
pub use graph::GraphStore;
pub use session::{Session, SessionState};
pub use simulator::{Simulator, SimulatorBuilder};
