//! Plain-data boundary with the external generative collaborators.
//!
//! The collaborators themselves (topic decomposition, concept explanation,
//! synthesis) live outside this crate; the engine only consumes their
//! structured answers and produces the context they need.

use serde::Deserialize;

pub use crate::graph::node::Explanation;

/// How many context labels accompany an explanation request.
pub const EXPLANATION_CONTEXT_LIMIT: usize = 5;

/// A candidate node returned by the decomposition collaborator.
///
/// The collaborator may suggest a category, but the store decides which
/// node becomes the root, so only identity and display data are consumed.
#[derive(Clone, Debug, Deserialize)]
pub struct CandidateNode {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

/// A candidate link returned by the decomposition collaborator.
#[derive(Clone, Debug, Deserialize)]
pub struct CandidateLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub relationship: Option<String>,
}

/// The decomposition collaborator's answer for one topic.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DecomposedGraph {
    pub nodes: Vec<CandidateNode>,
    pub links: Vec<CandidateLink>,
}

/// Display-only result of synthesizing selected concepts.
/// Never stored in the graph.
#[derive(Clone, Debug, Deserialize)]
pub struct Synthesis {
    pub title: String,
    pub connection: String,
    pub insight: String,
}
