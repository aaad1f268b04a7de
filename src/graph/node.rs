//! The concept entities which make up a knowledge graph.

use serde::{Deserialize, Serialize};

/// Category of a node.
///
/// The first concept of a fresh session becomes the root; everything
/// discovered afterwards is a plain concept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    Concept,
}

impl NodeKind {
    /// Simulation mass of a node of this kind.
    ///
    /// The root is heavier, so it repels harder and drifts less.
    pub fn mass(self) -> f32 {
        match self {
            NodeKind::Root => 1.5,
            NodeKind::Concept => 1.0,
        }
    }

    /// Visual radius of a node of this kind, in pixels.
    pub fn radius(self) -> f32 {
        match self {
            NodeKind::Root => 35.0,
            NodeKind::Concept => 22.0,
        }
    }
}

/// Structured explanation content for a concept.
///
/// Either returned by the explanation collaborator or authored by the user.
/// A user-authored explanation overrides generated content.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub definition: String,
    pub analogy: String,
    #[serde(rename = "keyFacts")]
    pub key_facts: Vec<String>,
}

/// A concept in the canonical graph.
///
/// Simulation state (position, velocity, pin) is deliberately absent here;
/// it is owned by the registry record for this node's id.
#[derive(Clone, Debug, PartialEq)]
pub struct ConceptNode {
    /// Stable identifier, assigned externally and never regenerated.
    pub id: String,
    pub label: String,
    pub description: String,
    pub kind: NodeKind,
    /// Whether this node's children have already been fetched.
    pub expanded: bool,
    /// Generation depth from the root.
    pub group: u32,
    /// User-authored content overriding generated explanations.
    pub content: Option<Explanation>,
}

impl ConceptNode {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        kind: NodeKind,
        group: u32,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
            kind,
            expanded: false,
            group,
            content: None,
        }
    }
}
