//! Links between concepts.

/// An association between two node ids.
///
/// Stored with a direction (the decomposition collaborator links parents to
/// children) but treated as undirected for rendering, adjacency and
/// duplicate checks.
#[derive(Clone, Debug, PartialEq)]
pub struct Link {
    pub source: String,
    pub target: String,
    /// Verb describing the connection, e.g. "contains" or "leads to".
    pub relationship: Option<String>,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: None,
        }
    }

    pub fn with_relationship(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relationship: Some(relationship.into()),
        }
    }

    /// Whether this link connects `a` and `b`, in either direction.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        (self.source == a && self.target == b) || (self.source == b && self.target == a)
    }

    /// Whether this link has `id` at either endpoint.
    pub fn touches(&self, id: &str) -> bool {
        self.source == id || self.target == id
    }
}
