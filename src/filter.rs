//! Non-destructive search over the concept graph.

use crate::graph::link::Link;
use crate::graph::node::ConceptNode;
use crate::graph::GraphStore;

/// What the canvas should show for the current search query.
///
/// Filtering never touches the store; a cleared query falls back to the full
/// graph by reference.
pub enum GraphView<'a> {
    Full(&'a GraphStore),
    Filtered {
        nodes: Vec<&'a ConceptNode>,
        links: Vec<Link>,
    },
}

impl<'a> GraphView<'a> {
    pub fn node_count(&self) -> usize {
        match self {
            GraphView::Full(store) => store.node_count(),
            GraphView::Filtered { nodes, .. } => nodes.len(),
        }
    }

    pub fn link_count(&self) -> usize {
        match self {
            GraphView::Full(store) => store.link_count(),
            GraphView::Filtered { links, .. } => links.len(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            GraphView::Full(store) => store.node(id).is_some(),
            GraphView::Filtered { nodes, .. } => nodes.iter().any(|node| node.id == id),
        }
    }
}

/// Restricts the view to nodes whose label contains `query`, ignoring case.
///
/// A link survives only when both of its endpoints do.
pub fn filter<'a>(store: &'a GraphStore, query: &str) -> GraphView<'a> {
    let query = query.trim();
    if query.is_empty() {
        return GraphView::Full(store);
    }
    let needle = query.to_lowercase();

    let nodes: Vec<&ConceptNode> = store
        .nodes()
        .filter(|node| node.label.to_lowercase().contains(&needle))
        .collect();
    let links: Vec<Link> = store
        .links()
        .filter(|link| {
            nodes.iter().any(|node| node.id == link.source)
                && nodes.iter().any(|node| node.id == link.target)
        })
        .collect();

    GraphView::Filtered { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{ConceptNode, NodeKind};

    fn store() -> GraphStore {
        let mut store = GraphStore::new();
        store.insert_nodes(
            vec![
                ConceptNode::new("1", "Quantum Entanglement", "", NodeKind::Root, 1),
                ConceptNode::new("2", "Quantum State", "", NodeKind::Concept, 2),
                ConceptNode::new("3", "Bell Inequality", "", NodeKind::Concept, 2),
            ],
            vec![Link::new("1", "2"), Link::new("1", "3"), Link::new("2", "3")],
        );
        store
    }

    #[test]
    fn blank_query_returns_the_full_graph() {
        let store = store();
        assert!(matches!(filter(&store, ""), GraphView::Full(_)));
        assert!(matches!(filter(&store, "   "), GraphView::Full(_)));
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let store = store();
        let view = filter(&store, "quantum");
        assert_eq!(view.node_count(), 2);
        assert!(view.contains("1"));
        assert!(view.contains("2"));
        assert!(!view.contains("3"));
    }

    #[test]
    fn links_need_both_endpoints_visible() {
        let store = store();
        let view = filter(&store, "quantum");
        // Only 1 <-> 2 survives; the links into "Bell Inequality" do not.
        assert_eq!(view.link_count(), 1);
    }

    #[test]
    fn filtering_leaves_the_store_untouched() {
        let store = store();
        let _ = filter(&store, "bell");
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.link_count(), 3);
    }
}
