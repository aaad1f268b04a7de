//! The canonical mutable graph and its derived sets.
//!
//! The store owns nodes, links, the ordered selection set, the saved
//! library and the undo buffer for the most recent delete. It holds no
//! physics or rendering state; positions live in the simulator's registry.

pub mod link;
pub mod node;

use link::Link;
use node::{ConceptNode, Explanation};

use log::debug;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a delete can be undone before its snapshot expires.
pub const UNDO_TIMEOUT: Duration = Duration::from_secs(5);

/// User actions rejected synchronously, with a user-facing message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("select at least 2 nodes to link")]
    SelectionTooSmall,
}

/// The nodes and links removed by a delete operation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemovedSubgraph {
    pub nodes: Vec<ConceptNode>,
    pub links: Vec<Link>,
}

impl RemovedSubgraph {
    pub fn node_ids(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }
}

/// Outcome of a delete.
#[derive(Debug, Default)]
pub struct Removal {
    pub removed: RemovedSubgraph,
    /// Ids from a previous undo snapshot that this delete displaced.
    /// Their simulation records can no longer be restored and should be
    /// evicted by the caller.
    pub displaced: Vec<String>,
}

struct UndoState {
    snapshot: RemovedSubgraph,
    expires_at: Instant,
}

/// The canonical graph plus selection, saved library and undo buffer.
pub struct GraphStore {
    graph: StableDiGraph<ConceptNode, Option<String>>,
    index: HashMap<String, NodeIndex>,
    selection: Vec<String>,
    saved: Vec<ConceptNode>,
    undo: Option<UndoState>,
    undo_timeout: Duration,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::with_undo_timeout(UNDO_TIMEOUT)
    }

    /// A store whose undo buffer expires after `timeout`.
    pub fn with_undo_timeout(timeout: Duration) -> Self {
        Self {
            graph: StableDiGraph::new(),
            index: HashMap::new(),
            selection: Vec::new(),
            saved: Vec::new(),
            undo: None,
            undo_timeout: timeout,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.index.get(id).and_then(|&ix| self.graph.node_weight(ix))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ConceptNode> {
        self.graph.node_weights()
    }

    /// Materializes every link with its endpoint ids.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.graph.edge_references().map(|e| Link {
            source: self.graph[e.source()].id.clone(),
            target: self.graph[e.target()].id.clone(),
            relationship: e.weight().clone(),
        })
    }

    /// Whether `a` and `b` are linked in either direction.
    pub fn linked(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&ia), Some(&ib)) => {
                self.graph.find_edge(ia, ib).is_some() || self.graph.find_edge(ib, ia).is_some()
            }
            _ => false,
        }
    }

    /// Adds the given nodes and links.
    ///
    /// Nodes whose id is already present are ignored, not overwritten.
    /// Links referencing a missing node are dropped silently.
    /// Returns the number of nodes actually inserted.
    pub fn insert_nodes(&mut self, nodes: Vec<ConceptNode>, links: Vec<Link>) -> usize {
        let mut inserted = 0;
        for node in nodes {
            if self.index.contains_key(&node.id) {
                debug!("ignoring duplicate node {}", node.id);
                continue;
            }
            let id = node.id.clone();
            let ix = self.graph.add_node(node);
            self.index.insert(id, ix);
            inserted += 1;
        }
        for l in links {
            match (self.index.get(&l.source), self.index.get(&l.target)) {
                (Some(&s), Some(&t)) => {
                    self.graph.add_edge(s, t, l.relationship);
                }
                _ => debug!("dropping dangling link {} -> {}", l.source, l.target),
            }
        }
        inserted
    }

    /// Removes the given nodes and every link touching them.
    ///
    /// Arms the undo buffer with a snapshot of exactly what was removed,
    /// replacing any previous snapshot. Stale selection entries are purged.
    pub fn remove_nodes(&mut self, ids: &[String]) -> Removal {
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let doomed: Vec<NodeIndex> = ids.iter().filter_map(|id| self.index.get(id).copied()).collect();
        if doomed.is_empty() {
            return Removal::default();
        }

        let links: Vec<Link> = self
            .links()
            .filter(|l| id_set.contains(l.source.as_str()) || id_set.contains(l.target.as_str()))
            .collect();
        let mut nodes = Vec::with_capacity(doomed.len());
        for ix in doomed {
            // remove_node cascades the incident edges
            if let Some(node) = self.graph.remove_node(ix) {
                self.index.remove(&node.id);
                nodes.push(node);
            }
        }
        self.selection.retain(|id| !id_set.contains(id.as_str()));

        let removed = RemovedSubgraph { nodes, links };
        let displaced = self
            .undo
            .replace(UndoState {
                snapshot: removed.clone(),
                expires_at: Instant::now() + self.undo_timeout,
            })
            .map(|prev| prev.snapshot.node_ids())
            .unwrap_or_default();
        Removal { removed, displaced }
    }

    /// Re-inserts the most recently deleted subgraph, if the undo buffer
    /// has not expired. Returns the restored node ids.
    pub fn undo_delete(&mut self) -> Option<Vec<String>> {
        let armed = self.undo.as_ref()?;
        if Instant::now() >= armed.expires_at {
            // Left for take_expired_undo so the caller still evicts it.
            return None;
        }
        let state = self.undo.take()?;
        let ids = state.snapshot.node_ids();
        self.insert_nodes(state.snapshot.nodes, state.snapshot.links);
        Some(ids)
    }

    /// Drops the undo buffer without restoring. Returns the ids whose
    /// simulation records should now be evicted.
    pub fn dismiss_undo(&mut self) -> Vec<String> {
        self.undo
            .take()
            .map(|s| s.snapshot.node_ids())
            .unwrap_or_default()
    }

    /// Polled once per frame: clears an expired undo buffer and returns the
    /// ids whose simulation records should now be evicted.
    pub fn take_expired_undo(&mut self) -> Vec<String> {
        if self
            .undo
            .as_ref()
            .is_some_and(|s| Instant::now() >= s.expires_at)
        {
            return self.dismiss_undo();
        }
        Vec::new()
    }

    pub fn undo_armed(&self) -> bool {
        self.undo.is_some()
    }

    /// Links each consecutive pair of the given ids, skipping pairs that
    /// are already linked in either direction. Returns the number of links
    /// created.
    pub fn link_chain(&mut self, ids: &[String]) -> Result<usize, GraphError> {
        if ids.len() < 2 {
            return Err(GraphError::SelectionTooSmall);
        }
        let mut created = 0;
        for pair in ids.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            if self.linked(a, b) {
                continue;
            }
            match (self.index.get(a), self.index.get(b)) {
                (Some(&s), Some(&t)) => {
                    self.graph.add_edge(s, t, None);
                    created += 1;
                }
                _ => debug!("skipping link for unknown id in chain"),
            }
        }
        Ok(created)
    }

    /// Removes every link whose both endpoints are in the given id set.
    /// Links with only one endpoint inside are preserved.
    pub fn unlink_among(&mut self, ids: &[String]) -> usize {
        let id_set: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let doomed: Vec<EdgeIndex> = self
            .graph
            .edge_references()
            .filter(|e| {
                id_set.contains(self.graph[e.source()].id.as_str())
                    && id_set.contains(self.graph[e.target()].id.as_str())
            })
            .map(|e| e.id())
            .collect();
        for e in &doomed {
            self.graph.remove_edge(*e);
        }
        doomed.len()
    }

    /// Replaces a node's user-authored explanation. No-op if `id` is absent.
    pub fn set_node_content(&mut self, id: &str, content: Explanation) {
        if let Some(&ix) = self.index.get(id) {
            if let Some(node) = self.graph.node_weight_mut(ix) {
                node.content = Some(content);
            }
        }
    }

    /// Marks a node's children as fetched. No-op if `id` is absent.
    pub fn mark_expanded(&mut self, id: &str) {
        if let Some(&ix) = self.index.get(id) {
            if let Some(node) = self.graph.node_weight_mut(ix) {
                node.expanded = true;
            }
        }
    }

    //// Selection ////

    /// The current selection, in the order the nodes were selected.
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Toggles a node's selection membership.
    ///
    /// Adding past `cap` is silently ignored (soft cap). Unknown ids are
    /// ignored. Returns whether the selection changed.
    pub fn toggle_select(&mut self, id: &str, cap: Option<usize>) -> bool {
        if let Some(at) = self.selection.iter().position(|s| s == id) {
            self.selection.remove(at);
            return true;
        }
        if !self.contains(id) {
            return false;
        }
        if cap.is_some_and(|cap| self.selection.len() >= cap) {
            debug!("selection cap reached, ignoring {id}");
            return false;
        }
        self.selection.push(id.to_owned());
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    //// Saved library ////

    /// Promotes a node to the saved library. Idempotent; unknown ids are
    /// ignored. Returns whether the node was newly saved.
    pub fn save(&mut self, id: &str) -> bool {
        if self.is_saved(id) {
            return false;
        }
        match self.node(id) {
            Some(node) => {
                self.saved.push(node.clone());
                true
            }
            None => false,
        }
    }

    pub fn toggle_saved(&mut self, id: &str) {
        if self.is_saved(id) {
            self.remove_saved(id);
        } else {
            self.save(id);
        }
    }

    pub fn remove_saved(&mut self, id: &str) {
        self.saved.retain(|n| n.id != id);
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved.iter().any(|n| n.id == id)
    }

    /// Library entries are clones; they survive later edits to the graph.
    pub fn saved(&self) -> &[ConceptNode] {
        &self.saved
    }

    /// Clears the graph, selection and undo buffer for a fresh topic.
    /// The saved library survives; only [`Self::reset`] drops it.
    pub fn clear_graph(&mut self) {
        self.graph.clear();
        self.index.clear();
        self.selection.clear();
        self.undo = None;
    }

    /// Clears everything: graph, selection, library and undo buffer.
    pub fn reset(&mut self) {
        self.clear_graph();
        self.saved.clear();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::node::NodeKind;
    use super::*;

    fn concept(id: &str) -> ConceptNode {
        ConceptNode::new(id, id.to_uppercase(), "", NodeKind::Concept, 1)
    }

    fn store_with(ids: &[&str], links: &[(&str, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        store.insert_nodes(
            ids.iter().map(|id| concept(id)).collect(),
            links.iter().map(|(s, t)| Link::new(*s, *t)).collect(),
        );
        store
    }

    #[test]
    fn duplicate_ids_are_ignored_not_overwritten() {
        let mut store = store_with(&["a"], &[]);
        let mut replacement = concept("a");
        replacement.label = "other".into();
        assert_eq!(store.insert_nodes(vec![replacement], vec![]), 0);
        assert_eq!(store.node("a").unwrap().label, "A");
    }

    #[test]
    fn dangling_links_are_dropped_silently() {
        let mut store = store_with(&["a"], &[]);
        store.insert_nodes(vec![], vec![Link::new("a", "ghost")]);
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn deletion_cascades_to_touching_links() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("a", "c")]);
        let removal = store.remove_nodes(&["b".into()]);
        assert_eq!(removal.removed.nodes.len(), 1);
        assert_eq!(removal.removed.links.len(), 2);
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.link_count(), 1);
        assert!(store.linked("a", "c"));
    }

    #[test]
    fn deletion_purges_selection() {
        let mut store = store_with(&["a", "b"], &[]);
        store.toggle_select("a", None);
        store.toggle_select("b", None);
        store.remove_nodes(&["a".into()]);
        assert_eq!(store.selection(), ["b".to_string()]);
    }

    #[test]
    fn undo_round_trip_restores_isomorphic_graph() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        store.remove_nodes(&["b".into()]);
        assert_eq!(store.node_count(), 2);
        let restored = store.undo_delete().unwrap();
        assert_eq!(restored, vec!["b".to_string()]);
        assert_eq!(store.node_count(), 3);
        assert_eq!(store.link_count(), 2);
        assert!(store.linked("a", "b"));
        assert!(store.linked("b", "c"));
        assert!(!store.undo_armed());
    }

    #[test]
    fn undo_expires_after_timeout() {
        let mut store = GraphStore::with_undo_timeout(Duration::from_millis(10));
        store.insert_nodes(vec![concept("a")], vec![]);
        store.remove_nodes(&["a".into()]);
        std::thread::sleep(Duration::from_millis(20));
        assert!(store.undo_delete().is_none());
        assert_eq!(store.take_expired_undo(), vec!["a".to_string()]);
        assert!(!store.undo_armed());
        assert_eq!(store.node_count(), 0);
    }

    #[test]
    fn new_delete_displaces_previous_snapshot() {
        let mut store = store_with(&["a", "b"], &[]);
        store.remove_nodes(&["a".into()]);
        let removal = store.remove_nodes(&["b".into()]);
        assert_eq!(removal.displaced, vec!["a".to_string()]);
        // Only the latest delete can be undone.
        store.undo_delete().unwrap();
        assert!(store.contains("b"));
        assert!(!store.contains("a"));
    }

    #[test]
    fn chain_links_consecutive_pairs_once() {
        let mut store = store_with(&["a", "b", "c"], &[("b", "a")]);
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        // (a,b) exists as b->a and must be skipped in either direction.
        assert_eq!(store.link_chain(&ids).unwrap(), 1);
        assert!(store.linked("b", "c"));
        assert_eq!(store.link_count(), 2);
    }

    #[test]
    fn chain_rejects_fewer_than_two_ids() {
        let mut store = store_with(&["a"], &[]);
        assert_eq!(
            store.link_chain(&["a".to_string()]),
            Err(GraphError::SelectionTooSmall)
        );
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn unlink_spares_links_with_one_endpoint_outside() {
        let mut store = store_with(&["a", "b", "c"], &[("a", "b"), ("b", "c")]);
        let removed = store.unlink_among(&["a".to_string(), "b".to_string()]);
        assert_eq!(removed, 1);
        assert!(!store.linked("a", "b"));
        assert!(store.linked("b", "c"));
    }

    #[test]
    fn selection_soft_cap_keeps_existing_members() {
        let mut store = store_with(&["a", "b", "c", "d"], &[]);
        for id in ["a", "b", "c"] {
            assert!(store.toggle_select(id, Some(3)));
        }
        assert!(!store.toggle_select("d", Some(3)));
        assert_eq!(store.selection().len(), 3);
        // Toggling an existing member off always works.
        assert!(store.toggle_select("b", Some(3)));
        assert_eq!(store.selection(), ["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn saved_library_survives_node_deletion() {
        let mut store = store_with(&["a", "b"], &[]);
        assert!(store.save("a"));
        assert!(!store.save("a"));
        store.remove_nodes(&["a".into()]);
        assert!(store.is_saved("a"));
        assert_eq!(store.saved().len(), 1);
    }

    #[test]
    fn clearing_for_a_new_topic_keeps_the_library() {
        let mut store = store_with(&["a", "b"], &[("a", "b")]);
        store.save("a");
        store.toggle_select("b", None);

        store.clear_graph();
        assert_eq!(store.node_count(), 0);
        assert_eq!(store.link_count(), 0);
        assert!(store.selection().is_empty());
        assert!(store.is_saved("a"));

        store.reset();
        assert!(store.saved().is_empty());
    }

    #[test]
    fn content_update_is_noop_for_unknown_id() {
        let mut store = store_with(&["a"], &[]);
        let content = Explanation {
            definition: "def".into(),
            analogy: "like".into(),
            key_facts: vec!["fact".into()],
        };
        store.set_node_content("ghost", content.clone());
        store.set_node_content("a", content.clone());
        assert_eq!(store.node("a").unwrap().content, Some(content));
    }
}
