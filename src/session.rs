//! One exploration session: store, simulator and controller behind a
//! single state machine.
//!
//! Collaborator calls happen outside this crate; the session exposes a
//! begin/complete/fail pair per call so the caller can drive them async
//! while the engine keeps stepping.

use glam::Vec2;
use log::{debug, info};
use thiserror::Error;
use winit::event::MouseButton;

use crate::collaborator::{DecomposedGraph, EXPLANATION_CONTEXT_LIMIT};
use crate::filter::{self, GraphView};
use crate::graph::link::Link;
use crate::graph::node::{ConceptNode, Explanation, NodeKind};
use crate::graph::{GraphError, GraphStore};
use crate::interaction::{DropZone, InteractionController, Mode, PressAction, ReleaseAction};
use crate::simulator::registry::DeclaredNode;
use crate::simulator::Simulator;

/// Manual node descriptions get cut to this many characters.
const MANUAL_DESCRIPTION_LIMIT: usize = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// Waiting for the decomposition of a fresh topic.
    LoadingGraph,
    /// The normal interactive state.
    Exploring,
    /// Waiting for the children of the named node.
    ExpandingNode(String),
    /// Waiting for a synthesis of the selection.
    Synthesizing,
    Error(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error("select at least 2 nodes to synthesize")]
    SynthesisTooSmall,
    #[error("node {0} is already expanded")]
    AlreadyExpanded(String),
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("another operation is still in flight")]
    Busy,
}

pub struct Session<'a, 'b> {
    store: GraphStore,
    simulator: Simulator<'a, 'b>,
    controller: InteractionController,
    state: SessionState,
    manual_counter: u32,
}

impl<'a, 'b> Session<'a, 'b> {
    pub fn new(simulator: Simulator<'a, 'b>) -> Self {
        Self {
            store: GraphStore::new(),
            simulator,
            controller: InteractionController::new(),
            state: SessionState::Idle,
            manual_counter: 0,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GraphStore {
        &mut self.store
    }

    pub fn simulator(&self) -> &Simulator<'a, 'b> {
        &self.simulator
    }

    pub fn simulator_mut(&mut self) -> &mut Simulator<'a, 'b> {
        &mut self.simulator
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    //// Topic decomposition ////

    /// Starts a fresh exploration. The previous topic's graph, selection
    /// and undo buffer are discarded; the saved library carries over.
    pub fn begin_topic(&mut self) {
        self.store.clear_graph();
        self.simulator.clear();
        self.state = SessionState::LoadingGraph;
    }

    /// Accepts the decomposition of the topic started by [`Self::begin_topic`].
    ///
    /// The candidate whose label matches the topic becomes the root; when
    /// none matches, the first candidate does.
    pub fn complete_topic(
        &mut self,
        topic: &str,
        graph: DecomposedGraph,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::LoadingGraph {
            return Err(SessionError::Busy);
        }

        let root_id = graph
            .nodes
            .iter()
            .find(|node| node.label.eq_ignore_ascii_case(topic))
            .or_else(|| graph.nodes.first())
            .map(|node| node.id.clone());

        let nodes: Vec<ConceptNode> = graph
            .nodes
            .into_iter()
            .map(|candidate| {
                let (kind, group) = if Some(&candidate.id) == root_id.as_ref() {
                    (NodeKind::Root, 1)
                } else {
                    (NodeKind::Concept, 2)
                };
                ConceptNode::new(candidate.id, candidate.label, candidate.description, kind, group)
            })
            .collect();
        let links: Vec<Link> = graph
            .links
            .into_iter()
            .map(|link| Link {
                source: link.source,
                target: link.target,
                relationship: link.relationship,
            })
            .collect();

        info!("topic '{topic}' decomposed into {0} nodes", nodes.len());
        self.store.insert_nodes(nodes, links);
        self.resync();
        self.state = SessionState::Exploring;
        Ok(())
    }

    pub fn fail_topic(&mut self, message: impl Into<String>) {
        self.state = SessionState::Error(message.into());
    }

    //// Node expansion ////

    /// Starts expanding a node. Rejected while another call is in flight,
    /// for unknown nodes, and for nodes already expanded.
    pub fn begin_expand(&mut self, id: &str) -> Result<(), SessionError> {
        if self.state != SessionState::Exploring {
            return Err(SessionError::Busy);
        }
        let node = self
            .store
            .node(id)
            .ok_or_else(|| SessionError::UnknownNode(id.to_owned()))?;
        if node.expanded {
            return Err(SessionError::AlreadyExpanded(id.to_owned()));
        }
        self.state = SessionState::ExpandingNode(id.to_owned());
        Ok(())
    }

    /// Accepts the children of the node being expanded.
    ///
    /// Children land one generation below their parent. Candidates whose id
    /// already exists merge into the graph as new links only.
    pub fn complete_expand(
        &mut self,
        id: &str,
        graph: DecomposedGraph,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::ExpandingNode(id.to_owned()) {
            return Err(SessionError::Busy);
        }
        let parent_group = self
            .store
            .node(id)
            .map(|node| node.group)
            .ok_or_else(|| SessionError::UnknownNode(id.to_owned()))?;

        let nodes: Vec<ConceptNode> = graph
            .nodes
            .into_iter()
            .map(|candidate| {
                ConceptNode::new(
                    candidate.id,
                    candidate.label,
                    candidate.description,
                    NodeKind::Concept,
                    parent_group + 1,
                )
            })
            .collect();
        let links: Vec<Link> = graph
            .links
            .into_iter()
            .map(|link| Link {
                source: link.source,
                target: link.target,
                relationship: link.relationship,
            })
            .collect();

        debug!("[{id}] expanded with {0} candidates", nodes.len());
        self.store.insert_nodes(nodes, links);
        self.store.mark_expanded(id);
        self.resync();
        self.state = SessionState::Exploring;
        Ok(())
    }

    /// Abandons the in-flight expansion; the node stays expandable.
    pub fn fail_expand(&mut self, message: impl Into<String>) {
        self.state = SessionState::Error(message.into());
    }

    /// Returns to exploring after an error was shown.
    pub fn acknowledge_error(&mut self) {
        if matches!(self.state, SessionState::Error(_)) {
            self.state = if self.store.node_count() == 0 {
                SessionState::Idle
            } else {
                SessionState::Exploring
            };
        }
    }

    //// Synthesis ////

    /// Starts synthesizing the selection and returns the labels the
    /// collaborator should reason about, in selection order.
    pub fn begin_synthesis(&mut self) -> Result<Vec<String>, SessionError> {
        if self.state != SessionState::Exploring {
            return Err(SessionError::Busy);
        }
        if self.store.selection().len() < 2 {
            return Err(SessionError::SynthesisTooSmall);
        }
        self.state = SessionState::Synthesizing;
        Ok(self.synthesis_labels())
    }

    /// Labels of the current selection, in the order they were selected.
    pub fn synthesis_labels(&self) -> Vec<String> {
        self.store
            .selection()
            .iter()
            .filter_map(|id| self.store.node(id))
            .map(|node| node.label.clone())
            .collect()
    }

    /// Ends a synthesis. The result is display-only and never enters the
    /// graph, so there is nothing to merge.
    pub fn end_synthesis(&mut self) {
        if self.state == SessionState::Synthesizing {
            self.state = SessionState::Exploring;
        }
    }

    //// Manual authoring ////

    /// Inserts a user-authored node, returning its generated id.
    pub fn add_manual_node(&mut self, label: &str, content: Explanation) -> String {
        self.manual_counter += 1;
        let id = format!("manual-{}", self.manual_counter);

        let mut description: String = content
            .definition
            .chars()
            .take(MANUAL_DESCRIPTION_LIMIT)
            .collect();
        if content.definition.chars().count() > MANUAL_DESCRIPTION_LIMIT {
            description.push_str("...");
        }

        let mut node = ConceptNode::new(&id, label, description, NodeKind::Concept, 2);
        node.content = Some(content);
        self.store.insert_nodes(vec![node], vec![]);
        self.resync();
        id
    }

    /// Replaces a node's explanation with user-authored content.
    pub fn update_node_content(&mut self, id: &str, content: Explanation) {
        self.store.set_node_content(id, content);
    }

    //// Editing ////

    /// Deletes the selected nodes and arms the undo buffer.
    pub fn delete_selection(&mut self) {
        let ids = self.store.selection().to_vec();
        if ids.is_empty() {
            return;
        }
        let removal = self.store.remove_nodes(&ids);
        // A new delete overwrites the undo snapshot; whatever it displaced
        // can never be restored.
        self.simulator.evict(&removal.displaced);
        self.resync();
    }

    /// Restores the most recent delete. Revived nodes come back at the
    /// positions they were removed from.
    pub fn undo_delete(&mut self) -> bool {
        match self.store.undo_delete() {
            Some(ids) => {
                info!("restored {0} deleted nodes", ids.len());
                self.resync();
                true
            }
            None => false,
        }
    }

    /// Dismisses the undo prompt and forgets the deleted nodes for good.
    pub fn dismiss_undo(&mut self) {
        let evicted = self.store.dismiss_undo();
        self.simulator.evict(&evicted);
    }

    /// Links the selection as a chain, in selection order.
    pub fn link_selection(&mut self) -> Result<usize, SessionError> {
        let ids = self.store.selection().to_vec();
        let created = self.store.link_chain(&ids)?;
        self.resync();
        Ok(created)
    }

    /// Removes every link running between selected nodes.
    pub fn unlink_selection(&mut self) -> usize {
        let ids = self.store.selection().to_vec();
        let removed = self.store.unlink_among(&ids);
        if removed > 0 {
            self.resync();
        }
        removed
    }

    //// Per-frame driving ////

    /// Advances the engine by one frame: expires the undo buffer if its
    /// window passed, then steps the simulation.
    pub fn frame(&mut self) {
        let expired = self.store.take_expired_undo();
        if !expired.is_empty() {
            debug!("undo window expired for {0} nodes", expired.len());
            self.simulator.evict(&expired);
        }
        self.simulator.step();
    }

    /// Drops everything and returns to the idle state.
    pub fn reset(&mut self) {
        self.store.reset();
        self.simulator.clear();
        self.manual_counter = 0;
        self.state = SessionState::Idle;
    }

    /// Hands the store's current node and link set to the simulation.
    fn resync(&mut self) {
        let declared: Vec<DeclaredNode> = self
            .store
            .nodes()
            .map(|node| DeclaredNode::new(&node.id, node.kind))
            .collect();
        let links: Vec<Link> = self.store.links().collect();
        self.simulator.rebind(&declared, &links);
    }

    /// The first few node labels, as context for an explanation request.
    pub fn explanation_context(&self) -> Vec<String> {
        self.store
            .nodes()
            .take(EXPLANATION_CONTEXT_LIMIT)
            .map(|node| node.label.clone())
            .collect()
    }

    /// The view for the given search query.
    pub fn view(&self, query: &str) -> GraphView<'_> {
        filter::filter(&self.store, query)
    }

    //// Interaction passthroughs ////

    pub fn set_mode(&mut self, mode: Mode) {
        self.controller.set_mode(mode, &mut self.store);
    }

    pub fn pointer_pressed(
        &mut self,
        button: MouseButton,
        node: Option<&str>,
        position: Vec2,
    ) -> PressAction {
        self.controller
            .pointer_pressed(button, node, position, &mut self.simulator)
    }

    pub fn pointer_moved(&mut self, position: Vec2) {
        self.controller.pointer_moved(position, &mut self.simulator);
    }

    pub fn pointer_released(&mut self, position: Vec2) -> ReleaseAction {
        self.controller
            .pointer_released(position, &mut self.store, &mut self.simulator)
    }

    pub fn set_drop_zone(&mut self, zone: Option<DropZone>) {
        self.controller.set_drop_zone(zone);
    }

    pub fn hover_enter(&mut self, id: &str) {
        self.controller.hover_enter(id);
    }

    pub fn hover_leave(&mut self) {
        self.controller.hover_leave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{CandidateLink, CandidateNode};

    fn candidate(id: &str, label: &str) -> CandidateNode {
        CandidateNode {
            id: id.into(),
            label: label.into(),
            description: String::new(),
        }
    }

    fn candidate_link(source: &str, target: &str) -> CandidateLink {
        CandidateLink {
            source: source.into(),
            target: target.into(),
            relationship: None,
        }
    }

    fn session() -> Session<'static, 'static> {
        Session::new(Simulator::builder().build())
    }

    fn loaded_session() -> Session<'static, 'static> {
        let mut session = session();
        session.begin_topic();
        session
            .complete_topic(
                "Entropy",
                DecomposedGraph {
                    nodes: vec![
                        candidate("entropy", "Entropy"),
                        candidate("disorder", "Disorder"),
                        candidate("arrow", "Arrow of Time"),
                    ],
                    links: vec![
                        candidate_link("entropy", "disorder"),
                        candidate_link("entropy", "arrow"),
                    ],
                },
            )
            .unwrap();
        session
    }

    #[test]
    fn topic_load_promotes_the_matching_label_to_root() {
        let session = loaded_session();
        let root = session.store().node("entropy").unwrap();
        assert_eq!(root.kind, NodeKind::Root);
        assert_eq!(root.group, 1);
        assert!(!root.expanded);
        assert_eq!(session.store().node("arrow").unwrap().group, 2);
        assert_eq!(*session.state(), SessionState::Exploring);
        assert_eq!(session.simulator().node_count(), 3);
    }

    #[test]
    fn expansion_places_children_one_generation_down() {
        let mut session = loaded_session();
        session.begin_expand("arrow").unwrap();
        session
            .complete_expand(
                "arrow",
                DecomposedGraph {
                    nodes: vec![candidate("cosmology", "Cosmology")],
                    links: vec![candidate_link("arrow", "cosmology")],
                },
            )
            .unwrap();

        assert!(session.store().node("arrow").unwrap().expanded);
        assert_eq!(session.store().node("cosmology").unwrap().group, 3);
        assert_eq!(
            session.begin_expand("arrow"),
            Err(SessionError::AlreadyExpanded("arrow".into()))
        );
    }

    #[test]
    fn the_root_can_be_expanded_like_any_other_node() {
        let mut session = loaded_session();
        session.begin_expand("entropy").unwrap();
        session
            .complete_expand(
                "entropy",
                DecomposedGraph {
                    nodes: vec![candidate("microstates", "Microstates")],
                    links: vec![candidate_link("entropy", "microstates")],
                },
            )
            .unwrap();

        assert!(session.store().node("entropy").unwrap().expanded);
        assert_eq!(session.store().node("microstates").unwrap().group, 2);
    }

    #[test]
    fn a_new_topic_keeps_the_saved_library() {
        let mut session = loaded_session();
        session.store_mut().save("arrow");

        session.begin_topic();
        assert_eq!(*session.state(), SessionState::LoadingGraph);
        assert_eq!(session.store().node_count(), 0);
        assert_eq!(session.simulator().node_count(), 0);
        assert!(session.store().is_saved("arrow"));

        // Only a full reset drops the library.
        session.reset();
        assert!(!session.store().is_saved("arrow"));
    }

    #[test]
    fn only_one_collaborator_call_runs_at_a_time() {
        let mut session = loaded_session();
        session.begin_expand("arrow").unwrap();
        assert_eq!(session.begin_expand("disorder"), Err(SessionError::Busy));
        assert_eq!(session.begin_synthesis(), Err(SessionError::Busy));

        session.fail_expand("collaborator timed out");
        assert!(matches!(session.state(), SessionState::Error(_)));
        // A failed expansion leaves the node expandable.
        assert!(!session.store().node("arrow").unwrap().expanded);
        session.acknowledge_error();
        assert!(session.begin_expand("arrow").is_ok());
    }

    #[test]
    fn synthesis_needs_at_least_two_selected() {
        let mut session = loaded_session();
        assert_eq!(
            session.begin_synthesis(),
            Err(SessionError::SynthesisTooSmall)
        );

        session.store_mut().toggle_select("disorder", None);
        session.store_mut().toggle_select("arrow", None);
        let labels = session.begin_synthesis().unwrap();
        assert_eq!(labels, vec!["Disorder".to_string(), "Arrow of Time".into()]);
        session.end_synthesis();
        assert_eq!(*session.state(), SessionState::Exploring);
    }

    #[test]
    fn manual_nodes_get_sequential_ids_and_a_clipped_description() {
        let mut session = loaded_session();
        let long = "x".repeat(150);
        let id = session.add_manual_node(
            "My Note",
            Explanation {
                definition: long,
                analogy: String::new(),
                key_facts: vec![],
            },
        );
        assert_eq!(id, "manual-1");
        let node = session.store().node("manual-1").unwrap();
        assert_eq!(node.description.chars().count(), 103);
        assert!(node.description.ends_with("..."));
        assert!(node.content.is_some());

        let second = session.add_manual_node("Another", Explanation::default());
        assert_eq!(second, "manual-2");
    }

    #[test]
    fn deleted_selection_can_be_undone_with_positions_intact() {
        let mut session = loaded_session();
        for _ in 0..10 {
            session.frame();
        }
        let before = session.simulator().position_of("arrow").unwrap();

        session.store_mut().toggle_select("arrow", None);
        session.delete_selection();
        assert!(!session.store().contains("arrow"));
        assert_eq!(session.simulator().node_count(), 2);

        assert!(session.undo_delete());
        assert!(session.store().contains("arrow"));
        assert_eq!(session.simulator().position_of("arrow"), Some(before));
    }

    #[test]
    fn dismissing_the_undo_prompt_evicts_the_parked_nodes() {
        let mut session = loaded_session();
        session.store_mut().toggle_select("arrow", None);
        session.delete_selection();
        assert!(session.simulator().position_of("arrow").is_some());

        session.dismiss_undo();
        assert!(!session.undo_delete());
        assert_eq!(session.simulator().position_of("arrow"), None);
    }

    #[test]
    fn link_selection_chains_in_selection_order() {
        let mut session = loaded_session();
        session.store_mut().toggle_select("disorder", None);
        session.store_mut().toggle_select("arrow", None);
        assert_eq!(session.link_selection().unwrap(), 1);
        assert!(session.store().linked("disorder", "arrow"));

        assert_eq!(session.unlink_selection(), 1);
        assert!(!session.store().linked("disorder", "arrow"));
    }

    #[test]
    fn reset_returns_to_idle_and_empties_everything() {
        let mut session = loaded_session();
        session.reset();
        assert_eq!(*session.state(), SessionState::Idle);
        assert_eq!(session.store().node_count(), 0);
        assert_eq!(session.simulator().node_count(), 0);
    }
}
