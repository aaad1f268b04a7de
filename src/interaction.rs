//! Pointer and mode handling on top of the store and the simulator.
//!
//! The controller decides what a press, move or release means in the current
//! mode; it never renders and never talks to the network.

use glam::Vec2;
use log::debug;
use winit::event::MouseButton;

use crate::graph::link::Link;
use crate::graph::GraphStore;
use crate::simulator::Simulator;

/// How many nodes can be selected outside of creator mode.
pub const SELECT_CAP: usize = 3;

/// Cursor travel in pixels before a press becomes a drag.
pub const DRAG_THRESHOLD: f32 = 3.0;

/// What a pointer interaction is allowed to do.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    /// Clicking a node opens its detail view.
    #[default]
    Browse,
    /// Clicking toggles selection, capped at [`SELECT_CAP`].
    Select,
    /// Like `Select` but without the cap, for building custom structures.
    Create,
}

/// Screen rectangle that saves a node when one is dropped on it.
#[derive(Clone, Copy, Debug)]
pub struct DropZone {
    pub min: Vec2,
    pub max: Vec2,
}

impl DropZone {
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

struct PressState {
    node: String,
    start: Vec2,
    dragging: bool,
}

/// Outcome of a pointer press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PressAction {
    None,
    PinToggled { id: String, pinned: bool },
}

/// Outcome of a pointer release.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReleaseAction {
    None,
    /// A plain click in browse mode; the caller should show the node.
    OpenDetail(String),
    SelectionToggled(String),
    SavedToLibrary(String),
}

#[derive(Default)]
pub struct InteractionController {
    mode: Mode,
    hovered: Option<String>,
    drop_zone: Option<DropZone>,
    press: Option<PressState>,
}

impl InteractionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches interaction mode. A mode change always clears the selection,
    /// so a capped selection cannot leak into creator mode or back.
    pub fn set_mode(&mut self, mode: Mode, store: &mut GraphStore) {
        if self.mode != mode {
            debug!("mode {:?} -> {:?}", self.mode, mode);
            self.mode = mode;
            store.clear_selection();
        }
    }

    pub fn set_drop_zone(&mut self, zone: Option<DropZone>) {
        self.drop_zone = zone;
    }

    pub fn hover_enter(&mut self, id: &str) {
        self.hovered = Some(id.to_owned());
    }

    pub fn hover_leave(&mut self) {
        self.hovered = None;
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    /// Whether a node should render at full strength while something is
    /// hovered. The hovered node and its direct link neighbors stay bright,
    /// the rest dims.
    pub fn node_emphasis(&self, store: &GraphStore, id: &str) -> bool {
        let Some(hovered) = self.hovered.as_deref() else {
            return true;
        };
        if hovered == id {
            return true;
        }
        store
            .links()
            .any(|link| link.connects(hovered, id))
    }

    /// Whether a link should render at full strength. Only links touching
    /// the hovered node stay bright.
    pub fn link_emphasis(&self, link: &Link) -> bool {
        match self.hovered.as_deref() {
            Some(hovered) => link.touches(hovered),
            None => true,
        }
    }

    /// Handles a pointer press at `position`, over `node` if any.
    ///
    /// A right press on a node toggles its pin on the spot. A left press on
    /// a node arms a potential click or drag, resolved by later moves and
    /// the release.
    pub fn pointer_pressed(
        &mut self,
        button: MouseButton,
        node: Option<&str>,
        position: Vec2,
        simulator: &mut Simulator,
    ) -> PressAction {
        let Some(id) = node else {
            self.press = None;
            return PressAction::None;
        };

        match button {
            MouseButton::Right => match simulator.toggle_pin(id) {
                Some(pinned) => PressAction::PinToggled {
                    id: id.to_owned(),
                    pinned,
                },
                None => PressAction::None,
            },
            MouseButton::Left => {
                self.press = Some(PressState {
                    node: id.to_owned(),
                    start: position,
                    dragging: false,
                });
                PressAction::None
            }
            _ => PressAction::None,
        }
    }

    /// Handles pointer movement while a press may be armed.
    pub fn pointer_moved(&mut self, position: Vec2, simulator: &mut Simulator) {
        let Some(press) = self.press.as_mut() else {
            return;
        };
        if !press.dragging {
            if press.start.distance(position) < DRAG_THRESHOLD {
                return;
            }
            press.dragging = true;
            simulator.drag_start(&press.node);
        }
        simulator.dragged(&press.node, position);
    }

    /// Handles the pointer release that ends a press.
    ///
    /// A click resolves per mode; a drag ends the grab, saves the node when
    /// it lands on the drop zone, and keeps a pinned node pinned at the drop
    /// position.
    pub fn pointer_released(
        &mut self,
        position: Vec2,
        store: &mut GraphStore,
        simulator: &mut Simulator,
    ) -> ReleaseAction {
        let Some(press) = self.press.take() else {
            return ReleaseAction::None;
        };
        let id = press.node;

        if !press.dragging {
            return match self.mode {
                Mode::Browse => ReleaseAction::OpenDetail(id),
                Mode::Select => {
                    store.toggle_select(&id, Some(SELECT_CAP));
                    ReleaseAction::SelectionToggled(id)
                }
                Mode::Create => {
                    store.toggle_select(&id, None);
                    ReleaseAction::SelectionToggled(id)
                }
            };
        }

        simulator.drag_end(&id);
        if self
            .drop_zone
            .is_some_and(|zone| zone.contains(position))
        {
            store.save(&id);
            // A save gesture always releases the node back into the
            // simulation, pinned or not.
            simulator.unpin(&id);
            return ReleaseAction::SavedToLibrary(id);
        }
        if simulator.is_pinned(&id) {
            simulator.pin(&id, position);
        }
        ReleaseAction::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::node::{ConceptNode, NodeKind};
    use crate::simulator::registry::DeclaredNode;

    fn fixture() -> (GraphStore, Simulator<'static, 'static>) {
        let mut store = GraphStore::new();
        store.insert_nodes(
            ["a", "b", "c", "d"]
                .map(|id| ConceptNode::new(id, id.to_uppercase(), "", NodeKind::Concept, 1))
                .into_iter()
                .collect(),
            vec![Link::new("a", "b")],
        );
        let mut sim = Simulator::builder().build();
        let declared: Vec<DeclaredNode> = store
            .nodes()
            .map(|node| DeclaredNode::new(&node.id, node.kind))
            .collect();
        let links: Vec<Link> = store.links().collect();
        sim.rebind(&declared, &links);
        (store, sim)
    }

    fn click(
        controller: &mut InteractionController,
        id: &str,
        store: &mut GraphStore,
        sim: &mut Simulator,
    ) -> ReleaseAction {
        controller.pointer_pressed(MouseButton::Left, Some(id), Vec2::ZERO, sim);
        controller.pointer_released(Vec2::ZERO, store, sim)
    }

    #[test]
    fn select_mode_caps_the_selection_at_three() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        controller.set_mode(Mode::Select, &mut store);

        for id in ["a", "b", "c", "d"] {
            click(&mut controller, id, &mut store, &mut sim);
        }
        assert_eq!(store.selection().len(), 3);
    }

    #[test]
    fn create_mode_has_no_cap() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        controller.set_mode(Mode::Create, &mut store);

        for id in ["a", "b", "c", "d"] {
            click(&mut controller, id, &mut store, &mut sim);
        }
        assert_eq!(store.selection().len(), 4);
    }

    #[test]
    fn mode_change_clears_the_selection() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        controller.set_mode(Mode::Select, &mut store);
        click(&mut controller, "a", &mut store, &mut sim);
        assert_eq!(store.selection().len(), 1);

        controller.set_mode(Mode::Create, &mut store);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn browse_click_opens_the_detail_view() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        let action = click(&mut controller, "a", &mut store, &mut sim);
        assert_eq!(action, ReleaseAction::OpenDetail("a".into()));
        assert!(store.selection().is_empty());
    }

    #[test]
    fn dropping_on_the_zone_saves_the_node() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        controller.set_drop_zone(Some(DropZone {
            min: Vec2::new(100.0, 100.0),
            max: Vec2::new(200.0, 200.0),
        }));

        // Even a pinned node is released by the save gesture.
        sim.toggle_pin("a");

        controller.pointer_pressed(MouseButton::Left, Some("a"), Vec2::ZERO, &mut sim);
        controller.pointer_moved(Vec2::new(150.0, 150.0), &mut sim);
        let action = controller.pointer_released(Vec2::new(150.0, 150.0), &mut store, &mut sim);

        assert_eq!(action, ReleaseAction::SavedToLibrary("a".into()));
        assert!(store.is_saved("a"));
        assert!(!sim.is_pinned("a"));
    }

    #[test]
    fn releasing_a_pinned_node_keeps_it_pinned_at_the_drop_point() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();
        sim.toggle_pin("a");
        assert!(sim.is_pinned("a"));

        controller.pointer_pressed(MouseButton::Left, Some("a"), Vec2::ZERO, &mut sim);
        controller.pointer_moved(Vec2::new(40.0, 40.0), &mut sim);
        controller.pointer_released(Vec2::new(40.0, 40.0), &mut store, &mut sim);

        assert!(sim.is_pinned("a"));
        assert_eq!(sim.position_of("a"), Some(Vec2::new(40.0, 40.0)));
    }

    #[test]
    fn small_pointer_travel_is_still_a_click() {
        let (mut store, mut sim) = fixture();
        let mut controller = InteractionController::new();

        controller.pointer_pressed(MouseButton::Left, Some("a"), Vec2::ZERO, &mut sim);
        controller.pointer_moved(Vec2::new(1.0, 1.0), &mut sim);
        let action = controller.pointer_released(Vec2::new(1.0, 1.0), &mut store, &mut sim);
        assert_eq!(action, ReleaseAction::OpenDetail("a".into()));
    }

    #[test]
    fn right_press_toggles_the_pin() {
        let (_store, mut sim) = fixture();
        let mut controller = InteractionController::new();

        let action =
            controller.pointer_pressed(MouseButton::Right, Some("a"), Vec2::ZERO, &mut sim);
        assert_eq!(
            action,
            PressAction::PinToggled {
                id: "a".into(),
                pinned: true
            }
        );
        let action =
            controller.pointer_pressed(MouseButton::Right, Some("a"), Vec2::ZERO, &mut sim);
        assert_eq!(
            action,
            PressAction::PinToggled {
                id: "a".into(),
                pinned: false
            }
        );
    }

    #[test]
    fn hover_dims_everything_but_the_neighborhood() {
        let (store, _sim) = fixture();
        let mut controller = InteractionController::new();
        controller.hover_enter("a");

        assert!(controller.node_emphasis(&store, "a"));
        assert!(controller.node_emphasis(&store, "b"));
        assert!(!controller.node_emphasis(&store, "c"));

        assert!(controller.link_emphasis(&Link::new("a", "b")));
        assert!(!controller.link_emphasis(&Link::new("c", "d")));

        controller.hover_leave();
        assert!(controller.node_emphasis(&store, "c"));
    }
}
