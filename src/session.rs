//! One interactive browsing session over a forest.
//!
//! A single user drives every transition. Each [`Event`] is handled to
//! completion before the next one arrives, so the session owns its
//! [`LayoutState`] outright.

use crate::layout::{Layout, LayoutEngine, LayoutState};
use crate::search::{apply_search, step_match, SearchOutcome};
use crate::tree::{Forest, NodeId};

const WHEEL_ZOOM_STEP: f32 = 1.1;
const VIEW_MARGIN: f32 = 40.0;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Toggle(NodeId),
    Drag { dx: f32, dy: f32 },
    /// Negative `delta` zooms in, about the screen point `(x, y)`.
    Wheel { delta: f32, x: f32, y: f32 },
    Search(String),
    NextMatch,
    PreviousMatch,
    ExpandAll,
    CollapseAll,
    ResetView,
    Resize { width: f32, height: f32 },
}

pub struct Session<'f> {
    forest: &'f Forest,
    engine: LayoutEngine,
    state: LayoutState,
    layout: Layout,
    viewport: (f32, f32),
    last_search: Option<SearchOutcome>,
    layout_passes: usize,
}

impl<'f> Session<'f> {
    pub fn new(
        forest: &'f Forest,
        engine: LayoutEngine,
        initial_depth: usize,
        viewport: (f32, f32),
    ) -> Self {
        let mut state = LayoutState::with_depth(forest, initial_depth);
        let layout = engine.layout(forest, &mut state);
        let mut session = Self {
            forest,
            engine,
            state,
            layout,
            viewport,
            last_search: None,
            layout_passes: 1,
        };
        session.reset_view();
        session
    }

    pub fn forest(&self) -> &'f Forest {
        self.forest
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn last_search(&self) -> Option<&SearchOutcome> {
        self.last_search.as_ref()
    }

    /// How many times positions were recomputed.
    pub fn layout_passes(&self) -> usize {
        self.layout_passes
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::Toggle(id) => {
                if self.forest.get(id).is_some_and(|n| !n.children.is_empty()) {
                    self.state.toggle(id);
                }
            }
            Event::Drag { dx, dy } => self.state.view.pan_by(dx, dy),
            Event::Wheel { delta, x, y } => {
                let factor = if delta < 0.0 {
                    WHEEL_ZOOM_STEP
                } else if delta > 0.0 {
                    1.0 / WHEEL_ZOOM_STEP
                } else {
                    1.0
                };
                let metrics = self.engine.metrics;
                self.state
                    .view
                    .zoom_about(factor, x, y, metrics.min_scale, metrics.max_scale);
            }
            Event::Search(query) => {
                self.last_search = Some(apply_search(self.forest, &mut self.state, &query));
                self.relayout_if_needed();
                if let Some(id) = self.state.active_node() {
                    self.center_on(id);
                }
            }
            Event::NextMatch => self.step(1),
            Event::PreviousMatch => self.step(-1),
            Event::ExpandAll => {
                self.state.expand_all(self.forest);
            }
            Event::CollapseAll => {
                self.state.collapse_all();
            }
            Event::ResetView => self.reset_view(),
            Event::Resize { width, height } => self.viewport = (width, height),
        }
        self.relayout_if_needed();
    }

    /// Pan so the node box centre sits in the middle of the viewport.
    pub fn center_on(&mut self, id: NodeId) -> bool {
        self.relayout_if_needed();
        let Some(pos) = self.layout.position(id) else {
            return false;
        };
        let (x, y) = pos.center();
        self.state.view.center_on(x, y, self.viewport.0, self.viewport.1);
        true
    }

    fn step(&mut self, step: isize) {
        if let Some(id) = step_match(&mut self.state, step) {
            self.center_on(id);
        }
    }

    /// Unit scale, first root at the left edge and vertically centred.
    fn reset_view(&mut self) {
        self.state.view = Default::default();
        let anchor = self
            .forest
            .roots()
            .first()
            .and_then(|id| self.layout.position(*id))
            .map(|pos| pos.center().1)
            .unwrap_or(0.0);
        self.state.view.pan_x = VIEW_MARGIN;
        self.state.view.pan_y = self.viewport.1 / 2.0 - anchor;
    }

    fn relayout_if_needed(&mut self) {
        if self.layout.generation != self.state.generation() {
            self.layout = self.engine.layout(self.forest, &mut self.state);
            self.layout_passes += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::MemberRecord;

    fn org() -> Forest {
        let pairs = [
            ("Alice", "E1", ""),
            ("Bob", "E2", "Alice"),
            ("Sam", "E3", "Bob"),
            ("Sam", "E4", "Alice"),
            ("Samantha", "E5", "Sam"),
        ];
        Forest::build(
            pairs
                .iter()
                .map(|(name, identifier, superior)| MemberRecord {
                    name: name.to_string(),
                    identifier: identifier.to_string(),
                    superior_name: superior.to_string(),
                    ..Default::default()
                })
                .collect(),
        )
    }

    fn session(forest: &Forest) -> Session<'_> {
        Session::new(forest, LayoutEngine::default(), 0, (800.0, 600.0))
    }

    fn screen_center_of(session: &Session<'_>, id: NodeId) -> (f32, f32) {
        let (x, y) = session.layout().position(id).unwrap().center();
        session.state().view.to_screen(x, y)
    }

    #[test]
    fn search_centres_on_first_exact_match() {
        let forest = org();
        let mut session = session(&forest);
        session.handle(Event::Search("sam".to_string()));

        assert_eq!(session.state().matches(), [NodeId(2), NodeId(3)]);
        let (x, y) = screen_center_of(&session, NodeId(2));
        assert!((x - 400.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);
    }

    #[test]
    fn cycling_matches_recentres_without_relayout() {
        let forest = org();
        let mut session = session(&forest);
        session.handle(Event::Search("sam".to_string()));
        let passes = session.layout_passes();
        let scale = session.state().view.scale;

        session.handle(Event::NextMatch);
        assert_eq!(session.state().active_node(), Some(NodeId(3)));
        let (x, y) = screen_center_of(&session, NodeId(3));
        assert!((x - 400.0).abs() < 1e-3 && (y - 300.0).abs() < 1e-3);

        session.handle(Event::NextMatch);
        assert_eq!(session.state().active_node(), Some(NodeId(2)));
        session.handle(Event::PreviousMatch);
        assert_eq!(session.state().active_node(), Some(NodeId(3)));

        assert_eq!(session.layout_passes(), passes);
        assert_eq!(session.state().view.scale, scale);
    }

    #[test]
    fn toggle_relayouts_and_ignores_leaves() {
        let forest = org();
        let mut session = session(&forest);
        assert_eq!(session.layout().visible, [NodeId(0)]);

        session.handle(Event::Toggle(NodeId(0)));
        assert_eq!(session.layout().visible, [NodeId(0), NodeId(1), NodeId(3)]);
        let passes = session.layout_passes();

        session.handle(Event::Toggle(NodeId(4)));
        assert_eq!(session.layout_passes(), passes);
    }

    #[test]
    fn pan_and_zoom_do_not_relayout() {
        let forest = org();
        let mut session = session(&forest);
        let passes = session.layout_passes();

        session.handle(Event::Drag { dx: 15.0, dy: -5.0 });
        session.handle(Event::Wheel { delta: -120.0, x: 10.0, y: 10.0 });
        assert!(session.state().view.scale > 1.0);
        assert_eq!(session.layout_passes(), passes);
    }

    #[test]
    fn expand_all_then_collapse_all() {
        let forest = org();
        let mut session = session(&forest);
        session.handle(Event::ExpandAll);
        assert_eq!(session.layout().visible.len(), forest.len());
        session.handle(Event::CollapseAll);
        assert_eq!(session.layout().visible, [NodeId(0)]);
    }
}
