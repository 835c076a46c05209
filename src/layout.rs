use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::tree::{Forest, NodeId};

const COLUMN_WIDTH: f32 = 240.0;
const ROW_HEIGHT: f32 = 56.0;
const NODE_WIDTH: f32 = 196.0;
const NODE_HEIGHT: f32 = 44.0;
const SIBLING_GAP: f32 = 0.25;
const ROOT_GAP: f32 = 1.0;
const MIN_SCALE: f32 = 0.2;
const MAX_SCALE: f32 = 3.0;

/// Bounding box for layout elements
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn with_padding(&self, padding: f32) -> Self {
        Self::new(
            self.x - padding,
            self.y - padding,
            self.width + padding * 2.0,
            self.height + padding * 2.0,
        )
    }
}

/// Layout position for a node box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutPos {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayoutPos {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Spacing constants. Gaps are measured in rows; everything else in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetrics {
    #[serde(default = "default_column_width")]
    pub column_width: f32,
    #[serde(default = "default_row_height")]
    pub row_height: f32,
    #[serde(default = "default_node_width")]
    pub node_width: f32,
    #[serde(default = "default_node_height")]
    pub node_height: f32,
    #[serde(default = "default_sibling_gap")]
    pub sibling_gap: f32,
    #[serde(default = "default_root_gap")]
    pub root_gap: f32,
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
    #[serde(default = "default_max_scale")]
    pub max_scale: f32,
}

fn default_column_width() -> f32 {
    COLUMN_WIDTH
}
fn default_row_height() -> f32 {
    ROW_HEIGHT
}
fn default_node_width() -> f32 {
    NODE_WIDTH
}
fn default_node_height() -> f32 {
    NODE_HEIGHT
}
fn default_sibling_gap() -> f32 {
    SIBLING_GAP
}
fn default_root_gap() -> f32 {
    ROOT_GAP
}
fn default_min_scale() -> f32 {
    MIN_SCALE
}
fn default_max_scale() -> f32 {
    MAX_SCALE
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            column_width: COLUMN_WIDTH,
            row_height: ROW_HEIGHT,
            node_width: NODE_WIDTH,
            node_height: NODE_HEIGHT,
            sibling_gap: SIBLING_GAP,
            root_gap: ROOT_GAP,
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
        }
    }
}

impl LayoutMetrics {
    /// Clamp user-supplied values so boxes in one column can never overlap.
    pub fn sanitized(mut self) -> Self {
        let valid = |v: f32, fallback: f32| {
            if v.is_finite() && v > 0.0 {
                v
            } else {
                fallback
            }
        };
        self.row_height = valid(self.row_height, ROW_HEIGHT);
        self.node_height = valid(self.node_height, NODE_HEIGHT).min(self.row_height);
        self.node_width = valid(self.node_width, NODE_WIDTH);
        self.column_width = valid(self.column_width, COLUMN_WIDTH).max(self.node_width);
        self.sibling_gap = if self.sibling_gap.is_finite() {
            self.sibling_gap.max(0.0)
        } else {
            SIBLING_GAP
        };
        self.root_gap = if self.root_gap.is_finite() {
            self.root_gap.max(self.sibling_gap)
        } else {
            ROOT_GAP
        };
        self.min_scale = valid(self.min_scale, MIN_SCALE);
        self.max_scale = valid(self.max_scale, MAX_SCALE).max(self.min_scale);
        self
    }
}

/// Pan offset and scale: `screen = world * scale + pan`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub pan_x: f32,
    pub pan_y: f32,
    pub scale: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewTransform {
    pub fn to_screen(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.scale + self.pan_x, y * self.scale + self.pan_y)
    }

    pub fn to_world(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pan_x) / self.scale, (y - self.pan_y) / self.scale)
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply the scale by `factor`, keeping the world point under the
    /// screen point `(sx, sy)` fixed.
    pub fn zoom_about(&mut self, factor: f32, sx: f32, sy: f32, min_scale: f32, max_scale: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (wx, wy) = self.to_world(sx, sy);
        self.scale = (self.scale * factor).clamp(min_scale, max_scale);
        self.pan_x = sx - wx * self.scale;
        self.pan_y = sy - wy * self.scale;
    }

    /// Place the world point `(x, y)` at the viewport centre. Scale is kept.
    pub fn center_on(&mut self, x: f32, y: f32, viewport_width: f32, viewport_height: f32) {
        self.pan_x = viewport_width / 2.0 - x * self.scale;
        self.pan_y = viewport_height / 2.0 - y * self.scale;
    }
}

/// Session-scoped interactive state.
///
/// Subtree heights are memoized here and dropped whenever the expanded set
/// changes, so two sessions never share a cache.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    expanded: HashSet<NodeId>,
    highlight: HashSet<NodeId>,
    matches: Vec<NodeId>,
    active_match: Option<usize>,
    pub view: ViewTransform,
    heights: HashMap<NodeId, f32>,
    generation: u64,
}

impl LayoutState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State with every branch above `depth` expanded.
    pub fn with_depth(forest: &Forest, depth: usize) -> Self {
        let mut state = Self::new();
        state.expand_to_depth(forest, depth);
        state
    }

    pub fn expanded(&self) -> &HashSet<NodeId> {
        &self.expanded
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    /// Bumped on every change to the expanded set.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn expand(&mut self, id: NodeId) -> bool {
        let changed = self.expanded.insert(id);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn collapse(&mut self, id: NodeId) -> bool {
        let changed = self.expanded.remove(&id);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn toggle(&mut self, id: NodeId) {
        if !self.collapse(id) {
            self.expand(id);
        }
    }

    /// Expand every listed node; invalidates once if anything changed.
    pub fn expand_many(&mut self, ids: impl IntoIterator<Item = NodeId>) -> bool {
        let mut changed = false;
        for id in ids {
            changed |= self.expanded.insert(id);
        }
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn expand_all(&mut self, forest: &Forest) -> bool {
        self.expand_many(forest.branch_ids())
    }

    pub fn collapse_all(&mut self) -> bool {
        if self.expanded.is_empty() {
            return false;
        }
        self.expanded.clear();
        self.invalidate();
        true
    }

    /// Show every node down to `depth` (roots are depth 0).
    pub fn expand_to_depth(&mut self, forest: &Forest, depth: usize) -> bool {
        let ids: Vec<NodeId> = forest
            .branch_ids()
            .filter(|id| forest.depth(*id) < depth)
            .collect();
        self.expand_many(ids)
    }

    pub fn highlight(&self) -> &HashSet<NodeId> {
        &self.highlight
    }

    pub fn matches(&self) -> &[NodeId] {
        &self.matches
    }

    pub fn active_match(&self) -> Option<usize> {
        self.active_match
    }

    pub fn active_node(&self) -> Option<NodeId> {
        self.active_match.and_then(|i| self.matches.get(i).copied())
    }

    pub(crate) fn set_search(&mut self, highlight: HashSet<NodeId>, matches: Vec<NodeId>) {
        self.active_match = if matches.is_empty() { None } else { Some(0) };
        self.highlight = highlight;
        self.matches = matches;
    }

    pub(crate) fn clear_search(&mut self) {
        self.highlight.clear();
        self.matches.clear();
        self.active_match = None;
    }

    pub(crate) fn set_active_match(&mut self, index: Option<usize>) {
        self.active_match = index;
    }

    fn invalidate(&mut self) {
        self.heights.clear();
        self.generation += 1;
    }
}

/// Positions of every visible node under one expand/collapse state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub positions: HashMap<NodeId, LayoutPos>,
    /// Visible nodes in pre-order.
    pub visible: Vec<NodeId>,
    /// Parent/child pairs where both ends are visible.
    pub edges: Vec<(NodeId, NodeId)>,
    pub depths: HashMap<NodeId, usize>,
    pub bbox: BBox,
    pub generation: u64,
}

impl Layout {
    pub fn position(&self, id: NodeId) -> Option<&LayoutPos> {
        self.positions.get(&id)
    }
}

/// Tidy left-to-right tree layout
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    pub metrics: LayoutMetrics,
}

impl LayoutEngine {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics: metrics.sanitized(),
        }
    }

    /// Height of a subtree in rows. A node without visible children is one
    /// row; otherwise its visible children's rows plus a gap between each.
    pub fn subtree_rows(&self, forest: &Forest, state: &mut LayoutState, id: NodeId) -> f32 {
        if let Some(rows) = state.heights.get(&id) {
            return *rows;
        }

        // Post-order walk with an explicit stack; depth is unbounded.
        let mut stack = vec![(id, false)];
        while let Some((current, children_done)) = stack.pop() {
            if state.heights.contains_key(&current) {
                continue;
            }
            let children = visible_children(forest, state, current);
            if children.is_empty() {
                state.heights.insert(current, 1.0);
            } else if children_done {
                let sum: f32 = children.iter().map(|c| state.heights[c]).sum();
                let gaps = self.metrics.sibling_gap * (children.len() - 1) as f32;
                state.heights.insert(current, sum + gaps);
            } else {
                stack.push((current, true));
                for child in children {
                    if !state.heights.contains_key(child) {
                        stack.push((*child, false));
                    }
                }
            }
        }

        state.heights[&id]
    }

    pub fn layout(&self, forest: &Forest, state: &mut LayoutState) -> Layout {
        let metrics = self.metrics;
        let mut layout = Layout {
            generation: state.generation,
            ..Default::default()
        };

        let mut cursor = 0.0_f32;
        for (index, root) in forest.roots().iter().enumerate() {
            if index > 0 {
                cursor += metrics.root_gap;
            }
            let rows = self.subtree_rows(forest, state, *root);
            self.place_subtree(forest, state, *root, cursor, &mut layout);
            cursor += rows;
        }

        layout.bbox = calculate_bbox(&layout.positions);
        layout
    }

    fn place_subtree(
        &self,
        forest: &Forest,
        state: &mut LayoutState,
        root: NodeId,
        top: f32,
        layout: &mut Layout,
    ) {
        let metrics = self.metrics;
        let mut stack = vec![(root, top, 0usize)];

        while let Some((id, top, depth)) = stack.pop() {
            let rows = self.subtree_rows(forest, state, id);
            let center_px = (top + rows / 2.0) * metrics.row_height;
            layout.positions.insert(
                id,
                LayoutPos::new(
                    depth as f32 * metrics.column_width,
                    center_px - metrics.node_height / 2.0,
                    metrics.node_width,
                    metrics.node_height,
                ),
            );
            layout.depths.insert(id, depth);
            layout.visible.push(id);

            let children = visible_children(forest, state, id);
            let mut child_top = top;
            let mut placed = Vec::with_capacity(children.len());
            for &child in children {
                layout.edges.push((id, child));
                placed.push((child, child_top, depth + 1));
                child_top += self.subtree_rows(forest, state, child) + metrics.sibling_gap;
            }
            stack.extend(placed.into_iter().rev());
        }
    }
}

fn visible_children<'f>(forest: &'f Forest, state: &LayoutState, id: NodeId) -> &'f [NodeId] {
    if state.is_expanded(id) {
        &forest[id].children
    } else {
        &[]
    }
}

fn calculate_bbox(positions: &HashMap<NodeId, LayoutPos>) -> BBox {
    if positions.is_empty() {
        return BBox::default();
    }

    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;

    for pos in positions.values() {
        min_x = min_x.min(pos.x);
        min_y = min_y.min(pos.y);
        max_x = max_x.max(pos.right());
        max_y = max_y.max(pos.bottom());
    }

    BBox::new(min_x, min_y, max_x - min_x, max_y - min_y)
}
