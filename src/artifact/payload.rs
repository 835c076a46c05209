use serde::Serialize;

use crate::layout::LayoutMetrics;
use crate::theme::Theme;
use crate::tree::{Forest, NodeId};

/// Everything the interactive document needs, serialized once.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactPayload<'a> {
    pub title: &'a str,
    pub generated_at: &'a str,
    /// Real members only; placeholders are counted separately.
    pub total_members: usize,
    pub virtual_members: usize,
    pub root_count: usize,
    pub max_depth: usize,
    pub initial_depth: usize,
    pub roots: &'a [NodeId],
    pub nodes: Vec<ArtifactNode<'a>>,
    pub layout: ViewerMetrics,
    pub theme: &'a Theme,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactNode<'a> {
    pub id: NodeId,
    pub parent_id: Option<NodeId>,
    pub child_ids: &'a [NodeId],
    pub name: &'a str,
    pub identifier: &'a str,
    pub login_name: &'a str,
    pub title: &'a str,
    pub department: &'a str,
    pub location: &'a str,
    pub is_virtual: bool,
    pub search_text: &'a str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerMetrics {
    pub column_width: f32,
    pub row_height: f32,
    pub node_width: f32,
    pub node_height: f32,
    pub sibling_gap: f32,
    pub root_gap: f32,
    pub min_scale: f32,
    pub max_scale: f32,
}

impl From<LayoutMetrics> for ViewerMetrics {
    fn from(m: LayoutMetrics) -> Self {
        let m = m.sanitized();
        Self {
            column_width: m.column_width,
            row_height: m.row_height,
            node_width: m.node_width,
            node_height: m.node_height,
            sibling_gap: m.sibling_gap,
            root_gap: m.root_gap,
            min_scale: m.min_scale,
            max_scale: m.max_scale,
        }
    }
}

impl<'a> ArtifactPayload<'a> {
    pub fn new(
        forest: &'a Forest,
        title: &'a str,
        generated_at: &'a str,
        theme: &'a Theme,
        metrics: LayoutMetrics,
        initial_depth: usize,
    ) -> Self {
        let nodes = forest
            .nodes()
            .map(|node| ArtifactNode {
                id: node.id,
                parent_id: node.parent,
                child_ids: &node.children,
                name: &node.record.name,
                identifier: &node.record.identifier,
                login_name: &node.record.login_name,
                title: &node.record.title,
                department: &node.record.department,
                location: &node.record.location,
                is_virtual: node.is_virtual(),
                search_text: &node.search_text,
            })
            .collect();

        Self {
            title,
            generated_at,
            total_members: forest.real_count(),
            virtual_members: forest.virtual_count(),
            root_count: forest.roots().len(),
            max_depth: forest.max_depth(),
            initial_depth,
            roots: forest.roots(),
            nodes,
            layout: metrics.into(),
            theme,
        }
    }
}
