use crate::fonts::{fit_text, TextMeasure};
use crate::layout::{Layout, LayoutPos, LayoutState};
use crate::theme::Theme;
use crate::tree::{Forest, Node};
use crate::xml::escape_xml;

const TEXT_INSET: f32 = 10.0;
const BADGE_RADIUS: f32 = 9.0;

/// Render a static snapshot of one layout pass as a standalone SVG.
pub fn render_svg<T: TextMeasure>(
    forest: &Forest,
    layout: &Layout,
    state: &LayoutState,
    theme: &Theme,
    measure: &mut T,
    padding: f32,
) -> String {
    let bbox = layout.bbox.with_padding(padding);
    let total_w = bbox.width.max(1.0);
    let total_h = bbox.height.max(1.0);

    let mut svg = String::new();

    // Draw edges first (behind nodes)
    for (parent, child) in &layout.edges {
        if let (Some(from), Some(to)) = (layout.position(*parent), layout.position(*child)) {
            svg.push_str(&render_edge(from, to, theme));
        }
    }

    let active = state.active_node();
    for id in &layout.visible {
        if let Some(pos) = layout.position(*id) {
            let node = &forest[*id];
            let style = NodeStyle {
                highlighted: state.highlight().contains(id),
                active: active == Some(*id),
                collapsed_children: if state.is_expanded(*id) {
                    0
                } else {
                    node.children.len()
                },
            };
            svg.push_str(&render_node(node, pos, &style, theme, measure));
        }
    }

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="{x:.2} {y:.2} {w:.2} {h:.2}" font-family="{font}">
<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{bg}"/>
{content}
</svg>"#,
        w = total_w,
        h = total_h,
        x = bbox.x,
        y = bbox.y,
        font = escape_xml(&theme.font_family),
        bg = theme.background,
        content = svg,
    )
}

struct NodeStyle {
    highlighted: bool,
    active: bool,
    collapsed_children: usize,
}

fn render_edge(from: &LayoutPos, to: &LayoutPos, theme: &Theme) -> String {
    let (x1, y1) = (from.right(), from.center().1);
    let (x2, y2) = (to.x, to.center().1);
    let mid = (x1 + x2) / 2.0;
    format!(
        r#"<path d="M{x1:.2},{y1:.2} H{mid:.2} V{y2:.2} H{x2:.2}" fill="none" stroke="{}" stroke-width="1.4" />"#,
        theme.edge
    )
}

fn render_node<T: TextMeasure>(
    node: &Node,
    pos: &LayoutPos,
    style: &NodeStyle,
    theme: &Theme,
    measure: &mut T,
) -> String {
    let mut svg = String::new();

    let fill = if style.highlighted {
        &theme.highlight_fill
    } else if node.is_virtual() {
        &theme.virtual_fill
    } else {
        &theme.node_fill
    };
    let (stroke, stroke_width) = if style.active {
        (&theme.active_stroke, 2.6)
    } else if node.is_virtual() {
        (&theme.virtual_stroke, 1.2)
    } else {
        (&theme.node_stroke, 1.2)
    };
    let dash = if node.is_virtual() {
        r#" stroke-dasharray="5 3""#
    } else {
        ""
    };

    svg.push_str(&format!(
        r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="6" fill="{}" stroke="{}" stroke-width="{}"{} />"#,
        pos.x, pos.y, pos.width, pos.height, fill, stroke, stroke_width, dash
    ));

    let label_fill = theme.label_on(fill);
    let text_width = pos.width - TEXT_INSET * 2.0 - BADGE_RADIUS * 2.0;
    let name = fit_text(measure, &node.record.name, theme.font_size, true, text_width);
    svg.push_str(&format!(
        r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" font-weight="600" fill="{}">{}</text>"#,
        pos.x + TEXT_INSET,
        pos.y + pos.height / 2.0 - 3.0,
        theme.font_size,
        label_fill,
        escape_xml(&name),
    ));

    let detail = if node.is_virtual() {
        "(placeholder)"
    } else if !node.record.title.is_empty() {
        node.record.title.as_str()
    } else {
        node.record.department.as_str()
    };
    if !detail.is_empty() {
        let detail_size = theme.font_size - 3.0;
        let detail = fit_text(measure, detail, detail_size, false, text_width);
        svg.push_str(&format!(
            r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" fill="{}">{}</text>"#,
            pos.x + TEXT_INSET,
            pos.y + pos.height / 2.0 + theme.font_size - 1.0,
            detail_size,
            theme.muted_text,
            escape_xml(&detail),
        ));
    }

    if style.collapsed_children > 0 {
        let cx = pos.right() - BADGE_RADIUS - 5.0;
        let cy = pos.center().1;
        svg.push_str(&format!(
            r#"<circle cx="{cx:.2}" cy="{cy:.2}" r="{BADGE_RADIUS}" fill="{}" stroke="{}" />"#,
            theme.node_fill, theme.node_stroke
        ));
        svg.push_str(&format!(
            r#"<text x="{cx:.2}" y="{:.2}" font-size="10" text-anchor="middle" fill="{}">{}</text>"#,
            cy + 3.5,
            theme.label_on(&theme.node_fill),
            style.collapsed_children,
        ));
    }

    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::FixedMeasure;
    use crate::layout::LayoutEngine;
    use crate::roster::{synthesize_virtual_ancestors, MemberRecord};
    use crate::search::apply_search;

    fn forest() -> Forest {
        let mut records = vec![
            MemberRecord {
                name: "Alice".to_string(),
                title: "CEO".to_string(),
                ..Default::default()
            },
            MemberRecord {
                name: "Bob & Co".to_string(),
                superior_name: "Alice".to_string(),
                ..Default::default()
            },
            MemberRecord {
                name: "Carol".to_string(),
                superior_name: "Dave".to_string(),
                ..Default::default()
            },
        ];
        synthesize_virtual_ancestors(&mut records);
        Forest::build(records)
    }

    #[test]
    fn snapshot_draws_visible_nodes_and_edges() {
        let forest = forest();
        let mut state = LayoutState::new();
        state.expand_all(&forest);
        let layout = LayoutEngine::default().layout(&forest, &mut state);
        let svg = render_svg(
            &forest,
            &layout,
            &state,
            &Theme::default(),
            &mut FixedMeasure::default(),
            20.0,
        );

        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<path").count(), 2);
        assert_eq!(svg.matches("rx=\"6\"").count(), 4);
        assert!(svg.contains("Bob &amp; Co"));
        assert!(svg.contains("stroke-dasharray"));
        assert!(svg.contains("(placeholder)"));
    }

    #[test]
    fn collapsed_branches_show_child_count_and_search_marks() {
        let forest = forest();
        let mut state = LayoutState::new();
        apply_search(&forest, &mut state, "alice");
        state.collapse_all();
        let layout = LayoutEngine::default().layout(&forest, &mut state);
        let theme = Theme::default();
        let svg = render_svg(&forest, &layout, &state, &theme, &mut FixedMeasure::default(), 0.0);

        assert!(svg.contains("<circle"));
        assert!(svg.contains(&theme.highlight_fill));
        assert!(svg.contains(&theme.active_stroke));
    }
}
