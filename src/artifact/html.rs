use super::payload::ArtifactPayload;
use crate::error::Result;
use crate::theme::Theme;
use crate::xml::{escape_script_json, escape_xml};

const VIEWER_CSS: &str = include_str!("viewer.css");
const VIEWER_JS: &str = include_str!("viewer.js");

/// Render the self-contained interactive document.
///
/// Styles, script and data are all inlined; the page loads nothing else.
pub fn render_html(payload: &ArtifactPayload<'_>) -> Result<String> {
    let data = escape_script_json(&serde_json::to_string(payload)?);
    let title = escape_xml(payload.title);
    let meta = escape_xml(&format!(
        "{} members · {} placeholders · generated {}",
        payload.total_members, payload.virtual_members, payload.generated_at
    ));

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
{vars}
{css}
</style>
</head>
<body>
<header>
<h1>{title}</h1>
<span class="meta">{meta}</span>
<span class="spacer"></span>
<input id="search" type="search" placeholder="Search name, ID or department" autocomplete="off">
<button id="prev" title="Previous match (Shift+Enter)">&#8593;</button>
<button id="next" title="Next match (Enter)">&#8595;</button>
<span id="status" class="status"></span>
<button id="expand-all">Expand all</button>
<button id="collapse-all">Collapse all</button>
<button id="reset-view">Reset view</button>
</header>
<div id="trail" class="trail" aria-live="polite"></div>
<svg id="chart" xmlns="http://www.w3.org/2000/svg"><g id="scene"></g></svg>
<script type="application/json" id="org-data">{data}</script>
<script>
{js}
</script>
</body>
</html>
"#,
        title = title,
        meta = meta,
        vars = css_variables(payload.theme),
        css = VIEWER_CSS,
        data = data,
        js = VIEWER_JS,
    ))
}

fn css_variables(theme: &Theme) -> String {
    let vars = [
        ("background", &theme.background),
        ("text", &theme.text),
        ("muted-text", &theme.muted_text),
        ("node-fill", &theme.node_fill),
        ("node-stroke", &theme.node_stroke),
        ("virtual-fill", &theme.virtual_fill),
        ("virtual-stroke", &theme.virtual_stroke),
        ("highlight-fill", &theme.highlight_fill),
        ("active-stroke", &theme.active_stroke),
        ("edge", &theme.edge),
        ("font-family", &theme.font_family),
    ];

    let mut out = String::from(":root {");
    for (name, value) in vars {
        out.push_str(&format!(" --{name}: {};", css_value(value)));
    }
    out.push_str(" }");
    out
}

/// Keep palette values from breaking out of the style block.
fn css_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ';' | '{' | '}' | '<' | '>'))
        .collect()
}
