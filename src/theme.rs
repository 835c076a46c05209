use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const PAPER_BACKGROUND: &str = "#fbfaf7";
const PAPER_TEXT: &str = "#1f2328";
const PAPER_MUTED_TEXT: &str = "#57606a";
const PAPER_NODE_FILL: &str = "#ffffff";
const PAPER_NODE_STROKE: &str = "#8c959f";
const PAPER_VIRTUAL_FILL: &str = "#f2f0ea";
const PAPER_VIRTUAL_STROKE: &str = "#b3ab98";
const PAPER_HIGHLIGHT_FILL: &str = "#fff1b8";
const PAPER_ACTIVE_STROKE: &str = "#d9480f";
const PAPER_EDGE: &str = "#a0a7b0";

const BUILTIN_THEMES: &[(&str, &str)] = &[
    ("paper", include_str!("../themes/paper.toml")),
    ("slate", include_str!("../themes/slate.toml")),
];

const FONT_FAMILY: &str = "sans-serif";
const FONT_SIZE: f32 = 14.0;

/// Chart palette shared by the interactive document and static snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Theme {
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_text")]
    pub text: String,
    #[serde(default = "default_muted_text")]
    pub muted_text: String,
    #[serde(default = "default_node_fill")]
    pub node_fill: String,
    #[serde(default = "default_node_stroke")]
    pub node_stroke: String,
    #[serde(default = "default_virtual_fill")]
    pub virtual_fill: String,
    #[serde(default = "default_virtual_stroke")]
    pub virtual_stroke: String,
    #[serde(default = "default_highlight_fill")]
    pub highlight_fill: String,
    #[serde(default = "default_active_stroke")]
    pub active_stroke: String,
    #[serde(default = "default_edge")]
    pub edge: String,

    #[serde(default = "default_font_family")]
    pub font_family: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

fn default_background() -> String {
    PAPER_BACKGROUND.to_string()
}
fn default_text() -> String {
    PAPER_TEXT.to_string()
}
fn default_muted_text() -> String {
    PAPER_MUTED_TEXT.to_string()
}
fn default_node_fill() -> String {
    PAPER_NODE_FILL.to_string()
}
fn default_node_stroke() -> String {
    PAPER_NODE_STROKE.to_string()
}
fn default_virtual_fill() -> String {
    PAPER_VIRTUAL_FILL.to_string()
}
fn default_virtual_stroke() -> String {
    PAPER_VIRTUAL_STROKE.to_string()
}
fn default_highlight_fill() -> String {
    PAPER_HIGHLIGHT_FILL.to_string()
}
fn default_active_stroke() -> String {
    PAPER_ACTIVE_STROKE.to_string()
}
fn default_edge() -> String {
    PAPER_EDGE.to_string()
}
fn default_font_family() -> String {
    FONT_FAMILY.to_string()
}
fn default_font_size() -> f32 {
    FONT_SIZE
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_builtin("paper").expect("built-in paper theme must parse")
    }
}

impl Theme {
    pub fn from_builtin(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('-', "_");
        let content = BUILTIN_THEMES
            .iter()
            .find(|(n, _)| *n == normalized)
            .map(|(_, c)| *c)
            .ok_or_else(|| {
                Error::Config(format!(
                    "unknown built-in theme '{}'. Available: {}",
                    name,
                    Self::list_builtins().join(", ")
                ))
            })?;
        Self::from_toml(content)
    }

    pub fn list_builtins() -> Vec<&'static str> {
        BUILTIN_THEMES.iter().map(|(n, _)| *n).collect()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse theme TOML: {e}")))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("failed to parse theme YAML: {e}")))
    }

    /// Resolve a built-in name, or a TOML/YAML palette file path.
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        let path = std::path::Path::new(name_or_path);
        if !path.is_file() {
            return Self::from_builtin(name_or_path);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).or_else(|_| Self::from_yaml(&content))
    }

    /// Label colour for text drawn on `fill`.
    pub fn label_on(&self, fill: &str) -> String {
        pick_higher_contrast(fill, &self.text, &self.background)
    }
}

fn parse_hex_rgb(value: &str) -> Option<(f32, f32, f32)> {
    let hex = value.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()? as f32 / 255.0;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()? as f32 / 255.0;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()? as f32 / 255.0;
    Some((r, g, b))
}

fn relative_luminance(color: (f32, f32, f32)) -> f32 {
    let linear = |v: f32| {
        if v <= 0.03928 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    };

    let (r, g, b) = color;
    0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b)
}

fn contrast_ratio(a: &str, b: &str) -> Option<f32> {
    let l1 = relative_luminance(parse_hex_rgb(a)?);
    let l2 = relative_luminance(parse_hex_rgb(b)?);
    let (hi, lo) = if l1 >= l2 { (l1, l2) } else { (l2, l1) };
    Some((hi + 0.05) / (lo + 0.05))
}

fn pick_higher_contrast(base: &str, primary: &str, secondary: &str) -> String {
    let p = contrast_ratio(base, primary).unwrap_or(0.0);
    let s = contrast_ratio(base, secondary).unwrap_or(0.0);

    if s > p {
        secondary.to_string()
    } else {
        primary.to_string()
    }
}
