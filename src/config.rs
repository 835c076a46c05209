use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layout::LayoutMetrics;

const DEFAULT_TOKEN_ENV: &str = "ORGTREE_TOKEN";
const DEFAULT_TITLE: &str = "Organization Chart";
const DEFAULT_THEME: &str = "paper";

/// Explicit configuration handed to the binaries' collaborators.
///
/// Nothing in the library reads the process environment; credentials are
/// resolved by the caller through [`Credentials::from_env`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    File,
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Sources used when none are given on the command line.
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}
fn default_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: String::new(),
            token_env: default_token_env(),
            groups: Vec::new(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(flatten)]
    pub metrics: LayoutMetrics,
    /// Levels expanded when a document is first opened.
    #[serde(default = "default_initial_depth")]
    pub initial_depth: usize,
}

fn default_initial_depth() -> usize {
    1
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            metrics: LayoutMetrics::default(),
            initial_depth: default_initial_depth(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}
fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            theme: default_theme(),
        }
    }
}

impl Config {
    /// Parse a configuration document, TOML first, then YAML.
    pub fn parse(content: &str) -> Result<Self> {
        match toml::from_str::<Config>(content) {
            Ok(config) => Ok(config),
            Err(toml_err) => serde_yaml::from_str::<Config>(content).map_err(|yaml_err| {
                Error::Config(format!(
                    "not valid TOML ({toml_err}) or YAML ({yaml_err})"
                ))
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

/// Provider credentials resolved once at start-up.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("token", &"***").finish()
    }
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(token) if !token.trim().is_empty() => Ok(Self::new(token.trim())),
            _ => Err(Error::MissingCredentials {
                var: var.to_string(),
            }),
        }
    }
}
