//! Configuration for the documentation service

use crate::DocError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration as TOML
pub const DEFAULT_CONFIG: &str = r#"# Extdocs Configuration

[graph]
# Base URL of the graph query API
api_base = "https://api.roamresearch.com"
# Graph holding the extension documentation pages
name = "roamjs"

[site]
# Route prefix for rendered extension pages
extensions_path = "/extensions"
# Absolute links to this origin are rewritten in development
public_origin = "https://roamjs.com"
dev_origin = "http://localhost:3000"
development = false

[github]
# Host serving raw repository files for README passthrough
raw_base = "https://raw.githubusercontent.com"
branch = "main"
"#;

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_graph_name")]
    pub name: String,
    /// Bearer token; normally injected from the environment, not the file.
    #[serde(default, skip_serializing)]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_extensions_path")]
    pub extensions_path: String,
    #[serde(default = "default_public_origin")]
    pub public_origin: String,
    #[serde(default = "default_dev_origin")]
    pub dev_origin: String,
    #[serde(default)]
    pub development: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

// Default value functions
fn default_api_base() -> String {
    "https://api.roamresearch.com".to_string()
}
fn default_graph_name() -> String {
    "roamjs".to_string()
}
fn default_extensions_path() -> String {
    "/extensions".to_string()
}
fn default_public_origin() -> String {
    "https://roamjs.com".to_string()
}
fn default_dev_origin() -> String {
    "http://localhost:3000".to_string()
}
fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}
fn default_branch() -> String {
    "main".to_string()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            name: default_graph_name(),
            token: String::new(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            extensions_path: default_extensions_path(),
            public_origin: default_public_origin(),
            dev_origin: default_dev_origin(),
            development: false,
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            raw_base: default_raw_base(),
            branch: default_branch(),
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| DocError::ConfigParse(e.to_string()))
    }

    /// Query endpoint of the configured graph
    pub fn query_url(&self) -> String {
        format!(
            "{}/api/graph/{}/q",
            self.graph.api_base.trim_end_matches('/'),
            self.graph.name
        )
    }
}

impl SiteConfig {
    /// Rewrite absolute links to the public origin when running in development.
    pub fn localize_links(&self, text: &str) -> String {
        if self.development && !self.public_origin.is_empty() {
            text.replace(&self.public_origin, &self.dev_origin)
        } else {
            text.to_string()
        }
    }
}

impl GithubConfig {
    /// Raw README location for a `https://github.com/<owner>/<repo>` URL.
    pub fn readme_url(&self, repo_url: &str) -> String {
        let repo = repo_url
            .strip_prefix("https://github.com")
            .unwrap_or(repo_url);
        format!(
            "{}{}/{}/README.md",
            self.raw_base.trim_end_matches('/'),
            repo,
            self.branch
        )
    }
}
