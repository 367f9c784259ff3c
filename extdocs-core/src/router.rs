//! Request-level orchestration: pick a rendering mode for an extension id
//! and produce the page payload, subpage list or catalog.

use crate::items::ItemStore;
use crate::resolve::{ContentBlocks, Resolver};
use crate::store::{BlockStore, TreeKey};
use crate::{Config, DocError, OutlineNode, Renderer};
use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

fn github_repo_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https://github\.com/[A-Za-z0-9_-]+/[A-Za-z0-9_-]+$").expect("github pattern")
    })
}

fn is_documentation(text: &str) -> bool {
    text.trim().eq_ignore_ascii_case("documentation")
}

/// How a path request was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Docs are a single GitHub repository link; its README is passed through
    ExternalReadme,
    /// Subpage request (`<id>/<subpath>`), all top-level blocks rendered
    SingleSubtree,
    /// Extension root, children of the "Documentation" block rendered
    FullPage,
}

impl RenderMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExternalReadme => "external_readme",
            Self::SingleSubtree => "single_subtree",
            Self::FullPage => "full_page",
        }
    }
}

/// Payload for `?id=<id>`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathContent {
    pub content: String,
    pub state: String,
    pub description: String,
    pub entry: String,
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubpagePath {
    pub id: String,
    pub subpage: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub featured: i64,
    pub entry: String,
}

pub struct ContentRouter {
    blocks: Arc<dyn BlockStore>,
    items: Arc<dyn ItemStore>,
    http: reqwest::Client,
    config: Config,
}

impl ContentRouter {
    pub fn new(
        config: Config,
        blocks: Arc<dyn BlockStore>,
        items: Arc<dyn ItemStore>,
    ) -> crate::Result<Self> {
        Ok(Self {
            blocks,
            items,
            http: reqwest::Client::builder().build()?,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Render the documentation for `id` (`<extension>` or
    /// `<extension>/<subpage>`) along with the extension's metadata.
    pub async fn render_path(&self, id: &str) -> crate::Result<PathContent> {
        let base = id.split('/').next().unwrap_or_default();
        let item = self
            .items
            .get(base)
            .await?
            .ok_or_else(|| DocError::NotFound(format!("extension {}", base)))?;

        let content = self.render_content(id).await?;
        Ok(PathContent {
            content,
            state: item.state.unwrap_or_else(|| "PRIVATE".to_string()),
            description: item.description.unwrap_or_default(),
            entry: item.src.unwrap_or_default(),
            download_url: item.download.unwrap_or_default(),
        })
    }

    /// Markdown for `id`, or the raw README when the docs point at GitHub.
    pub async fn render_content(&self, id: &str) -> crate::Result<String> {
        let start = Instant::now();
        let resolver = Resolver::new(self.blocks.as_ref(), id, &self.config.site.extensions_path);
        let ContentBlocks {
            blocks,
            view_type,
            path,
            ..
        } = resolver
            .content_blocks(&TreeKey::Title(id.to_string()))
            .await?;

        let (docs, mut mode) = if id == path {
            (documentation_children(blocks), RenderMode::FullPage)
        } else {
            (blocks, RenderMode::SingleSubtree)
        };

        let content = match docs.as_slice() {
            [only] if github_repo_regex().is_match(&only.text) => {
                mode = RenderMode::ExternalReadme;
                self.fetch_readme(&only.text).await?
            }
            _ => Renderer::new(&self.config.site, &path)?.render_all(&docs, view_type),
        };

        tracing::info!(
            id,
            mode = mode.as_str(),
            bytes = content.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "rendered path"
        );
        Ok(content)
    }

    async fn fetch_readme(&self, repo_url: &str) -> crate::Result<String> {
        let url = self.config.github.readme_url(repo_url);
        tracing::debug!(url = %url, "fetching README");
        let body = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(self.config.site.localize_links(&body))
    }

    /// Every documented subpage, as `{id, subpage: [segments]}`.
    pub async fn subpages(&self) -> crate::Result<Vec<SubpagePath>> {
        let pairs = self.blocks.documented_subpages().await?;
        Ok(pairs
            .into_iter()
            .filter_map(|(page, sub)| {
                let rest = sub.strip_prefix(page.as_str())?.strip_prefix('/')?;
                Some(SubpagePath {
                    subpage: rest.split('/').map(str::to_string).collect(),
                    id: page,
                })
            })
            .collect())
    }

    /// Every extension in the item store.
    pub async fn catalog(&self) -> crate::Result<Vec<CatalogEntry>> {
        let items = self.items.scan().await?;
        Ok(items
            .into_iter()
            .map(|item| CatalogEntry {
                id: item.id,
                description: item.description,
                state: item.state,
                featured: item.featured.unwrap_or(0),
                entry: item.src.unwrap_or_default(),
            })
            .collect())
    }
}

fn documentation_children(blocks: Vec<OutlineNode>) -> Vec<OutlineNode> {
    blocks
        .into_iter()
        .find(|b| is_documentation(&b.text))
        .map(|b| b.children)
        .unwrap_or_default()
}
