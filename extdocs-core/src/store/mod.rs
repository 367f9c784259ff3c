//! Block store seam
//!
//! The resolver only needs four lookups from the graph. [`GraphClient`]
//! answers them with remote queries; [`MemoryStore`] answers them from page
//! trees held in process.
//!
//! [`GraphClient`]: crate::GraphClient

mod graph;
mod memory;

pub use memory::MemoryStore;

use crate::RawNode;
use async_trait::async_trait;

/// How a subtree is addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeKey {
    /// A page, by exact title
    Title(String),
    /// Any block, by uid
    Uid(String),
}

impl TreeKey {
    pub fn value(&self) -> &str {
        match self {
            Self::Title(v) | Self::Uid(v) => v,
        }
    }
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Full subtree rooted at the addressed block, if it exists.
    async fn pull_tree(&self, key: &TreeKey) -> crate::Result<Option<RawNode>>;

    /// Title of the page containing `uid`; empty when unknown.
    async fn page_title_by_block_uid(&self, uid: &str) -> crate::Result<String>;

    /// Text of block `uid`; empty when unknown.
    async fn text_by_block_uid(&self, uid: &str) -> crate::Result<String>;

    /// `(page, subpage)` title pairs for every documented page and each page
    /// whose title starts with the documented page's title.
    async fn documented_subpages(&self) -> crate::Result<Vec<(String, String)>>;
}
