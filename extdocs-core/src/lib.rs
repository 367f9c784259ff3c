//! Extdocs Core - extension documentation rendering
//!
//! Pulls outline trees out of the graph store, resolves block references and
//! embeds, and serializes the result as markdown with component tags for an
//! MDX renderer downstream.

pub mod config;
pub mod error;
pub mod items;
pub mod node;
pub mod query;
pub mod render;
pub mod resolve;
pub mod router;
pub mod splice;
pub mod store;

pub use config::Config;
pub use error::DocError;
pub use items::{ExtensionItem, ItemStore, MemoryItemStore};
pub use node::{OutlineNode, RawNode, TextAlign, ViewType};
pub use query::GraphClient;
pub use render::Renderer;
pub use resolve::{ContentBlocks, Resolver};
pub use router::{CatalogEntry, ContentRouter, PathContent, SubpagePath};
pub use splice::{apply_replacements, ReplacementSpan};
pub use store::{BlockStore, MemoryStore, TreeKey};

/// Result type alias for documentation operations
pub type Result<T> = std::result::Result<T, DocError>;
