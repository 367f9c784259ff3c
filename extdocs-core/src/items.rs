//! Extension metadata records (state, description, entry script, download)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtensionItem {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Entry script URL
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub download: Option<String>,
    #[serde(default)]
    pub featured: Option<i64>,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, id: &str) -> crate::Result<Option<ExtensionItem>>;
    async fn scan(&self) -> crate::Result<Vec<ExtensionItem>>;
}

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: BTreeMap<String, ExtensionItem>,
}

impl MemoryItemStore {
    pub fn new(items: Vec<ExtensionItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id.clone(), i)).collect(),
        }
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let items: Vec<ExtensionItem> = serde_json::from_str(json)?;
        Ok(Self::new(items))
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get(&self, id: &str) -> crate::Result<Option<ExtensionItem>> {
        Ok(self.items.get(id).cloned())
    }

    async fn scan(&self) -> crate::Result<Vec<ExtensionItem>> {
        Ok(self.items.values().cloned().collect())
    }
}
