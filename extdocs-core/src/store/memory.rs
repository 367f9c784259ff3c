use super::{BlockStore, TreeKey};
use crate::RawNode;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

struct IndexedBlock {
    node: RawNode,
    page: String,
}

/// Page trees held in process, indexed by title and block uid.
///
/// Loaded from a JSON array of pull-shaped pages, the same shape a
/// `(pull ?b [... {:block/children ...}])` query returns.
#[derive(Default)]
pub struct MemoryStore {
    pages: BTreeMap<String, RawNode>,
    blocks: HashMap<String, IndexedBlock>,
}

impl MemoryStore {
    pub fn new(pages: Vec<RawNode>) -> Self {
        let mut store = Self::default();
        for page in pages {
            store.insert_page(page);
        }
        store
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        let pages: Vec<RawNode> = serde_json::from_str(json)?;
        Ok(Self::new(pages))
    }

    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn insert_page(&mut self, page: RawNode) {
        let title = page.title.clone().unwrap_or_default();
        for child in &page.children {
            self.index_block(child, &title);
        }
        // A page is addressable by its own uid but sits on no page.
        self.index_uid(&page, "");
        self.pages.insert(title, page);
    }

    fn index_block(&mut self, node: &RawNode, page: &str) {
        for child in &node.children {
            self.index_block(child, page);
        }
        self.index_uid(node, page);
    }

    fn index_uid(&mut self, node: &RawNode, page: &str) {
        if let Some(uid) = &node.uid {
            self.blocks.insert(
                uid.clone(),
                IndexedBlock {
                    node: node.clone(),
                    page: page.to_string(),
                },
            );
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[async_trait]
impl BlockStore for MemoryStore {
    async fn pull_tree(&self, key: &TreeKey) -> crate::Result<Option<RawNode>> {
        Ok(match key {
            TreeKey::Title(title) => self.pages.get(title).cloned(),
            TreeKey::Uid(uid) => self.blocks.get(uid).map(|b| b.node.clone()),
        })
    }

    async fn page_title_by_block_uid(&self, uid: &str) -> crate::Result<String> {
        Ok(self
            .blocks
            .get(uid)
            .map(|b| b.page.clone())
            .unwrap_or_default())
    }

    async fn text_by_block_uid(&self, uid: &str) -> crate::Result<String> {
        Ok(self
            .blocks
            .get(uid)
            .and_then(|b| b.node.string.clone())
            .unwrap_or_default())
    }

    async fn documented_subpages(&self) -> crate::Result<Vec<(String, String)>> {
        let documented = self.pages.iter().filter(|(title, page)| {
            !title.starts_with("legacy")
                && page
                    .children
                    .iter()
                    .any(|c| c.string.as_deref() == Some("Documentation"))
        });

        let mut pairs = Vec::new();
        for (title, _) in documented {
            for sub in self.pages.keys().filter(|s| s.starts_with(title.as_str())) {
                pairs.push((title.clone(), sub.clone()));
            }
        }
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> MemoryStore {
        MemoryStore::from_json(
            r#"[
              {":node/title": "query-builder", ":block/uid": "qbpageuid", ":block/children": [
                {":block/string": "Documentation", ":block/uid": "docsblock1", ":block/children": [
                  {":block/string": "Intro", ":block/uid": "introblk1"}
                ]}
              ]},
              {":node/title": "query-builder/advanced", ":block/children": [
                {":block/string": "Deep", ":block/uid": "deepblock1"}
              ]},
              {":node/title": "legacy-thing", ":block/children": [
                {":block/string": "Documentation"}
              ]}
            ]"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_lookup_by_uid_and_title() {
        let store = fixture();
        assert_eq!(store.page_count(), 3);

        let page = store
            .pull_tree(&TreeKey::Title("query-builder".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.children.len(), 1);

        let block = store
            .pull_tree(&TreeKey::Uid("docsblock1".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(block.children[0].text(), "Intro");

        assert_eq!(store.text_by_block_uid("introblk1").await.unwrap(), "Intro");
        assert_eq!(
            store.page_title_by_block_uid("introblk1").await.unwrap(),
            "query-builder"
        );
        assert_eq!(store.text_by_block_uid("missing00").await.unwrap(), "");
        assert!(store
            .pull_tree(&TreeKey::Uid("missing00".to_string()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_page_uid_is_indexed() {
        let store = fixture();
        let page = store
            .pull_tree(&TreeKey::Uid("qbpageuid".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(page.text(), "query-builder");
        assert_eq!(page.children[0].uid.as_deref(), Some("docsblock1"));

        // pages carry no block string and belong to no page
        assert_eq!(store.text_by_block_uid("qbpageuid").await.unwrap(), "");
        assert_eq!(
            store.page_title_by_block_uid("qbpageuid").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_documented_subpages_skip_legacy() {
        let pairs = fixture().documented_subpages().await.unwrap();
        assert_eq!(
            pairs,
            vec![
                ("query-builder".to_string(), "query-builder".to_string()),
                (
                    "query-builder".to_string(),
                    "query-builder/advanced".to_string()
                ),
            ]
        );
    }
}
