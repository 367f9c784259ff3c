use super::{BlockStore, TreeKey};
use crate::query::{block_text_query, page_title_query, tree_query, SUBPAGES_QUERY};
use crate::{GraphClient, RawNode};
use async_trait::async_trait;

fn first_field(rows: Vec<Vec<RawNode>>) -> Option<RawNode> {
    rows.into_iter().flatten().next()
}

#[async_trait]
impl BlockStore for GraphClient {
    async fn pull_tree(&self, key: &TreeKey) -> crate::Result<Option<RawNode>> {
        let attribute = match key {
            TreeKey::Title(_) => ":node/title",
            TreeKey::Uid(_) => ":block/uid",
        };
        let rows = self.query(&tree_query(attribute, key.value())).await?;
        Ok(first_field(rows))
    }

    async fn page_title_by_block_uid(&self, uid: &str) -> crate::Result<String> {
        let rows = self.query(&page_title_query(uid)).await?;
        Ok(first_field(rows).and_then(|n| n.title).unwrap_or_default())
    }

    async fn text_by_block_uid(&self, uid: &str) -> crate::Result<String> {
        let rows = self.query(&block_text_query(uid)).await?;
        Ok(first_field(rows).and_then(|n| n.string).unwrap_or_default())
    }

    async fn documented_subpages(&self) -> crate::Result<Vec<(String, String)>> {
        let rows = self.query(SUBPAGES_QUERY).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let mut fields = row.into_iter();
                let page = fields.next()?.title?;
                let sub = fields.next()?.title?;
                Some((page, sub))
            })
            .collect())
    }
}
