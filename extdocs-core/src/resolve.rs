//! Reference resolution and tree formatting
//!
//! Block text may carry three kinds of references:
//!
//! - embeds, `{{embed: ((uid))}}`, which inline another block's subtree;
//! - aliased block links, `[label](((uid)))`;
//! - bare block references, `((uid))`.
//!
//! Every reference in one text is resolved concurrently, then the produced
//! spans are spliced into the original text. Embeds also append the embedded
//! block's children after the current node's own children.

use crate::splice::{apply_replacements, ReplacementSpan};
use crate::store::{BlockStore, TreeKey};
use crate::{DocError, OutlineNode, RawNode, ViewType};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

const BLOCK_UID: &str = r"\(\(([A-Za-z0-9_-]{9,10})\)\)";

fn block_ref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BLOCK_UID).expect("block ref pattern"))
}

fn embed_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"\{{\{{(?:\[\[)?embed(?:\]\])?:\s*{BLOCK_UID}\s*\}}\}}");
        Regex::new(&pattern).expect("embed pattern")
    })
}

fn alias_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"\[(.*?)\]\({BLOCK_UID}\)");
        Regex::new(&pattern).expect("alias pattern")
    })
}

/// Formatted children of a pulled root, plus the root's own attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentBlocks {
    pub blocks: Vec<OutlineNode>,
    /// View type the root declares for its children (bullet by default)
    pub view_type: ViewType,
    /// First segment of the requested key
    pub path: String,
    /// Root string or title
    pub text: String,
}

struct RefMatch {
    range: Range<usize>,
    uid: String,
    label: String,
}

/// Embeds, aliases and bare references in `text`. A match overlapping a
/// match of an earlier kind (embed, then alias, then bare) is dropped so
/// spans never overlap.
fn scan_references(text: &str) -> (Vec<RefMatch>, Vec<RefMatch>, Vec<RefMatch>) {
    let embeds: Vec<RefMatch> = embed_regex()
        .captures_iter(text)
        .filter_map(|c| {
            Some(RefMatch {
                range: c.get(0)?.range(),
                uid: c.get(1)?.as_str().to_string(),
                label: String::new(),
            })
        })
        .collect();

    let claimed = |ranges: &[&Range<usize>], r: &Range<usize>| {
        ranges.iter().any(|c| c.start < r.end && r.start < c.end)
    };

    let embed_ranges: Vec<&Range<usize>> = embeds.iter().map(|m| &m.range).collect();
    let aliases: Vec<RefMatch> = alias_regex()
        .captures_iter(text)
        .filter_map(|c| {
            Some(RefMatch {
                range: c.get(0)?.range(),
                label: c.get(1)?.as_str().to_string(),
                uid: c.get(2)?.as_str().to_string(),
            })
        })
        .filter(|m| !claimed(&embed_ranges, &m.range))
        .collect();

    let taken: Vec<&Range<usize>> = embeds
        .iter()
        .chain(aliases.iter())
        .map(|m| &m.range)
        .collect();
    let bare: Vec<RefMatch> = block_ref_regex()
        .captures_iter(text)
        .filter_map(|c| {
            let whole = c.get(0)?;
            // not directly followed by `}` or `)`
            if matches!(text[whole.end()..].chars().next(), Some('}' | ')')) {
                return None;
            }
            Some(RefMatch {
                range: whole.range(),
                uid: c.get(1)?.as_str().to_string(),
                label: whole.as_str().to_string(),
            })
        })
        .filter(|m| !claimed(&taken, &m.range))
        .collect();

    (embeds, aliases, bare)
}

/// Page path as used in site routes: spaces become underscores, lowercased.
pub fn page_path(title: &str) -> String {
    title.replace(' ', "_").to_lowercase()
}

/// Resolves references and builds outline trees for one request.
pub struct Resolver<'a> {
    store: &'a dyn BlockStore,
    /// Requested id, possibly with a subpath; pages outside it are external.
    id: &'a str,
    extensions_path: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn BlockStore, id: &'a str, extensions_path: &'a str) -> Self {
        Self {
            store,
            id,
            extensions_path,
        }
    }

    fn is_external(&self, page: &str) -> bool {
        page != self.id
            && !page
                .strip_prefix(self.id)
                .is_some_and(|rest| rest.starts_with('/'))
    }

    fn internal_link(&self, label: &str, page: &str, uid: &str) -> String {
        format!("[{}]({}/{}#{})", label, self.extensions_path, page, uid)
    }

    /// Pull and format the tree addressed by `key`. A missing tree yields no
    /// blocks.
    pub async fn content_blocks(&self, key: &TreeKey) -> crate::Result<ContentBlocks> {
        let path: String = key.value().split('/').take(1).collect();
        match self.store.pull_tree(key).await? {
            Some(raw) => self.format_root(raw, path, &[]).await,
            None => Ok(ContentBlocks {
                blocks: Vec::new(),
                view_type: ViewType::Bullet,
                path,
                text: String::new(),
            }),
        }
    }

    /// Resolve every reference in `text`. Children pulled in by embeds are
    /// appended to `children`.
    pub async fn resolve_text(
        &self,
        text: &str,
        children: &mut Vec<OutlineNode>,
    ) -> crate::Result<String> {
        let (resolved, mut embedded) = self.resolve_text_in(text, &[]).await?;
        children.append(&mut embedded);
        Ok(resolved)
    }

    /// Format one raw node and its subtree.
    pub async fn format_node(
        &self,
        raw: RawNode,
        inherited: ViewType,
    ) -> crate::Result<OutlineNode> {
        self.format_node_in(raw, inherited, &[]).await
    }

    fn format_root<'s>(
        &'s self,
        raw: RawNode,
        path: String,
        chain: &'s [String],
    ) -> BoxFuture<'s, crate::Result<ContentBlocks>> {
        async move {
            let view_type = raw.declared_view_type()?.unwrap_or_default();
            let text = raw.text().to_string();
            let blocks = try_join_all(
                raw.into_sorted_children()
                    .into_iter()
                    .map(|c| self.format_node_in(c, view_type, chain)),
            )
            .await?;
            Ok(ContentBlocks {
                blocks,
                view_type,
                path,
                text,
            })
        }
        .boxed()
    }

    fn format_node_in<'s>(
        &'s self,
        raw: RawNode,
        inherited: ViewType,
        chain: &'s [String],
    ) -> BoxFuture<'s, crate::Result<OutlineNode>> {
        async move {
            let view_type = raw.declared_view_type()?.unwrap_or(inherited);
            let mut node = OutlineNode::from_raw_attributes(&raw, view_type)?;
            let text = raw.text().to_string();

            node.children = try_join_all(
                raw.into_sorted_children()
                    .into_iter()
                    .map(|c| self.format_node_in(c, view_type, chain)),
            )
            .await?;

            // Embedded children go after the sorted originals, unsorted.
            let (resolved, mut embedded) = self.resolve_text_in(&text, chain).await?;
            node.text = resolved;
            node.children.append(&mut embedded);
            Ok(node)
        }
        .boxed()
    }

    /// `chain` holds the uids of the embeds currently being expanded.
    fn resolve_text_in<'s>(
        &'s self,
        text: &'s str,
        chain: &'s [String],
    ) -> BoxFuture<'s, crate::Result<(String, Vec<OutlineNode>)>> {
        async move {
            let (embeds, aliases, bare) = scan_references(text);
            if embeds.is_empty() && aliases.is_empty() && bare.is_empty() {
                return Ok((text.to_string(), Vec::new()));
            }

            let embed_spans =
                try_join_all(embeds.into_iter().map(|m| self.resolve_embed(m, chain)));
            let alias_spans = try_join_all(aliases.into_iter().map(|m| self.resolve_alias(m)));
            let bare_spans = try_join_all(bare.into_iter().map(|m| self.resolve_block_ref(m)));
            let (embedded, alias_spans, bare_spans) =
                futures::try_join!(embed_spans, alias_spans, bare_spans)?;

            let mut spans = Vec::new();
            let mut children = Vec::new();
            for (span, mut blocks) in embedded {
                spans.push(span);
                children.append(&mut blocks);
            }
            spans.extend(alias_spans);
            spans.extend(bare_spans);

            Ok((apply_replacements(text, spans), children))
        }
        .boxed()
    }

    async fn resolve_embed(
        &self,
        m: RefMatch,
        chain: &[String],
    ) -> crate::Result<(ReplacementSpan, Vec<OutlineNode>)> {
        if chain.contains(&m.uid) {
            return Err(DocError::ReferenceCycle(m.uid));
        }
        let raw = self
            .store
            .pull_tree(&TreeKey::Uid(m.uid.clone()))
            .await?
            .ok_or_else(|| DocError::NotFound(format!("embedded block {}", m.uid)))?;

        let mut nested = chain.to_vec();
        nested.push(m.uid.clone());
        let content = self.format_root(raw, m.uid, &nested).await?;
        let (value, mut embedded) = self.resolve_text_in(&content.text, &nested).await?;

        let mut blocks = content.blocks;
        blocks.append(&mut embedded);
        Ok((ReplacementSpan::new(value, m.range), blocks))
    }

    async fn resolve_alias(&self, m: RefMatch) -> crate::Result<ReplacementSpan> {
        let page = self.store.page_title_by_block_uid(&m.uid).await?;
        let value = if self.is_external(&page) {
            m.label
        } else {
            self.internal_link(&m.label, &page, &m.uid)
        };
        Ok(ReplacementSpan::new(value, m.range))
    }

    async fn resolve_block_ref(&self, m: RefMatch) -> crate::Result<ReplacementSpan> {
        let (reference, title) = futures::try_join!(
            self.store.text_by_block_uid(&m.uid),
            self.store.page_title_by_block_uid(&m.uid)
        )?;
        let page = page_path(&title);
        let label = if reference.is_empty() {
            m.label
        } else {
            reference
        };
        let value = if self.is_external(&page) {
            label
        } else {
            self.internal_link(&label, &page, &m.uid)
        };
        Ok(ReplacementSpan::new(value, m.range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::splice::spans_overlap;
    use crate::MemoryStore;
    use async_trait::async_trait;
    use std::time::Duration;

    fn block(uid: &str, text: &str, order: i64, children: Vec<RawNode>) -> RawNode {
        RawNode {
            string: Some(text.to_string()),
            uid: Some(uid.to_string()),
            order: Some(order),
            children,
            ..RawNode::default()
        }
    }

    fn page(title: &str, children: Vec<RawNode>) -> RawNode {
        RawNode {
            title: Some(title.to_string()),
            children,
            ..RawNode::default()
        }
    }

    fn store() -> MemoryStore {
        MemoryStore::new(vec![
            page(
                "widget",
                vec![
                    block("intro0001", "Intro text", 0, vec![]),
                    block("emptyblk1", "", 1, vec![]),
                    block(
                        "embedsrc1",
                        "Embedded title",
                        2,
                        vec![
                            block("embchild2", "second", 1, vec![]),
                            block("embchild1", "first", 0, vec![]),
                        ],
                    ),
                    block(
                        "nestsrc01",
                        "outer {{embed: ((embedsrc1))}}",
                        3,
                        vec![block("nestchild", "nested child", 0, vec![])],
                    ),
                    block("cyclea001", "a {{embed: ((cycleb001))}}", 4, vec![]),
                    block("cycleb001", "b {{[[embed]]: ((cyclea001))}}", 5, vec![]),
                ],
            ),
            page(
                "widget/advanced",
                vec![block("advblock1", "Advanced", 0, vec![])],
            ),
            page(
                "Other Page",
                vec![block("other0001", "Elsewhere", 0, vec![])],
            ),
        ])
    }

    async fn resolve(
        store: &MemoryStore,
        text: &str,
    ) -> crate::Result<(String, Vec<OutlineNode>)> {
        let resolver = Resolver::new(store, "widget", "/extensions");
        let mut children = Vec::new();
        let text = resolver.resolve_text(text, &mut children).await?;
        Ok((text, children))
    }

    /// Delays every lookup by the first letter of its uid, so lookups for
    /// `a...` finish last and `b...` second to last.
    struct SlowStore(MemoryStore);

    async fn lag(uid: &str) {
        let ms = match uid.as_bytes().first() {
            Some(b'a') => 60,
            Some(b'b') => 30,
            _ => 1,
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[async_trait]
    impl BlockStore for SlowStore {
        async fn pull_tree(&self, key: &TreeKey) -> crate::Result<Option<RawNode>> {
            lag(key.value()).await;
            self.0.pull_tree(key).await
        }

        async fn page_title_by_block_uid(&self, uid: &str) -> crate::Result<String> {
            lag(uid).await;
            self.0.page_title_by_block_uid(uid).await
        }

        async fn text_by_block_uid(&self, uid: &str) -> crate::Result<String> {
            lag(uid).await;
            self.0.text_by_block_uid(uid).await
        }

        async fn documented_subpages(&self) -> crate::Result<Vec<(String, String)>> {
            self.0.documented_subpages().await
        }
    }

    #[tokio::test]
    async fn test_plain_text_untouched() {
        let store = store();
        let (text, children) = resolve(&store, "no references [here](there)")
            .await
            .unwrap();
        assert_eq!(text, "no references [here](there)");
        assert!(children.is_empty());
    }

    #[tokio::test]
    async fn test_internal_block_ref_becomes_link() {
        let store = store();
        let (text, _) = resolve(&store, "see ((intro0001)) and ((advblock1))")
            .await
            .unwrap();
        assert_eq!(
            text,
            "see [Intro text](/extensions/widget#intro0001) and \
             [Advanced](/extensions/widget/advanced#advblock1)"
        );
    }

    #[tokio::test]
    async fn test_external_block_ref_is_plain_text() {
        let store = store();
        let (text, _) = resolve(&store, "see ((other0001)).").await.unwrap();
        assert_eq!(text, "see Elsewhere.");

        // unknown block: no text, no page
        let (text, _) = resolve(&store, "see ((unknown00)).").await.unwrap();
        assert_eq!(text, "see ((unknown00)).");
    }

    #[tokio::test]
    async fn test_internal_empty_block_ref_keeps_reference() {
        let store = store();
        let (text, _) = resolve(&store, "((emptyblk1))").await.unwrap();
        assert_eq!(text, "[((emptyblk1))](/extensions/widget#emptyblk1)");
    }

    #[tokio::test]
    async fn test_alias_links() {
        let store = store();
        let (text, _) = resolve(&store, "[here](((intro0001))) or [there](((other0001)))")
            .await
            .unwrap();
        assert_eq!(text, "[here](/extensions/widget#intro0001) or there");
    }

    #[tokio::test]
    async fn test_embed_splices_children_in_their_own_order() {
        let store = store();
        let resolver = Resolver::new(&store, "widget", "/extensions");
        let mut children = vec![OutlineNode {
            order: 9,
            ..OutlineNode::new("existing1", "existing")
        }];
        let text = resolver
            .resolve_text("before {{embed: ((embedsrc1))}} after", &mut children)
            .await
            .unwrap();

        assert_eq!(text, "before Embedded title after");
        let uids: Vec<&str> = children.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids, vec!["existing1", "embchild1", "embchild2"]);
    }

    #[tokio::test]
    async fn test_nested_embed_accumulates_after_outer_blocks() {
        let store = store();
        let (text, children) = resolve(&store, "{{[[embed]]: ((nestsrc01)) }}")
            .await
            .unwrap();
        assert_eq!(text, "outer Embedded title");
        let uids: Vec<&str> = children.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids, vec!["nestchild", "embchild1", "embchild2"]);
    }

    #[tokio::test]
    async fn test_output_follows_match_order_not_completion_order() {
        let blocks = vec![
            block(
                "aembed001",
                "A",
                0,
                vec![block("achild001", "from a", 0, vec![])],
            ),
            block(
                "bembed001",
                "B",
                1,
                vec![block("bchild001", "from b", 0, vec![])],
            ),
            block("crefblk01", "C", 2, vec![]),
        ];
        let store = SlowStore(MemoryStore::new(vec![page("widget", blocks)]));
        let resolver = Resolver::new(&store, "widget", "/extensions");
        let text = "x {{embed: ((aembed001))}} y {{embed: ((bembed001))}} \
                    z ((crefblk01)) w [l](((aembed001)))";

        let mut children = Vec::new();
        let resolved = resolver.resolve_text(text, &mut children).await.unwrap();
        assert_eq!(
            resolved,
            "x A y B z [C](/extensions/widget#crefblk01) w [l](/extensions/widget#aembed001)"
        );
        let uids: Vec<&str> = children.iter().map(|c| c.uid.as_str()).collect();
        assert_eq!(uids, vec!["achild001", "bchild001"]);
    }

    #[tokio::test]
    async fn test_embed_of_page_uid() {
        let mut root = page(
            "Shared Notes",
            vec![block("shared001", "shared", 0, vec![])],
        );
        root.uid = Some("sharedpg1".to_string());
        let store = MemoryStore::new(vec![root]);

        let (text, children) = resolve(&store, "{{embed: ((sharedpg1))}}").await.unwrap();
        assert_eq!(text, "Shared Notes");
        assert_eq!(children[0].uid, "shared001");
    }

    #[tokio::test]
    async fn test_embed_cycle_is_error() {
        let store = store();
        let err = resolve(&store, "{{embed: ((cyclea001))}}")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DocError::ReferenceCycle(uid) if uid == "cyclea001"
        ));
    }

    #[tokio::test]
    async fn test_missing_embed_is_not_found() {
        let store = store();
        let err = resolve(&store, "{{embed: ((missing01))}}")
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::NotFound(_)));
    }

    #[test]
    fn test_bare_refs_inside_other_matches_are_dropped() {
        let text = "{{embed: ((embedsrc1)) }} [x](((intro0001))) ((advblock1)) ((other0001))}";
        let (embeds, aliases, bare) = scan_references(text);
        assert_eq!(embeds.len(), 1);
        assert_eq!(aliases.len(), 1);
        let bare_uids: Vec<&str> = bare.iter().map(|m| m.uid.as_str()).collect();
        assert_eq!(bare_uids, vec!["advblock1"]);

        let spans: Vec<ReplacementSpan> = embeds
            .iter()
            .chain(&aliases)
            .chain(&bare)
            .map(|m| ReplacementSpan::new("", m.range.clone()))
            .collect();
        assert!(!spans_overlap(&spans));
    }

    #[tokio::test]
    async fn test_unmatched_segments_are_preserved() {
        let store = store();
        let text = "α ((intro0001)) β [l](((other0001))) γ ((other0001)) δ";
        let (resolved, _) = resolve(&store, text).await.unwrap();
        assert_eq!(
            resolved,
            "α [Intro text](/extensions/widget#intro0001) β l γ Elsewhere δ"
        );
        // same input, same output
        assert_eq!(resolve(&store, text).await.unwrap().0, resolved);
    }

    #[tokio::test]
    async fn test_view_type_inherits_and_children_sort() {
        let mut parent = block(
            "parent001",
            "parent",
            0,
            vec![
                block("child0002", "two", 2, vec![]),
                block("child0001", "one", 1, vec![]),
            ],
        );
        parent.view_type = Some(":document".to_string());
        let store = MemoryStore::default();
        let resolver = Resolver::new(&store, "widget", "/extensions");

        let node = resolver
            .format_node(parent, ViewType::Bullet)
            .await
            .unwrap();
        assert_eq!(node.view_type, ViewType::Document);
        assert_eq!(node.children[0].text, "one");
        assert_eq!(node.children[1].text, "two");
        let view_types: Vec<ViewType> = node.children.iter().map(|c| c.view_type).collect();
        assert_eq!(view_types, vec![ViewType::Document; 2]);
    }

    #[tokio::test]
    async fn test_content_blocks_for_page() {
        let mut root = page("numbers", vec![block("n00000001", "first", 0, vec![])]);
        root.view_type = Some(":numbered".to_string());
        let store = MemoryStore::new(vec![root]);
        let resolver = Resolver::new(&store, "numbers", "/extensions");

        let content = resolver
            .content_blocks(&TreeKey::Title("numbers".to_string()))
            .await
            .unwrap();
        assert_eq!(content.view_type, ViewType::Numbered);
        assert_eq!(content.path, "numbers");
        assert_eq!(content.text, "numbers");
        assert_eq!(content.blocks[0].view_type, ViewType::Numbered);

        let missing = resolver
            .content_blocks(&TreeKey::Title("nothing/sub".to_string()))
            .await
            .unwrap();
        assert!(missing.blocks.is_empty());
        assert_eq!(missing.path, "nothing");
    }

    #[test]
    fn test_external_classification() {
        let store = MemoryStore::default();
        let resolver = Resolver::new(&store, "widget", "/extensions");
        assert!(!resolver.is_external("widget"));
        assert!(!resolver.is_external("widget/advanced"));
        assert!(resolver.is_external("widgets"));
        assert!(resolver.is_external(""));
        assert_eq!(page_path("Other Page"), "other_page");
    }
}
