//! Outline to markdown serialization
//!
//! Output is markdown with component tags (`Block`, `Center`, `Highlight`,
//! `Loom`, `YouTube`, `DemoVideo`) for an MDX renderer. Rendering is pure:
//! the same tree always yields the same text.

use crate::config::SiteConfig;
use crate::resolve::page_path;
use crate::{OutlineNode, TextAlign, ViewType};
use regex::{Captures, Regex};
use std::sync::OnceLock;

fn loom_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{(?:\[\[)?video(?:\]\])?:\s*https://www\.loom\.com/share/([0-9a-f]*)\}\}")
            .expect("loom pattern")
    })
}

fn youtube_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\{\{(?:\[\[)?(?:youtube|video)(?:\]\])?:\s*https://(?:youtu\.be/([A-Za-z0-9_-]*)|www\.youtube\.com/watch\?v=([A-Za-z0-9_-]+)[^}]*)\}\}",
        )
        .expect("youtube pattern")
    })
}

fn demo_video_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{(?:\[\[)?video(?:\]\])?:\s*(\S+)\s*\}\}").expect("video pattern")
    })
}

fn highlight_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\^\^(.*?)\^\^").expect("highlight pattern"))
}

/// Serializes outline trees for one extension page.
pub struct Renderer {
    site: SiteConfig,
    /// Extension id the page belongs to
    path: String,
    subpage_link: Regex,
    page_link: Regex,
}

impl Renderer {
    pub fn new(site: &SiteConfig, path: &str) -> crate::Result<Self> {
        let escaped = regex::escape(path);
        let subpage_link = Regex::new(&format!(r"\[(.*?)\]\(\[\[{}/(.*?)\]\]\)", escaped))?;
        let page_link = Regex::new(&format!(r"\[(.*?)\]\(\[\[{}\]\]\)", escaped))?;
        Ok(Self {
            site: site.clone(),
            path: path.to_string(),
            subpage_link,
            page_link,
        })
    }

    /// Render every root node and concatenate.
    pub fn render_all(&self, blocks: &[OutlineNode], view_type: ViewType) -> String {
        blocks
            .iter()
            .map(|b| self.render_block(b, view_type, 0))
            .collect()
    }

    /// Render `node` with the marker of `view_type` (its parent's view type)
    /// at `depth`, followed by its subtree.
    pub fn render_block(&self, node: &OutlineNode, view_type: ViewType, depth: usize) -> String {
        let prefix = format!("{}{}", " ".repeat(depth * 4), view_type.prefix());
        let centered = node.text_align == TextAlign::Center;
        let padding = if node.text.contains('\n') {
            format!("\n\n{}", " ".repeat(prefix.len()))
        } else {
            String::new()
        };

        let mut out = String::new();
        out.push_str(&prefix);
        out.push_str(&format!("<Block id={{\"{}\"}}>", node.uid));
        if node.heading > 0 {
            out.push_str(&"#".repeat(usize::from(node.heading)));
            out.push(' ');
        }
        if centered {
            out.push_str("<Center>");
        }
        out.push_str(&padding);
        out.push_str(&self.replace_components(&node.text, prefix.len()));
        out.push_str(&padding);
        if centered {
            out.push_str("</Center>");
        }
        out.push_str("</Block>\n\n");

        // Document children stay at the parent's depth.
        let child_depth = if view_type == ViewType::Document {
            depth
        } else {
            depth + 1
        };
        for child in &node.children {
            out.push_str(&self.render_block(child, node.view_type, child_depth));
        }
        if view_type == ViewType::Document && !node.children.is_empty() {
            out.push('\n');
        }
        out
    }

    /// Inline markup rewrites, applied once per block text.
    pub fn replace_components(&self, text: &str, indent: usize) -> String {
        let text = loom_regex().replace_all(text, |c: &Captures| {
            format!("<Loom id={{\"{}\"}} />", &c[1])
        });
        let text = youtube_regex().replace_all(&text, |c: &Captures| {
            let id = c
                .get(1)
                .or_else(|| c.get(2))
                .map(|m| m.as_str())
                .unwrap_or_default();
            format!("<YouTube id={{\"{}\"}} />", id)
        });
        let text = demo_video_regex().replace_all(&text, |c: &Captures| {
            format!("<DemoVideo src={{\"{}\"}} />", &c[1])
        });
        let text = self.subpage_link.replace_all(&text, |c: &Captures| {
            format!(
                "[{}]({}/{}/{})",
                &c[1],
                self.site.extensions_path,
                self.path,
                page_path(&c[2])
            )
        });
        let text = self.page_link.replace_all(&text, |c: &Captures| {
            format!("[{}]({}/{})", &c[1], self.site.extensions_path, self.path)
        });
        let text = highlight_regex().replace_all(&text, |c: &Captures| {
            format!("<Highlight>{}</Highlight>", &c[1])
        });

        let mut text = text.replace("__", "_").replace('\u{a0}', " ");
        if let Some(stripped) = text.strip_suffix("```") {
            text = format!("{}\n```", stripped);
        }
        let text = text.replace('\n', &format!("\n{}", " ".repeat(indent)));
        self.site.localize_links(&text)
    }
}
