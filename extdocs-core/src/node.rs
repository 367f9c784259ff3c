//! Outline model: raw pull results and the normalized tree built from them

use crate::DocError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Per-subtree rendering mode, inherited down the tree unless overridden
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    #[default]
    Bullet,
    Document,
    Numbered,
}

impl ViewType {
    /// Parse a store keyword such as `:document` (leading colon optional).
    pub fn from_keyword(keyword: &str) -> crate::Result<Self> {
        match keyword.trim_start_matches(':') {
            "bullet" => Ok(Self::Bullet),
            "document" => Ok(Self::Document),
            "numbered" => Ok(Self::Numbered),
            other => Err(DocError::InvalidNode(format!("unknown view type: {other}"))),
        }
    }

    /// Line marker. Numbered lists always emit `1. ` and leave renumbering
    /// to the markdown renderer.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Bullet => "- ",
            Self::Document => "",
            Self::Numbered => "1. ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Document => "document",
            Self::Numbered => "numbered",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlign {
    pub fn from_name(name: &str) -> crate::Result<Self> {
        match name {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            "justify" => Ok(Self::Justify),
            other => Err(DocError::InvalidNode(format!(
                "unknown text alignment: {other}"
            ))),
        }
    }
}

/// A block as returned by a pull query.
///
/// The graph store qualifies attribute names (`:block/string`); both the
/// colon-prefixed and bare spellings are accepted. Attributes outside this
/// set (e.g. `:block/props`) are ignored; known attributes carrying the wrong
/// JSON type fail decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(
        rename = ":block/string",
        alias = "block/string",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub string: Option<String>,
    #[serde(
        rename = ":node/title",
        alias = "node/title",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        rename = ":block/uid",
        alias = "block/uid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub uid: Option<String>,
    #[serde(
        rename = ":block/order",
        alias = "block/order",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub order: Option<i64>,
    #[serde(
        rename = ":block/heading",
        alias = "block/heading",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub heading: Option<u8>,
    #[serde(
        rename = ":block/open",
        alias = "block/open",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub open: Option<bool>,
    #[serde(
        rename = ":children/view-type",
        alias = "children/view-type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub view_type: Option<String>,
    #[serde(
        rename = ":block/text-align",
        alias = "block/text-align",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub text_align: Option<String>,
    #[serde(
        rename = ":edit/time",
        alias = "edit/time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub edit_time: Option<i64>,
    #[serde(
        rename = ":block/children",
        alias = "block/children",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// Block string, falling back to the page title.
    pub fn text(&self) -> &str {
        self.string
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or("")
    }

    /// The view type this node declares for its children, if any.
    pub fn declared_view_type(&self) -> crate::Result<Option<ViewType>> {
        self.view_type
            .as_deref()
            .map(ViewType::from_keyword)
            .transpose()
    }

    /// Children sorted by ascending order. Missing orders sort as 0.
    pub fn into_sorted_children(self) -> Vec<RawNode> {
        let mut children = self.children;
        children.sort_by_key(|c| c.order.unwrap_or(0));
        children
    }
}

/// One line of normalized content
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineNode {
    pub text: String,
    pub open: bool,
    pub order: i64,
    pub uid: String,
    pub heading: u8,
    pub view_type: ViewType,
    pub edit_time: OffsetDateTime,
    pub text_align: TextAlign,
    pub children: Vec<OutlineNode>,
}

impl Default for OutlineNode {
    fn default() -> Self {
        Self {
            text: String::new(),
            open: true,
            order: 0,
            uid: String::new(),
            heading: 0,
            view_type: ViewType::Bullet,
            edit_time: OffsetDateTime::UNIX_EPOCH,
            text_align: TextAlign::Left,
            children: Vec::new(),
        }
    }
}

impl OutlineNode {
    pub fn new(uid: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    /// Scalar attributes of `raw` with defaults applied. Text and children
    /// are filled in by the formatter.
    pub fn from_raw_attributes(raw: &RawNode, view_type: ViewType) -> crate::Result<Self> {
        let edit_time = match raw.edit_time {
            Some(ms) => {
                let nanos = i128::from(ms) * 1_000_000;
                OffsetDateTime::from_unix_timestamp_nanos(nanos)
                    .map_err(|e| DocError::InvalidNode(format!("edit time {ms}: {e}")))?
            }
            None => OffsetDateTime::UNIX_EPOCH,
        };
        let text_align = match raw.text_align.as_deref() {
            Some(name) => TextAlign::from_name(name)?,
            None => TextAlign::Left,
        };
        Ok(Self {
            text: String::new(),
            open: raw.open.unwrap_or(true),
            order: raw.order.unwrap_or(0),
            uid: raw.uid.clone().unwrap_or_default(),
            heading: raw.heading.unwrap_or(0),
            view_type,
            edit_time,
            text_align,
            children: Vec::new(),
        })
    }
}
