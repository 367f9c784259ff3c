//! HTTP client for the graph query API
//!
//! The API answers every query with a 307 pointing at a session-scoped host.
//! The client follows exactly one redirect by reissuing the same POST body,
//! then decodes the `result` rows of the redirected response.

use crate::{Config, DocError, RawNode};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, LOCATION};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub struct GraphClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct QueryResponse {
    result: Vec<Vec<Option<RawNode>>>,
}

impl GraphClient {
    pub fn new(config: &Config) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            client,
            url: config.query_url(),
            token: config.graph.token.clone(),
        })
    }

    /// Run a query and return its result rows. A `null` field decodes as an
    /// empty node.
    pub async fn query(&self, query: &str) -> crate::Result<Vec<Vec<RawNode>>> {
        let start = Instant::now();
        let body = QueryRequest { query };

        let res = self.post(self.url.as_str(), &body).send().await?;
        let status = res.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DocError::RateLimited);
        }
        if status != StatusCode::TEMPORARY_REDIRECT {
            return Err(DocError::missing_redirect(status.as_u16()));
        }
        let location = redirect_target(res.url(), res.headers().get(LOCATION))?;

        let redirected = self.post(location.as_str(), &body).send().await?;
        let status = redirected.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DocError::RateLimited);
        }
        if !(200..400).contains(&status.as_u16()) {
            return Err(DocError::UpstreamStatus {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unknown status")
                    .to_string(),
            });
        }

        let text = redirected.text().await?;
        let parsed: QueryResponse = serde_json::from_str(&text)?;
        tracing::debug!(
            rows = parsed.result.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "graph query"
        );
        Ok(parsed.result.into_iter().map(fill_nulls).collect())
    }

    fn post(&self, url: &str, body: &QueryRequest<'_>) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(body)
    }
}

fn fill_nulls(row: Vec<Option<RawNode>>) -> Vec<RawNode> {
    row.into_iter().map(Option::unwrap_or_default).collect()
}

fn redirect_target(
    base: &Url,
    location: Option<&reqwest::header::HeaderValue>,
) -> crate::Result<Url> {
    let Some(location) = location.and_then(|v| v.to_str().ok()) else {
        return Err(DocError::UpstreamProtocol(
            "Redirect (307) without a Location header".to_string(),
        ));
    };
    base.join(location)
        .map_err(|e| DocError::bad_location(location, e))
}

/// Escape a value for interpolation into a query string literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

const TREE_PULL: &str = "[
  :block/string
  :node/title
  :block/uid
  :block/order
  :block/heading
  :block/open
  :children/view-type
  :block/text-align
  :edit/time
  :block/props
  {:block/children ...}
]";

/// Pull a full subtree, keyed by page title or block uid.
pub fn tree_query(attribute: &str, value: &str) -> String {
    format!(
        "[:find (pull ?b {}) :where [?b {} \"{}\"]]",
        TREE_PULL,
        attribute,
        escape_literal(value)
    )
}

pub fn page_title_query(uid: &str) -> String {
    format!(
        "[:find (pull ?p [:node/title]) :where [?e :block/uid \"{}\"] [?e :block/page ?p]]",
        escape_literal(uid)
    )
}

pub fn block_text_query(uid: &str) -> String {
    format!(
        "[:find (pull ?e [:block/string]) :where [?e :block/uid \"{}\"]]",
        escape_literal(uid)
    )
}

/// Pages with a top-level "Documentation" block, paired with every page
/// whose title starts with theirs. Pages titled `legacy...` are skipped.
pub const SUBPAGES_QUERY: &str = "[:find
  (pull ?b [:node/title])
  (pull ?sub [:node/title])
 :where
  [?d :block/string \"Documentation\"]
  [?b :block/children ?d]
  [?b :node/title ?t]
  [not [[clojure.string/starts-with? ?t \"legacy\"]]]
  [?sub :node/title ?sub-title]
  [[clojure.string/starts-with? ?sub-title ?t]]
]";
