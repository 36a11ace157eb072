//! Web search tool. Queries DuckDuckGo's HTML endpoint (no API key required)
//! and scrapes the result list into JSON hits.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

use super::{count_arg, str_arg, Tool};
use crate::config::Config;
use crate::constants::SEARCH_USER_AGENT;

/// One search result, keyed the way search libraries commonly report them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub title: String,
    pub href: String,
    pub body: String,
}

pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
    default_max_results: usize,
}

impl WebSearchTool {
    pub fn new(endpoint: impl Into<String>, default_max_results: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(SEARCH_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build search HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            default_max_results,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.search_endpoint(),
            config.search_max_results(),
            Duration::from_secs(config.search_timeout_secs()),
        )
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        debug!(query, max_results, endpoint = %self.endpoint, "web search");
        let html = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query)])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search endpoint returned an error")?
            .text()
            .await
            .context("Failed to read search response")?;
        Ok(parse_results(&html, max_results))
    }
}

#[async_trait::async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web; returns JSON list of results."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string" },
                "max_results": { "type": "integer" }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let query = str_arg(&input, "query")?;
        let max_results = count_arg(&input, "max_results", self.default_max_results)?;
        let hits = self.search(query, max_results).await?;
        Ok(serde_json::to_value(hits)?)
    }
}

static HREF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"href="([^"]*)""#).expect("valid regex"));
static ANCHOR_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)>(.*?)</a>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// Extracts up to `max` hits from a DuckDuckGo HTML results page.
fn parse_results(html: &str, max: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    for segment in html.split("class=\"result__a\"").skip(1) {
        if hits.len() >= max {
            break;
        }
        let href = HREF_RE
            .captures(segment)
            .map(|c| resolve_href(&unescape(&c[1])))
            .unwrap_or_default();
        let title = ANCHOR_TEXT_RE
            .captures(segment)
            .map(|c| clean_text(&c[1]))
            .unwrap_or_default();
        let body = segment
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| ANCHOR_TEXT_RE.captures(s))
            .map(|c| clean_text(&c[1]))
            .unwrap_or_default();

        if !title.is_empty() {
            hits.push(SearchHit { title, href, body });
        }
    }
    hits
}

/// DuckDuckGo wraps targets in a redirect (`//duckduckgo.com/l/?uddg=<url>`).
fn resolve_href(raw: &str) -> String {
    let absolute = if raw.starts_with("//") {
        format!("https:{raw}")
    } else {
        raw.to_string()
    };
    reqwest::Url::parse(&absolute)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(k, _)| k == "uddg")
                .map(|(_, v)| v.into_owned())
        })
        .unwrap_or(absolute)
}

fn clean_text(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    unescape(stripped.trim())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn unescape(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"
<div class="result results_links">
  <h2 class="result__title">
    <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc">The <b>Rust</b> Programming Language</a>
  </h2>
  <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">A language empowering everyone to build <b>reliable</b> &amp; efficient software.</a>
</div>
<div class="result results_links">
  <a rel="nofollow" class="result__a" href="https://doc.rust-lang.org/book/">The Book</a>
  <a class="result__snippet" href="https://doc.rust-lang.org/book/">Learn Rust.</a>
</div>
<div class="result results_links">
  <a rel="nofollow" class="result__a" href="https://crates.io/">crates.io</a>
</div>
"#;

    #[test]
    fn test_parse_results_extracts_title_href_body() {
        let hits = parse_results(PAGE, 10);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "The Rust Programming Language");
        assert_eq!(hits[0].href, "https://www.rust-lang.org/");
        assert_eq!(
            hits[0].body,
            "A language empowering everyone to build reliable & efficient software."
        );
        assert_eq!(hits[1].href, "https://doc.rust-lang.org/book/");
        assert_eq!(hits[2].body, "");
    }

    #[test]
    fn test_parse_results_respects_max() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
        assert!(parse_results("<html>nothing here</html>", 5).is_empty());
    }

    #[tokio::test]
    async fn test_execute_queries_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "rust lang"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let tool = WebSearchTool::new(
            format!("{}/html/", server.uri()),
            5,
            Duration::from_secs(5),
        )
        .unwrap();
        let out = tool
            .execute(json!({"query": "rust lang", "max_results": "2"}))
            .await
            .unwrap();
        let hits = out.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[1]["title"], "The Book");
    }
}
