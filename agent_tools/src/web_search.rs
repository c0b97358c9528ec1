// agent_tools/src/web_search.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::EnvLookup;

pub const GOOGLE_CSE_URL: &str = "https://www.googleapis.com/customsearch/v1";

#[derive(Debug, Deserialize)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Deserialize, Debug)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize, Debug)]
struct SearchItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

/// Google Custom Search. The API key and engine id are read from the
/// environment on every call.
pub struct WebSearchTool {
    client: Client,
    endpoint: String,
    top_k: usize,
    env: EnvLookup,
}

impl WebSearchTool {
    pub fn new(client: Client, top_k: usize, env: EnvLookup) -> Self {
        Self {
            client,
            endpoint: GOOGLE_CSE_URL.to_string(),
            top_k,
            env,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }
}

/// `title: link\nsnippet` blocks separated by a blank line.
fn format_results(items: &[SearchItem], top_k: usize) -> String {
    items
        .iter()
        .take(top_k)
        .map(|item| format!("{}: {}\n{}", item.title, item.link, item.snippet))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Tool for WebSearchTool {
    type Args = WebSearchArgs;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web when the answer needs fresh information that is not in the model's knowledge."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "Search query text" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: WebSearchArgs) -> Result<String, ToolError> {
        if args.query.trim().is_empty() {
            return Err(ToolError::Rejected("search query is empty".into()));
        }
        let api_key = (self.env)("GOOGLE_API_KEY")
            .ok_or_else(|| ToolError::NotConfigured("GOOGLE_API_KEY is not set".into()))?;
        let engine_id = (self.env)("GOOGLE_CSE_ID")
            .ok_or_else(|| ToolError::NotConfigured("GOOGLE_CSE_ID is not set".into()))?;

        debug!("[WebSearchTool] Searching for '{}'", args.query);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", args.query.as_str()),
                ("key", api_key.as_str()),
                ("cx", engine_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::FetchFailed(format!("error performing web search: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::UpstreamStatus {
                status: status.as_u16(),
                detail: body,
            });
        }

        let results: SearchResponse = response.json().await?;
        Ok(format_results(&results.items, self.top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_http::{client, serve_once};
    use std::sync::Arc;

    #[test]
    fn formats_top_k_items() {
        let raw = json!({
            "items": [
                {"title": "Rust", "link": "https://rust-lang.org", "snippet": "A language"},
                {"title": "Crates", "link": "https://crates.io"},
                {"title": "Docs", "link": "https://docs.rs", "snippet": "API docs"}
            ]
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(
            format_results(&parsed.items, 2),
            "Rust: https://rust-lang.org\nA language\n\nCrates: https://crates.io\n"
        );
    }

    #[test]
    fn no_items_gives_empty_string() {
        let parsed: SearchResponse = serde_json::from_value(json!({"kind": "customsearch#search"})).unwrap();
        assert_eq!(format_results(&parsed.items, 5), "");
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_io() {
        let tool = WebSearchTool::new(Client::new(), 5, Arc::new(|_: &str| None))
            .with_endpoint("http://127.0.0.1:9/unreachable");
        let err = tool
            .call(WebSearchArgs { query: "rust news".into() })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_configured");
    }

    #[tokio::test]
    async fn keeps_only_top_k_results_from_the_response() {
        let body = json!({
            "items": [
                {"title": "One", "link": "https://one.example", "snippet": "first"},
                {"title": "Two", "link": "https://two.example", "snippet": "second"},
                {"title": "Three", "link": "https://three.example", "snippet": "third"}
            ]
        });
        let (base_url, server) = serve_once(200, &body.to_string()).await;
        let env: EnvLookup = Arc::new(|key: &str| match key {
            "GOOGLE_API_KEY" => Some("k1".to_string()),
            "GOOGLE_CSE_ID" => Some("e1".to_string()),
            _ => None,
        });
        let tool = WebSearchTool::new(client(), 2, env).with_endpoint(&format!("{}/customsearch/v1", base_url));

        let text = tool.call(WebSearchArgs { query: "rust news".into() }).await.unwrap();
        assert_eq!(
            text,
            "One: https://one.example\nfirst\n\nTwo: https://two.example\nsecond"
        );

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap_or_default();
        assert!(request_line.starts_with("GET /customsearch/v1?"), "{}", request_line);
        assert!(request_line.contains("q=rust+news"));
        assert!(request_line.contains("key=k1"));
        assert!(request_line.contains("cx=e1"));
    }

    #[tokio::test]
    async fn quota_error_is_an_upstream_status_failure() {
        let (base_url, server) = serve_once(429, r#"{"error": {"message": "quota exceeded"}}"#).await;
        let env: EnvLookup = Arc::new(|_: &str| Some("x".to_string()));
        let tool = WebSearchTool::new(client(), 5, env).with_endpoint(&base_url);

        let err = tool.call(WebSearchArgs { query: "rust".into() }).await.unwrap_err();
        assert_eq!(err.kind(), "upstream_status");
        assert!(err.to_failure_string().contains("quota exceeded"));
        server.await.unwrap();
    }
}
