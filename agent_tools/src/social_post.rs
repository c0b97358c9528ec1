// agent_tools/src/social_post.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::EnvLookup;

pub const X_API_URL: &str = "https://api.twitter.com";
pub const MAX_POST_CHARS: usize = 280;

#[derive(Debug, Deserialize)]
pub struct PostTweetArgs {
    pub text: String,
}

#[derive(Deserialize, Debug)]
struct CreatedTweet {
    data: CreatedTweetData,
}

#[derive(Deserialize, Debug)]
struct CreatedTweetData {
    id: String,
}

/// Publishes a post on X through the v2 API with a user-context bearer token.
pub struct PostTweetTool {
    client: Client,
    base_url: String,
    env: EnvLookup,
}

impl PostTweetTool {
    pub fn new(client: Client, env: EnvLookup) -> Self {
        Self {
            client,
            base_url: X_API_URL.to_string(),
            env,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Rejects text the platform would refuse, before any network I/O.
pub fn check_post_text(text: &str) -> Result<(), ToolError> {
    if text.trim().is_empty() {
        return Err(ToolError::Rejected("post text is empty".into()));
    }
    let chars = text.chars().count();
    if chars > MAX_POST_CHARS {
        return Err(ToolError::Rejected(format!(
            "post text is {} characters, the limit is {}",
            chars, MAX_POST_CHARS
        )));
    }
    Ok(())
}

#[async_trait]
impl Tool for PostTweetTool {
    type Args = PostTweetArgs;

    fn name(&self) -> &str {
        "post_tweet"
    }

    fn description(&self) -> &str {
        "Publishes a post on X (Twitter). Only call after the user explicitly approved the exact text."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Post content, at most 280 characters"
                }
            },
            "required": ["text"]
        })
    }

    async fn call(&self, args: PostTweetArgs) -> Result<String, ToolError> {
        check_post_text(&args.text)?;

        let token = (self.env)("X_BEARER_TOKEN")
            .or_else(|| (self.env)("TWITTER_BEARER_TOKEN"))
            .ok_or_else(|| ToolError::NotConfigured("X_BEARER_TOKEN is not set".into()))?;

        let response = self
            .client
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(token)
            .json(&json!({ "text": args.text }))
            .send()
            .await
            .map_err(|e| ToolError::FetchFailed(format!("failed to post: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::UpstreamStatus {
                status: status.as_u16(),
                detail: body,
            });
        }

        let created: CreatedTweet = response.json().await?;
        let id = created.data.id;
        info!("[PostTweetTool] Posted tweet {}", id);
        Ok(format!(
            "Tweet posted successfully! id: {} url: https://x.com/i/web/status/{}",
            id, id
        ))
    }
}
