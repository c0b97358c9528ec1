// agent_tools/src/error.rs

use std::time::Duration;
use thiserror::Error;

/// Leading marker of every failure string handed back to the model.
pub const FAILURE_MARKER: &str = "ERROR";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("no tool named '{0}' is registered")]
    UnknownTool(String),
    #[error("{0}")]
    NotConfigured(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    FetchFailed(String),
    #[error("upstream service answered {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },
    #[error("tool did not finish within {0:?}")]
    Timeout(Duration),
    #[error("tool crashed: {0}")]
    Internal(String),
}

impl ToolError {
    /// Stable classification, independent of upstream wording.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::NotConfigured(_) => "not_configured",
            ToolError::Rejected(_) => "rejected",
            ToolError::FetchFailed(_) => "fetch_failed",
            ToolError::UpstreamStatus { .. } => "upstream_status",
            ToolError::Timeout(_) => "timeout",
            ToolError::Internal(_) => "internal",
        }
    }

    /// `ERROR[<kind>]: <message>`
    pub fn to_failure_string(&self) -> String {
        format!("{}[{}]: {}", FAILURE_MARKER, self.kind(), self)
    }
}

impl From<reqwest::Error> for ToolError {
    fn from(e: reqwest::Error) -> Self {
        ToolError::FetchFailed(e.to_string())
    }
}

/// Recovers the kind from a failure string, or `None` for success text.
pub fn classify_failure(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(FAILURE_MARKER)?.strip_prefix('[')?;
    let end = rest.find("]:")?;
    Some(&rest[..end])
}
