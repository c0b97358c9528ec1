// agent_tools/src/registry.rs

use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::FutureExt;
use router_core::{ToolCallRequest, ToolDefinition, ToolResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::ToolError;

/// A callable tool with a typed argument struct.
///
/// The registry decodes the model's JSON arguments into `Args` before
/// `call` runs; decoding failures never reach the tool body.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Args: DeserializeOwned + Send + 'static;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of `Args`, as declared to the model.
    fn input_schema(&self) -> Value;

    async fn call(&self, args: Self::Args) -> Result<String, ToolError>;
}

#[async_trait]
trait ErasedTool: Send + Sync {
    fn tool_name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;
    async fn call_json(&self, arguments: Value) -> Result<String, ToolError>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn tool_name(&self) -> &str {
        self.name()
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }

    async fn call_json(&self, arguments: Value) -> Result<String, ToolError> {
        let args: T::Args =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
                tool: self.name().to_string(),
                reason: e.to_string(),
            })?;
        self.call(args).await
    }
}

/// Closure-backed tool, for registering ad-hoc operations.
pub struct FnTool<A, F> {
    name: String,
    description: String,
    schema: Value,
    handler: F,
    _args: PhantomData<fn() -> A>,
}

impl<A, F> FnTool<A, F> {
    pub fn new(name: &str, description: &str, schema: Value, handler: F) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            handler,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<A, F, Fut> Tool for FnTool<A, F>
where
    A: DeserializeOwned + Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    type Args = A;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn call(&self, args: A) -> Result<String, ToolError> {
        (self.handler)(args).await
    }
}

/// Fixed name -> tool mapping consulted by the dispatch step.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ErasedTool>>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-call limit; an expired call becomes a `timeout` failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Registers `tool`, replacing any tool with the same name.
    pub fn register<T: Tool>(&mut self, tool: T) -> &mut Self {
        let name = tool.name().to_string();
        self.tools.retain(|t| t.tool_name() != name);
        info!("[ToolRegistry] Registered tool '{}'", name);
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn register_fn<A, F, Fut>(&mut self, name: &str, description: &str, schema: Value, handler: F) -> &mut Self
    where
        A: DeserializeOwned + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.register(FnTool::new(name, description, schema, handler))
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.tool_name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Runs one tool call. Never fails: every error, timeout or panic
    /// comes back as a failure `ToolResult`.
    pub async fn invoke(&self, call: &ToolCallRequest) -> ToolResult {
        let outcome = match self.tools.iter().find(|t| t.tool_name() == call.name) {
            None => Err(ToolError::UnknownTool(call.name.clone())),
            Some(tool) => {
                let guarded = AssertUnwindSafe(tool.call_json(call.arguments.clone()))
                    .catch_unwind()
                    .map(|r| r.unwrap_or_else(|_| Err(ToolError::Internal("tool panicked".into()))));
                match self.timeout {
                    Some(limit) => tokio::time::timeout(limit, guarded)
                        .await
                        .unwrap_or(Err(ToolError::Timeout(limit))),
                    None => guarded.await,
                }
            }
        };

        match outcome {
            Ok(content) => {
                info!("[ToolRegistry] '{}' ({}) succeeded", call.name, call.id);
                ToolResult::success(&call.id, content)
            }
            Err(e) => {
                warn!("[ToolRegistry] '{}' ({}) failed: {}", call.name, call.id, e);
                ToolResult::failure(&call.id, e.to_failure_string())
            }
        }
    }

    /// Runs sibling calls concurrently; results keep the request order.
    pub async fn dispatch_all(&self, calls: &[ToolCallRequest]) -> Vec<ToolResult> {
        join_all(calls.iter().map(|call| self.invoke(call))).await
    }
}
