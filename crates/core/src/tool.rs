//! Tool trait and registry: the abstraction over local capabilities.
//!
//! A tool receives the raw argument payload exactly as the model produced
//! it and decodes its own typed parameters. The registry maps names to
//! handlers and is shared read-only by the agent loop once populated.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// The result of one tool call, correlated to the request by `call_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Text handed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn ok(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: output.into(),
        }
    }

    /// A failed call. The error is rendered as `Error: <description>`.
    pub fn error(call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            success: false,
            output: format!("Error: {error}"),
        }
    }
}

/// The core Tool trait.
///
/// Each tool (Read, Write, ListFiles, Bash, ...) implements this trait and
/// is registered in the [`ToolRegistry`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "Read").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the raw argument payload.
    async fn execute(&self, arguments: &str) -> Result<String, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Decode a raw argument payload into a tool's parameter type.
///
/// An empty payload is read as `{}` so tools whose fields all have
/// defaults accept a call without arguments.
pub fn parse_arguments<T: DeserializeOwned>(tool_name: &str, raw: &str) -> Result<T, ToolError> {
    let raw = if raw.trim().is_empty() { "{}" } else { raw };
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments {
        tool_name: tool_name.to_string(),
        reason: e.to_string(),
    })
}

/// A tool backed by a plain synchronous function.
pub struct FnTool<F> {
    name: String,
    description: String,
    parameters: serde_json::Value,
    handler: F,
}

impl<F> FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }
}

#[async_trait]
impl<F> Tool for FnTool<F>
where
    F: Fn(&str) -> Result<String, ToolError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> serde_json::Value {
        self.parameters.clone()
    }

    async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
        (self.handler)(arguments)
    }
}

/// A name-keyed registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool definitions to send to the LLM
/// 2. Look up and execute tools when the LLM requests them
///
/// Lookups take a read lock and clone the handler out, so no lock is held
/// while a tool runs and concurrent `execute` calls never block each other.
pub struct ToolRegistry {
    tools: RwLock<IndexMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(IndexMap::new()),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name and
    /// returns the replaced one; the name keeps its original position.
    pub fn register(&self, tool: Box<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        let name = tool.name().to_string();
        let previous = self
            .tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), tool);
        if previous.is_some() {
            tracing::debug!(tool = %name, "Replaced registered tool");
        }
        previous
    }

    /// Register a plain function as a tool.
    pub fn register_fn<F>(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
        handler: F,
    ) -> Option<Arc<dyn Tool>>
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        self.register(Box::new(FnTool::new(name, description, parameters, handler)))
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Get all tool definitions in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|t| t.to_definition())
            .collect()
    }

    /// Execute a tool by name with a raw argument payload.
    pub async fn execute(&self, name: &str, arguments: &str) -> Result<String, ToolError> {
        let tool = self.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.execute(arguments).await
    }

    /// List all registered tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: &str) -> Result<String, ToolError> {
            let args: EchoArgs = parse_arguments(self.name(), arguments)?;
            Ok(args.text)
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = ToolRegistry::new();
        assert!(registry.register(Box::new(EchoTool)).is_none());
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registry_definitions_follow_registration_order() {
        let registry = ToolRegistry::new();
        registry.register_fn("Read", "read", serde_json::json!({}), |_| Ok(String::new()));
        registry.register(Box::new(EchoTool));
        registry.register_fn("Bash", "bash", serde_json::json!({}), |_| Ok(String::new()));

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["Read", "echo", "Bash"]);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let output = registry.execute("echo", r#"{"text":"hello world"}"#).await.unwrap();
        assert_eq!(output, "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("nonexistent", "{}").await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "nonexistent"));
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = ToolRegistry::new();
        registry.register_fn("greet", "v1", serde_json::json!({}), |_| Ok("first".into()));
        let replaced = registry.register_fn("greet", "v2", serde_json::json!({}), |_| Ok("second".into()));

        assert!(replaced.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.execute("greet", "").await.unwrap(), "second");
        assert_eq!(registry.definitions()[0].description, "v2");
    }

    #[tokio::test]
    async fn invalid_arguments_are_reported() {
        let registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        let err = registry.execute("echo", "{not json").await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool_name, .. } if tool_name == "echo"));
    }

    #[tokio::test]
    async fn concurrent_execute_calls() {
        let registry = Arc::new(ToolRegistry::new());
        registry.register(Box::new(EchoTool));

        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = Arc::clone(&registry);
            handles.push(tokio::spawn(async move {
                registry
                    .execute("echo", &format!(r#"{{"text":"{i}"}}"#))
                    .await
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().unwrap(), i.to_string());
        }
    }

    #[test]
    fn empty_payload_reads_as_empty_object() {
        #[derive(Deserialize)]
        struct NoArgs {
            #[serde(default)]
            verbose: bool,
        }
        let args: NoArgs = parse_arguments("Noop", "  ").unwrap();
        assert!(!args.verbose);
    }

    #[test]
    fn tool_result_error_format() {
        let result = ToolResult::error("call_1", &ToolError::NotFound("Grep".into()));
        assert!(!result.success);
        assert_eq!(result.output, "Error: tool Grep not found");
    }
}
