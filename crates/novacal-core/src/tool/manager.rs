//! Tool manager for registering and executing tools

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::llm::ToolDefinition;
use crate::tool::{Tool, ToolResult, TurnContext};
use crate::Result;

/// Manager for registered tools
///
/// Tools are kept in name order so the definitions sent to the model are
/// stable between requests.
pub struct ToolManager {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolManager {
    /// Create a new empty tool manager
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool
    ///
    /// If a tool with the same name already exists, it will be replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Remove every tool whose name contains one of `patterns`.
    ///
    /// Returns the names that were removed.
    pub fn exclude_matching(&mut self, patterns: &[String]) -> Vec<String> {
        let removed: Vec<String> = self
            .tools
            .keys()
            .filter(|name| patterns.iter().any(|p| !p.is_empty() && name.contains(p.as_str())))
            .cloned()
            .collect();

        for name in &removed {
            debug!("Excluding tool: {}", name);
            self.tools.remove(name);
        }
        removed
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Definitions of all registered tools
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition::new(t.name(), t.description(), t.input_schema()))
            .collect()
    }

    /// Execute a tool by name
    ///
    /// # Errors
    /// Returns an error if the tool is not found or execution fails
    pub async fn execute(
        &self,
        name: &str,
        input: JsonValue,
        turn: &TurnContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| crate::Error::ToolExecution(format!("Unknown tool: {}", name)))?;
        tool.execute(input, turn).await
    }

    /// Check if a tool is registered
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered tool names in name order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn description(&self) -> &str {
            "test tool"
        }

        fn input_schema(&self) -> JsonValue {
            json!({"type": "object", "properties": {}})
        }

        async fn execute(&self, _input: JsonValue, turn: &TurnContext) -> Result<ToolResult> {
            turn.resolve(self.0);
            Ok(ToolResult::success(self.0))
        }
    }

    fn manager_with(names: &[&'static str]) -> ToolManager {
        let mut manager = ToolManager::new();
        for name in names {
            manager.register(Arc::new(Named(name)));
        }
        manager
    }

    #[test]
    fn test_exclude_matching_drops_substring_matches() {
        let mut manager = manager_with(&[
            "create_event",
            "search_events",
            "get_calendars_info",
            "delete_event",
        ]);

        let removed = manager.exclude_matching(&["search".to_string(), "get".to_string()]);

        assert_eq!(removed.len(), 2);
        assert_eq!(manager.tool_names(), vec!["create_event", "delete_event"]);
    }

    #[test]
    fn test_exclude_ignores_empty_pattern() {
        let mut manager = manager_with(&["create_event"]);
        assert!(manager.exclude_matching(&[String::new()]).is_empty());
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_execute_passes_turn_context() {
        let manager = manager_with(&["create_event"]);
        let turn = TurnContext::new();

        let result = manager.execute("create_event", json!({}), &turn).await.unwrap();

        assert_eq!(result.output, "create_event");
        assert!(turn.is_resolved("create_event"));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let manager = ToolManager::new();
        let err = manager
            .execute("nope", json!({}), &TurnContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown tool: nope"));
    }
}
