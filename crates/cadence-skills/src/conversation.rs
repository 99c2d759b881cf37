//! Conversation sink capability

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Metadata key recording whether the conversation already has a TODO list
pub const HAS_TODOS_KEY: &str = "has_todos";

/// Capability for writing into the conversation an agent is running in
pub trait Conversation: Send + Sync {
    fn add_system_message(&self, text: &str);

    /// Restrict callable tools to exactly `tools`
    fn set_tool_filter(&self, tools: &[String]);

    fn clear_tool_filter(&self);

    fn get_metadata(&self, key: &str) -> Option<Value>;

    fn set_metadata(&self, key: &str, value: Value);

    /// Whether the "has TODOs" metadata is truthy
    fn has_todos(&self) -> bool {
        match self.get_metadata(HAS_TODOS_KEY) {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            _ => false,
        }
    }
}

#[derive(Default)]
struct ConversationInner {
    system_messages: Vec<String>,
    tool_filter: Option<Vec<String>>,
    metadata: HashMap<String, Value>,
}

/// Conversation that records everything written to it
#[derive(Default)]
pub struct InMemoryConversation {
    inner: RwLock<ConversationInner>,
}

impl InMemoryConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn system_messages(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .system_messages
            .clone()
    }

    pub fn tool_filter(&self) -> Option<Vec<String>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .tool_filter
            .clone()
    }

    /// True when no filter is installed or `tool` is on the allow-list
    pub fn is_tool_allowed(&self, tool: &str) -> bool {
        match self.tool_filter() {
            Some(tools) => tools.iter().any(|t| t == tool),
            None => true,
        }
    }
}

impl Conversation for InMemoryConversation {
    fn add_system_message(&self, text: &str) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.system_messages.push(text.to_string());
    }

    fn set_tool_filter(&self, tools: &[String]) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.tool_filter = Some(tools.to_vec());
    }

    fn clear_tool_filter(&self) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.tool_filter = None;
    }

    fn get_metadata(&self, key: &str) -> Option<Value> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.metadata.get(key).cloned()
    }

    fn set_metadata(&self, key: &str, value: Value) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.metadata.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_filter_lifecycle() {
        let conversation = InMemoryConversation::new();
        assert!(conversation.is_tool_allowed("bash"));

        conversation.set_tool_filter(&["read_file".to_string()]);
        assert!(conversation.is_tool_allowed("read_file"));
        assert!(!conversation.is_tool_allowed("bash"));

        conversation.clear_tool_filter();
        assert!(conversation.tool_filter().is_none());
    }

    #[test]
    fn test_has_todos_truthiness() {
        let conversation = InMemoryConversation::new();
        assert!(!conversation.has_todos());

        conversation.set_metadata(HAS_TODOS_KEY, json!(false));
        assert!(!conversation.has_todos());

        conversation.set_metadata(HAS_TODOS_KEY, json!(true));
        assert!(conversation.has_todos());

        conversation.set_metadata(HAS_TODOS_KEY, json!("TRUE"));
        assert!(conversation.has_todos());

        conversation.set_metadata(HAS_TODOS_KEY, json!(0));
        assert!(!conversation.has_todos());

        conversation.set_metadata(HAS_TODOS_KEY, json!(null));
        assert!(!conversation.has_todos());
    }

    #[test]
    fn test_system_messages_keep_order() {
        let conversation = InMemoryConversation::new();
        conversation.add_system_message("first");
        conversation.add_system_message("second");
        assert_eq!(conversation.system_messages(), vec!["first", "second"]);
    }
}
