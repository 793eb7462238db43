//! Per-turn tool context

use std::collections::HashSet;
use std::sync::Mutex;

/// Identifiers resolved during one orchestrator turn.
///
/// Created fresh at the start of every turn and dropped when the turn ends,
/// so nothing resolved in an earlier turn authorises a mutation.
#[derive(Debug, Default)]
pub struct TurnContext {
    resolved: Mutex<HashSet<String>>,
}

impl TurnContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier returned by a lookup or a create
    pub fn resolve(&self, id: impl Into<String>) {
        let id = id.into();
        if id.is_empty() {
            return;
        }
        if let Ok(mut resolved) = self.resolved.lock() {
            resolved.insert(id);
        }
    }

    /// Record every identifier in `ids`
    pub fn resolve_all<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            self.resolve(id);
        }
    }

    pub fn is_resolved(&self, id: &str) -> bool {
        self.resolved
            .lock()
            .map(|resolved| resolved.contains(id))
            .unwrap_or(false)
    }

    /// Number of identifiers resolved so far
    pub fn len(&self) -> usize {
        self.resolved.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_query() {
        let turn = TurnContext::new();
        assert!(turn.is_empty());

        turn.resolve("abc123");
        turn.resolve_all(["def456", ""]);

        assert!(turn.is_resolved("abc123"));
        assert!(turn.is_resolved("def456"));
        assert!(!turn.is_resolved(""));
        assert!(!turn.is_resolved("zzz"));
        assert_eq!(turn.len(), 2);
    }
}
