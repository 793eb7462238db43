//! Conversation memory types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// One completed exchange: the user's input and the final answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exchange {
    pub human: String,
    pub ai: String,
    pub created_at: DateTime<Utc>,
}

/// Model-facing chat history.
///
/// Independent of the transcript shown to the user: clearing the screen
/// leaves it intact, a full reset drops it. Tool calls and observations are
/// never stored here.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    exchanges: Vec<Exchange>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finished exchange
    pub fn save(&mut self, human: impl Into<String>, ai: impl Into<String>) {
        self.exchanges.push(Exchange {
            human: human.into(),
            ai: ai.into(),
            created_at: Utc::now(),
        });
    }

    /// History as alternating user/assistant messages, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.exchanges
            .iter()
            .flat_map(|e| [Message::user(&e.human), Message::assistant(&e.ai)])
            .collect()
    }

    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_alternate_roles() {
        let mut memory = ConversationMemory::new();
        memory.save("Schedule lunch tomorrow", "Which time works for you?");
        memory.save("1pm", "Lunch is booked for 13:00.");

        let messages = memory.messages();
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user", "assistant"]);
        assert_eq!(messages[2].text_content(), "1pm");
        assert_eq!(memory.len(), 2);
    }
}
