//! Conversation memory
//!
//! Holds the prior human/ai exchanges that are fed back to the model as
//! chat history on every turn.

mod types;

pub use types::{ConversationMemory, Exchange};
