//! Session store
//!
//! An explicit context object holding the visible transcript, the API key
//! and the lazily built model, memory and agent handles.

mod lifecycle;
mod types;

pub use lifecycle::{AgentFactory, Session, SubmitError};
pub use types::{
    ChatMessage, ChatRole, SessionState, NOTICE_FULL_RESET, NOTICE_KEY_UPDATED,
    NOTICE_MISSING_KEY, NOTICE_SCREEN_CLEARED,
};
