//! Session lifecycle
//!
//! ```text
//!  Uninitialized ──set_api_key──► Authenticated ──ensure_ready──► Ready
//!        ▲                             ▲                            │
//!        └──── set_api_key("") ────────┴──────── full_reset ◄───────┘
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use super::types::{
    ChatMessage, SessionState, NOTICE_FULL_RESET, NOTICE_KEY_UPDATED, NOTICE_SCREEN_CLEARED,
};
use crate::agent::{Orchestrator, TraceSink, TurnOutcome};
use crate::failure::{Failure, FailureSite};
use crate::llm::LlmClient;
use crate::memory::ConversationMemory;
use crate::Result;

/// Builds the model handle and the agent for a session
pub trait AgentFactory: Send + Sync {
    /// Build the model handle for `api_key`
    fn build_llm(&self, api_key: &str) -> Result<LlmClient>;

    /// Build the agent on top of an existing model handle
    fn build_agent(&self, llm: LlmClient) -> Result<Orchestrator>;
}

/// Why a submitted message was not answered
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    #[error("⚠️ AI Engine is offline. Please authenticate with your API Key.")]
    Offline,
    #[error("⚠️ Agent pipeline is not initialized. Please perform a Full System Reset.")]
    NotInitialized,
    #[error("{0}")]
    Turn(Failure),
}

/// One user's conversation with the assistant
pub struct Session {
    id: String,
    transcript: Vec<ChatMessage>,
    api_key: Option<String>,
    llm: Option<LlmClient>,
    memory: Option<ConversationMemory>,
    agent: Option<Arc<Orchestrator>>,
}

impl Session {
    /// Create an empty session with no API key
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            transcript: Vec::new(),
            api_key: None,
            llm: None,
            memory: None,
            agent: None,
        }
    }

    /// Create a session with an initial API key (empty means none)
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.api_key = normalize_key(api_key.into());
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        match (&self.api_key, &self.memory, &self.agent) {
            (None, _, _) => SessionState::Uninitialized,
            (Some(_), Some(_), Some(_)) => SessionState::Ready,
            (Some(_), _, _) => SessionState::Authenticated,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn memory(&self) -> Option<&ConversationMemory> {
        self.memory.as_ref()
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    pub fn has_agent(&self) -> bool {
        self.agent.is_some()
    }

    /// Replace the API key and tear everything down
    pub fn set_api_key(&mut self, api_key: impl Into<String>) -> &'static str {
        self.api_key = normalize_key(api_key.into());
        self.transcript.clear();
        self.drop_handles();
        info!("Session {}: API key updated, state={:?}", self.id, self.state());
        NOTICE_KEY_UPDATED
    }

    /// Empty the visible transcript; memory and agent stay
    pub fn clear_screen(&mut self) -> &'static str {
        self.transcript.clear();
        NOTICE_SCREEN_CLEARED
    }

    /// Clear the transcript and drop model, memory and agent. The key stays.
    pub fn full_reset(&mut self) -> &'static str {
        self.transcript.clear();
        self.drop_handles();
        info!("Session {}: full reset", self.id);
        NOTICE_FULL_RESET
    }

    fn drop_handles(&mut self) {
        self.llm = None;
        self.memory = None;
        self.agent = None;
    }

    /// Build whatever is missing: model handle, then memory, then agent.
    ///
    /// A failure is classified at the initialization site and leaves the
    /// session without an agent.
    pub fn ensure_ready(
        &mut self,
        factory: &dyn AgentFactory,
    ) -> std::result::Result<SessionState, Failure> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(SessionState::Uninitialized);
        };

        if self.llm.is_none() {
            let llm = factory
                .build_llm(api_key)
                .map_err(|e| self.init_failure(&e))?;
            info!("Session {}: AI engine initialized ({})", self.id, llm.model());
            self.llm = Some(llm);
        }

        if self.memory.is_none() {
            self.memory = Some(ConversationMemory::new());
        }

        if self.agent.is_none() {
            if let Some(llm) = self.llm.clone() {
                let agent = factory
                    .build_agent(llm)
                    .map_err(|e| self.init_failure(&e))?;
                self.agent = Some(Arc::new(agent));
            }
        }

        Ok(self.state())
    }

    fn init_failure(&self, error: &crate::Error) -> Failure {
        let failure = Failure::classify(FailureSite::Initialization, error);
        warn!(
            "Session {}: initialization failed ({:?}): {}",
            self.id, failure.kind, failure.detail
        );
        failure
    }

    /// Run one user turn.
    ///
    /// The human message is appended before the turn runs; the answer only
    /// when the turn succeeds.
    pub async fn submit(
        &mut self,
        input: &str,
        sink: &dyn TraceSink,
    ) -> std::result::Result<TurnOutcome, SubmitError> {
        if self.llm.is_none() {
            return Err(SubmitError::Offline);
        }
        let (Some(agent), Some(memory)) = (self.agent.clone(), self.memory.as_mut()) else {
            return Err(SubmitError::NotInitialized);
        };

        self.transcript.push(ChatMessage::human(input));

        match agent.run_turn(memory, input, sink).await {
            Ok(outcome) => {
                self.transcript.push(ChatMessage::ai(&outcome.answer));
                Ok(outcome)
            }
            Err(e) => {
                let failure = Failure::classify(FailureSite::Turn, &e);
                warn!(
                    "Session {}: turn failed ({:?}): {}",
                    self.id, failure.kind, failure.detail
                );
                Err(SubmitError::Turn(failure))
            }
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_key(key: String) -> Option<String> {
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
