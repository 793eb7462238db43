//! Agent orchestrator
//!
//! Runs the tool-calling loop for one user turn: the model sees the system
//! prompt, the chat history, the new input and the tool exchanges made so far
//! in this turn, and either answers or asks for more tools.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use super::prompt::{PromptTemplate, CURRENT_TIME_FORMAT};
use super::trace::{TraceSink, TraceStep};
use crate::llm::{LlmClient, Message, MessageContent};
use crate::memory::ConversationMemory;
use crate::tool::{ToolManager, ToolResult, TurnContext};
use crate::Result;

/// Answer used when the model finishes without any text
pub const EMPTY_ANSWER: &str = "Sorry, I am unable to process that scheduling request right now.";

/// Answer used when the turn runs out of iterations
pub const ITERATION_LIMIT_ANSWER: &str =
    "Sorry, I could not finish that request within the allowed number of steps. Please try again with a simpler request.";

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub answer: String,
    pub steps: Vec<TraceStep>,
    pub iterations: usize,
}

/// Binds the model, the rendered instructions and the calendar tools
pub struct Orchestrator {
    client: LlmClient,
    system_prompt: String,
    tools: Arc<ToolManager>,
    max_iterations: usize,
    started_at: DateTime<Local>,
}

impl Orchestrator {
    /// Build an orchestrator anchored to the current local time
    pub fn new(
        client: LlmClient,
        template: &PromptTemplate,
        tools: Arc<ToolManager>,
        max_iterations: usize,
    ) -> Result<Self> {
        Self::with_time(client, template, tools, max_iterations, Local::now())
    }

    /// Build an orchestrator anchored to `now`.
    ///
    /// The time is rendered into the prompt once and never refreshed.
    pub fn with_time(
        client: LlmClient,
        template: &PromptTemplate,
        tools: Arc<ToolManager>,
        max_iterations: usize,
        now: DateTime<Local>,
    ) -> Result<Self> {
        let system_prompt = template.render_at(now)?;

        info!(
            "Orchestrator ready: model={}, tools=[{}], anchored at {}",
            client.model(),
            tools.tool_names().join(", "),
            now.format(CURRENT_TIME_FORMAT)
        );

        Ok(Self {
            client,
            system_prompt,
            tools,
            max_iterations: max_iterations.max(1),
            started_at: now,
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.tool_names()
    }

    /// Run one turn.
    ///
    /// Tool failures are fed back to the model as error observations. Model
    /// failures end the turn with an error. On success the input and the
    /// answer are saved to `memory`.
    pub async fn run_turn(
        &self,
        memory: &mut ConversationMemory,
        input: &str,
        sink: &dyn TraceSink,
    ) -> Result<TurnOutcome> {
        let turn = TurnContext::new();
        let definitions = self.tools.definitions();
        let mut scratch: Vec<Message> = Vec::new();
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            let mut messages = memory.messages();
            messages.push(Message::user(input));
            messages.extend(scratch.iter().cloned());

            let request = self
                .client
                .request_builder()
                .system(&self.system_prompt)
                .messages(messages)
                .tools(definitions.clone())
                .build();

            let response = self.client.messages(request).await?;

            if !response.wants_tools() {
                let text = response
                    .content
                    .iter()
                    .filter_map(|c| match c {
                        MessageContent::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                let answer = if text.trim().is_empty() {
                    warn!("Model returned an empty answer");
                    EMPTY_ANSWER.to_string()
                } else {
                    text.trim().to_string()
                };

                debug!("Turn finished after {} iteration(s)", iteration);
                memory.save(input, &answer);
                return Ok(TurnOutcome {
                    answer,
                    steps,
                    iterations: iteration,
                });
            }

            let mut results = Vec::new();
            for block in &response.content {
                let MessageContent::ToolUse {
                    id,
                    name,
                    input: tool_input,
                } = block
                else {
                    continue;
                };

                let call = TraceStep::ToolCall {
                    tool: name.clone(),
                    input: tool_input.clone(),
                };
                sink.record(&call);
                steps.push(call);

                debug!("Executing tool: {} with input: {}", name, tool_input);
                let result = self
                    .tools
                    .execute(name, tool_input.clone(), &turn)
                    .await
                    .unwrap_or_else(|e| ToolResult::error(e.to_string()));

                let observation = TraceStep::Observation {
                    tool: name.clone(),
                    output: result.output.clone(),
                    is_error: result.is_error,
                };
                sink.record(&observation);
                steps.push(observation);

                results.push(MessageContent::ToolResult {
                    tool_use_id: id.clone(),
                    content: result.output,
                    is_error: result.is_error,
                });
            }

            scratch.push(Message {
                role: "assistant".to_string(),
                content: response.content,
            });
            scratch.push(Message {
                role: "user".to_string(),
                content: results,
            });
        }

        warn!("Turn stopped after {} iterations", self.max_iterations);
        memory.save(input, ITERATION_LIMIT_ANSWER);
        Ok(TurnOutcome {
            answer: ITERATION_LIMIT_ANSWER.to_string(),
            steps,
            iterations: self.max_iterations,
        })
    }
}
