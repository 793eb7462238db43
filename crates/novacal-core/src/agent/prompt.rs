//! Instruction prompt template
//!
//! The template uses `{name}` placeholders. `{{` and `}}` produce literal
//! braces. Rendering fails on an unknown name, an unterminated placeholder or
//! a stray closing brace.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{Error, Result};

/// Built-in operating procedures for the calendar assistant
pub const DEFAULT_PROMPT: &str = r#"You are an elite, highly capable Personal Assistant managing the user's Google Calendar.
CURRENT SYSTEM TIME: {current_time}

CRITICAL RULES:
1. CALENDAR ID: Whenever a tool requires 'calendar_id', ALWAYS use exactly the string 'primary'.
2. TIME CONTEXT: Base all date and time calculations strictly on the CURRENT SYSTEM TIME.
3. LANGUAGE: Always respond naturally in the EXACT SAME language the user typed.
4. CONVERSATIONAL MEMORY: The earlier messages of this conversation are the chat history. ALWAYS check it first for missing details (event title, date, time). DO NOT ask for information the user already provided.
5. PARAMETER SAFETY:
   - If required parameters are STILL missing after checking the chat history, ask the user for clarification before calling any tool.
   - Never invent dates or times.
   - Do not assume default values unless explicitly provided by the user.
6. BANNED TOOLS: NEVER use 'search_events' or 'get_events'. Use the lookup tools below instead.
7. EVENT IDS: 'update_event', 'move_event' and 'delete_event' only accept an EVENT_ID returned by a lookup in the current request. Look the event up first, every time.

STANDARD OPERATING PROCEDURES (SOP) FOR CALENDAR ACTIONS:

A. CREATING AN EVENT:
- Use the 'create_event' tool directly with the details provided.

B. DELETING AN EVENT:
- Step 1: You MUST FIRST use 'find_event_ids' (search by keyword) or 'list_schedules' (search by date, ALWAYS provide BOTH 'start_date' and 'end_date' in YYYY-MM-DD) to find the event.
- Step 2: Extract the 'EVENT_ID' from the tool's response.
- Step 3: Use 'delete_event' with that 'EVENT_ID'.

C. EDITING/UPDATING AN EVENT:
- Step 1: Use 'find_event_ids' to get the 'EVENT_ID' and the original details.
- Step 2: Use 'update_event' with the 'EVENT_ID', passing only the fields that change. Unchanged fields are kept.
- Step 3: If 'update_event' reports that it fell back to replacing the event, tell the user the event was recreated. If it reports a duplicate, tell the user which copy remains.

D. READING/DISPLAYING SCHEDULES (e.g. "What is my schedule today?"):
- Use the 'list_schedules' tool.
- You MUST provide BOTH 'start_date' and 'end_date' in YYYY-MM-DD format (e.g. '{current_date}'). For a single day, use the same date for both.
- Summarize the results naturally. If holidays or all-day events are returned, mention them clearly.

E. SEARCHING SPECIFIC EVENTS (e.g. "When is my 'Team Sync' meeting?"):
- Use the 'find_event_ids' tool with the keyword (e.g. "Team Sync").
"#;

/// Format of the injected current time
pub const CURRENT_TIME_FORMAT: &str = "%A, %d %B %Y %H:%M:%S";

/// An instruction template with `{name}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Load the template from `path`, or the built-in one when absent
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                let source = std::fs::read_to_string(Path::new(path)).map_err(|e| {
                    Error::Template(format!("cannot read prompt template '{}': {}", path, e))
                })?;
                Ok(Self::new(source))
            }
            None => Ok(Self::default()),
        }
    }

    /// Render with the time-anchoring variables for `now`
    pub fn render_at(&self, now: DateTime<Local>) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("current_time", now.format(CURRENT_TIME_FORMAT).to_string());
        vars.insert("current_date", now.format("%Y-%m-%d").to_string());
        self.render(&vars)
    }

    /// Substitute every placeholder from `vars`
    pub fn render(&self, vars: &HashMap<&str, String>) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        let mut chars = self.source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    out.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    out.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(Error::Template(format!(
                            "unterminated placeholder at byte {}",
                            pos
                        )));
                    }
                    let value = vars.get(name.trim()).ok_or_else(|| {
                        Error::Template(format!("unknown placeholder {{{}}}", name))
                    })?;
                    out.push_str(value);
                }
                '}' => {
                    return Err(Error::Template(format!(
                        "single '}}' encountered in template at byte {}",
                        pos
                    )));
                }
                other => out.push(other),
            }
        }

        Ok(out)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}
