//! Calendar toolkit and agent assembly

use std::sync::Arc;

use tracing::info;

use novacal_core::{
    AgentFactory, CalendarSettings, Config, LlmClient, Orchestrator, PromptTemplate, Tool,
    ToolManager,
};

use crate::error::Result;
use crate::google::GoogleCalendar;
use crate::lookup::{EventLookup, FindEventIdsTool, ListSchedulesTool};
use crate::tools::{
    CreateEventTool, DeleteEventTool, GetCalendarsInfoTool, MoveEventTool, SearchEventsTool,
    ToolContext, UpdateEventTool,
};
use crate::view::CalendarView;

/// Everything built on one Google Calendar client
pub struct CalendarToolkit {
    calendar: Arc<GoogleCalendar>,
    lookup: Arc<EventLookup>,
    view: Arc<CalendarView>,
    tool_ctx: ToolContext,
    search_limit: u32,
}

impl CalendarToolkit {
    pub fn new(settings: &CalendarSettings) -> Result<Self> {
        let calendar = Arc::new(GoogleCalendar::new(settings)?);
        Ok(Self {
            lookup: Arc::new(EventLookup::new(calendar.clone(), settings)),
            view: Arc::new(CalendarView::new(calendar.clone(), settings)),
            tool_ctx: ToolContext::new(calendar.clone(), settings),
            search_limit: settings.keyword_limit,
            calendar,
        })
    }

    pub fn calendar(&self) -> &Arc<GoogleCalendar> {
        &self.calendar
    }

    pub fn lookup(&self) -> Arc<EventLookup> {
        self.lookup.clone()
    }

    pub fn view(&self) -> Arc<CalendarView> {
        self.view.clone()
    }

    /// The service's own tool set
    pub fn native_tools(&self) -> Vec<Arc<dyn Tool>> {
        let ctx = &self.tool_ctx;
        vec![
            Arc::new(CreateEventTool::new(ctx.clone())),
            Arc::new(UpdateEventTool::new(ctx.clone())),
            Arc::new(MoveEventTool::new(ctx.clone())),
            Arc::new(DeleteEventTool::new(ctx.clone())),
            Arc::new(SearchEventsTool::new(ctx.clone(), self.search_limit)),
            Arc::new(GetCalendarsInfoTool::new(ctx.clone())),
        ]
    }

    /// Native tools minus the excluded patterns, plus both lookups
    pub fn build_tool_manager(&self, excluded: &[String]) -> ToolManager {
        let mut manager = ToolManager::new();
        for tool in self.native_tools() {
            manager.register(tool);
        }

        let removed = manager.exclude_matching(excluded);
        if !removed.is_empty() {
            info!("Excluded native tools: {}", removed.join(", "));
        }

        manager.register(Arc::new(FindEventIdsTool::new(self.lookup.clone())));
        manager.register(Arc::new(ListSchedulesTool::new(self.lookup.clone())));
        manager
    }
}

/// Builds model handles and calendar agents from the loaded configuration
pub struct CalendarAgentFactory {
    config: Config,
    toolkit: Arc<CalendarToolkit>,
}

impl CalendarAgentFactory {
    pub fn new(config: Config, toolkit: Arc<CalendarToolkit>) -> Self {
        Self { config, toolkit }
    }

    pub fn toolkit(&self) -> &Arc<CalendarToolkit> {
        &self.toolkit
    }
}

impl AgentFactory for CalendarAgentFactory {
    fn build_llm(&self, api_key: &str) -> novacal_core::Result<LlmClient> {
        let mut llm = self.config.llm.clone();
        llm.api_key = api_key.to_string();
        LlmClient::new(&llm)
    }

    fn build_agent(&self, llm: LlmClient) -> novacal_core::Result<Orchestrator> {
        self.toolkit
            .calendar()
            .check_credentials()
            .map_err(novacal_core::Error::from)?;

        let template = PromptTemplate::load(self.config.agent.prompt_path.as_deref())?;
        let tools = self.toolkit.build_tool_manager(&self.config.agent.excluded_tools);

        Orchestrator::new(
            llm,
            &template,
            Arc::new(tools),
            self.config.llm.max_iterations,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use novacal_core::{FailureKind, Session, SessionState};
    use serde_json::json;

    fn settings_with_token(dir: &tempfile::TempDir, write: bool) -> CalendarSettings {
        let token_path = dir.path().join("token.json");
        if write {
            let expiry = (Utc::now() + Duration::hours(1)).to_rfc3339();
            std::fs::write(
                &token_path,
                json!({"token": "t", "expiry": expiry}).to_string(),
            )
            .unwrap();
        }
        CalendarSettings {
            token_path: token_path.display().to_string(),
            ..CalendarSettings::default()
        }
    }

    #[test]
    fn test_default_exclusions_keep_mutations_and_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = CalendarToolkit::new(&settings_with_token(&dir, true)).unwrap();

        let manager = toolkit.build_tool_manager(&["search".to_string(), "get".to_string()]);
        assert_eq!(
            manager.tool_names(),
            vec![
                "create_event",
                "delete_event",
                "find_event_ids",
                "list_schedules",
                "move_event",
                "update_event",
            ]
        );
    }

    #[test]
    fn test_no_exclusions_registers_everything() {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = CalendarToolkit::new(&settings_with_token(&dir, true)).unwrap();

        let manager = toolkit.build_tool_manager(&[]);
        assert_eq!(manager.len(), 8);
        assert!(manager.contains("search_events"));
        assert!(manager.contains("get_calendars_info"));
    }

    #[test]
    fn test_session_becomes_ready() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_token(&dir, true);
        let config = Config {
            calendar: settings.clone(),
            ..Config::default()
        };
        let toolkit = Arc::new(CalendarToolkit::new(&settings).unwrap());
        let factory = CalendarAgentFactory::new(config, toolkit);

        let mut session = Session::with_api_key("key");
        assert_eq!(session.ensure_ready(&factory).unwrap(), SessionState::Ready);
    }

    #[test]
    fn test_missing_token_is_oauth_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_token(&dir, false);
        let config = Config {
            calendar: settings.clone(),
            ..Config::default()
        };
        let toolkit = Arc::new(CalendarToolkit::new(&settings).unwrap());
        let factory = CalendarAgentFactory::new(config, toolkit);

        let mut session = Session::with_api_key("key");
        let failure = session.ensure_ready(&factory).unwrap_err();

        assert_eq!(failure.kind, FailureKind::OAuthToken);
        assert!(!session.has_agent());
        assert!(session.has_llm());
    }

    #[test]
    fn test_bad_prompt_path_is_template_failure() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_with_token(&dir, true);
        let mut config = Config {
            calendar: settings.clone(),
            ..Config::default()
        };
        config.agent.prompt_path = Some(dir.path().join("missing.txt").display().to_string());
        let toolkit = Arc::new(CalendarToolkit::new(&settings).unwrap());
        let factory = CalendarAgentFactory::new(config, toolkit);

        let mut session = Session::with_api_key("key");
        let failure = session.ensure_ready(&factory).unwrap_err();
        assert_eq!(failure.kind, FailureKind::PromptTemplate);
    }
}
