//! Event lookups
//!
//! The two read paths the agent uses to resolve events: a keyword search on
//! the primary calendar that reports identifiers, and a date-range listing
//! over the primary and holiday calendars that does not.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use novacal_core::{CalendarSettings, SchemaBuilder, Tool, ToolResult, TurnContext};

use crate::error::{CalendarError, Result};
use crate::format;
use crate::google::{GoogleCalendar, ListQuery};
use crate::models::CalendarEvent;

/// Lookup operations over the configured calendars
pub struct EventLookup {
    calendar: Arc<GoogleCalendar>,
    calendar_id: String,
    holiday_calendar_id: String,
    utc_offset: String,
    keyword_limit: u32,
    range_limit: u32,
}

impl EventLookup {
    pub fn new(calendar: Arc<GoogleCalendar>, settings: &CalendarSettings) -> Self {
        Self {
            calendar,
            calendar_id: settings.calendar_id.clone(),
            holiday_calendar_id: settings.holiday_calendar_id.clone(),
            utc_offset: settings.utc_offset.clone(),
            keyword_limit: settings.keyword_limit,
            range_limit: settings.range_limit,
        }
    }

    /// Events on the primary calendar matching `keyword`
    pub async fn find_by_keyword(&self, keyword: &str) -> Result<Vec<CalendarEvent>> {
        let query = ListQuery::new(self.keyword_limit).keyword(keyword);
        let events = self.calendar.list_events(&self.calendar_id, &query).await?;
        Ok(events
            .iter()
            .map(|e| e.to_calendar_event(&self.calendar_id))
            .collect())
    }

    /// Events between two dates (inclusive) on the primary and holiday
    /// calendars.
    ///
    /// A calendar that fails to list is skipped. A missing token or a
    /// malformed date fails the whole lookup.
    pub async fn list_range(&self, start_date: &str, end_date: &str) -> Result<Vec<CalendarEvent>> {
        for date in [start_date, end_date] {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| {
                CalendarError::InvalidInput(format!("'{}' is not a YYYY-MM-DD date", date))
            })?;
        }

        let token = self.calendar.access_token().await?;
        let query = ListQuery::new(self.range_limit).window(
            format!("{}T00:00:00{}", start_date, self.utc_offset),
            format!("{}T23:59:59{}", end_date, self.utc_offset),
        );

        let mut events = Vec::new();
        for calendar_id in [&self.calendar_id, &self.holiday_calendar_id] {
            match self
                .calendar
                .list_events_with(&token, calendar_id, &query)
                .await
            {
                Ok(items) => {
                    debug!("{} event(s) from {}", items.len(), calendar_id);
                    events.extend(items.iter().map(|e| e.to_calendar_event(calendar_id)));
                }
                Err(e) => warn!("Skipping calendar {}: {}", calendar_id, e),
            }
        }
        Ok(events)
    }

    /// Keyword lookup rendered for the model.
    ///
    /// Identifiers of the listed events are recorded in `turn`.
    pub async fn keyword_summary(&self, keyword: &str, turn: Option<&TurnContext>) -> String {
        match self.find_by_keyword(keyword).await {
            Ok(events) => {
                record(turn, &events);
                format::keyword_summary(keyword, &events)
            }
            Err(e) => format!("Error executing search tool: {}", e),
        }
    }

    /// Date-range lookup rendered for the model or the agenda panel
    pub async fn range_summary(
        &self,
        start_date: &str,
        end_date: &str,
        turn: Option<&TurnContext>,
    ) -> String {
        match self.list_range(start_date, end_date).await {
            Ok(events) => {
                record(turn, &events);
                format::range_summary(start_date, end_date, &events)
            }
            Err(e) => format!("Error executing schedule fetcher: {}", e),
        }
    }
}

fn record(turn: Option<&TurnContext>, events: &[CalendarEvent]) {
    if let Some(turn) = turn {
        turn.resolve_all(events.iter().filter_map(|e| e.id.clone()));
    }
}

fn invalid_input(e: serde_json::Error) -> novacal_core::Error {
    novacal_core::Error::ToolExecution(format!("Invalid input parameters: {}", e))
}

/// Keyword lookup tool
pub struct FindEventIdsTool {
    lookup: Arc<EventLookup>,
}

impl FindEventIdsTool {
    pub fn new(lookup: Arc<EventLookup>) -> Self {
        Self { lookup }
    }
}

#[derive(Debug, Deserialize)]
struct KeywordInput {
    keyword: String,
}

#[async_trait]
impl Tool for FindEventIdsTool {
    fn name(&self) -> &str {
        "find_event_ids"
    }

    fn description(&self) -> &str {
        "USE THIS TOOL TO FIND THE 'EVENT_ID' BEFORE DELETING OR EDITING AN EVENT. \
         Provide a specific keyword or the name of the event (e.g. 'Meeting' or 'Dentist'). \
         Searches the primary calendar and returns matching events with their dates, times and unique IDs."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("keyword", "Keyword or event name to search for")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: KeywordInput = serde_json::from_value(input).map_err(invalid_input)?;
        let output = self.lookup.keyword_summary(&input.keyword, Some(turn)).await;
        Ok(if output.starts_with("Error executing") {
            ToolResult::error(output)
        } else {
            ToolResult::success(output)
        })
    }
}

/// Date-range lookup tool
pub struct ListSchedulesTool {
    lookup: Arc<EventLookup>,
}

impl ListSchedulesTool {
    pub fn new(lookup: Arc<EventLookup>) -> Self {
        Self { lookup }
    }
}

#[derive(Debug, Deserialize)]
struct RangeInput {
    start_date: String,
    end_date: String,
}

#[async_trait]
impl Tool for ListSchedulesTool {
    fn name(&self) -> &str {
        "list_schedules"
    }

    fn description(&self) -> &str {
        "USE THIS TOOL TO RETRIEVE ALL SCHEDULED EVENTS AND HOLIDAYS WITHIN A DATE RANGE. \
         'start_date' and 'end_date' MUST be in 'YYYY-MM-DD' format. \
         For a single day (e.g. \"today\"), provide the same date for both."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("start_date", "First day of the range, YYYY-MM-DD")
            .required_string("end_date", "Last day of the range, YYYY-MM-DD")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: RangeInput = serde_json::from_value(input).map_err(invalid_input)?;
        let output = self
            .lookup
            .range_summary(&input.start_date, &input.end_date, Some(turn))
            .await;
        Ok(if output.starts_with("Error executing") {
            ToolResult::error(output)
        } else {
            ToolResult::success(output)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::test_support::calendar_for;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HOLIDAY_PATH: &str =
        "/calendars/id.indonesian%23holiday@group.v.calendar.google.com/events";

    async fn lookup_for(server: &MockServer) -> (Arc<EventLookup>, tempfile::TempDir) {
        let (calendar, dir) = calendar_for(server);
        let lookup = EventLookup::new(Arc::new(calendar), &CalendarSettings::default());
        (Arc::new(lookup), dir)
    }

    async fn mount_list(server: &MockServer, list_path: &str, items: Value) {
        Mock::given(method("GET"))
            .and(path(list_path))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_same_day_holiday() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("timeMin", "2025-08-17T00:00:00+07:00"))
            .and(query_param("timeMax", "2025-08-17T23:59:59+07:00"))
            .and(query_param("maxResults", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;
        mount_list(
            &server,
            HOLIDAY_PATH,
            json!([{
                "id": "20250817_hol",
                "summary": "Independence Day",
                "start": {"date": "2025-08-17"},
                "end": {"date": "2025-08-18"}
            }]),
        )
        .await;

        let (lookup, _dir) = lookup_for(&server).await;
        let summary = lookup.range_summary("2025-08-17", "2025-08-17", None).await;

        assert_eq!(
            summary,
            "Schedule from 2025-08-17 to 2025-08-17:\n- [2025-08-17] Independence Day (All-day)\n"
        );
    }

    #[tokio::test]
    async fn test_empty_range_on_both_calendars() {
        let server = MockServer::start().await;
        mount_list(&server, "/calendars/primary/events", json!([])).await;
        mount_list(&server, HOLIDAY_PATH, json!([])).await;

        let (lookup, _dir) = lookup_for(&server).await;
        assert_eq!(
            lookup.range_summary("2025-08-17", "2025-08-20", None).await,
            "No events scheduled from 2025-08-17 to 2025-08-20."
        );
    }

    #[tokio::test]
    async fn test_failing_holiday_calendar_is_skipped() {
        let server = MockServer::start().await;
        mount_list(
            &server,
            "/calendars/primary/events",
            json!([{
                "id": "evt1",
                "summary": "Standup",
                "start": {"dateTime": "2025-08-18T09:00:00+07:00"},
                "end": {"dateTime": "2025-08-18T09:15:00+07:00"}
            }]),
        )
        .await;
        Mock::given(method("GET"))
            .and(path(HOLIDAY_PATH))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Forbidden", "errors": [{"reason": "forbidden"}]}
            })))
            .mount(&server)
            .await;

        let (lookup, _dir) = lookup_for(&server).await;
        let turn = TurnContext::new();
        let summary = lookup.range_summary("2025-08-18", "2025-08-18", Some(&turn)).await;

        assert_eq!(
            summary,
            "Schedule from 2025-08-18 to 2025-08-18:\n- [2025-08-18] Standup (09:00 - 09:15)\n"
        );
        assert!(turn.is_resolved("evt1"));
    }

    #[tokio::test]
    async fn test_malformed_date_is_reported() {
        let server = MockServer::start().await;
        let (lookup, _dir) = lookup_for(&server).await;

        let summary = lookup.range_summary("17/08/2025", "2025-08-17", None).await;
        assert!(summary.starts_with("Error executing schedule fetcher: "));
    }

    #[tokio::test]
    async fn test_missing_token_is_reported() {
        let server = MockServer::start().await;
        let settings = CalendarSettings {
            token_path: "/nonexistent/token.json".to_string(),
            api_base_url: server.uri(),
            ..CalendarSettings::default()
        };
        let calendar = Arc::new(GoogleCalendar::new(&settings).unwrap());
        let lookup = EventLookup::new(calendar, &settings);

        let summary = lookup.range_summary("2025-08-17", "2025-08-17", None).await;
        assert!(summary.starts_with("Error executing schedule fetcher: Authentication error"));

        let summary = lookup.keyword_summary("Dentist", None).await;
        assert!(summary.starts_with("Error executing search tool: "));
    }

    #[tokio::test]
    async fn test_keyword_tool_records_ids() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("q", "Dentist"))
            .and(query_param("maxResults", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "evt1",
                    "summary": "Dentist",
                    "start": {"dateTime": "2025-08-20T10:00:00+07:00"},
                    "end": {"dateTime": "2025-08-20T11:00:00+07:00"}
                }]
            })))
            .mount(&server)
            .await;

        let (lookup, _dir) = lookup_for(&server).await;
        let tool = FindEventIdsTool::new(lookup);
        let turn = TurnContext::new();

        let result = tool.execute(json!({"keyword": "Dentist"}), &turn).await.unwrap();

        assert!(!result.is_error);
        assert_eq!(
            result.output,
            "Matching Events Found for 'Dentist':\n- [2025-08-20] 'Dentist' (10:00 - 11:00) | EVENT_ID: evt1\n"
        );
        assert!(turn.is_resolved("evt1"));
    }

    #[tokio::test]
    async fn test_keyword_no_match() {
        let server = MockServer::start().await;
        mount_list(&server, "/calendars/primary/events", json!([])).await;

        let (lookup, _dir) = lookup_for(&server).await;
        let result = FindEventIdsTool::new(lookup)
            .execute(json!({"keyword": "Yoga"}), &TurnContext::new())
            .await
            .unwrap();

        assert_eq!(result.output, "No events found matching the keyword: 'Yoga'.");
        assert!(!result.output.contains("EVENT_ID"));
    }

    #[tokio::test]
    async fn test_range_tool_rejects_missing_dates() {
        let server = MockServer::start().await;
        let (lookup, _dir) = lookup_for(&server).await;

        let err = ListSchedulesTool::new(lookup)
            .execute(json!({"start_date": "2025-08-17"}), &TurnContext::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid input parameters"));
    }
}
