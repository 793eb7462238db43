//! Native calendar tools
//!
//! Create, update, move and delete events, plus the raw search and calendar
//! listing. Update, move and delete only act on identifiers resolved earlier
//! in the same turn.

use std::fmt::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use novacal_core::{CalendarSettings, SchemaBuilder, Tool, ToolResult, TurnContext};

use crate::error::CalendarError;
use crate::format::{event_date, keyword_summary, time_range};
use crate::google::{DeleteOutcome, GoogleCalendar, ListQuery};
use crate::models::{EventDateTime, GoogleEvent};

fn parse_input<T: DeserializeOwned>(input: Value) -> novacal_core::Result<T> {
    serde_json::from_value(input).map_err(|e| {
        novacal_core::Error::ToolExecution(format!("Invalid input parameters: {}", e))
    })
}

/// Refusal returned when `event_id` was not looked up in this turn
fn unresolved(tool: &str, event_id: &str) -> ToolResult {
    ToolResult::error(format!(
        "Refusing to run {} on EVENT_ID '{}': it was not returned by find_event_ids in this request. \
         Call find_event_ids first and use an EVENT_ID from its result.",
        tool, event_id
    ))
}

fn describe(event: &GoogleEvent) -> String {
    format!(
        "'{}' ({} {})",
        event.title(),
        event_date(event.start.raw()),
        time_range(event.start.raw(), event.end.raw())
    )
}

fn event_id(event: &GoogleEvent) -> &str {
    event.id.as_deref().unwrap_or("NO_ID_FOUND")
}

/// All-day ends are exclusive: an end on or before the start becomes the
/// following day.
fn normalize_all_day_end(start: &EventDateTime, end: &mut EventDateTime) {
    let (Some(start), Some(end_date)) = (start.date.as_deref(), end.date.as_deref()) else {
        return;
    };
    let (Ok(start), Ok(current)) = (
        NaiveDate::parse_from_str(start, "%Y-%m-%d"),
        NaiveDate::parse_from_str(end_date, "%Y-%m-%d"),
    ) else {
        return;
    };
    if current <= start {
        *end = EventDateTime::all_day(start + Duration::days(1));
    }
}

/// Shared handle and defaults for the native tools
#[derive(Clone)]
pub struct ToolContext {
    calendar: Arc<GoogleCalendar>,
    calendar_id: String,
    timezone: String,
}

impl ToolContext {
    pub fn new(calendar: Arc<GoogleCalendar>, settings: &CalendarSettings) -> Self {
        Self {
            calendar,
            calendar_id: settings.calendar_id.clone(),
            timezone: settings.timezone.clone(),
        }
    }

    fn calendar_id<'a>(&'a self, requested: &'a Option<String>) -> &'a str {
        requested
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.calendar_id)
    }

    fn timezone<'a>(&'a self, requested: &'a Option<String>) -> &'a str {
        requested
            .as_deref()
            .filter(|tz| !tz.is_empty())
            .unwrap_or(&self.timezone)
    }
}

// ---------------------------------------------------------------------------
// create_event

pub struct CreateEventTool {
    ctx: ToolContext,
}

impl CreateEventTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[derive(Debug, Deserialize)]
struct CreateInput {
    summary: String,
    start_datetime: String,
    end_datetime: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    calendar_id: Option<String>,
}

#[async_trait]
impl Tool for CreateEventTool {
    fn name(&self) -> &str {
        "create_event"
    }

    fn description(&self) -> &str {
        "Create a new calendar event. 'start_datetime' and 'end_datetime' take \
         'YYYY-MM-DD HH:MM:SS' for timed events or 'YYYY-MM-DD' for all-day events."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("summary", "Event title")
            .required_string("start_datetime", "Start, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")
            .required_string("end_datetime", "End, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")
            .optional_string("description", "Event description")
            .optional_string("location", "Event location")
            .optional_string("timezone", "IANA time zone, defaults to the configured one")
            .optional_string("calendar_id", "Target calendar, defaults to primary")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: CreateInput = parse_input(input)?;
        let tz = self.ctx.timezone(&input.timezone);
        let calendar_id = self.ctx.calendar_id(&input.calendar_id);

        let times = EventDateTime::parse_input(&input.start_datetime, tz)
            .and_then(|start| Ok((start, EventDateTime::parse_input(&input.end_datetime, tz)?)));
        let (start, mut end) = match times {
            Ok(times) => times,
            Err(e) => return Ok(ToolResult::error(format!("Failed to create event: {}", e))),
        };
        normalize_all_day_end(&start, &mut end);

        let event = GoogleEvent {
            summary: Some(input.summary),
            description: input.description,
            location: input.location,
            start,
            end,
            ..GoogleEvent::default()
        };

        match self.ctx.calendar.insert_event(calendar_id, &event).await {
            Ok(created) => {
                if let Some(id) = &created.id {
                    turn.resolve(id.clone());
                }
                Ok(ToolResult::success(format!(
                    "Event created: {} | EVENT_ID: {}",
                    describe(&created),
                    event_id(&created)
                )))
            }
            Err(e) => Ok(ToolResult::error(format!("Failed to create event: {}", e))),
        }
    }
}

// ---------------------------------------------------------------------------
// update_event

pub struct UpdateEventTool {
    ctx: ToolContext,
}

impl UpdateEventTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[derive(Debug, Deserialize)]
struct UpdateInput {
    event_id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    start_datetime: Option<String>,
    #[serde(default)]
    end_datetime: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    calendar_id: Option<String>,
}

impl UpdateInput {
    /// Apply the supplied fields to `original`
    fn overlay(&self, original: &GoogleEvent, tz: &str) -> Result<GoogleEvent, CalendarError> {
        let mut merged = original.clone();
        if let Some(summary) = &self.summary {
            merged.summary = Some(summary.clone());
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }
        if let Some(location) = &self.location {
            merged.location = Some(location.clone());
        }

        match (&self.start_datetime, &self.end_datetime) {
            (Some(start), Some(end)) => {
                merged.start = EventDateTime::parse_input(start, tz)?;
                merged.end = EventDateTime::parse_input(end, tz)?;
            }
            (Some(start), None) => {
                // Only the start moves: keep the original duration
                let start = EventDateTime::parse_input(start, tz)?;
                let end = (start.is_all_day() == original.start.is_all_day())
                    .then(|| span(&original.start, &original.end))
                    .flatten()
                    .and_then(|length| shift(&start, length));
                merged.end = end.ok_or_else(|| {
                    CalendarError::InvalidInput(
                        "the new start cannot be combined with the existing end; \
                         provide both start_datetime and end_datetime"
                            .to_string(),
                    )
                })?;
                merged.start = start;
            }
            (None, Some(end)) => {
                let end = EventDateTime::parse_input(end, tz)?;
                if end.is_all_day() != merged.start.is_all_day() {
                    return Err(CalendarError::InvalidInput(
                        "the new end is not the same kind (all-day or timed) as the existing start; \
                         provide both start_datetime and end_datetime"
                            .to_string(),
                    ));
                }
                merged.end = end;
            }
            (None, None) => return Ok(merged),
        }

        let start = merged.start.clone();
        normalize_all_day_end(&start, &mut merged.end);
        if !start.is_all_day()
            && span(&start, &merged.end).is_some_and(|length| length <= Duration::zero())
        {
            return Err(CalendarError::InvalidInput(format!(
                "end '{}' is not after start '{}'",
                merged.end.raw(),
                start.raw()
            )));
        }
        Ok(merged)
    }
}

/// A timed bound: with an offset (RFC 3339) or local to its time zone
enum TimedValue {
    Offset(DateTime<FixedOffset>),
    Local(NaiveDateTime),
}

impl TimedValue {
    fn parse(raw: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Self::Offset(dt));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(Self::Local)
    }

    fn wall_clock(&self) -> NaiveDateTime {
        match self {
            Self::Offset(dt) => dt.naive_local(),
            Self::Local(naive) => *naive,
        }
    }
}

/// Length of an event when both bounds are the same kind
fn span(start: &EventDateTime, end: &EventDateTime) -> Option<Duration> {
    match (start.is_all_day(), end.is_all_day()) {
        (true, true) => {
            let start = NaiveDate::parse_from_str(start.date.as_deref()?, "%Y-%m-%d").ok()?;
            let end = NaiveDate::parse_from_str(end.date.as_deref()?, "%Y-%m-%d").ok()?;
            Some(end - start)
        }
        (false, false) => {
            let start = TimedValue::parse(start.date_time.as_deref()?)?;
            let end = TimedValue::parse(end.date_time.as_deref()?)?;
            Some(match (&start, &end) {
                (TimedValue::Offset(start), TimedValue::Offset(end)) => *end - *start,
                _ => end.wall_clock() - start.wall_clock(),
            })
        }
        _ => None,
    }
}

/// `start` moved forward by `length`, in the same representation
fn shift(start: &EventDateTime, length: Duration) -> Option<EventDateTime> {
    if start.is_all_day() {
        let date = NaiveDate::parse_from_str(start.date.as_deref()?, "%Y-%m-%d").ok()?;
        return Some(EventDateTime::all_day(date + length));
    }
    let shifted = match TimedValue::parse(start.date_time.as_deref()?)? {
        TimedValue::Offset(dt) => (dt + length).to_rfc3339(),
        TimedValue::Local(naive) => (naive + length).format("%Y-%m-%dT%H:%M:%S").to_string(),
    };
    Some(EventDateTime::timed(shifted, start.time_zone.clone()))
}

/// Whether an update response still identifies the event and its times
fn is_complete(event: &GoogleEvent) -> bool {
    event.id.as_deref().is_some_and(|id| !id.is_empty())
        && !event.start.raw().is_empty()
        && !event.end.raw().is_empty()
}

impl UpdateEventTool {
    /// Create the replacement, then delete the original
    async fn swap(
        &self,
        calendar_id: &str,
        original_id: &str,
        merged: &GoogleEvent,
        update_error: &CalendarError,
        turn: &TurnContext,
    ) -> ToolResult {
        let calendar = &self.ctx.calendar;

        let created = match calendar.insert_event(calendar_id, &merged.as_new()).await {
            Ok(created) => created,
            Err(e) => {
                return ToolResult::error(format!(
                    "Failed to update event: {}. The replacement could not be created either: {}. \
                     The original event is unchanged.",
                    update_error, e
                ));
            }
        };
        if let Some(id) = &created.id {
            turn.resolve(id.clone());
        }

        match calendar.delete_event(calendar_id, original_id).await {
            Ok(_) => {
                info!("Replaced event {} with {}", original_id, event_id(&created));
                ToolResult::success(format!(
                    "Event updated by replacement: {} | EVENT_ID: {} (previous EVENT_ID {} removed)",
                    describe(&created),
                    event_id(&created),
                    original_id
                ))
            }
            Err(e) => {
                warn!(
                    "Replacement {} created but original {} could not be deleted: {}",
                    event_id(&created),
                    original_id,
                    e
                );
                ToolResult::error(format!(
                    "Created the updated event {} | EVENT_ID: {}, but failed to delete the original \
                     EVENT_ID {}: {}. Both events now exist on the calendar.",
                    describe(&created),
                    event_id(&created),
                    original_id,
                    e
                ))
            }
        }
    }
}

#[async_trait]
impl Tool for UpdateEventTool {
    fn name(&self) -> &str {
        "update_event"
    }

    fn description(&self) -> &str {
        "Update an existing event. Requires an 'event_id' returned by find_event_ids in this request. \
         Only the fields you provide are changed."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("event_id", "EVENT_ID returned by find_event_ids")
            .optional_string("summary", "New title")
            .optional_string("start_datetime", "New start, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")
            .optional_string("end_datetime", "New end, 'YYYY-MM-DD HH:MM:SS' or 'YYYY-MM-DD'")
            .optional_string("description", "New description")
            .optional_string("location", "New location")
            .optional_string("timezone", "IANA time zone for new times")
            .optional_string("calendar_id", "Calendar holding the event, defaults to primary")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: UpdateInput = parse_input(input)?;
        if !turn.is_resolved(&input.event_id) {
            return Ok(unresolved(self.name(), &input.event_id));
        }

        let calendar_id = self.ctx.calendar_id(&input.calendar_id);
        let tz = self.ctx.timezone(&input.timezone);
        let calendar = &self.ctx.calendar;

        let original = match calendar.get_event(calendar_id, &input.event_id).await {
            Ok(event) => event,
            Err(e) => return Ok(ToolResult::error(format!("Failed to update event: {}", e))),
        };
        let merged = match input.overlay(&original, tz) {
            Ok(merged) => merged,
            Err(e) => return Ok(ToolResult::error(format!("Failed to update event: {}", e))),
        };

        let update = calendar
            .update_event(calendar_id, &input.event_id, &merged)
            .await
            .and_then(|updated| {
                if is_complete(&updated) {
                    Ok(updated)
                } else {
                    Err(CalendarError::IncompleteResponse(format!(
                        "update of {} returned no event id or times",
                        input.event_id
                    )))
                }
            });

        match update {
            Ok(updated) => Ok(ToolResult::success(format!(
                "Event updated: {} | EVENT_ID: {}",
                describe(&updated),
                event_id(&updated)
            ))),
            Err(e) => {
                warn!("Update of {} failed, replacing instead: {}", input.event_id, e);
                Ok(self
                    .swap(calendar_id, &input.event_id, &merged, &e, turn)
                    .await)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// move_event

pub struct MoveEventTool {
    ctx: ToolContext,
}

impl MoveEventTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[derive(Debug, Deserialize)]
struct MoveInput {
    event_id: String,
    destination_calendar_id: String,
    #[serde(default)]
    calendar_id: Option<String>,
}

#[async_trait]
impl Tool for MoveEventTool {
    fn name(&self) -> &str {
        "move_event"
    }

    fn description(&self) -> &str {
        "Move an event to another calendar. Requires an 'event_id' returned by find_event_ids in this request."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("event_id", "EVENT_ID returned by find_event_ids")
            .required_string("destination_calendar_id", "Calendar to move the event to")
            .optional_string("calendar_id", "Calendar currently holding the event, defaults to primary")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: MoveInput = parse_input(input)?;
        if !turn.is_resolved(&input.event_id) {
            return Ok(unresolved(self.name(), &input.event_id));
        }

        let calendar_id = self.ctx.calendar_id(&input.calendar_id);
        match self
            .ctx
            .calendar
            .move_event(calendar_id, &input.event_id, &input.destination_calendar_id)
            .await
        {
            Ok(moved) => Ok(ToolResult::success(format!(
                "Event moved to '{}': {} | EVENT_ID: {}",
                input.destination_calendar_id,
                describe(&moved),
                event_id(&moved)
            ))),
            Err(e) => Ok(ToolResult::error(format!("Failed to move event: {}", e))),
        }
    }
}

// ---------------------------------------------------------------------------
// delete_event

pub struct DeleteEventTool {
    ctx: ToolContext,
}

impl DeleteEventTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteInput {
    event_id: String,
    #[serde(default)]
    calendar_id: Option<String>,
}

#[async_trait]
impl Tool for DeleteEventTool {
    fn name(&self) -> &str {
        "delete_event"
    }

    fn description(&self) -> &str {
        "Delete an event. Requires an 'event_id' returned by find_event_ids in this request."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("event_id", "EVENT_ID returned by find_event_ids")
            .optional_string("calendar_id", "Calendar holding the event, defaults to primary")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: DeleteInput = parse_input(input)?;
        if !turn.is_resolved(&input.event_id) {
            return Ok(unresolved(self.name(), &input.event_id));
        }

        let calendar_id = self.ctx.calendar_id(&input.calendar_id);
        match self
            .ctx
            .calendar
            .delete_event(calendar_id, &input.event_id)
            .await
        {
            Ok(DeleteOutcome::Deleted) => Ok(ToolResult::success(format!(
                "Event deleted. EVENT_ID: {}",
                input.event_id
            ))),
            Ok(DeleteOutcome::AlreadyGone) => Ok(ToolResult::success(format!(
                "Event already deleted. EVENT_ID: {}",
                input.event_id
            ))),
            Err(e) => Ok(ToolResult::error(format!("Failed to delete event: {}", e))),
        }
    }
}

// ---------------------------------------------------------------------------
// search_events

pub struct SearchEventsTool {
    ctx: ToolContext,
    limit: u32,
}

impl SearchEventsTool {
    pub fn new(ctx: ToolContext, limit: u32) -> Self {
        Self { ctx, limit }
    }
}

#[derive(Debug, Deserialize)]
struct SearchInput {
    query: String,
    #[serde(default)]
    time_min: Option<String>,
    #[serde(default)]
    time_max: Option<String>,
    #[serde(default)]
    calendar_id: Option<String>,
}

#[async_trait]
impl Tool for SearchEventsTool {
    fn name(&self) -> &str {
        "search_events"
    }

    fn description(&self) -> &str {
        "Search events by free text, optionally within an RFC 3339 time window."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new()
            .required_string("query", "Free-text query")
            .optional_string("time_min", "Lower bound, RFC 3339")
            .optional_string("time_max", "Upper bound, RFC 3339")
            .optional_string("calendar_id", "Calendar to search, defaults to primary")
            .build()
    }

    async fn execute(&self, input: Value, turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let input: SearchInput = parse_input(input)?;
        let calendar_id = self.ctx.calendar_id(&input.calendar_id);

        let mut query = ListQuery::new(self.limit).keyword(input.query.clone());
        query.time_min = input.time_min;
        query.time_max = input.time_max;

        match self.ctx.calendar.list_events(calendar_id, &query).await {
            Ok(events) => {
                let events: Vec<_> = events
                    .iter()
                    .map(|e| e.to_calendar_event(calendar_id))
                    .collect();
                turn.resolve_all(events.iter().filter_map(|e| e.id.clone()));
                Ok(ToolResult::success(keyword_summary(&input.query, &events)))
            }
            Err(e) => Ok(ToolResult::error(format!("Failed to search events: {}", e))),
        }
    }
}

// ---------------------------------------------------------------------------
// get_calendars_info

pub struct GetCalendarsInfoTool {
    ctx: ToolContext,
}

impl GetCalendarsInfoTool {
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Tool for GetCalendarsInfoTool {
    fn name(&self) -> &str {
        "get_calendars_info"
    }

    fn description(&self) -> &str {
        "List the calendars of the user with their IDs and time zones."
    }

    fn input_schema(&self) -> Value {
        SchemaBuilder::new().build()
    }

    async fn execute(&self, _input: Value, _turn: &TurnContext) -> novacal_core::Result<ToolResult> {
        let calendars = match self.ctx.calendar.list_calendars().await {
            Ok(calendars) => calendars,
            Err(e) => {
                return Ok(ToolResult::error(format!(
                    "Failed to fetch calendars: {}",
                    e
                )))
            }
        };

        if calendars.is_empty() {
            return Ok(ToolResult::success("No calendars found."));
        }

        let mut out = String::from("Calendars:\n");
        for cal in &calendars {
            let _ = writeln!(
                out,
                "- {}{} | CALENDAR_ID: {} | TIME_ZONE: {}",
                cal.summary,
                if cal.primary { " (primary)" } else { "" },
                cal.id,
                cal.time_zone.as_deref().unwrap_or("unknown")
            );
        }
        Ok(ToolResult::success(out))
    }
}
