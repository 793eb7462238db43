//! Data models for the Google Calendar REST API

use chrono::{NaiveDate, NaiveDateTime, DateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CalendarError, Result};

/// Fallback title for events without a summary
pub const UNTITLED_EVENT: &str = "Untitled Event";

/// Background and border color of visual calendar records
pub const VIEW_COLOR: &str = "#FF4B4B";

/// Start or end of an event: a date for all-day events, a date-time otherwise
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date: Some(date.format("%Y-%m-%d").to_string()),
            ..Self::default()
        }
    }

    pub fn timed(date_time: impl Into<String>, time_zone: Option<String>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.into()),
            time_zone,
        }
    }

    /// The string as returned by the service: `dateTime`, else `date`
    pub fn raw(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or_default()
    }

    /// Parse user input into a start or end.
    ///
    /// Accepts `YYYY-MM-DD` (all-day), `YYYY-MM-DD HH:MM[:SS]`,
    /// `YYYY-MM-DDTHH:MM[:SS]` (local to `time_zone`) and RFC 3339 with an
    /// offset.
    pub fn parse_input(value: &str, time_zone: &str) -> Result<Self> {
        let value = value.trim();

        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Ok(Self::all_day(date));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self::timed(dt.to_rfc3339(), None));
        }

        const FORMATS: [&str; 4] = [
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%d %H:%M",
            "%Y-%m-%dT%H:%M",
        ];
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
            .map(|dt| {
                Self::timed(
                    dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    Some(time_zone.to_string()),
                )
            })
            .ok_or_else(|| {
                CalendarError::InvalidInput(format!(
                    "'{}' is not a date (YYYY-MM-DD) or date-time (YYYY-MM-DD HH:MM:SS)",
                    value
                ))
            })
    }

    pub fn is_all_day(&self) -> bool {
        self.date_time.is_none() && self.date.is_some()
    }
}

/// An event resource as exchanged with the API.
///
/// Fields this crate does not model are kept in `extra` so a fetched event
/// can be sent back in a full update without losing anything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoogleEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Server-assigned fields that must not be sent when inserting a copy
const READ_ONLY_FIELDS: [&str; 8] = [
    "etag",
    "iCalUID",
    "htmlLink",
    "created",
    "updated",
    "creator",
    "organizer",
    "sequence",
];

impl GoogleEvent {
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or(UNTITLED_EVENT)
    }

    /// A copy suitable for `events.insert`: no id, no server-assigned fields
    pub fn as_new(&self) -> Self {
        let mut copy = self.clone();
        copy.id = None;
        for field in READ_ONLY_FIELDS {
            copy.extra.remove(field);
        }
        copy.extra.remove("recurringEventId");
        copy.extra.remove("originalStartTime");
        copy
    }

    pub fn to_calendar_event(&self, calendar_id: &str) -> CalendarEvent {
        CalendarEvent {
            id: self.id.clone(),
            title: self.title().to_string(),
            start: self.start.raw().to_string(),
            end: self.end.raw().to_string(),
            calendar_id: calendar_id.to_string(),
        }
    }
}

/// `events.list` response body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// A calendar event as read for summaries.
///
/// `start` and `end` keep the raw service strings so formatting can slice
/// them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub title: String,
    pub start: String,
    pub end: String,
    pub calendar_id: String,
}

/// A calendar of the authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarInfo {
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// `calendarList.list` response body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarInfo>,
}

/// Record consumed by the visual calendar grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewEvent {
    pub title: String,
    pub start: String,
    pub end: String,
    pub background_color: String,
    pub border_color: String,
}

impl From<&GoogleEvent> for ViewEvent {
    fn from(event: &GoogleEvent) -> Self {
        Self {
            title: event.title().to_string(),
            start: event.start.raw().to_string(),
            end: event.end.raw().to_string(),
            background_color: VIEW_COLOR.to_string(),
            border_color: VIEW_COLOR.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_survive_roundtrip() {
        let raw = json!({
            "id": "evt1",
            "summary": "Standup",
            "start": {"dateTime": "2025-08-18T09:00:00+07:00"},
            "end": {"dateTime": "2025-08-18T09:15:00+07:00"},
            "attendees": [{"email": "a@example.com"}],
            "reminders": {"useDefault": true},
            "etag": "\"123\""
        });

        let event: GoogleEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.extra.len(), 3);

        let back = serde_json::to_value(&event).unwrap();
        assert_eq!(back["attendees"][0]["email"], "a@example.com");
        assert_eq!(back["start"]["dateTime"], "2025-08-18T09:00:00+07:00");
        assert!(back["start"].get("date").is_none());
    }

    #[test]
    fn test_as_new_strips_identity() {
        let event: GoogleEvent = serde_json::from_value(json!({
            "id": "evt1",
            "iCalUID": "evt1@google.com",
            "etag": "\"1\"",
            "colorId": "5",
            "start": {"date": "2025-08-17"},
            "end": {"date": "2025-08-18"}
        }))
        .unwrap();

        let copy = event.as_new();
        assert!(copy.id.is_none());
        assert!(!copy.extra.contains_key("iCalUID"));
        assert_eq!(copy.extra["colorId"], "5");
    }

    #[test]
    fn test_parse_input_variants() {
        let all_day = EventDateTime::parse_input("2025-08-17", "Asia/Jakarta").unwrap();
        assert!(all_day.is_all_day());
        assert_eq!(all_day.raw(), "2025-08-17");

        let local = EventDateTime::parse_input("2025-08-17 14:00:00", "Asia/Jakarta").unwrap();
        assert_eq!(local.raw(), "2025-08-17T14:00:00");
        assert_eq!(local.time_zone.as_deref(), Some("Asia/Jakarta"));

        let offset = EventDateTime::parse_input("2025-08-17T14:00:00+07:00", "UTC").unwrap();
        assert_eq!(offset.raw(), "2025-08-17T14:00:00+07:00");
        assert!(offset.time_zone.is_none());

        assert!(EventDateTime::parse_input("next tuesday", "UTC").is_err());
    }

    #[test]
    fn test_view_event_shape() {
        let event: GoogleEvent = serde_json::from_value(json!({
            "start": {"date": "2025-08-17"},
            "end": {"date": "2025-08-18"}
        }))
        .unwrap();

        let view = serde_json::to_value(ViewEvent::from(&event)).unwrap();
        assert_eq!(
            view,
            json!({
                "title": "Untitled Event",
                "start": "2025-08-17",
                "end": "2025-08-18",
                "backgroundColor": "#FF4B4B",
                "borderColor": "#FF4B4B"
            })
        );
    }
}
