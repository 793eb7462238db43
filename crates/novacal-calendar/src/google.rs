//! Google Calendar REST client

use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use novacal_core::CalendarSettings;

use crate::error::{CalendarError, Result};
use crate::models::{CalendarInfo, CalendarList, EventList, GoogleEvent};
use crate::oauth::TokenStore;

/// Parameters of an `events.list` call.
///
/// Recurring events are always expanded and ordered by start time.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub q: Option<String>,
    pub time_min: Option<String>,
    pub time_max: Option<String>,
    pub max_results: u32,
}

impl ListQuery {
    pub fn new(max_results: u32) -> Self {
        Self {
            max_results,
            ..Self::default()
        }
    }

    pub fn keyword(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn window(mut self, time_min: impl Into<String>, time_max: impl Into<String>) -> Self {
        self.time_min = Some(time_min.into());
        self.time_max = Some(time_max.into());
        self
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
            ("maxResults", self.max_results.to_string()),
        ];
        if let Some(q) = &self.q {
            params.push(("q", q.clone()));
        }
        if let Some(min) = &self.time_min {
            params.push(("timeMin", min.clone()));
        }
        if let Some(max) = &self.time_max {
            params.push(("timeMax", max.clone()));
        }
        params
    }
}

/// What a delete call found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The service reported 404 or 410
    AlreadyGone,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: String,
}

/// Client for one user's Google Calendar
pub struct GoogleCalendar {
    http: Client,
    base_url: Url,
    tokens: TokenStore,
}

impl GoogleCalendar {
    /// Create a client from the calendar settings
    pub fn new(settings: &CalendarSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let base_url = Url::parse(settings.api_base_url.trim_end_matches('/')).map_err(|e| {
            CalendarError::InvalidInput(format!(
                "invalid calendar API URL '{}': {}",
                settings.api_base_url, e
            ))
        })?;

        info!("Calendar client initialized for: {}", base_url);

        Ok(Self {
            http,
            base_url,
            tokens: TokenStore::new(&settings.token_path),
        })
    }

    pub fn token_store(&self) -> &TokenStore {
        &self.tokens
    }

    /// Confirm the token file exists and parses, without network access
    pub fn check_credentials(&self) -> Result<()> {
        self.tokens.load().map(|_| ())
    }

    /// A valid bearer token, refreshed if needed
    pub async fn access_token(&self) -> Result<String> {
        self.tokens.access_token(&self.http).await
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                CalendarError::InvalidInput(format!("'{}' cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn events_url(&self, calendar_id: &str, rest: &[&str]) -> Result<Url> {
        let mut segments = vec!["calendars", calendar_id, "events"];
        segments.extend_from_slice(rest);
        self.url(&segments)
    }

    async fn send_raw(&self, request: RequestBuilder, token: &str) -> Result<String> {
        let response = request.bearer_auth(token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Calendar API error: {} - {}", status, body);
            return Err(api_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, token: &str) -> Result<T> {
        let body = self.send_raw(request, token).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `events.list` on one calendar
    pub async fn list_events(&self, calendar_id: &str, query: &ListQuery) -> Result<Vec<GoogleEvent>> {
        let token = self.access_token().await?;
        self.list_events_with(&token, calendar_id, query).await
    }

    /// `events.list` with an already obtained token
    pub async fn list_events_with(
        &self,
        token: &str,
        calendar_id: &str,
        query: &ListQuery,
    ) -> Result<Vec<GoogleEvent>> {
        let url = self.events_url(calendar_id, &[])?;
        debug!("Listing events: calendar={} query={:?}", calendar_id, query);

        let list: EventList = self
            .send(self.http.get(url).query(&query.params()), token)
            .await?;
        Ok(list.items)
    }

    /// `events.get`
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> Result<GoogleEvent> {
        let token = self.access_token().await?;
        let url = self.events_url(calendar_id, &[event_id])?;
        self.send(self.http.get(url), &token).await
    }

    /// `events.insert`
    pub async fn insert_event(&self, calendar_id: &str, event: &GoogleEvent) -> Result<GoogleEvent> {
        let token = self.access_token().await?;
        let url = self.events_url(calendar_id, &[])?;
        let created: GoogleEvent = self.send(self.http.post(url).json(event), &token).await?;
        info!(
            "Created event {} on {}",
            created.id.as_deref().unwrap_or_default(),
            calendar_id
        );
        Ok(created)
    }

    /// `events.update` (full replacement)
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &GoogleEvent,
    ) -> Result<GoogleEvent> {
        let token = self.access_token().await?;
        let url = self.events_url(calendar_id, &[event_id])?;
        let updated = self.send(self.http.put(url).json(event), &token).await?;
        info!("Updated event {} on {}", event_id, calendar_id);
        Ok(updated)
    }

    /// `events.delete`; 404 and 410 count as already deleted
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<DeleteOutcome> {
        let token = self.access_token().await?;
        let url = self.events_url(calendar_id, &[event_id])?;

        match self.send_raw(self.http.delete(url), &token).await {
            Ok(_) => {
                info!("Deleted event {} from {}", event_id, calendar_id);
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if e.is_gone() => {
                debug!("Event {} already gone", event_id);
                Ok(DeleteOutcome::AlreadyGone)
            }
            Err(e) => Err(e),
        }
    }

    /// `events.move` to another calendar
    pub async fn move_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        destination: &str,
    ) -> Result<GoogleEvent> {
        let token = self.access_token().await?;
        let url = self.events_url(calendar_id, &[event_id, "move"])?;
        let moved = self
            .send(self.http.post(url).query(&[("destination", destination)]), &token)
            .await?;
        info!("Moved event {} from {} to {}", event_id, calendar_id, destination);
        Ok(moved)
    }

    /// `calendarList.list`
    pub async fn list_calendars(&self) -> Result<Vec<CalendarInfo>> {
        let token = self.access_token().await?;
        let url = self.url(&["users", "me", "calendarList"])?;
        let list: CalendarList = self.send(self.http.get(url), &token).await?;
        Ok(list.items)
    }
}

fn api_error(status: u16, body: &str) -> CalendarError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let reason = envelope
                .error
                .errors
                .first()
                .map(|e| e.reason.clone())
                .filter(|r| !r.is_empty())
                .or(envelope.error.status)
                .unwrap_or_else(|| "unknown".to_string());
            CalendarError::Api {
                status,
                reason,
                message: envelope.error.message,
            }
        }
        Err(_) => CalendarError::Api {
            status,
            reason: "unknown".to_string(),
            message: body.to_string(),
        },
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use wiremock::MockServer;

    /// A client against `server` with a valid token in a temp directory
    pub fn calendar_for(server: &MockServer) -> (GoogleCalendar, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let expiry = (Utc::now() + Duration::hours(1)).to_rfc3339();
        std::fs::write(
            &token_path,
            json!({"token": "test-token", "expiry": expiry}).to_string(),
        )
        .unwrap();

        let settings = CalendarSettings {
            token_path: token_path.to_string_lossy().into_owned(),
            api_base_url: server.uri(),
            ..CalendarSettings::default()
        };
        (GoogleCalendar::new(&settings).unwrap(), dir)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::calendar_for;
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_sends_expansion_params_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param("maxResults", "10"))
            .and(query_param("q", "Dentist"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "evt1", "summary": "Dentist", "start": {"date": "2025-08-20"}, "end": {"date": "2025-08-21"}}]
            })))
            .mount(&server)
            .await;

        let (calendar, _dir) = calendar_for(&server);
        let events = calendar
            .list_events("primary", &ListQuery::new(10).keyword("Dentist"))
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id.as_deref(), Some("evt1"));
    }

    #[tokio::test]
    async fn test_calendar_id_is_path_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/calendars/id.indonesian%23holiday@group.v.calendar.google.com/events",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;

        let (calendar, _dir) = calendar_for(&server);
        let events = calendar
            .list_events(
                "id.indonesian#holiday@group.v.calendar.google.com",
                &ListQuery::new(50),
            )
            .await
            .unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_error_body_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {
                    "code": 404,
                    "message": "Not Found",
                    "errors": [{"domain": "global", "reason": "notFound", "message": "Not Found"}]
                }
            })))
            .mount(&server)
            .await;

        let (calendar, _dir) = calendar_for(&server);
        let err = calendar.get_event("primary", "missing").await.unwrap_err();

        match err {
            CalendarError::Api {
                status,
                reason,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(reason, "notFound");
                assert_eq!(message, "Not Found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_treats_gone_as_success() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt2"))
            .respond_with(ResponseTemplate::new(410).set_body_json(json!({
                "error": {"code": 410, "message": "Resource has been deleted", "errors": [{"reason": "deleted"}]}
            })))
            .mount(&server)
            .await;

        let (calendar, _dir) = calendar_for(&server);
        assert_eq!(
            calendar.delete_event("primary", "evt1").await.unwrap(),
            DeleteOutcome::Deleted
        );
        assert_eq!(
            calendar.delete_event("primary", "evt2").await.unwrap(),
            DeleteOutcome::AlreadyGone
        );
    }

    #[tokio::test]
    async fn test_move_passes_destination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events/evt1/move"))
            .and(query_param("destination", "work@group.calendar.google.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "evt1", "summary": "Review", "start": {"date": "2025-08-20"}, "end": {"date": "2025-08-21"}
            })))
            .mount(&server)
            .await;

        let (calendar, _dir) = calendar_for(&server);
        let moved = calendar
            .move_event("primary", "evt1", "work@group.calendar.google.com")
            .await
            .unwrap();
        assert_eq!(moved.title(), "Review");
    }

    #[tokio::test]
    async fn test_missing_token_fails_before_request() {
        let server = MockServer::start().await;
        let settings = CalendarSettings {
            token_path: "/nonexistent/token.json".to_string(),
            api_base_url: server.uri(),
            ..CalendarSettings::default()
        };
        let calendar = GoogleCalendar::new(&settings).unwrap();

        assert!(calendar.check_credentials().is_err());
        let err = calendar.list_calendars().await.unwrap_err();
        assert!(matches!(err, CalendarError::Auth(_)));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
