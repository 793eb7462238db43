//! Records for the visual calendar grid

use std::sync::Arc;

use tracing::warn;

use novacal_core::CalendarSettings;

use crate::google::{GoogleCalendar, ListQuery};
use crate::models::ViewEvent;

/// Shown instead of a grid when the calendar has no events
pub const EMPTY_VIEW_MESSAGE: &str = "No upcoming events found. Your calendar is currently empty.";

pub struct CalendarView {
    calendar: Arc<GoogleCalendar>,
    calendar_id: String,
    limit: u32,
}

impl CalendarView {
    pub fn new(calendar: Arc<GoogleCalendar>, settings: &CalendarSettings) -> Self {
        Self {
            calendar,
            calendar_id: settings.calendar_id.clone(),
            limit: settings.view_limit,
        }
    }

    /// Every event of the primary calendar as a grid record.
    ///
    /// The error side is the message to display in place of the grid.
    pub async fn events(&self) -> Result<Vec<ViewEvent>, String> {
        let query = ListQuery::new(self.limit);
        match self.calendar.list_events(&self.calendar_id, &query).await {
            Ok(events) => Ok(events.iter().map(ViewEvent::from).collect()),
            Err(e) => {
                warn!("Visual calendar listing failed: {}", e);
                Err(format!("Failed to fetch visual calendar events: {}", e))
            }
        }
    }
}
