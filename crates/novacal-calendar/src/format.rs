//! Plain-text summaries returned by the lookup tools

use std::fmt::Write;

use crate::models::CalendarEvent;

const NO_ID: &str = "NO_ID_FOUND";

/// `YYYY-MM-DD` part of a raw start
pub fn event_date(raw_start: &str) -> &str {
    raw_start.get(..10).unwrap_or(raw_start)
}

/// `HH:MM - HH:MM` for timed events, `All-day` otherwise
pub fn time_range(raw_start: &str, raw_end: &str) -> String {
    if raw_start.contains('T') {
        format!(
            "{} - {}",
            raw_start.get(11..16).unwrap_or_default(),
            raw_end.get(11..16).unwrap_or_default()
        )
    } else {
        "All-day".to_string()
    }
}

/// Keyword lookup result: every line carries the event identifier
pub fn keyword_summary(keyword: &str, events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return format!("No events found matching the keyword: '{}'.", keyword);
    }

    let mut out = format!("Matching Events Found for '{}':\n", keyword);
    for event in events {
        let _ = writeln!(
            out,
            "- [{}] '{}' ({}) | EVENT_ID: {}",
            event_date(&event.start),
            event.title,
            time_range(&event.start, &event.end),
            event.id.as_deref().unwrap_or(NO_ID)
        );
    }
    out
}

/// Date-range lookup result: no identifiers
pub fn range_summary(start_date: &str, end_date: &str, events: &[CalendarEvent]) -> String {
    if events.is_empty() {
        return format!("No events scheduled from {} to {}.", start_date, end_date);
    }

    let mut out = format!("Schedule from {} to {}:\n", start_date, end_date);
    for event in events {
        let _ = writeln!(
            out,
            "- [{}] {} ({})",
            event_date(&event.start),
            event.title,
            time_range(&event.start, &event.end)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: Option<&str>, title: &str, start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            id: id.map(str::to_string),
            title: title.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            calendar_id: "primary".to_string(),
        }
    }

    #[test]
    fn test_time_range() {
        assert_eq!(
            time_range("2025-08-18T09:00:00+07:00", "2025-08-18T10:30:00+07:00"),
            "09:00 - 10:30"
        );
        assert_eq!(time_range("2025-08-17", "2025-08-18"), "All-day");
    }

    #[test]
    fn test_independence_day_range() {
        let events = [event(
            Some("hol1"),
            "Independence Day",
            "2025-08-17",
            "2025-08-18",
        )];
        assert_eq!(
            range_summary("2025-08-17", "2025-08-17", &events),
            "Schedule from 2025-08-17 to 2025-08-17:\n- [2025-08-17] Independence Day (All-day)\n"
        );
    }

    #[test]
    fn test_empty_summaries() {
        assert_eq!(
            range_summary("2025-08-17", "2025-08-20", &[]),
            "No events scheduled from 2025-08-17 to 2025-08-20."
        );
        assert_eq!(
            keyword_summary("Dentist", &[]),
            "No events found matching the keyword: 'Dentist'."
        );
    }

    #[test]
    fn test_keyword_lines_carry_ids_range_lines_do_not() {
        let events = [
            event(
                Some("evt1"),
                "Dentist",
                "2025-08-20T10:00:00+07:00",
                "2025-08-20T11:00:00+07:00",
            ),
            event(None, "Dentist follow-up", "2025-09-01", "2025-09-02"),
        ];

        let keyword = keyword_summary("Dentist", &events);
        assert_eq!(
            keyword,
            "Matching Events Found for 'Dentist':\n\
             - [2025-08-20] 'Dentist' (10:00 - 11:00) | EVENT_ID: evt1\n\
             - [2025-09-01] 'Dentist follow-up' (All-day) | EVENT_ID: NO_ID_FOUND\n"
        );
        for line in keyword.lines().skip(1) {
            assert!(line.contains("EVENT_ID: "));
        }

        let range = range_summary("2025-08-20", "2025-09-01", &events);
        assert!(!range.contains("EVENT_ID"));
        assert!(!range.contains("evt1"));
    }
}
