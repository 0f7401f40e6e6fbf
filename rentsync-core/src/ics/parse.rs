//! Inbound feed parsing using the icalendar crate's parser.

use chrono::{Duration, NaiveDate};
use icalendar::{
    CalendarDateTime, DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{RentSyncError, RentSyncResult};
use crate::ics::text::unescape_text;

/// One busy block read from an external feed.
///
/// Only the calendar date of `DTSTART`/`DTEND` is kept; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEvent {
    pub uid: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: Option<String>,
}

impl FeedEvent {
    /// Every day in `[start, end)`.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(|day| *day < self.end)
    }
}

/// Parse an `.ics` document into its events.
///
/// Events without a UID or a readable DTSTART are dropped. A missing DTEND,
/// or one that does not come after DTSTART, means a single day.
pub fn parse_feed(content: &str) -> RentSyncResult<Vec<FeedEvent>> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| RentSyncError::IcsParse(e.to_string()))?;

    let mut events = Vec::new();
    collect_events(&calendar.components, &mut events);
    Ok(events)
}

fn collect_events(components: &[Component<'_>], events: &mut Vec<FeedEvent>) {
    for component in components {
        if component.name == "VEVENT" {
            match to_feed_event(component) {
                Some(event) => events.push(event),
                None => tracing::debug!("dropping VEVENT without UID or DTSTART"),
            }
        } else {
            collect_events(&component.components, events);
        }
    }
}

fn to_feed_event(vevent: &Component<'_>) -> Option<FeedEvent> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string().trim().to_string())
        .filter(|uid| !uid.is_empty())?;
    let start = date_portion(vevent.find_prop("DTSTART")?)?;
    let end = vevent
        .find_prop("DTEND")
        .and_then(date_portion)
        .filter(|end| *end > start)
        .unwrap_or(start + Duration::days(1));
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(&p.val.to_string()));

    Some(FeedEvent {
        uid,
        start,
        end,
        summary,
    })
}

/// Calendar date of a DTSTART/DTEND value, as written (no zone conversion).
fn date_portion(prop: &Property<'_>) -> Option<NaiveDate> {
    match DatePerhapsTime::try_from(prop) {
        Ok(DatePerhapsTime::Date(date)) => Some(date),
        Ok(DatePerhapsTime::DateTime(dt)) => Some(match dt {
            CalendarDateTime::Utc(dt) => dt.date_naive(),
            CalendarDateTime::Floating(naive) => naive.date(),
            CalendarDateTime::WithTimezone { date_time, .. } => date_time.date(),
        }),
        // Values the crate rejects, e.g. with trailing junk or fractional seconds
        Err(_) => {
            let value = prop.val.to_string();
            let digits = value.trim().get(..8)?;
            NaiveDate::parse_from_str(digits, "%Y%m%d").ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_all_day_event() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Airbnb Inc//Hosting Calendar 0.8.8//EN\r\n\
BEGIN:VEVENT\r\n\
DTSTART;VALUE=DATE:20260101\r\n\
DTEND;VALUE=DATE:20260104\r\n\
UID:abc\r\n\
SUMMARY:Reserved\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "abc");
        assert_eq!(events[0].summary.as_deref(), Some("Reserved"));

        let dates: Vec<NaiveDate> = events[0].dates().collect();
        assert_eq!(dates, vec![date(2026, 1, 1), date(2026, 1, 2), date(2026, 1, 3)]);
    }

    #[test]
    fn test_time_of_day_is_ignored() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:timed\r\n\
DTSTART;TZID=Europe/Madrid:20260310T150000\r\n\
DTEND;TZID=Europe/Madrid:20260312T110000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events[0].start, date(2026, 3, 10));
        assert_eq!(events[0].end, date(2026, 3, 12));
        assert_eq!(events[0].dates().count(), 2);
    }

    #[test]
    fn test_missing_dtend_is_one_day() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:single\r\n\
DTSTART:20260501\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:backwards\r\n\
DTSTART:20260510\r\n\
DTEND:20260510\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].end, date(2026, 5, 2));
        assert_eq!(events[1].end, date(2026, 5, 11));
    }

    #[test]
    fn test_events_without_uid_or_start_are_dropped() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
DTSTART:20260101\r\n\
DTEND:20260102\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:no-start\r\n\
DTEND:20260102\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:kept\r\n\
DTSTART:20260105\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].uid, "kept");
    }

    #[test]
    fn test_folded_uid_is_unfolded() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:1418fb94e984-f7a1a9bd7c05f2e8e8e0c0b2f1@\r\n airbnb.com\r\n\
DTSTART;VALUE=DATE:20260201\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events[0].uid, "1418fb94e984-f7a1a9bd7c05f2e8e8e0c0b2f1@airbnb.com");
    }

    #[test]
    fn test_utc_and_odd_date_values() {
        let ics = "BEGIN:VCALENDAR\r\n\
BEGIN:VEVENT\r\n\
UID:utc\r\n\
DTSTART:20260630T230000Z\r\n\
DTEND:20260702T010000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:fractional\r\n\
DTSTART:20260801T100000.000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:garbage\r\n\
DTSTART:soon\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].start, date(2026, 6, 30));
        assert_eq!(events[0].end, date(2026, 7, 2));
        assert_eq!(events[1].uid, "fractional");
        assert_eq!(events[1].start, date(2026, 8, 1));
    }

    #[test]
    fn test_empty_feed_has_no_events() {
        assert!(parse_feed("").unwrap().is_empty());
        assert!(
            parse_feed("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n")
                .unwrap()
                .is_empty()
        );
    }
}
