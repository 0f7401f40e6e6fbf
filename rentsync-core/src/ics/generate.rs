//! Outbound feed rendering.

use chrono::NaiveDate;
use icalendar::{Calendar, Component, EventLike, Property, ValueType};

use crate::constants::ICS_PRODID;

/// An all-day event to publish; `end` is exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEventOut {
    pub uid: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub summary: String,
    pub description: Option<String>,
}

/// Render a complete `VCALENDAR` document with CRLF line endings.
///
/// DTSTAMP is pinned to the event start, so equal inputs give equal bytes.
pub fn render_calendar(name: &str, events: &[FeedEventOut]) -> String {
    let mut cal = Calendar::new();
    cal.append_property(Property::new("METHOD", "PUBLISH"));
    cal.append_property(Property::new("X-WR-CALNAME", name));

    for event in events {
        let mut ics_event = icalendar::Event::new();
        ics_event.uid(&event.uid);
        ics_event.add_property("DTSTAMP", format!("{}T000000Z", event.start.format("%Y%m%d")));
        add_date_property(&mut ics_event, "DTSTART", event.start);
        add_date_property(&mut ics_event, "DTEND", event.end);
        ics_event.summary(&event.summary);
        if let Some(ref description) = event.description {
            ics_event.description(description);
        }
        ics_event.add_property("TRANSP", "OPAQUE");
        cal.push(ics_event.done());
    }

    replace_prodid(&cal.done().to_string())
}

fn add_date_property(ics_event: &mut icalendar::Event, name: &str, date: NaiveDate) {
    let mut prop = Property::new(name, date.format("%Y%m%d").to_string());
    prop.append_parameter(ValueType::Date);
    ics_event.append_property(prop);
}

/// Swap the crate's PRODID for ours and normalize line endings to CRLF.
fn replace_prodid(ics: &str) -> String {
    let mut result = String::with_capacity(ics.len());
    for line in ics.lines() {
        if line.starts_with("PRODID:") {
            result.push_str("PRODID:");
            result.push_str(ICS_PRODID);
        } else {
            result.push_str(line);
        }
        result.push_str("\r\n");
    }
    result
}
