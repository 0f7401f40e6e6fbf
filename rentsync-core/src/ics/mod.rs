//! iCalendar reading and writing.
//!
//! Feeds are reduced to all-day blocks: only the date portion of DTSTART and
//! DTEND is significant and DTEND is exclusive.

mod generate;
mod parse;
mod text;

pub use generate::{FeedEventOut, render_calendar};
pub use parse::{FeedEvent, parse_feed};
pub use text::unescape_text;
