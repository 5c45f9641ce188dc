//! ICS encoding, envelope stripping and merging of calendars.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

use crate::error::{CalendarError, Result};
use crate::types::EventRecord;

pub const VENDOR_PREFIX: &str = "X-LIQUIPEDIATOICAL-";
pub const PRODUCT_ID: &str = "-//liquipedia-calendar//NONSGML v1.0//EN";
pub const EVENT_DURATION: &str = "PT40M";

const BEGIN_CALENDAR: &str = "BEGIN:VCALENDAR";
const END_CALENDAR: &str = "END:VCALENDAR";
const BEGIN_EVENT: &str = "BEGIN:VEVENT";
const END_EVENT: &str = "END:VEVENT";
const ENVELOPE_FIELDS: [&str; 3] = ["VERSION:2.0", "CALSCALE:GREGORIAN", "METHOD:PUBLISH"];

pub type Accessor = fn(&EventRecord) -> Option<&str>;

/// Optional per-event fields, emitted as `X-LIQUIPEDIATOICAL-<NAME>` only when non-empty.
pub static VENDOR_FIELDS: &[(&str, Accessor)] = &[
    ("COMPETITION", |r| Some(r.competition.as_str())),
    ("COMPETITIONURL", |r| r.competition_url.as_deref()),
    ("TEAMLEFT", |r| r.left.name.as_deref()),
    ("TEAMLEFTFULLNAME", |r| r.left.full_name.as_deref()),
    ("TEAMLEFTURL", |r| r.left.url.as_deref()),
    ("TEAMLEFTLOGO", |r| r.left.logo.as_deref()),
    ("TEAMRIGHT", |r| r.right.name.as_deref()),
    ("TEAMRIGHTFULLNAME", |r| r.right.full_name.as_deref()),
    ("TEAMRIGHTURL", |r| r.right.url.as_deref()),
    ("TEAMRIGHTLOGO", |r| r.right.logo.as_deref()),
    ("WINNERSIDE", |r| Some(r.winner_side.as_str())),
    ("DESCRIPTOR", |r| r.descriptor.as_deref()),
    ("DESCRIPTORMOREINFO", |r| r.descriptor_more_info.as_deref()),
];

/// One `VEVENT` block as it appears in an encoded calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBlock {
    pub uid: String,
    pub text: String,
}

/// `YYYYMMDDTHHMMSSZ` in UTC.
pub fn ics_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .unwrap_or_default()
        .format("%Y%m%dT%H%M%SZ")
        .to_string()
}

pub fn encode_event(record: &EventRecord) -> String {
    let start = ics_timestamp(record.start_timestamp);
    let mut lines = vec![
        BEGIN_EVENT.to_string(),
        format!("UID:{}", record.uid),
        format!("LOCATION:{}", record.competition),
        format!("DTSTAMP:{}", start),
        format!("DTSTART:{}", start),
        format!("DURATION:{}", EVENT_DURATION),
        format!("DESCRIPTION:{}", record.description.replace('\n', "\\n")),
        format!("SUMMARY:{}", record.summary),
    ];
    lines.extend(VENDOR_FIELDS.iter().filter_map(|(name, accessor)| {
        accessor(record)
            .filter(|value| !value.is_empty())
            .map(|value| format!("{}{}:{}", VENDOR_PREFIX, name, value))
    }));
    lines.push(END_EVENT.to_string());
    lines.join("\n")
}

pub fn encode(records: &[EventRecord]) -> String {
    let body = records
        .iter()
        .map(encode_event)
        .collect::<Vec<_>>()
        .join("\n\n");
    wrap(&body)
}

/// Puts the calendar envelope around an already encoded body.
pub fn wrap(body: &str) -> String {
    let product = format!("PRODID:{}", PRODUCT_ID);
    let mut lines = vec![BEGIN_CALENDAR, ENVELOPE_FIELDS[0], product.as_str(), ENVELOPE_FIELDS[1], ENVELOPE_FIELDS[2]];
    lines.push(body);
    lines.push(END_CALENDAR);
    lines.join("\n")
}

fn is_envelope_line(line: &str) -> bool {
    line == BEGIN_CALENDAR
        || line == END_CALENDAR
        || line.starts_with("PRODID:")
        || ENVELOPE_FIELDS.contains(&line)
}

/// Removes the envelope lines, leaving only event blocks.
pub fn strip(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !is_envelope_line(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Splits a calendar into its event blocks.
pub fn decode(text: &str) -> Result<Vec<EventBlock>> {
    let body = strip(text);
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for (number, line) in body.lines().enumerate() {
        let line_number = number + 1;
        match current.take() {
            None if line == BEGIN_EVENT => current = Some(vec![line]),
            None if line.trim().is_empty() => {}
            None => {
                return Err(CalendarError::Codec(format!(
                    "unexpected line outside of an event at body line {}: '{}'",
                    line_number, line
                )))
            }
            Some(_) if line == BEGIN_EVENT => {
                return Err(CalendarError::Codec(format!(
                    "nested {} at body line {}",
                    BEGIN_EVENT, line_number
                )))
            }
            Some(mut lines) if line == END_EVENT => {
                lines.push(line);
                let uid = lines
                    .iter()
                    .find_map(|l| l.strip_prefix("UID:"))
                    .map(|uid| uid.trim().to_string())
                    .ok_or_else(|| {
                        CalendarError::Codec(format!("event ending at body line {} has no UID", line_number))
                    })?;
                blocks.push(EventBlock {
                    uid,
                    text: lines.join("\n"),
                });
            }
            Some(mut lines) => {
                lines.push(line);
                current = Some(lines);
            }
        }
    }

    if current.is_some() {
        return Err(CalendarError::Codec(format!("unterminated {}", BEGIN_EVENT)));
    }
    Ok(blocks)
}

/// Concatenates both calendars and drops every block whose uid already appeared.
pub fn merge(first: &str, second: &str) -> Result<String> {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    for block in decode(first)?.into_iter().chain(decode(second)?) {
        if seen.insert(block.uid.clone()) {
            kept.push(block.text);
        } else {
            debug!(uid = %block.uid, "Ignoring duplicate event");
        }
    }
    Ok(wrap(&kept.join("\n\n")))
}
