use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::models::Message;

/// `M/D/YY, H:MM AM -` at the start of a line. Exports place a narrow
/// no-break space before the meridiem, which `\s` covers.
static TIMESTAMP_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d{1,2})/(\d{1,2})/(\d{2}),\s(\d{1,2}):(\d{2})\s?([AaPp][Mm])\s-").unwrap()
});

/// Split a raw transcript into timestamped messages.
///
/// Each message spans from its own timestamp prefix to the next prefix (or end
/// of input). Prefixes that do not form a valid date are not boundaries, and
/// messages with nothing after the prefix are dropped.
pub fn segment_transcript(text: &str) -> Vec<Message> {
    let anchors: Vec<(usize, NaiveDateTime)> = TIMESTAMP_PREFIX
        .captures_iter(text)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            match parse_prefix(&caps) {
                Some(ts) => Some((start, ts)),
                None => {
                    warn!("Ignoring invalid timestamp prefix {:?}", &caps[0]);
                    None
                }
            }
        })
        .collect();

    let mut messages = Vec::with_capacity(anchors.len());

    for (i, &(start, timestamp)) in anchors.iter().enumerate() {
        let end = anchors.get(i + 1).map(|&(next, _)| next).unwrap_or(text.len());
        let raw_text = text[start..end].trim_end();

        let message = Message::new(timestamp, raw_text);
        if message.body().trim().is_empty() {
            debug!("Dropping empty message at {}", timestamp);
            continue;
        }
        messages.push(message);
    }

    messages
}

/// Parse a single `M/D/YY, H:MM AM` timestamp
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let prefixed = format!("{} -", text.trim());
    TIMESTAMP_PREFIX
        .captures(&prefixed)
        .and_then(|caps| parse_prefix(&caps))
}

fn parse_prefix(caps: &Captures<'_>) -> Option<NaiveDateTime> {
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = 2000 + caps[3].parse::<i32>().ok()?;
    let hour12: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;
    let is_pm = caps[6].eq_ignore_ascii_case("pm");

    if !(1..=12).contains(&hour12) {
        return None;
    }
    let hour = match (hour12, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)
}
