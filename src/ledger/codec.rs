//! Conversion between ledger lines and structured entries.
//!
//! A ledger is made of two kinds of lines:
//!  - date headers, `[2022-10-10]`, which set the day for everything below them;
//!  - entries, `09:00 Title /project/task #tag .12`, where everything after the time may come in
//!    any order when read, but is always written as title, path, tags, id.
//!
//! Decoding never fails. A bad time becomes midnight and a bad header is read as an entry.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::utils::time::{HEADER_FORMAT, TIME_FORMAT};

use super::entities::{Record, TaskIdentity};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    DateHeader(NaiveDate),
    Entry {
        start: NaiveDateTime,
        identity: TaskIdentity,
    },
    /// Nothing left after sanitizing.
    Blank,
}

/// Decodes a raw line. `current_date` is the date of the closest header above the line.
pub fn decode(raw: &str, current_date: NaiveDate) -> Line {
    let line = sanitize(raw);
    if line.is_empty() {
        return Line::Blank;
    }
    if let Some(date) = decode_header(&line) {
        return Line::DateHeader(date);
    }

    let mut words = line.split_whitespace();
    let time = words.next().map(decode_time).unwrap_or(NaiveTime::MIN);

    Line::Entry {
        start: current_date.and_time(time),
        identity: decode_identity(words),
    }
}

/// Decodes the words that follow the time of an entry. Also used for tasks typed on the
/// command line.
pub fn decode_identity<'a>(words: impl IntoIterator<Item = &'a str>) -> TaskIdentity {
    let mut title = Vec::new();
    let mut path = Vec::new();
    let mut tags = Vec::new();
    let mut id = None;

    for word in words {
        if word.len() > 1 && word.starts_with('/') {
            path.extend(word.split('/').filter(|v| !v.is_empty()));
        } else if word.len() > 1 && word.starts_with('#') {
            tags.push(&word[1..]);
        } else if is_id(word) {
            // Only the first id counts, later ones are dropped.
            id = id.or(Some(&word[1..]));
        } else {
            title.push(word);
        }
    }

    TaskIdentity::new(title.join(" "))
        .with_path(path)
        .with_tags(tags)
        .with_id(id.unwrap_or_default())
}

/// Encodes an entry. Empty sections are left out, so there are never doubled or trailing spaces.
pub fn encode(identity: &TaskIdentity, record: &Record) -> String {
    let mut line = record.start.format(TIME_FORMAT).to_string();
    let body = encode_identity(identity);
    if !body.is_empty() {
        line.push(' ');
        line.push_str(&body);
    }
    line
}

/// Encodes the task part of an entry, without the time.
pub fn encode_identity(identity: &TaskIdentity) -> String {
    let mut sections = Vec::with_capacity(4);
    if !identity.title().is_empty() {
        sections.push(identity.title().to_string());
    }
    if !identity.path().is_empty() {
        sections.push(
            identity
                .path()
                .iter()
                .map(|segment| format!("/{segment}"))
                .collect::<String>(),
        );
    }
    if !identity.tags().is_empty() {
        sections.push(
            identity
                .tags()
                .iter()
                .map(|tag| format!("#{tag}"))
                .collect::<Vec<_>>()
                .join(" "),
        );
    }
    if let Some(id) = identity.id() {
        sections.push(format!(".{id}"));
    }
    sections.join(" ")
}

pub fn encode_header(date: NaiveDate) -> String {
    date.format(HEADER_FORMAT).to_string()
}

/// Returns the date if the line is a well formed header.
pub fn decode_header(line: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&sanitize(line), HEADER_FORMAT).ok()
}

fn decode_time(word: &str) -> NaiveTime {
    NaiveTime::parse_from_str(word, TIME_FORMAT).unwrap_or(NaiveTime::MIN)
}

fn is_id(word: &str) -> bool {
    word.strip_prefix('.')
        .is_some_and(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit()))
}

/// Strips control characters (line endings, stray escapes) and surrounding whitespace.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}
