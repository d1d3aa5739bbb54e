use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

/// Title reserved for the entry that closes the running interval without starting a new task.
pub const STOP_TITLE: &str = "[Stop]";

/// Identifies a distinct task in the ledger.
///
/// Two identities are the same task when title, id, path and the tag *set* agree. Tag order is
/// kept only so that a task is written back the way it was typed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskIdentity {
    title: String,
    path: Vec<String>,
    tags: Vec<String>,
    id: Option<String>,
}

impl TaskIdentity {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into().trim().to_string(),
            ..Self::default()
        }
    }

    /// The sentinel identity written by `stop`.
    pub fn stop() -> Self {
        Self::new(STOP_TITLE)
    }

    pub fn with_path<I, S>(self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    /// Empty ids are treated as no id at all.
    pub fn with_id(self, id: impl Into<String>) -> Self {
        let id: String = id.into();
        Self {
            id: (!id.is_empty()).then_some(id),
            ..self
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_stop(&self) -> bool {
        self.title == STOP_TITLE
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|v| v == tag)
    }
}

impl PartialEq for TaskIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.id == other.id
            && self.path == other.path
            && self.tags.iter().all(|t| other.has_tag(t))
            && other.tags.iter().all(|t| self.has_tag(t))
    }
}

impl Eq for TaskIdentity {}

/// One interval of work. A record that was just created for appending has no end yet; records
/// coming out of replay are always closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Record {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl Record {
    pub fn open(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    pub fn closed(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    /// Length of the interval, measuring an open record up to `now`.
    pub fn duration(&self, now: NaiveDateTime) -> Duration {
        self.end.unwrap_or(now) - self.start
    }
}

/// A single line of the ledger after replay: what was worked on and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub identity: TaskIdentity,
    pub record: Record,
}

impl Entry {
    pub fn new(identity: TaskIdentity, record: Record) -> Self {
        Self { identity, record }
    }
}

/// All records of one task. Built from scratch by [aggregate](super::replay::aggregate) on every
/// read, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    identity: TaskIdentity,
    records: Vec<Record>,
}

impl Activity {
    pub fn new(identity: TaskIdentity, records: Vec<Record>) -> Self {
        Self { identity, records }
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn duration(&self, now: NaiveDateTime) -> Duration {
        self.records
            .iter()
            .fold(Duration::zero(), |sum, record| sum + record.duration(now))
    }

    /// Start of the most recent record.
    pub fn latest_start(&self) -> Option<NaiveDateTime> {
        self.records.iter().map(|r| r.start).max()
    }
}
