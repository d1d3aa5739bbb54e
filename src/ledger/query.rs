use chrono::{Duration, NaiveDate};

use crate::utils::time::start_of_week;

use super::entities::{Entry, TaskIdentity};

/// Selection over replayed entries. Every unset field matches everything.
///
/// Stages are applied in the order the fields are declared; `last` is applied after all the
/// other filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySpec {
    /// Inclusive lower bound on the start date.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound on the start date.
    pub to: Option<NaiveDate>,
    /// Leading path segments the task must have.
    pub path: Option<Vec<String>>,
    /// Tags the task must have. Extra tags on the task are fine.
    pub tags: Option<Vec<String>>,
    pub id: Option<String>,
    /// Keep only the latest `n` entries.
    pub last: Option<usize>,
}

impl QuerySpec {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn today(today: NaiveDate) -> Self {
        Self::between(today, today)
    }

    pub fn yesterday(today: NaiveDate) -> Self {
        let yesterday = today - Duration::days(1);
        Self::between(yesterday, yesterday)
    }

    /// Working days of the week `today` is in, monday to friday.
    pub fn week(today: NaiveDate) -> Self {
        let monday = start_of_week(today);
        Self::between(monday, monday + Duration::days(4))
    }

    pub fn with_path<I, S>(self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: Some(path.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..self
        }
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..self
        }
    }

    pub fn with_last(self, last: usize) -> Self {
        Self {
            last: Some(last),
            ..self
        }
    }

    /// Whether `entry` passes every stage but `last`, which depends on the other entries.
    pub fn matches(&self, entry: &Entry) -> bool {
        let date = entry.record.start.date();
        self.from.is_none_or(|from| from <= date)
            && self.to.is_none_or(|to| date <= to)
            && self
                .path
                .as_ref()
                .is_none_or(|prefix| has_path_prefix(&entry.identity, prefix))
            && self
                .tags
                .as_ref()
                .is_none_or(|tags| tags.iter().all(|tag| entry.identity.has_tag(tag)))
            && self
                .id
                .as_ref()
                .is_none_or(|id| entry.identity.id() == Some(id.as_str()))
    }

    /// Runs the query.
    pub fn filter(&self, entries: impl IntoIterator<Item = Entry>) -> Vec<Entry> {
        let mut result = entries
            .into_iter()
            .filter(|entry| self.matches(entry))
            .collect::<Vec<_>>();

        if let Some(last) = self.last {
            result.sort_by_key(|entry| entry.record.start);
            let skip = result.len().saturating_sub(last);
            result.drain(..skip);
        }
        result
    }
}

/// A prefix longer than the task's path never matches.
fn has_path_prefix(identity: &TaskIdentity, prefix: &[String]) -> bool {
    prefix.len() <= identity.path().len()
        && prefix
            .iter()
            .zip(identity.path())
            .all(|(expected, actual)| expected == actual)
}
