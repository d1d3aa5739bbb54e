//! Turns the flat list of ledger lines into closed intervals.
//!
//! Every entry runs until the next entry starts. The last entry runs until the time the ledger
//! is observed, unless it is a stop, which only closes the interval before it.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::trace;

use super::{
    codec::{decode, decode_header, Line},
    entities::{Activity, Entry, Record, TaskIdentity},
};

/// Result of replaying a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    entries: Vec<Entry>,
    open: bool,
}

impl Timeline {
    /// Entries in ledger order. Stops are not included.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }

    /// Whether the ledger ends on a running task rather than a stop.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The running task, if the ledger doesn't end on a stop.
    pub fn current(&self) -> Option<&Entry> {
        self.entries.last().filter(|_| self.open)
    }

    pub fn activities(&self) -> Vec<Activity> {
        aggregate(&self.entries)
    }
}

/// Replays `lines`, closing the trailing interval at `now`.
pub fn replay<I, S>(lines: I, now: NaiveDateTime) -> Timeline
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut current_date = NaiveDate::MIN;
    let mut entries = Vec::new();
    let mut pending: Option<(TaskIdentity, NaiveDateTime)> = None;

    for line in lines {
        match decode(line.as_ref(), current_date) {
            Line::Blank => {}
            Line::DateHeader(date) => current_date = date,
            Line::Entry { start, identity } => {
                if let Some((previous, previous_start)) = pending.take() {
                    entries.push(Entry::new(previous, Record::closed(previous_start, start)));
                }
                if identity.is_stop() {
                    trace!("Stop at {start}");
                } else {
                    pending = Some((identity, start));
                }
            }
        }
    }

    let open = match pending {
        Some((identity, start)) => {
            entries.push(Entry::new(identity, Record::closed(start, now)));
            true
        }
        None => false,
    };

    Timeline { entries, open }
}

/// Groups entries of the same task, keeping the order tasks and their records were first seen in.
pub fn aggregate(entries: &[Entry]) -> Vec<Activity> {
    let mut groups: Vec<(&TaskIdentity, Vec<Record>)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(identity, _)| **identity == entry.identity) {
            Some((_, records)) => records.push(entry.record),
            None => groups.push((&entry.identity, vec![entry.record])),
        }
    }

    groups
        .into_iter()
        .map(|(identity, records)| Activity::new(identity.clone(), records))
        .collect()
}

/// Latest date header in the ledger, or the minimum date if there is none.
pub fn last_logged_date<I, S>(lines: I) -> NaiveDate
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| decode_header(line.as_ref()))
        .max()
        .unwrap_or(NaiveDate::MIN)
}
