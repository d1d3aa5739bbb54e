//! Structured output of the ledger. The core describes what a piece of text *is*, presenters
//! decide what that looks like.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::utils::time::{format_duration, TIME_FORMAT};

use super::entities::{Activity, Entry, TaskIdentity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Semantic {
    Plain,
    Time,
    Duration,
    Title,
    Stop,
    Path,
    Tag,
    Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    pub semantic: Semantic,
}

impl Chunk {
    pub fn new(text: impl Into<String>, semantic: Semantic) -> Self {
        Self {
            text: text.into(),
            semantic,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Semantic::Plain)
    }
}

/// Concatenates the text of `chunks`, dropping semantics.
pub fn plain_text(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect()
}

impl TaskIdentity {
    /// `Title /path #tag .id`, the same layout the ledger uses.
    pub fn chunks(&self) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut push = |text: String, semantic| {
            let text = if chunks.is_empty() {
                text
            } else {
                format!(" {text}")
            };
            chunks.push(Chunk::new(text, semantic));
        };

        if !self.title().is_empty() {
            let semantic = if self.is_stop() {
                Semantic::Stop
            } else {
                Semantic::Title
            };
            push(self.title().to_string(), semantic);
        }
        if !self.path().is_empty() {
            push(
                self.path().iter().map(|s| format!("/{s}")).collect(),
                Semantic::Path,
            );
        }
        for tag in self.tags() {
            push(format!("#{tag}"), Semantic::Tag);
        }
        if let Some(id) = self.id() {
            push(format!(".{id}"), Semantic::Id);
        }
        chunks
    }
}

impl Entry {
    /// `09:00-10:30 01:30 Title /path #tag .id`
    pub fn chunks(&self, now: NaiveDateTime) -> Vec<Chunk> {
        let mut chunks = vec![Chunk::new(
            self.record.start.format(TIME_FORMAT).to_string(),
            Semantic::Time,
        )];
        if let Some(end) = self.record.end {
            chunks.push(Chunk::new(
                format!("-{}", end.format(TIME_FORMAT)),
                Semantic::Time,
            ));
        }
        chunks.push(Chunk::new(
            format!(" {}", format_duration(self.record.duration(now))),
            Semantic::Duration,
        ));
        append_identity(&mut chunks, &self.identity);
        chunks
    }

    /// `09:00 Title /path #tag .id`, the way the entry is written to the ledger.
    pub fn logged_chunks(&self) -> Vec<Chunk> {
        let mut chunks = vec![Chunk::new(
            self.record.start.format(TIME_FORMAT).to_string(),
            Semantic::Time,
        )];
        append_identity(&mut chunks, &self.identity);
        chunks
    }
}

impl Activity {
    /// `03:15 Title /path #tag .id`
    pub fn chunks(&self, now: NaiveDateTime) -> Vec<Chunk> {
        let mut chunks = vec![Chunk::new(
            format_duration(self.duration(now)),
            Semantic::Duration,
        )];
        append_identity(&mut chunks, self.identity());
        chunks
    }
}

fn append_identity(chunks: &mut Vec<Chunk>, identity: &TaskIdentity) {
    let identity = identity.chunks();
    if !identity.is_empty() {
        chunks.push(Chunk::plain(" "));
        chunks.extend(identity);
    }
}
