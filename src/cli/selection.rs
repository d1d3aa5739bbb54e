use std::fmt::Display;

use anyhow::Result;
use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use chrono_english::parse_date_string;
use clap::{CommandFactory, ValueEnum};

use crate::ledger::query::QuerySpec;

use super::Args;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Which entries a report looks at. Defaults to today.
#[derive(Debug, Clone, clap::Args)]
pub struct SelectionArgs {
    #[arg(long, conflicts_with_all = ["week", "yesterday"], help = "Every day in the ledger")]
    all: bool,
    #[arg(long, conflicts_with = "yesterday", help = "Monday to friday of the current week")]
    week: bool,
    #[arg(long, help = "The day before today")]
    yesterday: bool,
    #[arg(
        long,
        help = "Start of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
    )]
    from: Option<String>,
    #[arg(
        long,
        help = "End of the range. Examples are \"yesterday\", \"3 days ago\", \"15/03/2025\""
    )]
    to: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Date order used when parsing. Uk is day/month/year, Us is month/day/year"
    )]
    date_style: DateStyle,
    #[arg(long, value_delimiter = ',', help = "Comma separated tags the task must have")]
    tags: Vec<String>,
    #[arg(long, help = "Leading path segments, for example project/task")]
    path: Option<String>,
    #[arg(long, help = "Id of the task")]
    id: Option<String>,
    #[arg(long, help = "Only the latest N entries")]
    last: Option<usize>,
}

impl SelectionArgs {
    /// Builds the query. Selecting by id or by count looks at every day unless a range is given.
    pub fn to_query(&self, now: NaiveDateTime) -> Result<QuerySpec> {
        let today = now.date();
        let ranged = self.from.is_some() || self.to.is_some();

        let mut spec = if ranged {
            QuerySpec {
                from: self.parse_day(self.from.as_deref(), now)?,
                to: self.parse_day(self.to.as_deref(), now)?,
                ..QuerySpec::default()
            }
        } else if self.week {
            QuerySpec::week(today)
        } else if self.yesterday {
            QuerySpec::yesterday(today)
        } else if self.all || self.id.is_some() || self.last.is_some() {
            QuerySpec::all()
        } else {
            QuerySpec::today(today)
        };

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim().trim_start_matches('#'))
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>();
        if !tags.is_empty() {
            spec = spec.with_tags(tags);
        }
        if let Some(path) = &self.path {
            spec = spec.with_path(path.split('/').filter(|s| !s.is_empty()));
        }
        if let Some(id) = &self.id {
            spec = spec.with_id(id.trim_start_matches('.'));
        }
        if let Some(last) = self.last {
            spec = spec.with_last(last);
        }
        Ok(spec)
    }

    fn parse_day(&self, value: Option<&str>, now: NaiveDateTime) -> Result<Option<NaiveDate>> {
        let Some(value) = value else {
            return Ok(None);
        };
        let now = Local
            .from_local_datetime(&now)
            .earliest()
            .unwrap_or_else(Local::now);
        match parse_date_string(value, now, self.date_style.into()) {
            Ok(v) => Ok(Some(v.date_naive())),
            Err(e) => Err(Args::command()
                .error(
                    clap::error::ErrorKind::ValueValidation,
                    format!("Failed to validate date {value:?}: {e}"),
                )
                .into()),
        }
    }
}
