//! The ledger engine.
//!
//! [Ledger] ties a [LineStore] and a [Clock] together. Every read replays the whole store, so
//! nothing but the date of the last header survives between calls.

pub mod codec;
pub mod entities;
pub mod error;
pub mod present;
pub mod query;
pub mod replay;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info, instrument, warn};

use crate::{storage::line_store::LineStore, utils::clock::Clock};

use self::{
    codec::{encode, encode_header},
    entities::{Activity, Entry, Record, TaskIdentity},
    error::{LedgerError, LedgerResult},
    query::QuerySpec,
    replay::{last_logged_date, replay, Timeline},
};

pub struct Ledger<S, C> {
    store: S,
    clock: C,
    /// Date of the latest header, filled by the first append unless injected.
    last_date: Option<NaiveDate>,
}

impl<S: LineStore, C: Clock> Ledger<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            last_date: None,
        }
    }

    /// Skips the initial scan for the latest header by providing it directly.
    pub fn with_last_date(self, date: NaiveDate) -> Self {
        Self {
            last_date: Some(date),
            ..self
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Replays the whole store.
    pub async fn timeline(&self) -> LedgerResult<Timeline> {
        let lines = self.store.read_lines().await?;
        debug!("Replaying {} lines", lines.len());
        Ok(replay(&lines, self.clock.now()))
    }

    pub async fn query(&self, spec: &QuerySpec) -> LedgerResult<Vec<Entry>> {
        Ok(spec.filter(self.timeline().await?.into_entries()))
    }

    /// Same as [Ledger::query] but grouped by task.
    pub async fn query_activities(&self, spec: &QuerySpec) -> LedgerResult<Vec<Activity>> {
        Ok(replay::aggregate(&self.query(spec).await?))
    }

    /// The latest task, running or not.
    pub async fn last(&self) -> LedgerResult<Option<Entry>> {
        Ok(self
            .timeline()
            .await?
            .into_entries()
            .into_iter()
            .max_by_key(|e| e.record.start))
    }

    /// The running task. None if the ledger is empty or ends on a stop.
    pub async fn current(&self) -> LedgerResult<Option<Entry>> {
        Ok(self.timeline().await?.current().cloned())
    }

    /// Fills in a task referenced only by its id. `.12` resumes whatever task 12 is, while
    /// `Title .12` must match the title task 12 already has.
    pub async fn resolve(&self, identity: TaskIdentity) -> LedgerResult<TaskIdentity> {
        let Some(id) = identity.id() else {
            return Ok(identity);
        };

        let timeline = self.timeline().await?;
        if let Some(conflict) = find_conflict(timeline.entries(), &identity) {
            return Err(LedgerError::IntegrityViolation {
                id: id.to_string(),
                existing_title: conflict.title().to_string(),
            });
        }
        Ok(find_by_id(timeline.entries(), id)
            .cloned()
            .unwrap_or(identity))
    }

    /// Appends an entry, preceded by a header when the day changed since the last one.
    ///
    /// The header uses the clock's date, not the record's. Nothing is written if the id is
    /// already taken by a task with another title. A blank title with a known id is written as
    /// the stored task.
    #[instrument(skip(self), fields(title = identity.title()))]
    pub async fn append(&mut self, identity: &TaskIdentity, record: &Record) -> LedgerResult<()> {
        let lines = self.store.read_lines().await?;
        let now = self.clock.now();

        let mut stored = None;
        if let Some(id) = identity.id() {
            let timeline = replay(&lines, now);
            if let Some(conflict) = find_conflict(timeline.entries(), identity) {
                warn!("Id {id} is taken by {:?}", conflict.title());
                return Err(LedgerError::IntegrityViolation {
                    id: id.to_string(),
                    existing_title: conflict.title().to_string(),
                });
            }
            if identity.title().is_empty() {
                stored = find_by_id(timeline.entries(), id).cloned();
            }
        }
        let identity = stored.as_ref().unwrap_or(identity);

        let last_date = *self
            .last_date
            .get_or_insert_with(|| last_logged_date(&lines));
        let today = now.date();
        if last_date != today {
            let header = encode_header(today);
            self.store.append_line(&header).await?;
            self.last_date = Some(today);
            info!("Started {header}");
        }

        let line = encode(identity, record);
        self.store.append_line(&line).await?;
        info!("Appended {line:?}");
        Ok(())
    }

    /// Closes the running task at `at`.
    pub async fn stop(&mut self, at: NaiveDateTime) -> LedgerResult<Entry> {
        let entry = Entry::new(TaskIdentity::stop(), Record::open(at));
        self.append(&entry.identity, &entry.record).await?;
        Ok(entry)
    }

    /// Starts the latest task again. None if there is nothing to restart.
    pub async fn restart(&mut self) -> LedgerResult<Option<Entry>> {
        let Some(last) = self.last().await? else {
            return Ok(None);
        };
        self.start_again(last.identity).await.map(Some)
    }

    /// Goes back to the task that was worked on before the latest one.
    pub async fn switch(&mut self) -> LedgerResult<Option<Entry>> {
        let mut activities = self.timeline().await?.activities();
        activities.sort_by_key(|a| std::cmp::Reverse(a.latest_start()));
        let Some(previous) = activities.into_iter().nth(1) else {
            return Ok(None);
        };
        let identity = previous.identity().clone();
        self.start_again(identity).await.map(Some)
    }

    async fn start_again(&mut self, identity: TaskIdentity) -> LedgerResult<Entry> {
        let entry = Entry::new(identity, Record::open(self.clock.now()));
        self.append(&entry.identity, &entry.record).await?;
        Ok(entry)
    }
}

/// First task carrying `id`.
fn find_by_id<'a>(entries: &'a [Entry], id: &str) -> Option<&'a TaskIdentity> {
    entries
        .iter()
        .map(|e| &e.identity)
        .find(|e| e.id() == Some(id))
}

/// A task that already owns the id of `identity` under another title. Blank titles never
/// conflict.
fn find_conflict<'a>(entries: &'a [Entry], identity: &TaskIdentity) -> Option<&'a TaskIdentity> {
    let id = identity.id()?;
    if identity.title().is_empty() {
        return None;
    }
    entries
        .iter()
        .map(|e| &e.identity)
        .find(|e| e.id() == Some(id) && e.title() != identity.title())
}

#[cfg(test)]
mod tests {
    use std::io;

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::{
        storage::line_store::{LineStore, MemoryLineStore},
        utils::{
            clock::{FixedClock, MockClock},
            logging::TEST_LOGGING,
        },
    };

    use super::{
        entities::{Record, TaskIdentity},
        error::LedgerError,
        query::QuerySpec,
        Ledger,
    };

    const TODAY: &str = "[2022-10-10]";
    const YESTERDAY: &str = "[2022-10-09]";

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn base_time() -> NaiveDateTime {
        at(10, 11, 12)
    }

    fn ledger(lines: &[&str]) -> Ledger<MemoryLineStore, FixedClock> {
        Ledger::new(
            MemoryLineStore::new(lines.iter().copied()),
            FixedClock(base_time()),
        )
    }

    fn task() -> TaskIdentity {
        TaskIdentity::new("Test").with_tags(["feature"]).with_id("123")
    }

    struct FailingStore;

    impl LineStore for FailingStore {
        async fn read_lines(&self) -> io::Result<Vec<String>> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }

        async fn append_line(&mut self, _line: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[tokio::test]
    async fn test_append_adds_header_when_needed() -> anyhow::Result<()> {
        *TEST_LOGGING;
        for (existing, adds_header) in [
            (vec![], true),
            (vec![YESTERDAY], true),
            (vec![TODAY], false),
            (vec!["[InvalidDate]"], true),
            (vec![TODAY, YESTERDAY], false),
        ] {
            let mut ledger = ledger(&existing);
            ledger.append(&task(), &Record::open(base_time())).await?;

            let mut expected = existing.clone();
            if adds_header {
                expected.push(TODAY);
            }
            expected.push("11:12 Test #feature .123");
            assert_eq!(ledger.store().lines(), expected, "{existing:?}");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_header_written_once_per_session() -> anyhow::Result<()> {
        let mut ledger = ledger(&[YESTERDAY, "09:00 Old"]);
        ledger.append(&TaskIdentity::new("A"), &Record::open(at(10, 9, 0))).await?;
        ledger.append(&TaskIdentity::new("B"), &Record::open(at(10, 10, 0))).await?;

        assert_eq!(
            ledger.store().lines(),
            [YESTERDAY, "09:00 Old", TODAY, "09:00 A", "10:00 B"]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_injected_last_date_skips_scan() -> anyhow::Result<()> {
        let mut ledger = ledger(&[YESTERDAY]).with_last_date(at(10, 0, 0).date());
        ledger.append(&TaskIdentity::new("A"), &Record::open(base_time())).await?;

        assert_eq!(ledger.store().lines(), [YESTERDAY, "11:12 A"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_header_follows_the_clock_not_the_record() -> anyhow::Result<()> {
        let mut ledger = ledger(&[YESTERDAY]);
        ledger
            .append(&TaskIdentity::new("Late"), &Record::open(at(9, 23, 30)))
            .await?;

        assert_eq!(ledger.store().lines(), [YESTERDAY, TODAY, "23:30 Late"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_id_with_other_title_is_rejected() -> anyhow::Result<()> {
        let mut ledger = ledger(&[YESTERDAY, "09:00 Activity1 .123"]);
        let result = ledger
            .append(
                &TaskIdentity::new("Activity2").with_id("123"),
                &Record::open(base_time()),
            )
            .await;

        match result {
            Err(LedgerError::IntegrityViolation { id, existing_title }) => {
                assert_eq!(id, "123");
                assert_eq!(existing_title, "Activity1");
            }
            other => panic!("Expected integrity violation, got {other:?}"),
        }
        assert_eq!(ledger.store().lines(), [YESTERDAY, "09:00 Activity1 .123"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_id_with_same_title_is_accepted() -> anyhow::Result<()> {
        let mut ledger = ledger(&[TODAY, "09:00 Activity1 .123"]);
        ledger
            .append(
                &TaskIdentity::new("Activity1").with_id("123"),
                &Record::open(base_time()),
            )
            .await?;
        ledger
            .append(
                &TaskIdentity::new("Activity1").with_id("123"),
                &Record::open(base_time()),
            )
            .await?;
        ledger
            .append(&TaskIdentity::new("").with_id("123"), &Record::open(base_time()))
            .await?;

        assert_eq!(ledger.store().lines().len(), 5);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_title_is_written_as_the_stored_task() -> anyhow::Result<()> {
        let mut ledger = ledger(&[TODAY, "09:00 Activity1 #work .123"]);
        ledger
            .append(&TaskIdentity::new("").with_id("123"), &Record::open(at(10, 10, 0)))
            .await?;
        ledger
            .append(
                &TaskIdentity::new("Activity1").with_id("123"),
                &Record::open(at(10, 11, 0)),
            )
            .await?;

        assert_eq!(
            ledger.store().lines(),
            [
                TODAY,
                "09:00 Activity1 #work .123",
                "10:00 Activity1 #work .123",
                "11:00 Activity1 .123"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_stop_ids_are_not_checked() -> anyhow::Result<()> {
        let mut ledger = ledger(&[TODAY, "09:00 [Stop] .5"]);
        ledger
            .append(&TaskIdentity::new("Task").with_id("5"), &Record::open(base_time()))
            .await?;
        assert_eq!(ledger.store().lines().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_storage_failure_is_reported() {
        let mut ledger = Ledger::new(FailingStore, FixedClock(base_time()));

        let result = ledger.append(&task(), &Record::open(base_time())).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));

        let result = ledger.query(&QuerySpec::all()).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
    }

    #[tokio::test]
    async fn test_appended_entries_replay() -> anyhow::Result<()> {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(at(10, 12, 5));
        let mut ledger = Ledger::new(MemoryLineStore::default(), clock);

        let first = TaskIdentity::new("Activity1").with_id("001");
        let second = TaskIdentity::new("Activity2").with_id("002");
        ledger.append(&first, &Record::open(at(10, 9, 0))).await?;
        ledger.append(&second, &Record::open(at(10, 10, 0))).await?;
        ledger.append(&first, &Record::open(at(10, 11, 0))).await?;
        ledger.stop(at(10, 12, 0)).await?;

        let activities = ledger.query_activities(&QuerySpec::all()).await?;
        assert_eq!(activities.len(), 2);
        assert_eq!(activities[0].identity(), &first);
        assert_eq!(activities[0].records().len(), 2);
        assert_eq!(
            activities[1].records(),
            [Record::closed(at(10, 10, 0), at(10, 11, 0))]
        );
        assert!(ledger.current().await?.is_none());
        assert_eq!(ledger.last().await?.unwrap().identity, first);
        Ok(())
    }

    #[tokio::test]
    async fn test_current_and_last() -> anyhow::Result<()> {
        let running = ledger(&[TODAY, "09:00 A", "10:00 B"]);
        assert_eq!(running.current().await?.unwrap().identity.title(), "B");
        assert_eq!(running.last().await?.unwrap().identity.title(), "B");

        let stopped = ledger(&[TODAY, "09:00 A", "10:00 [Stop]"]);
        assert!(stopped.current().await?.is_none());
        assert_eq!(stopped.last().await?.unwrap().identity.title(), "A");

        assert!(ledger(&[]).last().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve() -> anyhow::Result<()> {
        let ledger = ledger(&[TODAY, "09:00 Review /clk #code .12"]);
        let stored = TaskIdentity::new("Review")
            .with_path(["clk"])
            .with_tags(["code"])
            .with_id("12");

        assert_eq!(ledger.resolve(TaskIdentity::new("").with_id("12")).await?, stored);
        assert_eq!(ledger.resolve(TaskIdentity::new("Review").with_id("12")).await?, stored);
        assert_eq!(
            ledger.resolve(TaskIdentity::new("New").with_id("13")).await?,
            TaskIdentity::new("New").with_id("13")
        );
        assert_eq!(
            ledger.resolve(TaskIdentity::new("Plain")).await?,
            TaskIdentity::new("Plain")
        );
        assert!(matches!(
            ledger.resolve(TaskIdentity::new("Other").with_id("12")).await,
            Err(LedgerError::IntegrityViolation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_stop() -> anyhow::Result<()> {
        let mut ledger = ledger(&[TODAY, "09:00 A"]);
        let entry = ledger.stop(at(10, 9, 30)).await?;

        assert!(entry.identity.is_stop());
        assert_eq!(ledger.store().lines(), [TODAY, "09:00 A", "09:30 [Stop]"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_restart() -> anyhow::Result<()> {
        let mut stopped = ledger(&[TODAY, "09:00 A #x", "10:00 [Stop]"]);
        let entry = stopped.restart().await?.unwrap();

        assert_eq!(entry.identity.title(), "A");
        assert_eq!(stopped.store().lines().last().unwrap(), "11:12 A #x");

        let mut empty = ledger(&[]);
        assert!(empty.restart().await?.is_none());
        assert!(empty.store().lines().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_switch() -> anyhow::Result<()> {
        let mut busy = ledger(&[TODAY, "08:00 A", "09:00 B", "10:00 A", "10:30 C"]);
        let entry = busy.switch().await?.unwrap();

        assert_eq!(entry.identity.title(), "A");
        assert_eq!(busy.store().lines().last().unwrap(), "11:12 A");

        let mut single = ledger(&[TODAY, "08:00 A"]);
        assert!(single.switch().await?.is_none());
        Ok(())
    }
}
