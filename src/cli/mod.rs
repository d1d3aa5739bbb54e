pub mod presenter;
pub mod selection;

use std::{path::PathBuf, process::Command};

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use clap::{CommandFactory, Parser, Subcommand};
use presenter::{ConsolePresenter, Presenter};
use selection::SelectionArgs;
use tracing::{info, level_filters::LevelFilter, warn};

use crate::{
    ledger::{
        codec::decode_identity,
        entities::{Entry, Record},
        error::LedgerError,
        present::{Chunk, Semantic},
        query::QuerySpec,
        Ledger,
    },
    settings::Settings,
    storage::line_store::{FileLineStore, LineStore},
    utils::{
        clock::{Clock, DefaultClock, FixedClock},
        dir::create_application_default_path,
        logging::{enable_logging, CLI_PREFIX},
        time::{format_duration, TIME_FORMAT},
    },
};

#[derive(Parser, Debug)]
#[command(name = "clk", version, long_about = None)]
#[command(about = "Keeps an append-only ledger of what you work on", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(long, global = true, help = "Settings file. By default ~/.clk/settings.toml is used")]
    settings: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start working on a task. Words may contain a /path, #tags and an .id")]
    Add {
        words: Vec<String>,
        #[arg(long, help = "Start time as HH:mm. Defaults to now")]
        at: Option<String>,
    },
    #[command(about = "Stop the running task")]
    Stop {
        #[arg(long, help = "Stop time as HH:mm. Defaults to now")]
        at: Option<String>,
    },
    #[command(about = "Start the latest task again")]
    Restart,
    #[command(about = "Go back to the task worked on before the latest one")]
    Switch,
    #[command(about = "Print the running task")]
    Current,
    #[command(about = "List every distinct task in the ledger")]
    List,
    #[command(about = "Open the ledger with the configured editor")]
    Open,
    #[command(about = "Show logged entries")]
    Show {
        #[command(flatten)]
        selection: SelectionArgs,
        #[arg(long, help = "One row per task instead of one per entry")]
        activities: bool,
        #[arg(long, help = "Print json instead of text")]
        json: bool,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    let settings = Settings::load(args.settings.as_deref());
    info!("Using ledger {:?}", settings.file);

    // One observation time for the whole invocation.
    let clock = FixedClock(DefaultClock.now());
    let mut ledger = Ledger::new(FileLineStore::new(settings.file.clone()), clock);
    let mut presenter = ConsolePresenter::stdout();

    match execute(args.commands, &mut ledger, &settings, &mut presenter).await {
        Ok(()) => Ok(()),
        Err(e) => match e.downcast::<LedgerError>() {
            Ok(ledger_error) => {
                warn!("Command failed {ledger_error:?}");
                presenter.error(&ledger_error.to_string())?;
                Ok(())
            }
            Err(e) => Err(e),
        },
    }
}

async fn execute<S: LineStore, C: Clock>(
    command: Commands,
    ledger: &mut Ledger<S, C>,
    settings: &Settings,
    presenter: &mut impl Presenter,
) -> Result<()> {
    let now = ledger.now();
    match command {
        Commands::Add { words, at } => {
            let identity = if words.is_empty() {
                decode_identity(settings.default_task.split_whitespace())
            } else {
                decode_identity(words.iter().flat_map(|w| w.split_whitespace()))
            };
            let identity = ledger.resolve(identity).await?;
            let record = Record::open(parse_at(at.as_deref(), now)?);
            ledger.append(&identity, &record).await?;
            presenter.line(&Entry::new(identity, record).logged_chunks())?;
        }
        Commands::Stop { at } => {
            let entry = ledger.stop(parse_at(at.as_deref(), now)?).await?;
            presenter.line(&entry.logged_chunks())?;
        }
        Commands::Restart => match ledger.restart().await? {
            Some(entry) => presenter.line(&entry.logged_chunks())?,
            None => presenter.error("No activities to restart")?,
        },
        Commands::Switch => match ledger.switch().await? {
            Some(entry) => presenter.line(&entry.logged_chunks())?,
            None => presenter.error("No activities to switch to")?,
        },
        Commands::Current => match ledger.current().await? {
            Some(entry) => presenter.line(&entry.identity.chunks())?,
            None => presenter.line(&[Chunk::plain("None")])?,
        },
        Commands::List => {
            for activity in ledger.query_activities(&QuerySpec::all()).await? {
                presenter.line(&activity.identity().chunks())?;
            }
        }
        Commands::Open => open_editor(settings)?,
        Commands::Show {
            selection,
            activities,
            json,
        } => {
            let spec = selection.to_query(now)?;
            if activities {
                let activities = ledger.query_activities(&spec).await?;
                if json {
                    presenter.raw(&serde_json::to_string_pretty(&activities)?)?;
                } else {
                    for activity in &activities {
                        presenter.line(&activity.chunks(now))?;
                    }
                    let total = activities
                        .iter()
                        .fold(Duration::zero(), |acc, a| acc + a.duration(now));
                    print_total(presenter, total)?;
                }
            } else {
                let entries = ledger.query(&spec).await?;
                if json {
                    presenter.raw(&serde_json::to_string_pretty(&entries)?)?;
                } else {
                    for entry in &entries {
                        presenter.line(&entry.chunks(now))?;
                    }
                    let total = entries
                        .iter()
                        .fold(Duration::zero(), |acc, e| acc + e.record.duration(now));
                    print_total(presenter, total)?;
                }
            }
        }
    }
    Ok(())
}

fn print_total(presenter: &mut impl Presenter, total: Duration) -> Result<()> {
    presenter.line(&[
        Chunk::plain("Total "),
        Chunk::new(format_duration(total), Semantic::Duration),
    ])?;
    Ok(())
}

/// `--at HH:mm` on the current day, or now.
fn parse_at(at: Option<&str>, now: NaiveDateTime) -> Result<NaiveDateTime> {
    let Some(at) = at else {
        return Ok(now);
    };
    match NaiveTime::parse_from_str(at.trim(), TIME_FORMAT) {
        Ok(time) => Ok(now.date().and_time(time)),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate time {at:?}, expected HH:mm: {e}"),
            )
            .into()),
    }
}

fn open_editor(settings: &Settings) -> Result<()> {
    let status = Command::new(&settings.editor_command)
        .arg(&settings.file)
        .status()
        .with_context(|| format!("Failed to run {:?}", settings.editor_command))?;
    if !status.success() {
        warn!("{} exited with {status}", settings.editor_command);
    }
    Ok(())
}
