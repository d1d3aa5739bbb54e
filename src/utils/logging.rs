use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";

/// Logs go to a daily rotated file under `application_data_path/logs`. With `show_std` they are
/// mirrored to stderr in a compact form, so stdout only carries command output.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(application_data_path.join("logs"))?;

    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stderr_layer = show_std.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(crate_filter(log_level))
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;
    Ok(())
}

/// Only this crate's events pass. `RUST_LOG` is read as a level when none is given.
fn crate_filter(log_level: Option<LevelFilter>) -> EnvFilter {
    let level = log_level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));

    EnvFilter::new(format!(
        "{}={level}",
        env!("CARGO_PKG_NAME").replace('-', "_"),
    ))
}

/// Installs a test writer subscriber once per test binary.
pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(crate_filter(Some(LevelFilter::TRACE)))
        .with_test_writer()
        .compact()
        .try_init();
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::crate_filter;

    #[test]
    fn test_filter_is_scoped_to_the_crate() {
        assert_eq!(crate_filter(Some(LevelFilter::DEBUG)).to_string(), "clk=debug");
        assert_eq!(crate_filter(Some(LevelFilter::TRACE)).to_string(), "clk=trace");
    }
}
