use std::io::Write;

use chrono::{SecondsFormat, Utc};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

const LEVEL_ENV: &str = "KMEANS_LOG";

struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record);
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn format_line(record: &Record) -> String {
    format!(
        "{} {:<5} {}: {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        record.level(),
        record.target(),
        record.args()
    )
}

fn level_from(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Installs the process-wide logger. The level comes from `KMEANS_LOG`
/// (`error`, `warn`, `info`, `debug`, `trace`, `off`) and defaults to `info`.
pub fn init_logger() -> Result<(), SetLoggerError> {
    let level = level_from(std::env::var(LEVEL_ENV).ok().as_deref());
    log::set_boxed_logger(Box::new(StderrLogger { level }))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing() {
        assert_eq!(level_from(None), LevelFilter::Info);
        assert_eq!(level_from(Some("debug")), LevelFilter::Debug);
        assert_eq!(level_from(Some(" WARN ")), LevelFilter::Warn);
        assert_eq!(level_from(Some("chatty")), LevelFilter::Info);
    }

    #[test]
    fn test_line_layout() {
        let line = format_line(
            &Record::builder()
                .args(format_args!("Converged after {} rounds", 3))
                .level(log::Level::Info)
                .target("kmeans_lloyd::algorithm")
                .build(),
        );
        assert!(line.ends_with("INFO  kmeans_lloyd::algorithm: Converged after 3 rounds"));
        assert!(line.contains('T'));
    }
}
