use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "./logs/vision-labeler.log";

/// Stdout plus a non-blocking file log.
///
/// `TRACING_LEVEL` sets the filter, `LOG_FILE_PATH` the file and `LOG_ROTATION`
/// (`never`, `daily`, `hourly`, `minutely`) how often it rolls. When the log
/// directory cannot be created only stdout is used and no guard is returned.
pub fn init_logger() -> Option<WorkerGuard> {
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter_layer = EnvFilter::new(filter);

    let log_file_path = env::var("LOG_FILE_PATH").unwrap_or_else(|_| DEFAULT_LOG_FILE.to_string());
    let rotation = env::var("LOG_ROTATION").ok();
    let (dir, file_name) = split_log_path(Path::new(&log_file_path));

    let file_writer = match fs::create_dir_all(&dir) {
        Ok(()) => {
            let appender =
                RollingFileAppender::new(parse_rotation(rotation.as_deref()), &dir, &file_name);
            Some(tracing_appender::non_blocking(appender))
        }
        Err(e) => {
            eprintln!("Cannot create log directory {}: {}", dir.display(), e);
            None
        }
    };
    let (file_layer, guard) = match file_writer {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_ansi(true),
        )
        .with(file_layer)
        .with(filter_layer)
        .init();

    if guard.is_some() {
        info!("Logging to stdout and {}", dir.join(&file_name).display());
    } else {
        warn!("File logging disabled, logging to stdout only");
    }

    guard
}

fn split_log_path(path: &Path) -> (PathBuf, String) {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "vision-labeler.log".to_string());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    (dir, file_name)
}

fn parse_rotation(value: Option<&str>) -> Rotation {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("daily") => Rotation::DAILY,
        Some("hourly") => Rotation::HOURLY,
        Some("minutely") => Rotation::MINUTELY,
        _ => Rotation::NEVER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_log_path() {
        assert_eq!(
            split_log_path(Path::new("./logs/run.log")),
            (PathBuf::from("./logs"), "run.log".to_string())
        );
        assert_eq!(
            split_log_path(Path::new("run.log")),
            (PathBuf::from("."), "run.log".to_string())
        );
    }

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation(Some("Daily")), Rotation::DAILY);
        assert_eq!(parse_rotation(Some("hourly")), Rotation::HOURLY);
        assert_eq!(parse_rotation(Some("weekly")), Rotation::NEVER);
        assert_eq!(parse_rotation(None), Rotation::NEVER);
    }
}
