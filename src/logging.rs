use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

// Flushes the file writer when the process exits.
static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Initialise logging to stderr and, when `log_file` is set, to that file as well.
///
/// Without `debug` the level is fixed at `info` and `RUST_LOG` is ignored, so a
/// stray variable in the user's environment cannot turn on verbose output.
pub fn init(debug: bool, log_file: Option<PathBuf>) {
    let level = if debug { "debug" } else { "info" };
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let mut file_error = None;
    let file_layer = log_file.and_then(|path| match file_writer(&path) {
        Ok(writer) => Some(fmt::layer().with_ansi(false).with_writer(writer)),
        Err(err) => {
            file_error = Some((path, err));
            None
        }
    });

    let _ = Registry::default()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if let Some((path, err)) = file_error {
        tracing::warn!(path = %path.display(), %err, "log file unavailable; logging to stderr only");
    }
}

fn file_writer(path: &Path) -> anyhow::Result<NonBlocking> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("log path has no file name: {}", path.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy())
        .build(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);
    Ok(writer)
}
