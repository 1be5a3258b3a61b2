use anyhow::Context;
use backtrace::Backtrace;
use chrono::Local;
use std::{fs::File, path::PathBuf};
use tracing::{level_filters::LevelFilter, Subscriber};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub fn init<S: AsRef<str>>(level: Option<S>) {
    let (log_file, log_err) = match open_log_file() {
        Ok(log_file) => (Some(log_file), None),
        Err(err) => (None, Some(err)),
    };

    subscriber(level, log_file).init();

    if let Some(err) = log_err {
        tracing::warn!("logging to stderr only: {err:#}");
    }

    set_panic_hook();
}

/// Stderr logging, plus a plain-text copy in `log_file` when there is one.
fn subscriber<S: AsRef<str>>(
    level: Option<S>,
    log_file: Option<File>,
) -> impl Subscriber + Send + Sync + 'static {
    let file_layer = log_file.map(|log_file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(log_file)
            .with_filter(filter(level.as_ref()))
    });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter(level));

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
}

fn open_log_file() -> anyhow::Result<File> {
    let home = std::env::var("HOME").context("$HOME is not set")?;
    let log_dir = PathBuf::from(home).join(".local/share/vdesks/");
    let log_file_name = format!("vdesks_{}.log", Local::now().format("%Y-%m-%d_%H:%M:%S"));
    let log_file_path = log_dir.join(log_file_name);
    let log_link_path = log_dir.join("latest.log");

    std::fs::create_dir_all(&log_dir).with_context(|| {
        format!(
            "unable to create log directory '{}'",
            log_dir.to_string_lossy()
        )
    })?;

    let log_file = File::create(&log_file_path).with_context(|| {
        format!(
            "unable to create log file '{}'",
            log_file_path.to_string_lossy()
        )
    })?;

    if log_link_path.symlink_metadata().is_ok() {
        std::fs::remove_file(&log_link_path).with_context(|| {
            format!("unable to remove '{}'", log_link_path.to_string_lossy())
        })?;
    }

    std::os::unix::fs::symlink(&log_file_path, &log_link_path).with_context(|| {
        format!("unable to symlink '{}'", log_link_path.to_string_lossy())
    })?;

    Ok(log_file)
}

fn filter<S: AsRef<str>>(level: Option<S>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::builder().parse_lossy(level),
        None => EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy(),
    }
}

fn set_panic_hook() {
    std::panic::set_hook(Box::new(move |info| {
        let backtrace = Backtrace::new();

        let thread = std::thread::current();
        let thread = thread.name().unwrap_or("<unnamed>");

        let payload = info.payload();
        let msg = payload
            .downcast_ref::<&'static str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("Box<Any>");

        let location = info
            .location()
            .map(|location| format!(" at {}:{}", location.file(), location.line()))
            .unwrap_or_default();

        tracing::error!(
            target: "vdesks::panic",
            "vdesks thread '{thread}' panicked{location}: {msg}\n{backtrace:?}"
        );
    }));
}
