//! tracing-subscriber setup: console layer plus optional rolling JSON file.

use std::path::Path;

use eyre::WrapErr;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::FILE_GUARD;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Console output goes to stderr so stdout
/// stays reserved for command results.
pub fn init(console_level: &str, json: bool, logging: &pingtrip_config::Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(console_level))
        .wrap_err_with(|| format!("invalid log level {console_level:?}"))?;

    let console: BoxedLayer = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };

    let mut layers = vec![console];
    if let Some(file) = logging.file.as_deref() {
        layers.push(file_layer(file, logging)?);
    }

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(layers).try_init();
    Ok(())
}

fn file_layer(file: &str, logging: &pingtrip_config::Logging) -> eyre::Result<BoxedLayer> {
    let path = Path::new(file);
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;

    let appender = match logging.rotation.as_deref() {
        Some("daily") => tracing_appender::rolling::daily(dir, name),
        Some("hourly") => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    };
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let level = logging.level.as_deref().unwrap_or("info");
    let filter =
        EnvFilter::try_new(level).wrap_err_with(|| format!("invalid logging.level {level:?}"))?;
    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}
