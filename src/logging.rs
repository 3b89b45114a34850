//! Tracing subscriber setup

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

type BoxedLayer = Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync>;

fn format_layer<W>(json: bool, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    if json {
        fmt::layer().json().with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(ansi).with_writer(writer).boxed()
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level. The returned guard flushes the log file and must be
/// kept alive for the lifetime of the process.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("library_lending_server={},tower_http=info", config.level).into()
    });
    let json = config.format.eq_ignore_ascii_case("json");

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guard = None;

    if let Some(file) = &config.file {
        let path = Path::new(file);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", file))?;

        std::fs::create_dir_all(directory)?;
        let appender = tracing_appender::rolling::daily(directory, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(format_layer(json, writer, false));
        file_guard = Some(guard);
    }

    if config.to_stdout || layers.is_empty() {
        layers.push(format_layer(json, std::io::stdout, true));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    if let Some(file) = &config.file {
        tracing::info!("Logging to file {}", file);
    }

    Ok(file_guard)
}
