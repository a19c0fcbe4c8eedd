//! Structured logging setup.
//!
//! A `tracing-subscriber` registry with an [`EnvFilter`], an optional sampling layer
//! and a JSON or pretty `fmt` layer, written either synchronously or through a
//! `tracing-appender` non-blocking writer.
//!
//! | Variable                      | Default   |
//! |-------------------------------|-----------|
//! | `ROUTEGATE_LOG_LEVEL`         | `info`    |
//! | `ROUTEGATE_LOG_FORMAT`        | `json`    |
//! | `ROUTEGATE_LOG_SAMPLING_MODE` | `all`     |
//! | `ROUTEGATE_LOG_SAMPLING_RATE` | `1.0`     |
//! | `ROUTEGATE_LOG_ASYNC`         | `false`   |
//! | `ROUTEGATE_LOG_TARGET_FILTER` | unset     |
//! | `ROUTEGATE_LOG_INCLUDE_LOCATION` | `false` |
//!
//! `RUST_LOG`, when set, replaces the level.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    All,
    /// WARN and ERROR only.
    ErrorOnly,
    /// Every WARN and ERROR plus a fraction of everything else.
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of sub-WARN events kept in `Sampled` mode (0.0 to 1.0).
    pub sampling_rate: f64,
    /// Write through a non-blocking background writer.
    pub async_logging: bool,
    /// Extra comma-separated filter directives.
    pub target_filter: Option<String>,
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: false,
            target_filter: None,
            include_location: false,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

impl LogConfig {
    /// Read `ROUTEGATE_LOG_*`, falling back to [`LogConfig::default`].
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = LogConfig::default();
        LogConfig {
            log_level: env::var("ROUTEGATE_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("ROUTEGATE_LOG_FORMAT")
                .map(|s| LogFormat::parse(&s))
                .unwrap_or(defaults.format),
            sampling_mode: env::var("ROUTEGATE_LOG_SAMPLING_MODE")
                .map(|s| SamplingMode::parse(&s))
                .unwrap_or(defaults.sampling_mode),
            sampling_rate: env_parse("ROUTEGATE_LOG_SAMPLING_RATE")
                .unwrap_or(defaults.sampling_rate),
            async_logging: env_parse("ROUTEGATE_LOG_ASYNC").unwrap_or(defaults.async_logging),
            target_filter: env::var("ROUTEGATE_LOG_TARGET_FILTER").ok(),
            include_location: env_parse("ROUTEGATE_LOG_INCLUDE_LOCATION")
                .unwrap_or(defaults.include_location),
        }
    }

    /// Pretty, debug-level, every event, with source locations.
    #[must_use]
    pub fn development() -> Self {
        LogConfig {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            include_location: true,
            ..LogConfig::default()
        }
    }
}

/// Drops events according to a [`SamplingMode`].
pub struct SamplingLayer {
    mode: SamplingMode,
    interval: u64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        let rate = sampling_rate.clamp(0.0, 1.0);
        // rate 0 keeps nothing below WARN
        let interval = if rate > 0.0 { (1.0 / rate).round() as u64 } else { 0 };
        SamplingLayer {
            mode,
            interval,
            counter: AtomicU64::new(0),
        }
    }

    fn keep(&self, level: Level, is_event: bool) -> bool {
        let important = matches!(level, Level::WARN | Level::ERROR);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => important,
            SamplingMode::Sampled => {
                if important || !is_event {
                    return true;
                }
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                self.interval > 0 && count % self.interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        self.keep(*metadata.level(), metadata.is_event())
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    // client disconnects are reported at info by may_minihttp
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }
    if let Some(targets) = &config.target_filter {
        for raw in targets.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match raw.parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => eprintln!("Ignoring invalid log filter directive {raw:?}: {e}"),
            }
        }
    }
    filter
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard owns the background writer; keep it
/// alive for the life of the process so buffered events are flushed on exit.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer),
            Some(guard),
        )
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(guard)
}
