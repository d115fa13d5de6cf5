//! Logger initialization for the council binary, adapted from the server's
//! stderr + OTEL appender setup for a plain CLI process (no TUI mode).

use std::{fmt::Write, io::IsTerminal, str::FromStr};

use jiff::{Zoned, tz::TimeZone};
use logforth::{
    append::{FastraceEvent, Stderr},
    filter::EnvFilter,
    layout::Layout,
};
use telemetry::logs::OtelLogsAppender;

/// Formats timestamps in UTC with a `Z` suffix rather than the local offset.
#[derive(Debug)]
struct UtcLayout {
    no_color: bool,
}

impl UtcLayout {
    fn new() -> Self {
        Self { no_color: false }
    }

    fn no_color(mut self) -> Self {
        self.no_color = true;
        self
    }
}

impl Layout for UtcLayout {
    fn format(
        &self,
        record: &log::Record<'_>,
        _diagnostics: &[Box<dyn logforth::diagnostic::Diagnostic>],
    ) -> anyhow::Result<Vec<u8>> {
        let mut output = String::new();

        let now = Zoned::now().with_time_zone(TimeZone::UTC);
        write!(output, "{} ", now.strftime("%Y-%m-%dT%H:%M:%S%.6fZ"))?;

        let level_str = if self.no_color {
            format!("{:>5}", record.level())
        } else {
            match record.level() {
                log::Level::Error => format!("\x1b[31m{:>5}\x1b[0m", record.level()),
                log::Level::Warn => format!("\x1b[33m{:>5}\x1b[0m", record.level()),
                log::Level::Info => format!("\x1b[32m{:>5}\x1b[0m", record.level()),
                log::Level::Debug => format!("\x1b[34m{:>5}\x1b[0m", record.level()),
                log::Level::Trace => format!("\x1b[35m{:>5}\x1b[0m", record.level()),
            }
        };

        write!(output, "{level_str}  ")?;
        write!(output, "{}", record.args())?;

        Ok(output.into_bytes())
    }
}

/// Initializes the logger once, wiring the OTEL appender alongside stderr
/// when telemetry logging is enabled.
pub fn init(log_filter: &str, otel_appender: Option<OtelLogsAppender>) {
    let mut builder = logforth::builder();

    let filter_for_fastrace = log_filter.to_owned();
    builder = builder.dispatch(move |d| {
        let filter = EnvFilter::from_str(&filter_for_fastrace)
            .unwrap_or_else(|_| EnvFilter::from_str("info").expect("default filter should be valid"));
        d.filter(filter).append(FastraceEvent::default())
    });

    if let Some(appender) = otel_appender {
        let filter_for_otel = log_filter.to_owned();
        builder = builder.dispatch(move |d| {
            let filter_str = format!("{filter_for_otel},opentelemetry=off,opentelemetry_sdk=off,opentelemetry_otlp=off");
            let filter = EnvFilter::from_str(&filter_str).unwrap_or_else(|_| {
                EnvFilter::from_str("info,opentelemetry=off,opentelemetry_sdk=off,opentelemetry_otlp=off")
                    .expect("default filter should be valid")
            });
            d.filter(filter).append(appender)
        });
    }

    let filter_for_stderr = log_filter.to_owned();
    builder = builder.dispatch(move |d| {
        let filter = EnvFilter::from_str(&filter_for_stderr)
            .unwrap_or_else(|_| EnvFilter::from_str("info").expect("default filter should be valid"));

        let layout = if std::io::stderr().is_terminal() {
            UtcLayout::new()
        } else {
            UtcLayout::new().no_color()
        };

        d.filter(filter).append(Stderr::default().with_layout(layout))
    });

    builder.apply();
}
