use console::style;
use std::fmt;
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;
use tracing::{
    Event, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::{
    EnvFilter,
    fmt::{FmtContext, FormatEvent, FormatFields, format::Writer},
    prelude::*,
    registry::LookupSpan,
};

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Level {
    Silent,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> LevelFilter {
        match level {
            Level::Silent => LevelFilter::OFF,
            Level::Error => LevelFilter::ERROR,
            Level::Warn => LevelFilter::WARN,
            Level::Info => LevelFilter::INFO,
            Level::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(level).into())
        .from_env_lossy();

    let stderr = io::stderr;
    let ansi = stderr().is_terminal();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(stderr)
        .with_ansi(ansi)
        .event_format(PrefixFormat);

    // A second init (e.g. in tests) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init();
}

/// Single-line events: `[+]` for diagnostics, `[-]` for problems, bare
/// text otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrefixFormat;

pub fn prefix_for(level: &tracing::Level) -> Option<&'static str> {
    match *level {
        tracing::Level::ERROR | tracing::Level::WARN => Some("[-]"),
        tracing::Level::DEBUG | tracing::Level::TRACE => Some("[+]"),
        tracing::Level::INFO => None,
    }
}

impl<S, F> FormatEvent<S, F> for PrefixFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    F: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, F>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        #[derive(Default)]
        struct MessageVisitor {
            message: Option<String>,
        }

        impl Visit for MessageVisitor {
            fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
                if field.name() == "message" {
                    self.message = Some(format!("{value:?}"));
                }
            }

            fn record_str(&mut self, field: &Field, value: &str) {
                if field.name() == "message" {
                    self.message = Some(value.to_string());
                }
            }
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let Some(msg) = visitor.message else {
            return Ok(());
        };

        let level = event.metadata().level();
        if let Some(prefix) = prefix_for(level) {
            if writer.has_ansi_escapes() {
                let styled = match *level {
                    tracing::Level::ERROR => style(prefix).red(),
                    tracing::Level::WARN => style(prefix).yellow(),
                    _ => style(prefix).dim(),
                };
                write!(writer, "{styled} ")?;
            } else {
                write!(writer, "{prefix} ")?;
            }
        }

        writeln!(writer, "{msg}")
    }
}
