use chrono::Local;
use std::io::{self, IsTerminal};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    EnvFilter,
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Compact stderr line: local wall-clock time, level, emitting module,
/// then the event fields.
///
/// `12:04:31.207  INFO impot_cli::commands calculation complete impot_net=570.46`
struct CliFormat;

impl<S, N> FormatEvent<S, N> for CliFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let time = Local::now().format("%H:%M:%S%.3f");

        if writer.has_ansi_escapes() {
            let level = level_colour(*meta.level());
            write!(writer, "{DIM}{time}{RESET} {level}{:>5}{RESET} ", meta.level())?;
            write!(writer, "{DIM}{}{RESET} ", meta.target())?;
        } else {
            write!(writer, "{time} {:>5} {} ", meta.level(), meta.target())?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_colour(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[1;31m",
        Level::WARN => "\x1b[1;33m",
        Level::INFO => "\x1b[1;32m",
        Level::DEBUG => "\x1b[1;34m",
        Level::TRACE => "\x1b[1;35m",
    }
}

/// `RUST_LOG` when set and valid, `default_directive` otherwise.
fn make_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initializes logging. Call once at startup.
///
/// Records go to stderr so stdout carries nothing but the JSON output.
/// Colours are used only when stderr is a terminal. A second call is a
/// no-op.
pub fn init_logging(default_directive: &str) {
    let _ = tracing_subscriber::fmt()
        .with_ansi(io::stderr().is_terminal())
        .event_format(CliFormat)
        .with_env_filter(make_filter(default_directive))
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn every_level_has_a_distinct_bold_colour() {
        let colours: Vec<&str> = [
            Level::ERROR,
            Level::WARN,
            Level::INFO,
            Level::DEBUG,
            Level::TRACE,
        ]
        .into_iter()
        .map(level_colour)
        .collect();

        assert!(colours.iter().all(|c| c.starts_with("\x1b[1;")));
        let mut unique = colours.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), colours.len());
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging("info");
        init_logging("debug");
    }
}
