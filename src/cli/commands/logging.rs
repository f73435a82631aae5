use clap::{builder::ValueParser, Arg, ArgAction, Command};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order: `-v` count `n` and the name at `n` agree.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Highest count accepted as a number; anything above 4 still means trace.
const MAX_VERBOSITY: u8 = 5;

/// Accepts either a count (`0..=5`) or a level name, case-insensitively.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        if let Ok(count) = level.trim().parse::<u8>() {
            return (count <= MAX_VERBOSITY)
                .then_some(count)
                .ok_or_else(|| format!("log level {count} is above {MAX_VERBOSITY}"));
        }

        let name = level.trim().to_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level: {level}"))
    })
}

/// Maps a verbosity count to the tracing level; `None` keeps the default.
#[must_use]
pub const fn level(verbosity: u8) -> Option<Level> {
    match verbosity {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log level on stderr: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("PERMGATE_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
