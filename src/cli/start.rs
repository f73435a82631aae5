use crate::cli::{actions::Action, commands, dispatch, globals::GlobalArgs, telemetry};
use anyhow::Result;

/// Main entry point for the CLI - builds and returns the Action together with
/// the settings every action shares
///
/// # Errors
///
/// Returns an error if argument parsing, telemetry initialization, or action dispatch fails
pub fn start() -> Result<(Action, GlobalArgs)> {
    let matches = commands::new().get_matches();

    let verbosity = matches
        .get_one::<u8>(commands::logging::ARG_VERBOSITY)
        .copied()
        .unwrap_or(0);
    telemetry::init(commands::logging::level(verbosity))?;

    let globals = dispatch::globals(&matches)?;
    let action = dispatch::handler(&matches, &globals)?;

    Ok((action, globals))
}
