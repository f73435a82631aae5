pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_SESSION_FILE: &str = "session-file";
pub const ARG_ANONYMOUS_ROUTE: &str = "anonymous-route";
pub const ARG_CONCURRENCY: &str = "concurrency";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("permgate")
        .about("Session manager and declarative visibility control")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(ARG_API_URL)
                .short('u')
                .long(ARG_API_URL)
                .help("Base URL of the auth service, example: https://erp.tld")
                .env("PERMGATE_API_URL")
                .global(true),
        )
        .arg(
            Arg::new(ARG_SESSION_FILE)
                .short('s')
                .long(ARG_SESSION_FILE)
                .help("File holding the access token and cached user")
                .default_value(".permgate/session.json")
                .env("PERMGATE_SESSION_FILE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_ANONYMOUS_ROUTE)
                .long(ARG_ANONYMOUS_ROUTE)
                .help("Route users are sent to when the session ends")
                .default_value("/")
                .env("PERMGATE_ANONYMOUS_ROUTE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_CONCURRENCY)
                .short('c')
                .long(ARG_CONCURRENCY)
                .help("Element checks allowed in flight within one phase")
                .default_value("1")
                .env("PERMGATE_CONCURRENCY")
                .global(true)
                .value_parser(clap::value_parser!(u16).range(1..)),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .short('t')
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds")
                .default_value("10")
                .env("PERMGATE_TIMEOUT")
                .global(true)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .subcommand(
            Command::new("session")
                .about("Inspect or change the stored session")
                .subcommand_required(true)
                .subcommand(
                    Command::new("set-token")
                        .about("Store the access token issued at login")
                        .arg(Arg::new("token").required(true).env("PERMGATE_TOKEN")),
                )
                .subcommand(Command::new("show").about("Print the cached session"))
                .subcommand(Command::new("clear").about("Remove token and cached user")),
        )
        .subcommand(Command::new("status").about("Report whether a session is present"))
        .subcommand(Command::new("whoami").about("Refresh and print the current user"))
        .subcommand(
            Command::new("check")
                .about("Check one permission")
                .arg(
                    Arg::new("permission")
                        .help("Permission as <module>:<permission>")
                        .required(true),
                ),
        )
        .subcommand(Command::new("modules").about("List modules the user can reach"))
        .subcommand(Command::new("logout").about("End the session"))
        .subcommand(
            Command::new("reconcile")
                .about("Run a visibility pass over a JSON document")
                .arg(
                    Arg::new("document")
                        .short('d')
                        .long("document")
                        .help("Document to reconcile")
                        .required(true),
                )
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("Where to write the reconciled document (default: stdout)"),
                ),
        );

    logging::with_args(command)
}
