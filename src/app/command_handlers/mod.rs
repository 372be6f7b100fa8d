use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use std::io::{self, BufRead, Write};

pub mod auth;
pub mod chat;
pub mod reports;
pub mod setup;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    run_cli_with_io(args, &mut input, &mut output)
}

/// Runs one command. Interactive commands read from `input` and stream to
/// `output`; the returned string is the final summary.
pub fn run_cli_with_io<R: BufRead, W: Write>(
    args: Vec<String>,
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Setup => setup::cmd_setup(),
        CliVerb::Signup => auth::cmd_signup(&args[1..], input, output),
        CliVerb::Login => auth::cmd_login(&args[1..], input, output),
        CliVerb::Logout => auth::cmd_logout(),
        CliVerb::Whoami => auth::cmd_whoami(),
        CliVerb::Report => reports::cmd_report(&args[1..], input, output),
        CliVerb::Chat => chat::cmd_chat(&args[1..], input, output),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
    }
}
