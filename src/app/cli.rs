#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Setup,
    Signup,
    Login,
    Logout,
    Whoami,
    Report,
    Chat,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "setup" => CliVerb::Setup,
        "signup" => CliVerb::Signup,
        "login" => CliVerb::Login,
        "logout" => CliVerb::Logout,
        "whoami" => CliVerb::Whoami,
        "report" => CliVerb::Report,
        "chat" => CliVerb::Chat,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  setup                                Create the state root, config and database"
            .to_string(),
        "  signup <email> <org>                 Register an account (does not log in)"
            .to_string(),
        "  login <email> [org]                  Log in; org names a first-time profile"
            .to_string(),
        "      passwords are read from the first line of stdin".to_string(),
        "  logout                               Clear the current session".to_string(),
        "  whoami                               Show the logged-in user".to_string(),
        "  report new <query> [options]         Classify, collect fields and analyze".to_string(),
        "      --field <name>=<value>           Pre-fill a requested field".to_string(),
        "      --attach <path>                  Upload a supporting document".to_string(),
        "      --no-prompt                      Fail instead of prompting for fields"
            .to_string(),
        "  report list [--search s] [--from YYYY-MM-DD] [--to YYYY-MM-DD]".to_string(),
        "                                       List your reports, newest first".to_string(),
        "  report show <report_id>              Print a stored report".to_string(),
        "  report delete <report_id>            Delete a report and its chat".to_string(),
        "  chat <report_id>                     Chat about a report (`/exit` quits)".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
