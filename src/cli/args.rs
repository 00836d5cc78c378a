//! Command-line argument parsing.

/// Parsed CLI command to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum CliCommand {
    /// Show version information
    Version,
    /// Show usage
    Help,
    /// Rebuild a session from its log and print it
    Replay { session_id: String, details: bool },
    /// Replay, then poll until the session goes inactive
    Watch { session_id: String, details: bool },
    /// Start a run and render it live
    Ask {
        question: String,
        session_id: Option<String>,
        /// Single-shot request instead of a stream
        once: bool,
        details: bool,
    },
    /// Cancel a running session
    Cancel { session_id: String },
    /// Arguments could not be parsed
    Invalid(String),
}

pub const USAGE: &str = "\
usage: debugscope <command> [options]

commands:
  replay <session_id>      rebuild a session from its log
  watch <session_id>       replay, then follow until the run ends
  ask <question...>        start a run and render it live
      --session <id>       continue an existing session
      --once               single-shot request, no streaming
  cancel <session_id>      cancel a running session
  help                     show this message

options:
  -d, --details            print request payloads
  -V, --version            print version";

/// Parse command-line arguments, program name included.
///
/// # Examples
///
/// ```
/// use debugscope::cli::args::{parse_args, CliCommand};
///
/// let args = vec!["debugscope".to_string(), "--version".to_string()];
/// assert_eq!(parse_args(args.into_iter()), CliCommand::Version);
/// ```
pub fn parse_args<I>(args: I) -> CliCommand
where
    I: Iterator<Item = String>,
{
    let mut details = false;
    let mut once = false;
    let mut session_flag: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut args = args.skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => return CliCommand::Version,
            "--help" | "-h" => return CliCommand::Help,
            "--details" | "-d" => details = true,
            "--once" => once = true,
            "--session" => match args.next() {
                Some(id) => session_flag = Some(id),
                None => return CliCommand::Invalid("--session needs a value".to_string()),
            },
            flag if flag.starts_with("--") => {
                return CliCommand::Invalid(format!("unknown option '{}'", flag))
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let Some(command) = positional.next() else {
        return CliCommand::Help;
    };
    let rest: Vec<String> = positional.collect();

    let single = |name: &str| match rest.as_slice() {
        [id] => Ok(id.clone()),
        [] => Err(CliCommand::Invalid(format!("{} needs a session id", name))),
        _ => Err(CliCommand::Invalid(format!("{} takes one session id", name))),
    };

    match command.as_str() {
        "help" => CliCommand::Help,
        "replay" => match single("replay") {
            Ok(session_id) => CliCommand::Replay {
                session_id,
                details,
            },
            Err(invalid) => invalid,
        },
        "watch" => match single("watch") {
            Ok(session_id) => CliCommand::Watch {
                session_id,
                details,
            },
            Err(invalid) => invalid,
        },
        "cancel" => match single("cancel") {
            Ok(session_id) => CliCommand::Cancel { session_id },
            Err(invalid) => invalid,
        },
        "ask" => {
            let question = rest.join(" ");
            if question.trim().is_empty() {
                return CliCommand::Invalid("ask needs a question".to_string());
            }
            CliCommand::Ask {
                question,
                session_id: session_flag,
                once,
                details,
            }
        }
        other => CliCommand::Invalid(format!("unknown command '{}'", other)),
    }
}
