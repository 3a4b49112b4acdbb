//! Operator command line: tokenising and command parsing.
//!
//! `dispatch` splits a raw line into a command word and a bounded list of
//! arguments. Oversized words are truncated, surplus arguments are dropped,
//! and runs of spaces are treated as one separator.

use thiserror::Error;

/// Longest command word kept, plus one.
pub const MAX_COMMAND_SIZE: usize = 33;
/// Longest argument kept, plus one.
pub const MAX_ARG_SIZE: usize = 65;
/// Arguments kept per line.
pub const MAX_ARGS: usize = 8;
/// Upper bound for the count of a manual `charge n` / `read n`.
pub const MAX_MANUAL_CALLS: usize = 1 << 16;

/// A tokenised command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dispatch {
    pub command: String,
    pub args: Vec<String>,
}

/// Split `line` into a command word and up to `MAX_ARGS` arguments.
pub fn dispatch(line: &str) -> Dispatch {
    let mut words = line.split(' ').filter(|w| !w.is_empty());

    let command = words
        .next()
        .map(|w| truncate(w, MAX_COMMAND_SIZE - 1))
        .unwrap_or_default();
    let args = words
        .take(MAX_ARGS)
        .map(|w| truncate(w, MAX_ARG_SIZE - 1))
        .collect();

    Dispatch { command, args }
}

fn truncate(word: &str, max_chars: usize) -> String {
    word.chars().take(max_chars).collect()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command line")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("bad argument for {command}: {arg}")]
    BadArgument { command: String, arg: String },
}

/// Commands understood by the operator console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Status,
    Stats,
    Slices,
    /// Manual charge calls against the pipeline.
    Charge(usize),
    /// Manual read calls against the pipeline.
    Read(usize),
    Reset,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &Dispatch) -> Result<Self, CommandError> {
        let count = || -> Result<usize, CommandError> {
            match line.args.first() {
                None => Ok(1),
                Some(arg) => arg
                    .parse()
                    .ok()
                    .filter(|n| (1..=MAX_MANUAL_CALLS).contains(n))
                    .ok_or_else(|| CommandError::BadArgument {
                        command: line.command.clone(),
                        arg: arg.clone(),
                    }),
            }
        };

        match line.command.to_ascii_lowercase().as_str() {
            "" => Err(CommandError::Empty),
            "start" => Ok(Self::Start),
            "stop" => Ok(Self::Stop),
            "status" => Ok(Self::Status),
            "stats" => Ok(Self::Stats),
            "slices" => Ok(Self::Slices),
            "charge" => count().map(Self::Charge),
            "read" => count().map(Self::Read),
            "reset" => Ok(Self::Reset),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            _ => Err(CommandError::Unknown(line.command.clone())),
        }
    }

    pub const HELP: &'static str = "\
commands:
  start          spawn charger and reader workers
  stop           stop and join all workers
  status         engine status
  stats          pipeline counters (JSON)
  slices         per-slice state (JSON)
  charge [n]     run n manual charge calls (default 1, max 65536)
  read [n]       run n manual read calls (default 1, max 65536)
  reset          zero pipeline counters
  quit           stop workers and exit";
}
