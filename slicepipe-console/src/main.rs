//! slicepipe operator console.
//!
//! Reads commands from stdin, one per line, and drives a `TransferEngine`.
//! Type `help` for the command list.

mod commands;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use slicepipe_core::{console, EngineConfig, TransferEngine};
use tracing::{info, warn};

use commands::{Flow, Session};

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut config = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("missing value for --config");
                };
                config = Some(PathBuf::from(v));
            }
            "--help" | "-h" => {
                println!("Usage: slicepipe [--config <file.json>]");
                std::process::exit(0);
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    Ok(Args { config })
}

fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("slicepipe=info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("slicepipe failed: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    info!(
        size = config.pipeline.size,
        slices = config.pipeline.slices,
        max_try = config.pipeline.max_try,
        chargers = config.chargers,
        readers = config.readers,
        "config loaded"
    );

    let engine = TransferEngine::new(config).context("building transfer engine")?;
    let mut session = Session::new(engine);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;

    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let dispatch = console::dispatch(line.trim_end());

        match console::ConsoleCommand::parse(&dispatch) {
            Ok(cmd) => match session.execute(cmd) {
                Ok(Flow::Continue(out)) => writeln!(stdout, "{out}")?,
                Ok(Flow::Quit) => return Ok(()),
                Err(e) => writeln!(stdout, "error: {e:#}")?,
            },
            Err(console::CommandError::Empty) => {}
            Err(e) => {
                warn!(command = %dispatch.command, "rejected command");
                writeln!(stdout, "{e} (try `help`)")?;
            }
        }
        prompt(&mut stdout)?;
    }

    // EOF on stdin behaves like `quit`.
    session.execute(console::ConsoleCommand::Quit)?;
    Ok(())
}

fn prompt(stdout: &mut io::Stdout) -> Result<()> {
    write!(stdout, "slicepipe> ")?;
    stdout.flush()?;
    Ok(())
}
