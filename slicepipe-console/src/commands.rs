//! Console command handlers.
//!
//! Each handler returns the text printed back to the operator, so the
//! dispatch loop in `main` stays free of engine details.

use anyhow::{Context, Result};
use slicepipe_core::{console::ConsoleCommand, Progress, SignalFrame, TransferEngine};
use tracing::info;

/// Operator session: the engine plus the frames used for manual calls.
pub struct Session {
    engine: TransferEngine,
    source: SignalFrame,
    dest: SignalFrame,
}

/// What the dispatch loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Flow {
    Continue(String),
    Quit,
}

impl Session {
    pub fn new(engine: TransferEngine) -> Self {
        let source = SignalFrame::sine(engine.pipeline().size(), &engine.config().tone);
        let dest = engine.pipeline().blank_frame();
        Self {
            engine,
            source,
            dest,
        }
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Flow> {
        let out = match command {
            ConsoleCommand::Start => {
                self.engine.start()?;
                "started".to_string()
            }
            ConsoleCommand::Stop => {
                self.engine.stop()?;
                "stopped".to_string()
            }
            ConsoleCommand::Status => serde_json::to_string(&self.engine.status())?,
            ConsoleCommand::Stats => serde_json::to_string_pretty(&self.engine.diagnostics())
                .context("serialising diagnostics")?,
            ConsoleCommand::Slices => serde_json::to_string_pretty(&self.engine.slices())
                .context("serialising slice snapshot")?,
            ConsoleCommand::Charge(n) => self.manual(n, true)?,
            ConsoleCommand::Read(n) => self.manual(n, false)?,
            ConsoleCommand::Reset => {
                self.engine.reset_diagnostics();
                "counters reset".to_string()
            }
            ConsoleCommand::Help => ConsoleCommand::HELP.to_string(),
            ConsoleCommand::Quit => {
                if self.engine.is_running() {
                    self.engine.stop()?;
                }
                info!("console exiting");
                return Ok(Flow::Quit);
            }
        };
        Ok(Flow::Continue(out))
    }

    /// Run `n` anonymous charge (or read) calls and report which slices moved.
    fn manual(&mut self, n: usize, charge: bool) -> Result<String> {
        let pipeline = self.engine.pipeline();
        let mut moved = Vec::new();
        for _ in 0..n {
            let progress = if charge {
                pipeline.charge(&self.source)?
            } else {
                pipeline.read(&mut self.dest)?
            };
            if let Progress::Transferred { slice } = progress {
                moved.push(slice);
            }
        }
        Ok(format!(
            "{} of {n} call(s) transferred, slices {moved:?}",
            moved.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicepipe_core::{console, EngineConfig, MainState, PipelineConfig};

    fn session() -> Session {
        let config = EngineConfig {
            pipeline: PipelineConfig::new(16, 4),
            ..EngineConfig::default()
        };
        Session::new(TransferEngine::new(config).unwrap())
    }

    fn run(session: &mut Session, line: &str) -> Flow {
        let cmd = ConsoleCommand::parse(&console::dispatch(line)).unwrap();
        session.execute(cmd).unwrap()
    }

    #[test]
    fn manual_charge_then_read() {
        let mut s = session();
        assert_eq!(
            run(&mut s, "charge 5"),
            Flow::Continue("4 of 5 call(s) transferred, slices [0, 1, 2, 3]".into())
        );
        assert_eq!(
            run(&mut s, "read 2"),
            Flow::Continue("2 of 2 call(s) transferred, slices [0, 1]".into())
        );
        let states: Vec<_> = s.engine.slices().iter().map(|snap| snap.state).collect();
        assert_eq!(
            states,
            vec![
                MainState::Listed,
                MainState::Listed,
                MainState::Valid,
                MainState::Valid
            ]
        );
    }

    #[test]
    fn stop_when_idle_is_an_error() {
        let mut s = session();
        assert!(s.execute(ConsoleCommand::Stop).is_err());
    }

    #[test]
    fn quit_stops_running_engine() {
        let mut s = session();
        run(&mut s, "start");
        assert_eq!(run(&mut s, "quit"), Flow::Quit);
        assert!(!s.engine.is_running());
    }

    #[test]
    fn huge_manual_count_is_rejected_without_running() {
        let s = session();
        let parsed = ConsoleCommand::parse(&console::dispatch("charge 18446744073709551615"));
        assert!(matches!(
            parsed,
            Err(console::CommandError::BadArgument { .. })
        ));
        assert!(s
            .engine
            .slices()
            .iter()
            .all(|snap| snap.state == MainState::Free));
    }

    #[test]
    fn max_manual_count_completes() {
        let mut s = session();
        let flow = run(&mut s, "charge 65536");
        assert_eq!(
            flow,
            Flow::Continue("4 of 65536 call(s) transferred, slices [0, 1, 2, 3]".into())
        );
    }

    #[test]
    fn status_is_json() {
        let mut s = session();
        assert_eq!(run(&mut s, "status"), Flow::Continue("\"idle\"".into()));
    }
}
