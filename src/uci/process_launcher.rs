//! Process launch seam for the engine session.
//!
//! A launcher starts the engine once and hands back a writable input stream
//! plus a control handle. Output lines are pushed into the supplied callback
//! from a reader thread owned by the launcher; `None` marks end of stream.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use crate::errors::{EngineError, EngineResult};

/// Receives every engine output line, then `None` once the stream closes.
pub type OutputCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Lifetime control over a launched engine.
pub trait ProcessControl: Send {
    /// Whether the process has already exited.
    fn has_exited(&mut self) -> EngineResult<bool>;

    /// Kill the process if still running and reap it.
    fn terminate(&mut self) -> EngineResult<()>;
}

pub struct LaunchedProcess {
    pub input: Box<dyn Write + Send>,
    pub control: Box<dyn ProcessControl>,
}

pub trait ProcessLauncher {
    fn launch(&self, on_output: OutputCallback) -> EngineResult<LaunchedProcess>;
}

/// Spawns an engine binary with piped stdio.
#[derive(Debug, Clone)]
pub struct StdProcessLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl StdProcessLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    fn launch_error(&self, reason: impl ToString) -> EngineError {
        EngineError::Launch {
            program: self.program.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ProcessLauncher for StdProcessLauncher {
    fn launch(&self, on_output: OutputCallback) -> EngineResult<LaunchedProcess> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.launch_error("failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.launch_error("failed to capture stdout"))?;

        let reader = thread::Builder::new()
            .name("engine-stdout".to_owned())
            .spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    match line {
                        Ok(line) => on_output(Some(&line)),
                        Err(err) => {
                            warn!(error = %err, "engine stdout read failed");
                            break;
                        }
                    }
                }
                on_output(None);
                debug!("engine stdout closed");
            });
        let reader = match reader {
            Ok(handle) => handle,
            Err(err) => {
                // The child is unusable without a reader.
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.launch_error(err));
            }
        };

        info!(program = %self.program.display(), pid = child.id(), "engine process launched");
        Ok(LaunchedProcess {
            input: Box::new(stdin),
            control: Box::new(ChildControl {
                child,
                reader: Some(reader),
            }),
        })
    }
}

struct ChildControl {
    child: Child,
    reader: Option<thread::JoinHandle<()>>,
}

impl ChildControl {
    fn join_reader(&mut self) {
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                warn!("engine stdout reader panicked");
            }
        }
    }
}

impl ProcessControl for ChildControl {
    fn has_exited(&mut self) -> EngineResult<bool> {
        let exited = self.child.try_wait()?.is_some();
        if exited {
            self.join_reader();
        }
        Ok(exited)
    }

    fn terminate(&mut self) -> EngineResult<()> {
        match self.child.kill() {
            Ok(()) => {}
            // Already exited.
            Err(err) if err.kind() == ErrorKind::InvalidInput => {}
            Err(err) => return Err(err.into()),
        }
        self.child.wait()?;
        self.join_reader();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{ProcessLauncher, StdProcessLauncher};
    use crate::errors::EngineError;

    #[test]
    fn missing_binary_is_a_launch_error() {
        let launcher = StdProcessLauncher::new("/nonexistent/plum-board-engine").with_args(["--uci"]);
        let result = launcher.launch(Arc::new(|_: Option<&str>| {}));
        assert!(matches!(result, Err(EngineError::Launch { .. })));
    }
}
