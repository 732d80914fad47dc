//! In-memory engine double for session tests.
//!
//! Lines written to the "process input" are recorded and handed to a
//! responder thread, which feeds the script's replies back through the output
//! callback just as a real engine's stdout reader would.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use crossbeam::channel::{self, Sender};

use crate::errors::{EngineError, EngineResult};
use crate::uci::process_launcher::{LaunchedProcess, OutputCallback, ProcessControl, ProcessLauncher};

/// Maps one input line to the reply lines the engine prints.
pub type Script = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

pub struct FakeEngine {
    script: Script,
    received: Arc<Mutex<Vec<String>>>,
    output: Arc<Mutex<Option<OutputCallback>>>,
    exited: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    exit_on_quit: bool,
    fail_launch: bool,
}

impl FakeEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            received: Arc::default(),
            output: Arc::default(),
            exited: Arc::default(),
            terminated: Arc::default(),
            exit_on_quit: true,
            fail_launch: false,
        }
    }

    /// Answers `uci`, `isready` and `go` like a minimal engine that always plays e2e4.
    pub fn standard() -> Self {
        Self::new(Arc::new(standard_reply))
    }

    pub fn ignoring_quit(mut self) -> Self {
        self.exit_on_quit = false;
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Every line written to the engine so far.
    pub fn received(&self) -> Vec<String> {
        self.received.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Print an unsolicited line.
    pub fn emit(&self, line: &str) {
        let output = self.output.lock().ok().and_then(|slot| slot.clone());
        if let Some(output) = output {
            output(Some(line));
        }
    }

    pub fn was_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

pub fn standard_reply(line: &str) -> Vec<String> {
    let reply: &[&str] = match line.split_whitespace().next() {
        Some("uci") => &["id name Fake", "id author plum_board", "uciok"],
        Some("isready") => &["readyok"],
        Some("go") => &["info depth 1 score cp 20 pv e2e4", "bestmove e2e4 ponder e7e5"],
        _ => &[],
    };
    reply.iter().map(|line| (*line).to_owned()).collect()
}

impl ProcessLauncher for FakeEngine {
    fn launch(&self, on_output: OutputCallback) -> EngineResult<LaunchedProcess> {
        if self.fail_launch {
            return Err(EngineError::Launch {
                program: "fake".to_owned(),
                reason: "launch refused".to_owned(),
            });
        }
        if let Ok(mut slot) = self.output.lock() {
            *slot = Some(Arc::clone(&on_output));
        }

        let (line_tx, line_rx) = channel::unbounded::<String>();
        let script = Arc::clone(&self.script);
        let exited = Arc::clone(&self.exited);
        let exit_on_quit = self.exit_on_quit;
        thread::Builder::new()
            .name("fake-engine".to_owned())
            .spawn(move || {
                for line in line_rx {
                    if line == "quit" && exit_on_quit {
                        break;
                    }
                    for reply in script(&line) {
                        on_output(Some(&reply));
                    }
                }
                on_output(None);
                exited.store(true, Ordering::SeqCst);
            })?;

        Ok(LaunchedProcess {
            input: Box::new(LineWriter {
                pending: Vec::new(),
                received: Arc::clone(&self.received),
                line_tx,
            }),
            control: Box::new(FakeControl {
                exited: Arc::clone(&self.exited),
                terminated: Arc::clone(&self.terminated),
            }),
        })
    }
}

struct LineWriter {
    pending: Vec<u8>,
    received: Arc<Mutex<Vec<String>>>,
    line_tx: Sender<String>,
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&raw[..end]).into_owned();
            if let Ok(mut received) = self.received.lock() {
                received.push(line.clone());
            }
            self.line_tx
                .send(line)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "fake engine exited"))?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct FakeControl {
    exited: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
}

impl ProcessControl for FakeControl {
    fn has_exited(&mut self) -> EngineResult<bool> {
        Ok(self.exited.load(Ordering::SeqCst))
    }

    fn terminate(&mut self) -> EngineResult<()> {
        self.terminated.store(true, Ordering::SeqCst);
        self.exited.store(true, Ordering::SeqCst);
        Ok(())
    }
}
