//! Ordered command/response session with an external UCI engine.
//!
//! Callers enqueue commands from any thread without blocking. A single worker
//! thread writes them to the engine one at a time and waits for each to
//! complete before writing the next, so exactly one command is in flight.
//! Engine output arrives on the launcher's reader thread and is matched
//! against the head of the queue only; a match dequeues the command and emits
//! its completion exactly once, in submission order.
//!
//! Worker states:
//! - idle: blocked on "work available" or shutdown;
//! - writing: the head command (and the sync command when it expects no
//!   direct reply) goes to the engine input;
//! - awaiting: blocked on "command completed", shutdown or the optional
//!   response deadline.
//!
//! A command that times out is abandoned rather than forgotten: the reply it
//! still owes is remembered, and the first later line matching it is swallowed
//! before any queued command sees it. The engine is also sent the interrupt
//! command so a running search reports its move promptly.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use crossbeam::select;
use tracing::{debug, info, instrument, trace, warn};

use crate::errors::{EngineError, EngineResult};
use crate::uci::process_launcher::{OutputCallback, ProcessControl, ProcessLauncher};
use crate::uci::protocol::{self, canonicalize_reply, parse_best_move, BEST_MOVE};

pub type CommandId = u64;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Written after any command that has no direct reply.
    pub sync_command: String,
    /// Reply to `sync_command` that completes such a command.
    pub sync_reply: String,
    pub quit_command: String,
    /// Written after a response timeout to cut a running search short.
    pub interrupt_command: String,
    /// How long `stop` waits for the worker and the process to exit.
    pub stop_timeout: Duration,
    /// Give up on an in-flight command after this long. `None` waits forever.
    pub response_timeout: Option<Duration>,
    /// Raw lines buffered for the verbose stream before new ones are dropped.
    pub verbose_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sync_command: protocol::IS_READY.to_owned(),
            sync_reply: protocol::READY_OK.to_owned(),
            quit_command: protocol::QUIT.to_owned(),
            interrupt_command: protocol::STOP.to_owned(),
            stop_timeout: Duration::from_secs(2),
            response_timeout: None,
            verbose_capacity: 1024,
        }
    }
}

/// What completes a queued command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expectation {
    /// A line starting with this text.
    Prefix(String),
    /// The sync reply to the sync command written right after this one.
    Sync,
}

impl Expectation {
    /// An empty prefix means "no direct reply; synchronize instead".
    pub fn from_prefix(prefix: &str) -> Self {
        if prefix.is_empty() {
            Expectation::Sync
        } else {
            Expectation::Prefix(prefix.to_owned())
        }
    }
}

/// Exactly one of these is emitted per enqueued command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: CommandId,
    pub command: String,
    /// The matching reply line, or why none was received.
    pub result: EngineResult<String>,
}

#[derive(Debug, Clone)]
struct Command {
    id: CommandId,
    text: String,
    expect: Expectation,
    written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    NotStarted,
    Running,
    Stopped,
}

struct QueueState {
    phase: Phase,
    queue: VecDeque<Command>,
    next_id: CommandId,
    last_response: Option<String>,
    best_move: Option<String>,
    /// Replies still owed by timed-out commands, oldest first.
    abandoned: VecDeque<Expectation>,
}

/// State shared by callers, the worker and the output callback.
struct Shared {
    state: Mutex<QueueState>,
    sync_reply: String,
    work_tx: Sender<()>,
    completed_tx: Sender<CommandId>,
    completions_tx: Sender<Completion>,
    verbose_tx: Sender<String>,
    verbose_dropped: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, text: String, expect: Expectation) -> EngineResult<CommandId> {
        let mut state = self.lock();
        match state.phase {
            Phase::NotStarted => return Err(EngineError::NotStarted),
            Phase::Stopped => return Err(EngineError::Stopped),
            Phase::Running => {}
        }
        let id = state.next_id;
        state.next_id += 1;
        debug!(id, command = %text, ?expect, "enqueued");
        state.queue.push_back(Command {
            id,
            text,
            expect,
            written: false,
        });
        drop(state);
        // The worker owns the receiver for the life of the session.
        let _ = self.work_tx.send(());
        Ok(id)
    }

    /// Claim the head command for writing, if it has not been written yet.
    fn claim_head(&self) -> Option<Command> {
        let mut state = self.lock();
        let head = state.queue.front_mut()?;
        if head.written {
            return None;
        }
        head.written = true;
        Some(head.clone())
    }

    fn on_output_line(&self, line: Option<&str>) {
        let Some(line) = line else {
            debug!("engine output closed");
            return;
        };
        trace!(line, "engine output");
        if let Err(TrySendError::Full(_)) = self.verbose_tx.try_send(line.to_owned()) {
            let dropped = self.verbose_dropped.fetch_add(1, Ordering::Relaxed) + 1;
            if dropped.is_power_of_two() {
                warn!(dropped, "verbose stream full, dropping engine output");
            }
        }

        let reply = canonicalize_reply(line);
        let mut state = self.lock();
        let owed = state.abandoned.iter().position(|expect| self.matches(expect, reply));
        if let Some(owed) = owed {
            state.abandoned.remove(owed);
            debug!(reply, "discarding late reply to a timed-out command");
            return;
        }
        let Some(head) = state.queue.front() else {
            return;
        };
        if !head.written || !self.matches(&head.expect, reply) {
            return;
        }

        let Some(head) = state.queue.pop_front() else {
            return;
        };
        state.last_response = Some(reply.to_owned());
        if reply.starts_with(BEST_MOVE) {
            state.best_move = parse_best_move(reply).map(str::to_owned);
        }
        debug!(id = head.id, command = %head.text, reply, "completed");

        // Sent under the lock so completions leave in queue order.
        let _ = self.completions_tx.send(Completion {
            id: head.id,
            command: head.text,
            result: Ok(reply.to_owned()),
        });
        let _ = self.completed_tx.send(head.id);
    }

    fn matches(&self, expect: &Expectation, reply: &str) -> bool {
        match expect {
            Expectation::Sync => reply == self.sync_reply,
            Expectation::Prefix(prefix) => reply.starts_with(prefix.as_str()),
        }
    }

    /// Fail the head command if it is still `id`.
    fn fail_head(&self, id: CommandId, error: EngineError) {
        self.remove_head(id, error, false);
    }

    /// Fail the head command if it is still `id` and remember the reply it
    /// owes. Returns whether the command was abandoned.
    fn abandon_head(&self, id: CommandId, error: EngineError) -> bool {
        self.remove_head(id, error, true)
    }

    fn remove_head(&self, id: CommandId, error: EngineError, owes_reply: bool) -> bool {
        let mut state = self.lock();
        if state.queue.front().map(|cmd| cmd.id) != Some(id) {
            return false;
        }
        let Some(head) = state.queue.pop_front() else {
            return false;
        };
        warn!(id, command = %head.text, %error, "command failed");
        if owes_reply {
            state.abandoned.push_back(head.expect);
        }
        let _ = self.completions_tx.send(Completion {
            id,
            command: head.text,
            result: Err(error),
        });
        true
    }

    /// Fail every queued command with `Stopped`.
    fn drain(&self) {
        let mut state = self.lock();
        state.phase = Phase::Stopped;
        for cmd in state.queue.drain(..) {
            debug!(id = cmd.id, command = %cmd.text, "dropped by shutdown");
            let _ = self.completions_tx.send(Completion {
                id: cmd.id,
                command: cmd.text,
                result: Err(EngineError::Stopped),
            });
        }
    }
}

type SharedInput = Arc<Mutex<Box<dyn Write + Send>>>;

struct Worker {
    shared: Arc<Shared>,
    input: SharedInput,
    sync_command: String,
    interrupt_command: String,
    response_timeout: Option<Duration>,
    work_rx: Receiver<()>,
    completed_rx: Receiver<CommandId>,
    shutdown_rx: Receiver<()>,
    // Dropped when the worker returns; `stop` waits on the disconnect.
    _exited_tx: Sender<()>,
}

enum Awaited {
    Completed,
    TimedOut,
    Shutdown,
}

impl Worker {
    fn run(self) {
        debug!("engine worker started");
        loop {
            // Idle.
            let cmd = match self.shared.claim_head() {
                Some(cmd) => cmd,
                None => {
                    select! {
                        recv(self.work_rx) -> msg => {
                            if msg.is_err() {
                                break;
                            }
                        }
                        recv(self.shutdown_rx) -> _ => break,
                    }
                    continue;
                }
            };

            // Writing.
            if let Err(error) = self.write_command(&cmd) {
                self.shared.fail_head(cmd.id, error);
                continue;
            }

            // Awaiting completion.
            match self.await_completion(cmd.id) {
                Awaited::Completed => {}
                Awaited::TimedOut => {
                    let waited = self.response_timeout.unwrap_or_default();
                    let abandoned = self.shared.abandon_head(
                        cmd.id,
                        EngineError::ResponseTimeout {
                            command: cmd.text.clone(),
                            waited,
                        },
                    );
                    if abandoned {
                        self.write_interrupt();
                    }
                }
                Awaited::Shutdown => break,
            }
        }
        debug!("engine worker exiting");
    }

    fn write_command(&self, cmd: &Command) -> EngineResult<()> {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(id = cmd.id, command = %cmd.text, "writing");
        writeln!(input, "{}", cmd.text)?;
        if cmd.expect == Expectation::Sync {
            writeln!(input, "{}", self.sync_command)?;
        }
        input.flush()?;
        Ok(())
    }

    fn write_interrupt(&self) {
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        debug!(command = %self.interrupt_command, "interrupting after timeout");
        if let Err(err) = writeln!(input, "{}", self.interrupt_command).and_then(|_| input.flush()) {
            debug!(error = %err, "interrupt command not delivered");
        }
    }

    fn await_completion(&self, id: CommandId) -> Awaited {
        let deadline = match self.response_timeout {
            Some(timeout) => channel::at(Instant::now() + timeout),
            None => channel::never(),
        };
        loop {
            select! {
                recv(self.completed_rx) -> msg => match msg {
                    Ok(done) if done == id => return Awaited::Completed,
                    // Left over from a command that already timed out.
                    Ok(_) => continue,
                    Err(_) => return Awaited::Shutdown,
                },
                recv(self.shutdown_rx) -> _ => return Awaited::Shutdown,
                recv(deadline) -> _ => return Awaited::TimedOut,
            }
        }
    }
}

struct Running {
    input: SharedInput,
    control: Box<dyn ProcessControl>,
    shutdown_tx: Sender<()>,
    exited_rx: Receiver<()>,
    worker: thread::JoinHandle<()>,
}

enum Lifecycle {
    NotStarted(WorkerChannels),
    Running(Running),
    Stopped,
}

/// Receiving ends held until `start` hands them to the worker.
struct WorkerChannels {
    work_rx: Receiver<()>,
    completed_rx: Receiver<CommandId>,
}

/// A long-lived, strictly ordered conversation with one engine process.
pub struct EngineSession {
    config: SessionConfig,
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
    completions_rx: Receiver<Completion>,
    verbose_rx: Receiver<String>,
}

impl EngineSession {
    pub fn new(config: SessionConfig) -> Self {
        let (work_tx, work_rx) = channel::unbounded();
        let (completed_tx, completed_rx) = channel::unbounded();
        let (completions_tx, completions_rx) = channel::unbounded();
        let (verbose_tx, verbose_rx) = channel::bounded(config.verbose_capacity);

        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                phase: Phase::NotStarted,
                queue: VecDeque::new(),
                next_id: 1,
                last_response: None,
                best_move: None,
                abandoned: VecDeque::new(),
            }),
            sync_reply: config.sync_reply.clone(),
            work_tx,
            completed_tx,
            completions_tx,
            verbose_tx,
            verbose_dropped: AtomicU64::new(0),
        });

        Self {
            config,
            shared,
            lifecycle: Mutex::new(Lifecycle::NotStarted(WorkerChannels { work_rx, completed_rx })),
            completions_rx,
            verbose_rx,
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Launch the engine and the worker. Fails on any call after the first
    /// successful one.
    #[instrument(skip_all)]
    pub fn start(&self, launcher: &dyn ProcessLauncher) -> EngineResult<()> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::NotStarted(_)) {
            return Err(EngineError::AlreadyStarted);
        }

        let shared = Arc::clone(&self.shared);
        let on_output: OutputCallback = Arc::new(move |line: Option<&str>| shared.on_output_line(line));
        let launched = launcher.launch(on_output)?;

        let Lifecycle::NotStarted(channels) = std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) else {
            return Err(EngineError::AlreadyStarted);
        };
        let input: SharedInput = Arc::new(Mutex::new(launched.input));
        let (shutdown_tx, shutdown_rx) = channel::bounded(1);
        let (exited_tx, exited_rx) = channel::bounded::<()>(0);

        self.shared.lock().phase = Phase::Running;
        let worker = Worker {
            shared: Arc::clone(&self.shared),
            input: Arc::clone(&input),
            sync_command: self.config.sync_command.clone(),
            interrupt_command: self.config.interrupt_command.clone(),
            response_timeout: self.config.response_timeout,
            work_rx: channels.work_rx,
            completed_rx: channels.completed_rx,
            shutdown_rx,
            _exited_tx: exited_tx,
        };
        let spawned = thread::Builder::new()
            .name("engine-session".to_owned())
            .spawn(move || worker.run());
        let worker = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                let mut control = launched.control;
                let _ = control.terminate();
                self.shared.drain();
                return Err(err.into());
            }
        };

        *lifecycle = Lifecycle::Running(Running {
            input,
            control: launched.control,
            shutdown_tx,
            exited_rx,
            worker,
        });
        info!("engine session started");
        Ok(())
    }

    /// Queue `command`; an empty `expected_prefix` completes it on the sync reply.
    pub fn enqueue(&self, command: impl Into<String>, expected_prefix: &str) -> EngineResult<CommandId> {
        self.shared
            .enqueue(command.into(), Expectation::from_prefix(expected_prefix))
    }

    pub fn enqueue_with(&self, command: impl Into<String>, expect: Expectation) -> EngineResult<CommandId> {
        self.shared.enqueue(command.into(), expect)
    }

    /// Completion events, one per command, in submission order.
    pub fn completions(&self) -> &Receiver<Completion> {
        &self.completions_rx
    }

    /// Every raw engine output line, before canonicalization.
    pub fn verbose(&self) -> &Receiver<String> {
        &self.verbose_rx
    }

    /// Engine lines lost because the verbose stream was full.
    pub fn verbose_dropped(&self) -> u64 {
        self.shared.verbose_dropped.load(Ordering::Relaxed)
    }

    /// Block until the completion for `id` arrives, discarding earlier ones.
    pub fn wait_for(&self, id: CommandId) -> EngineResult<String> {
        loop {
            let completion = self.completions_rx.recv().map_err(|_| EngineError::Stopped)?;
            if completion.id == id {
                return completion.result;
            }
            debug!(id = completion.id, "skipping completion while waiting for {id}");
        }
    }

    /// Enqueue and wait for this command's completion.
    pub fn request(&self, command: impl Into<String>, expected_prefix: &str) -> EngineResult<String> {
        let id = self.enqueue(command, expected_prefix)?;
        self.wait_for(id)
    }

    pub fn uci(&self) -> EngineResult<String> {
        self.request(protocol::UCI, protocol::UCI_OK)
    }

    pub fn is_ready(&self) -> EngineResult<String> {
        self.request(protocol::IS_READY, protocol::READY_OK)
    }

    pub fn new_game(&self) -> EngineResult<()> {
        self.request(protocol::UCI_NEW_GAME, "").map(drop)
    }

    pub fn set_position(&self, fen: &str) -> EngineResult<()> {
        self.request(protocol::position_fen(fen), "").map(drop)
    }

    pub fn set_option(&self, name: &str, value: &str) -> EngineResult<()> {
        self.request(protocol::set_option(name, value), "").map(drop)
    }

    /// Search for `millis` and return the best-move token, `None` if the
    /// engine reported no legal move.
    pub fn go_movetime(&self, millis: u64) -> EngineResult<Option<String>> {
        let reply = self.request(protocol::go_movetime(millis), BEST_MOVE)?;
        Ok(parse_best_move(&reply).map(str::to_owned))
    }

    pub fn last_response(&self) -> Option<String> {
        self.shared.lock().last_response.clone()
    }

    pub fn best_move(&self) -> Option<String> {
        self.shared.lock().best_move.clone()
    }

    /// Commands queued or in flight.
    pub fn pending(&self) -> usize {
        self.shared.lock().queue.len()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle(), Lifecycle::Running(_))
    }

    /// Quit the engine and shut the worker down.
    ///
    /// Still-queued commands complete with `Stopped`. If the worker or the
    /// process does not exit within the stop timeout the process is killed.
    /// Stopping twice is a no-op.
    #[instrument(skip_all)]
    pub fn stop(&self) -> EngineResult<()> {
        let mut lifecycle = self.lifecycle();
        let running = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Running(running) => running,
            Lifecycle::NotStarted(_) => {
                self.shared.drain();
                return Ok(());
            }
            Lifecycle::Stopped => return Ok(()),
        };
        let Running {
            input,
            mut control,
            shutdown_tx,
            exited_rx,
            worker,
        } = running;

        self.shared.lock().phase = Phase::Stopped;

        // Best effort: the worker may be holding the input mid-write.
        match input.try_lock() {
            Ok(mut input) => {
                if let Err(err) = writeln!(input, "{}", self.config.quit_command).and_then(|_| input.flush()) {
                    debug!(error = %err, "quit command not delivered");
                }
            }
            Err(_) => warn!("engine input busy, skipping quit command"),
        }

        let _ = shutdown_tx.try_send(());
        let deadline = Instant::now() + self.config.stop_timeout;
        let worker_exited = match exited_rx.recv_timeout(self.config.stop_timeout) {
            Err(RecvTimeoutError::Disconnected) | Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => false,
        };
        if worker_exited {
            if worker.join().is_err() {
                warn!("engine worker panicked");
            }
        } else {
            warn!("engine worker did not exit in time");
        }

        let mut result = Ok(());
        if !wait_for_exit(control.as_mut(), deadline) {
            warn!("engine process still running, terminating");
            result = control.terminate();
        }

        self.shared.drain();
        let dropped = self.verbose_dropped();
        if dropped > 0 {
            warn!(dropped, "verbose engine output lines were dropped");
        }
        info!("engine session stopped");
        result
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                warn!(error = %err, "engine session stop failed during drop");
            }
        }
    }
}

/// Poll for process exit until `deadline`.
fn wait_for_exit(control: &mut dyn ProcessControl, deadline: Instant) -> bool {
    loop {
        match control.has_exited() {
            Ok(true) => return true,
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "could not query engine process state");
                return false;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(10));
    }
}
