//! Pipe chain execution under a single deadline
//!
//! Every stage of one run joins a process group led by the first stage, so a
//! timeout can take down the whole chain (including grandchildren) with one
//! signal, while concurrent runs stay isolated from each other.

use crate::audit::{log_execution_completed, log_execution_started, AuditEvent};
use crate::pipeline::{render_pipeline, PipelineStage};
use helmfile_mcp_common::{ErrorSeverity, Severity};
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// How long to wait for pipe readers to drain after the chain was killed
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Default cap on captured bytes per output stream
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Appended to a stream that hit the capture cap
pub const TRUNCATION_MARKER: &str = "\n[output truncated]\n";

/// Outcome of a chain that ran to completion or was stopped by the deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code of the last stage; `-1` when timed out or killed by a signal
    pub exit_code: i32,
    /// Standard output of the last stage
    pub stdout: String,
    /// Standard error of every stage, in stage order
    pub stderr: String,
    /// Whether any stream hit the capture cap
    pub truncated: bool,
    /// Wall time from first spawn to completion
    pub duration: Duration,
    /// Whether the deadline fired
    pub timed_out: bool,
}

/// Failures that prevent a chain from producing an [`ExecutionResult`]
#[derive(Debug, Error)]
pub enum RunError {
    /// Nothing to run
    #[error("No pipeline stages to run")]
    EmptyPipeline,

    /// Requested working directory is missing or not a directory
    #[error("Working directory does not exist: {}", path.display())]
    WorkingDirectory {
        /// The requested directory
        path: PathBuf,
    },

    /// A stage could not be started
    #[error("Failed to spawn '{executable}': {source}")]
    Spawn {
        /// Program of the failing stage
        executable: String,
        #[source]
        /// Underlying IO error
        source: io::Error,
    },

    /// Plumbing between stages or waiting on a stage failed
    #[error("I/O error while running '{executable}': {source}")]
    Io {
        /// Program of the affected stage
        executable: String,
        #[source]
        /// Underlying IO error
        source: io::Error,
    },
}

impl Severity for RunError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            RunError::EmptyPipeline | RunError::WorkingDirectory { .. } => ErrorSeverity::Warning,
            RunError::Spawn { .. } | RunError::Io { .. } => ErrorSeverity::Error,
        }
    }
}

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Deadline for the whole chain, measured from the first spawn
    pub timeout: Duration,
    /// Delay between SIGTERM and SIGKILL once the deadline fired
    pub termination_grace: Duration,
    /// Working directory for every stage; inherited when `None`
    pub working_directory: Option<PathBuf>,
    /// Emit audit events for this run
    pub audit: bool,
    /// Bytes kept per stream; the rest is read and discarded
    pub max_output_bytes: usize,
}

impl RunOptions {
    /// Options with the given timeout and a five second grace period
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            termination_grace: Duration::from_secs(5),
            working_directory: None,
            audit: true,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// Bytes captured from one stream, up to the configured cap
#[derive(Debug, Default)]
struct CapturedOutput {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CapturedOutput {
    fn append(&mut self, chunk: &[u8], limit: usize) {
        let room = limit.saturating_sub(self.bytes.len());
        if chunk.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&chunk[..chunk.len().min(room)]);
    }

    fn render(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.bytes).into_owned();
        if self.truncated {
            text.push_str(TRUNCATION_MARKER);
        }
        text
    }
}

type SharedBuffer = Arc<Mutex<CapturedOutput>>;

/// Run the stages as one pipe chain
///
/// Stage 1 reads from `/dev/null`; each later stage reads the previous
/// stage's stdout. The last stage's exit status decides the result.
pub async fn run_pipeline(
    stages: &[PipelineStage],
    options: &RunOptions,
) -> Result<ExecutionResult, RunError> {
    if stages.is_empty() {
        return Err(RunError::EmptyPipeline);
    }

    if let Some(dir) = &options.working_directory {
        if !dir.is_dir() {
            return Err(RunError::WorkingDirectory { path: dir.clone() });
        }
    }

    let rendered = render_pipeline(stages);
    let audit_event = AuditEvent::new(rendered.clone(), options.working_directory.as_deref());
    if options.audit {
        log_execution_started(&audit_event);
    }

    let start = Instant::now();
    let deadline = start + options.timeout;

    let mut group = ProcessGroup::default();
    let stdout_buffer = SharedBuffer::default();
    let mut stderr_buffers = Vec::with_capacity(stages.len());
    let mut readers = Vec::with_capacity(stages.len() + 1);
    let mut previous_stdout: Option<tokio::process::ChildStdout> = None;

    for (index, stage) in stages.iter().enumerate() {
        let is_last = index + 1 == stages.len();

        let mut command = Command::new(&stage.executable);
        command
            .args(&stage.arguments)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &options.working_directory {
            command.current_dir(dir);
        }

        match previous_stdout.take() {
            Some(upstream) => {
                let stdin: Stdio = match upstream.try_into() {
                    Ok(stdin) => stdin,
                    Err(source) => {
                        group.abort().await;
                        return Err(RunError::Io {
                            executable: stage.executable.clone(),
                            source,
                        });
                    }
                };
                command.stdin(stdin);
            }
            None => {
                command.stdin(Stdio::null());
            }
        }

        #[cfg(unix)]
        command.process_group(group.leader_pid().map_or(0, |pid| pid as i32));

        debug!(
            stage = index,
            command = %stage.command_line(),
            "Spawning pipeline stage"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!(
                    executable = %stage.executable,
                    "Failed to spawn pipeline stage: {}",
                    source
                );
                group.abort().await;
                return Err(RunError::Spawn {
                    executable: stage.executable.clone(),
                    source,
                });
            }
        };

        let stderr_buffer = SharedBuffer::default();
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(
                stderr,
                stderr_buffer.clone(),
                options.max_output_bytes,
            ));
        }
        stderr_buffers.push(stderr_buffer);

        if is_last {
            if let Some(stdout) = child.stdout.take() {
                readers.push(spawn_reader(
                    stdout,
                    stdout_buffer.clone(),
                    options.max_output_bytes,
                ));
            }
        } else {
            previous_stdout = child.stdout.take();
        }

        group.push(stage.executable.clone(), child);
    }

    let completion = timeout_at(deadline, async {
        let statuses = group.wait_all().await?;
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
        Ok::<_, RunError>(statuses)
    })
    .await;

    let (exit_code, timed_out) = match completion {
        Ok(Ok(statuses)) => (statuses.last().map_or(-1, exit_code_of), false),
        Ok(Err(e)) => {
            group.abort().await;
            return Err(e);
        }
        Err(_) => {
            warn!(
                command = %rendered,
                timeout_secs = options.timeout.as_secs(),
                "Pipeline timed out, terminating process group"
            );
            group.terminate(options.termination_grace).await;
            drain_readers(&mut readers).await;
            (-1, true)
        }
    };

    let (stdout, mut truncated) = {
        let captured = stdout_buffer.lock().await;
        (captured.render(), captured.truncated)
    };
    let mut stderr = String::new();
    for buffer in &stderr_buffers {
        let captured = buffer.lock().await;
        stderr.push_str(&captured.render());
        truncated |= captured.truncated;
    }
    if truncated {
        warn!(
            command = %rendered,
            max_output_bytes = options.max_output_bytes,
            "Pipeline output exceeded the capture limit and was truncated"
        );
    }

    let result = ExecutionResult {
        exit_code,
        stdout,
        stderr,
        truncated,
        duration: start.elapsed(),
        timed_out,
    };

    info!(
        command = %rendered,
        exit_code = result.exit_code,
        duration_ms = result.duration.as_millis() as u64,
        timed_out = result.timed_out,
        "Pipeline finished"
    );
    if options.audit {
        log_execution_completed(&audit_event.with_result(&result));
    }

    Ok(result)
}

fn spawn_reader<R>(mut reader: R, buffer: SharedBuffer, limit: usize) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut chunk = [0u8; 8192];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => buffer.lock().await.append(&chunk[..n], limit),
                Err(e) => {
                    debug!("Pipe reader stopped: {}", e);
                    break;
                }
            }
        }
    })
}

/// Wait briefly for readers still holding pipes, then abandon them
async fn drain_readers(readers: &mut [JoinHandle<()>]) {
    for reader in readers.iter_mut() {
        if reader.is_finished() {
            continue;
        }
        if timeout(READER_DRAIN_TIMEOUT, &mut *reader).await.is_err() {
            debug!("Abandoning pipe reader after termination");
            reader.abort();
        }
    }
}

fn exit_code_of(status: &ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Children of one run, sharing a process group led by the first stage
///
/// Dropping the group before it was reaped sends SIGKILL to every member.
#[derive(Default)]
struct ProcessGroup {
    children: Vec<(String, Child)>,
    leader: Option<u32>,
    reaped: bool,
}

impl ProcessGroup {
    fn leader_pid(&self) -> Option<u32> {
        self.leader
    }

    fn push(&mut self, executable: String, child: Child) {
        if self.leader.is_none() {
            self.leader = child.id();
        }
        self.children.push((executable, child));
    }

    async fn wait_all(&mut self) -> Result<Vec<ExitStatus>, RunError> {
        let mut statuses = Vec::with_capacity(self.children.len());
        for (executable, child) in self.children.iter_mut() {
            let status = child.wait().await.map_err(|source| RunError::Io {
                executable: executable.clone(),
                source,
            })?;
            debug!(executable = %executable, status = ?status, "Pipeline stage exited");
            statuses.push(status);
        }
        self.reaped = true;
        Ok(statuses)
    }

    /// SIGTERM, then SIGKILL once the grace period expires
    async fn terminate(&mut self, grace: Duration) {
        self.signal_all(GroupSignal::Terminate);
        if timeout(grace, self.reap()).await.is_err() {
            warn!("Process group ignored SIGTERM, sending SIGKILL");
            self.signal_all(GroupSignal::Kill);
            self.reap().await;
        }
    }

    /// Immediate SIGKILL, used when the chain cannot be completed
    async fn abort(&mut self) {
        if self.children.is_empty() {
            return;
        }
        self.signal_all(GroupSignal::Kill);
        self.reap().await;
    }

    async fn reap(&mut self) {
        for (executable, child) in self.children.iter_mut() {
            if let Err(e) = child.wait().await {
                warn!(executable = %executable, "Failed to reap pipeline stage: {}", e);
            }
        }
        self.reaped = true;
    }

    fn signal_all(&mut self, signal: GroupSignal) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Some(leader) = self.leader {
                let unix_signal = match signal {
                    GroupSignal::Terminate => Signal::SIGTERM,
                    GroupSignal::Kill => Signal::SIGKILL,
                };
                if let Err(e) = killpg(Pid::from_raw(leader as i32), unix_signal) {
                    debug!("killpg({}, {:?}) failed: {}", leader, unix_signal, e);
                }
            }
        }

        if matches!(signal, GroupSignal::Kill) || cfg!(not(unix)) {
            for (_, child) in self.children.iter_mut() {
                let _ = child.start_kill();
            }
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if !self.reaped && !self.children.is_empty() {
            warn!("Process group dropped before completion, killing it");
            self.signal_all(GroupSignal::Kill);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupSignal {
    Terminate,
    Kill,
}
