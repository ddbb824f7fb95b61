//! Subprocess execution with concurrent stream draining and a hard timeout

use std::io::{self, ErrorKind, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{error::Result, types::RunnerInvocation};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
/// How long the pipes may stay open after the runner exited, when the timeout is already spent
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Everything observed about one finished (or killed) runner process
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    pub signal: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// stdout followed by stderr, as written to the text capture
    pub fn combined(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&self.stderr);
        }
        combined
    }
}

/// Run `invocation`, killing it (and its process group on unix) once `timeout` expires
pub fn execute(invocation: &RunnerInvocation, timeout: Duration) -> Result<ProcessOutput> {
    let mut cmd = Command::new(invocation.program());
    cmd.args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = invocation.working_dir() {
        cmd.current_dir(dir);
    }
    for (key, value) in invocation.env_vars() {
        cmd.env(key, value);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    debug!("Executing: {}", invocation.to_shell_command());
    let started = Instant::now();
    let mut child = cmd.spawn().map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to start {}: {e}", invocation.program().display()),
        )
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = started + timeout;
    let mut timed_out = false;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!(
                "Runner exceeded {}s timeout, terminating pid {}",
                timeout.as_secs_f64(),
                child.id()
            );
            timed_out = true;
            terminate(&mut child);
            break child.wait()?;
        }
        thread::sleep(POLL_INTERVAL);
    };
    // Background jobs left in the group would keep the pipes open
    kill_group(&child);
    let elapsed = started.elapsed();

    let drain_until = deadline.max(Instant::now() + DRAIN_GRACE);
    Ok(ProcessOutput {
        exit_code: status.code(),
        signal: signal_of(&status),
        timed_out,
        stdout: finish(stdout, drain_until),
        stderr: finish(stderr, drain_until),
        elapsed,
    })
}

/// A stream read on its own thread; `done` fires at end of stream
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

fn drain<R: Read + Send + 'static>(stream: Option<R>) -> Option<Drain> {
    stream.map(|mut stream| {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let (tx, done) = mpsc::channel();
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Ok(mut buf) = sink.lock() {
                            buf.extend_from_slice(&chunk[..n]);
                        }
                    }
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        });
        Drain { buf, done }
    })
}

/// Wait for end of stream until `until`, then take whatever was read
fn finish(drain: Option<Drain>, until: Instant) -> String {
    let Some(drain) = drain else {
        return String::new();
    };
    let wait = until.saturating_duration_since(Instant::now());
    if drain.done.recv_timeout(wait).is_err() {
        warn!("Runner output still open after exit; keeping what was read so far");
    }
    let bytes = drain.buf.lock().map(|buf| buf.clone()).unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    // The child leads its own group; the group outlives it while members remain
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    kill_group(child);
    let _ = child.kill();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(unix)]
fn signal_of(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn signal_of(_status: &ExitStatus) -> Option<i32> {
    None
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::runner::RunnerProfile;

    fn sh(script: &str) -> RunnerInvocation {
        RunnerInvocation::new(
            RunnerProfile::Modern,
            "/bin/sh",
            vec!["-c".to_string(), script.to_string()],
        )
    }

    #[test]
    fn test_captures_both_streams_and_exit_code() {
        let output =
            execute(&sh("echo out; echo err >&2; exit 3"), Duration::from_secs(10)).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "out\n");
        assert_eq!(output.stderr, "err\n");
        assert!(!output.timed_out);
        assert_eq!(output.combined(), "out\nerr\n");
    }

    #[test]
    fn test_large_output_does_not_deadlock() {
        let output = execute(
            &sh("i=0; while [ $i -lt 20000 ]; do echo line-$i; echo err-$i >&2; i=$((i+1)); done"),
            Duration::from_secs(30),
        )
        .unwrap();
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout.lines().count(), 20000);
        assert_eq!(output.stderr.lines().count(), 20000);
    }

    #[test]
    fn test_timeout_kills_process_group() {
        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let output = execute(&sh("sleep 30 & sleep 30; wait"), timeout).unwrap();
        assert!(output.timed_out);
        assert_eq!(output.exit_code, None);
        assert!(started.elapsed() < timeout + Duration::from_secs(5));
    }

    #[test]
    fn test_background_job_cannot_hold_the_call_open() {
        let timeout = Duration::from_secs(1);
        let started = Instant::now();
        let output = execute(&sh("sleep 8 & echo done; exit 0"), timeout).unwrap();
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert!(!output.timed_out);
        assert_eq!(output.exit_code, Some(0));
        assert_eq!(output.stdout, "done\n");
    }

    #[test]
    fn test_env_and_working_dir_are_applied() {
        let dir = tempfile::TempDir::new().unwrap();
        let invocation = sh("printf '%s|' \"$PHPBRIDGE_TEST_VALUE\"; pwd")
            .with_env("PHPBRIDGE_TEST_VALUE", "hello")
            .with_working_dir(dir.path());
        let output = execute(&invocation, Duration::from_secs(10)).unwrap();
        let (value, cwd) = output.stdout.trim_end().split_once('|').unwrap();
        assert_eq!(value, "hello");
        assert_eq!(
            std::fs::canonicalize(cwd).unwrap(),
            std::fs::canonicalize(dir.path()).unwrap()
        );
    }

    #[test]
    fn test_spawn_failure_names_program() {
        let invocation =
            RunnerInvocation::new(RunnerProfile::Modern, "/nonexistent/php", Vec::new());
        let err = execute(&invocation, Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/php"));
    }
}
