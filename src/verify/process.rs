// SPDX-License-Identifier: PMPL-1.0-or-later

//! External verifier process execution with a wall-clock deadline.

use super::{ExitKind, Invocation, TreeInputs, Verifier};
use crate::config::{VerifierConfig, VerifierMode};
use crate::diagnostics::{self, Diagnostic};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const CONTAINER_DATA_DIR: &str = "/data";
const POLL_INTERVAL: Duration = Duration::from_millis(20);
const OUTPUT_GRACE: Duration = Duration::from_secs(2);

pub struct ProcessVerifier {
    config: VerifierConfig,
}

impl ProcessVerifier {
    pub fn new(config: VerifierConfig) -> Self {
        Self { config }
    }

    fn container_name(label: &str) -> String {
        format!("attack-diag-{}-{}", label, std::process::id())
    }

    fn tool_args(&self, query: &str, model: &str) -> Vec<String> {
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{query}", query).replace("{model}", model))
            .collect()
    }

    /// Program and argument list for one tree.
    pub fn command_line(&self, inputs: &TreeInputs) -> Result<(String, Vec<String>)> {
        match self.config.mode {
            VerifierMode::Direct => {
                let args = self.tool_args(
                    &inputs.query.to_string_lossy(),
                    &inputs.model.to_string_lossy(),
                );
                Ok((self.config.program.clone(), args))
            }
            VerifierMode::Container => {
                let (model_dir, model_name) = split_path(&inputs.model)?;
                let (query_dir, query_name) = split_path(&inputs.query)?;
                let model_mount = format!("{}/models", CONTAINER_DATA_DIR);
                let query_mount = format!("{}/queries", CONTAINER_DATA_DIR);

                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "--name".to_string(),
                    Self::container_name(&inputs.label),
                    "-v".to_string(),
                    format!("{}:{}:ro", model_dir.display(), model_mount),
                    "-v".to_string(),
                    format!("{}:{}:ro", query_dir.display(), query_mount),
                    self.config.image.clone(),
                    self.config.program.clone(),
                ];
                args.extend(self.tool_args(
                    &format!("{}/{}", query_mount, query_name),
                    &format!("{}/{}", model_mount, model_name),
                ));
                Ok((self.config.runtime.clone(), args))
            }
        }
    }

    fn kill_container(&self, label: &str) {
        let name = Self::container_name(label);
        let result = Command::new(&self.config.runtime)
            .args(["kill", &name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        if let Err(err) = result {
            log::warn!("could not kill container {}: {}", name, err);
        }
    }
}

fn split_path(path: &Path) -> Result<(PathBuf, String)> {
    let absolute = path
        .canonicalize()
        .with_context(|| format!("resolving {}", path.display()))?;
    let dir = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok((dir, name))
}

impl Verifier for ProcessVerifier {
    fn name(&self) -> String {
        match self.config.mode {
            VerifierMode::Direct => self.config.program.clone(),
            VerifierMode::Container => format!("{} ({})", self.config.program, self.config.image),
        }
    }

    fn invoke(&self, inputs: &TreeInputs, timeout: Duration) -> Invocation {
        let start = Instant::now();
        let (program, args) = match self.command_line(inputs) {
            Ok(cmd) => cmd,
            Err(err) => {
                return Invocation {
                    command: self.config.program.clone(),
                    exit: ExitKind::SpawnFailed(format!("{:#}", err)),
                    stdout: String::new(),
                    stderr: String::new(),
                    elapsed: start.elapsed(),
                }
            }
        };
        let command = std::iter::once(program.as_str())
            .chain(args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");
        log::debug!("{}: {}", inputs.label, command);

        let mut invocation = run_with_deadline(&program, &args, timeout);
        invocation.command = command;
        if invocation.exit == ExitKind::TimedOut && self.config.mode == VerifierMode::Container {
            self.kill_container(&inputs.label);
        }
        invocation
    }

    fn preflight(&self) -> Vec<Diagnostic> {
        vec![diagnostics::tool_check(&self.config)]
    }
}

/// Read `source` to the end. A failed read keeps what arrived and appends a
/// note so the truncation shows up in the per-tree log.
fn read_all<R: Read>(mut source: R, stream: &str) -> String {
    let mut buf = Vec::new();
    let result = source.read_to_end(&mut buf);
    let mut text = String::from_utf8_lossy(&buf).to_string();
    if let Err(err) = result {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&format!("[attack-diag: reading {} failed: {}]\n", stream, err));
    }
    text
}

fn drain<R: Read + Send + 'static>(source: Option<R>, stream: &'static str) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let text = source
            .map(|source| read_all(source, stream))
            .unwrap_or_default();
        // the receiver is gone once the runner stopped waiting
        let _ = tx.send(text);
    });
    rx
}

/// Output of a stream, or a note when its pipe is still open at `deadline`.
fn collect(output: &Receiver<String>, stream: &str, deadline: Instant) -> String {
    match output.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => text,
        Err(_) => format!(
            "[attack-diag: {} still open {}ms after the process ended; output dropped]\n",
            stream,
            OUTPUT_GRACE.as_millis()
        ),
    }
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill the child and, on unix, every process in its group.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let result = Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
        match result {
            Ok(status) if status.success() => {}
            Ok(status) => log::debug!("kill of process group {} exited with {}", group, status),
            Err(err) => log::warn!("could not kill process group {}: {}", group, err),
        }
    }
    // already gone when the group kill reached it
    let _ = child.kill();
}

fn wait_until_deadline(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            kill_process_tree(child);
            if let Err(err) = child.wait() {
                log::warn!("reaping killed process {}: {}", child.id(), err);
            }
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn exit_kind(status: ExitStatus) -> ExitKind {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => ExitKind::Exited(code),
        None => ExitKind::Signaled(status.signal()),
    }
}

#[cfg(not(unix))]
fn exit_kind(status: ExitStatus) -> ExitKind {
    match status.code() {
        Some(code) => ExitKind::Exited(code),
        None => ExitKind::Signaled(None),
    }
}

/// Run `program` and kill it, with everything it started, once `timeout`
/// has elapsed. Both output pipes are drained on helper threads so a verbose
/// tool cannot stall on a full pipe buffer; a pipe inherited by a process
/// outside the group is abandoned after `OUTPUT_GRACE`.
pub fn run_with_deadline(program: &str, args: &[String], timeout: Duration) -> Invocation {
    let start = Instant::now();
    let command = program.to_string();

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    own_process_group(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return Invocation {
                command,
                exit: ExitKind::SpawnFailed(err.to_string()),
                stdout: String::new(),
                stderr: String::new(),
                elapsed: start.elapsed(),
            }
        }
    };

    let stdout = drain(child.stdout.take(), "stdout");
    let stderr = drain(child.stderr.take(), "stderr");

    let exit = match wait_until_deadline(&mut child, timeout) {
        Ok(Some(status)) => exit_kind(status),
        Ok(None) => ExitKind::TimedOut,
        Err(err) => ExitKind::SpawnFailed(format!("waiting for process: {}", err)),
    };
    let output_deadline = Instant::now() + OUTPUT_GRACE;
    let stdout = collect(&stdout, "stdout", output_deadline);
    let stderr = collect(&stderr, "stderr", output_deadline);

    Invocation {
        command,
        exit,
        stdout,
        stderr,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(dir: &Path) -> TreeInputs {
        let model = dir.join("tree_001.xml");
        let query = dir.join("tree_001.q");
        std::fs::write(&model, "<pnml/>").unwrap();
        std::fs::write(&query, "EF true").unwrap();
        TreeInputs {
            label: "tree_001".into(),
            model,
            query,
        }
    }

    #[test]
    fn test_container_command_line_mounts_inputs() {
        let dir = tempfile::TempDir::new().unwrap();
        let verifier = ProcessVerifier::new(VerifierConfig::default());
        let (program, args) = verifier.command_line(&inputs(dir.path())).unwrap();

        assert_eq!(program, "docker");
        assert_eq!(&args[..2], &["run", "--rm"]);
        assert!(args.contains(&"tapaal/tapaal:3.9.2".to_string()));
        let tail: Vec<&str> = args.iter().rev().take(4).rev().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                "verifyta",
                "-q",
                "/data/queries/tree_001.q",
                "/data/models/tree_001.xml"
            ]
        );
        assert!(args.iter().any(|a| a.ends_with(":/data/models:ro")));
    }

    #[test]
    fn test_direct_command_line_uses_host_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = VerifierConfig {
            mode: VerifierMode::Direct,
            program: "verifypn64".into(),
            args: vec!["{model}".into(), "{query}".into()],
            ..VerifierConfig::default()
        };
        let tree = inputs(dir.path());
        let (program, args) = ProcessVerifier::new(config).command_line(&tree).unwrap();
        assert_eq!(program, "verifypn64");
        assert_eq!(
            args,
            vec![
                tree.model.to_string_lossy().to_string(),
                tree.query.to_string_lossy().to_string()
            ]
        );
    }

    #[test]
    fn test_spawn_failure_is_reported() {
        let inv = run_with_deadline(
            "/nonexistent/attack-diag-verifier",
            &[],
            Duration::from_secs(1),
        );
        assert!(matches!(inv.exit, ExitKind::SpawnFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_process() {
        let inv = run_with_deadline(
            "sh",
            &["-c".to_string(), "exec sleep 5".to_string()],
            Duration::from_millis(200),
        );
        assert_eq!(inv.exit, ExitKind::TimedOut);
        assert!(inv.elapsed < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_wrapped_children() {
        let started = Instant::now();
        let inv = run_with_deadline(
            "sh",
            &["-c".to_string(), "sleep 30; echo done".to_string()],
            Duration::from_millis(300),
        );
        let wall = started.elapsed();

        assert_eq!(inv.exit, ExitKind::TimedOut);
        assert!(wall < Duration::from_secs(5), "blocked for {:?}", wall);
        assert!(inv.elapsed >= Duration::from_millis(300));
        assert!(!inv.stdout.contains("done"));
    }

    #[cfg(unix)]
    #[test]
    fn test_escaped_pipe_holder_is_abandoned() {
        // setsid moves the sleeper out of the group while it keeps stdout open
        if diagnostics::find_in_path("setsid").is_none() {
            return;
        }
        let started = Instant::now();
        let inv = run_with_deadline(
            "sh",
            &["-c".to_string(), "setsid sleep 30 & echo started".to_string()],
            Duration::from_secs(5),
        );
        assert_eq!(inv.exit, ExitKind::Exited(0));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(inv.stdout.contains("still open"));
    }

    struct FailingReader {
        sent: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.sent {
                return Err(std::io::Error::other("device went away"));
            }
            self.sent = true;
            let chunk = b"Query is sat";
            buf[..chunk.len()].copy_from_slice(chunk);
            Ok(chunk.len())
        }
    }

    #[test]
    fn test_read_failure_is_noted() {
        let text = read_all(FailingReader { sent: false }, "stdout");
        assert!(text.starts_with("Query is sat\n"));
        assert!(text.contains("reading stdout failed: device went away"));
    }

    #[test]
    fn test_preflight_reports_unknown_program() {
        let config = VerifierConfig {
            mode: VerifierMode::Direct,
            program: "attack-diag-no-such-verifier".into(),
            ..VerifierConfig::default()
        };
        let checks = ProcessVerifier::new(config).preflight();
        assert!(diagnostics::has_errors(&checks));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_captured() {
        let inv = run_with_deadline(
            "sh",
            &[
                "-c".to_string(),
                "echo 'Query is satisfied'; echo warn >&2; exit 3".to_string(),
            ],
            Duration::from_secs(5),
        );
        assert_eq!(inv.exit, ExitKind::Exited(3));
        assert!(inv.stdout.contains("Query is satisfied"));
        assert!(inv.stderr.contains("warn"));
    }
}
