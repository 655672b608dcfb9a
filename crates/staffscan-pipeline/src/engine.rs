// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Optical music recognition engine — the capability the pipeline calls to
// turn an image into a score file, and its subprocess implementation.
//
// The engine contract: given the absolute path of an image, write
// `<same dir>/<same stem>.<score ext>` and exit 0. Nothing else about the
// engine's behaviour is relied upon.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use staffscan_core::EngineConfig;
use staffscan_core::error::{Result, ScanError};
use tracing::{debug, info, instrument, warn};

/// How often a running engine is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// What the engine reported when it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EngineOutput {
    /// Success is defined solely by exit code zero.
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// A recognizer that can be swapped for an in-process or networked one
/// without touching the orchestrator.
pub trait RecognitionEngine: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Run recognition on the image at `image_path`.
    ///
    /// `Err` means the engine could not be run to completion (not found,
    /// timed out); a completed run with a non-zero exit is `Ok` and left to
    /// the caller to judge.
    fn invoke(&self, image_path: &Path) -> Result<EngineOutput>;
}

/// Runs the engine as a child process: `program [args..] <image>`.
///
/// No shell is involved. Output streams are redirected to log files next to
/// the image (avoiding pipe-buffer deadlocks on chatty engines) and read back
/// once the process exits.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone(), config.timeout())
    }

    fn log_paths(image: &Path) -> (PathBuf, PathBuf) {
        let dir = image.parent().unwrap_or_else(|| Path::new("."));
        (dir.join("engine-stdout.log"), dir.join("engine-stderr.log"))
    }
}

impl RecognitionEngine for CommandEngine {
    fn name(&self) -> &str {
        &self.program
    }

    #[instrument(skip(self), fields(engine = %self.program, image = %image_path.display()))]
    fn invoke(&self, image_path: &Path) -> Result<EngineOutput> {
        let image = std::path::absolute(image_path)?;
        let (stdout_path, stderr_path) = Self::log_paths(&image);
        let stdout_log = File::create(&stdout_path)?;
        let stderr_log = File::create(&stderr_path)?;

        info!(args = ?self.args, "launching recognition engine");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(&image)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_log))
            .stderr(Stdio::from(stderr_log))
            .spawn()
            .map_err(|err| {
                ScanError::ExternalTool(format!("could not launch {}: {err}", self.program))
            })?;

        let started = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if started.elapsed() >= self.timeout => {
                    warn!(timeout = ?self.timeout, "engine exceeded its time limit; killing it");
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ScanError::ExternalTool(format!(
                        "{} timed out after {}s",
                        self.program,
                        self.timeout.as_secs_f32()
                    )));
                }
                Ok(None) => thread::sleep(POLL_INTERVAL.min(self.timeout)),
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ScanError::ExternalTool(format!(
                        "failed waiting for {}: {err}",
                        self.program
                    )));
                }
            }
        };

        let output = EngineOutput {
            exit_code: status.code(),
            stdout: read_log(&stdout_path),
            stderr: read_log(&stderr_path),
        };
        debug!(
            exit_code = ?output.exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "engine finished"
        );
        Ok(output)
    }
}

fn read_log(path: &Path) -> String {
    std::fs::read(path)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell_engine(script: &str, timeout: Duration) -> CommandEngine {
        CommandEngine::new(
            "sh",
            vec!["-c".into(), script.into(), "fake-omr".into()],
            timeout,
        )
    }

    #[test]
    fn passes_absolute_image_path_as_last_argument() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page.png");
        std::fs::write(&image, b"png").unwrap();

        let engine = shell_engine(r#"printf '%s' "$1""#, Duration::from_secs(10));
        let output = engine.invoke(&image).unwrap();

        assert!(output.succeeded());
        assert_eq!(PathBuf::from(output.stdout), std::path::absolute(&image).unwrap());
    }

    #[test]
    fn non_zero_exit_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page.png");
        let engine = shell_engine("echo 'model missing' >&2; exit 3", Duration::from_secs(10));

        let output = engine.invoke(&image).unwrap();

        assert!(!output.succeeded());
        assert_eq!(output.exit_code, Some(3));
        assert!(output.stderr.contains("model missing"));
    }

    #[test]
    fn hung_engine_is_killed_after_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("page.png");
        let engine = shell_engine("sleep 30", Duration::from_millis(300));

        let started = Instant::now();
        let err = engine.invoke(&image).unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(matches!(err, ScanError::ExternalTool(ref msg) if msg.contains("timed out")));
    }

    #[test]
    fn missing_program_is_an_external_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let engine = CommandEngine::new(
            "/nonexistent/staffscan-omr",
            Vec::new(),
            Duration::from_secs(1),
        );
        let err = engine.invoke(&dir.path().join("page.png")).unwrap_err();
        assert!(matches!(err, ScanError::ExternalTool(ref msg) if msg.contains("could not launch")));
    }
}
