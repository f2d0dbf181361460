//! External process execution
//!
//! Toolchain executables run through a [`ProcessRunner`] so builds can be
//! driven by a scripted runner in tests. The system runner captures stdout
//! and stderr and reports the exit code; a non-zero exit is not an error
//! at this level.

use crate::error::{BuildError, BuildResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::debug;

/// A single process launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    /// Executable to run
    pub executable: PathBuf,
    /// Working directory; inherited when `None`
    pub working_dir: Option<PathBuf>,
    /// Arguments, in order
    pub args: Vec<String>,
    /// Text written to the process's standard input
    pub input: Option<String>,
}

impl ProcessInvocation {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_dir: None,
            args: Vec::new(),
            input: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Command line for logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub execution_time: Duration,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Combined output, stdout first
    pub fn output(&self) -> String {
        let mut output = String::new();
        if !self.stdout.is_empty() {
            output.push_str(&self.stdout);
            if !self.stdout.ends_with('\n') {
                output.push('\n');
            }
        }
        output.push_str(&self.stderr);
        output
    }
}

/// Runs processes and captures their output
pub trait ProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> BuildResult<ProcessOutput>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, invocation: &ProcessInvocation) -> BuildResult<ProcessOutput> {
        (**self).run(invocation)
    }
}

/// Runs processes on the host system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> BuildResult<ProcessOutput> {
        debug!(command = %invocation.command_line(), "launching process");
        let start = Instant::now();

        let mut command = Command::new(&invocation.executable);
        command
            .args(&invocation.args)
            .stdin(if invocation.input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| launch_error(&invocation.executable, e))?;

        if let (Some(input), Some(mut stdin)) = (&invocation.input, child.stdin.take()) {
            stdin
                .write_all(input.as_bytes())
                .map_err(|e| launch_error(&invocation.executable, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| launch_error(&invocation.executable, e))?;

        let result = ProcessOutput {
            exit_code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            execution_time: start.elapsed(),
        };
        debug!(
            exit_code = result.exit_code,
            elapsed_ms = result.execution_time.as_millis() as u64,
            "process finished"
        );
        Ok(result)
    }
}

fn launch_error(executable: &Path, error: std::io::Error) -> BuildError {
    if error.kind() == std::io::ErrorKind::NotFound {
        BuildError::ExecutableNotFound(executable.to_path_buf())
    } else {
        BuildError::ProcessLaunch {
            executable: executable.to_path_buf(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let invocation = ProcessInvocation::new("/jdk/bin/javac")
            .with_working_dir("/project")
            .arg("-d")
            .arg("outputs")
            .args(["A.java", "B.java"]);

        assert_eq!(invocation.args, vec!["-d", "outputs", "A.java", "B.java"]);
        assert_eq!(invocation.working_dir, Some(PathBuf::from("/project")));
        assert_eq!(
            invocation.command_line(),
            "/jdk/bin/javac -d outputs A.java B.java"
        );
    }

    #[test]
    fn test_output_success() {
        let ok = ProcessOutput::default();
        assert!(ok.success());

        let failed = ProcessOutput {
            exit_code: 2,
            ..ProcessOutput::default()
        };
        assert!(!failed.success());
    }

    #[test]
    fn test_combined_output() {
        let output = ProcessOutput {
            exit_code: 0,
            stdout: "out".to_string(),
            stderr: "err\n".to_string(),
            execution_time: Duration::ZERO,
        };
        assert_eq!(output.output(), "out\nerr\n");
    }

    #[test]
    fn test_missing_executable() {
        let invocation = ProcessInvocation::new("/definitely/not/a/real/executable");
        let err = SystemProcessRunner::new().run(&invocation).unwrap_err();
        assert!(matches!(err, BuildError::ExecutableNotFound(_)));
        assert!(err.is_not_found());
    }

    #[cfg(unix)]
    #[test]
    fn test_captures_output_and_exit_code() {
        let invocation = ProcessInvocation::new("sh")
            .arg("-c")
            .arg("cat; echo oops >&2; exit 3")
            .with_input("hello");
        let output = SystemProcessRunner::new().run(&invocation).unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout, "hello");
        assert_eq!(output.stderr, "oops\n");
    }
}
