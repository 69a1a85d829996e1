//! Shell command plumbing

use std::{
    ffi::OsStr,
    fmt,
    process::{Command, Output},
};
use thiserror::Error;

/// Builds a [`CommandInvocation`] from a program and its arguments
///
/// ```
/// let cmd = labnet_device::cmd!("ip", "link", "set", "eth0", "up");
/// assert_eq!(cmd.to_string(), "ip link set eth0 up");
/// ```
#[macro_export]
macro_rules! cmd {
    ($cmd:expr) => {
        $crate::cmd::CommandInvocation::new($cmd)
    };

    ($cmd:expr, $($arg:expr),+) => {{
        let mut cmd = $crate::cmd::CommandInvocation::new($cmd);
        $(cmd.arg($arg);)+
        cmd
    }};
}

/// Repersents an Error that can occur when running a shell command
#[derive(Debug, Error)]
pub enum ShellCommandError {
    /// Input/Output error when launching the shell command
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Exited with a non-zero status (or was killed by a signal, in which case there is no code)
    #[error("command failed with {}; stderr: {stderr}", describe_code(.code))]
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".into(),
    }
}

impl ShellCommandError {
    /// Exit code of the failed command, if it ran far enough to produce one
    pub fn code(&self) -> Option<i32> {
        match self {
            ShellCommandError::Io(_) => None,
            ShellCommandError::Failed { code, .. } => *code,
        }
    }
}

/// One external operation: a program and its ordered arguments
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandInvocation {
    program: String,
    args: Vec<String>,
}

impl CommandInvocation {
    /// Returns a new invocation of `program` with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends an argument
    pub fn arg(&mut self, arg: impl Into<String>) {
        self.args.push(arg.into());
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Something that can execute a [`CommandInvocation`]
///
/// The configurator only ever talks to the OS through this trait, which lets tests substitute a
/// recording runner for the real shell.
pub trait Runner {
    /// Runs the invocation to completion, returning its stdout on success
    ///
    /// # Errors
    /// * `ShellCommandError::Io` - If the program could not be launched
    /// * `ShellCommandError::Failed` - If the program exited unsuccessfully
    fn run(&mut self, invocation: &CommandInvocation) -> Result<String, ShellCommandError>;
}

impl<R: Runner + ?Sized> Runner for &mut R {
    fn run(&mut self, invocation: &CommandInvocation) -> Result<String, ShellCommandError> {
        (**self).run(invocation)
    }
}

/// Runs invocations on the host through [`ShellCommand`]
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&mut self, invocation: &CommandInvocation) -> Result<String, ShellCommandError> {
        let mut cmd = ShellCommand::new(invocation.program());
        for arg in invocation.args() {
            cmd.arg(arg);
        }
        cmd.execute()
    }
}

/// A simple wrapper around a command that makes it easier to interact with and launch commands
/// quickly while still capturing the output
pub struct ShellCommand {
    cmd: Command,
}

impl ShellCommand {
    /// Returns a new shell command that will execute `cmd`
    ///
    /// # Arguments
    /// * `cmd` - Command to execute
    pub fn new<S: AsRef<OsStr>>(cmd: S) -> Self {
        ShellCommand {
            cmd: Command::new(cmd),
        }
    }

    /// Adds an argument to this shell command
    ///
    /// # Arguments
    /// * `arg` - Argument to add to the shell command
    pub fn arg<S: AsRef<OsStr>>(&mut self, arg: S) {
        self.cmd.arg(arg);
    }

    /// Helper function to parse the output from a shell command
    ///
    /// # Arguments
    /// * `output` - the captured output from stdout/stderr
    ///
    /// # Errors
    /// * `ShellCommandError::Failed` - If the return code is non-zero
    fn parse_output(output: Output) -> Result<String, ShellCommandError> {
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !stdout.is_empty() {
            tracing::debug!("command stdout:\n{}", stdout);
        }

        if !stderr.is_empty() {
            tracing::debug!("command stderr:\n{}", stderr);
        }

        match output.status.success() {
            true => Ok(stdout),
            false => Err(ShellCommandError::Failed {
                code: output.status.code(),
                stdout,
                stderr,
            }),
        }
    }

    /// Executes the command, blocking until it exits, capturing the output (stdout/stderr) for
    /// logging
    ///
    /// # Errors
    /// * `ShellCommandError::Io` - If launching/forking the command fails
    /// * `ShellCommandError::Failed` - If the return code is non-zero
    pub fn execute(mut self) -> Result<String, ShellCommandError> {
        tracing::debug!("command: {:?}", self.cmd);
        let output = self.cmd.output()?;
        Self::parse_output(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_displays_as_shell_line() {
        let cmd = crate::cmd!("ip", "addr", "add", "10.0.0.2/24", "dev", "eth0");
        assert_eq!(cmd.program(), "ip");
        assert_eq!(cmd.args().len(), 5);
        assert_eq!(cmd.to_string(), "ip addr add 10.0.0.2/24 dev eth0");
    }

    #[test]
    fn failed_error_reports_exit_code() {
        let error = ShellCommandError::Failed {
            code: Some(2),
            stdout: String::new(),
            stderr: "Cannot find device".into(),
        };
        assert_eq!(error.code(), Some(2));
        assert_eq!(
            error.to_string(),
            "command failed with exit code 2; stderr: Cannot find device"
        );
    }

    #[test]
    fn missing_program_is_io_error() {
        let r = SystemRunner.run(&crate::cmd!("labnet-definitely-not-a-real-program"));
        assert!(matches!(r, Err(ShellCommandError::Io(_))), "got {:?}", r);
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_captures_stdout_and_exit_code() {
        let out = SystemRunner.run(&crate::cmd!("sh", "-c", "echo hello")).unwrap();
        assert_eq!(out, "hello\n");

        let err = SystemRunner
            .run(&crate::cmd!("sh", "-c", "echo oops >&2; exit 3"))
            .unwrap_err();
        assert_eq!(err.code(), Some(3));
        match err {
            ShellCommandError::Failed { stderr, .. } => assert_eq!(stderr, "oops\n"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
