//! Blocking execution of external tools.
//!
//! Running a tool is the only suspension point in gvault: each call blocks until
//! the child process exits and captures its exit code and output. There is no
//! cancellation once a tool has started.

use crate::error::{Error, Result};
use crate::tools::{Tool, ToolLocator};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::Command;
use std::sync::Arc;

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub tool: Tool,
    pub program: Utf8PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<Utf8PathBuf>,
}

/// Exit code and captured output of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Stdout followed by stderr, for tools that report on either stream.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Runs an [`Invocation`] to completion.
pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ProcessOutput> {
        let mut command = Command::new(invocation.program.as_std_path());
        command.args(&invocation.args);
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd.as_std_path());
        }

        let output = command.output()?;
        Ok(ProcessOutput {
            // Killed by a signal
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Tool discovery plus process execution, injected into every component.
///
/// Cloning is cheap; the locator and runner are shared.
#[derive(Clone)]
pub struct Toolbox {
    locator: Arc<dyn ToolLocator>,
    runner: Arc<dyn CommandRunner>,
}

impl Toolbox {
    pub fn new(locator: impl ToolLocator + 'static, runner: impl CommandRunner + 'static) -> Self {
        Self {
            locator: Arc::new(locator),
            runner: Arc::new(runner),
        }
    }

    /// A toolbox that runs real processes found by `locator`.
    pub fn system(locator: impl ToolLocator + 'static) -> Self {
        Self::new(locator, SystemRunner)
    }

    pub fn locator(&self) -> &dyn ToolLocator {
        self.locator.as_ref()
    }

    pub fn is_available(&self, tool: Tool) -> bool {
        self.locator.locate(tool).is_some()
    }

    /// Resolve `tool` and build an invocation for it.
    pub fn invocation<I, S>(&self, tool: Tool, args: I, cwd: Option<&Utf8Path>) -> Result<Invocation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = self.locator.require(tool)?;
        Ok(Invocation {
            tool,
            program,
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.map(Utf8Path::to_path_buf),
        })
    }

    /// Run `tool` and return its output regardless of the exit code.
    pub fn output<I, S>(&self, tool: Tool, args: I, cwd: Option<&Utf8Path>) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = self.invocation(tool, args, cwd)?;
        tracing::debug!(
            "Running {} {}",
            invocation.program,
            invocation.args.join(" ")
        );

        self.runner
            .run(&invocation)
            .map_err(|source| Error::Spawn { tool, source })
    }

    /// Run `tool`, treating a non-zero exit code as failure.
    pub fn run<I, S>(&self, tool: Tool, args: I, cwd: Option<&Utf8Path>) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self.output(tool, args, cwd)?;
        if !output.success() {
            tracing::warn!("{} exited with code {}", tool, output.code);
            return Err(Error::ProcessFailed {
                tool,
                code: output.code,
                output: output.combined().trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Run `tool` and require that it produced `expected`.
    pub fn run_producing<I, S>(
        &self,
        tool: Tool,
        args: I,
        cwd: Option<&Utf8Path>,
        expected: &Utf8Path,
    ) -> Result<ProcessOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let output = self.run(tool, args, cwd)?;
        if !expected.exists() {
            return Err(Error::MissingOutput {
                tool,
                path: expected.to_path_buf(),
            });
        }
        Ok(output)
    }
}
