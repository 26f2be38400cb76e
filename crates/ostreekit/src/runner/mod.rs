//! Process execution abstraction.
//!
//! The [`CommandRunner`] trait is the only way the core touches the host,
//! allowing for different implementations (real processes, mock for testing).
//!
//! Output handling is chosen by the invocation type rather than inspected at
//! runtime: a [`TextInvocation`] yields decoded text, a [`BinaryInvocation`]
//! yields the raw bytes the process wrote.

pub mod mock;
pub mod system;

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Program, arguments and environment overrides for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Resolved executable path
    pub program: PathBuf,
    /// Arguments, not including the program
    pub args: Vec<String>,
    /// Variables set on top of the inherited environment
    pub env: BTreeMap<String, String>,
}

impl CommandLine {
    /// Create a command line for a resolved program.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment override.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Program followed by its arguments, as reported back to callers.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.display().to_string())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

/// An invocation whose output is decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInvocation {
    /// What to run
    pub command: CommandLine,
}

/// An invocation whose output is kept as raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryInvocation {
    /// What to run
    pub command: CommandLine,
}

impl From<CommandLine> for TextInvocation {
    fn from(command: CommandLine) -> Self {
        Self { command }
    }
}

impl From<CommandLine> for BinaryInvocation {
    fn from(command: CommandLine) -> Self {
        Self { command }
    }
}

/// Raw result of a process run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Exit code (negative signal number when killed by a signal)
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: Vec<u8>,
    /// Captured stderr
    pub stderr: Vec<u8>,
}

/// Decoded result of a text invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextOutput {
    /// Exit code
    pub exit_code: i32,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl From<ExecutionOutcome> for TextOutput {
    fn from(outcome: ExecutionOutcome) -> Self {
        Self {
            exit_code: outcome.exit_code,
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&outcome.stderr).into_owned(),
        }
    }
}

/// Host capability the core runs on.
///
/// This trait abstracts process execution, enabling:
/// - Real execution via [`system::SystemRunner`]
/// - Recorded, scripted execution via [`mock::MockRunner`]
pub trait CommandRunner: Send + Sync {
    /// Locate an executable by name.
    ///
    /// Returns `Ok(None)` for a missing optional binary and
    /// [`crate::Error::BinaryNotFound`] for a missing required one.
    fn resolve_binary(&self, name: &str, required: bool) -> Result<Option<PathBuf>>;

    /// Run a process and keep its output as bytes.
    fn run_binary(&self, invocation: &BinaryInvocation) -> Result<ExecutionOutcome>;

    /// Run a process and decode its output as text.
    fn run_text(&self, invocation: &TextInvocation) -> Result<TextOutput> {
        let outcome = self.run_binary(&BinaryInvocation {
            command: invocation.command.clone(),
        })?;
        Ok(outcome.into())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for std::sync::Arc<R> {
    fn resolve_binary(&self, name: &str, required: bool) -> Result<Option<PathBuf>> {
        (**self).resolve_binary(name, required)
    }

    fn run_binary(&self, invocation: &BinaryInvocation) -> Result<ExecutionOutcome> {
        (**self).run_binary(invocation)
    }

    fn run_text(&self, invocation: &TextInvocation) -> Result<TextOutput> {
        (**self).run_text(invocation)
    }
}

/// Resolve a required binary, honouring an explicit path when one is configured.
pub(crate) fn require_binary(
    runner: &dyn CommandRunner,
    name: &str,
    configured: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = configured {
        log::debug!("using configured {} at {}", name, path.display());
        return Ok(path.to_path_buf());
    }

    runner
        .resolve_binary(name, true)?
        .ok_or_else(|| crate::Error::BinaryNotFound {
            name: name.to_string(),
        })
}
