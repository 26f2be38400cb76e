//! Error types for rpm-ostree operations.
//!
//! Errors are categorized so callers can give appropriate feedback. Failures
//! that come from running a tool keep the command line, exit code and both
//! output streams so they can be diagnosed without re-running anything.

use thiserror::Error;

/// Categories of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A required executable is missing
    MissingTool,
    /// rpm-ostree refused or failed the change
    ChangeRejected,
    /// rpm failed the query
    QueryRejected,
    /// rpm produced output that does not match the query template
    Contract,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::MissingTool => "Required tool not installed",
            Self::ChangeRejected => "Package change failed",
            Self::QueryRejected => "Package query failed",
            Self::Contract => "Unexpected query output",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::MissingTool => "Run this on an rpm-ostree based host, or set the binary path in the config file",
            Self::ChangeRejected => "Check the package names and the rpm-ostree output below",
            Self::QueryRejected => "Check the query selector and the install root",
            Self::Contract => "Report the rpm version and the raw output; the query template may be unsupported",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while reconciling packages.
#[derive(Debug, Error)]
pub enum Error {
    /// A required executable could not be found
    #[error("failed to find required executable {name} in PATH")]
    BinaryNotFound {
        /// Executable name that was searched for
        name: String,
    },

    /// The change-applying invocation exited with something other than 0 or 77
    #[error("non-zero return code {rc} from {}", .cmd.join(" "))]
    CommandFailure {
        /// Exit code
        rc: i32,
        /// Command line that was run
        cmd: Vec<String>,
        /// Captured stdout, trailing newlines removed
        stdout: String,
        /// Captured stderr, trailing newlines removed
        stderr: String,
    },

    /// The query invocation failed for a reason other than "nothing matches"
    #[error("error from rpm: {}: {stderr}", .cmd.join(" "))]
    QueryFailure {
        /// Exit code
        rc: i32,
        /// Command line that was run
        cmd: Vec<String>,
        /// Captured stdout
        stdout: String,
        /// Captured stderr
        stderr: String,
    },

    /// Query output could not be parsed into package records
    #[error("malformed query output{}: {message}", .record.map(|i| format!(" at record {i}")).unwrap_or_default())]
    MalformedQueryOutput {
        /// Zero-based index of the offending record, when known
        record: Option<usize>,
        /// What was wrong
        message: String,
    },

    /// The process could not be started
    #[error("failed to execute {program}: {source}")]
    Spawn {
        /// Program that was being started
        program: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}

/// Diagnostic fields attached to a failure payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics<'a> {
    /// Exit code
    pub rc: Option<i32>,
    /// Command line
    pub cmd: Option<&'a [String]>,
    /// Captured stdout
    pub stdout: Option<&'a str>,
    /// Captured stderr
    pub stderr: Option<&'a str>,
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::BinaryNotFound { .. } => ErrorCategory::MissingTool,
            Error::CommandFailure { .. } => ErrorCategory::ChangeRejected,
            Error::QueryFailure { .. } => ErrorCategory::QueryRejected,
            Error::MalformedQueryOutput { .. } => ErrorCategory::Contract,
            Error::Spawn { .. } => ErrorCategory::Other,
        }
    }

    /// Command diagnostics carried by this error, if it came from a tool run.
    pub fn diagnostics(&self) -> Diagnostics<'_> {
        match self {
            Error::CommandFailure {
                rc,
                cmd,
                stdout,
                stderr,
            }
            | Error::QueryFailure {
                rc,
                cmd,
                stdout,
                stderr,
            } => Diagnostics {
                rc: Some(*rc),
                cmd: Some(cmd.as_slice()),
                stdout: Some(stdout.as_str()),
                stderr: Some(stderr.as_str()),
            },
            _ => Diagnostics::default(),
        }
    }

    pub(crate) fn malformed(record: Option<usize>, message: impl Into<String>) -> Self {
        Error::MalformedQueryOutput {
            record,
            message: message.into(),
        }
    }
}

/// Result type for rpm-ostree operations.
pub type Result<T> = std::result::Result<T, Error>;
