//! Test-double runner that records calls and returns scripted responses.

use crate::error::{Error, Result};
use crate::runner::{BinaryInvocation, CommandRunner, ExecutionOutcome, TextInvocation, TextOutput};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// How a recorded process run wanted its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Via [`CommandRunner::run_text`]
    Text,
    /// Via [`CommandRunner::run_binary`]
    Binary,
}

/// A process run seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRun {
    /// Output handling requested
    pub mode: OutputMode,
    /// Program and arguments
    pub argv: Vec<String>,
    /// Environment overrides
    pub env: BTreeMap<String, String>,
}

/// Any call made against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// A binary lookup
    Resolve {
        /// Name looked up
        name: String,
        /// Whether it was required
        required: bool,
    },
    /// A process run
    Run(RecordedRun),
}

/// Runner that never touches the host.
///
/// Knows `rpm-ostree` and `rpm` under `/usr/bin` by default. Responses are
/// returned in the order they were queued; once the queue is empty every run
/// exits 0 with no output.
pub struct MockRunner {
    binaries: HashMap<String, PathBuf>,
    responses: Mutex<VecDeque<ExecutionOutcome>>,
    calls: Mutex<Vec<Call>>,
}

impl MockRunner {
    /// Create a mock that knows the usual tools.
    pub fn new() -> Self {
        let binaries = ["rpm-ostree", "rpm"]
            .into_iter()
            .map(|name| (name.to_string(), PathBuf::from("/usr/bin").join(name)))
            .collect();

        Self {
            binaries,
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Forget every known binary.
    pub fn without_binaries(mut self) -> Self {
        self.binaries.clear();
        self
    }

    /// Make a binary resolvable at the given path.
    pub fn with_binary(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.binaries.insert(name.into(), path.into());
        self
    }

    /// Queue the result of the next run.
    pub fn respond(self, exit_code: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        self.lock_responses().push_back(ExecutionOutcome {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        });
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the process runs made so far.
    pub fn runs(&self) -> Vec<RecordedRun> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Run(run) => Some(run),
                Call::Resolve { .. } => None,
            })
            .collect()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<ExecutionOutcome>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: Call) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn next_response(&self) -> ExecutionOutcome {
        self.lock_responses().pop_front().unwrap_or_default()
    }
}

impl Default for MockRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for MockRunner {
    fn resolve_binary(&self, name: &str, required: bool) -> Result<Option<PathBuf>> {
        self.record(Call::Resolve {
            name: name.to_string(),
            required,
        });

        match self.binaries.get(name) {
            Some(path) => Ok(Some(path.clone())),
            None if required => Err(Error::BinaryNotFound {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn run_binary(&self, invocation: &BinaryInvocation) -> Result<ExecutionOutcome> {
        self.record(Call::Run(RecordedRun {
            mode: OutputMode::Binary,
            argv: invocation.command.argv(),
            env: invocation.command.env.clone(),
        }));
        Ok(self.next_response())
    }

    fn run_text(&self, invocation: &TextInvocation) -> Result<TextOutput> {
        self.record(Call::Run(RecordedRun {
            mode: OutputMode::Text,
            argv: invocation.command.argv(),
            env: invocation.command.env.clone(),
        }));
        Ok(self.next_response().into())
    }
}
