//! Runner that spawns real processes.

use crate::error::{Error, Result};
use crate::runner::{BinaryInvocation, CommandRunner, ExecutionOutcome};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};

/// System directories searched after `PATH`; package tools often live in sbin.
const EXTRA_SEARCH_DIRS: &[&str] = &["/sbin", "/usr/sbin", "/usr/local/sbin"];

/// Runner that executes commands on the host.
pub struct SystemRunner {
    /// Directories searched for executables, in order
    search_path: Vec<PathBuf>,
}

impl SystemRunner {
    /// Create a runner searching `PATH` followed by the sbin directories.
    pub fn new() -> Self {
        let mut search_path: Vec<PathBuf> = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).collect())
            .unwrap_or_default();

        for dir in EXTRA_SEARCH_DIRS {
            let dir = PathBuf::from(dir);
            if !search_path.contains(&dir) {
                search_path.push(dir);
            }
        }

        Self { search_path }
    }

    /// Create a runner with an explicit search path.
    pub fn with_search_path(search_path: Vec<PathBuf>) -> Self {
        Self { search_path }
    }

    /// Directories this runner searches.
    pub fn search_path(&self) -> &[PathBuf] {
        &self.search_path
    }

    /// Find an executable on the search path.
    fn lookup(&self, name: &str) -> Option<PathBuf> {
        if self.search_path.is_empty() {
            return None;
        }
        let paths = match std::env::join_paths(&self.search_path) {
            Ok(paths) => paths,
            Err(e) => {
                log::warn!("unusable search path: {e}");
                return None;
            }
        };
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));

        match which::which_in(name, Some(paths), cwd) {
            Ok(path) => Some(path),
            Err(e) => {
                log::debug!("{name} not found: {e}");
                None
            }
        }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn resolve_binary(&self, name: &str, required: bool) -> Result<Option<PathBuf>> {
        match self.lookup(name) {
            Some(path) => {
                log::debug!("resolved {} to {}", name, path.display());
                Ok(Some(path))
            }
            None if required => Err(Error::BinaryNotFound {
                name: name.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn run_binary(&self, invocation: &BinaryInvocation) -> Result<ExecutionOutcome> {
        let command = &invocation.command;
        log::debug!("running {}", command.argv().join(" "));

        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(&command.env)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::Spawn {
                program: command.program.display().to_string(),
                source: e,
            })?;

        let exit_code = exit_code(output.status);
        log::debug!("{} exited with {}", command.program.display(), exit_code);

        Ok(ExecutionOutcome {
            exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Exit code, or the negated signal number when the process was killed.
fn exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    status.code().unwrap_or(-1)
}
