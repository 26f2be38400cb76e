//! # ostreekit
//!
//! Idempotent package layering for rpm-ostree systems.
//!
//! This crate provides functionality for:
//! - Planning an install, uninstall or query from a desired package state
//! - Running `rpm-ostree` so that repeated requests converge to "no change"
//! - Listing installed packages through `rpm -q --qf` as typed records
//!
//! ## Example
//!
//! ```no_run
//! use ostreekit::{Client, DesiredState, Outcome, State};
//!
//! let client = Client::new();
//!
//! let desired = DesiredState::packages(State::Present, ["htop"]);
//! match client.reconcile(&desired, false).expect("reconcile failed") {
//!     Outcome::Applied(result) if result.changed => println!("reboot to apply"),
//!     Outcome::Applied(_) => println!("already layered"),
//!     _ => {}
//! }
//! ```
//!
//! ## Testing
//!
//! Every host interaction goes through [`runner::CommandRunner`]. Use
//! [`runner::mock::MockRunner`] to script exit codes and inspect what would
//! have been run.
//!
//! ```
//! use ostreekit::runner::mock::MockRunner;
//! use ostreekit::{Client, DesiredState, Outcome, PackageManagerConfig, State};
//!
//! let runner = MockRunner::new().respond(77, "", "");
//! let client = Client::with_runner(Box::new(runner), PackageManagerConfig::default());
//!
//! let desired = DesiredState::packages(State::Present, ["htop"]);
//! let outcome = client.reconcile(&desired, false).unwrap();
//! assert!(!outcome.changed());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod error;
pub mod planner;
pub mod records;
pub mod runner;
pub mod types;

pub use error::{Diagnostics, Error, ErrorCategory, Result};
pub use planner::Plan;
pub use types::{
    Action, ApplyResult, ChangeKind, DesiredState, Outcome, PackageManagerConfig, PackageRecord,
    QueryResult, QueryScope, SkipReason, State,
};

use runner::{CommandRunner, system::SystemRunner};

/// High-level client for rpm-ostree package operations.
///
/// The client wraps a runner and the host configuration, and turns a
/// desired state into exactly one action. It keeps no state between calls.
pub struct Client {
    runner: Box<dyn CommandRunner>,
    config: PackageManagerConfig,
}

impl Client {
    /// Create a client that runs real commands against the host root.
    pub fn new() -> Self {
        Self::with_config(PackageManagerConfig::default())
    }

    /// Create a client that runs real commands with the given configuration.
    pub fn with_config(config: PackageManagerConfig) -> Self {
        Self::with_runner(Box::new(SystemRunner::new()), config)
    }

    /// Create a client with a custom runner (useful for testing).
    pub fn with_runner(runner: Box<dyn CommandRunner>, config: PackageManagerConfig) -> Self {
        Self { runner, config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PackageManagerConfig {
        &self.config
    }

    /// Plan and run whatever `desired` asks for.
    pub fn reconcile(&self, desired: &DesiredState, check_mode: bool) -> Result<Outcome> {
        match planner::plan(desired, check_mode) {
            Plan::NoOp(reason) => {
                log::debug!("nothing to run: {reason:?}");
                Ok(Outcome::Skipped(reason))
            }
            Plan::Run(action) => self.execute(&action),
        }
    }

    /// Run a single planned action.
    pub fn execute(&self, action: &Action) -> Result<Outcome> {
        match action {
            Action::Query(scope) => self.query(scope).map(Outcome::Queried),
            Action::Change { kind, targets } => self.change(*kind, targets).map(Outcome::Applied),
        }
    }

    // =========================================================================
    // Package Operations
    // =========================================================================

    /// Layer packages.
    pub fn install(&self, names: &[String]) -> Result<ApplyResult> {
        self.change(ChangeKind::Install, names)
    }

    /// Remove layered packages.
    pub fn uninstall(&self, names: &[String]) -> Result<ApplyResult> {
        self.change(ChangeKind::Uninstall, names)
    }

    /// List installed packages matching a scope.
    pub fn query(&self, scope: &QueryScope) -> Result<QueryResult> {
        classify::query(self.runner.as_ref(), &self.config, scope)
    }

    /// List every installed package.
    pub fn list_installed(&self) -> Result<Vec<PackageRecord>> {
        Ok(self.query(&QueryScope::Installed)?.records)
    }

    fn change(&self, kind: ChangeKind, names: &[String]) -> Result<ApplyResult> {
        if self.config.has_alternate_root() {
            log::warn!(
                "install root {} only applies to queries; rpm-ostree acts on the booted system",
                self.config.install_root.display()
            );
        }
        classify::apply(self.runner.as_ref(), &self.config, kind, names)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}
