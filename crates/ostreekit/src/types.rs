//! Core types for rpm-ostree package layering.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Requested presence of a set of packages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// Packages should be layered
    #[default]
    Present,
    /// Alias of `Present`
    Installed,
    /// Layered at whatever version the tool picks; rpm-ostree has no upgrade-one verb
    Latest,
    /// Packages should not be layered
    Absent,
    /// Alias of `Absent`
    Removed,
}

impl State {
    /// Name as accepted on the command line and in module arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Present => "present",
            State::Installed => "installed",
            State::Latest => "latest",
            State::Absent => "absent",
            State::Removed => "removed",
        }
    }

    /// Parse a state name (case-insensitive).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "present" => Some(State::Present),
            "installed" => Some(State::Installed),
            "latest" => Some(State::Latest),
            "absent" => Some(State::Absent),
            "removed" => Some(State::Removed),
            _ => None,
        }
    }

    /// Whether this state asks for the packages to be layered.
    pub fn wants_installed(&self) -> bool {
        matches!(self, State::Present | State::Installed | State::Latest)
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants the system to look like.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    /// Requested presence for `names`
    pub state: State,
    /// Package names, in the order given
    pub names: Vec<String>,
    /// Query selector; non-empty switches to query mode
    pub list: Option<String>,
}

impl DesiredState {
    /// Desired state for a set of packages.
    pub fn packages<I, S>(state: State, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state,
            names: names.into_iter().map(Into::into).collect(),
            list: None,
        }
    }

    /// Desired state that only enumerates packages.
    pub fn query(list: impl Into<String>) -> Self {
        Self {
            list: Some(list.into()),
            ..Self::default()
        }
    }

    /// The query selector, if query mode is requested.
    pub fn list_selector(&self) -> Option<&str> {
        self.list
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Which packages an rpm query covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryScope {
    /// Every installed package (`rpm -qa`)
    Installed,
    /// Packages matching a name or NEVRA pattern
    Package(String),
}

impl QueryScope {
    /// Resolve a `list` selector.
    ///
    /// `installed` and `all` select every installed package; anything else
    /// is handed to rpm as a package name.
    pub fn from_selector(selector: &str) -> Self {
        match selector.trim() {
            "installed" | "all" => QueryScope::Installed,
            other => QueryScope::Package(other.to_string()),
        }
    }
}

impl std::fmt::Display for QueryScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryScope::Installed => f.write_str("installed"),
            QueryScope::Package(name) => f.write_str(name),
        }
    }
}

/// Host-level settings shared by every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManagerConfig {
    /// Root the rpm database is read from
    pub install_root: PathBuf,
    /// Explicit `rpm-ostree` path, bypassing the search
    pub rpm_ostree_binary: Option<PathBuf>,
    /// Explicit `rpm` path, bypassing the search
    pub rpm_binary: Option<PathBuf>,
}

impl Default for PackageManagerConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("/"),
            rpm_ostree_binary: None,
            rpm_binary: None,
        }
    }
}

impl PackageManagerConfig {
    /// Set the install root.
    pub fn with_install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = root.into();
        self
    }

    /// Whether queries should target a root other than the host's.
    pub fn has_alternate_root(&self) -> bool {
        self.install_root != Path::new("/")
    }
}

/// A change-applying rpm-ostree verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// `rpm-ostree install`
    Install,
    /// `rpm-ostree uninstall`
    Uninstall,
}

impl ChangeKind {
    /// The rpm-ostree subcommand.
    pub fn verb(&self) -> &'static str {
        match self {
            ChangeKind::Install => "install",
            ChangeKind::Uninstall => "uninstall",
        }
    }
}

/// A planned action. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Enumerate packages
    Query(QueryScope),
    /// Layer or unlayer packages
    Change {
        /// install or uninstall
        kind: ChangeKind,
        /// Package names, in request order
        targets: Vec<String>,
    },
}

/// Why nothing was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Check mode never touches the system
    CheckMode,
    /// Neither names nor a list selector were given
    NothingRequested,
}

/// Result of a change-applying invocation that succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Whether the committed package set changed
    pub changed: bool,
    /// Whether a reboot is needed for the change to take effect
    pub reboot_required: bool,
    /// Exit code as reported to the caller (77 is normalized to 0)
    pub rc: i32,
    /// Command line that was run
    pub cmd: Vec<String>,
    /// Captured stdout, trailing newlines removed
    pub stdout: String,
    /// Captured stderr, trailing newlines removed
    pub stderr: String,
}

/// Result of a package query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Command line that was run
    pub cmd: Vec<String>,
    /// Matching packages in the order rpm emitted them
    pub records: Vec<PackageRecord>,
}

/// One installed package as reported by rpm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageRecord {
    /// Epoch number (`0` when unset)
    pub epoch: String,
    /// Package name
    pub name: String,
    /// Upstream version
    pub version: String,
    /// Release
    pub release: String,
    /// Architecture
    pub arch: String,
    /// Full name-epoch:version-release.arch
    pub nevra: String,
}

/// Terminal result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Nothing was run
    Skipped(SkipReason),
    /// An install/uninstall ran
    Applied(ApplyResult),
    /// A query ran
    Queried(QueryResult),
}

impl Outcome {
    /// Whether the system was changed.
    pub fn changed(&self) -> bool {
        matches!(self, Outcome::Applied(result) if result.changed)
    }
}
