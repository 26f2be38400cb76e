//! Intent planner - maps a desired state onto a single action.

use crate::types::{Action, ChangeKind, DesiredState, QueryScope, SkipReason};

/// What a reconciliation will do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Run one action
    Run(Action),
    /// Touch nothing
    NoOp(SkipReason),
}

impl Plan {
    /// Whether this plan runs anything.
    pub fn is_noop(&self) -> bool {
        matches!(self, Plan::NoOp(_))
    }
}

/// Decide what to do for a desired state.
///
/// Check mode wins over everything. A list selector wins over names. With
/// neither, the plan is a silent no-op rather than an error.
pub fn plan(desired: &DesiredState, check_mode: bool) -> Plan {
    if check_mode {
        return Plan::NoOp(SkipReason::CheckMode);
    }

    if let Some(selector) = desired.list_selector() {
        return Plan::Run(Action::Query(QueryScope::from_selector(selector)));
    }

    if desired.names.is_empty() {
        return Plan::NoOp(SkipReason::NothingRequested);
    }

    let kind = if desired.state.wants_installed() {
        ChangeKind::Install
    } else {
        ChangeKind::Uninstall
    };

    Plan::Run(Action::Change {
        kind,
        targets: desired.names.clone(),
    })
}
