//! Result payloads and their terminal rendering.

use ostreekit::{DesiredState, Outcome, PackageRecord, SkipReason};
use serde::Serialize;

use crate::ui;

/// JSON object written to stdout at the end of a run.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Payload {
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rc: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reboot_required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PackageRecord>>,
}

impl Payload {
    /// Payload for a run that completed.
    ///
    /// `request` echoes what was asked for: the package names or the list selector.
    pub fn success(outcome: &Outcome, request: &str) -> Self {
        let base = Self {
            changed: outcome.changed(),
            original_message: Some(request.to_string()),
            message: Some(summary(outcome)),
            ..Self::default()
        };

        match outcome {
            Outcome::Skipped(_) => base,
            Outcome::Applied(result) => Self {
                rc: Some(result.rc),
                cmd: Some(result.cmd.clone()),
                stdout: Some(result.stdout.clone()),
                stderr: Some(result.stderr.clone()),
                reboot_required: Some(result.reboot_required),
                ..base
            },
            Outcome::Queried(result) => Self {
                cmd: Some(result.cmd.clone()),
                results: Some(result.records.clone()),
                ..base
            },
        }
    }

    /// Payload for a run that failed before any tool ran.
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            failed: true,
            msg: Some(msg.into()),
            ..Self::default()
        }
    }

    /// Payload for a core error, carrying the tool's output when there is one.
    pub fn from_error(err: &ostreekit::Error) -> Self {
        let diag = err.diagnostics();
        Self {
            rc: diag.rc,
            cmd: diag.cmd.map(<[String]>::to_vec),
            stdout: diag.stdout.map(str::to_string),
            stderr: diag.stderr.map(str::to_string),
            ..Self::failure(err.to_string())
        }
    }

    /// Serialize as a single JSON line.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Echo of a request: the list selector, or the package names.
pub fn describe(desired: &DesiredState) -> String {
    desired
        .list_selector()
        .map_or_else(|| desired.names.join(" "), str::to_string)
}

/// One-line description of an outcome.
pub fn summary(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Skipped(SkipReason::CheckMode) => "check mode: no changes made".to_string(),
        Outcome::Skipped(SkipReason::NothingRequested) => "nothing requested".to_string(),
        Outcome::Applied(result) if result.changed => {
            "package set changed; reboot required".to_string()
        }
        Outcome::Applied(_) => "no changes needed".to_string(),
        Outcome::Queried(result) => match result.records.len() {
            1 => "1 package found".to_string(),
            n => format!("{n} packages found"),
        },
    }
}

/// Print an outcome for a person at a terminal.
pub fn render(outcome: &Outcome, quiet: bool) {
    match outcome {
        Outcome::Skipped(_) => {
            if !quiet {
                ui::info(&summary(outcome));
            }
        }
        Outcome::Applied(result) => {
            if result.changed {
                ui::success(&summary(outcome));
            } else if !quiet {
                ui::info(&summary(outcome));
            }
            if !quiet && !result.stdout.is_empty() {
                for line in result.stdout.lines() {
                    ui::dim(line);
                }
            }
            if result.reboot_required {
                ui::warn("Reboot to boot into the new deployment");
            }
        }
        Outcome::Queried(result) => {
            if result.records.is_empty() {
                if !quiet {
                    ui::info("No matching packages installed");
                }
                return;
            }
            for record in &result.records {
                ui::package(
                    &record.name,
                    &format!("{}-{}.{}", record.version, record.release, record.arch),
                );
            }
            if !quiet {
                ui::dim(&summary(outcome));
            }
        }
    }
}

/// Print a core error with its category advice and captured stderr.
pub fn render_error(err: &ostreekit::Error) {
    let category = err.category();
    ui::error(&format!("{}: {err}", category.description()));
    let diag = err.diagnostics();
    if let Some(stderr) = diag.stderr.filter(|s| !s.is_empty()) {
        for line in stderr.lines() {
            ui::error_detail(line);
        }
    }
    ui::error_detail(category.advice());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostreekit::{ApplyResult, QueryResult};
    use serde_json::{Value, json};

    fn applied(changed: bool) -> Outcome {
        Outcome::Applied(ApplyResult {
            changed,
            reboot_required: changed,
            rc: 0,
            cmd: vec!["rpm-ostree".to_string(), "install".to_string(), "htop".to_string()],
            stdout: "Checking out tree".to_string(),
            stderr: String::new(),
        })
    }

    fn as_value(payload: &Payload) -> Value {
        serde_json::from_str(&payload.to_json().unwrap()).unwrap()
    }

    #[test]
    fn test_success_applied() {
        let value = as_value(&Payload::success(&applied(true), "htop"));
        assert_eq!(value["changed"], json!(true));
        assert_eq!(value["rc"], json!(0));
        assert_eq!(value["reboot_required"], json!(true));
        assert_eq!(value["cmd"], json!(["rpm-ostree", "install", "htop"]));
        assert_eq!(value["original_message"], json!("htop"));
        assert!(value.get("failed").is_none());
        assert!(value.get("results").is_none());
    }

    #[test]
    fn test_success_unchanged() {
        let payload = Payload::success(&applied(false), "htop");
        assert!(!payload.changed);
        assert_eq!(payload.reboot_required, Some(false));
        assert_eq!(payload.message.as_deref(), Some("no changes needed"));
    }

    #[test]
    fn test_success_skipped_has_no_diagnostics() {
        let value = as_value(&Payload::success(&Outcome::Skipped(SkipReason::CheckMode), "htop"));
        assert_eq!(value["changed"], json!(false));
        assert!(value.get("rc").is_none());
        assert!(value.get("cmd").is_none());
    }

    #[test]
    fn test_success_query() {
        let outcome = Outcome::Queried(QueryResult {
            cmd: vec!["rpm".to_string()],
            records: Vec::new(),
        });
        let value = as_value(&Payload::success(&outcome, "kernel"));
        assert_eq!(value["results"], json!([]));
        assert_eq!(value["changed"], json!(false));
        assert!(value.get("reboot_required").is_none());
    }

    #[test]
    fn test_from_command_failure() {
        let err = ostreekit::Error::CommandFailure {
            rc: 1,
            cmd: vec!["rpm-ostree".to_string(), "install".to_string(), "nope".to_string()],
            stdout: String::new(),
            stderr: "error: Packages not found: nope".to_string(),
        };
        let value = as_value(&Payload::from_error(&err));
        assert_eq!(value["failed"], json!(true));
        assert_eq!(value["changed"], json!(false));
        assert_eq!(value["rc"], json!(1));
        assert_eq!(value["stderr"], json!("error: Packages not found: nope"));
        assert_eq!(value["msg"], json!("non-zero return code 1 from rpm-ostree install nope"));
    }

    #[test]
    fn test_from_error_without_diagnostics() {
        let err = ostreekit::Error::BinaryNotFound {
            name: "rpm-ostree".to_string(),
        };
        let value = as_value(&Payload::from_error(&err));
        assert_eq!(value["failed"], json!(true));
        assert!(value.get("rc").is_none());
    }

    #[test]
    fn test_describe_request() {
        assert_eq!(describe(&DesiredState::packages(ostreekit::State::Present, ["a", "b"])), "a b");
        assert_eq!(describe(&DesiredState::query(" kernel ")), "kernel");
    }

    #[test]
    fn test_summary_pluralizes() {
        let record = PackageRecord {
            epoch: "0".to_string(),
            name: "a".to_string(),
            version: "1".to_string(),
            release: "1".to_string(),
            arch: "noarch".to_string(),
            nevra: "a-0:1-1.noarch".to_string(),
        };
        let one = Outcome::Queried(QueryResult {
            cmd: Vec::new(),
            records: vec![record.clone()],
        });
        let two = Outcome::Queried(QueryResult {
            cmd: Vec::new(),
            records: vec![record.clone(), record],
        });
        assert_eq!(summary(&one), "1 package found");
        assert_eq!(summary(&two), "2 packages found");
    }
}
