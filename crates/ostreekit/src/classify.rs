//! Executes planned actions and normalizes their outcome.
//!
//! rpm-ostree is always run with `--idempotent --unchanged-exit-77`, so the
//! exit code alone tells the three outcomes apart:
//!
//! | exit code | meaning |
//! |-----------|---------|
//! | 0 | change applied, reboot required |
//! | 77 | already satisfied, reported as rc 0 |
//! | other | failure |
//!
//! Queries go through `rpm -q --qf` under the C locale so the field layout
//! never depends on the host's language settings.

use crate::error::{Error, Result};
use crate::records;
use crate::runner::{self, BinaryInvocation, CommandLine, CommandRunner, ExecutionOutcome, TextInvocation};
use crate::types::{ApplyResult, ChangeKind, PackageManagerConfig, QueryResult, QueryScope};
use std::path::Path;

/// Exit code rpm-ostree uses for "nothing to do" with `--unchanged-exit-77`.
pub const UNCHANGED_EXIT_CODE: i32 = 77;

/// Flags that make rpm-ostree changes safe to repeat.
pub const IDEMPOTENT_FLAGS: [&str; 3] = ["--allow-inactive", "--idempotent", "--unchanged-exit-77"];

/// Text rpm prints when a queried package does not exist.
pub const NOT_INSTALLED_MARKER: &str = "is not installed";

/// Locale forced on queries.
const QUERY_LOCALE: [(&str, &str); 3] = [("LANG", "C"), ("LC_ALL", "C"), ("LC_MESSAGES", "C")];

/// Run an install or uninstall and classify its exit code.
pub fn apply(
    runner: &dyn CommandRunner,
    config: &PackageManagerConfig,
    kind: ChangeKind,
    targets: &[String],
) -> Result<ApplyResult> {
    let program = runner::require_binary(runner, "rpm-ostree", config.rpm_ostree_binary.as_deref())?;
    let invocation: BinaryInvocation = change_command(&program, kind, targets).into();

    let outcome = runner.run_binary(&invocation)?;
    let result = classify_change(invocation.command.argv(), outcome)?;

    if result.changed {
        log::info!("rpm-ostree {} changed the deployment: {}", kind.verb(), targets.join(" "));
    } else {
        log::info!("rpm-ostree {} had nothing to do", kind.verb());
    }

    Ok(result)
}

/// Build `rpm-ostree <verb> <flags> <targets>`.
pub fn change_command(program: &Path, kind: ChangeKind, targets: &[String]) -> CommandLine {
    CommandLine::new(program)
        .arg(kind.verb())
        .args(IDEMPOTENT_FLAGS)
        .args(targets.iter().cloned())
}

/// Map a raw rpm-ostree outcome onto a result or failure.
pub fn classify_change(cmd: Vec<String>, outcome: ExecutionOutcome) -> Result<ApplyResult> {
    let stdout = trim_line_endings(&outcome.stdout);
    let stderr = trim_line_endings(&outcome.stderr);

    match outcome.exit_code {
        0 => Ok(ApplyResult {
            changed: true,
            reboot_required: true,
            rc: 0,
            cmd,
            stdout,
            stderr,
        }),
        UNCHANGED_EXIT_CODE => Ok(ApplyResult {
            changed: false,
            reboot_required: false,
            rc: 0,
            cmd,
            stdout,
            stderr,
        }),
        rc => Err(Error::CommandFailure {
            rc,
            cmd,
            stdout,
            stderr,
        }),
    }
}

/// List installed packages matching a scope.
pub fn query(
    runner: &dyn CommandRunner,
    config: &PackageManagerConfig,
    scope: &QueryScope,
) -> Result<QueryResult> {
    let program = runner::require_binary(runner, "rpm", config.rpm_binary.as_deref())?;
    let invocation: TextInvocation = query_command(&program, scope, config).into();
    let cmd = invocation.command.argv();

    let output = runner.run_text(&invocation)?;

    if output.stdout.contains(NOT_INSTALLED_MARKER) {
        log::info!("no installed package matches {scope}");
        return Ok(QueryResult {
            cmd,
            records: Vec::new(),
        });
    }

    if output.exit_code != 0 {
        return Err(Error::QueryFailure {
            rc: output.exit_code,
            cmd,
            stdout: output.stdout,
            stderr: output.stderr,
        });
    }

    let records = records::parse(&output.stdout)?;
    log::info!("{} package(s) match {scope}", records.len());

    Ok(QueryResult { cmd, records })
}

/// Build `rpm -q --qf <template> <scope> [--root <dir>]` with the C locale.
pub fn query_command(program: &Path, scope: &QueryScope, config: &PackageManagerConfig) -> CommandLine {
    let mut command = CommandLine::new(program)
        .arg("-q")
        .arg("--qf")
        .arg(records::query_format());

    command = match scope {
        QueryScope::Installed => command.arg("-a"),
        QueryScope::Package(name) => command.arg(name.clone()),
    };

    if config.has_alternate_root() {
        command = command
            .arg("--root")
            .arg(config.install_root.display().to_string());
    }

    QUERY_LOCALE
        .iter()
        .fold(command, |command, (key, value)| command.env(*key, *value))
}

/// Decode output with trailing `\r` and `\n` bytes removed.
fn trim_line_endings(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|b| *b != b'\r' && *b != b'\n')
        .map_or(0, |i| i + 1);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::mock::{Call, MockRunner, OutputMode};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    const FOO: &str = r#"{"epoch":"0","name":"foo","version":"1.0","release":"1","arch":"x86_64","nevra":"foo-0:1.0-1.x86_64"},"#;

    #[test]
    fn test_apply_exit_zero_is_change() {
        let runner = MockRunner::new().respond(0, "Added:\n  foo-1.0-1.x86_64\r\n", "");
        let config = PackageManagerConfig::default();

        let result = apply(&runner, &config, ChangeKind::Install, &names(&["foo"])).unwrap();

        assert!(result.changed);
        assert!(result.reboot_required);
        assert_eq!(result.rc, 0);
        assert_eq!(result.stdout, "Added:\n  foo-1.0-1.x86_64");
        assert_eq!(
            result.cmd,
            names(&[
                "/usr/bin/rpm-ostree",
                "install",
                "--allow-inactive",
                "--idempotent",
                "--unchanged-exit-77",
                "foo"
            ])
        );
    }

    #[test]
    fn test_apply_exit_77_is_no_change() {
        let runner = MockRunner::new().respond(77, "error: something scary\n", "warning\n");
        let config = PackageManagerConfig::default();

        let result = apply(&runner, &config, ChangeKind::Uninstall, &names(&["foo"])).unwrap();

        assert!(!result.changed);
        assert!(!result.reboot_required);
        assert_eq!(result.rc, 0);
        assert_eq!(result.stdout, "error: something scary");
        assert_eq!(result.stderr, "warning");
        assert_eq!(result.cmd[1], "uninstall");
    }

    #[test]
    fn test_apply_other_exit_fails_with_diagnostics() {
        for rc in [1, 2, 76, 78, -9] {
            let runner = MockRunner::new().respond(rc, "partial\n", "error: Packages not found: foo\n");
            let config = PackageManagerConfig::default();

            let err = apply(&runner, &config, ChangeKind::Install, &names(&["foo"])).unwrap_err();
            match err {
                Error::CommandFailure {
                    rc: got,
                    cmd,
                    stdout,
                    stderr,
                } => {
                    assert_eq!(got, rc);
                    assert_eq!(cmd.last().map(String::as_str), Some("foo"));
                    assert_eq!(stdout, "partial");
                    assert_eq!(stderr, "error: Packages not found: foo");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn test_apply_uses_binary_output() {
        let runner = MockRunner::new();
        let config = PackageManagerConfig::default();

        apply(&runner, &config, ChangeKind::Install, &names(&["a", "b"])).unwrap();

        let runs = runner.runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].mode, OutputMode::Binary);
        assert!(runs[0].env.is_empty());
        assert_eq!(&runs[0].argv[5..], &["a", "b"]);
    }

    #[test]
    fn test_apply_missing_rpm_ostree() {
        let runner = MockRunner::new().without_binaries();
        let config = PackageManagerConfig::default();

        let err = apply(&runner, &config, ChangeKind::Install, &names(&["foo"])).unwrap_err();
        assert!(matches!(err, Error::BinaryNotFound { ref name } if name == "rpm-ostree"));
        assert!(runner.runs().is_empty());
    }

    #[test]
    fn test_apply_configured_binary_skips_lookup() {
        let runner = MockRunner::new().without_binaries();
        let config = PackageManagerConfig {
            rpm_ostree_binary: Some("/opt/bin/rpm-ostree".into()),
            ..PackageManagerConfig::default()
        };

        let result = apply(&runner, &config, ChangeKind::Install, &names(&["foo"])).unwrap();
        assert_eq!(result.cmd[0], "/opt/bin/rpm-ostree");
        assert!(
            !runner
                .calls()
                .iter()
                .any(|c| matches!(c, Call::Resolve { .. }))
        );
    }

    #[test]
    fn test_trim_line_endings() {
        assert_eq!(trim_line_endings(b"out\r\n\r\n"), "out");
        assert_eq!(trim_line_endings(b"\n\r"), "");
        assert_eq!(trim_line_endings(b""), "");
        assert_eq!(trim_line_endings(b" keep \n"), " keep ");
    }

    #[test]
    fn test_query_installed() {
        let runner = MockRunner::new().respond(0, FOO, "");
        let config = PackageManagerConfig::default();

        let result = query(&runner, &config, &QueryScope::Installed).unwrap();

        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].nevra, "foo-0:1.0-1.x86_64");

        let runs = runner.runs();
        assert_eq!(runs[0].mode, OutputMode::Text);
        assert_eq!(runs[0].argv[0], "/usr/bin/rpm");
        assert_eq!(runs[0].argv[1..3], ["-q", "--qf"]);
        assert_eq!(runs[0].argv[4], "-a");
        assert_eq!(runs[0].argv.len(), 5);
        for key in ["LANG", "LC_ALL", "LC_MESSAGES"] {
            assert_eq!(runs[0].env.get(key).map(String::as_str), Some("C"));
        }
    }

    #[test]
    fn test_query_package_with_root() {
        let runner = MockRunner::new().respond(0, "", "");
        let config = PackageManagerConfig::default().with_install_root("/sysroot");

        let result = query(&runner, &config, &QueryScope::Package("kernel".to_string())).unwrap();

        assert!(result.records.is_empty());
        assert_eq!(&result.cmd[4..], &["kernel", "--root", "/sysroot"]);
    }

    #[test]
    fn test_query_not_installed_is_empty() {
        let runner = MockRunner::new().respond(1, "package foo is not installed\n", "");
        let config = PackageManagerConfig::default();

        let result = query(&runner, &config, &QueryScope::Package("foo".to_string())).unwrap();
        assert!(result.records.is_empty());
    }

    #[test]
    fn test_query_failure() {
        let runner = MockRunner::new().respond(1, "", "error: rpmdb open failed\n");
        let config = PackageManagerConfig::default();

        let err = query(&runner, &config, &QueryScope::Installed).unwrap_err();
        match err {
            Error::QueryFailure { rc, stderr, cmd, .. } => {
                assert_eq!(rc, 1);
                assert_eq!(stderr, "error: rpmdb open failed\n");
                assert_eq!(cmd[0], "/usr/bin/rpm");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_query_malformed_is_distinct() {
        let runner = MockRunner::new().respond(0, "garbage", "");
        let config = PackageManagerConfig::default();

        let err = query(&runner, &config, &QueryScope::Installed).unwrap_err();
        assert!(matches!(err, Error::MalformedQueryOutput { .. }));
    }
}
