//! Parser for the package records emitted by `rpm -q --qf`.
//!
//! The query template makes rpm print one JSON object per package, each
//! followed by a comma:
//! ```text
//! {"epoch":"0","name":"bash","version":"5.2.26","release":"3.fc40","arch":"x86_64","nevra":"bash-0:5.2.26-3.fc40.x86_64"},
//! {"epoch":"1","name":"openssl","version":"3.2.1","release":"2.fc40","arch":"x86_64","nevra":"openssl-1:3.2.1-2.fc40.x86_64"},
//! ```
//! The stream is turned into a JSON array by dropping the final separator and
//! bracketing the rest. Each element is then checked on its own so a bad
//! record is reported by position.

use crate::error::{Error, Result};
use crate::types::PackageRecord;

/// Separator rpm writes after every record.
const RECORD_SEPARATOR: char = ',';

/// Field names the query template produces, in template order.
pub const RECORD_FIELDS: [&str; 6] = ["epoch", "name", "version", "release", "arch", "nevra"];

/// The `--queryformat` argument matching [`PackageRecord`].
///
/// The outer braces are backslash-escaped; rpm's format parser would
/// otherwise read `}` as the end of a conditional block.
pub fn query_format() -> String {
    let fields: Vec<String> = RECORD_FIELDS
        .iter()
        .map(|field| {
            let tag = if *field == "epoch" { "epochnum" } else { *field };
            format!("\"{field}\":\"%{{{tag}}}\"")
        })
        .collect();
    format!("\\{{{}\\}}{RECORD_SEPARATOR}", fields.join(","))
}

/// Parse raw query output into records, in the order rpm emitted them.
pub fn parse(raw: &str) -> Result<Vec<PackageRecord>> {
    let trimmed = raw.trim_end();
    if trimmed.trim_start().is_empty() {
        return Ok(Vec::new());
    }

    let body = trimmed.strip_suffix(RECORD_SEPARATOR).ok_or_else(|| {
        Error::malformed(None, "output does not end with the record separator")
    })?;

    let values: Vec<serde_json::Value> = serde_json::from_str(&format!("[{body}]"))
        .map_err(|e| Error::malformed(None, e.to_string()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| parse_record(index, value))
        .collect()
}

/// Validate and convert a single record.
fn parse_record(index: usize, value: serde_json::Value) -> Result<PackageRecord> {
    if !value.is_object() {
        return Err(Error::malformed(
            Some(index),
            format!("expected an object, found {value}"),
        ));
    }

    serde_json::from_value(value).map_err(|e| Error::malformed(Some(index), e.to_string()))
}
