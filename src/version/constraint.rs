//! Version constraint parsing
//!
//! Supports the range syntax runtime versions are pinned with:
//! - `1.2.3`, `1.2`, `1` - bare versions match every version with that prefix
//! - `^1.2.3`, `~1.2.3` - caret and tilde ranges
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`, `=1.2.3` - comparison operators
//! - `1.2.x`, `1.x.x`, `*` - wildcards
//! - `>= 1.2, < 2.0` or `>=1.2 <2.0` - AND (comma or space separated)
//! - `1.2 - 1.4` - hyphen range
//! - `^1.0 || ^2.0` - OR

use semver::{Version, VersionReq};

use super::semver::core_len;
use crate::error::VersionError;

/// Operators, two-character ones first so `>=` is not read as `>`
const OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "^", "~"];

/// A parsed version constraint: any alternative may match
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl Constraint {
    /// Parse a constraint. The empty string and `latest` mean `*`.
    pub fn parse(constraint: &str) -> Result<Self, VersionError> {
        let raw = constraint.trim();
        let raw = if raw.is_empty() || raw.eq_ignore_ascii_case("latest") {
            "*"
        } else {
            raw
        };

        let invalid = |reason: String| VersionError::InvalidConstraint {
            constraint: constraint.to_string(),
            reason,
        };

        let alternatives = raw
            .split("||")
            .map(|part| {
                let part = part.trim();
                if part.is_empty() {
                    return Err(invalid("empty alternative in `||` range".to_string()));
                }
                VersionReq::parse(&normalize_alternative(part)).map_err(|e| invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Check if a version satisfies any alternative of this constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The constraint as written, after `""`/`latest` normalization
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Rewrite one `||` alternative into `semver::VersionReq` syntax
fn normalize_alternative(alternative: &str) -> String {
    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(
            ">={}, <={}",
            normalize_version(low.trim()),
            normalize_version(high.trim())
        );
    }

    split_comparators(alternative)
        .iter()
        .map(|c| normalize_comparator(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split an AND range into comparators, re-attaching operators that were
/// written apart from their version (`>= 1.2.3`)
fn split_comparators(alternative: &str) -> Vec<String> {
    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in alternative.split([',', ' ', '\t']).filter(|t| !t.is_empty()) {
        if OPERATORS.contains(&token) {
            if let Some(op) = pending_op.replace(token) {
                comparators.push(op.to_string());
            }
            continue;
        }
        match pending_op.take() {
            Some(op) => comparators.push(format!("{op}{token}")),
            None => comparators.push(token.to_string()),
        }
    }

    // A dangling operator is left in so that parsing reports it
    if let Some(op) = pending_op {
        comparators.push(op.to_string());
    }

    comparators
}

fn normalize_comparator(comparator: &str) -> String {
    let op = OPERATORS
        .iter()
        .find(|op| comparator.starts_with(**op))
        .copied()
        .unwrap_or("");
    let version = normalize_version(&comparator[op.len()..]);

    // A bare version pins its prefix: `1.2` is `>=1.2.0 <1.3.0`, not a caret range
    if op.is_empty() && !is_wildcard(version) {
        format!("={version}")
    } else {
        format!("{op}{version}")
    }
}

/// Strip a `v` prefix and build metadata, neither of which take part in matching
fn normalize_version(version: &str) -> &str {
    let version = version.strip_prefix('v').unwrap_or(version);
    match version.find('+') {
        Some(idx) => &version[..idx],
        None => version,
    }
}

fn is_wildcard(version: &str) -> bool {
    version[..core_len(version)]
        .split('.')
        .any(|part| matches!(part, "x" | "X" | "*"))
}
