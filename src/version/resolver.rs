//! Highest-satisfying version resolution
//!
//! Pinned constraints (exact versions and release candidates) short-circuit
//! without consulting the candidate list. Everything else is parsed as a range
//! and matched against the candidates in descending order.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

use super::constraint::Constraint;
use super::semver::{core_len, parse_lenient};
use crate::error::VersionError;

/// Tags that are published alongside real versions but are never installable
const SKIP_PREFIXES: &[&str] = &["deprecated", "public-image", "latest"];

/// Release candidates are published as `3.12.0rc1`, `8.0.100-rc.1`, `8.3.0RC4`, `3.2.0-rc1`
static RELEASE_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(.*)(rc|RC)(.*)").expect("valid regex"));

/// How a runtime spells its version tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VersionScheme {
    #[default]
    Semver,
    /// JDK builds are tagged `11.0.22_10`; the build number sits after `_`
    UnderscoreBuild,
}

impl VersionScheme {
    /// Rewrite a native tag into something semver can parse
    pub fn to_semver(self, version: &str) -> String {
        match self {
            Self::Semver => version.to_string(),
            Self::UnderscoreBuild => version.replacen('_', "+", 1),
        }
    }

    /// Rewrite a semver string back into the native tag format
    pub fn to_native(self, version: &str) -> String {
        match self {
            Self::Semver => version.to_string(),
            Self::UnderscoreBuild => version.replacen('+', "_", 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Return the canonical form (`v` prefix trimmed, zeros padded) instead
    /// of the tag as published
    pub sanitize: bool,
    pub scheme: VersionScheme,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            sanitize: true,
            scheme: VersionScheme::Semver,
        }
    }
}

/// Check if a constraint names exactly one version (`major.minor.patch` all present)
pub fn is_exact_semver(constraint: &str) -> bool {
    let constraint = constraint.trim();
    let core = &constraint[..core_len(constraint)];
    core.matches('.').count() == 2 && parse_lenient(constraint).is_some()
}

pub fn is_release_candidate(constraint: &str) -> bool {
    RELEASE_CANDIDATE.is_match(constraint)
}

/// Check if a constraint bypasses resolution, after mapping it into semver form
pub fn is_pinned(constraint: &str, scheme: VersionScheme) -> bool {
    let constraint = scheme.to_semver(constraint);
    is_exact_semver(&constraint) || is_release_candidate(&constraint)
}

/// Resolve `constraint` against `candidates` with the default options
pub fn resolve_version(constraint: &str, candidates: &[String]) -> Result<String, VersionError> {
    resolve_version_with(constraint, candidates, ResolveOptions::default())
}

/// Resolve `constraint` to the highest candidate that satisfies it.
///
/// Exact versions and release candidates are returned as given without
/// looking at `candidates`.
/// Every remaining candidate must parse, otherwise the whole resolution fails.
pub fn resolve_version_with(
    constraint: &str,
    candidates: &[String],
    options: ResolveOptions,
) -> Result<String, VersionError> {
    let scheme = options.scheme;
    let normalized = scheme.to_semver(constraint.trim());

    if is_release_candidate(&normalized) || is_exact_semver(&normalized) {
        return Ok(constraint.trim().to_string());
    }

    let range = Constraint::parse(&normalized)?;

    let mut parsed = candidates
        .iter()
        .filter(|candidate| !should_skip(candidate))
        .map(|candidate| {
            parse_lenient(&scheme.to_semver(candidate))
                .map(|version| (version, candidate.as_str()))
                .ok_or_else(|| VersionError::InvalidVersion {
                    version: candidate.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    parsed.sort_by(|(a, _), (b, _)| compare_desc(a, b));

    parsed
        .into_iter()
        .find(|(version, _)| range.matches(version))
        .map(|(version, original)| {
            if options.sanitize {
                scheme.to_native(&version.to_string())
            } else {
                original.to_string()
            }
        })
        .ok_or_else(|| VersionError::NoMatch {
            constraint: range.as_str().to_string(),
            candidates: candidates.to_vec(),
        })
}

fn should_skip(candidate: &str) -> bool {
    if is_release_candidate(candidate) {
        return true;
    }
    let lower = candidate.to_ascii_lowercase();
    SKIP_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
}

/// Highest precedence first. Versions that only differ in build metadata are
/// ordered by the metadata string, so `11.0.20+8` comes before `11.0.20+101`.
fn compare_desc(a: &Version, b: &Version) -> Ordering {
    (b.major, b.minor, b.patch, &b.pre)
        .cmp(&(a.major, a.minor, a.patch, &a.pre))
        .then_with(|| b.build.as_str().cmp(a.build.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    const JAVA_VERSIONS: &[&str] = &[
        "11.0.10+9",
        "11.0.14+101",
        "11.0.14+9",
        "11.0.2+7",
        "11.0.20+101",
        "11.0.20+8",
        "11.0.4+11.1",
        "11.0.9+11.1",
        "17.0.8+101",
        "17.0.8+7",
        "8.0.382+5",
        "21.0.0+35.0.LTS",
    ];

    #[rstest]
    #[case("~1.2.1", "1.2.4")]
    #[case("^1.2.1", "1.3.0")]
    #[case(">= 1.2.3, < 1.2.4", "1.2.3")]
    #[case("", "2.0.0")]
    #[case("*", "2.0.0")]
    #[case("latest", "2.0.0")]
    #[case("1.2", "1.2.4")]
    fn resolves_highest_matching_version(#[case] constraint: &str, #[case] expected: &str) {
        let candidates = versions(&["1.2.3", "1.2.4", "1.3.0", "0.1.2", "2.0.0"]);

        assert_eq!(resolve_version(constraint, &candidates).unwrap(), expected);
    }

    #[rstest]
    #[case("11.0", "11.0.20+8")]
    #[case("17", "17.0.8+7")]
    #[case("21.0", "21.0.0+35.0.LTS")]
    fn equal_versions_are_ordered_by_build_metadata(
        #[case] constraint: &str,
        #[case] expected: &str,
    ) {
        let candidates = versions(JAVA_VERSIONS);

        assert_eq!(resolve_version(constraint, &candidates).unwrap(), expected);
    }

    #[test]
    fn wildcard_without_match_fails_naming_constraint() {
        let candidates = versions(&["1.1.1", "3.3.3", "2.2.2"]);

        let err = resolve_version("3.2.x", &candidates).unwrap_err();

        assert!(matches!(
            err,
            VersionError::NoMatch { ref constraint, .. } if constraint == "3.2.x"
        ));
        assert!(err.to_string().contains("3.2.x"));
    }

    #[test]
    fn star_resolves_to_newest() {
        let candidates = versions(&["1.1.1", "3.3.3", "2.2.2"]);

        assert_eq!(resolve_version("*", &candidates).unwrap(), "3.3.3");
    }

    #[test]
    fn exact_version_skips_candidate_list() {
        assert_eq!(resolve_version("2.2.2", &[]).unwrap(), "2.2.2");
        assert_eq!(
            resolve_version("2.2.2", &versions(&["not-a-version"])).unwrap(),
            "2.2.2"
        );
    }

    #[test]
    fn sanitizing_trims_prefix_of_resolved_candidate() {
        let candidates = versions(&["v10.1.1"]);

        assert_eq!(resolve_version("10.x", &candidates).unwrap(), "10.1.1");
        assert_eq!(resolve_version("v10.1", &candidates).unwrap(), "10.1.1");
        // pinned versions are never rewritten
        assert_eq!(resolve_version("v10.1.1", &candidates).unwrap(), "v10.1.1");
    }

    #[rstest]
    #[case("v10.1.1", &["v10.1.1"], "v10.1.1")]
    #[case("*", &["1.16"], "1.16")]
    #[case("1.x", &["v1.4", "1.3.0"], "v1.4")]
    fn without_sanitization_returns_original_tag(
        #[case] constraint: &str,
        #[case] candidates: &[&str],
        #[case] expected: &str,
    ) {
        let options = ResolveOptions {
            sanitize: false,
            ..Default::default()
        };

        assert_eq!(
            resolve_version_with(constraint, &versions(candidates), options).unwrap(),
            expected
        );
    }

    #[test]
    fn invalid_constraint_is_error() {
        let err = resolve_version("xyz", &versions(&["v10.1.1"])).unwrap_err();

        assert!(matches!(err, VersionError::InvalidConstraint { .. }));
    }

    #[test]
    fn no_matching_version_is_error() {
        let err = resolve_version(">=2.0.0", &versions(&["1.2.3", "1.2.4"])).unwrap_err();

        assert!(matches!(err, VersionError::NoMatch { .. }));
    }

    #[test]
    fn unparsable_candidate_fails_whole_resolution() {
        let err = resolve_version("*", &versions(&["1.2.3", "garbage", "2.0.0"])).unwrap_err();

        assert!(matches!(
            err,
            VersionError::InvalidVersion { ref version } if version == "garbage"
        ));
    }

    #[test]
    fn skips_tags_and_release_candidates() {
        let candidates = versions(&[
            "1.2.3",
            "latest",
            "deprecated-1.9.0",
            "Public-Image-2.0.0",
            "3.12.0rc1",
        ]);

        assert_eq!(resolve_version("*", &candidates).unwrap(), "1.2.3");
    }

    #[test]
    fn release_candidate_constraint_is_returned_verbatim() {
        assert_eq!(resolve_version("8.3.0RC4", &[]).unwrap(), "8.3.0RC4");
        assert_eq!(resolve_version("3.12.0rc1", &[]).unwrap(), "3.12.0rc1");
    }

    #[test]
    fn underscore_scheme_round_trips_native_tags() {
        let candidates = versions(&["8.0.302_8", "11.0.21_9", "11.0.22_10"]);
        let options = ResolveOptions {
            scheme: VersionScheme::UnderscoreBuild,
            ..Default::default()
        };

        assert_eq!(
            resolve_version_with("11", &candidates, options).unwrap(),
            "11.0.22_10"
        );
        assert_eq!(
            resolve_version_with("11.0.21_9", &[], options).unwrap(),
            "11.0.21_9"
        );
    }

    #[rstest]
    #[case("v10.1.1", true)]
    #[case("2.2.2", true)]
    #[case("17.0.9+9", true)]
    #[case("1.1", false)]
    #[case("2", false)]
    #[case("", false)]
    #[case("1.x.x", false)]
    #[case("~1.0.0", false)]
    #[case(">=1.0.0", false)]
    fn exact_semver_requires_all_three_components(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_exact_semver(version), expected);
    }

    #[rstest]
    #[case("3.12.0rc1", true)]
    #[case("8.0.100-rc.1", true)]
    #[case("8.3.0RC4", true)]
    #[case("3.12.0", false)]
    #[case("3.12", false)]
    fn release_candidate_detection(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_release_candidate(version), expected);
    }

    #[rstest]
    #[case("11.0.22_10", VersionScheme::UnderscoreBuild, true)]
    #[case("11", VersionScheme::UnderscoreBuild, false)]
    #[case("3.12.0rc1", VersionScheme::Semver, true)]
    #[case("^3.12", VersionScheme::Semver, false)]
    fn pinned_constraints(
        #[case] constraint: &str,
        #[case] scheme: VersionScheme,
        #[case] expected: bool,
    ) {
        assert_eq!(is_pinned(constraint, scheme), expected);
    }
}
