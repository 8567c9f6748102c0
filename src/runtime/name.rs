use crate::error::VersionError;
use crate::version::parse_lenient;

/// Format the GAE / GCF runtime name for a language and version.
///
/// `format_name("go", "1.16.0")` returns `go116`. Java and .NET runtimes
/// only carry one version component (`java17`, `dotnet6`), Node.js carries
/// the major (`nodejs18`).
pub fn format_name(language: &str, version: &str) -> Result<String, VersionError> {
    let mut version = version.trim().to_string();
    // Go pre-releases are spelled `1.20rc1`
    if version.contains("rc") && !version.contains("-rc") {
        version = version.replacen("rc", "-rc", 1);
    }
    if version.contains("RC") && !version.contains("-RC") {
        version = version.replacen("RC", "-RC", 1);
    }
    if language == "java" {
        version = version.replacen('_', "+", 1);
    }

    let parsed = parse_lenient(&version).ok_or(VersionError::InvalidVersion { version })?;

    let suffix = match language {
        // Legacy JDKs are versioned 1.8.0, so the minor is the release
        "java" if parsed.major == 1 => parsed.minor.to_string(),
        "java" | "dotnet" | "nodejs" => parsed.major.to_string(),
        _ => format!("{}{}", parsed.major, parsed.minor),
    };
    Ok(format!("{language}{suffix}"))
}

/// Decide whether a buildpack should opt in based on `GOOGLE_RUNTIME`.
///
/// Returns `None` when the variable is unset or empty (no preference),
/// otherwise whether its lower-cased value starts with `want`, which covers
/// both `python` and GAE style names such as `python312`.
pub fn check_override(google_runtime: Option<&str>, want: &str) -> Option<bool> {
    let value = google_runtime?.trim().to_ascii_lowercase();
    if value.is_empty() {
        return None;
    }
    Some(value.starts_with(want))
}
