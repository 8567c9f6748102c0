use semver::Version;

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Strips a leading `v` and pads missing minor/patch components with zeros.
/// Pre-release and build suffixes are kept as they are.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.20-rc1" -> Version(1, 20, 0, pre: rc1)
/// - "17.0.9+9" -> Version(17, 0, 9, build: 9)
pub fn parse_lenient(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let (core, suffix) = version.split_at(core_len(version));
    let parts: Vec<&str> = core.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0{}", parts[0], suffix),
        2 => format!("{}.{}.0{}", parts[0], parts[1], suffix),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Length of the `major.minor.patch` part, before any `-pre` or `+build` suffix
pub(crate) fn core_len(version: &str) -> usize {
    version.find(['-', '+']).unwrap_or(version.len())
}
