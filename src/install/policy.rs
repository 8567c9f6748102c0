use std::cmp::Ordering;

use tracing::debug;

use crate::config::BuildConfig;
use crate::error::InstallError;
use crate::runtime::{InstallableRuntime, check_override};
use crate::version::parse_lenient;

/// Reject versions below the App Engine flex floor.
///
/// Only applies on the flex platform, to language runtimes, when
/// `GOOGLE_RUNTIME` names the runtime's language. A floor that does not parse
/// disables the check.
pub fn validate_flex_min_version(
    config: &BuildConfig,
    runtime: InstallableRuntime,
    version: &str,
) -> Result<(), InstallError> {
    if !config.is_flex() {
        return Ok(());
    }
    let info = runtime.info();
    let Some(language) = info.language else {
        return Ok(());
    };
    if check_override(config.runtime.as_deref(), language) != Some(true) {
        return Ok(());
    }
    let Some(minimum) = config.flex_min_version.as_deref().and_then(parse_lenient) else {
        debug!(
            "Ignoring unparsable flex minimum version {:?}",
            config.flex_min_version
        );
        return Ok(());
    };

    let resolved = parse_lenient(&info.version_scheme.to_semver(version)).ok_or_else(|| {
        InstallError::UnparsableVersion {
            runtime: info.display_name,
            version: version.to_string(),
        }
    })?;

    if resolved.cmp_precedence(&minimum) == Ordering::Less {
        return Err(InstallError::BelowMinimum {
            runtime: info.display_name,
            version: version.to_string(),
            minimum: minimum.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn flex(google_runtime: &str, min_version: &str) -> BuildConfig {
        BuildConfig {
            target_platform: Some("flex".to_string()),
            runtime: Some(google_runtime.to_string()),
            flex_min_version: Some(min_version.to_string()),
            ..Default::default()
        }
    }

    #[rstest]
    #[case::non_language_runtime_pid1(InstallableRuntime::Pid1, "python", "2.8", "3.7.0", true)]
    #[case::non_language_runtime_nginx(InstallableRuntime::Nginx, "python", "2.8", "3.7.0", true)]
    #[case::valid_version(InstallableRuntime::Python, "python", "3.7.2", "3.7.0", true)]
    #[case::equal_to_minimum(InstallableRuntime::Python, "python", "3.7.0", "3.7.0", true)]
    #[case::below_minimum(InstallableRuntime::Python, "python", "2.8", "3.7.0", false)]
    #[case::invalid_minimum(InstallableRuntime::Python, "python", "4.3.2", "cde", true)]
    #[case::invalid_version(InstallableRuntime::Python, "python", "abc", "3.7.0", false)]
    #[case::runtime_mismatch(InstallableRuntime::Python, "php", "abc", "3.7.0", true)]
    #[case::gae_runtime_name(InstallableRuntime::Python, "python312", "3.6.0", "3.7.0", false)]
    #[case::jdk_native_tag(InstallableRuntime::OpenJdk, "java", "17.0.9_9", "11.0.0", true)]
    #[case::dotnet_language(InstallableRuntime::AspNetCore, "dotnet", "5.0.1", "6.0.0", false)]
    fn flex_minimum_version(
        #[case] runtime: InstallableRuntime,
        #[case] google_runtime: &str,
        #[case] version: &str,
        #[case] min_version: &str,
        #[case] ok: bool,
    ) {
        let config = flex(google_runtime, min_version);

        let result = validate_flex_min_version(&config, runtime, version);

        assert_eq!(result.is_ok(), ok, "{result:?}");
    }

    #[test]
    fn non_flex_platform_is_not_checked() {
        let config = BuildConfig {
            target_platform: Some("gae".to_string()),
            ..flex("python", "3.7.0")
        };

        assert!(validate_flex_min_version(&config, InstallableRuntime::Python, "2.8").is_ok());
    }

    #[test]
    fn below_minimum_names_floor() {
        let err = validate_flex_min_version(
            &flex("nodejs", "18.0.0"),
            InstallableRuntime::Nodejs,
            "16.20.0",
        )
        .unwrap_err();

        assert!(matches!(
            err,
            InstallError::BelowMinimum { ref minimum, .. } if minimum == "18.0.0"
        ));
        assert!(err.hint().unwrap().contains("18.0.0"));
    }
}
