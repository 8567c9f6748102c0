//! Download route selection
//!
//! Pure functions: nothing here touches the network. The installer asks for a
//! [`VersionListing`] to resolve a constraint and an [`ArtifactSource`] to
//! download the resolved version.

use tracing::debug;

use super::tpc;
use crate::config::{BuildConfig, BuildEnv, Endpoints, FALLBACK_REGION};
use crate::error::SourceError;
use crate::runtime::{InstallableRuntime, OsName};

pub const TARBALL_REGISTRY_DEV: &str = "serverless-runtimes-dev";
pub const TARBALL_REGISTRY_QUAL: &str = "serverless-runtimes-qa";
pub const TARBALL_REGISTRY_PROD_GAE: &str = "gae-runtimes";
pub const TARBALL_REGISTRY_PROD_SERVERLESS: &str = "serverless-runtimes";

/// Where to download one runtime version from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Public tarball CDN
    Tarball { url: String, strip_components: usize },
    /// Regional Artifact Registry image, retried once from the fallback region
    ArtifactRegistry {
        url: String,
        fallback_url: String,
        strip_components: usize,
    },
    /// Trusted Partner Cloud registry; single-homed, never falls back
    TrustedPartner { url: String, strip_components: usize },
}

impl ArtifactSource {
    pub fn url(&self) -> &str {
        match self {
            Self::Tarball { url, .. }
            | Self::ArtifactRegistry { url, .. }
            | Self::TrustedPartner { url, .. } => url,
        }
    }

    pub fn strip_components(&self) -> usize {
        match self {
            Self::Tarball {
                strip_components, ..
            }
            | Self::ArtifactRegistry {
                strip_components, ..
            }
            | Self::TrustedPartner {
                strip_components, ..
            } => *strip_components,
        }
    }
}

/// Where to list the versions a constraint is resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionListing {
    /// JSON array of versions on the CDN
    Manifest { url: String },
    /// Image tags in the configured region, then in the fallback region
    Registry {
        repository: String,
        fallback_repository: String,
    },
    TrustedPartner { repository: String },
}

enum Route<'a> {
    TrustedPartner,
    Cdn,
    Registry { region: &'a str },
}

fn route<'a>(runtime: InstallableRuntime, config: &'a BuildConfig) -> Route<'a> {
    if config.is_tpc() {
        return Route::TrustedPartner;
    }
    match config.region.as_deref() {
        Some(region) if !config.is_dev() && runtime.info().registry_eligible => {
            Route::Registry { region }
        }
        _ => Route::Cdn,
    }
}

/// Artifact Registry project holding the runtime images for this build
pub fn tarball_registry(config: &BuildConfig) -> Result<String, SourceError> {
    if config.is_tpc() {
        return tpc::tarball_project(config);
    }
    let registry = match config.build_env {
        Some(BuildEnv::Dev) => TARBALL_REGISTRY_DEV,
        Some(BuildEnv::Qual) => TARBALL_REGISTRY_QUAL,
        Some(BuildEnv::Prod) | None if config.serverless_runtimes_tarballs => {
            TARBALL_REGISTRY_PROD_SERVERLESS
        }
        Some(BuildEnv::Prod) | None => TARBALL_REGISTRY_PROD_GAE,
    };
    Ok(registry.to_string())
}

/// Artifact Registry host serving `region`
pub fn ar_hostname(config: &BuildConfig, region: &str) -> Result<String, SourceError> {
    if config.is_tpc() {
        return tpc::hostname(config);
    }
    Ok(format!("{region}-docker.pkg.dev"))
}

pub fn runtime_image_repository(
    hostname: &str,
    registry: &str,
    os: OsName,
    runtime_id: &str,
) -> String {
    format!("{hostname}/{registry}/runtimes-{os}/{runtime_id}")
}

pub fn runtime_image_url(
    hostname: &str,
    registry: &str,
    os: OsName,
    runtime_id: &str,
    version: &str,
) -> String {
    format!(
        "{}:{}",
        runtime_image_repository(hostname, registry, os, runtime_id),
        version
    )
}

/// CDN tarball URL. Build metadata separators become `_` in file names.
pub fn tarball_url(
    endpoints: &Endpoints,
    runtime: InstallableRuntime,
    os: OsName,
    version: &str,
) -> String {
    if runtime == InstallableRuntime::Go {
        return format!("{}/go{}.linux-amd64.tar.gz", endpoints.go_base_url, version);
    }
    let id = runtime.as_str();
    format!(
        "{}/{}/{}/{}-{}.tar.gz",
        endpoints.runtimes_base_url,
        os,
        id,
        id,
        version.replace('+', "_")
    )
}

pub fn versions_manifest_url(
    endpoints: &Endpoints,
    runtime: InstallableRuntime,
    os: OsName,
) -> String {
    format!(
        "{}/{}/{}/version.json",
        endpoints.runtimes_base_url, os, runtime
    )
}

pub fn dart_sdk_url(endpoints: &Endpoints, version: &str) -> String {
    format!(
        "{}/{}/sdk/dartsdk-linux-x64-release.zip",
        endpoints.dart_base_url, version
    )
}

pub fn flutter_sdk_url(endpoints: &Endpoints, archive_path: &str) -> String {
    format!(
        "{}/{}",
        endpoints.flutter_base_url,
        archive_path.trim_start_matches('/')
    )
}

/// Pick the download source for an already resolved version
pub fn select_source(
    runtime: InstallableRuntime,
    os: OsName,
    version: &str,
    config: &BuildConfig,
) -> Result<ArtifactSource, SourceError> {
    let info = runtime.info();
    let strip_components = info.strip_components;

    let source = match route(runtime, config) {
        Route::TrustedPartner => {
            let hostname = tpc::hostname(config)?;
            let registry = tpc::tarball_project(config)?;
            ArtifactSource::TrustedPartner {
                url: runtime_image_url(&hostname, &registry, os, info.id, version),
                strip_components,
            }
        }
        Route::Cdn => ArtifactSource::Tarball {
            url: tarball_url(&config.endpoints, runtime, os, version),
            strip_components,
        },
        Route::Registry { region } => {
            let registry = tarball_registry(config)?;
            ArtifactSource::ArtifactRegistry {
                url: runtime_image_url(
                    &ar_hostname(config, region)?,
                    &registry,
                    os,
                    info.id,
                    version,
                ),
                fallback_url: runtime_image_url(
                    &ar_hostname(config, FALLBACK_REGION)?,
                    &registry,
                    os,
                    info.id,
                    version,
                ),
                strip_components,
            }
        }
    };

    debug!("Selected source for {} {}: {:?}", runtime, version, source);
    Ok(source)
}

/// Pick where the versions of `runtime` are listed
pub fn version_listing(
    runtime: InstallableRuntime,
    os: OsName,
    config: &BuildConfig,
) -> Result<VersionListing, SourceError> {
    let id = runtime.as_str();

    Ok(match route(runtime, config) {
        Route::TrustedPartner => VersionListing::TrustedPartner {
            repository: runtime_image_repository(
                &tpc::hostname(config)?,
                &tpc::tarball_project(config)?,
                os,
                id,
            ),
        },
        Route::Cdn => VersionListing::Manifest {
            url: versions_manifest_url(&config.endpoints, runtime, os),
        },
        Route::Registry { region } => {
            let registry = tarball_registry(config)?;
            VersionListing::Registry {
                repository: runtime_image_repository(
                    &ar_hostname(config, region)?,
                    &registry,
                    os,
                    id,
                ),
                fallback_repository: runtime_image_repository(
                    &ar_hostname(config, FALLBACK_REGION)?,
                    &registry,
                    os,
                    id,
                ),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn config(build_env: Option<BuildEnv>, region: Option<&str>) -> BuildConfig {
        BuildConfig {
            build_env,
            region: region.map(String::from),
            ..Default::default()
        }
    }

    #[rstest]
    #[case(InstallableRuntime::Python, "3.7.2", "us", TARBALL_REGISTRY_QUAL, "us-docker.pkg.dev/serverless-runtimes-qa/runtimes-ubuntu2204/python:3.7.2")]
    #[case(InstallableRuntime::Nodejs, "18.18.1", "eu", TARBALL_REGISTRY_PROD_GAE, "eu-docker.pkg.dev/gae-runtimes/runtimes-ubuntu2204/nodejs:18.18.1")]
    #[case(InstallableRuntime::Php, "8.2.0", "us-west1", TARBALL_REGISTRY_PROD_SERVERLESS, "us-west1-docker.pkg.dev/serverless-runtimes/runtimes-ubuntu2204/php:8.2.0")]
    fn builds_runtime_image_url(
        #[case] runtime: InstallableRuntime,
        #[case] version: &str,
        #[case] region: &str,
        #[case] registry: &str,
        #[case] expected: &str,
    ) {
        let hostname = ar_hostname(&BuildConfig::default(), region).unwrap();

        assert_eq!(
            runtime_image_url(&hostname, registry, OsName::Ubuntu2204, runtime.as_str(), version),
            expected
        );
    }

    #[rstest]
    #[case(Some(BuildEnv::Dev), None, false, TARBALL_REGISTRY_DEV)]
    #[case(Some(BuildEnv::Qual), None, false, TARBALL_REGISTRY_QUAL)]
    #[case(Some(BuildEnv::Prod), Some("gdu"), false, TARBALL_REGISTRY_PROD_GAE)]
    #[case(Some(BuildEnv::Prod), Some("gdu"), true, TARBALL_REGISTRY_PROD_SERVERLESS)]
    #[case(None, Some("gdu"), false, TARBALL_REGISTRY_PROD_GAE)]
    #[case(None, Some("gdu"), true, TARBALL_REGISTRY_PROD_SERVERLESS)]
    #[case(None, Some("prp"), false, "tpczero-system/serverless-runtimes-tpc")]
    #[case(None, Some("tsp"), false, "eu0-system/serverless-runtimes-tpc")]
    #[case(None, Some("tsq"), false, "tpcone-system/serverless-runtimes-tpc")]
    fn selects_tarball_registry(
        #[case] build_env: Option<BuildEnv>,
        #[case] universe: Option<&str>,
        #[case] serverless: bool,
        #[case] expected: &str,
    ) {
        let config = BuildConfig {
            build_env,
            universe: universe.map(String::from),
            serverless_runtimes_tarballs: serverless,
            ..Default::default()
        };

        assert_eq!(tarball_registry(&config).unwrap(), expected);
    }

    #[test]
    fn cdn_when_region_is_not_set() {
        let source = select_source(
            InstallableRuntime::Ruby,
            OsName::Ubuntu1804,
            "2.2.2",
            &config(Some(BuildEnv::Prod), None),
        )
        .unwrap();

        assert_eq!(
            source,
            ArtifactSource::Tarball {
                url: "https://dl.google.com/runtimes/ubuntu1804/ruby/ruby-2.2.2.tar.gz".to_string(),
                strip_components: 0,
            }
        );
    }

    #[test]
    fn cdn_when_build_env_is_dev() {
        let source = select_source(
            InstallableRuntime::Ruby,
            OsName::Ubuntu2204,
            "2.2.2",
            &config(Some(BuildEnv::Dev), Some("us-west1")),
        )
        .unwrap();

        assert!(matches!(source, ArtifactSource::Tarball { .. }));
    }

    #[test]
    fn cdn_for_go_even_with_region_in_prod() {
        let source = select_source(
            InstallableRuntime::Go,
            OsName::Ubuntu2204,
            "1.24.5",
            &config(Some(BuildEnv::Prod), Some("us-west1")),
        )
        .unwrap();

        assert_eq!(
            source,
            ArtifactSource::Tarball {
                url: "https://dl.google.com/go/go1.24.5.linux-amd64.tar.gz".to_string(),
                strip_components: 1,
            }
        );
    }

    #[test]
    fn cdn_tarball_replaces_build_separator() {
        let url = tarball_url(
            &Endpoints::default(),
            InstallableRuntime::OpenJdk,
            OsName::Ubuntu2204,
            "17.0.9+9",
        );

        assert_eq!(
            url,
            "https://dl.google.com/runtimes/ubuntu2204/openjdk/openjdk-17.0.9_9.tar.gz"
        );
    }

    #[rstest]
    #[case(Some(BuildEnv::Qual), false, "serverless-runtimes-qa")]
    #[case(Some(BuildEnv::Prod), false, "gae-runtimes")]
    #[case(None, false, "gae-runtimes")]
    #[case(None, true, "serverless-runtimes")]
    fn artifact_registry_with_fallback_region(
        #[case] build_env: Option<BuildEnv>,
        #[case] serverless: bool,
        #[case] registry: &str,
    ) {
        let config = BuildConfig {
            serverless_runtimes_tarballs: serverless,
            ..config(build_env, Some("us-central1"))
        };

        let source = select_source(
            InstallableRuntime::Nodejs,
            OsName::Ubuntu2204,
            "16.20.0",
            &config,
        )
        .unwrap();

        assert_eq!(
            source,
            ArtifactSource::ArtifactRegistry {
                url: format!(
                    "us-central1-docker.pkg.dev/{registry}/runtimes-ubuntu2204/nodejs:16.20.0"
                ),
                fallback_url: format!(
                    "us-docker.pkg.dev/{registry}/runtimes-ubuntu2204/nodejs:16.20.0"
                ),
                strip_components: 0,
            }
        );
    }

    #[rstest]
    #[case("prp", "u-us-prp1", "docker.pkg-tpczero.goog/tpczero-system/serverless-runtimes-tpc")]
    #[case("tsp", "u-germany-northeast1", "docker.pkg-berlin-build0.goog/eu0-system/serverless-runtimes-tpc")]
    #[case("tsq", "u-germany-northeast1q", "docker.pkg-tpcone.goog/tpcone-system/serverless-runtimes-tpc")]
    fn trusted_partner_cloud_has_no_fallback(
        #[case] universe: &str,
        #[case] region: &str,
        #[case] prefix: &str,
    ) {
        let config = BuildConfig {
            universe: Some(universe.to_string()),
            ..config(None, Some(region))
        };

        let source = select_source(
            InstallableRuntime::Nodejs,
            OsName::Ubuntu2204,
            "16.20.0",
            &config,
        )
        .unwrap();

        assert_eq!(
            source,
            ArtifactSource::TrustedPartner {
                url: format!("{prefix}/runtimes-ubuntu2204/nodejs:16.20.0"),
                strip_components: 0,
            }
        );
    }

    #[test]
    fn trusted_partner_cloud_with_unknown_region_fails() {
        let config = BuildConfig {
            universe: Some("prp".to_string()),
            ..config(None, Some("invalid-region"))
        };

        let result = select_source(
            InstallableRuntime::Nodejs,
            OsName::Ubuntu2204,
            "16.20.0",
            &config,
        );

        assert!(matches!(result, Err(SourceError::UnknownTpcRegion(_))));
    }

    #[test]
    fn version_listing_follows_route() {
        let cdn = version_listing(
            InstallableRuntime::Python,
            OsName::Ubuntu2204,
            &BuildConfig::default(),
        )
        .unwrap();
        assert_eq!(
            cdn,
            VersionListing::Manifest {
                url: "https://dl.google.com/runtimes/ubuntu2204/python/version.json".to_string()
            }
        );

        let ar = version_listing(
            InstallableRuntime::Python,
            OsName::Ubuntu2204,
            &config(Some(BuildEnv::Prod), Some("europe-west1")),
        )
        .unwrap();
        assert_eq!(
            ar,
            VersionListing::Registry {
                repository: "europe-west1-docker.pkg.dev/gae-runtimes/runtimes-ubuntu2204/python"
                    .to_string(),
                fallback_repository: "us-docker.pkg.dev/gae-runtimes/runtimes-ubuntu2204/python"
                    .to_string(),
            }
        );
    }

    #[test]
    fn sdk_urls() {
        let endpoints = Endpoints::default();

        assert_eq!(
            dart_sdk_url(&endpoints, "3.4.0"),
            "https://storage.googleapis.com/dart-archive/channels/stable/release/3.4.0/sdk/dartsdk-linux-x64-release.zip"
        );
        assert_eq!(
            flutter_sdk_url(&endpoints, "stable/linux/flutter_linux_3.22.0-stable.tar.xz"),
            "https://storage.googleapis.com/flutter_infra_release/releases/stable/linux/flutter_linux_3.22.0-stable.tar.xz"
        );
    }
}
