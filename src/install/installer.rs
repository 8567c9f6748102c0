use std::path::Path;

use tracing::{debug, info, warn};

use super::policy::validate_flex_min_version;
use crate::config::RUNTIME_VERSION_ENV;
use crate::context::{BomEntry, BuildContext};
use crate::error::{FetchError, InstallError, VersionError};
use crate::fetch::{ArtifactRegistry, HttpFetcher, OciRegistry, fetch_image};
use crate::layer::{InstallLayer, STACK_KEY, VERSION_KEY};
use crate::runtime::{InstallableRuntime, OsName, os_for_stack};
use crate::source::{
    ArtifactSource, VersionListing, dart_sdk_url, flutter_sdk_url, select_source, version_listing,
};
use crate::version::{ResolveOptions, is_pinned, resolve_version_with};

const DART_SDK: &str = "Dart SDK";
const FLUTTER_SDK: &str = "Flutter SDK";

/// Resolves runtime versions and installs them into layers
pub struct Installer<R = OciRegistry> {
    http: HttpFetcher,
    registry: R,
}

impl Installer<OciRegistry> {
    pub fn new() -> Self {
        Self::with_registry(HttpFetcher::new(), OciRegistry::new())
    }
}

impl Default for Installer<OciRegistry> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ArtifactRegistry> Installer<R> {
    pub fn with_registry(http: HttpFetcher, registry: R) -> Self {
        Self { http, registry }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Resolve `constraint` to a concrete version of `runtime` for `os`.
    ///
    /// Exact versions and release candidates are returned without listing.
    /// Registry listings fall back to the fallback region once when the
    /// configured region errors or has no satisfying tag.
    pub async fn resolve_version(
        &self,
        ctx: &BuildContext,
        runtime: InstallableRuntime,
        constraint: &str,
        os: OsName,
    ) -> Result<String, InstallError> {
        let info = runtime.info();
        let version_error = |source| InstallError::Version {
            runtime: info.display_name,
            source,
        };
        let listing_error = |source| InstallError::VersionListing {
            runtime: info.display_name,
            source,
        };

        if is_pinned(constraint, info.version_scheme) {
            return resolve_version_with(constraint, &[], manifest_options(runtime))
                .map_err(version_error);
        }

        let listing = version_listing(runtime, os, ctx.config())?;
        debug!("Listing {} versions from {:?}", runtime, listing);

        match listing {
            VersionListing::Manifest { url } => {
                let versions: Vec<String> = self.http.json(&url).await.map_err(listing_error)?;
                resolve_version_with(constraint, &versions, manifest_options(runtime))
                    .map_err(version_error)
            }
            VersionListing::TrustedPartner { repository } => {
                let tags = self
                    .registry
                    .list_tags(&repository)
                    .await
                    .map_err(listing_error)?;
                resolve_version_with(constraint, &tags, tag_options(runtime)).map_err(version_error)
            }
            VersionListing::Registry {
                repository,
                fallback_repository,
            } => {
                match self.registry.list_tags(&repository).await {
                    Ok(tags) => {
                        match resolve_version_with(constraint, &tags, tag_options(runtime)) {
                            Ok(version) => return Ok(version),
                            Err(e @ VersionError::InvalidConstraint { .. }) => {
                                return Err(version_error(e));
                            }
                            Err(e) => debug!("{}: {}", repository, e),
                        }
                    }
                    Err(e) => warn!("Failed to list tags of {}: {}", repository, e),
                }

                info!(
                    "Resolving {} {:?} against {}",
                    info.display_name, constraint, fallback_repository
                );
                let tags = self
                    .registry
                    .list_tags(&fallback_repository)
                    .await
                    .map_err(listing_error)?;
                resolve_version_with(constraint, &tags, tag_options(runtime)).map_err(version_error)
            }
        }
    }

    /// Install `runtime` into `layer` unless it already holds the resolved
    /// version for the current stack.
    ///
    /// Returns `true` on a cache hit.
    pub async fn install_tarball_if_not_cached(
        &self,
        ctx: &mut BuildContext,
        runtime: InstallableRuntime,
        constraint: &str,
        layer: &mut InstallLayer,
    ) -> Result<bool, InstallError> {
        let info = runtime.info();
        let stack = ctx.stack_id().to_string();
        let os = os_for_stack(&stack);

        let version = self.resolve_version(ctx, runtime, constraint, os).await?;
        validate_flex_min_version(ctx.config(), runtime, &version)?;

        ctx.add_bom_entry(BomEntry {
            name: info.id.to_string(),
            version: version.clone(),
            launch: layer.types.launch,
            build: layer.types.build,
        });
        ctx.set_installed_version(info.id, &version);

        if is_cached(layer, &version, &stack) {
            ctx.cache_hit(layer.name());
            info!("{} v{} cache hit, skipping installation.", info.display_name, version);
            return Ok(true);
        }
        ctx.cache_miss(layer.name());
        layer.clear()?;

        let source = select_source(runtime, os, &version, ctx.config())?;
        info!("Installing {} v{}", info.display_name, version);

        if let Err(source) = self.fetch(&source, layer.path()).await {
            warn!(
                "Failed to download {} version {} os {}. You can specify the version by setting the {} environment variable",
                info.display_name, version, os, RUNTIME_VERSION_ENV
            );
            return Err(InstallError::Download {
                runtime: info.display_name,
                version,
                os: os.to_string(),
                source,
            });
        }

        layer.set_metadata(VERSION_KEY, version.as_str());
        layer.set_metadata(STACK_KEY, stack);
        layer.save()?;
        Ok(false)
    }

    async fn fetch(&self, source: &ArtifactSource, dir: &Path) -> Result<(), FetchError> {
        match source {
            ArtifactSource::Tarball {
                url,
                strip_components,
            } => self.http.fetch_archive(url, dir, *strip_components).await,
            ArtifactSource::ArtifactRegistry {
                url,
                fallback_url,
                strip_components,
            } => fetch_image(&self.registry, url, fallback_url, dir, *strip_components).await,
            ArtifactSource::TrustedPartner {
                url,
                strip_components,
            } => fetch_image(&self.registry, url, "", dir, *strip_components).await,
        }
    }

    /// Download the Dart SDK zip for `version` into `layer`
    pub async fn install_dart_sdk(
        &self,
        ctx: &mut BuildContext,
        layer: &mut InstallLayer,
        version: &str,
    ) -> Result<(), InstallError> {
        let url = dart_sdk_url(&ctx.config().endpoints, version);
        self.install_sdk(ctx, layer, DART_SDK, "dart", version, &url)
            .await
    }

    /// Download a Flutter SDK release into `layer`. `archive_path` is the
    /// release's path relative to the Flutter storage bucket.
    pub async fn install_flutter_sdk(
        &self,
        ctx: &mut BuildContext,
        layer: &mut InstallLayer,
        version: &str,
        archive_path: &str,
    ) -> Result<(), InstallError> {
        let url = flutter_sdk_url(&ctx.config().endpoints, archive_path);
        self.install_sdk(ctx, layer, FLUTTER_SDK, "flutter", version, &url)
            .await
    }

    async fn install_sdk(
        &self,
        ctx: &mut BuildContext,
        layer: &mut InstallLayer,
        display_name: &'static str,
        id: &str,
        version: &str,
        url: &str,
    ) -> Result<(), InstallError> {
        layer.clear()?;
        info!("Installing {} v{}", display_name, version);

        if let Err(source) = self.http.fetch_archive(url, layer.path(), 1).await {
            warn!("Failed to download {} version {}", display_name, version);
            return Err(InstallError::Download {
                runtime: display_name,
                version: version.to_string(),
                os: os_for_stack(ctx.stack_id()).to_string(),
                source,
            });
        }

        layer.set_metadata(VERSION_KEY, version);
        layer.save()?;
        ctx.set_installed_version(id, version);
        ctx.add_bom_entry(BomEntry {
            name: id.to_string(),
            version: version.to_string(),
            launch: layer.types.launch,
            build: layer.types.build,
        });
        Ok(())
    }
}

/// A cacheable layer is reusable when it was built for the same version on
/// the same stack
pub fn is_cached(layer: &InstallLayer, version: &str, stack: &str) -> bool {
    layer.types.cache
        && layer.metadata(VERSION_KEY) == Some(version)
        && layer.metadata(STACK_KEY) == Some(stack)
}

/// Manifest entries are reported in canonical form
fn manifest_options(runtime: InstallableRuntime) -> ResolveOptions {
    ResolveOptions {
        scheme: runtime.info().version_scheme,
        ..Default::default()
    }
}

/// Image tags are pulled verbatim, so the matching tag is returned as published
fn tag_options(runtime: InstallableRuntime) -> ResolveOptions {
    ResolveOptions {
        sanitize: false,
        ..manifest_options(runtime)
    }
}
