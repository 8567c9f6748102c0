//! Artifact Registry access
//!
//! Runtime images carry the runtime archive as their first layer. Tags are
//! the published versions.

use std::path::Path;

#[cfg(test)]
use mockall::automock;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::errors::{OciDistributionError, OciErrorCode};
use oci_distribution::manifest::{OciDescriptor, OciManifest};
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Client, Reference};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::archive::{clear_dir, extract_archive_file, spool_file};
use crate::error::FetchError;

const TARGET_OS: &str = "linux";
const TARGET_ARCH: &str = "amd64";

/// Registry holding runtime images
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// List the tags of `repository` (`host/project/path/name`, no tag)
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, FetchError>;

    /// Pull `image` and extract its runtime layer into `dir`
    async fn pull_image(&self, image: &str, dir: &Path, strip: usize) -> Result<(), FetchError>;
}

/// [`ArtifactRegistry`] over the OCI distribution API with anonymous access
pub struct OciRegistry {
    client: Client,
    auth: RegistryAuth,
}

impl OciRegistry {
    pub fn new() -> Self {
        Self {
            client: Client::new(ClientConfig {
                protocol: ClientProtocol::Https,
                ..Default::default()
            }),
            auth: RegistryAuth::Anonymous,
        }
    }

    fn image_error(url: &str, reason: impl ToString) -> FetchError {
        FetchError::Image {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Missing manifests, repositories and blobs become [`FetchError::NotFound`]
    fn registry_error(url: &str, e: OciDistributionError) -> FetchError {
        let not_found = match &e {
            OciDistributionError::ImageManifestNotFoundError(_) => true,
            OciDistributionError::ServerError { code, .. } => *code == 404,
            OciDistributionError::RegistryError { envelope, .. } => {
                envelope.errors.iter().any(|error| {
                    matches!(
                        error.code,
                        OciErrorCode::ManifestUnknown
                            | OciErrorCode::NameUnknown
                            | OciErrorCode::BlobUnknown
                    )
                })
            }
            _ => false,
        };
        if not_found {
            FetchError::NotFound {
                url: url.to_string(),
            }
        } else {
            Self::image_error(url, e)
        }
    }

    fn parse_reference(url: &str) -> Result<Reference, FetchError> {
        url.parse::<Reference>()
            .map_err(|e| Self::image_error(url, format!("invalid image reference: {e}")))
    }

    /// Find the runtime layer, descending into an image index for linux/amd64
    async fn runtime_layer(
        &self,
        url: &str,
        reference: &Reference,
    ) -> Result<(Reference, OciDescriptor), FetchError> {
        let (manifest, digest) = self
            .client
            .pull_manifest(reference, &self.auth)
            .await
            .map_err(|e| Self::registry_error(url, e))?;
        debug!("Pulled manifest {} for {}", digest, url);

        match manifest {
            OciManifest::Image(image) => image
                .layers
                .into_iter()
                .next()
                .map(|layer| (reference.clone(), layer))
                .ok_or_else(|| Self::image_error(url, "runtime image has no layer")),
            OciManifest::ImageIndex(index) => {
                let entry = index
                    .manifests
                    .iter()
                    .find(|m| {
                        m.platform
                            .as_ref()
                            .is_some_and(|p| p.os == TARGET_OS && p.architecture == TARGET_ARCH)
                    })
                    .ok_or_else(|| {
                        Self::image_error(
                            url,
                            format!("no manifest for {TARGET_OS}/{TARGET_ARCH}"),
                        )
                    })?;
                let platform_ref = Self::parse_reference(&format!(
                    "{}/{}@{}",
                    reference.registry(),
                    reference.repository(),
                    entry.digest
                ))?;
                let (platform_manifest, _) = self
                    .client
                    .pull_manifest(&platform_ref, &self.auth)
                    .await
                    .map_err(|e| Self::registry_error(url, e))?;
                match platform_manifest {
                    OciManifest::Image(image) => image
                        .layers
                        .into_iter()
                        .next()
                        .map(|layer| (platform_ref, layer))
                        .ok_or_else(|| Self::image_error(url, "runtime image has no layer")),
                    OciManifest::ImageIndex(_) => {
                        Err(Self::image_error(url, "nested image index not supported"))
                    }
                }
            }
        }
    }
}

impl Default for OciRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ArtifactRegistry for OciRegistry {
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>, FetchError> {
        let reference = Self::parse_reference(repository)?;
        let response = self
            .client
            .list_tags(&reference, &self.auth, None, None)
            .await
            .map_err(|e| Self::registry_error(repository, e))?;
        debug!("{} has {} tags", repository, response.tags.len());
        Ok(response.tags)
    }

    async fn pull_image(&self, image: &str, dir: &Path, strip: usize) -> Result<(), FetchError> {
        let reference = Self::parse_reference(image)?;
        let (layer_ref, layer) = self.runtime_layer(image, &reference).await?;

        let (temp, mut file) = spool_file()?;
        self.client
            .pull_blob(&layer_ref, &layer, &mut file)
            .await
            .map_err(|e| Self::registry_error(image, e))?;
        file.flush()
            .await
            .map_err(|e| FetchError::io(format!("writing {}", temp.path().display()), e))?;
        debug!("Pulled {} layer {} ({} bytes)", image, layer.digest, layer.size);

        extract_archive_file(temp.path(), dir, strip)
    }
}

/// Pull `url` into `dir`, retrying once with `fallback_url` on any failure.
/// An empty `fallback_url` disables the retry.
pub async fn fetch_image<R: ArtifactRegistry + ?Sized>(
    registry: &R,
    url: &str,
    fallback_url: &str,
    dir: &Path,
    strip: usize,
) -> Result<(), FetchError> {
    info!("Fetching {}", url);
    let err = match registry.pull_image(url, dir, strip).await {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    if fallback_url.is_empty() {
        return Err(err);
    }

    warn!(
        "Failed to fetch {}: {}. Retrying with {}",
        url, err, fallback_url
    );
    clear_dir(dir)
        .map_err(|e| FetchError::io(format!("clearing {}", dir.display()), e))?;
    registry.pull_image(fallback_url, dir, strip).await
}
