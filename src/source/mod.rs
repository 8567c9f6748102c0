//! Artifact source selection
//!
//! Decides, per install, which backend a runtime is downloaded from and where
//! its versions are listed.
//!
//! # Modules
//!
//! - [`selector`]: CDN / Artifact Registry / TPC routing and URL templates
//! - [`tpc`]: Trusted Partner Cloud hostname and project tables

pub mod selector;
pub mod tpc;

pub use selector::{
    ArtifactSource, VersionListing, ar_hostname, dart_sdk_url, flutter_sdk_url,
    runtime_image_repository, runtime_image_url, select_source, tarball_registry, tarball_url,
    version_listing, versions_manifest_url,
};
