//! Network fetching and archive extraction
//!
//! # Modules
//!
//! - [`archive`]: tar(.gz/.xz) and zip extraction with strip-components
//! - [`http`]: CDN downloads and JSON manifests
//! - [`image`]: Artifact Registry tag listing and image pulls

pub mod archive;
pub mod http;
pub mod image;

pub use archive::{ArchiveFormat, clear_dir, extract_archive, extract_archive_file};
pub use http::HttpFetcher;
pub use image::{ArtifactRegistry, OciRegistry, fetch_image};
#[cfg(test)]
pub use image::MockArtifactRegistry;
